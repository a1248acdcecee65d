//! Group spawning — materializes enemy formations at their scheduled ticks.
//!
//! Members are placed on concentric rings around the group center and aimed
//! straight at the command post at the group's speed, altitude held.

use std::f64::consts::TAU;

use hecs::World;
use tracing::debug;

use palisade_core::components::{Position, Threat, ThreatState, Velocity};
use palisade_core::enums::Disposition;
use palisade_core::events::SimEvent;
use palisade_core::geometry::{deg_to_rad, Vec3};
use palisade_core::state::RunTally;

use crate::allocator::CommandPost;
use crate::scenario::Scenario;

/// One scheduled group, resolved to tick units and radians.
#[derive(Debug, Clone)]
pub struct GroupSpawn {
    pub label: String,
    pub spawn_tick: u64,
    pub spawned: bool,
    pub center: Vec3,
    pub count: u32,
    pub ring_spacing_m: f64,
    pub start_angle_rad: f64,
    pub ring_half_offset: bool,
    pub endurance: u32,
    pub speed_mps: f64,
}

/// All pending group spawns, indexed by spawn tick.
#[derive(Debug, Clone, Default)]
pub struct SpawnSchedule {
    pub groups: Vec<GroupSpawn>,
}

impl SpawnSchedule {
    /// Resolve a scenario's groups into tick-indexed spawns. A group
    /// materializes at the first tick whose start time reaches its scheduled
    /// time.
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let dt = scenario.sim.dt_s;
        let groups = scenario
            .enemy_forces
            .groups
            .iter()
            .map(|group| GroupSpawn {
                label: group.id.clone(),
                spawn_tick: (group.spawn_time_s / dt).ceil() as u64,
                spawned: false,
                center: Vec3::new(group.center_xy.x_m, group.center_xy.y_m, group.z_m),
                count: group.count,
                ring_spacing_m: group.ring_spacing_m,
                start_angle_rad: deg_to_rad(group.start_angle_deg),
                ring_half_offset: group.ring_half_offset,
                endurance: group.endurance_pt,
                speed_mps: group.speed_mps,
            })
            .collect();
        Self { groups }
    }

    pub fn all_spawned(&self) -> bool {
        self.groups.iter().all(|g| g.spawned)
    }

    /// Total members across all groups.
    pub fn total_count(&self) -> u32 {
        self.groups.iter().map(|g| g.count).sum()
    }
}

/// Ring-filling placement: rings at radius `k · spacing` for k = 1, 2, …,
/// filled innermost-outward. Ring k holds up to `floor(2πr_k / spacing)`
/// members; the members actually placed on a ring are spread at equal
/// angular spacing from the start angle. With the half offset, rings k >= 2
/// rotate by half a slot.
pub fn ring_positions(
    center: Vec3,
    count: u32,
    spacing: f64,
    start_angle: f64,
    half_offset: bool,
) -> Vec<Vec3> {
    let mut positions = Vec::with_capacity(count as usize);
    let mut remaining = count as usize;
    let mut ring = 1u32;

    while remaining > 0 {
        let radius = ring as f64 * spacing;
        let capacity = ((TAU * radius / spacing).floor() as usize).max(1);
        let placed = remaining.min(capacity);
        let step = TAU / placed as f64;
        let offset = if half_offset && ring >= 2 { step / 2.0 } else { 0.0 };

        for slot in 0..placed {
            let angle = start_angle + offset + slot as f64 * step;
            positions.push(center + Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0));
        }

        remaining -= placed;
        ring += 1;
    }

    positions
}

/// Materialize every group whose spawn tick has arrived.
pub fn run(
    world: &mut World,
    schedule: &mut SpawnSchedule,
    current_tick: u64,
    next_target_id: &mut u32,
    command_post: &CommandPost,
    events: &mut Vec<SimEvent>,
    tally: &mut RunTally,
) {
    for group in &mut schedule.groups {
        if group.spawned || current_tick < group.spawn_tick {
            continue;
        }

        let positions = ring_positions(
            group.center,
            group.count,
            group.ring_spacing_m,
            group.start_angle_rad,
            group.ring_half_offset,
        );

        for pos in positions {
            let id = *next_target_id;
            *next_target_id += 1;

            // Straight XY course toward the command post; altitude preserved.
            let to_post = Vec3::new(
                command_post.position.x - pos.x,
                command_post.position.y - pos.y,
                0.0,
            );
            let velocity = match to_post.try_unit() {
                Some(direction) => direction * group.speed_mps,
                None => Vec3::ZERO,
            };

            world.spawn((
                Threat,
                ThreatState {
                    id,
                    endurance: group.endurance,
                    disposition: Disposition::Inbound,
                },
                Position(pos),
                Velocity(velocity),
            ));
        }

        tally.targets_spawned += group.count;
        events.push(SimEvent::GroupSpawned {
            group: group.label.clone(),
            count: group.count,
            tick: current_tick,
        });
        debug!(group = %group.label, count = group.count, tick = current_tick, "group spawned");
        group.spawned = true;
    }
}

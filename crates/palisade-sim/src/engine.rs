//! Simulation engine — the deterministic tick loop.
//!
//! `SimulationEngine` owns the hecs world, the assignment ledger, and the
//! spawn schedule, and advances them through the mandated phase order:
//! spawn → target phase → missile phase → hit application → sensor phase →
//! command-post phase, then snapshot, cleanup, and the termination check.
//! Completely headless; the same scenario always produces byte-identical
//! snapshots.

use std::collections::BTreeMap;

use hecs::World;
use tracing::{debug, info};

use palisade_core::components::{
    Interceptor, LauncherSite, MissilePerformance, MissileState, Position, SensorSite, Threat,
    ThreatState,
};
use palisade_core::enums::{Disposition, MissilePhase};
use palisade_core::events::SimEvent;
use palisade_core::state::{RunTally, TickSnapshot};
use palisade_core::types::{SimTime, WorldBounds};

use crate::allocator::CommandPost;
use crate::scenario::{Scenario, ScenarioError};
use crate::systems;
use crate::systems::spawn::SpawnSchedule;

/// The simulation engine. Owns all live entity collections; the command post
/// holds only ids.
pub struct SimulationEngine {
    world: World,
    time: SimTime,
    t_max_ticks: u64,
    bounds: WorldBounds,
    command_post: CommandPost,
    schedule: SpawnSchedule,
    missile_defaults: MissilePerformance,
    next_target_id: u32,
    next_missile_id: u32,
    despawn_buffer: Vec<hecs::Entity>,
    events: Vec<SimEvent>,
    tally: RunTally,
    finished: bool,
}

impl SimulationEngine {
    /// Build an engine from a validated scenario. Configuration problems are
    /// surfaced here, before the first tick; nothing aborts mid-run.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;

        let mut world = World::new();

        for (index, spec) in scenario.friendly_forces.sensors.iter().enumerate() {
            world.spawn((
                SensorSite {
                    id: index as u32,
                    range_m: spec.range_m,
                },
                Position(spec.pos.to_vec3()),
            ));
            debug!(sensor = %spec.id, index, range_m = spec.range_m, "sensor sited");
        }

        for (index, spec) in scenario.friendly_forces.launchers.iter().enumerate() {
            let cooldown_until_s = if scenario.policy.launcher_initially_cooled {
                f64::NEG_INFINITY
            } else {
                spec.cooldown_s
            };
            world.spawn((
                LauncherSite {
                    id: index as u32,
                    magazine: spec.missiles_loaded,
                    cooldown_s: spec.cooldown_s,
                    cooldown_until_s,
                },
                Position(spec.pos.to_vec3()),
            ));
            debug!(launcher = %spec.id, index, rounds = spec.missiles_loaded, "launcher sited");
        }

        let command_post = CommandPost::new(
            palisade_core::geometry::Vec3::new(
                scenario.command_post.position.x_m,
                scenario.command_post.position.y_m,
                0.0,
            ),
            scenario.command_post.arrival_radius_m,
            scenario.policy.max_assigned_per_target,
        );

        let schedule = SpawnSchedule::from_scenario(scenario);
        let time = SimTime::new(scenario.sim.dt_s);

        info!(
            name = %scenario.meta.name,
            sensors = scenario.friendly_forces.sensors.len(),
            launchers = scenario.friendly_forces.launchers.len(),
            groups = scenario.enemy_forces.groups.len(),
            targets = schedule.total_count(),
            dt_s = scenario.sim.dt_s,
            t_max_s = scenario.sim.t_max_s,
            "engine initialized"
        );

        Ok(Self {
            world,
            time,
            t_max_ticks: (scenario.sim.t_max_s / scenario.sim.dt_s).ceil() as u64,
            bounds: scenario.bounds(),
            command_post,
            schedule,
            missile_defaults: scenario.missile_performance(),
            next_target_id: 0,
            next_missile_id: 0,
            despawn_buffer: Vec::new(),
            events: Vec::new(),
            tally: RunTally::default(),
            finished: false,
        })
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    /// A finished engine no longer advances.
    pub fn tick(&mut self) -> TickSnapshot {
        if self.finished {
            return self.snapshot();
        }

        let dt = self.time.dt_s;
        let now_s = self.time.seconds();

        // 1. Spawn due groups.
        systems::spawn::run(
            &mut self.world,
            &mut self.schedule,
            self.time.tick,
            &mut self.next_target_id,
            &self.command_post,
            &mut self.events,
            &mut self.tally,
        );

        // 2. Target phase.
        systems::targets::run(
            &mut self.world,
            &self.bounds,
            &self.command_post,
            dt,
            &mut self.events,
            &mut self.tally,
        );

        // 3. Missile phase.
        let hits = systems::missiles::run(
            &mut self.world,
            &self.bounds,
            dt,
            &mut self.events,
            &mut self.tally,
        );

        // 4. Apply accumulated hits, then fold missiles whose target is gone.
        self.apply_hits(&hits);
        self.retire_orphans();

        // 5. Sensor phase: union of detections over post-movement state.
        let detections = systems::sensors::run(&self.world);

        // 6. Command-post phase. Newborn missiles first integrate next tick.
        systems::fire_control::run(
            &mut self.world,
            &mut self.command_post,
            &detections,
            &self.missile_defaults,
            now_s,
            &mut self.next_missile_id,
            &mut self.events,
            &mut self.tally,
        );

        // 7. Advance, observe, sweep, and check termination.
        self.time.advance();
        let snapshot = self.snapshot();
        systems::cleanup::run(&mut self.world, &mut self.despawn_buffer);
        self.update_finished();

        snapshot
    }

    /// Run to termination and return the final tally.
    pub fn run(&mut self) -> RunTally {
        while !self.finished {
            self.tick();
        }
        self.tally
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn tally(&self) -> RunTally {
        self.tally
    }

    /// The assignment ledger as sorted (target id, missile ids) pairs.
    pub fn assignments(&self) -> Vec<(u32, Vec<u32>)> {
        self.command_post.entries()
    }

    /// Read-only access to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Apply this tick's accumulated hits. All hits against a target land
    /// together; a kill on an already-consumed target is a no-op, except that
    /// a hit landed in the same tick as a breakthrough converts it to a kill.
    pub(crate) fn apply_hits(&mut self, hits: &BTreeMap<u32, u32>) {
        if hits.is_empty() {
            return;
        }

        for (&target_id, &count) in hits {
            self.events.push(SimEvent::TargetHit {
                target_id,
                hits: count,
            });
        }

        let mut killed: Vec<u32> = Vec::new();
        for (_entity, (_threat, state)) in self.world.query_mut::<(&Threat, &mut ThreatState)>() {
            let Some(&count) = hits.get(&state.id) else {
                continue;
            };
            match state.disposition {
                Disposition::Inbound | Disposition::BrokenThrough => {
                    state.endurance = state.endurance.saturating_sub(count);
                    if state.endurance == 0 {
                        if state.disposition == Disposition::BrokenThrough {
                            // The hit wins over a same-tick breakthrough.
                            self.tally.targets_broken_through -= 1;
                        }
                        state.disposition = Disposition::Killed;
                        killed.push(state.id);
                    }
                }
                Disposition::Killed | Disposition::Departed => {}
            }
        }

        killed.sort_unstable();
        for target_id in killed {
            self.tally.targets_killed += 1;
            self.events.push(SimEvent::TargetKilled { target_id });
            debug!(target = target_id, "target killed");
        }
    }

    /// Terminate missiles whose target was consumed this tick, whether by
    /// kill, breakthrough, or departure.
    fn retire_orphans(&mut self) {
        let alive: std::collections::BTreeSet<u32> = {
            let mut query = self.world.query::<(&Threat, &ThreatState)>();
            query
                .iter()
                .filter(|(_, (_, state))| state.disposition.is_alive())
                .map(|(_, (_, state))| state.id)
                .collect()
        };

        let mut orphans: Vec<(hecs::Entity, u32)> = {
            let mut query = self.world.query::<(&Interceptor, &MissileState)>();
            query
                .iter()
                .filter(|(_, (_, missile))| {
                    missile.phase != MissilePhase::Terminated && !alive.contains(&missile.target_id)
                })
                .map(|(entity, (_, missile))| (entity, missile.id))
                .collect()
        };
        orphans.sort_by_key(|&(_, id)| id);

        for (entity, _id) in orphans {
            if let Ok(missile) = self.world.query_one_mut::<&mut MissileState>(entity) {
                systems::missiles::terminate(
                    missile,
                    palisade_core::enums::MissileEndReason::TargetLost,
                    &mut self.events,
                    &mut self.tally,
                );
            }
        }
    }

    fn snapshot(&mut self) -> TickSnapshot {
        let events = std::mem::take(&mut self.events);
        systems::snapshot::build(
            &self.world,
            &self.time,
            &self.command_post,
            events,
            &self.tally,
        )
    }

    fn update_finished(&mut self) {
        let threats_remain = {
            let mut query = self.world.query::<&Threat>();
            query.iter().next().is_some()
        };
        let out_of_time = self.time.tick >= self.t_max_ticks;
        let resolved = !threats_remain && self.schedule.all_spawned();

        if (out_of_time || resolved) && !self.finished {
            self.finished = true;
            info!(
                ticks = self.time.tick,
                killed = self.tally.targets_killed,
                broken_through = self.tally.targets_broken_through,
                departed = self.tally.targets_departed,
                fired = self.tally.missiles_fired,
                "simulation finished"
            );
        }
    }

    /// Spawn a lone target, bypassing the group schedule (for tests).
    #[cfg(test)]
    pub fn spawn_test_target(
        &mut self,
        pos: palisade_core::geometry::Vec3,
        vel: palisade_core::geometry::Vec3,
        endurance: u32,
    ) -> u32 {
        let id = self.next_target_id;
        self.next_target_id += 1;
        self.world.spawn((
            Threat,
            ThreatState {
                id,
                endurance,
                disposition: Disposition::Inbound,
            },
            Position(pos),
            palisade_core::components::Velocity(vel),
        ));
        self.tally.targets_spawned += 1;
        id
    }

    /// Spawn an in-flight missile with the scenario's performance defaults,
    /// registered in the ledger (for tests).
    #[cfg(test)]
    pub fn spawn_test_missile(
        &mut self,
        pos: palisade_core::geometry::Vec3,
        vel: palisade_core::geometry::Vec3,
        target_id: u32,
    ) -> u32 {
        let id = self.next_missile_id;
        self.next_missile_id += 1;
        self.world.spawn((
            Interceptor,
            MissileState {
                id,
                target_id,
                launcher_id: 0,
                phase: MissilePhase::Cruise,
                prev_miss_distance: None,
                miss_increase_streak: 0,
                end_reason: None,
            },
            self.missile_defaults,
            Position(pos),
            palisade_core::components::Velocity(vel),
        ));
        self.command_post.commit(target_id, id);
        self.tally.missiles_fired += 1;
        id
    }
}

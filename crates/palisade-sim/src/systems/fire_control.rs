//! Command-post phase — ledger maintenance, threat prioritization, and
//! launcher assignment.
//!
//! Steps, in order: prune the ledger, rank the detected threats by urgency,
//! compute each threat's missile deficit, pick launchers, and fire. A
//! launcher fires at most once per tick; unmet deficit carries over to
//! future ticks.

use std::collections::BTreeSet;

use hecs::World;
use tracing::debug;

use palisade_core::components::{
    Interceptor, LauncherSite, MissilePerformance, MissileState, Position, Threat, ThreatState,
    Velocity,
};
use palisade_core::enums::MissilePhase;
use palisade_core::events::SimEvent;
use palisade_core::geometry::Vec3;
use palisade_core::state::RunTally;

use crate::allocator::{rank_targets, CommandPost, TargetDemand};

/// One eligible launcher, as captured at the start of the assignment pass.
struct ReadyLauncher {
    entity: hecs::Entity,
    id: u32,
    pos: Vec3,
    cooldown_remaining_s: f64,
}

/// Run the command-post phase for one tick.
#[allow(clippy::too_many_arguments)]
pub fn run(
    world: &mut World,
    command_post: &mut CommandPost,
    detections: &BTreeSet<u32>,
    missile_defaults: &MissilePerformance,
    now_s: f64,
    next_missile_id: &mut u32,
    events: &mut Vec<SimEvent>,
    tally: &mut RunTally,
) {
    // Step A: ledger maintenance — drop consumed targets and missiles that
    // are no longer in flight.
    let live_targets: BTreeSet<u32> = {
        let mut query = world.query::<(&Threat, &ThreatState)>();
        query
            .iter()
            .filter(|(_, (_, state))| state.disposition.is_alive())
            .map(|(_, (_, state))| state.id)
            .collect()
    };
    let live_missiles: BTreeSet<u32> = {
        let mut query = world.query::<(&Interceptor, &MissileState)>();
        query
            .iter()
            .filter(|(_, (_, missile))| missile.phase != MissilePhase::Terminated)
            .map(|(_, (_, missile))| missile.id)
            .collect()
    };
    command_post.retain_live(&live_targets, &live_missiles);

    // Step B: priority order over the detected, still-living targets.
    let mut demands: Vec<TargetDemand> = Vec::new();
    {
        let mut query = world.query::<(&Threat, &ThreatState, &Position, &Velocity)>();
        for (_entity, (_threat, state, pos, vel)) in query.iter() {
            if !state.disposition.is_alive() || !detections.contains(&state.id) {
                continue;
            }
            demands.push(TargetDemand {
                target_id: state.id,
                tgo_s: command_post.time_to_go(pos.0, vel.0.norm()),
                distance_xy_m: pos.0.distance_xy_to(command_post.position),
                endurance: state.endurance,
                position: pos.0,
            });
        }
    }
    rank_targets(&mut demands);

    // Step D precomputation: the launchers able to fire this tick, id-sorted.
    let mut ready: Vec<ReadyLauncher> = Vec::new();
    {
        let mut query = world.query::<(&LauncherSite, &Position)>();
        for (entity, (launcher, pos)) in query.iter() {
            if launcher.can_fire(now_s) {
                ready.push(ReadyLauncher {
                    entity,
                    id: launcher.id,
                    pos: pos.0,
                    cooldown_remaining_s: launcher.cooldown_remaining(now_s),
                });
            }
        }
    }
    ready.sort_by_key(|launcher| launcher.id);

    // Steps C–E: fill each target's deficit, most urgent first.
    'demand: for demand in &demands {
        let cap = command_post.max_assignable(demand.endurance);
        let deficit = cap.saturating_sub(command_post.assigned(demand.target_id));

        for _ in 0..deficit {
            if ready.is_empty() {
                break 'demand;
            }

            // Shortest remaining cooldown first (zero for every launcher
            // eligible this tick), then 3-D distance to the target, then id.
            let best = ready
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.cooldown_remaining_s
                        .total_cmp(&b.cooldown_remaining_s)
                        .then(
                            a.pos
                                .distance_to(demand.position)
                                .total_cmp(&b.pos.distance_to(demand.position)),
                        )
                        .then(a.id.cmp(&b.id))
                })
                .map(|(index, _)| index);
            let Some(index) = best else { break 'demand };

            // One launch per launcher per tick.
            let launcher = ready.swap_remove(index);
            fire(
                world,
                command_post,
                &launcher,
                demand,
                missile_defaults,
                now_s,
                next_missile_id,
                events,
                tally,
            );
        }
    }
}

/// Step E: expend a round, spawn the missile, and record the assignment.
/// The newborn missile first integrates next tick.
#[allow(clippy::too_many_arguments)]
fn fire(
    world: &mut World,
    command_post: &mut CommandPost,
    launcher: &ReadyLauncher,
    demand: &TargetDemand,
    missile_defaults: &MissilePerformance,
    now_s: f64,
    next_missile_id: &mut u32,
    events: &mut Vec<SimEvent>,
    tally: &mut RunTally,
) {
    if let Ok(site) = world.query_one_mut::<&mut LauncherSite>(launcher.entity) {
        site.magazine -= 1;
        site.cooldown_until_s = now_s + site.cooldown_s;
    }

    let missile_id = *next_missile_id;
    *next_missile_id += 1;

    let heading = (demand.position - launcher.pos).unit_or(Vec3::UNIT_X);
    let velocity = heading * missile_defaults.initial_speed;

    world.spawn((
        Interceptor,
        MissileState {
            id: missile_id,
            target_id: demand.target_id,
            launcher_id: launcher.id,
            phase: MissilePhase::Cruise,
            prev_miss_distance: None,
            miss_increase_streak: 0,
            end_reason: None,
        },
        *missile_defaults,
        Position(launcher.pos),
        Velocity(velocity),
    ));

    command_post.commit(demand.target_id, missile_id);
    tally.missiles_fired += 1;
    events.push(SimEvent::MissileAway {
        missile_id,
        launcher_id: launcher.id,
        target_id: demand.target_id,
    });
    debug!(
        missile = missile_id,
        launcher = launcher.id,
        target = demand.target_id,
        "missile away"
    );
}

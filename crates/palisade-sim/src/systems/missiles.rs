//! Missile phase — guidance, kinematic integration, and the
//! collision/self-destruct state machine.
//!
//! The per-missile update order is mandated and observable:
//! guidance → acceleration saturation → velocity integration and speed clip →
//! turn-rate clip (magnitude preserved) → position integration and Z clamp →
//! collision evaluation. Missiles are traversed in id order and write only
//! their own state; hits are accumulated per target and applied by the
//! engine afterwards.

use std::collections::BTreeMap;

use hecs::World;
use tracing::{debug, warn};

use palisade_core::components::{
    Interceptor, MissilePerformance, MissileState, Position, Threat, ThreatState, Velocity,
};
use palisade_core::enums::{Disposition, MissileEndReason, MissilePhase};
use palisade_core::events::SimEvent;
use palisade_core::geometry::{rotate_toward, Vec3};
use palisade_core::state::RunTally;
use palisade_core::types::WorldBounds;

use crate::guidance;

/// Target state as seen by missiles this tick: the post-movement snapshot
/// from the target phase.
#[derive(Debug, Clone, Copy)]
struct TargetTrack {
    pos: Vec3,
    vel: Vec3,
    disposition: Disposition,
}

/// Run the six-step update for every in-flight missile. Returns the hits
/// scored this tick, keyed by target id.
pub fn run(
    world: &mut World,
    bounds: &WorldBounds,
    dt: f64,
    events: &mut Vec<SimEvent>,
    tally: &mut RunTally,
) -> BTreeMap<u32, u32> {
    let mut hits: BTreeMap<u32, u32> = BTreeMap::new();

    let mut tracks: BTreeMap<u32, TargetTrack> = BTreeMap::new();
    {
        let mut query = world.query::<(&Threat, &ThreatState, &Position, &Velocity)>();
        for (_entity, (_threat, state, pos, vel)) in query.iter() {
            tracks.insert(
                state.id,
                TargetTrack {
                    pos: pos.0,
                    vel: vel.0,
                    disposition: state.disposition,
                },
            );
        }
    }

    let mut order: Vec<(hecs::Entity, u32)> = Vec::new();
    {
        let mut query = world.query::<(&Interceptor, &MissileState)>();
        for (entity, (_interceptor, missile)) in query.iter() {
            if missile.phase != MissilePhase::Terminated {
                order.push((entity, missile.id));
            }
        }
    }
    order.sort_by_key(|&(_, id)| id);

    for (entity, _id) in order {
        let Ok((missile, pos, vel, perf)) = world.query_one_mut::<(
            &mut MissileState,
            &mut Position,
            &mut Velocity,
            &MissilePerformance,
        )>(entity) else {
            continue;
        };

        let Some(track) = tracks.get(&missile.target_id).copied() else {
            terminate(missile, MissileEndReason::TargetLost, events, tally);
            continue;
        };

        // (a) guidance, (b) acceleration saturation
        let accel = guidance::commanded_acceleration(
            pos.0,
            vel.0,
            track.pos,
            track.vel,
            perf.pn_gain,
            perf.max_accel,
        )
        .saturate(perf.max_accel);

        // (c) velocity integration, then speed clip
        let prev_heading = vel.0.unit_or(Vec3::UNIT_X);
        let mut new_vel = (vel.0 + accel * dt).saturate(perf.max_speed);

        // (d) turn-rate clip after the speed clip, so an over-commanded turn
        // does not leak across it. Magnitude preserved.
        let speed = new_vel.norm();
        let desired_heading = new_vel.unit_or(prev_heading);
        new_vel = rotate_toward(prev_heading, desired_heading, perf.max_turn_rate * dt) * speed;

        // (e) position integration and Z clamp
        let mut new_pos = pos.0 + new_vel * dt;
        bounds.clamp_z(&mut new_pos);

        if !new_pos.is_finite() || !new_vel.is_finite() {
            warn!(missile = missile.id, "non-finite missile state, destroying");
            terminate(missile, MissileEndReason::Diverged, events, tally);
            continue;
        }

        pos.0 = new_pos;
        vel.0 = new_vel;

        // (f) collision & self-destruct
        let miss_distance = new_pos.distance_to(track.pos);

        match track.disposition {
            // Consumed without a chance of credit: the missile folds.
            Disposition::Killed | Disposition::Departed => {
                terminate(missile, MissileEndReason::TargetLost, events, tally);
            }
            // A target that broke through this same tick can still be hit;
            // the hit wins over the breakthrough.
            Disposition::Inbound | Disposition::BrokenThrough => {
                if miss_distance <= perf.intercept_radius {
                    *hits.entry(missile.target_id).or_insert(0) += 1;
                    missile.phase = MissilePhase::Terminated;
                    missile.end_reason = Some(MissileEndReason::Intercept);
                    tally.missiles_hit += 1;
                    debug!(
                        missile = missile.id,
                        target = missile.target_id,
                        "intercept"
                    );
                } else if miss_distance <= perf.endgame_radius() {
                    missile.phase = MissilePhase::Endgame;
                    let growing = missile
                        .prev_miss_distance
                        .is_some_and(|prev| miss_distance > prev);
                    if growing {
                        missile.miss_increase_streak += 1;
                    } else {
                        missile.miss_increase_streak = 0;
                    }
                    if missile.miss_increase_streak >= perf.endgame_miss_increase_ticks {
                        terminate(missile, MissileEndReason::Overshoot, events, tally);
                    }
                } else if !bounds.contains_xy(new_pos) {
                    terminate(missile, MissileEndReason::LeftRegion, events, tally);
                }
            }
        }

        missile.prev_miss_distance = Some(miss_distance);
    }

    hits
}

pub(crate) fn terminate(
    missile: &mut MissileState,
    reason: MissileEndReason,
    events: &mut Vec<SimEvent>,
    tally: &mut RunTally,
) {
    missile.phase = MissilePhase::Terminated;
    missile.end_reason = Some(reason);
    tally.missiles_lost += 1;
    events.push(SimEvent::MissileLost {
        missile_id: missile.id,
        reason,
    });
    debug!(missile = missile.id, ?reason, "missile lost");
}

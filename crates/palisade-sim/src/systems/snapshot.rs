//! Snapshot system: builds the per-tick observable state from the world.
//!
//! Read-only over the world; every view list is sorted by id so the snapshot
//! serialization is the determinism surface.

use hecs::World;

use palisade_core::components::{
    Interceptor, LauncherSite, MissileState, Position, Threat, ThreatState, Velocity,
};
use palisade_core::state::{LauncherView, MissileView, RunTally, TargetView, TickSnapshot};
use palisade_core::types::SimTime;

use crate::allocator::CommandPost;
use palisade_core::events::SimEvent;

/// Build a complete snapshot of the current world state.
pub fn build(
    world: &World,
    time: &SimTime,
    command_post: &CommandPost,
    events: Vec<SimEvent>,
    tally: &RunTally,
) -> TickSnapshot {
    let now_s = time.seconds();

    let mut targets: Vec<TargetView> = {
        let mut query = world.query::<(&Threat, &ThreatState, &Position, &Velocity)>();
        query
            .iter()
            .map(|(_, (_, state, pos, vel))| TargetView {
                id: state.id,
                position: pos.0,
                velocity: vel.0,
                endurance: state.endurance,
                disposition: state.disposition,
            })
            .collect()
    };
    targets.sort_by_key(|t| t.id);

    let mut missiles: Vec<MissileView> = {
        let mut query = world.query::<(&Interceptor, &MissileState, &Position, &Velocity)>();
        query
            .iter()
            .map(|(_, (_, missile, pos, vel))| MissileView {
                id: missile.id,
                target_id: missile.target_id,
                launcher_id: missile.launcher_id,
                position: pos.0,
                velocity: vel.0,
                phase: missile.phase,
                end_reason: missile.end_reason,
            })
            .collect()
    };
    missiles.sort_by_key(|m| m.id);

    let mut launchers: Vec<LauncherView> = {
        let mut query = world.query::<&LauncherSite>();
        query
            .iter()
            .map(|(_, launcher)| LauncherView {
                id: launcher.id,
                magazine: launcher.magazine,
                cooldown_remaining_s: launcher.cooldown_remaining(now_s),
            })
            .collect()
    };
    launchers.sort_by_key(|l| l.id);

    TickSnapshot {
        tick: time.tick,
        time_s: now_s,
        targets,
        missiles,
        launchers,
        assignments: command_post.entries(),
        events,
        tally: *tally,
    }
}

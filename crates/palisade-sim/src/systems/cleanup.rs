//! Cleanup system: despawns consumed targets and terminated missiles at the
//! end of each tick. Uses a pre-allocated buffer to avoid per-tick
//! allocation.

use hecs::{Entity, World};

use palisade_core::components::{Interceptor, MissileState, Threat, ThreatState};
use palisade_core::enums::MissilePhase;

/// Remove entities that reached a terminal state this tick.
pub fn run(world: &mut World, despawn_buffer: &mut Vec<Entity>) {
    despawn_buffer.clear();

    for (entity, (_threat, state)) in world.query_mut::<(&Threat, &ThreatState)>() {
        if !state.disposition.is_alive() {
            despawn_buffer.push(entity);
        }
    }

    for (entity, (_interceptor, missile)) in world.query_mut::<(&Interceptor, &MissileState)>() {
        if missile.phase == MissilePhase::Terminated {
            despawn_buffer.push(entity);
        }
    }

    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
}

//! Target phase — constant-velocity advance and disposition evaluation.
//!
//! Targets are traversed in id order. Endurance is never decremented here;
//! hits are accumulated in the missile phase and applied by the engine.

use hecs::World;
use tracing::debug;

use palisade_core::components::{Position, Threat, ThreatState, Velocity};
use palisade_core::enums::Disposition;
use palisade_core::events::SimEvent;
use palisade_core::state::RunTally;
use palisade_core::types::WorldBounds;

use crate::allocator::CommandPost;

/// Advance every living target by one tick and evaluate its disposition:
/// killed stays killed, then breakthrough, then region exit.
pub fn run(
    world: &mut World,
    bounds: &WorldBounds,
    command_post: &CommandPost,
    dt: f64,
    events: &mut Vec<SimEvent>,
    tally: &mut RunTally,
) {
    let mut order: Vec<(hecs::Entity, u32)> = Vec::new();
    {
        let mut query = world.query::<(&Threat, &ThreatState)>();
        for (entity, (_threat, state)) in query.iter() {
            if state.disposition.is_alive() {
                order.push((entity, state.id));
            }
        }
    }
    order.sort_by_key(|&(_, id)| id);

    for (entity, _id) in order {
        let Ok((state, pos, vel)) =
            world.query_one_mut::<(&mut ThreatState, &mut Position, &Velocity)>(entity)
        else {
            continue;
        };

        pos.0 += vel.0 * dt;
        bounds.clamp_z(&mut pos.0);

        // A kill is finalized in the collision phase that produced it; the
        // target phase never demotes from killed.
        if state.endurance == 0 {
            continue;
        }

        if pos.0.distance_xy_to(command_post.position) <= command_post.arrival_radius_m {
            state.disposition = Disposition::BrokenThrough;
            tally.targets_broken_through += 1;
            events.push(SimEvent::Breakthrough { target_id: state.id });
            debug!(target = state.id, "target broke through");
        } else if !bounds.contains_xy(pos.0) {
            state.disposition = Disposition::Departed;
            tally.targets_departed += 1;
            events.push(SimEvent::TargetDeparted { target_id: state.id });
            debug!(target = state.id, "target left the region");
        }
    }
}

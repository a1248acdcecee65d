//! Events emitted by the simulation, drained into each tick's snapshot.

use serde::{Deserialize, Serialize};

use crate::enums::MissileEndReason;

/// One notable occurrence during a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// An enemy group materialized.
    GroupSpawned { group: String, count: u32, tick: u64 },
    /// A launcher fired an interceptor.
    MissileAway {
        missile_id: u32,
        launcher_id: u32,
        target_id: u32,
    },
    /// A target took one or more hits this tick.
    TargetHit { target_id: u32, hits: u32 },
    /// A target's endurance reached zero.
    TargetKilled { target_id: u32 },
    /// A target entered the command post's arrival radius.
    Breakthrough { target_id: u32 },
    /// A target left the simulation region.
    TargetDeparted { target_id: u32 },
    /// An interceptor terminated without scoring a hit.
    MissileLost {
        missile_id: u32,
        reason: MissileEndReason,
    },
}

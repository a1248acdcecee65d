//! Per-tick snapshot — the complete observable state after a tick.
//!
//! Snapshots are the determinism surface: two runs of the same scenario must
//! produce byte-identical snapshot serializations. Every view list is sorted
//! by id.

use serde::{Deserialize, Serialize};

use crate::enums::{Disposition, MissileEndReason, MissilePhase};
use crate::events::SimEvent;
use crate::geometry::Vec3;

/// Complete observable state at the end of a tick.
///
/// Built after the command-post phase and before consumed entities are
/// despawned, so a terminal disposition is visible for exactly one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub time_s: f64,
    pub targets: Vec<TargetView>,
    pub missiles: Vec<MissileView>,
    pub launchers: Vec<LauncherView>,
    /// Assignment ledger: (target id, in-flight missile ids), both sorted.
    pub assignments: Vec<(u32, Vec<u32>)>,
    /// Events that occurred during this tick.
    pub events: Vec<SimEvent>,
    pub tally: RunTally,
}

/// One target as observed at the end of a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetView {
    pub id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub endurance: u32,
    pub disposition: Disposition,
}

/// One interceptor as observed at the end of a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissileView {
    pub id: u32,
    pub target_id: u32,
    pub launcher_id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub phase: MissilePhase,
    pub end_reason: Option<MissileEndReason>,
}

/// One launcher as observed at the end of a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherView {
    pub id: u32,
    pub magazine: u32,
    /// Seconds until the launcher may fire again (0 when ready).
    pub cooldown_remaining_s: f64,
}

/// Running outcome counters for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    pub targets_spawned: u32,
    pub targets_killed: u32,
    pub targets_broken_through: u32,
    pub targets_departed: u32,
    pub missiles_fired: u32,
    pub missiles_hit: u32,
    /// Missiles terminated without a hit, for any reason.
    pub missiles_lost: u32,
}

//! ECS components for hecs entities.
//!
//! Components are plain data structs with no behavior; the phase systems in
//! the sim crate hold all the logic.

use serde::{Deserialize, Serialize};

use crate::enums::{Disposition, MissileEndReason, MissilePhase};
use crate::geometry::Vec3;

/// World position in meters. x = East, y = North, z = altitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec3);

/// Velocity in m/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

/// Marks an entity as an inbound threat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Threat;

/// Marks an entity as a friendly interceptor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Interceptor;

/// Mutable state of an inbound target.
///
/// Velocity is fixed at spawn; the target flies a straight course until it is
/// consumed. Endurance is decremented by the engine when hits are applied,
/// never by the target itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatState {
    /// Stable id, unique among targets for the whole run.
    pub id: u32,
    /// Remaining hit points.
    pub endurance: u32,
    pub disposition: Disposition,
}

/// Performance envelope of one interceptor. Copied from the scenario's
/// missile defaults at launch; all rates are in radians internally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MissilePerformance {
    /// Speed at launch (m/s).
    pub initial_speed: f64,
    /// Speed ceiling (m/s).
    pub max_speed: f64,
    /// Commanded-acceleration ceiling (m/s²).
    pub max_accel: f64,
    /// Heading-change ceiling (rad/s).
    pub max_turn_rate: f64,
    /// Proximity at which a hit is scored (meters).
    pub intercept_radius: f64,
    /// Proportional-navigation gain.
    pub pn_gain: f64,
    /// Endgame band as a multiple of the intercept radius.
    pub endgame_factor: f64,
    /// Consecutive miss-distance increases tolerated in the endgame.
    pub endgame_miss_increase_ticks: u32,
}

impl MissilePerformance {
    /// Outer radius of the endgame band (meters).
    pub fn endgame_radius(&self) -> f64 {
        self.endgame_factor * self.intercept_radius
    }
}

/// Mutable state of one interceptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissileState {
    /// Stable id, unique among missiles for the whole run.
    pub id: u32,
    /// Target this missile is committed to.
    pub target_id: u32,
    /// Launcher that fired it.
    pub launcher_id: u32,
    pub phase: MissilePhase,
    /// Distance to the target at the end of the previous collision
    /// evaluation. `None` until the first evaluation.
    pub prev_miss_distance: Option<f64>,
    /// Consecutive endgame ticks with growing miss distance.
    pub miss_increase_streak: u32,
    /// Set when the missile terminates.
    pub end_reason: Option<MissileEndReason>,
}

/// A stationary sensor. Stateless beyond configuration: each tick it reports
/// every living target within `range_m` (3-D, no noise, no occlusion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSite {
    pub id: u32,
    pub range_m: f64,
}

/// A stationary launcher with a finite magazine and a post-fire cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherSite {
    pub id: u32,
    /// Rounds remaining.
    pub magazine: u32,
    pub cooldown_s: f64,
    /// Absolute time before which the launcher may not fire again.
    /// `NEG_INFINITY` for an initially cooled launcher.
    pub cooldown_until_s: f64,
}

impl LauncherSite {
    /// Ready to fire: rounds remaining and cooldown elapsed.
    pub fn can_fire(&self, now_s: f64) -> bool {
        self.magazine > 0 && now_s >= self.cooldown_until_s
    }

    /// Remaining cooldown at `now_s`, clamped at zero.
    pub fn cooldown_remaining(&self, now_s: f64) -> f64 {
        (self.cooldown_until_s - now_s).max(0.0)
    }
}

//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an inbound target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Alive and flying its straight course toward the command post.
    #[default]
    Inbound,
    /// Endurance exhausted by interceptor hits.
    Killed,
    /// Entered the command post's arrival radius.
    BrokenThrough,
    /// Left the simulation region.
    Departed,
}

impl Disposition {
    /// Whether the target still participates in the simulation.
    pub fn is_alive(self) -> bool {
        self == Disposition::Inbound
    }
}

/// Interceptor flight phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissilePhase {
    /// Closing on the target under proportional navigation.
    #[default]
    Cruise,
    /// Within the endgame band; the miss-distance streak test is armed.
    /// Sticky once entered.
    Endgame,
    /// Flight over, for any reason.
    Terminated,
}

/// Why a terminated missile ended its flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissileEndReason {
    /// Came within the intercept radius and scored a hit.
    Intercept,
    /// Miss distance grew for too many consecutive endgame ticks.
    Overshoot,
    /// The target was consumed by something else.
    TargetLost,
    /// Flew out of the simulation region.
    LeftRegion,
    /// Numeric state went non-finite; destroyed by the safety net.
    Diverged,
}

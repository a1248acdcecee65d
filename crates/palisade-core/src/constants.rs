//! Simulation constants and scenario defaults.

// --- World bounds ---

/// Half-extent of the default XY region (meters).
pub const REGION_HALF_EXTENT_M: f64 = 1_000_000.0;

/// Altitude floor (meters).
pub const Z_MIN_M: f64 = 0.0;

/// Altitude ceiling (meters). Positions are clamped to this after movement.
pub const Z_MAX_M: f64 = 5_000.0;

// --- Simulation defaults ---

/// Default tick period in seconds.
pub const DEFAULT_DT_S: f64 = 0.1;

// --- Launcher defaults ---

/// Default magazine size per launcher.
pub const DEFAULT_MISSILES_LOADED: u32 = 4;

/// Default post-fire cooldown (seconds).
pub const DEFAULT_COOLDOWN_S: f64 = 5.0;

// --- Guidance defaults ---

/// Default proportional-navigation gain (dimensionless, typically 3-4).
pub const DEFAULT_PN_GAIN: f64 = 3.5;

/// Default endgame band as a multiple of the intercept radius.
pub const DEFAULT_ENDGAME_FACTOR: f64 = 2.0;

/// Default number of consecutive miss-distance increases before an
/// endgame missile gives up and self-destructs.
pub const DEFAULT_ENDGAME_MISS_INCREASE_TICKS: u32 = 3;

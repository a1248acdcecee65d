//! Guidance laws for interceptors.
//!
//! True 3-D proportional navigation: the commanded acceleration is
//! proportional to the closing speed and the line-of-sight rotation rate,
//! applied perpendicular to the line of sight. Saturation and the turn-rate
//! clip are applied by the missile system, not here.

use palisade_core::geometry::Vec3;

/// Commanded acceleration for one guidance step.
///
/// `a = N · v_c · (Ω × r̂)` with `Ω = (r × v_rel) / |r|²` and `v_c` the
/// closing speed along the line of sight. Returns zero for a degenerate
/// (zero-length) line of sight. When the engagement is opening (`v_c <= 0`)
/// proportional navigation has nothing to work with, so the command falls
/// back to maximum acceleration straight down the line of sight.
pub fn commanded_acceleration(
    missile_pos: Vec3,
    missile_vel: Vec3,
    target_pos: Vec3,
    target_vel: Vec3,
    gain: f64,
    max_accel: f64,
) -> Vec3 {
    let los = target_pos - missile_pos;
    let range_sq = los.norm_sq();
    if range_sq < 1e-12 {
        return Vec3::ZERO;
    }
    let range = range_sq.sqrt();
    let los_hat = los / range;

    let v_rel = target_vel - missile_vel;
    let v_closing = -v_rel.dot(los_hat);
    if v_closing <= 0.0 {
        return los_hat * max_accel;
    }

    let omega = los.cross(v_rel) / range_sq;
    omega.cross(los_hat) * (gain * v_closing)
}

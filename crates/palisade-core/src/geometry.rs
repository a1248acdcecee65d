//! 3-D vector geometry used by every moving agent.
//!
//! All internal angles are radians; degrees appear only at scenario and log
//! boundaries via [`deg_to_rad`] / [`rad_to_deg`].

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 3-D vector in simulation space.
///
/// Used for positions (meters), velocities (m/s), and accelerations (m/s²).
/// x = East, y = North, z = Up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Unit vector along +X, the fallback heading for degenerate directions.
    pub const UNIT_X: Vec3 = Vec3 {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Magnitude.
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn norm_sq(self) -> f64 {
        self.dot(self)
    }

    /// Magnitude of the XY projection (plan-view distance/speed).
    pub fn norm_xy(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// 3-D distance to another point.
    pub fn distance_to(self, other: Vec3) -> f64 {
        (other - self).norm()
    }

    /// Plan-view distance to another point, ignoring altitude.
    pub fn distance_xy_to(self, other: Vec3) -> f64 {
        (other - self).norm_xy()
    }

    /// Unit vector, or `None` for a (near-)zero vector.
    pub fn try_unit(self) -> Option<Vec3> {
        let mag = self.norm();
        if mag > 1e-12 {
            Some(self / mag)
        } else {
            None
        }
    }

    /// Unit vector, falling back to `fallback` for a zero vector.
    pub fn unit_or(self, fallback: Vec3) -> Vec3 {
        self.try_unit().unwrap_or(fallback)
    }

    /// Magnitude saturation: `v · min(1, limit/|v|)`. The zero vector is
    /// returned unchanged.
    pub fn saturate(self, limit: f64) -> Vec3 {
        let mag = self.norm();
        if mag > limit && mag > 0.0 {
            self * (limit / mag)
        } else {
            self
        }
    }

    /// Some unit vector perpendicular to `self`. Used as a rotation axis when
    /// the from/to headings are anti-parallel and the cross product vanishes.
    fn any_perpendicular(self) -> Vec3 {
        self.cross(Vec3::UNIT_X)
            .try_unit()
            .or_else(|| self.cross(Vec3::new(0.0, 1.0, 0.0)).try_unit())
            .unwrap_or(Vec3::UNIT_X)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Rotate the unit heading `from` toward the unit heading `to`, turning by at
/// most `max_angle` radians about the axis perpendicular to both.
///
/// Returns `to` when the separation is within the limit. When the headings
/// are anti-parallel the rotation axis is arbitrary (any perpendicular).
pub fn rotate_toward(from: Vec3, to: Vec3, max_angle: f64) -> Vec3 {
    let cos = from.dot(to).clamp(-1.0, 1.0);
    let angle = cos.acos();
    if angle <= max_angle || angle < 1e-9 {
        return to;
    }

    let axis = from
        .cross(to)
        .try_unit()
        .unwrap_or_else(|| from.any_perpendicular());

    // Rodrigues rotation; the axis is perpendicular to `from`, so the
    // projection term drops out.
    from * max_angle.cos() + axis.cross(from) * max_angle.sin()
}

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians.to_degrees()
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Vec3) {
        *self = *self + other;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, scalar: f64) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;

    fn div(self, scalar: f64) -> Vec3 {
        Vec3::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

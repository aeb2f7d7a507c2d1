use std::ops::{Add, Mul, Neg, Sub};

use glam::Vec3;

/// A surface normal.
///
/// Normals are kept distinct from vectors because they transform with the inverse transpose of
/// a transformation, see [super::transform::Transform].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Normal(pub Vec3);

impl Normal {
    pub const ZERO: Normal = Normal(Vec3::ZERO);

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn vec(self) -> Vec3 {
        self.0
    }

    pub fn normalize(self) -> Self {
        Self(self.0.normalize())
    }

    pub fn length_squared(self) -> f32 {
        self.0.length_squared()
    }

    pub fn dot(self, v: Vec3) -> f32 {
        self.0.dot(v)
    }

    pub fn abs(self) -> Vec3 {
        self.0.abs()
    }

    /// Flips the normal so that it lies in the same hemisphere as `v`
    pub fn face_forward(self, v: Vec3) -> Self {
        if self.dot(v) < 0.0 {
            -self
        } else {
            self
        }
    }
}

impl From<Vec3> for Normal {
    fn from(value: Vec3) -> Self {
        Self(value)
    }
}

impl Neg for Normal {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Add for Normal {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Normal {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f32> for Normal {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Mul<Normal> for f32 {
    type Output = Normal;

    fn mul(self, rhs: Normal) -> Self::Output {
        Normal(self * rhs.0)
    }
}

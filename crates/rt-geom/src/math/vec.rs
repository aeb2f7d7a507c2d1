pub use glam::{Vec2, Vec3};

use super::{float::FloatAsExt, frame::Frame, normal::Normal};

pub trait Vec3SameDirExt {
    fn same_direction(self, other: Self) -> Self;
}

impl Vec3SameDirExt for Vec3 {
    /// Return self if self and other are pointing in the same general direction
    /// (self.dot(other) >= 0.0) else, returns -self
    fn same_direction(self, other: Self) -> Self {
        if self.dot(other) < 0.0 {
            -self
        } else {
            self
        }
    }
}

pub trait Vec3AsNonZero: Sized {
    fn into_non_zero(self, eps: f32) -> Option<Self>;
}

impl Vec3AsNonZero for Vec3 {
    fn into_non_zero(self, eps: f32) -> Option<Self> {
        self.length_squared().into_non_zero(eps * eps).and(Some(self))
    }
}

pub trait Vec3GeomExt {
    /// Index of the component with the largest absolute value
    fn max_dimension(self) -> usize;

    /// Returns `(self[x], self[y], self[z])`
    fn permute(self, x: usize, y: usize, z: usize) -> Self;

    /// Builds two vectors that form an orthonormal basis with the normalized `self`
    fn coordinate_system(self) -> (Vec3, Vec3);

    fn abs_dot(self, other: Self) -> f32;
}

impl Vec3GeomExt for Vec3 {
    fn max_dimension(self) -> usize {
        let Vec3 { x, y, z } = self.abs();
        if x > y {
            if x > z {
                0
            } else {
                2
            }
        } else if y > z {
            1
        } else {
            2
        }
    }

    fn permute(self, x: usize, y: usize, z: usize) -> Self {
        Vec3::new(self[x], self[y], self[z])
    }

    fn coordinate_system(self) -> (Vec3, Vec3) {
        let frame = Frame::new(self.normalize());
        (frame.x(), frame.y())
    }

    fn abs_dot(self, other: Self) -> f32 {
        self.dot(other).abs()
    }
}

impl From<Normal> for Vec3 {
    fn from(n: Normal) -> Self {
        n.0
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn max_dimension_and_permute() {
        assert_eq!(Vec3::new(-5.0, 1.0, 2.0).max_dimension(), 0);
        assert_eq!(Vec3::new(0.0, -3.0, 2.0).max_dimension(), 1);
        assert_eq!(Vec3::new(0.0, 0.0, -0.1).max_dimension(), 2);
        assert_eq!(
            Vec3::new(1.0, 2.0, 3.0).permute(1, 2, 0),
            Vec3::new(2.0, 3.0, 1.0)
        );
    }

    #[test]
    fn coordinate_system_is_orthonormal() {
        for v in [
            Vec3::X,
            -Vec3::Z,
            Vec3::new(1.0, 2.0, -3.0),
            Vec3::new(1e-3, -1.0, 1e-4),
        ] {
            let (a, b) = v.coordinate_system();
            let v = v.normalize();
            assert!(a.dot(v).abs() < 1e-5);
            assert!(b.dot(v).abs() < 1e-5);
            assert!(a.dot(b).abs() < 1e-5);
            assert!((a.length() - 1.0).abs() < 1e-5);
            assert!((b.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn same_direction() {
        assert_eq!(Vec3::X.same_direction(-Vec3::X), -Vec3::X);
        assert_eq!(Vec3::X.same_direction(Vec3::ONE), Vec3::X);
        assert_eq!(Vec3::Z.into_non_zero(0.1), Some(Vec3::Z));
        assert_eq!(Vec3::ZERO.into_non_zero(0.1), None);
    }
}

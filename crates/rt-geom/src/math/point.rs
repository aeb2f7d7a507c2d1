use std::ops::{Add, AddAssign, Index, Mul, Sub};

use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point(pub Vec3);

impl Point {
    pub const ORIGIN: Point = Point(Vec3::ZERO);
    pub fn vec(self) -> Vec3 {
        self.0
    }

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn x(self) -> f32 {
        self.0.x
    }
    pub fn y(self) -> f32 {
        self.0.y
    }
    pub fn z(self) -> f32 {
        self.0.z
    }

    pub fn distance(self, other: Self) -> f32 {
        self.0.distance(other.0)
    }

    pub fn distance_squared(self, other: Self) -> f32 {
        self.0.distance_squared(other.0)
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Weighted sum of points, the weights are expected to sum to one
    /// (barycentric interpolation).
    pub fn barycentric(points: [Point; 3], b: [f32; 3]) -> Self {
        Self(b[0] * points[0].0 + b[1] * points[1].0 + b[2] * points[2].0)
    }
}

impl Add<Vec3> for Point {
    type Output = Self;

    fn add(self, rhs: Vec3) -> Self::Output {
        Point(self.vec() + rhs)
    }
}

impl AddAssign<Vec3> for Point {
    fn add_assign(&mut self, rhs: Vec3) {
        self.0 += rhs;
    }
}

impl Sub<Vec3> for Point {
    type Output = Self;

    fn sub(self, rhs: Vec3) -> Self::Output {
        Point(self.vec() - rhs)
    }
}

/// We can sub two points but not add them
impl Sub for Point {
    type Output = Vec3;

    fn sub(self, rhs: Self) -> Self::Output {
        self.vec() - rhs.vec()
    }
}

/// Scaling a point scales its position vector (used to push points back on a surface)
impl Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Point(self.0 * rhs)
    }
}

impl Index<usize> for Point {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<[f32; 3]> for Point {
    fn from(value: [f32; 3]) -> Self {
        Point(Vec3::from_array(value))
    }
}

/// A point in a 2D parametric space (texture coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2(pub Vec2);

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    pub fn vec(self) -> Vec2 {
        self.0
    }

    pub fn barycentric(points: [Point2; 3], b: [f32; 3]) -> Self {
        Self(b[0] * points[0].0 + b[1] * points[1].0 + b[2] * points[2].0)
    }
}

impl Sub for Point2 {
    type Output = Vec2;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{Point, Point2};

    #[test]
    fn affine_operations() {
        let p = Point::new(1.0, 2.0, 3.0);
        let q = p + Vec3::X;
        assert_eq!(q - p, Vec3::X);
        assert_eq!(q - Vec3::X, p);
        assert_eq!(p * 2.0, Point::new(2.0, 4.0, 6.0));
        assert_eq!(p[2], 3.0);
        assert_eq!(Point::ORIGIN.distance(Point::new(0.0, 3.0, 4.0)), 5.0);
    }

    #[test]
    fn barycentric_interpolation() {
        let tri = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ];
        assert_eq!(
            Point::barycentric(tri, [0.5, 0.25, 0.25]),
            Point::new(0.5, 0.5, 0.0)
        );
        let uv = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0)];
        assert_eq!(Point2::barycentric(uv, [0.0, 0.0, 1.0]), Point2::new(1.0, 1.0));
    }
}

use std::ops::Range;

use glam::{Vec2, Vec3};

use crate::ray::Ray;

use super::{
    float::gamma,
    point::{Point, Point2},
};

/// Axis Aligned Bounding Box
///
/// The empty box has `min = +inf` and `max = -inf` so that it is the neutral element of
/// [Bounds3::union].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub min: Point,
    /// Should have all coordinates >= `min` unless the box is empty
    pub max: Point,
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds3 {
    pub const EMPTY: Self = Self {
        min: Point(Vec3::INFINITY),
        max: Point(Vec3::NEG_INFINITY),
    };

    pub fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x() > self.max.x() || self.min.y() > self.max.y() || self.min.z() > self.max.z()
    }

    /// Returns the `i`-th corner, bit 0 selects x, bit 1 selects y and bit 2 selects z
    pub fn corner(&self, i: usize) -> Point {
        let pick = |bit: usize, axis: usize| {
            if i & bit != 0 {
                self.max[axis]
            } else {
                self.min[axis]
            }
        };
        Point::new(pick(1, 0), pick(2, 1), pick(4, 2))
    }

    pub fn union_point(&self, p: Point) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(&self, other: &Bounds3) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersection(&self, other: &Bounds3) -> Option<Bounds3> {
        let b = Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        (!b.is_empty()).then_some(b)
    }

    pub fn overlaps(&self, other: &Bounds3) -> bool {
        self.intersection(other).is_some()
    }

    /// Inclusive containment test
    pub fn contains(&self, p: Point) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Containment test excluding the upper faces
    pub fn contains_exclusive(&self, p: Point) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] < self.max[i])
    }

    /// Pads the box by `delta` on every side
    pub fn expand(&self, delta: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(delta),
            max: self.max + Vec3::splat(delta),
        }
    }

    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn surface_area(&self) -> f32 {
        let Vec3 { x, y, z } = self.diagonal();
        2.0 * (x * y + x * z + y * z)
    }

    pub fn volume(&self) -> f32 {
        let Vec3 { x, y, z } = self.diagonal();
        x * y * z
    }

    /// Index of the longest axis
    pub fn maximum_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Linear interpolation between the corners, `t = 0` is `min` and `t = 1` is `max`
    pub fn lerp(&self, t: Vec3) -> Point {
        Point((Vec3::ONE - t) * self.min.vec() + t * self.max.vec())
    }

    /// Position of `p` relative to the box: `min` maps to 0 and `max` to 1 on each axis
    pub fn offset(&self, p: Point) -> Vec3 {
        let mut o = p - self.min;
        let d = self.diagonal();
        for i in 0..3 {
            if d[i] > 0.0 {
                o[i] /= d[i];
            }
        }
        o
    }

    pub fn bounding_sphere(&self) -> (Point, f32) {
        let center = Point(0.5 * (self.min.vec() + self.max.vec()));
        let radius = if self.contains(center) {
            center.distance(self.max)
        } else {
            0.0
        };
        (center, radius)
    }

    /// Slab test. Returns the parametric range of `ray` inside the box, clipped to
    /// `[0, ray.t_max]`.
    ///
    /// The far distance of each slab is enlarged to account for rounding errors so that a ray
    /// grazing a box is never missed.
    pub fn intersect_p(&self, ray: &Ray) -> Option<Range<f32>> {
        let mut t0 = 0.0;
        let mut t1 = ray.t_max;
        for i in 0..3 {
            // Division by zero yields +/- infty, which is what the slab test expects
            let inv_ray_dir = 1.0 / ray.direction[i];
            let mut t_near = (self.min[i] - ray.origin[i]) * inv_ray_dir;
            let mut t_far = (self.max[i] - ray.origin[i]) * inv_ray_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            t_far *= 1.0 + 2.0 * gamma(3);

            // Written so that NaN slabs leave the range untouched
            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }
        Some(t0..t1)
    }
}

/// Axis aligned box in 2D parametric space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub min: Point2,
    pub max: Point2,
}

impl Default for Bounds2 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds2 {
    pub const EMPTY: Self = Self {
        min: Point2(Vec2::INFINITY),
        max: Point2(Vec2::NEG_INFINITY),
    };

    pub fn from_points(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2(a.0.min(b.0)),
            max: Point2(a.0.max(b.0)),
        }
    }

    pub fn union_point(&self, p: Point2) -> Self {
        Self {
            min: Point2(self.min.0.min(p.0)),
            max: Point2(self.max.0.max(p.0)),
        }
    }

    pub fn contains(&self, p: Point2) -> bool {
        self.min.0.cmple(p.0).all() && p.0.cmple(self.max.0).all()
    }

    pub fn diagonal(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn area(&self) -> f32 {
        let d = self.diagonal();
        d.x * d.y
    }
}

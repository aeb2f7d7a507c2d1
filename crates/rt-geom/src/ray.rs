use std::ops::RangeInclusive;

use crate::{math::point::Point, medium::MediumId};

use super::math::vec::Vec3;

/// A semi-infinite line `origin + t * direction` for `t` in `[0, t_max]`.
///
/// The direction is not normalized: rays expressed in the object space of a scaled shape, or
/// rays spawned toward a target point, rely on the parametrization.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vec3,
    pub t_max: f32,
    pub time: f32,
    /// Medium containing the origin of the ray
    pub medium: Option<MediumId>,
}

impl Ray {
    pub fn new(origin: Point, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            t_max: f32::INFINITY,
            time: 0.0,
            medium: None,
        }
    }

    pub fn with_t_max(self, t_max: f32) -> Self {
        Self { t_max, ..self }
    }

    pub fn with_time(self, time: f32) -> Self {
        Self { time, ..self }
    }

    pub fn with_medium(self, medium: Option<MediumId>) -> Self {
        Self { medium, ..self }
    }

    pub fn range(&self) -> RangeInclusive<f32> {
        0.0..=self.t_max
    }

    pub fn at(&self, t: f32) -> Point {
        if !self.range().contains(&t) {
            crate::error_once!("a ray has been accessed out of bounds (t = {t})");
        }

        self.at_unchecked(t)
    }
    pub fn at_unchecked(&self, t: f32) -> Point {
        self.origin + t * self.direction
    }

    pub fn has_nan(&self) -> bool {
        self.origin.vec().is_nan() || self.direction.is_nan() || self.t_max.is_nan()
    }
}

/// A ray along with two auxiliary rays offset by one pixel in x and y on the image plane.
///
/// This layer only stores and transforms the auxiliary rays, generating them is the job of the
/// camera.
#[derive(Debug, Clone, Copy)]
pub struct RayDifferential {
    pub ray: Ray,
    pub has_differentials: bool,
    pub rx_origin: Point,
    pub ry_origin: Point,
    pub rx_direction: Vec3,
    pub ry_direction: Vec3,
}

impl RayDifferential {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            has_differentials: false,
            rx_origin: ray.origin,
            ry_origin: ray.origin,
            rx_direction: ray.direction,
            ry_direction: ray.direction,
        }
    }

    /// Scales the offset of the auxiliary rays, typically by `1 / sqrt(samples_per_pixel)`
    pub fn scale_differentials(&mut self, s: f32) {
        let Ray {
            origin, direction, ..
        } = self.ray;
        self.rx_origin = origin + (self.rx_origin - origin) * s;
        self.ry_origin = origin + (self.ry_origin - origin) * s;
        self.rx_direction = direction + (self.rx_direction - direction) * s;
        self.ry_direction = direction + (self.ry_direction - direction) * s;
    }
}

impl From<Ray> for RayDifferential {
    fn from(ray: Ray) -> Self {
        Self::new(ray)
    }
}

use glam::Vec3;

use crate::{
    interaction::{Interaction, SurfaceInteraction},
    math::{
        bounds::Bounds3,
        distributions::{ConcentricUnitDisk, Sample2D, Samplable},
        normal::Normal,
        point::{Point, Point2},
        transform::{Transform, Transformer},
    },
    medium::MediumInterface,
    ray::Ray,
};

use super::{azimuth, ObjectRay, QuadricHit, RayIntersection, Shape, ShapeData, ShapeSample};

/// A disk, or an annulus when `inner_radius > 0`, in the plane `z = height` of its object space.
///
/// It may be clipped to the wedge `0 <= phi <= phi_max`. The normal points toward +z unless the
/// orientation is reversed.
#[derive(Debug, Clone)]
pub struct Disk {
    data: ShapeData,
    height: f32,
    radius: f32,
    inner_radius: f32,
    phi_max: f32,
}

impl Disk {
    /// `phi_max` is in degrees
    pub fn new(
        object_to_world: Transform,
        reverse_orientation: bool,
        height: f32,
        radius: f32,
        inner_radius: f32,
        phi_max: f32,
    ) -> Self {
        log::debug!(
            "disk of radius {radius} ({inner_radius} inside) at z = {height}, phi_max = {phi_max}"
        );
        Self {
            data: ShapeData::new(object_to_world, reverse_orientation),
            height,
            radius,
            inner_radius,
            phi_max: phi_max.clamp(0.0, 360.0).to_radians(),
        }
    }

    fn find_hit(&self, ray: &Ray) -> Option<QuadricHit> {
        crate::counter!("Quadric tests");
        // Parallel to the plane
        if ray.direction.z == 0.0 {
            return None;
        }
        let t = (self.height - ray.origin.z()) / ray.direction.z;
        if t <= 0.0 || t >= ray.t_max {
            return None;
        }

        let mut p = ray.at(t);
        let dist2 = p.x() * p.x() + p.y() * p.y();
        if dist2 > self.radius * self.radius || dist2 < self.inner_radius * self.inner_radius {
            return None;
        }
        // Nudge off the center so that phi and dpdv are defined
        if dist2 == 0.0 {
            p.0.x = 1e-5 * self.radius;
        }
        let phi = azimuth(p);
        if phi > self.phi_max {
            return None;
        }

        // The plane equation is exact
        p.0.z = self.height;
        crate::counter!("Quadric hits");
        Some(QuadricHit { t, p, phi })
    }

    fn surface_interaction(&self, ray: &Ray, hit: &QuadricHit) -> SurfaceInteraction {
        let QuadricHit { p, phi, .. } = *hit;
        let hit_radius = f32::sqrt(p.x() * p.x() + p.y() * p.y());
        let uv = Point2::new(
            phi / self.phi_max,
            (self.radius - hit_radius) / (self.radius - self.inner_radius),
        );

        let dpdu = Vec3::new(-self.phi_max * p.y(), self.phi_max * p.x(), 0.0);
        let dpdv = Vec3::new(p.x(), p.y(), 0.0) * (self.inner_radius - self.radius) / hit_radius;

        // Only the nudge away from the center adds error
        let p_error = if hit_radius < 2e-5 * self.radius {
            Vec3::new(1e-5 * self.radius, 0.0, 0.0)
        } else {
            Vec3::ZERO
        };

        SurfaceInteraction::new(
            p,
            p_error,
            uv,
            -ray.direction,
            dpdu,
            dpdv,
            Normal::ZERO,
            Normal::ZERO,
            ray.time,
            self.data.flips_normal(),
        )
    }
}

impl Shape for Disk {
    fn data(&self) -> &ShapeData {
        &self.data
    }

    fn object_bound(&self) -> Bounds3 {
        Bounds3::from_points(
            Point::new(-self.radius, -self.radius, self.height),
            Point::new(self.radius, self.radius, self.height),
        )
    }

    fn intersect(&self, ray: &Ray, _test_alpha_texture: bool) -> Option<RayIntersection> {
        let ray = ObjectRay::new(&self.data, ray).ray;
        let hit = self.find_hit(&ray)?;
        let si = self.surface_interaction(&ray, &hit);
        Some(RayIntersection {
            t: hit.t,
            interaction: self.data.object_to_world().apply(si),
        })
    }

    fn intersect_p(&self, ray: &Ray, _test_alpha_texture: bool) -> bool {
        self.find_hit(&ObjectRay::new(&self.data, ray).ray).is_some()
    }

    fn area(&self) -> f32 {
        let r2 = self.radius * self.radius - self.inner_radius * self.inner_radius;
        self.phi_max * 0.5 * r2 * self.data.area_scale()
    }

    /// Samples the whole disk, ignoring `inner_radius` and `phi_max`
    fn sample(&self, u: Sample2D) -> ShapeSample {
        let o2w = self.data.object_to_world();
        let pd = ConcentricUnitDisk.sample_with(u);
        let p_obj = Point::new(pd.x * self.radius, pd.y * self.radius, self.height);

        let mut n = o2w.apply(Normal::new(0.0, 0.0, 1.0)).normalize();
        if self.data.reverse_orientation() {
            n = -n;
        }

        let (p, p_error) = o2w.apply_point_with_abs_error(p_obj, Vec3::ZERO);
        ShapeSample {
            it: Interaction::new(p, n, p_error, Vec3::ZERO, 0.0, MediumInterface::default()),
            pdf: 1.0 / self.area(),
        }
    }
}

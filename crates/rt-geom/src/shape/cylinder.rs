use glam::Vec3;

use crate::{
    interaction::{Interaction, SurfaceInteraction},
    math::{
        bounds::Bounds3,
        distributions::Sample2D,
        efloat::{quadratic, EFloat},
        float::{gamma, lerp},
        normal::Normal,
        point::{Point, Point2},
        transform::{Transform, Transformer},
    },
    medium::MediumInterface,
    ray::Ray,
};

use super::{
    azimuth, normal_derivatives, quadric_roots, ObjectRay, QuadricHit, RayIntersection, Shape,
    ShapeData, ShapeSample,
};

/// An open cylinder around the z axis of its object space, between `z_min` and `z_max`.
///
/// It may be clipped to the wedge `0 <= phi <= phi_max`.
#[derive(Debug, Clone)]
pub struct Cylinder {
    data: ShapeData,
    radius: f32,
    z_min: f32,
    z_max: f32,
    phi_max: f32,
}

impl Cylinder {
    /// `phi_max` is in degrees
    pub fn new(
        object_to_world: Transform,
        reverse_orientation: bool,
        radius: f32,
        z_min: f32,
        z_max: f32,
        phi_max: f32,
    ) -> Self {
        log::debug!("cylinder of radius {radius}, z in [{z_min}, {z_max}], phi_max = {phi_max}");
        Self {
            data: ShapeData::new(object_to_world, reverse_orientation),
            radius,
            z_min: f32::min(z_min, z_max),
            z_max: f32::max(z_min, z_max),
            phi_max: phi_max.clamp(0.0, 360.0).to_radians(),
        }
    }

    fn find_hit(&self, ray: &ObjectRay) -> Option<QuadricHit> {
        crate::counter!("Quadric tests");
        let [ox, oy, _] = ray.o;
        let [dx, dy, _] = ray.d;
        let radius = EFloat::from(self.radius);

        let a = dx * dx + dy * dy;
        // Parallel to the axis
        if a.value() == 0.0 {
            return None;
        }
        let b = 2.0 * (dx * ox + dy * oy);
        let c = ox * ox + oy * oy - radius * radius;
        let (t0, t1) = quadratic(a, b, c)?;

        let hit = quadric_roots(t0, t1, ray.ray.t_max).find_map(|t| self.clip(&ray.ray, t));
        if hit.is_some() {
            crate::counter!("Quadric hits");
        }
        hit
    }

    /// The hit point at `t`, unless it is clipped away
    fn clip(&self, ray: &Ray, t: EFloat) -> Option<QuadricHit> {
        let t = f32::from(t);
        let p = self.refine(ray.at(t));
        let phi = azimuth(p);

        let clipped = p.z() < self.z_min || p.z() > self.z_max || phi > self.phi_max;
        (!clipped).then_some(QuadricHit { t, p, phi })
    }

    /// Pushes `p` back onto the cylinder, removing the error accumulated along the ray
    fn refine(&self, p: Point) -> Point {
        let hit_radius = f32::sqrt(p.x() * p.x() + p.y() * p.y());
        let scale = self.radius / hit_radius;
        Point::new(p.x() * scale, p.y() * scale, p.z())
    }

    fn surface_interaction(&self, ray: &Ray, hit: &QuadricHit) -> SurfaceInteraction {
        let QuadricHit { p, phi, .. } = *hit;
        let height = self.z_max - self.z_min;
        let uv = Point2::new(phi / self.phi_max, (p.z() - self.z_min) / height);

        let dpdu = Vec3::new(-self.phi_max * p.y(), self.phi_max * p.x(), 0.0);
        let dpdv = Vec3::new(0.0, 0.0, height);
        let d2pduu = -self.phi_max * self.phi_max * Vec3::new(p.x(), p.y(), 0.0);
        let (dndu, dndv) = normal_derivatives(dpdu, dpdv, d2pduu, Vec3::ZERO, Vec3::ZERO);

        let p_error = gamma(3) * Vec3::new(p.x(), p.y(), 0.0).abs();
        SurfaceInteraction::new(
            p,
            p_error,
            uv,
            -ray.direction,
            dpdu,
            dpdv,
            dndu,
            dndv,
            ray.time,
            self.data.flips_normal(),
        )
    }
}

impl Shape for Cylinder {
    fn data(&self) -> &ShapeData {
        &self.data
    }

    fn object_bound(&self) -> Bounds3 {
        Bounds3::from_points(
            Point::new(-self.radius, -self.radius, self.z_min),
            Point::new(self.radius, self.radius, self.z_max),
        )
    }

    fn intersect(&self, ray: &Ray, _test_alpha_texture: bool) -> Option<RayIntersection> {
        let ray = ObjectRay::new(&self.data, ray);
        let hit = self.find_hit(&ray)?;
        let si = self.surface_interaction(&ray.ray, &hit);
        Some(RayIntersection {
            t: hit.t,
            interaction: self.data.object_to_world().apply(si),
        })
    }

    fn intersect_p(&self, ray: &Ray, _test_alpha_texture: bool) -> bool {
        self.find_hit(&ObjectRay::new(&self.data, ray)).is_some()
    }

    fn area(&self) -> f32 {
        (self.z_max - self.z_min) * self.radius * self.phi_max * self.data.area_scale()
    }

    fn sample(&self, u: Sample2D) -> ShapeSample {
        let o2w = self.data.object_to_world();
        let z = lerp(u[0], self.z_min, self.z_max);
        let (sin_phi, cos_phi) = f32::sin_cos(u[1] * self.phi_max);
        let p_obj = self.refine(Point::new(self.radius * cos_phi, self.radius * sin_phi, z));

        let mut n = o2w.apply(Normal::new(p_obj.x(), p_obj.y(), 0.0)).normalize();
        if self.data.reverse_orientation() {
            n = -n;
        }

        let p_obj_error = gamma(3) * Vec3::new(p_obj.x(), p_obj.y(), 0.0).abs();
        let (p, p_error) = o2w.apply_point_with_abs_error(p_obj, p_obj_error);
        ShapeSample {
            it: Interaction::new(p, n, p_error, Vec3::ZERO, 0.0, MediumInterface::default()),
            pdf: 1.0 / self.area(),
        }
    }
}

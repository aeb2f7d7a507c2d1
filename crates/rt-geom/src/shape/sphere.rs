use glam::Vec3;

use crate::{
    interaction::{offset_ray_origin, Interaction, SurfaceInteraction},
    math::{
        bounds::Bounds3,
        distributions::{uniform_cone_pdf, Sample2D, Samplable, UniformCone, UniformUnitSphere3},
        efloat::{quadratic, EFloat},
        float::{gamma, safe_acos, safe_sqrt},
        frame::Frame,
        normal::Normal,
        point::{Point, Point2},
        transform::{Transform, Transformer},
    },
    medium::MediumInterface,
    ray::Ray,
};

use super::{
    area_pdf_ref, area_sample_ref, azimuth, normal_derivatives, quadric_roots, ObjectRay,
    QuadricHit, RayIntersection, Shape, ShapeData, ShapeSample,
};

/// Below this squared sine, the cone subtended by a sphere is so narrow that `1 - cos` loses all
/// its precision, sin^2(1.5 degrees)
const SMALL_CONE_SIN2: f32 = 0.00068523;

/// A sphere centered on the origin of its object space.
///
/// The sphere may be clipped to `z_min <= z <= z_max` and to the wedge `0 <= phi <= phi_max`
/// around the z axis. Normals point outward unless the orientation is reversed.
#[derive(Debug, Clone)]
pub struct Sphere {
    data: ShapeData,
    radius: f32,
    z_min: f32,
    z_max: f32,
    theta_z_min: f32,
    theta_z_max: f32,
    phi_max: f32,
}

impl Sphere {
    /// `phi_max` is in degrees, `z_min` and `z_max` are clamped to the sphere.
    pub fn new(
        object_to_world: Transform,
        reverse_orientation: bool,
        radius: f32,
        z_min: f32,
        z_max: f32,
        phi_max: f32,
    ) -> Self {
        let (z_min, z_max) = (
            f32::min(z_min, z_max).clamp(-radius, radius),
            f32::max(z_min, z_max).clamp(-radius, radius),
        );
        log::debug!("sphere of radius {radius}, z in [{z_min}, {z_max}], phi_max = {phi_max}");

        Self {
            data: ShapeData::new(object_to_world, reverse_orientation),
            radius,
            z_min,
            z_max,
            theta_z_min: safe_acos(z_min / radius),
            theta_z_max: safe_acos(z_max / radius),
            phi_max: phi_max.clamp(0.0, 360.0).to_radians(),
        }
    }

    /// A whole sphere
    pub fn full(object_to_world: Transform, reverse_orientation: bool, radius: f32) -> Self {
        Self::new(
            object_to_world,
            reverse_orientation,
            radius,
            -radius,
            radius,
            360.0,
        )
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn find_hit(&self, ray: &ObjectRay) -> Option<QuadricHit> {
        crate::counter!("Quadric tests");
        let [ox, oy, oz] = ray.o;
        let [dx, dy, dz] = ray.d;
        let radius = EFloat::from(self.radius);

        let a = dx * dx + dy * dy + dz * dz;
        let b = 2.0 * (dx * ox + dy * oy + dz * oz);
        let c = ox * ox + oy * oy + oz * oz - radius * radius;
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
        let mut p = self.refine(ray.at(t));
        // Nudge off the z axis so that phi is defined
        if p.x() == 0.0 && p.y() == 0.0 {
            p.0.x = 1e-5 * self.radius;
        }
        let phi = azimuth(p);

        let clipped = (self.z_min > -self.radius && p.z() < self.z_min)
            || (self.z_max < self.radius && p.z() > self.z_max)
            || phi > self.phi_max;
        (!clipped).then_some(QuadricHit { t, p, phi })
    }

    /// Pushes `p` back onto the sphere, removing the error accumulated along the ray
    fn refine(&self, p: Point) -> Point {
        p * (self.radius / p.distance(Point::ORIGIN))
    }

    fn surface_interaction(&self, ray: &Ray, hit: &QuadricHit) -> SurfaceInteraction {
        let QuadricHit { p, phi, .. } = *hit;
        let theta_range = self.theta_z_max - self.theta_z_min;

        let cos_theta = p.z() / self.radius;
        let theta = safe_acos(cos_theta);
        let uv = Point2::new(
            phi / self.phi_max,
            (theta - self.theta_z_min) / theta_range,
        );

        let z_radius = f32::sqrt(p.x() * p.x() + p.y() * p.y());
        let (cos_phi, sin_phi) = (p.x() / z_radius, p.y() / z_radius);
        let sin_theta = safe_sqrt(1.0 - cos_theta * cos_theta);
        let dpdu = Vec3::new(-self.phi_max * p.y(), self.phi_max * p.x(), 0.0);
        let dpdv = theta_range
            * Vec3::new(
                p.z() * cos_phi,
                p.z() * sin_phi,
                -self.radius * sin_theta,
            );

        let d2pduu = -self.phi_max * self.phi_max * Vec3::new(p.x(), p.y(), 0.0);
        let d2pduv = theta_range * p.z() * self.phi_max * Vec3::new(-sin_phi, cos_phi, 0.0);
        let d2pdvv = -theta_range * theta_range * p.vec();
        let (dndu, dndv) = normal_derivatives(dpdu, dpdv, d2pduu, d2pduv, d2pdvv);

        let p_error = gamma(5) * p.vec().abs();
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

    fn center(&self) -> Point {
        self.data.object_to_world().apply(Point::ORIGIN)
    }

    /// Radius of the sphere in world space, unless it is scaled into an ellipsoid
    fn world_radius(&self) -> Option<f32> {
        let radius = self.data.uniform_scale().map(|s| s * self.radius);
        if radius.is_none() {
            crate::warn_once!("sphere under a non-uniform scale is sampled by area");
        }
        radius
    }

    /// Whether `reference`, once offset from its surface toward the center, is inside the sphere
    /// of world radius `radius`
    fn contains_reference(&self, reference: &Interaction, radius: f32) -> bool {
        let center = self.center();
        let to_center = center - reference.p;
        let origin = offset_ray_origin(reference.p, reference.p_error, reference.n, to_center);
        origin.distance_squared(center) <= radius * radius
    }
}

impl Shape for Sphere {
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
        self.phi_max * self.radius * (self.z_max - self.z_min) * self.data.area_scale()
    }

    fn sample(&self, u: Sample2D) -> ShapeSample {
        let o2w = self.data.object_to_world();
        let p_obj = Point(self.radius * UniformUnitSphere3.sample_with(u));

        let mut n = o2w.apply(Normal(p_obj.vec())).normalize();
        if self.data.reverse_orientation() {
            n = -n;
        }

        let p_obj = self.refine(p_obj);
        let (p, p_error) = o2w.apply_point_with_abs_error(p_obj, gamma(5) * p_obj.vec().abs());
        ShapeSample {
            it: Interaction::new(p, n, p_error, Vec3::ZERO, 0.0, MediumInterface::default()),
            pdf: 1.0 / self.area(),
        }
    }

    /// Samples the cone of directions subtended by the sphere from `reference`, which gives far
    /// less variance than sampling by area for small or distant spheres.
    fn sample_ref(&self, reference: &Interaction, u: Sample2D) -> ShapeSample {
        let Some(radius) = self.world_radius() else {
            return area_sample_ref(self, reference, u);
        };
        if self.contains_reference(reference, radius) {
            return area_sample_ref(self, reference, u);
        }

        let center = self.center();
        let dc = reference.p.distance(center);
        let inv_dc = 1.0 / dc;
        let wc = (center - reference.p) * inv_dc;

        let sin_theta_max = radius * inv_dc;
        let sin_theta_max2 = sin_theta_max * sin_theta_max;
        let inv_sin_theta_max = 1.0 / sin_theta_max;
        let cos_theta_max = safe_sqrt(1.0 - sin_theta_max2);

        // Angle theta from the reference toward the center
        let mut cos_theta = (cos_theta_max - 1.0) * u[0] + 1.0;
        let mut sin_theta2 = 1.0 - cos_theta * cos_theta;
        if sin_theta_max2 < SMALL_CONE_SIN2 {
            sin_theta2 = sin_theta_max2 * u[0];
            cos_theta = f32::sqrt(1.0 - sin_theta2);
        }

        // Angle alpha from the center toward the sampled point
        let cos_alpha = sin_theta2 * inv_sin_theta_max
            + cos_theta * safe_sqrt(1.0 - sin_theta2 * inv_sin_theta_max * inv_sin_theta_max);
        let sin_alpha = safe_sqrt(1.0 - cos_alpha * cos_alpha);
        let (sin_phi, cos_phi) = f32::sin_cos(std::f32::consts::TAU * u[1]);

        let n_world = Frame::new(-wc).from_local(Vec3::new(
            sin_alpha * cos_phi,
            sin_alpha * sin_phi,
            cos_alpha,
        ));
        let p = center + radius * n_world;

        let mut n = Normal(n_world);
        if self.data.reverse_orientation() {
            n = -n;
        }

        ShapeSample {
            it: Interaction::new(
                p,
                n,
                gamma(5) * p.vec().abs(),
                Vec3::ZERO,
                reference.time,
                MediumInterface::default(),
            ),
            pdf: UniformCone { cos_theta_max }.pdf(),
        }
    }

    fn pdf_ref(&self, reference: &Interaction, wi: Vec3) -> f32 {
        let Some(radius) = self.world_radius() else {
            return area_pdf_ref(self, reference, wi);
        };
        if self.contains_reference(reference, radius) {
            return area_pdf_ref(self, reference, wi);
        }

        let sin_theta_max2 = radius * radius / reference.p.distance_squared(self.center());
        uniform_cone_pdf(safe_sqrt(1.0 - sin_theta_max2))
    }
}

//! Contains the objects that rays can hit:
//! - Spheres
//! - Cylinders
//! - Disks
//! - Triangle meshes
//!
//! Quadrics ([Sphere], [Cylinder], [Disk]) are defined in their own object space, centered on
//! the origin around the z axis, and placed in the world by a [Transform]. Rays are brought to
//! object space, where the intersection is solved with [EFloat]s so that the error on the hit
//! point is known, and the resulting [SurfaceInteraction] is brought back to world space.
//!
//! Triangles are the exception: their mesh is transformed to world space once at construction.

pub mod cylinder;
pub mod disk;
pub mod sphere;
pub mod triangle;

pub use cylinder::Cylinder;
pub use disk::Disk;
pub use sphere::Sphere;
pub use triangle::{Triangle, TriangleMesh, TriangleMeshBuilder};

use glam::Vec3;

use crate::{
    interaction::{Interaction, SurfaceInteraction},
    math::{
        bounds::Bounds3,
        distributions::Sample2D,
        efloat::EFloat,
        float::FloatAsExt,
        normal::Normal,
        point::Point,
        transform::{Transform, Transformer},
    },
    ray::Ray,
};

/// A shape rays can be intersected with.
///
/// A miss is never an error: `intersect` returns `None` and `intersect_p` returns `false`.
pub trait Shape: Sync + Send {
    fn data(&self) -> &ShapeData;

    /// Bounding box of the shape in its own object space
    fn object_bound(&self) -> Bounds3;

    fn world_bound(&self) -> Bounds3 {
        self.data().object_to_world().apply(self.object_bound())
    }

    /// Finds the first intersection of `ray` with the shape in `(0, ray.t_max)`.
    ///
    /// When `test_alpha_texture` is set, hits vetoed by the alpha mask of the shape, if any, are
    /// ignored.
    fn intersect(&self, ray: &Ray, test_alpha_texture: bool) -> Option<RayIntersection>;

    /// Whether `ray` hits the shape in `(0, ray.t_max)`, often used to cast shadow rays.
    fn intersect_p(&self, ray: &Ray, test_alpha_texture: bool) -> bool {
        self.intersect(ray, test_alpha_texture).is_some()
    }

    /// World space surface area.
    ///
    /// Quadrics only know it under a uniform scale, see [ShapeData::area_scale].
    fn area(&self) -> f32;

    /// Samples a point uniformly with respect to the surface area of the shape
    fn sample(&self, u: Sample2D) -> ShapeSample;

    /// Density with respect to the surface area of `sample`
    fn pdf(&self, _it: &Interaction) -> f32 {
        1.0 / self.area()
    }

    /// Samples a point of the shape as seen from `reference`, the density is expressed with
    /// respect to the solid angle at `reference`.
    fn sample_ref(&self, reference: &Interaction, u: Sample2D) -> ShapeSample {
        area_sample_ref(self, reference, u)
    }

    /// Density with respect to the solid angle at `reference` of `sample_ref` for direction `wi`
    fn pdf_ref(&self, reference: &Interaction, wi: Vec3) -> f32 {
        area_pdf_ref(self, reference, wi)
    }
}

/// Samples the shape by area and converts the density to solid angle at `reference`.
///
/// The density is 0 when the sampled point coincides with `reference` or is seen edge-on.
pub fn area_sample_ref<S: Shape + ?Sized>(
    shape: &S,
    reference: &Interaction,
    u: Sample2D,
) -> ShapeSample {
    let ShapeSample { mut it, pdf } = shape.sample(u);
    it.time = reference.time;
    let wi = it.p - reference.p;
    if wi.length_squared() == 0.0 {
        return ShapeSample { it, pdf: 0.0 };
    }
    let wi = wi.normalize();
    let pdf = pdf * reference.p.distance_squared(it.p) / it.n.dot(-wi).abs();
    ShapeSample {
        it,
        pdf: pdf.into_finite().unwrap_or(0.0),
    }
}

/// Density of [area_sample_ref], found by tracing a ray from `reference` toward `wi`.
pub fn area_pdf_ref<S: Shape + ?Sized>(shape: &S, reference: &Interaction, wi: Vec3) -> f32 {
    let ray = reference.spawn_ray(wi);
    let Some(RayIntersection { interaction, .. }) = shape.intersect(&ray, false) else {
        return 0.0;
    };
    let hit = interaction.hit;
    let pdf = reference.p.distance_squared(hit.p) / (hit.n.dot(-wi).abs() * shape.area());
    pdf.into_finite().unwrap_or(0.0)
}

/// Placement and orientation of a shape, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct ShapeData {
    object_to_world: Transform,
    world_to_object: Transform,
    reverse_orientation: bool,
    transform_swaps_handedness: bool,
    /// Scale factor of `object_to_world` when it is a similarity
    uniform_scale: Option<f32>,
}

impl ShapeData {
    pub fn new(object_to_world: Transform, reverse_orientation: bool) -> Self {
        Self {
            object_to_world,
            world_to_object: object_to_world.inverse(),
            reverse_orientation,
            transform_swaps_handedness: object_to_world.swaps_handedness(),
            uniform_scale: uniform_scale(&object_to_world),
        }
    }

    pub fn object_to_world(&self) -> &Transform {
        &self.object_to_world
    }

    pub fn world_to_object(&self) -> &Transform {
        &self.world_to_object
    }

    /// Whether normals point inward instead of outward
    pub fn reverse_orientation(&self) -> bool {
        self.reverse_orientation
    }

    pub fn transform_swaps_handedness(&self) -> bool {
        self.transform_swaps_handedness
    }

    /// Whether the object space normal must be flipped from `dpdu x dpdv`.
    ///
    /// Under a transformation that swaps handedness, the cross product of the transformed
    /// derivatives is opposite to the transformed normal, flipping keeps the world space normal
    /// along the world space `dpdu x dpdv`.
    pub fn flips_normal(&self) -> bool {
        self.reverse_orientation ^ self.transform_swaps_handedness
    }

    /// How much `object_to_world` scales lengths, when it scales them the same way in every
    /// direction. `None` under a non-uniform scale or a shear.
    pub fn uniform_scale(&self) -> Option<f32> {
        self.uniform_scale
    }

    /// Ratio between world and object space areas.
    ///
    /// Under a non-uniform scale there is no such constant ratio: 1 is returned and the object
    /// space area is used as is.
    pub fn area_scale(&self) -> f32 {
        match self.uniform_scale {
            Some(s) => s * s,
            None => {
                crate::warn_once!("area of a quadric under a non-uniform scale is approximated");
                1.0
            }
        }
    }
}

fn uniform_scale(t: &Transform) -> Option<f32> {
    let [x, y, z] = [Vec3::X, Vec3::Y, Vec3::Z].map(|v| t.apply(v));
    let s = x.length();
    let same_length = [y.length(), z.length()]
        .into_iter()
        .all(|l| (l - s).abs() <= 1e-4 * s);
    let orthogonal = [x.dot(y), y.dot(z), z.dot(x)]
        .into_iter()
        .all(|d| d.abs() <= 1e-4 * s * s);
    (same_length && orthogonal).then_some(s)
}

/// Holds the parametric distance along the ray and the interaction of a collision between a ray
/// and a shape.
#[derive(Debug, Clone, Copy)]
pub struct RayIntersection {
    pub t: f32,
    pub interaction: SurfaceInteraction,
}

impl RayIntersection {
    /// Keeps the nearest of two optional intersections
    pub fn nearest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.t <= b.t { a } else { b }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// A point sampled on a shape, with its density.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSample {
    pub it: Interaction,
    pub pdf: f32,
}

/// Ray in the object space of a shape, along with the error bounds on its origin and direction.
pub(crate) struct ObjectRay {
    pub ray: Ray,
    pub o: [EFloat; 3],
    pub d: [EFloat; 3],
}

impl ObjectRay {
    pub fn new(data: &ShapeData, ray: &Ray) -> Self {
        let (ray, o_error, d_error) = data.world_to_object().apply_ray_with_error(ray);
        let o = std::array::from_fn(|i| EFloat::new(ray.origin[i], o_error[i]));
        let d = std::array::from_fn(|i| EFloat::new(ray.direction[i], d_error[i]));
        Self { ray, o, d }
    }
}

/// Roots of a quadric along a ray that may be valid hits, nearest first.
///
/// Both roots are rejected at once if the nearest one is certainly farther than `t_max` or if
/// the farthest one is certainly behind the origin. Otherwise, each root is kept only if it is
/// certainly in `(0, t_max]`.
pub(crate) fn quadric_roots(t0: EFloat, t1: EFloat, t_max: f32) -> impl Iterator<Item = EFloat> {
    let reachable = t0.upper_bound() <= t_max && t1.lower_bound() > 0.0;
    [t0, t1]
        .into_iter()
        .filter(move |t| reachable && t.lower_bound() > 0.0 && t.upper_bound() <= t_max)
}

/// A candidate hit on a quadric, in object space.
pub(crate) struct QuadricHit {
    pub t: f32,
    pub p: Point,
    pub phi: f32,
}

/// Angle of `p` around the z axis, in `[0, 2 pi)`
pub(crate) fn azimuth(p: Point) -> f32 {
    let phi = f32::atan2(p.y(), p.x());
    if phi < 0.0 {
        phi + std::f32::consts::TAU
    } else {
        phi
    }
}

/// Derivatives of the normal from the first and second fundamental forms of the surface
/// (Weingarten equations).
pub(crate) fn normal_derivatives(
    dpdu: Vec3,
    dpdv: Vec3,
    d2pduu: Vec3,
    d2pduv: Vec3,
    d2pdvv: Vec3,
) -> (Normal, Normal) {
    let (e1, f1, g1) = (dpdu.dot(dpdu), dpdu.dot(dpdv), dpdv.dot(dpdv));
    let n = dpdu.cross(dpdv).normalize_or_zero();
    let (e2, f2, g2) = (n.dot(d2pduu), n.dot(d2pduv), n.dot(d2pdvv));

    // Zero for a degenerate parametrization
    let inv_egf2 = (e1 * g1 - f1 * f1).recip().into_finite().unwrap_or(0.0);
    let dndu = (f2 * f1 - e2 * g1) * inv_egf2 * dpdu + (e2 * f1 - f2 * e1) * inv_egf2 * dpdv;
    let dndv = (g2 * f1 - f2 * g1) * inv_egf2 * dpdu + (f2 * f1 - g2 * e1) * inv_egf2 * dpdv;
    (Normal(dndu), Normal(dndv))
}

#[cfg(test)]
mod tests {
    use crate::{math::distributions::Samples, medium::MediumInterface};

    use super::*;

    #[test]
    fn roots_are_filtered_in_order() {
        let ef = |v: f32| EFloat::new(v, 1e-3);

        let roots: Vec<f32> = quadric_roots(ef(1.0), ef(2.0), 10.0).map(f32::from).collect();
        assert_eq!(roots, [1.0, 2.0]);

        // Origin inside, only the far root remains
        let roots: Vec<f32> = quadric_roots(ef(-1.0), ef(2.0), 10.0).map(f32::from).collect();
        assert_eq!(roots, [2.0]);

        // Far root beyond t_max
        let roots: Vec<f32> = quadric_roots(ef(1.0), ef(20.0), 10.0).map(f32::from).collect();
        assert_eq!(roots, [1.0]);

        assert_eq!(quadric_roots(ef(11.0), ef(20.0), 10.0).count(), 0);
        assert_eq!(quadric_roots(ef(-2.0), ef(-1.0), 10.0).count(), 0);
        // A root too close to zero to be told apart from it is discarded
        let roots: Vec<f32> = quadric_roots(ef(1e-4), ef(2.0), 10.0).map(f32::from).collect();
        assert_eq!(roots, [2.0]);
    }

    #[test]
    fn shape_data_orientation() {
        let mirror = Transform::scale(-1.0, 1.0, 1.0);
        assert!(ShapeData::new(mirror, false).flips_normal());
        assert!(!ShapeData::new(mirror, true).flips_normal());
        assert!(ShapeData::new(Transform::IDENTITY, true).flips_normal());
        assert!(!ShapeData::new(Transform::rotate_x(30.0), false).flips_normal());

        let data = ShapeData::new(Transform::translate(Vec3::X), false);
        let p = data.world_to_object().apply(Point::new(1.0, 0.0, 0.0));
        assert_eq!(p, Point::ORIGIN);
    }

    #[test]
    fn uniform_scale_detection() {
        let rotated = Transform::rotate(40.0, Vec3::new(1.0, 2.0, 3.0));
        let similar = Transform::translate(Vec3::X) * rotated * Transform::scale(3.0, 3.0, 3.0);
        let scale = ShapeData::new(similar, false).uniform_scale().unwrap();
        assert!((scale - 3.0).abs() < 1e-5);
        assert_eq!(ShapeData::new(Transform::IDENTITY, false).area_scale(), 1.0);

        let mirror = ShapeData::new(Transform::scale(-2.0, 2.0, 2.0), false);
        assert!((mirror.area_scale() - 4.0).abs() < 1e-5);

        let stretched = rotated * Transform::scale(1.0, 2.0, 1.0);
        assert!(ShapeData::new(stretched, false).uniform_scale().is_none());
        assert_eq!(ShapeData::new(stretched, false).area_scale(), 1.0);
    }

    #[test]
    fn areas_are_measured_in_world_space() {
        let t = Transform::translate(Vec3::Y) * Transform::scale(2.0, 2.0, 2.0);
        let pi = std::f32::consts::PI;

        let disk = Disk::new(t, false, 0.0, 1.0, 0.0, 360.0);
        assert!((disk.area() - 4.0 * pi).abs() < 1e-4);
        let cylinder = Cylinder::new(t, false, 1.0, 0.0, 1.0, 360.0);
        assert!((cylinder.area() - 8.0 * pi).abs() < 1e-4);
        let sphere = Sphere::full(t, false, 1.0);
        assert!((sphere.area() - 16.0 * pi).abs() < 1e-3);
        assert!((sphere.pdf(&Interaction::default()) * sphere.area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn area_sampling_keeps_the_reference_time() {
        let disk = Disk::new(Transform::translate(Vec3::Z), false, 0.0, 1.0, 0.0, 360.0);
        let reference = Interaction::new(
            Point::ORIGIN,
            Normal::new(0.0, 0.0, 1.0),
            Vec3::ZERO,
            Vec3::Z,
            0.25,
            MediumInterface::default(),
        );
        let ShapeSample { it, pdf } = disk.sample_ref(&reference, Samples([0.4, 0.7]));
        assert_eq!(it.time, 0.25);
        assert!(pdf > 0.0);
    }

    #[test]
    fn nearest_intersection() {
        let at = |t| {
            Some(RayIntersection {
                t,
                interaction: SurfaceInteraction::default(),
            })
        };
        assert_eq!(RayIntersection::nearest(at(2.0), at(1.0)).map(|r| r.t), Some(1.0));
        assert_eq!(RayIntersection::nearest(None, at(3.0)).map(|r| r.t), Some(3.0));
        assert!(RayIntersection::nearest(None, None).is_none());
    }

    #[test]
    fn azimuth_range() {
        assert_eq!(azimuth(Point::new(1.0, 0.0, 3.0)), 0.0);
        let phi = azimuth(Point::new(0.0, -1.0, 0.0));
        assert!((phi - 1.5 * std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn flat_surface_has_constant_normal() {
        let (dndu, dndv) =
            normal_derivatives(Vec3::X, Vec3::Y, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(dndu, Normal::ZERO);
        assert_eq!(dndv, Normal::ZERO);

        // Degenerate parametrization
        let (dndu, _) = normal_derivatives(Vec3::X, Vec3::X, Vec3::Y, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(dndu, Normal::ZERO);
    }
}

use std::{fmt, sync::Arc};

use anyhow::{anyhow, bail, ensure, Result};
use glam::Vec3;
use log::debug;

use crate::{
    interaction::{Interaction, SurfaceInteraction},
    math::{
        bounds::Bounds3,
        distributions::{Sample2D, Samplable, UniformTriangle},
        float::gamma,
        normal::Normal,
        point::{Point, Point2},
        transform::{Transform, Transformer},
        vec::Vec3GeomExt,
    },
    medium::MediumInterface,
    ray::Ray,
    texture::FloatTexture,
};

use super::{RayIntersection, Shape, ShapeData, ShapeSample};

/// Texture coordinates of the vertices when the mesh has none
const DEFAULT_UVS: [Point2; 3] = [
    Point2(glam::Vec2::new(0.0, 0.0)),
    Point2(glam::Vec2::new(1.0, 0.0)),
    Point2(glam::Vec2::new(1.0, 1.0)),
];

/// Gather information to create a [TriangleMesh].
///
/// Positions, normals and tangents are given in object space. Optional arrays are left empty
/// when the mesh has no such data. Use the [TriangleMeshBuilder::build] method to check the data
/// and build the mesh.
#[derive(Default)]
pub struct TriangleMeshBuilder {
    pub object_to_world: Transform,
    pub reverse_orientation: bool,
    /// The i-th triangle is made of the vertices `vertex_indices[3 * i..3 * i + 3]`
    pub vertex_indices: Vec<usize>,
    pub positions: Vec<Point>,
    pub normals: Vec<Normal>,
    pub tangents: Vec<Vec3>,
    pub uvs: Vec<Point2>,
    /// One per triangle, forwarded to [SurfaceInteraction::face_index]
    pub face_indices: Vec<usize>,
    /// Hits where this evaluates to 0 are ignored
    pub alpha_mask: Option<Arc<dyn FloatTexture>>,
    /// Same as `alpha_mask`, only for [Shape::intersect_p]
    pub shadow_alpha_mask: Option<Arc<dyn FloatTexture>>,
}

impl TriangleMeshBuilder {
    pub fn new(
        object_to_world: Transform,
        vertex_indices: Vec<usize>,
        positions: Vec<Point>,
    ) -> Self {
        Self {
            object_to_world,
            vertex_indices,
            positions,
            ..Default::default()
        }
    }

    pub fn build(self) -> Result<TriangleMesh> {
        let vertex_count = self.positions.len();
        ensure!(!self.vertex_indices.is_empty(), "triangle mesh without vertex indices");
        ensure!(
            self.vertex_indices.len() % 3 == 0,
            "triangle mesh has {} vertex indices, which is not a multiple of 3",
            self.vertex_indices.len()
        );
        if let Some(&i) = self.vertex_indices.iter().find(|&&i| i >= vertex_count) {
            bail!(
                "triangle mesh has out of bounds vertex index {i} ({vertex_count} positions were \
                 given)"
            );
        }

        let check_len = |name: &str, len: usize| {
            if len != 0 && len != vertex_count {
                bail!("triangle mesh has {len} {name} for {vertex_count} positions");
            }
            Ok(())
        };
        check_len("normals", self.normals.len())?;
        check_len("tangents", self.tangents.len())?;
        check_len("uvs", self.uvs.len())?;

        let triangle_count = self.vertex_indices.len() / 3;
        if !self.face_indices.is_empty() && self.face_indices.len() != triangle_count {
            bail!(
                "triangle mesh has {} face indices for {triangle_count} triangles",
                self.face_indices.len()
            );
        }

        let o2w = self.object_to_world;
        let mesh = TriangleMesh {
            data: ShapeData::new(o2w, self.reverse_orientation),
            vertex_indices: self.vertex_indices,
            positions: self.positions.into_iter().map(|p| o2w.apply(p)).collect(),
            normals: non_empty(self.normals.into_iter().map(|n| o2w.apply(n)).collect()),
            tangents: non_empty(self.tangents.into_iter().map(|s| o2w.apply(s)).collect()),
            uvs: non_empty(self.uvs),
            face_indices: non_empty(self.face_indices),
            alpha_mask: self.alpha_mask,
            shadow_alpha_mask: self.shadow_alpha_mask,
        };
        debug!(
            "triangle mesh with {} triangles and {} vertices, bounds {:?}",
            mesh.triangle_count(),
            vertex_count,
            mesh.bounds()
        );
        Ok(mesh)
    }
}

fn non_empty<T>(v: Vec<T>) -> Option<Vec<T>> {
    (!v.is_empty()).then_some(v)
}

/// Vertex data shared by many [Triangle]s. All the geometry is stored in world space.
pub struct TriangleMesh {
    data: ShapeData,
    vertex_indices: Vec<usize>,
    positions: Vec<Point>,
    normals: Option<Vec<Normal>>,
    tangents: Option<Vec<Vec3>>,
    uvs: Option<Vec<Point2>>,
    face_indices: Option<Vec<usize>>,
    alpha_mask: Option<Arc<dyn FloatTexture>>,
    shadow_alpha_mask: Option<Arc<dyn FloatTexture>>,
}

impl fmt::Debug for TriangleMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriangleMesh")
            .field("triangles", &self.triangle_count())
            .field("vertices", &self.positions.len())
            .field("normals", &self.normals.is_some())
            .field("tangents", &self.tangents.is_some())
            .field("uvs", &self.uvs.is_some())
            .field("alpha_mask", &self.alpha_mask.is_some())
            .field("shadow_alpha_mask", &self.shadow_alpha_mask.is_some())
            .finish_non_exhaustive()
    }
}

impl TriangleMesh {
    /// Builds a mesh from loader buffers: packed `xyz` positions and packed triangle indices.
    pub fn from_raw(
        object_to_world: Transform,
        reverse_orientation: bool,
        positions: &[f32],
        indices: &[u32],
    ) -> Result<Self> {
        let positions: &[Vec3] = bytemuck::try_cast_slice(positions)
            .map_err(|e| anyhow!("positions must be packed triples of floats: {e:?}"))?;
        let indices: &[[u32; 3]] = bytemuck::try_cast_slice(indices)
            .map_err(|e| anyhow!("indices must be packed triples: {e:?}"))?;

        TriangleMeshBuilder {
            object_to_world,
            reverse_orientation,
            vertex_indices: indices.iter().flatten().map(|&i| i as usize).collect(),
            positions: positions.iter().copied().map(Point).collect(),
            ..Default::default()
        }
        .build()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_indices.len() / 3
    }

    pub fn triangle(&self, index: usize) -> Option<Triangle<'_>> {
        (index < self.triangle_count()).then_some(Triangle { mesh: self, index })
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle<'_>> + '_ {
        (0..self.triangle_count()).map(|index| Triangle { mesh: self, index })
    }

    /// World space bounds of all the vertices
    pub fn bounds(&self) -> Bounds3 {
        self.positions
            .iter()
            .fold(Bounds3::EMPTY, |b, &p| b.union_point(p))
    }

    pub fn data(&self) -> &ShapeData {
        &self.data
    }
}

/// A triangle of a [TriangleMesh], which must outlive it.
#[derive(Debug, Clone, Copy)]
pub struct Triangle<'a> {
    mesh: &'a TriangleMesh,
    index: usize,
}

/// Barycentric coordinates and parametric distance of a ray-triangle hit
struct TriangleHit {
    t: f32,
    b: [f32; 3],
}

impl<'a> Triangle<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    fn vertices(&self) -> [usize; 3] {
        let i = 3 * self.index;
        let v = &self.mesh.vertex_indices;
        [v[i], v[i + 1], v[i + 2]]
    }

    fn positions(&self) -> [Point; 3] {
        self.vertices().map(|v| self.mesh.positions[v])
    }

    fn uvs(&self) -> [Point2; 3] {
        match &self.mesh.uvs {
            Some(uvs) => self.vertices().map(|v| uvs[v]),
            None => DEFAULT_UVS,
        }
    }

    fn normals(&self) -> Option<[Normal; 3]> {
        let normals = self.mesh.normals.as_ref()?;
        Some(self.vertices().map(|v| normals[v]))
    }

    fn tangents(&self) -> Option<[Vec3; 3]> {
        let tangents = self.mesh.tangents.as_ref()?;
        Some(self.vertices().map(|v| tangents[v]))
    }

    /// Watertight ray-triangle intersection.
    ///
    /// The triangle is brought to a space where the ray starts at the origin and points along
    /// +z, so that the test reduces to 2D edge functions evaluated at the origin. Rays hitting
    /// an edge shared by two triangles hit at least one of them.
    fn find_hit(&self, ray: &Ray) -> Option<TriangleHit> {
        crate::counter!("Ray-triangle tests");
        let o = ray.origin.vec();

        // Permute so that z is the dominant axis of the direction
        let kz = ray.direction.max_dimension();
        let kx = (kz + 1) % 3;
        let ky = (kx + 1) % 3;
        let d = ray.direction.permute(kx, ky, kz);
        let mut pt = self
            .positions()
            .map(|p| (p.vec() - o).permute(kx, ky, kz));

        // Shear so that the ray points along +z, z is sheared later, only if there is a hit
        let sx = -d.x / d.z;
        let sy = -d.y / d.z;
        let sz = 1.0 / d.z;
        for p in &mut pt {
            p.x += sx * p.z;
            p.y += sy * p.z;
        }

        let edge = |a: Vec3, b: Vec3| a.x * b.y - a.y * b.x;
        let mut e = [edge(pt[1], pt[2]), edge(pt[2], pt[0]), edge(pt[0], pt[1])];
        // On an edge in single precision, all edge functions are recomputed in double precision
        // so that neighbouring triangles agree
        if e.contains(&0.0) {
            crate::counter!("Ray-triangle double precision fallbacks");
            let edge = |a: Vec3, b: Vec3| {
                (a.x as f64 * b.y as f64 - a.y as f64 * b.x as f64) as f32
            };
            e = [edge(pt[1], pt[2]), edge(pt[2], pt[0]), edge(pt[0], pt[1])];
        }

        if e.iter().any(|&e| e < 0.0) && e.iter().any(|&e| e > 0.0) {
            return None;
        }
        let det = e[0] + e[1] + e[2];
        if det == 0.0 {
            return None;
        }

        for p in &mut pt {
            p.z *= sz;
        }
        let t_scaled = e[0] * pt[0].z + e[1] * pt[1].z + e[2] * pt[2].z;
        if det < 0.0 && (t_scaled >= 0.0 || t_scaled < ray.t_max * det) {
            return None;
        }
        if det > 0.0 && (t_scaled <= 0.0 || t_scaled > ray.t_max * det) {
            return None;
        }

        let inv_det = 1.0 / det;
        let b = e.map(|e| e * inv_det);
        let t = t_scaled * inv_det;

        // Make sure t is certainly positive given the error of the computation
        let max_abs = |i: usize| pt.iter().map(|p| p[i].abs()).fold(0.0, f32::max);
        let max_x_t = max_abs(0);
        let max_y_t = max_abs(1);
        let max_z_t = max_abs(2);
        let delta_z = gamma(3) * max_z_t;
        let delta_x = gamma(5) * (max_x_t + max_z_t);
        let delta_y = gamma(5) * (max_y_t + max_z_t);
        let delta_e = 2.0 * (gamma(2) * max_x_t * max_y_t + delta_y * max_x_t + delta_x * max_y_t);
        let max_e = e.iter().map(|e| e.abs()).fold(0.0, f32::max);
        let delta_t = 3.0
            * (gamma(3) * max_e * max_z_t + delta_e * max_z_t + delta_z * max_e)
            * inv_det.abs();
        if t <= delta_t {
            return None;
        }

        Some(TriangleHit { t, b })
    }

    /// Differential geometry at a hit. Returns `None` for a degenerate triangle.
    fn surface_interaction(&self, ray: &Ray, hit: &TriangleHit) -> Option<SurfaceInteraction> {
        let TriangleHit { b, .. } = *hit;
        let p = self.positions();
        let uv = self.uvs();

        let duv02 = uv[0] - uv[2];
        let duv12 = uv[1] - uv[2];
        let dp02 = p[0] - p[2];
        let dp12 = p[1] - p[2];
        let determinant = duv02.x * duv12.y - duv02.y * duv12.x;
        let degenerate_uv = determinant.abs() < 1e-8;

        let (mut dpdu, mut dpdv) = (Vec3::ZERO, Vec3::ZERO);
        if !degenerate_uv {
            let inv_det = 1.0 / determinant;
            dpdu = (duv12.y * dp02 - duv02.y * dp12) * inv_det;
            dpdv = (-duv12.x * dp02 + duv02.x * dp12) * inv_det;
        }
        if degenerate_uv || dpdu.cross(dpdv).length_squared() == 0.0 {
            let ng = (p[2] - p[0]).cross(p[1] - p[0]);
            if ng.length_squared() == 0.0 {
                crate::warn_once!("ray hit the degenerate triangle {} of a mesh", self.index);
                return None;
            }
            crate::counter!("Degenerate UV fallbacks");
            crate::warn_once!("triangle {} has a degenerate uv parametrization", self.index);
            (dpdu, dpdv) = ng.coordinate_system();
        }

        let p_error = gamma(7) * barycentric_abs_sum(p, b);

        let flip = self.mesh.data.flips_normal();
        let mut si = SurfaceInteraction::new(
            Point::barycentric(p, b),
            p_error,
            Point2::barycentric(uv, b),
            -ray.direction,
            dpdu,
            dpdv,
            Normal::ZERO,
            Normal::ZERO,
            ray.time,
            flip,
        );
        si.face_index = self.mesh.face_indices.as_ref().map_or(0, |f| f[self.index]);

        // The geometric normal follows the winding of the vertices, not the parametrization
        let mut n = Normal(dp02.cross(dp12).normalize());
        if flip {
            n = -n;
        }
        si.hit.n = n;
        si.shading.n = n;

        let normals = self.normals();
        let tangents = self.tangents();
        if normals.is_none() && tangents.is_none() {
            return Some(si);
        }

        let interpolate = |v: [Vec3; 3]| b[0] * v[0] + b[1] * v[1] + b[2] * v[2];
        let ns = normals
            .map(|n| interpolate(n.map(Normal::vec)))
            .filter(|ns| ns.length_squared() > 0.0)
            .map_or(si.hit.n.vec(), Vec3::normalize);
        let ss = tangents
            .map(interpolate)
            .filter(|ss| ss.length_squared() > 0.0)
            .unwrap_or(si.dpdu)
            .normalize();

        let (ss, mut ts) = {
            let ts = ss.cross(ns);
            if ts.length_squared() > 0.0 {
                let ts = ts.normalize();
                (ts.cross(ns), ts)
            } else {
                ns.coordinate_system()
            }
        };

        let (dndu, dndv) = match normals {
            None => (Normal::ZERO, Normal::ZERO),
            Some(n) if degenerate_uv => {
                let dn = (n[2] - n[0]).vec().cross((n[1] - n[0]).vec());
                if dn.length_squared() == 0.0 {
                    (Normal::ZERO, Normal::ZERO)
                } else {
                    let (dndu, dndv) = dn.coordinate_system();
                    (Normal(dndu), Normal(dndv))
                }
            }
            Some(n) => {
                let dn1 = (n[0] - n[2]).vec();
                let dn2 = (n[1] - n[2]).vec();
                let inv_det = 1.0 / determinant;
                (
                    Normal((duv12.y * dn1 - duv02.y * dn2) * inv_det),
                    Normal((-duv12.x * dn1 + duv02.x * dn2) * inv_det),
                )
            }
        };

        // ss x ts is the interpolated normal. It is already in world space, so only the
        // orientation may flip it: cancel the flip done for the handedness.
        if self.mesh.data.transform_swaps_handedness() {
            ts = -ts;
        }
        si.set_shading_geometry(ss, ts, dndu, dndv, true);
        Some(si)
    }

    /// Whether `mask` cuts the surface away at `si`
    fn masked(mask: &Option<Arc<dyn FloatTexture>>, si: &SurfaceInteraction) -> bool {
        mask.as_ref().is_some_and(|mask| mask.evaluate(si) == 0.0)
    }
}

impl<'a> Shape for Triangle<'a> {
    fn data(&self) -> &ShapeData {
        &self.mesh.data
    }

    fn object_bound(&self) -> Bounds3 {
        let w2o = self.mesh.data.world_to_object();
        self.positions()
            .into_iter()
            .fold(Bounds3::EMPTY, |b, p| b.union_point(w2o.apply(p)))
    }

    /// Tight bounds of the vertices, which are stored in world space
    fn world_bound(&self) -> Bounds3 {
        self.positions()
            .into_iter()
            .fold(Bounds3::EMPTY, |b, p| b.union_point(p))
    }

    fn intersect(&self, ray: &Ray, test_alpha_texture: bool) -> Option<RayIntersection> {
        let hit = self.find_hit(ray)?;
        let si = self.surface_interaction(ray, &hit)?;
        if test_alpha_texture && Self::masked(&self.mesh.alpha_mask, &si) {
            return None;
        }
        crate::counter!("Ray-triangle hits");
        Some(RayIntersection {
            t: hit.t,
            interaction: si,
        })
    }

    fn intersect_p(&self, ray: &Ray, test_alpha_texture: bool) -> bool {
        let Some(hit) = self.find_hit(ray) else {
            return false;
        };
        let mesh = self.mesh;
        if test_alpha_texture && (mesh.alpha_mask.is_some() || mesh.shadow_alpha_mask.is_some()) {
            let Some(si) = self.surface_interaction(ray, &hit) else {
                return false;
            };
            if Self::masked(&mesh.alpha_mask, &si) || Self::masked(&mesh.shadow_alpha_mask, &si) {
                return false;
            }
        }
        crate::counter!("Ray-triangle hits");
        true
    }

    fn area(&self) -> f32 {
        let [p0, p1, p2] = self.positions();
        0.5 * (p1 - p0).cross(p2 - p0).length()
    }

    fn sample(&self, u: Sample2D) -> ShapeSample {
        let [b0, b1] = UniformTriangle.sample_with(u);
        let b = [b0, b1, 1.0 - b0 - b1];
        let p = self.positions();
        let point = Point::barycentric(p, b);

        let mut n = Normal((p[1] - p[0]).cross(p[2] - p[0]).normalize());
        if let Some(normals) = self.normals() {
            let ns = b[0] * normals[0] + b[1] * normals[1] + b[2] * normals[2];
            n = n.face_forward(ns.vec());
        } else if self.mesh.data.flips_normal() {
            n = -n;
        }

        let p_error = gamma(6) * barycentric_abs_sum(p, b);
        ShapeSample {
            it: Interaction::new(point, n, p_error, Vec3::ZERO, 0.0, MediumInterface::default()),
            pdf: 1.0 / self.area(),
        }
    }
}

/// Sum over the vertices of `|b_i * p_i|`, per axis. Scaled by some `gamma`, this bounds the
/// error of a point computed by barycentric interpolation.
fn barycentric_abs_sum(p: [Point; 3], b: [f32; 3]) -> Vec3 {
    (b[0] * p[0].vec()).abs() + (b[1] * p[1].vec()).abs() + (b[2] * p[2].vec()).abs()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::texture::ConstantTexture;

    use super::*;

    fn single(reverse_orientation: bool) -> TriangleMeshBuilder {
        TriangleMeshBuilder {
            reverse_orientation,
            ..TriangleMeshBuilder::new(
                Transform::IDENTITY,
                vec![0, 1, 2],
                vec![
                    Point::new(0.0, 0.0, 0.0),
                    Point::new(2.0, 0.0, 0.0),
                    Point::new(1.0, 1.0, 0.0),
                ],
            )
        }
    }

    fn up_ray() -> Ray {
        Ray::new(Point::new(0.0, 0.0, -1.0), Vec3::Z)
    }

    #[test]
    fn hit_at_vertex() {
        for (reverse, expected_n) in [(false, Vec3::Z), (true, -Vec3::Z)] {
            let mesh = single(reverse).build().unwrap();
            let triangle = mesh.triangle(0).unwrap();
            let hit = triangle.intersect(&up_ray(), true).unwrap();

            assert_eq!(hit.t, 1.0);
            assert_eq!(hit.interaction.hit.p, Point::ORIGIN);
            assert_eq!(hit.interaction.hit.n.vec(), expected_n);
            assert_eq!(hit.interaction.shading.n.vec(), expected_n);
            assert!(triangle.intersect_p(&up_ray(), true));
        }
    }

    #[test]
    fn degenerate_uvs() {
        let mesh = TriangleMeshBuilder {
            uvs: vec![Point2::new(0.5, 0.5); 3],
            ..single(false)
        }
        .build()
        .unwrap();
        let triangle = mesh.triangle(0).unwrap();

        let hit = triangle.intersect(&up_ray(), true).unwrap();
        assert_eq!(hit.t, 1.0);
        assert_eq!(hit.interaction.hit.n.vec(), Vec3::Z);
        let si = hit.interaction;
        assert!(!si.dpdu.is_nan() && !si.dpdv.is_nan());
        assert!(si.dpdu.cross(si.dpdv).length_squared() > 0.0);
        assert!(si.dpdu.dot(Vec3::Z).abs() < 1e-6);

        let inside = Ray::new(Point::new(1.0, 0.5, -1.0), Vec3::Z);
        assert!(triangle.intersect_p(&inside, true));
        let outside = Ray::new(Point::new(1.0, 1.5, -1.0), Vec3::Z);
        assert!(!triangle.intersect_p(&outside, true));
    }

    #[test]
    fn misses() {
        let mesh = single(false).build().unwrap();
        let triangle = mesh.triangle(0).unwrap();

        // Outside of the edges
        assert!(triangle.intersect(&Ray::new(Point::new(1.5, 0.9, -1.0), Vec3::Z), true).is_none());
        // Pointing away
        let away = Ray::new(Point::new(1.0, 0.5, -1.0), -Vec3::Z);
        assert!(triangle.intersect(&away, true).is_none());
        // Too short
        let short = Ray::new(Point::new(1.0, 0.5, -1.0), Vec3::Z).with_t_max(0.5);
        assert!(!triangle.intersect_p(&short, true));
        // Parallel to the plane
        let beside = Ray::new(Point::new(-5.0, 0.2, -1.0), Vec3::X);
        assert!(triangle.intersect(&beside, true).is_none());
        // Grazing, in the plane
        assert!(triangle.intersect(&Ray::new(Point::new(-5.0, 0.2, 0.0), Vec3::X), true).is_none());
    }

    #[test]
    fn shared_edges_are_watertight() {
        // Unit square split along its diagonal
        let mesh = TriangleMeshBuilder::new(
            Transform::rotate(17.0, Vec3::new(1.0, 2.0, 3.0)),
            vec![0, 1, 2, 0, 2, 3],
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
        )
        .build()
        .unwrap();
        let o2w = *mesh.data().object_to_world();

        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let s: f32 = rng.gen_range(0.01..0.99);
            let target = o2w.apply(Point::new(s, s, 0.0));
            let origin = Point::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 3.0);
            let ray = Ray::new(origin, target - origin);
            assert!(
                mesh.triangles().any(|t| t.intersect_p(&ray, true)),
                "ray through the diagonal at {s} missed"
            );
        }
    }

    #[test]
    fn alpha_masks() {
        let mesh = TriangleMeshBuilder {
            alpha_mask: Some(Arc::new(ConstantTexture(0.0))),
            ..single(false)
        }
        .build()
        .unwrap();
        let triangle = mesh.triangle(0).unwrap();
        let ray = Ray::new(Point::new(1.0, 0.5, -1.0), Vec3::Z);
        assert!(triangle.intersect(&ray, true).is_none());
        assert!(!triangle.intersect_p(&ray, true));
        assert!(triangle.intersect(&ray, false).is_some());

        // Only shadow rays are affected by the shadow mask
        let mesh = TriangleMeshBuilder {
            shadow_alpha_mask: Some(Arc::new(ConstantTexture(0.0))),
            ..single(false)
        }
        .build()
        .unwrap();
        let triangle = mesh.triangle(0).unwrap();
        assert!(triangle.intersect(&ray, true).is_some());
        assert!(!triangle.intersect_p(&ray, true));
        assert!(triangle.intersect_p(&ray, false));

        // Cut the half where u > 0.5
        let mesh = TriangleMeshBuilder {
            alpha_mask: Some(Arc::new(|si: &SurfaceInteraction| {
                if si.uv.0.x > 0.5 {
                    0.0
                } else {
                    1.0
                }
            })),
            ..single(false)
        }
        .build()
        .unwrap();
        let triangle = mesh.triangle(0).unwrap();
        assert!(triangle.intersect_p(&Ray::new(Point::new(0.4, 0.1, -1.0), Vec3::Z), true));
        assert!(!triangle.intersect_p(&Ray::new(Point::new(1.6, 0.1, -1.0), Vec3::Z), true));
    }

    #[test]
    fn vertex_normals_are_authoritative() {
        let down = Normal::new(0.0, 0.0, -1.0);
        for reverse in [false, true] {
            let mesh = TriangleMeshBuilder {
                normals: vec![down; 3],
                ..single(reverse)
            }
            .build()
            .unwrap();
            let triangle = mesh.triangle(0).unwrap();
            let si = triangle
                .intersect(&Ray::new(Point::new(1.0, 0.5, -1.0), Vec3::Z), true)
                .unwrap()
                .interaction;

            let expected = if reverse { Vec3::Z } else { -Vec3::Z };
            assert!((si.shading.n.vec() - expected).length() < 1e-6);
            assert!(si.hit.n.dot(si.shading.n.vec()) > 0.0);
            assert_eq!(si.dndu, Normal::ZERO);
        }
    }

    #[test]
    fn mirrored_mesh_keeps_vertex_normals() {
        let mesh = TriangleMeshBuilder {
            object_to_world: Transform::scale(1.0, -1.0, 1.0),
            normals: vec![Normal::new(0.0, 0.0, 1.0); 3],
            ..single(false)
        }
        .build()
        .unwrap();
        assert!(mesh.data().transform_swaps_handedness());
        let triangle = mesh.triangle(0).unwrap();
        let si = triangle
            .intersect(&Ray::new(Point::new(1.0, -0.5, -1.0), Vec3::Z), true)
            .unwrap()
            .interaction;
        assert!((si.shading.n.vec() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn interpolated_shading_geometry() {
        let mesh = TriangleMeshBuilder {
            normals: vec![
                Normal::new(-1.0, 0.0, 1.0).normalize(),
                Normal::new(1.0, 0.0, 1.0).normalize(),
                Normal::new(0.0, 1.0, 1.0).normalize(),
            ],
            uvs: vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.5, 1.0)],
            face_indices: vec![42],
            ..single(false)
        }
        .build()
        .unwrap();
        let triangle = mesh.triangle(0).unwrap();
        let si = triangle
            .intersect(&Ray::new(Point::new(1.0, 0.3, -1.0), Vec3::Z), true)
            .unwrap()
            .interaction;

        assert_eq!(si.face_index, 42);
        let ns = si.shading.n.vec();
        assert!((ns.length() - 1.0).abs() < 1e-5);
        assert!(si.shading.dpdu.dot(ns).abs() < 1e-5);
        assert!(si.shading.dpdv.dot(ns).abs() < 1e-5);
        // The normal turns toward +x along u
        assert!(si.shading.dndu.vec().x > 0.0);
        // uv of the hit point
        assert!((si.uv.0.x - 0.5).abs() < 1e-5);
        assert!((si.uv.0.y - 0.3).abs() < 1e-5);
    }

    #[test]
    fn mesh_is_transformed_to_world() {
        let mesh = TriangleMeshBuilder {
            object_to_world: Transform::translate(Vec3::new(0.0, 0.0, 5.0)),
            ..single(false)
        }
        .build()
        .unwrap();
        let triangle = mesh.triangle(0).unwrap();

        let hit = triangle.intersect(&Ray::new(Point::new(1.0, 0.5, 0.0), Vec3::Z), true).unwrap();
        assert!((hit.t - 5.0).abs() < 1e-6);

        let world = triangle.world_bound();
        assert_eq!(world.min, Point::new(0.0, 0.0, 5.0));
        assert_eq!(world.max, Point::new(2.0, 1.0, 5.0));
        let object = triangle.object_bound();
        assert_eq!(object.min, Point::ORIGIN);
        assert_eq!(object.max, Point::new(2.0, 1.0, 0.0));
        assert_eq!(triangle.area(), 1.0);
    }

    #[test]
    fn samples_lie_on_triangle() {
        let mesh = TriangleMeshBuilder {
            normals: vec![Normal::new(0.0, 0.0, -1.0); 3],
            ..single(false)
        }
        .build()
        .unwrap();
        let triangle = mesh.triangle(0).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..100 {
            let ShapeSample { it, pdf } = triangle.sample(rng.gen());
            assert_eq!(it.p.z(), 0.0);
            let ray = Ray::new(it.p + Vec3::new(0.0, 0.0, -1.0), Vec3::Z);
            assert!(triangle.intersect_p(&ray, true) || it.p.y() < 1e-5);
            // Faces the interpolated normal
            assert_eq!(it.n.vec(), -Vec3::Z);
            assert_eq!(pdf, 1.0);
        }
    }

    #[test]
    fn validation() {
        let points = || vec![Point::ORIGIN, Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)];

        let not_triangles = TriangleMeshBuilder::new(Transform::IDENTITY, vec![0, 1], points());
        assert!(not_triangles.build().is_err());

        let out_of_bounds = TriangleMeshBuilder::new(Transform::IDENTITY, vec![0, 1, 3], points());
        assert!(out_of_bounds.build().is_err());

        let missing_normals = TriangleMeshBuilder {
            normals: vec![Normal::new(0.0, 0.0, 1.0); 2],
            ..TriangleMeshBuilder::new(Transform::IDENTITY, vec![0, 1, 2], points())
        };
        assert!(missing_normals.build().is_err());

        let face_indices = TriangleMeshBuilder {
            face_indices: vec![0, 1],
            ..TriangleMeshBuilder::new(Transform::IDENTITY, vec![0, 1, 2], points())
        };
        assert!(face_indices.build().is_err());

        assert!(TriangleMeshBuilder::new(Transform::IDENTITY, vec![], points()).build().is_err());
    }

    #[test]
    fn from_raw_buffers() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let indices = [0, 1, 2, 0, 2, 3];
        let from_raw = |positions: &[f32], indices: &[u32]| {
            TriangleMesh::from_raw(Transform::IDENTITY, false, positions, indices)
        };
        let mesh = from_raw(&positions, &indices).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangles().count(), 2);
        assert!(mesh.triangle(2).is_none());
        let total: f32 = mesh.triangles().map(|t| t.area()).sum();
        assert_eq!(total, 1.0);
        assert_eq!(mesh.bounds().max, Point::new(1.0, 1.0, 0.0));

        assert!(from_raw(&positions[..7], &indices).is_err());
        assert!(from_raw(&positions, &indices[..4]).is_err());
        assert!(from_raw(&positions, &[0, 1, 4]).is_err());
    }
}

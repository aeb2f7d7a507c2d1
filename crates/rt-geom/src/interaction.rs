//! The records produced by ray-shape intersections and consumed by shading code.

use glam::Vec3;

use crate::{
    math::{
        float::{next_float_down, next_float_up},
        normal::Normal,
        point::{Point, Point2},
    },
    medium::{MediumId, MediumInterface},
    ray::Ray,
};

/// Shadow rays stop that far (in parametric distance) before their target to avoid hitting it.
pub const SHADOW_EPSILON: f32 = 0.0001;

/// Offsets `p` along the normal so that the result lies outside of the box of half extent
/// `p_error` around `p`, on the side `w` is pointing to.
///
/// Rays leaving from the returned point can neither hit the surface `p` lies on again nor
/// start on the wrong side of it.
pub fn offset_ray_origin(p: Point, p_error: Vec3, n: Normal, w: Vec3) -> Point {
    let d = n.abs().dot(p_error);
    let mut offset = d * n.vec();
    if n.dot(w) < 0.0 {
        offset = -offset;
    }
    let mut po = p + offset;

    // Round away from p so the offset survives the addition
    for i in 0..3 {
        if offset[i] > 0.0 {
            po.0[i] = next_float_up(po.0[i]);
        } else if offset[i] < 0.0 {
            po.0[i] = next_float_down(po.0[i]);
        }
    }
    po
}

/// A point where light interacts with the scene, either on a surface or inside a medium.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interaction {
    pub p: Point,
    pub time: f32,
    /// Conservative bound on the absolute error of each coordinate of `p`
    pub p_error: Vec3,
    /// Outgoing direction, toward the origin of the incoming ray
    pub wo: Vec3,
    /// Zero for interactions inside a medium
    pub n: Normal,
    pub medium_interface: MediumInterface,
}

impl Interaction {
    pub fn new(
        p: Point,
        n: Normal,
        p_error: Vec3,
        wo: Vec3,
        time: f32,
        medium_interface: MediumInterface,
    ) -> Self {
        Self {
            p,
            time,
            p_error,
            wo,
            n,
            medium_interface,
        }
    }

    /// An interaction inside a participating medium, which has no normal
    pub fn in_medium(p: Point, wo: Vec3, time: f32, medium: Option<MediumId>) -> Self {
        Self {
            p,
            time,
            p_error: Vec3::ZERO,
            wo,
            n: Normal::ZERO,
            medium_interface: MediumInterface::new(medium),
        }
    }

    pub fn is_surface_interaction(&self) -> bool {
        self.n != Normal::ZERO
    }

    pub fn is_medium_interaction(&self) -> bool {
        !self.is_surface_interaction()
    }

    /// The medium a ray leaving in direction `w` travels through
    pub fn get_medium(&self, w: Vec3) -> Option<MediumId> {
        if self.is_medium_interaction() {
            debug_assert!(!self.medium_interface.is_transition());
            self.medium_interface.inside
        } else if self.n.dot(w) > 0.0 {
            self.medium_interface.outside
        } else {
            self.medium_interface.inside
        }
    }

    pub fn spawn_ray(&self, d: Vec3) -> Ray {
        let origin = offset_ray_origin(self.p, self.p_error, self.n, d);
        Ray::new(origin, d)
            .with_time(self.time)
            .with_medium(self.get_medium(d))
    }

    /// Spawns a ray reaching `p2` at `t = 1 - SHADOW_EPSILON`
    pub fn spawn_ray_to_point(&self, p2: Point) -> Ray {
        let origin = offset_ray_origin(self.p, self.p_error, self.n, p2 - self.p);
        let d = p2 - origin;
        Ray::new(origin, d)
            .with_t_max(1.0 - SHADOW_EPSILON)
            .with_time(self.time)
            .with_medium(self.get_medium(d))
    }

    /// Spawns a ray toward another interaction, both ends being offset from their surfaces
    pub fn spawn_ray_to(&self, it: &Interaction) -> Ray {
        let origin = offset_ray_origin(self.p, self.p_error, self.n, it.p - self.p);
        let target = offset_ray_origin(it.p, it.p_error, it.n, origin - it.p);
        let d = target - origin;
        Ray::new(origin, d)
            .with_t_max(1.0 - SHADOW_EPSILON)
            .with_time(self.time)
            .with_medium(self.get_medium(d))
    }
}

/// Shading geometry, possibly perturbed from the true geometry by interpolated normals or bump
/// mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct Shading {
    pub n: Normal,
    pub dpdu: Vec3,
    pub dpdv: Vec3,
    pub dndu: Normal,
    pub dndv: Normal,
}

/// Local differential geometry at a ray-surface hit point
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceInteraction {
    pub hit: Interaction,
    pub uv: Point2,
    pub dpdu: Vec3,
    pub dpdv: Vec3,
    pub dndu: Normal,
    pub dndv: Normal,
    pub shading: Shading,
    /// Screen space footprint, filled by the camera/integrator
    pub dpdx: Vec3,
    pub dpdy: Vec3,
    pub dudx: f32,
    pub dvdx: f32,
    pub dudy: f32,
    pub dvdy: f32,
    pub face_index: usize,
    /// Whether the normal is flipped from `dpdu x dpdv`, because of the shape orientation or
    /// because its transformation changes the handedness of the coordinate system.
    pub flip_normal: bool,
}

impl SurfaceInteraction {
    /// The geometric normal is `dpdu x dpdv`, reversed when `flip_normal` is set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        p: Point,
        p_error: Vec3,
        uv: Point2,
        wo: Vec3,
        dpdu: Vec3,
        dpdv: Vec3,
        dndu: Normal,
        dndv: Normal,
        time: f32,
        flip_normal: bool,
    ) -> Self {
        let mut n = Normal(dpdu.cross(dpdv).normalize());
        if flip_normal {
            n = -n;
        }

        Self {
            hit: Interaction::new(p, n, p_error, wo, time, MediumInterface::default()),
            uv,
            dpdu,
            dpdv,
            dndu,
            dndv,
            shading: Shading {
                n,
                dpdu,
                dpdv,
                dndu,
                dndv,
            },
            flip_normal,
            ..Default::default()
        }
    }

    /// Sets the shading frame. The shading normal is `dpdus x dpdvs`, reversed when the
    /// geometric one is.
    ///
    /// The two normals are then brought into the same hemisphere: when
    /// `orientation_is_authoritative` the geometric normal follows the shading one, otherwise
    /// the shading normal follows the geometric one.
    pub fn set_shading_geometry(
        &mut self,
        dpdus: Vec3,
        dpdvs: Vec3,
        dndus: Normal,
        dndvs: Normal,
        orientation_is_authoritative: bool,
    ) {
        let mut ns = Normal(dpdus.cross(dpdvs).normalize());
        if self.flip_normal {
            ns = -ns;
        }
        if orientation_is_authoritative {
            self.hit.n = self.hit.n.face_forward(ns.vec());
        } else {
            ns = ns.face_forward(self.hit.n.vec());
        }

        self.shading = Shading {
            n: ns,
            dpdu: dpdus,
            dpdv: dpdvs,
            dndu: dndus,
            dndv: dndvs,
        };
    }

    pub fn spawn_ray(&self, d: Vec3) -> Ray {
        self.hit.spawn_ray(d)
    }
}

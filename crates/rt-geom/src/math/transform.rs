//! Affine (and projective) transformations with rounding error tracking.
//!
//! A [Transform] stores both its matrix and the inverse matrix, computed once. Points, vectors
//! and normals all transform differently:
//! - points get the full homogeneous transformation, including translation and the perspective
//!   divide,
//! - vectors only get the linear part,
//! - normals get the inverse transpose of the linear part so that they stay orthogonal to the
//!   surface.

use std::ops::Mul;

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::{
    interaction::SurfaceInteraction,
    ray::{Ray, RayDifferential},
};

use super::{bounds::Bounds3, float::gamma, normal::Normal, point::Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: Mat4,
    m_inv: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub trait Transformer<T> {
    fn apply(&self, v: T) -> T;
}

/// Row major view of a matrix: `rows(m)[i][j]` is the element at row `i`, column `j`
fn rows(m: &Mat4) -> [[f32; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

impl Transform {
    pub const IDENTITY: Self = Self {
        m: Mat4::IDENTITY,
        m_inv: Mat4::IDENTITY,
    };

    /// Builds a transformation from its matrix, the inverse is computed here.
    ///
    /// Returns `None` if the matrix is singular.
    pub fn try_new(m: Mat4) -> Option<Self> {
        let det = m.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self {
            m,
            m_inv: m.inverse(),
        })
    }

    /// Builds a transformation from a matrix and its known inverse.
    pub fn from_parts(m: Mat4, m_inv: Mat4) -> Self {
        Self { m, m_inv }
    }

    pub fn translate(delta: Vec3) -> Self {
        Self {
            m: Mat4::from_translation(delta),
            m_inv: Mat4::from_translation(-delta),
        }
    }

    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        Self {
            m: Mat4::from_scale(Vec3::new(x, y, z)),
            m_inv: Mat4::from_scale(Vec3::new(1.0 / x, 1.0 / y, 1.0 / z)),
        }
    }

    /// Rotation of `theta` degrees around the x axis
    pub fn rotate_x(theta: f32) -> Self {
        Self::from_rotation(Mat4::from_rotation_x(theta.to_radians()))
    }

    /// Rotation of `theta` degrees around the y axis
    pub fn rotate_y(theta: f32) -> Self {
        Self::from_rotation(Mat4::from_rotation_y(theta.to_radians()))
    }

    /// Rotation of `theta` degrees around the z axis
    pub fn rotate_z(theta: f32) -> Self {
        Self::from_rotation(Mat4::from_rotation_z(theta.to_radians()))
    }

    /// Rotation of `theta` degrees around an arbitrary axis
    pub fn rotate(theta: f32, axis: Vec3) -> Self {
        Self::from_rotation(Mat4::from_axis_angle(axis.normalize(), theta.to_radians()))
    }

    /// The inverse of a rotation is its transpose
    fn from_rotation(m: Mat4) -> Self {
        Self {
            m,
            m_inv: m.transpose(),
        }
    }

    /// World to camera transformation for a camera at `pos` looking at `look`.
    ///
    /// The camera looks down its +z axis with +y up. Returns `None` when `up` and the viewing
    /// direction are colinear.
    pub fn look_at(pos: Point, look: Point, up: Vec3) -> Option<Self> {
        let dir = (look - pos).normalize();
        let right = up.normalize().cross(dir);
        if right.length_squared() == 0.0 {
            log::error!(
                "up vector {up} and viewing direction {dir} passed to look_at are pointing in the \
                 same direction"
            );
            return None;
        }
        let right = right.normalize();
        let new_up = dir.cross(right);

        let camera_to_world = Mat4::from_cols(
            right.extend(0.0),
            new_up.extend(0.0),
            dir.extend(0.0),
            pos.vec().extend(1.0),
        );
        Some(Self {
            m: camera_to_world.inverse(),
            m_inv: camera_to_world,
        })
    }

    /// Perspective projection with a field of view of `fov` degrees, mapping `z = near` to 0 and
    /// `z = far` to 1.
    pub fn perspective(fov: f32, near: f32, far: f32) -> Option<Self> {
        let persp = Mat4::from_cols(
            Vec4::X,
            Vec4::Y,
            Vec4::new(0.0, 0.0, far / (far - near), 1.0),
            Vec4::new(0.0, 0.0, -far * near / (far - near), 0.0),
        );
        let inv_tan_ang = 1.0 / f32::tan(fov.to_radians() / 2.0);
        Some(Self::scale(inv_tan_ang, inv_tan_ang, 1.0) * Self::try_new(persp)?)
    }

    pub fn inverse(&self) -> Self {
        Self {
            m: self.m_inv,
            m_inv: self.m,
        }
    }

    pub fn transpose(&self) -> Self {
        Self {
            m: self.m.transpose(),
            m_inv: self.m_inv.transpose(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        self.m
    }

    pub fn inverse_matrix(&self) -> Mat4 {
        self.m_inv
    }

    pub fn is_identity(&self) -> bool {
        self.m == Mat4::IDENTITY
    }

    /// Whether the transformation changes the length of some unit axis
    pub fn has_scale(&self) -> bool {
        let not_one = |v: Vec3| {
            let l2 = self.apply(v).length_squared();
            !(0.999..=1.001).contains(&l2)
        };
        not_one(Vec3::X) || not_one(Vec3::Y) || not_one(Vec3::Z)
    }

    /// Whether the transformation turns a right handed coordinate system into a left handed one.
    pub fn swaps_handedness(&self) -> bool {
        Mat3::from_mat4(self.m).determinant() < 0.0
    }

    /// Transforms `p` and returns a conservative bound on the absolute error of the result.
    pub fn apply_point_with_error(&self, p: Point) -> (Point, Vec3) {
        let m = rows(&self.m);
        let Vec3 { x, y, z } = p.vec();
        let abs_sum =
            |r: [f32; 4]| (r[0] * x).abs() + (r[1] * y).abs() + (r[2] * z).abs() + r[3].abs();
        let error = gamma(3) * Vec3::new(abs_sum(m[0]), abs_sum(m[1]), abs_sum(m[2]));
        (self.apply(p), error)
    }

    /// Transforms `p`, which is known up to `p_error`, and returns a conservative bound on the
    /// absolute error of the result.
    pub fn apply_point_with_abs_error(&self, p: Point, p_error: Vec3) -> (Point, Vec3) {
        let m = rows(&self.m);
        let Vec3 { x, y, z } = p.vec();
        let error = |r: [f32; 4]| {
            (gamma(3) + 1.0) * Vec3::new(r[0], r[1], r[2]).abs().dot(p_error)
                + gamma(3) * ((r[0] * x).abs() + (r[1] * y).abs() + (r[2] * z).abs() + r[3].abs())
        };
        let error = Vec3::new(error(m[0]), error(m[1]), error(m[2]));
        (self.apply(p), error)
    }

    pub fn apply_vector_with_error(&self, v: Vec3) -> (Vec3, Vec3) {
        let m = rows(&self.m);
        let abs_sum = |r: [f32; 4]| (r[0] * v.x).abs() + (r[1] * v.y).abs() + (r[2] * v.z).abs();
        let error = gamma(3) * Vec3::new(abs_sum(m[0]), abs_sum(m[1]), abs_sum(m[2]));
        (self.apply(v), error)
    }

    pub fn apply_vector_with_abs_error(&self, v: Vec3, v_error: Vec3) -> (Vec3, Vec3) {
        let m = rows(&self.m);
        let error = |r: [f32; 4]| {
            (gamma(3) + 1.0) * Vec3::new(r[0], r[1], r[2]).abs().dot(v_error)
                + gamma(3) * ((r[0] * v.x).abs() + (r[1] * v.y).abs() + (r[2] * v.z).abs())
        };
        let error = Vec3::new(error(m[0]), error(m[1]), error(m[2]));
        (self.apply(v), error)
    }

    /// Transforms a ray, returning the error bounds on the transformed origin and direction.
    ///
    /// The origin is moved forward along the direction by the amount of its error projected on
    /// the direction, so that the computed origin is not behind the exact one. `t_max` is
    /// shortened accordingly.
    pub fn apply_ray_with_error(&self, r: &Ray) -> (Ray, Vec3, Vec3) {
        let (mut o, o_error) = self.apply_point_with_error(r.origin);
        let (d, d_error) = self.apply_vector_with_error(r.direction);

        let length_squared = d.length_squared();
        let mut t_max = r.t_max;
        if length_squared > 0.0 {
            let dt = d.abs().dot(o_error) / length_squared;
            o += d * dt;
            t_max -= dt;
        }

        let ray = Ray {
            origin: o,
            direction: d,
            t_max,
            time: r.time,
            medium: r.medium,
        };
        (ray, o_error, d_error)
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// `(a * b).apply(x) == a.apply(b.apply(x))`
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            m: self.m * rhs.m,
            m_inv: rhs.m_inv * self.m_inv,
        }
    }
}

impl Transformer<Vec3> for Transform {
    /// Apply the linear part only, vectors are not translated
    fn apply(&self, v: Vec3) -> Vec3 {
        let m = rows(&self.m);
        let row = |r: [f32; 4]| r[0] * v.x + r[1] * v.y + r[2] * v.z;
        Vec3::new(row(m[0]), row(m[1]), row(m[2]))
    }
}

impl Transformer<Point> for Transform {
    fn apply(&self, p: Point) -> Point {
        let m = rows(&self.m);
        let Vec3 { x, y, z } = p.vec();
        let row = |r: [f32; 4]| r[0] * x + r[1] * y + r[2] * z + r[3];
        let (xp, yp, zp, wp) = (row(m[0]), row(m[1]), row(m[2]), row(m[3]));
        debug_assert!(wp != 0.0, "point {p:?} mapped to infinity");
        if wp == 1.0 {
            Point::new(xp, yp, zp)
        } else {
            Point::new(xp, yp, zp) * (1.0 / wp)
        }
    }
}

impl Transformer<Normal> for Transform {
    /// Apply the inverse transpose of the linear part
    fn apply(&self, n: Normal) -> Normal {
        let m_inv = rows(&self.m_inv);
        let Vec3 { x, y, z } = n.vec();
        let col = |j: usize| m_inv[0][j] * x + m_inv[1][j] * y + m_inv[2][j] * z;
        Normal::new(col(0), col(1), col(2))
    }
}

impl Transformer<Ray> for Transform {
    fn apply(&self, r: Ray) -> Ray {
        self.apply_ray_with_error(&r).0
    }
}

impl Transformer<RayDifferential> for Transform {
    fn apply(&self, r: RayDifferential) -> RayDifferential {
        RayDifferential {
            ray: self.apply(r.ray),
            has_differentials: r.has_differentials,
            rx_origin: self.apply(r.rx_origin),
            ry_origin: self.apply(r.ry_origin),
            rx_direction: self.apply(r.rx_direction),
            ry_direction: self.apply(r.ry_direction),
        }
    }
}

impl Transformer<Bounds3> for Transform {
    /// Bounds of the 8 transformed corners, which is loose under rotations
    fn apply(&self, b: Bounds3) -> Bounds3 {
        if b.is_empty() {
            return b;
        }
        (0..8).fold(Bounds3::EMPTY, |acc, i| {
            acc.union_point(self.apply(b.corner(i)))
        })
    }
}

impl Transformer<SurfaceInteraction> for Transform {
    fn apply(&self, si: SurfaceInteraction) -> SurfaceInteraction {
        let (p, p_error) = self.apply_point_with_abs_error(si.hit.p, si.hit.p_error);
        let mut ret = si;

        ret.hit.p = p;
        ret.hit.p_error = p_error;
        ret.hit.n = self.apply(si.hit.n).normalize();
        ret.hit.wo = self.apply(si.hit.wo).normalize_or_zero();

        ret.dpdu = self.apply(si.dpdu);
        ret.dpdv = self.apply(si.dpdv);
        ret.dndu = self.apply(si.dndu);
        ret.dndv = self.apply(si.dndv);

        ret.shading.n = self.apply(si.shading.n).normalize();
        ret.shading.dpdu = self.apply(si.shading.dpdu);
        ret.shading.dpdv = self.apply(si.shading.dpdv);
        ret.shading.dndu = self.apply(si.shading.dndu);
        ret.shading.dndv = self.apply(si.shading.dndv);

        ret.dpdx = self.apply(si.dpdx);
        ret.dpdy = self.apply(si.dpdy);

        ret.shading.n = ret.shading.n.face_forward(ret.hit.n.vec());
        ret
    }
}

use glam::{Mat3, Vec3};

/// Represent an orthonormal frame
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    frame: Mat3,
}

impl Frame {
    /// Construct a Frame from a single vector using the algorithm described in
    /// “Building an Orthonormal Basis, Revisited (JCGT).” Accessed August 6, 2024.
    /// <https://jcgt.org/published/0006/01/01/>
    /// n is expected to be normalized and will be used as the +z axis
    pub fn new(n: Vec3) -> Self {
        let sign = f32::signum(n.z);
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;

        let this = Self {
            frame: Mat3::from_cols(
                Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x),
                Vec3::new(b, sign + n.y * n.y * a, -n.y),
                n,
            ),
        };
        debug_assert!(
            (this.frame * this.frame.transpose() - Mat3::IDENTITY)
                .to_cols_array()
                .into_iter()
                .map(f32::abs)
                .fold(0.0, f32::max)
                < 1e-3,
            "frame built from a non normalized vector {n}"
        );

        this
    }

    pub fn to_local(&self, global: Vec3) -> Vec3 {
        self.frame.transpose() * global
    }

    pub fn from_local(&self, local: Vec3) -> Vec3 {
        self.frame * local
    }

    pub fn x(&self) -> Vec3 {
        self.frame.col(0)
    }
    pub fn y(&self) -> Vec3 {
        self.frame.col(1)
    }
    pub fn z(&self) -> Vec3 {
        self.frame.col(2)
    }
}

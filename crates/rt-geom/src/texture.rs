//! Scalar textures, evaluated at a surface point.
//!
//! Only what the shapes need lives here: triangle meshes use float textures as alpha masks to
//! cut holes in their geometry.

use crate::interaction::SurfaceInteraction;

pub trait FloatTexture: Send + Sync {
    fn evaluate(&self, si: &SurfaceInteraction) -> f32;
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantTexture(pub f32);

impl FloatTexture for ConstantTexture {
    fn evaluate(&self, _si: &SurfaceInteraction) -> f32 {
        self.0
    }
}

impl<F> FloatTexture for F
where
    F: Fn(&SurfaceInteraction) -> f32 + Send + Sync,
{
    fn evaluate(&self, si: &SurfaceInteraction) -> f32 {
        self(si)
    }
}

//! Geometric core of a physically based ray tracer.
//!
//! Rays are intersected against analytic quadrics and triangle meshes. Every hit carries a
//! conservative bound on its floating point error so that rays spawned from it never
//! re-intersect the surface they leave.

pub mod interaction;
pub mod math;
pub mod medium;
pub mod ray;
pub mod shape;
pub mod texture;
pub mod utils;

pub use rand_xoshiro::Xoshiro256StarStar as Rng;

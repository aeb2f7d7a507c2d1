use std::ops::Deref;

use rand::{
    distributions::{Standard, Uniform},
    prelude::Distribution,
    Rng,
};

use super::vec::{Vec2, Vec3};

/// Samples are expected to be in [0;1(^N
#[derive(Debug, Clone, Copy)]
pub struct Samples<const N: usize>(pub [f32; N]);
pub type Sample1D = Samples<1>;
pub type Sample2D = Samples<2>;

impl<const N: usize> Deref for Samples<N> {
    type Target = [f32; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> Distribution<Samples<N>> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Samples<N> {
        let uniform = Uniform::new(0., 1.);
        Samples(std::array::from_fn(|_| uniform.sample(rng)))
    }
}

/// Maps `N` uniform samples to the distribution
pub trait Samplable<T, const N: usize> {
    fn sample_with(&self, samples: Samples<N>) -> T;
}

/// Uniform distribution on the unit sphere, with respect to area
pub struct UniformUnitSphere3;
impl Samplable<Vec3, 2> for UniformUnitSphere3 {
    fn sample_with(&self, samples: Samples<2>) -> Vec3 {
        let z = 1.0 - 2.0 * samples[0];
        let r = f32::sqrt(f32::max(0.0, 1.0 - z * z));
        let (s, c) = f32::sin_cos(std::f32::consts::TAU * samples[1]);
        Vec3::new(r * c, r * s, z)
    }
}

impl UniformUnitSphere3 {
    pub fn pdf(&self) -> f32 {
        1.0 / (4.0 * std::f32::consts::PI)
    }
}

impl Distribution<Vec3> for UniformUnitSphere3 {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        self.sample_with(rng.gen())
    }
}

/// Uniform distribution on the unit disk, using Shirley's concentric mapping which keeps the
/// strata of the samples.
pub struct ConcentricUnitDisk;
impl Samplable<Vec2, 2> for ConcentricUnitDisk {
    fn sample_with(&self, samples: Samples<2>) -> Vec2 {
        let offset = 2.0 * Vec2::new(samples[0], samples[1]) - Vec2::ONE;
        if offset == Vec2::ZERO {
            return Vec2::ZERO;
        }

        let (r, theta) = if offset.x.abs() > offset.y.abs() {
            (offset.x, std::f32::consts::FRAC_PI_4 * (offset.y / offset.x))
        } else {
            (
                offset.y,
                std::f32::consts::FRAC_PI_2 - std::f32::consts::FRAC_PI_4 * (offset.x / offset.y),
            )
        };
        let (s, c) = f32::sin_cos(theta);
        r * Vec2::new(c, s)
    }
}

impl Distribution<Vec2> for ConcentricUnitDisk {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        self.sample_with(rng.gen())
    }
}

/// Uniform distribution on a triangle, as the first two barycentric coordinates
pub struct UniformTriangle;
impl Samplable<[f32; 2], 2> for UniformTriangle {
    fn sample_with(&self, samples: Samples<2>) -> [f32; 2] {
        let su0 = samples[0].sqrt();
        [1.0 - su0, samples[1] * su0]
    }
}

impl Distribution<[f32; 2]> for UniformTriangle {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f32; 2] {
        self.sample_with(rng.gen())
    }
}

/// Uniform distribution over the directions of a cone around +z
pub struct UniformCone {
    pub cos_theta_max: f32,
}

impl Samplable<Vec3, 2> for UniformCone {
    fn sample_with(&self, samples: Samples<2>) -> Vec3 {
        let cos_theta = (1.0 - samples[0]) + samples[0] * self.cos_theta_max;
        let sin_theta = f32::sqrt(f32::max(0.0, 1.0 - cos_theta * cos_theta));
        let (s, c) = f32::sin_cos(std::f32::consts::TAU * samples[1]);
        Vec3::new(c * sin_theta, s * sin_theta, cos_theta)
    }
}

impl UniformCone {
    pub fn pdf(&self) -> f32 {
        uniform_cone_pdf(self.cos_theta_max)
    }
}

impl Distribution<Vec3> for UniformCone {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        self.sample_with(rng.gen())
    }
}

pub fn uniform_cone_pdf(cos_theta_max: f32) -> f32 {
    1.0 / (std::f32::consts::TAU * (1.0 - cos_theta_max))
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn sphere_samples_are_unit_and_balanced() {
        let mut rng = StdRng::seed_from_u64(1);
        let n = 10_000;
        let mut mean = Vec3::ZERO;
        for _ in 0..n {
            let v = UniformUnitSphere3.sample(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-5);
            mean += v;
        }
        mean /= n as f32;
        assert!(mean.length() < 0.05, "{mean}");
        assert_eq!(UniformUnitSphere3.sample_with(Samples([0.0, 0.0])), Vec3::Z);
    }

    #[test]
    fn disk_samples_stay_in_disk() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            assert!(ConcentricUnitDisk.sample(&mut rng).length() <= 1.0 + 1e-6);
        }
        assert_eq!(ConcentricUnitDisk.sample_with(Samples([0.5, 0.5])), Vec2::ZERO);
        let edge = ConcentricUnitDisk.sample_with(Samples([1.0, 0.5]));
        assert!((edge - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn triangle_samples_are_barycentric() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let [b0, b1] = UniformTriangle.sample(&mut rng);
            assert!(b0 >= 0.0 && b1 >= 0.0 && b0 + b1 <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn cone_samples_stay_in_cone() {
        let mut rng = StdRng::seed_from_u64(4);
        let cone = UniformCone { cos_theta_max: 0.8 };
        for _ in 0..1000 {
            let v = cone.sample(&mut rng);
            assert!(v.z >= 0.8 - 1e-6);
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
        // The whole sphere has a solid angle of 4 pi
        assert!((uniform_cone_pdf(-1.0) - UniformUnitSphere3.pdf()).abs() < 1e-7);
        assert_eq!(cone.pdf(), uniform_cone_pdf(0.8));
    }
}

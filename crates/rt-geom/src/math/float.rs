//! Floating point helpers used to bound rounding errors.

/// Half an ulp at 1.0: the bound on the relative error of a single correctly rounded operation.
pub const MACHINE_EPSILON: f32 = f32::EPSILON * 0.5;

/// Conservative bound on the relative error accumulated by `n` floating point operations.
#[inline]
pub fn gamma(n: i32) -> f32 {
    let n = n as f32;
    (n * MACHINE_EPSILON) / (1.0 - n * MACHINE_EPSILON)
}

/// Returns the smallest representable float strictly greater than `v`.
///
/// `+inf` is returned unchanged and both zeros step to the smallest positive subnormal.
#[inline]
pub fn next_float_up(v: f32) -> f32 {
    if v.is_infinite() && v > 0.0 {
        return v;
    }
    // -0.0 and 0.0 must step to the same value
    let v = if v == 0.0 { 0.0 } else { v };

    let bits = v.to_bits();
    let bits = if v >= 0.0 { bits + 1 } else { bits - 1 };
    f32::from_bits(bits)
}

/// Returns the largest representable float strictly less than `v`.
///
/// `-inf` is returned unchanged and both zeros step to the smallest negative subnormal.
#[inline]
pub fn next_float_down(v: f32) -> f32 {
    if v.is_infinite() && v < 0.0 {
        return v;
    }
    let v = if v == 0.0 { -0.0 } else { v };

    let bits = v.to_bits();
    let bits = if v > 0.0 { bits - 1 } else { bits + 1 };
    f32::from_bits(bits)
}

#[inline]
pub fn lerp(t: f32, a: f32, b: f32) -> f32 {
    (1.0 - t) * a + t * b
}

#[inline]
pub fn safe_sqrt(x: f32) -> f32 {
    f32::sqrt(f32::max(0.0, x))
}

#[inline]
pub fn safe_acos(x: f32) -> f32 {
    f32::acos(x.clamp(-1.0, 1.0))
}

pub trait FloatAsExt {
    /// Returns `Some(f)` is f is near zero (near is given by eps) else returns None
    /// The result value is guaranted to be far enough from 0
    ///
    /// Returns None for NaN and Some(f) for +/- infty
    fn into_non_zero(self, eps: Self) -> Option<f32>;

    /// Returns `Some(f)` is f is finite else returns None
    /// The result value is guaranted to be finite
    ///
    /// Returns None for NaN and +/- infty
    fn into_finite(self) -> Option<f32>;
}

impl FloatAsExt for f32 {
    fn into_non_zero(self, eps: Self) -> Option<f32> {
        (self.abs() > eps).then_some(self)
    }

    fn into_finite(self) -> Option<f32> {
        self.is_finite().then_some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_non_zero_test() {
        assert_eq!(0.0f32.into_non_zero(0.1), None);
        assert_eq!(1.0f32.into_non_zero(0.1), Some(1.0));
        assert_eq!((-0.01f32).into_non_zero(0.1), None);
        assert_eq!((-1.0f32).into_non_zero(0.1), Some(-1.0));
        assert_eq!(f32::NAN.into_non_zero(0.1), None);
        assert_eq!(f32::INFINITY.into_non_zero(0.1), Some(f32::INFINITY));
    }
    #[test]
    fn as_finite_test() {
        assert_eq!(0.0f32.into_finite(), Some(0.0));
        assert_eq!(1.0f32.into_finite(), Some(1.0));
        assert_eq!((-0.01f32).into_finite(), Some(-0.01));
        assert_eq!((-1.0f32).into_finite(), Some(-1.0));
        assert_eq!(f32::NAN.into_finite(), None);
        assert_eq!(f32::INFINITY.into_finite(), None);
    }

    #[test]
    fn next_float_steps_one_ulp() {
        assert_eq!(next_float_up(1.0), 1.0 + f32::EPSILON);
        assert_eq!(next_float_down(1.0 + f32::EPSILON), 1.0);
        assert_eq!(next_float_down(-1.0), -1.0 - f32::EPSILON);
        assert_eq!(next_float_up(-1.0 - f32::EPSILON), -1.0);

        for v in [-3.5f32, -1e-20, 0.25, 7e12] {
            assert!(next_float_up(v) > v);
            assert!(next_float_down(v) < v);
            assert_eq!(next_float_down(next_float_up(v)), v);
        }
    }

    #[test]
    fn next_float_special_cases() {
        let tiny = f32::from_bits(1);
        assert_eq!(next_float_up(0.0), tiny);
        assert_eq!(next_float_up(-0.0), tiny);
        assert_eq!(next_float_down(0.0), -tiny);
        assert_eq!(next_float_down(-0.0), -tiny);

        assert_eq!(next_float_up(f32::INFINITY), f32::INFINITY);
        assert_eq!(next_float_down(f32::NEG_INFINITY), f32::NEG_INFINITY);
        assert_eq!(next_float_up(f32::MAX), f32::INFINITY);
        assert_eq!(next_float_down(f32::MIN), f32::NEG_INFINITY);
        assert_eq!(next_float_up(f32::NEG_INFINITY), f32::MIN);
    }

    #[test]
    fn gamma_grows_with_n() {
        assert!(gamma(1) > MACHINE_EPSILON);
        assert!(gamma(3) > gamma(2));
        assert!(gamma(7) < 1e-5);
    }
}

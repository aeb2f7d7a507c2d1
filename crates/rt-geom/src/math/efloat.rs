//! Error bounded floats.
//!
//! An [EFloat] carries the value computed in single precision along with an interval that is
//! guaranted to contain the exact result of the same computation carried out with reals.
//! Interval bounds are rounded outward by one ulp after every operation.

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::float::{next_float_down, next_float_up, MACHINE_EPSILON};

#[derive(Debug, Clone, Copy, derive_more::Display)]
#[display("{} [{}, {}]", v, low, high)]
pub struct EFloat {
    v: f32,
    low: f32,
    high: f32,
    /// Value computed in double precision, used to measure the actual error while debugging
    precise: f64,
}

impl EFloat {
    /// Builds an `EFloat` of value `v` whose exact value lies within `err` of `v`.
    pub fn new(v: f32, err: f32) -> Self {
        debug_assert!(err >= 0.0, "invalid interval: negative error {err}");
        let (low, high) = if err == 0.0 {
            (v, v)
        } else {
            (next_float_down(v - err), next_float_up(v + err))
        };
        let this = Self {
            v,
            low,
            high,
            precise: v as f64,
        };
        this.check();
        this
    }

    fn from_parts(v: f32, low: f32, high: f32, precise: f64) -> Self {
        let this = Self {
            v,
            low,
            high,
            precise,
        };
        this.check();
        this
    }

    pub fn value(self) -> f32 {
        self.v
    }

    pub fn lower_bound(self) -> f32 {
        self.low
    }

    pub fn upper_bound(self) -> f32 {
        self.high
    }

    pub fn precise_value(self) -> f64 {
        self.precise
    }

    pub fn absolute_error(self) -> f32 {
        next_float_up(f32::max((self.high - self.v).abs(), (self.v - self.low).abs()))
    }

    pub fn relative_error(self) -> f64 {
        ((self.precise - self.v as f64) / self.precise).abs()
    }

    /// Checks the interval is well formed. Infinite or NaN bounds are allowed, they come from
    /// dividing by an interval containing zero.
    pub fn check(self) {
        let finite = |x: f32| x.is_finite();
        if finite(self.low) && finite(self.high) {
            debug_assert!(
                self.low <= self.high,
                "invalid interval: {} > {}",
                self.low,
                self.high
            );
        }
    }

    pub fn sqrt(self) -> Self {
        Self::from_parts(
            self.v.sqrt(),
            next_float_down(self.low.sqrt()),
            next_float_up(self.high.sqrt()),
            self.precise.sqrt(),
        )
    }

    pub fn abs(self) -> Self {
        if self.low >= 0.0 {
            // The whole interval is positive
            self
        } else if self.high <= 0.0 {
            -self
        } else {
            // The interval straddles zero
            Self::from_parts(
                self.v.abs(),
                0.0,
                f32::max(-self.low, self.high),
                self.precise.abs(),
            )
        }
    }
}

impl From<f32> for EFloat {
    fn from(v: f32) -> Self {
        Self::new(v, 0.0)
    }
}

impl From<EFloat> for f32 {
    fn from(e: EFloat) -> Self {
        e.v
    }
}

/// Two `EFloat`s compare by value, their intervals are ignored.
impl PartialEq for EFloat {
    fn eq(&self, other: &Self) -> bool {
        self.v == other.v
    }
}

impl Add for EFloat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_parts(
            self.v + rhs.v,
            next_float_down(self.low + rhs.low),
            next_float_up(self.high + rhs.high),
            self.precise + rhs.precise,
        )
    }
}

impl Sub for EFloat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_parts(
            self.v - rhs.v,
            next_float_down(self.low - rhs.high),
            next_float_up(self.high - rhs.low),
            self.precise - rhs.precise,
        )
    }
}

impl Mul for EFloat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        let prod = [
            self.low * rhs.low,
            self.high * rhs.low,
            self.low * rhs.high,
            self.high * rhs.high,
        ];
        let (low, high) = min_max(prod);
        Self::from_parts(
            self.v * rhs.v,
            next_float_down(low),
            next_float_up(high),
            self.precise * rhs.precise,
        )
    }
}

impl Div for EFloat {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        let v = self.v / rhs.v;
        let precise = self.precise / rhs.precise;
        if rhs.low < 0.0 && rhs.high > 0.0 {
            // Dividing by an interval that contains zero: anything goes
            return Self::from_parts(v, f32::NEG_INFINITY, f32::INFINITY, precise);
        }
        let quot = [
            self.low / rhs.low,
            self.high / rhs.low,
            self.low / rhs.high,
            self.high / rhs.high,
        ];
        let (low, high) = min_max(quot);
        Self::from_parts(v, next_float_down(low), next_float_up(high), precise)
    }
}

impl Neg for EFloat {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::from_parts(-self.v, -self.high, -self.low, -self.precise)
    }
}

macro_rules! impl_scalar_ops {
    ($($trait: ident, $fn: ident);*) => {
        $(
            impl $trait<f32> for EFloat {
                type Output = EFloat;

                fn $fn(self, rhs: f32) -> Self::Output {
                    $trait::$fn(self, EFloat::from(rhs))
                }
            }

            impl $trait<EFloat> for f32 {
                type Output = EFloat;

                fn $fn(self, rhs: EFloat) -> Self::Output {
                    $trait::$fn(EFloat::from(self), rhs)
                }
            }
        )*
    };
}

impl_scalar_ops!(Add, add; Sub, sub; Mul, mul; Div, div);

fn min_max(values: [f32; 4]) -> (f32, f32) {
    values
        .into_iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(low, high), x| {
            (f32::min(low, x), f32::max(high, x))
        })
}

/// Solves `a t^2 + b t + c = 0`, returning both roots in ascending order.
///
/// The discriminant is computed in double precision and the square root error is accounted for
/// explicitely. The roots are computed in a way that avoids catastrophic cancellation.
/// Returns `None` when there is no real solution.
pub fn quadratic(a: EFloat, b: EFloat, c: EFloat) -> Option<(EFloat, EFloat)> {
    let (av, bv, cv) = (a.v as f64, b.v as f64, c.v as f64);
    let discrim = bv * bv - 4.0 * av * cv;
    if discrim < 0.0 {
        return None;
    }
    let root_discrim = discrim.sqrt() as f32;
    let float_root_discrim = EFloat::new(root_discrim, MACHINE_EPSILON * root_discrim);

    let q = if b.v < 0.0 {
        -0.5 * (b - float_root_discrim)
    } else {
        -0.5 * (b + float_root_discrim)
    };
    let t0 = q / a;
    let t1 = c / q;
    if t0.v > t1.v {
        Some((t1, t0))
    } else {
        Some((t0, t1))
    }
}

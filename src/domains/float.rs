//! Double-precision floating-point coefficients.
//!
//! Floating-point accumulation is not associative, so products over this
//! ring are only guaranteed to be reproducible for a fixed configuration;
//! see the determinism notes on [`crate::multiply`].

use rand::Rng;

use super::Ring;

/// The ring of `f64` values.
pub type R64 = FloatField;
/// The ring of `f64` values.
pub const R64: FloatField = FloatField::new();

/// The ring of `f64` values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FloatField;

impl Default for FloatField {
    fn default() -> Self {
        Self::new()
    }
}

impl FloatField {
    pub const fn new() -> FloatField {
        FloatField
    }
}

impl Ring for FloatField {
    type Element = f64;

    #[inline(always)]
    fn add(&self, a: &f64, b: &f64) -> f64 {
        a + b
    }

    #[inline(always)]
    fn mul(&self, a: &f64, b: &f64) -> f64 {
        a * b
    }

    #[inline(always)]
    fn add_assign(&self, a: &mut f64, b: &f64) {
        *a += b;
    }

    #[inline(always)]
    fn mul_assign(&self, a: &mut f64, b: &f64) {
        *a *= b;
    }

    #[inline(always)]
    fn add_mul_assign(&self, a: &mut f64, b: &f64, c: &f64) {
        *a = f64::mul_add(*b, *c, *a);
    }

    #[inline(always)]
    fn neg(&self, a: &f64) -> f64 {
        -a
    }

    #[inline(always)]
    fn zero(&self) -> f64 {
        0.
    }

    #[inline(always)]
    fn one(&self) -> f64 {
        1.
    }

    #[inline(always)]
    fn is_zero(a: &f64) -> bool {
        *a == 0.
    }

    #[inline(always)]
    fn is_one(&self, a: &f64) -> bool {
        *a == 1.
    }

    fn sample(&self, rng: &mut impl rand::RngCore, range: (i64, i64)) -> f64 {
        // integral samples keep law tests exact below 2^53
        rng.gen_range(range.0..range.1) as f64
    }
}

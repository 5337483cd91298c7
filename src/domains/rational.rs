//! The field of rational numbers, backed by `rug`.

use std::fmt::{Display, Formatter};

use rand::Rng;
use rug::{Complete, Rational as MultiPrecisionRational};

use super::integer::Integer;
use super::Ring;

/// The rational field.
pub type Q = RationalField;
/// The rational field.
pub const Q: RationalField = RationalField::new();

/// The rational field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RationalField;

impl Default for RationalField {
    fn default() -> Self {
        Self::new()
    }
}

impl RationalField {
    pub const fn new() -> RationalField {
        RationalField
    }
}

/// A rational number in lowest terms.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Rational(MultiPrecisionRational);

impl Rational {
    pub fn new(numerator: i64, denominator: i64) -> Rational {
        assert!(denominator != 0, "denominator must be non-zero");
        Rational(MultiPrecisionRational::from((numerator, denominator)))
    }

    #[inline]
    pub fn zero() -> Rational {
        Rational(MultiPrecisionRational::new())
    }

    #[inline]
    pub fn one() -> Rational {
        Rational(MultiPrecisionRational::from(1))
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        self.0 == 1
    }

    pub fn numerator(&self) -> Integer {
        Integer::from_large(self.0.numer().clone())
    }

    pub fn denominator(&self) -> Integer {
        Integer::from_large(self.0.denom().clone())
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Rational(MultiPrecisionRational::from(value))
    }
}

impl From<(i64, i64)> for Rational {
    fn from((n, d): (i64, i64)) -> Self {
        Rational::new(n, d)
    }
}

impl From<Integer> for Rational {
    fn from(value: Integer) -> Self {
        match value {
            Integer::Natural(n) => Rational(MultiPrecisionRational::from(n)),
            Integer::Large(n) => Rational(MultiPrecisionRational::from(n)),
        }
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Ring for RationalField {
    type Element = Rational;

    #[inline]
    fn add(&self, a: &Rational, b: &Rational) -> Rational {
        Rational((&a.0 + &b.0).complete())
    }

    #[inline]
    fn mul(&self, a: &Rational, b: &Rational) -> Rational {
        Rational((&a.0 * &b.0).complete())
    }

    #[inline]
    fn add_assign(&self, a: &mut Rational, b: &Rational) {
        a.0 += &b.0;
    }

    #[inline]
    fn mul_assign(&self, a: &mut Rational, b: &Rational) {
        a.0 *= &b.0;
    }

    #[inline]
    fn add_mul_assign(&self, a: &mut Rational, b: &Rational, c: &Rational) {
        a.0 += (&b.0 * &c.0).complete();
    }

    #[inline]
    fn neg(&self, a: &Rational) -> Rational {
        Rational((-&a.0).complete())
    }

    #[inline]
    fn zero(&self) -> Rational {
        Rational::zero()
    }

    #[inline]
    fn one(&self) -> Rational {
        Rational::one()
    }

    #[inline]
    fn is_zero(a: &Rational) -> bool {
        a.is_zero()
    }

    #[inline]
    fn is_one(&self, a: &Rational) -> bool {
        a.is_one()
    }

    fn sample(&self, rng: &mut impl rand::RngCore, range: (i64, i64)) -> Rational {
        let numerator = rng.gen_range(range.0..range.1);
        let denominator = rng.gen_range(1..5);
        Rational::new(numerator, denominator)
    }
}

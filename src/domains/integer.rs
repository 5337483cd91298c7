//! The integer ring, with machine-word fast paths and arbitrary-precision
//! fallback.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use rand::Rng;
use rug::{Complete, Integer as MultiPrecisionInteger};

use super::Ring;

/// The integer ring.
pub type Z = IntegerRing;
/// The integer ring.
pub const Z: IntegerRing = IntegerRing::new();

/// The integer ring.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IntegerRing;

impl Default for IntegerRing {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegerRing {
    pub const fn new() -> IntegerRing {
        IntegerRing
    }
}

/// An integer, stored as an `i64` whenever it fits.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Integer {
    Natural(i64),
    Large(MultiPrecisionInteger),
}

impl Integer {
    pub const fn zero() -> Integer {
        Integer::Natural(0)
    }

    pub const fn one() -> Integer {
        Integer::Natural(1)
    }

    /// Wrap a multi-precision integer, downgrading when it fits a word.
    #[inline]
    pub fn from_large(n: MultiPrecisionInteger) -> Integer {
        if let Some(n) = n.to_i64() {
            Integer::Natural(n)
        } else {
            Integer::Large(n)
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        matches!(self, Integer::Natural(0))
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        matches!(self, Integer::Natural(1))
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        match self {
            Integer::Natural(n) => *n < 0,
            Integer::Large(n) => *n < 0,
        }
    }

    fn to_large(&self) -> MultiPrecisionInteger {
        match self {
            Integer::Natural(n) => MultiPrecisionInteger::from(*n),
            Integer::Large(n) => n.clone(),
        }
    }

    /// Downgrade a large representation when the value fits a word again.
    fn simplify(&mut self) {
        if let Integer::Large(n) = self {
            if let Some(s) = n.to_i64() {
                *self = Integer::Natural(s);
            }
        }
    }
}

macro_rules! from_small_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                #[inline]
                fn from(value: $t) -> Self {
                    Integer::Natural(value as i64)
                }
            }
        )*
    };
}

from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Integer {
    #[inline]
    fn from(value: u64) -> Self {
        if value <= i64::MAX as u64 {
            Integer::Natural(value as i64)
        } else {
            Integer::Large(MultiPrecisionInteger::from(value))
        }
    }
}

impl From<MultiPrecisionInteger> for Integer {
    #[inline]
    fn from(value: MultiPrecisionInteger) -> Self {
        Integer::from_large(value)
    }
}

impl PartialEq<i64> for Integer {
    #[inline]
    fn eq(&self, other: &i64) -> bool {
        match self {
            Integer::Natural(n) => n == other,
            Integer::Large(_) => false,
        }
    }
}

impl PartialOrd for Integer {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Integer {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Integer::Natural(a), Integer::Natural(b)) => a.cmp(b),
            (Integer::Natural(a), Integer::Large(b)) => {
                MultiPrecisionInteger::from(*a).cmp(b)
            }
            (Integer::Large(a), Integer::Natural(b)) => {
                a.cmp(&MultiPrecisionInteger::from(*b))
            }
            (Integer::Large(a), Integer::Large(b)) => a.cmp(b),
        }
    }
}

impl std::fmt::Debug for Integer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Integer::Natural(n) => Display::fmt(n, f),
            Integer::Large(n) => Display::fmt(n, f),
        }
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Integer::Natural(n) => Display::fmt(n, f),
            Integer::Large(n) => Display::fmt(n, f),
        }
    }
}

impl Add<&Integer> for &Integer {
    type Output = Integer;

    fn add(self, rhs: &Integer) -> Integer {
        match (self, rhs) {
            (Integer::Natural(a), Integer::Natural(b)) => match a.checked_add(*b) {
                Some(s) => Integer::Natural(s),
                None => Integer::Large(
                    MultiPrecisionInteger::from(*a) + MultiPrecisionInteger::from(*b),
                ),
            },
            (Integer::Natural(a), Integer::Large(b)) | (Integer::Large(b), Integer::Natural(a)) => {
                Integer::from_large((b + *a).complete())
            }
            (Integer::Large(a), Integer::Large(b)) => Integer::from_large((a + b).complete()),
        }
    }
}

impl Sub<&Integer> for &Integer {
    type Output = Integer;

    fn sub(self, rhs: &Integer) -> Integer {
        match (self, rhs) {
            (Integer::Natural(a), Integer::Natural(b)) => match a.checked_sub(*b) {
                Some(s) => Integer::Natural(s),
                None => Integer::Large(
                    MultiPrecisionInteger::from(*a) - MultiPrecisionInteger::from(*b),
                ),
            },
            (Integer::Natural(a), Integer::Large(b)) => {
                Integer::from_large((*a - b).complete())
            }
            (Integer::Large(a), Integer::Natural(b)) => {
                Integer::from_large((a - *b).complete())
            }
            (Integer::Large(a), Integer::Large(b)) => Integer::from_large((a - b).complete()),
        }
    }
}

impl Mul<&Integer> for &Integer {
    type Output = Integer;

    fn mul(self, rhs: &Integer) -> Integer {
        match (self, rhs) {
            (Integer::Natural(a), Integer::Natural(b)) => match a.checked_mul(*b) {
                Some(p) => Integer::Natural(p),
                None => Integer::Large(
                    MultiPrecisionInteger::from(*a) * MultiPrecisionInteger::from(*b),
                ),
            },
            (Integer::Natural(a), Integer::Large(b)) | (Integer::Large(b), Integer::Natural(a)) => {
                Integer::from_large((b * *a).complete())
            }
            (Integer::Large(a), Integer::Large(b)) => Integer::from_large((a * b).complete()),
        }
    }
}

impl Neg for &Integer {
    type Output = Integer;

    fn neg(self) -> Integer {
        match self {
            Integer::Natural(n) => match n.checked_neg() {
                Some(s) => Integer::Natural(s),
                None => Integer::Large(-MultiPrecisionInteger::from(*n)),
            },
            Integer::Large(n) => Integer::from_large((-n).complete()),
        }
    }
}

impl AddAssign<&Integer> for Integer {
    fn add_assign(&mut self, rhs: &Integer) {
        if let (Integer::Natural(a), Integer::Natural(b)) = (&*self, rhs) {
            if let Some(s) = a.checked_add(*b) {
                *self = Integer::Natural(s);
                return;
            }
        }
        *self = &*self + rhs;
    }
}

impl Ring for IntegerRing {
    type Element = Integer;

    #[inline]
    fn add(&self, a: &Integer, b: &Integer) -> Integer {
        a + b
    }

    #[inline]
    fn mul(&self, a: &Integer, b: &Integer) -> Integer {
        a * b
    }

    #[inline]
    fn add_assign(&self, a: &mut Integer, b: &Integer) {
        *a += b;
    }

    #[inline]
    fn mul_assign(&self, a: &mut Integer, b: &Integer) {
        *a = &*a * b;
    }

    #[inline]
    fn add_mul_assign(&self, a: &mut Integer, b: &Integer, c: &Integer) {
        if let Integer::Large(l) = a {
            // accumulate in place to avoid a GMP temporary for b * c
            match (b, c) {
                (Integer::Natural(b1), Integer::Large(c1)) => *l += (*b1 * c1).complete(),
                (Integer::Large(b1), Integer::Natural(c1)) => *l += (b1 * *c1).complete(),
                (Integer::Large(b1), Integer::Large(c1)) => *l += (b1 * c1).complete(),
                (Integer::Natural(b1), Integer::Natural(c1)) => match b1.checked_mul(*c1) {
                    Some(p) => *l += p,
                    None => {
                        *l += MultiPrecisionInteger::from(*b1) * MultiPrecisionInteger::from(*c1)
                    }
                },
            }
            a.simplify();
            return;
        }

        *a += &(b * c);
    }

    #[inline]
    fn neg(&self, a: &Integer) -> Integer {
        -a
    }

    #[inline]
    fn zero(&self) -> Integer {
        Integer::zero()
    }

    #[inline]
    fn one(&self) -> Integer {
        Integer::one()
    }

    #[inline]
    fn is_zero(a: &Integer) -> bool {
        a.is_zero()
    }

    #[inline]
    fn is_one(&self, a: &Integer) -> bool {
        a.is_one()
    }

    fn sample(&self, rng: &mut impl rand::RngCore, range: (i64, i64)) -> Integer {
        Integer::Natural(rng.gen_range(range.0..range.1))
    }
}

//! Exponent vectors and their hashing.
//!
//! A monomial is a slice of exponents, one entry per symbol of the owning
//! [`SymbolSet`](crate::symbols::SymbolSet). The slice representation is the
//! general case; when the exponents are small enough they can be packed into
//! a single `u64` so that monomial multiplication becomes one integer
//! addition. See [`Exponent::pack`] for the caller obligations.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use ahash::RandomState;
use once_cell::sync::Lazy;

/// Number of exponents stored inline in scratch buffers.
pub const INLINED_EXPONENTS: usize = 6;

/// Hasher with process-constant seeds, so that bucket layouts and partition
/// bands are reproducible from run to run.
static MONOMIAL_HASHER: Lazy<RandomState> = Lazy::new(|| {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
});

/// Hash an exponent slice.
#[inline]
pub fn hash_exponents<E: Exponent>(exponents: &[E]) -> u64 {
    MONOMIAL_HASHER.hash_one(exponents)
}

/// Hash a packed exponent word.
#[inline]
pub fn hash_packed(key: u64) -> u64 {
    MONOMIAL_HASHER.hash_one(key)
}

/// Whether the monomial is the multiplicative identity.
#[inline]
pub fn is_identity<E: Exponent>(exponents: &[E]) -> bool {
    exponents.iter().all(|e| e.is_zero())
}

/// An unsigned exponent type.
pub trait Exponent:
    Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static
{
    fn zero() -> Self;
    fn one() -> Self;
    /// Convert to `u32`. Always possible: `u32` is the widest supported type.
    fn to_u32(&self) -> u32;
    /// Convert from `u32`. Panics if the value does not fit.
    fn from_u32(n: u32) -> Self;
    fn is_zero(&self) -> bool;
    fn checked_add(&self, other: &Self) -> Option<Self>;

    /// Pack a list of exponents into a `u64`, one 8-bit lane per entry, so
    /// that packed words of compatible monomials add lane-wise. The caller
    /// must guarantee that the list has at most 8 entries and that no lane
    /// can exceed 255 in any sum the word participates in.
    fn pack(list: &[Self]) -> u64;
    fn unpack(word: u64, out: &mut [Self]);

    /// As [`Exponent::pack`], with 16-bit lanes: at most 4 entries, lane
    /// sums bounded by 65535.
    fn pack_u16(list: &[Self]) -> u64;
    fn unpack_u16(word: u64, out: &mut [Self]);
}

impl Exponent for u32 {
    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn one() -> Self {
        1
    }

    #[inline]
    fn to_u32(&self) -> u32 {
        *self
    }

    #[inline]
    fn from_u32(n: u32) -> Self {
        n
    }

    #[inline]
    fn is_zero(&self) -> bool {
        *self == 0
    }

    #[inline]
    fn checked_add(&self, other: &Self) -> Option<Self> {
        u32::checked_add(*self, *other)
    }

    fn pack(list: &[Self]) -> u64 {
        let mut word = 0u64;
        for (lane, x) in list.iter().enumerate() {
            debug_assert!(*x <= u8::MAX as u32);
            word |= (*x as u64) << (8 * lane);
        }
        word
    }

    fn unpack(word: u64, out: &mut [Self]) {
        for (lane, o) in out.iter_mut().enumerate() {
            *o = (word >> (8 * lane)) as u8 as u32;
        }
    }

    fn pack_u16(list: &[Self]) -> u64 {
        let mut word = 0u64;
        for (lane, x) in list.iter().enumerate() {
            debug_assert!(*x <= u16::MAX as u32);
            word |= (*x as u64) << (16 * lane);
        }
        word
    }

    fn unpack_u16(word: u64, out: &mut [Self]) {
        for (lane, o) in out.iter_mut().enumerate() {
            *o = (word >> (16 * lane)) as u16 as u32;
        }
    }
}

impl Exponent for u16 {
    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn one() -> Self {
        1
    }

    #[inline]
    fn to_u32(&self) -> u32 {
        *self as u32
    }

    #[inline]
    fn from_u32(n: u32) -> Self {
        if n <= u16::MAX as u32 {
            n as u16
        } else {
            panic!("exponent {} too large for u16", n);
        }
    }

    #[inline]
    fn is_zero(&self) -> bool {
        *self == 0
    }

    #[inline]
    fn checked_add(&self, other: &Self) -> Option<Self> {
        u16::checked_add(*self, *other)
    }

    fn pack(list: &[Self]) -> u64 {
        let mut word = 0u64;
        for (lane, x) in list.iter().enumerate() {
            debug_assert!(*x <= u8::MAX as u16);
            word |= (*x as u64) << (8 * lane);
        }
        word
    }

    fn unpack(word: u64, out: &mut [Self]) {
        for (lane, o) in out.iter_mut().enumerate() {
            *o = (word >> (8 * lane)) as u8 as u16;
        }
    }

    fn pack_u16(list: &[Self]) -> u64 {
        let mut word = 0u64;
        for (lane, x) in list.iter().enumerate() {
            word |= (*x as u64) << (16 * lane);
        }
        word
    }

    fn unpack_u16(word: u64, out: &mut [Self]) {
        for (lane, o) in out.iter_mut().enumerate() {
            *o = (word >> (16 * lane)) as u16;
        }
    }
}

/// An exponent limited to 255 for efficiency.
impl Exponent for u8 {
    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn one() -> Self {
        1
    }

    #[inline]
    fn to_u32(&self) -> u32 {
        *self as u32
    }

    #[inline]
    fn from_u32(n: u32) -> Self {
        if n <= u8::MAX as u32 {
            n as u8
        } else {
            panic!("exponent {} too large for u8", n);
        }
    }

    #[inline]
    fn is_zero(&self) -> bool {
        *self == 0
    }

    #[inline]
    fn checked_add(&self, other: &Self) -> Option<Self> {
        u8::checked_add(*self, *other)
    }

    fn pack(list: &[Self]) -> u64 {
        let mut word = 0u64;
        for (lane, x) in list.iter().enumerate() {
            word |= (*x as u64) << (8 * lane);
        }
        word
    }

    fn unpack(word: u64, out: &mut [Self]) {
        for (lane, o) in out.iter_mut().enumerate() {
            *o = (word >> (8 * lane)) as u8;
        }
    }

    fn pack_u16(list: &[Self]) -> u64 {
        let mut word = 0u64;
        for (lane, x) in list.iter().enumerate() {
            word |= (*x as u64) << (16 * lane);
        }
        word
    }

    fn unpack_u16(word: u64, out: &mut [Self]) {
        for (lane, o) in out.iter_mut().enumerate() {
            *o = (word >> (16 * lane)) as u8;
        }
    }
}

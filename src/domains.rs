//! Coefficient rings.
//!
//! The multiplier is generic over a commutative [`Ring`]. Operations take the
//! ring as context so that rings carrying state (such as the nested-series
//! ring, which owns the inner symbol set) fit the same interface as the
//! stateless numeric rings.

pub mod float;
pub mod integer;
pub mod rational;
pub mod series;

use std::fmt::{Debug, Display};

use thiserror::Error;

/// A failure inside a coefficient operation.
///
/// Numeric rings never produce these; the nested-series ring surfaces the
/// inner multiplier's failures this way.
#[derive(Clone, Debug, Error)]
#[error("{0}")]
pub struct CoefficientError(pub String);

/// A commutative ring.
pub trait Ring: Clone + PartialEq + Debug + Send + Sync {
    type Element: Clone + PartialEq + Debug + Display + Send + Sync;

    /// Whether multiplication can fail. Kernels consult this at compile time
    /// to choose between [`Ring::add_mul_assign`] and the fallible path.
    const FALLIBLE: bool = false;

    fn add(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn mul(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn add_assign(&self, a: &mut Self::Element, b: &Self::Element);
    fn mul_assign(&self, a: &mut Self::Element, b: &Self::Element);
    /// `a += b * c`, without materializing the product where possible.
    fn add_mul_assign(&self, a: &mut Self::Element, b: &Self::Element, c: &Self::Element);
    fn neg(&self, a: &Self::Element) -> Self::Element;
    fn zero(&self) -> Self::Element;
    fn one(&self) -> Self::Element;
    fn is_zero(a: &Self::Element) -> bool;
    fn is_one(&self, a: &Self::Element) -> bool;

    /// Fallible multiplication. The default forwards to the infallible
    /// [`Ring::mul`]; rings with `FALLIBLE = true` must override.
    #[inline]
    fn try_mul(
        &self,
        a: &Self::Element,
        b: &Self::Element,
    ) -> Result<Self::Element, CoefficientError> {
        Ok(self.mul(a, b))
    }

    /// Sample an element with magnitude drawn from `range`.
    fn sample(&self, rng: &mut impl rand::RngCore, range: (i64, i64)) -> Self::Element;
}

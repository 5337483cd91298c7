//! Series-valued coefficients.
//!
//! A [`SeriesRing`] makes series usable as the coefficients of an outer
//! series (Poisson-style nesting). Multiplication recurses into the serial
//! multiplier; its failures surface to the outer multiplication as
//! [`CoefficientError`]s, which is why this is the one ring with
//! `FALLIBLE = true`.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::monomial::{is_identity, Exponent};
use crate::multiply::{multiply, Config};
use crate::series::Series;
use crate::symbols::SymbolSet;

use super::{CoefficientError, Ring};

/// The ring of series over `R` in a fixed inner symbol set.
#[derive(Clone, PartialEq, Debug)]
pub struct SeriesRing<R: Ring, E: Exponent> {
    ring: R,
    symbols: Arc<SymbolSet>,
    _exponent: PhantomData<E>,
}

impl<R: Ring, E: Exponent> SeriesRing<R, E> {
    pub fn new(ring: R, symbols: Arc<SymbolSet>) -> Self {
        SeriesRing {
            ring,
            symbols,
            _exponent: PhantomData,
        }
    }

    pub fn symbols(&self) -> &Arc<SymbolSet> {
        &self.symbols
    }

    pub fn coefficient_ring(&self) -> &R {
        &self.ring
    }

    fn serial_config() -> Config {
        Config {
            thread_count: 1,
            min_parallel_work: usize::MAX,
            ..Config::default()
        }
    }
}

impl<R: Ring, E: Exponent> Ring for SeriesRing<R, E> {
    type Element = Series<R, E>;

    const FALLIBLE: bool = true;

    #[inline]
    fn add(&self, a: &Series<R, E>, b: &Series<R, E>) -> Series<R, E> {
        a + b
    }

    /// Infallible multiplication; panics where [`Ring::try_mul`] would
    /// report an error. The multiplier never calls this on a fallible ring.
    fn mul(&self, a: &Series<R, E>, b: &Series<R, E>) -> Series<R, E> {
        self.try_mul(a, b)
            .unwrap_or_else(|e| panic!("nested series multiplication failed: {}", e))
    }

    fn try_mul(
        &self,
        a: &Series<R, E>,
        b: &Series<R, E>,
    ) -> Result<Series<R, E>, CoefficientError> {
        multiply(a, b, &Self::serial_config()).map_err(|e| CoefficientError(e.to_string()))
    }

    #[inline]
    fn add_assign(&self, a: &mut Series<R, E>, b: &Series<R, E>) {
        *a = &*a + b;
    }

    fn mul_assign(&self, a: &mut Series<R, E>, b: &Series<R, E>) {
        *a = self.mul(a, b);
    }

    fn add_mul_assign(&self, a: &mut Series<R, E>, b: &Series<R, E>, c: &Series<R, E>) {
        *a = &*a + &self.mul(b, c);
    }

    #[inline]
    fn neg(&self, a: &Series<R, E>) -> Series<R, E> {
        -a
    }

    #[inline]
    fn zero(&self) -> Series<R, E> {
        Series::new(&self.ring, &self.symbols)
    }

    #[inline]
    fn one(&self) -> Series<R, E> {
        Series::constant(&self.ring, &self.symbols, self.ring.one())
    }

    #[inline]
    fn is_zero(a: &Series<R, E>) -> bool {
        a.is_empty()
    }

    fn is_one(&self, a: &Series<R, E>) -> bool {
        a.len() == 1
            && a.terms()
                .next()
                .map_or(false, |t| {
                    is_identity(t.exponents) && self.ring.is_one(t.coefficient)
                })
    }

    fn sample(&self, rng: &mut impl rand::RngCore, range: (i64, i64)) -> Series<R, E> {
        Series::constant(&self.ring, &self.symbols, self.ring.sample(rng, range))
    }
}

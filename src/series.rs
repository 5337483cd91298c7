//! The series container.
//!
//! A [`Series`] is a mapping from monomials to non-zero coefficients over a
//! fixed [`SymbolSet`], stored in a [`TermTable`]. Iteration order is
//! arbitrary; equality and [`Display`] are content-based.

use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::domains::Ring;
use crate::monomial::{hash_exponents, Exponent, INLINED_EXPONENTS};
use crate::multiply::{multiply, Config, MultiplyError};
use crate::symbols::SymbolSet;
use crate::table::{TermTable, DEFAULT_MAX_LOAD};

/// A view of one term of a series.
#[derive(Debug)]
pub struct TermView<'a, R: Ring, E: Exponent> {
    pub coefficient: &'a R::Element,
    pub exponents: &'a [E],
}

impl<R: Ring, E: Exponent> Clone for TermView<'_, R, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Ring, E: Exponent> Copy for TermView<'_, R, E> {}

/// A sparse multivariate series: monomial → non-zero coefficient.
#[derive(Clone, Debug)]
pub struct Series<R: Ring, E: Exponent = u16> {
    table: TermTable<R, E>,
    symbols: Arc<SymbolSet>,
}

impl<R: Ring, E: Exponent> Series<R, E> {
    /// An empty series over `symbols`.
    pub fn new(ring: &R, symbols: &Arc<SymbolSet>) -> Self {
        Self::with_capacity(ring, symbols, 0)
    }

    /// An empty series pre-sized for `terms` entries.
    pub fn with_capacity(ring: &R, symbols: &Arc<SymbolSet>, terms: usize) -> Self {
        Series {
            table: TermTable::with_capacity(ring.clone(), symbols.len(), terms, DEFAULT_MAX_LOAD),
            symbols: symbols.clone(),
        }
    }

    pub(crate) fn from_table(table: TermTable<R, E>, symbols: Arc<SymbolSet>) -> Self {
        debug_assert_eq!(table.nvars(), symbols.len());
        Series { table, symbols }
    }

    /// The constant series `coefficient`.
    pub fn constant(ring: &R, symbols: &Arc<SymbolSet>, coefficient: R::Element) -> Self {
        let mut s = Series::with_capacity(ring, symbols, 1);
        let identity: SmallVec<[E; INLINED_EXPONENTS]> = SmallVec::from_elem(E::zero(), symbols.len());
        s.insert(coefficient, &identity)
            .expect("identity monomial always has the right arity");
        s
    }

    /// The series `name` (single term, unit coefficient, exponent one).
    ///
    /// Panics when `name` is not in the symbol set.
    pub fn variable(ring: &R, symbols: &Arc<SymbolSet>, name: &str) -> Self {
        let position = match symbols.position_of(name) {
            Some(p) => p,
            None => panic!("symbol '{}' is not in {}", name, symbols),
        };
        let mut exponents: SmallVec<[E; INLINED_EXPONENTS]> =
            SmallVec::from_elem(E::zero(), symbols.len());
        exponents[position] = E::one();
        let mut s = Series::with_capacity(ring, symbols, 1);
        s.insert(ring.one(), &exponents)
            .expect("variable monomial always has the right arity");
        s
    }

    /// The one-term series with identity monomial and unit coefficient.
    pub fn one(&self) -> Self {
        Series::constant(self.ring(), &self.symbols, self.ring().one())
    }

    #[inline]
    pub fn ring(&self) -> &R {
        self.table.ring()
    }

    #[inline]
    pub fn symbols(&self) -> &Arc<SymbolSet> {
        &self.symbols
    }

    /// Number of terms.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Merging insert of one term. A zero coefficient is a no-op; a merge
    /// that cancels to zero evicts the entry.
    pub fn insert(
        &mut self,
        coefficient: R::Element,
        exponents: &[E],
    ) -> Result<(), MultiplyError> {
        if exponents.len() != self.symbols.len() {
            return Err(MultiplyError::IncompatibleSymbols);
        }
        if R::is_zero(&coefficient) {
            return Ok(());
        }
        self.table
            .insert(hash_exponents(exponents), exponents, coefficient);
        Ok(())
    }

    /// The coefficient stored for `exponents`, if any.
    pub fn get(&self, exponents: &[E]) -> Option<&R::Element> {
        if exponents.len() != self.symbols.len() {
            return None;
        }
        self.table.get(hash_exponents(exponents), exponents)
    }

    /// The terms, in arbitrary order.
    pub fn terms(&self) -> impl Iterator<Item = TermView<'_, R, E>> {
        self.table.iter().map(|(exponents, coefficient)| TermView {
            coefficient,
            exponents,
        })
    }

    /// Multiply every coefficient by `factor`, evicting cancelled terms.
    pub fn mul_coeff(&self, factor: &R::Element) -> Self {
        if self.ring().is_one(factor) {
            return self.clone();
        }
        let mut table = TermTable::with_capacity(
            self.ring().clone(),
            self.symbols.len(),
            self.len(),
            DEFAULT_MAX_LOAD,
        );
        for (hash, exponents, coefficient) in self.table.iter_with_hash() {
            let scaled = self.ring().mul(coefficient, factor);
            if !R::is_zero(&scaled) {
                table.insert_unique(hash, exponents, scaled);
            }
        }
        Series::from_table(table, self.symbols.clone())
    }

    /// Re-express this series over `target`, which must contain every
    /// symbol of the current set; new positions get zero exponents.
    pub fn align_to(&self, target: &Arc<SymbolSet>) -> Result<Self, MultiplyError> {
        if &self.symbols == target {
            return Ok(self.clone());
        }
        let mapping: Vec<usize> = self
            .symbols
            .iter()
            .map(|name| {
                target
                    .position_of(name)
                    .ok_or(MultiplyError::IncompatibleSymbols)
            })
            .collect::<Result<_, _>>()?;

        let mut out = Series::with_capacity(self.ring(), target, self.len());
        let mut exponents: SmallVec<[E; INLINED_EXPONENTS]> =
            SmallVec::from_elem(E::zero(), target.len());
        for term in self.terms() {
            exponents.iter_mut().for_each(|e| *e = E::zero());
            for (own, e) in term.exponents.iter().enumerate() {
                exponents[mapping[own]] = *e;
            }
            out.table.insert_unique(
                hash_exponents(&exponents),
                &exponents,
                term.coefficient.clone(),
            );
        }
        Ok(out)
    }

    /// `self` raised to `n` by repeated multiplication.
    pub fn pow(&self, n: usize) -> Self {
        let mut result = self.one();
        for _ in 0..n {
            result = &result * self;
        }
        result
    }
}

impl<R: Ring, E: Exponent> PartialEq for Series<R, E> {
    fn eq(&self, other: &Self) -> bool {
        if self.symbols != other.symbols || self.len() != other.len() {
            return false;
        }
        self.table
            .iter_with_hash()
            .all(|(hash, exponents, coefficient)| {
                other.table.get(hash, exponents) == Some(coefficient)
            })
    }
}

impl<'a, 'b, R: Ring, E: Exponent> Add<&'a Series<R, E>> for &'b Series<R, E> {
    type Output = Series<R, E>;

    fn add(self, rhs: &'a Series<R, E>) -> Series<R, E> {
        assert!(
            self.symbols == rhs.symbols,
            "cannot add series over {} and {}",
            self.symbols,
            rhs.symbols
        );
        let mut out = self.clone();
        for (hash, exponents, coefficient) in rhs.table.iter_with_hash() {
            out.table.insert(hash, exponents, coefficient.clone());
        }
        out
    }
}

impl<'a, 'b, R: Ring, E: Exponent> Sub<&'a Series<R, E>> for &'b Series<R, E> {
    type Output = Series<R, E>;

    fn sub(self, rhs: &'a Series<R, E>) -> Series<R, E> {
        self + &(-rhs)
    }
}

impl<'a, R: Ring, E: Exponent> Neg for &'a Series<R, E> {
    type Output = Series<R, E>;

    fn neg(self) -> Series<R, E> {
        let mut table = TermTable::with_capacity(
            self.ring().clone(),
            self.symbols.len(),
            self.len(),
            DEFAULT_MAX_LOAD,
        );
        for (hash, exponents, coefficient) in self.table.iter_with_hash() {
            table.insert_unique(hash, exponents, self.ring().neg(coefficient));
        }
        Series::from_table(table, self.symbols.clone())
    }
}

impl<'a, 'b, R: Ring, E: Exponent> Mul<&'a Series<R, E>> for &'b Series<R, E> {
    type Output = Series<R, E>;

    /// Multiply with the process-default configuration.
    fn mul(self, rhs: &'a Series<R, E>) -> Series<R, E> {
        multiply(self, rhs, &Config::global())
            .unwrap_or_else(|e| panic!("series multiplication failed: {}", e))
    }
}

impl<R: Ring, E: Exponent> Display for Series<R, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("0");
        }

        let mut terms: Vec<(&[E], &R::Element)> = self.table.iter().collect();
        terms.sort_by(|a, b| b.0.cmp(a.0));

        for (i, (exponents, coefficient)) in terms.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            let constant = exponents.iter().all(|e| e.is_zero());
            if constant || !self.ring().is_one(coefficient) {
                write!(f, "{}", coefficient)?;
                if !constant {
                    f.write_str("*")?;
                }
            }
            let mut first = true;
            for (name, e) in self.symbols.iter().zip(exponents) {
                if e.is_zero() {
                    continue;
                }
                if !first {
                    f.write_str("*")?;
                }
                first = false;
                f.write_str(name)?;
                if *e > E::one() {
                    write!(f, "^{}", e)?;
                }
            }
        }
        Ok(())
    }
}

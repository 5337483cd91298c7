//! Term-pair kernels.
//!
//! A kernel walks an index range of the left operand against all terms of
//! the right operand, forms each product monomial, and deposits it into a
//! worker-private accumulator. The general kernel works on exponent slices;
//! the packed kernel works on `u64`-packed exponent words where a monomial
//! product is a single integer addition. Which one runs never changes the
//! result, only the throughput.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use smallvec::SmallVec;

use crate::domains::Ring;
use crate::monomial::{hash_exponents, hash_packed, Exponent, INLINED_EXPONENTS};
use crate::series::TermView;
use crate::table::{PackedTermTable, TermTable};

use super::{MultiplyError, TermFilter};

/// Lane width of the packed exponent representation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum PackWidth {
    U8,
    U16,
}

/// Decide whether the product of two operands with the given per-variable
/// degrees can run on packed words: 8-bit lanes fit up to 8 variables with
/// degree sums ≤ 255, 16-bit lanes up to 4 variables with sums ≤ 65535.
pub(crate) fn pack_plan(lhs_degrees: &[u32], rhs_degrees: &[u32]) -> Option<PackWidth> {
    debug_assert_eq!(lhs_degrees.len(), rhs_degrees.len());
    let nvars = lhs_degrees.len();
    if nvars > 8 {
        return None;
    }
    let mut fits_u8 = true;
    for (a, b) in lhs_degrees.iter().zip(rhs_degrees) {
        let sum = *a as u64 + *b as u64;
        if sum > 255 {
            fits_u8 = false;
            if nvars > 4 || sum > 65535 {
                return None;
            }
        }
    }
    Some(if fits_u8 { PackWidth::U8 } else { PackWidth::U16 })
}

/// The per-variable maximum degrees of a term list.
pub(crate) fn max_degrees<R: Ring, E: Exponent>(
    terms: &[TermView<'_, R, E>],
    nvars: usize,
) -> Vec<u32> {
    let mut degrees = vec![0u32; nvars];
    for term in terms {
        for (d, e) in degrees.iter_mut().zip(term.exponents) {
            *d = (*d).max(e.to_u32());
        }
    }
    degrees
}

pub(crate) fn pack_terms<R: Ring, E: Exponent>(
    terms: &[TermView<'_, R, E>],
    width: PackWidth,
) -> Vec<u64> {
    terms
        .iter()
        .map(|t| match width {
            PackWidth::U8 => E::pack(t.exponents),
            PackWidth::U16 => E::pack_u16(t.exponents),
        })
        .collect()
}

pub(crate) fn unpack_key<E: Exponent>(key: u64, width: PackWidth, out: &mut [E]) {
    match width {
        PackWidth::U8 => E::unpack(key, out),
        PackWidth::U16 => E::unpack_u16(key, out),
    }
}

/// State shared between the driver and its workers during the hot loop:
/// the stop flag (raised on the first error, and mirrored by the caller's
/// cancellation token) and the single-producer first-error slot.
pub(crate) struct WorkerContext<'a> {
    pub stop: &'a AtomicBool,
    pub user_cancel: Option<&'a AtomicBool>,
    pub error: &'a Mutex<Option<MultiplyError>>,
}

impl WorkerContext<'_> {
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
            || self
                .user_cancel
                .map_or(false, |c| c.load(Ordering::Relaxed))
    }

    /// Record the first error, raise the stop flag so peers exit promptly,
    /// and hand the error back for the worker's own return path.
    pub fn fail(&self, error: MultiplyError) -> MultiplyError {
        {
            let mut slot = self.error.lock().unwrap();
            if slot.is_none() {
                *slot = Some(error.clone());
            }
        }
        self.stop.store(true, Ordering::Relaxed);
        error
    }
}

/// Multiply `lhs[rows] × rhs` on exponent slices. With `band` set, only
/// products whose output bucket falls inside the band are deposited. The
/// cancellation flag is polled once per row.
#[allow(clippy::too_many_arguments)]
pub(crate) fn general_worker<R: Ring, E: Exponent>(
    worker: usize,
    lhs: &[TermView<'_, R, E>],
    rhs: &[TermView<'_, R, E>],
    nvars: usize,
    rows: Range<usize>,
    band: Option<Range<usize>>,
    bucket_mask: u64,
    expected_terms: usize,
    max_load: f64,
    filter: Option<&TermFilter<R, E>>,
    ctx: &WorkerContext<'_>,
    ring: &R,
) -> Result<TermTable<R, E>, MultiplyError> {
    let mut table = TermTable::with_capacity(ring.clone(), nvars, expected_terms, max_load);
    let mut product: SmallVec<[E; INLINED_EXPONENTS]> = SmallVec::from_elem(E::zero(), nvars);

    for i in rows {
        if ctx.should_stop() {
            return Err(MultiplyError::Cancelled);
        }
        let ta = &lhs[i];
        for (j, tb) in rhs.iter().enumerate() {
            for ((p, ea), eb) in product.iter_mut().zip(ta.exponents).zip(tb.exponents) {
                *p = ea
                    .checked_add(eb)
                    .expect("exponent overflow in monomial product");
            }
            let hash = hash_exponents(&product);
            if let Some(band) = &band {
                if !band.contains(&((hash & bucket_mask) as usize)) {
                    continue;
                }
            }

            if let Some(filter) = filter {
                let coefficient = match ring.try_mul(ta.coefficient, tb.coefficient) {
                    Ok(c) => c,
                    Err(e) => {
                        return Err(ctx.fail(MultiplyError::Coefficient {
                            worker,
                            left: i,
                            right: j,
                            source: e,
                        }))
                    }
                };
                if !filter(&coefficient, &product) || R::is_zero(&coefficient) {
                    continue;
                }
                table.insert(hash, &product, coefficient);
            } else if let Err(e) =
                table.merge_product(hash, &product, ta.coefficient, tb.coefficient)
            {
                return Err(ctx.fail(MultiplyError::Coefficient {
                    worker,
                    left: i,
                    right: j,
                    source: e,
                }));
            }
        }
    }

    Ok(table)
}

/// As [`general_worker`], on packed exponent words.
#[allow(clippy::too_many_arguments)]
pub(crate) fn packed_worker<R: Ring>(
    worker: usize,
    lhs_keys: &[u64],
    lhs_coefficients: &[&R::Element],
    rhs_keys: &[u64],
    rhs_coefficients: &[&R::Element],
    rows: Range<usize>,
    band: Option<Range<usize>>,
    bucket_mask: u64,
    expected_terms: usize,
    max_load: f64,
    ctx: &WorkerContext<'_>,
    ring: &R,
) -> Result<PackedTermTable<R>, MultiplyError> {
    let mut table = PackedTermTable::with_capacity(ring.clone(), expected_terms, max_load);

    for i in rows {
        if ctx.should_stop() {
            return Err(MultiplyError::Cancelled);
        }
        let ka = lhs_keys[i];
        let ca = lhs_coefficients[i];
        for (j, (kb, cb)) in rhs_keys.iter().zip(rhs_coefficients.iter().copied()).enumerate() {
            // lanes cannot carry into each other: pack_plan bounded the sums
            let key = ka + kb;
            let hash = hash_packed(key);
            if let Some(band) = &band {
                if !band.contains(&((hash & bucket_mask) as usize)) {
                    continue;
                }
            }
            if let Err(e) = table.merge_product(hash, key, ca, cb) {
                return Err(ctx.fail(MultiplyError::Coefficient {
                    worker,
                    left: i,
                    right: j,
                    source: e,
                }));
            }
        }
    }

    Ok(table)
}

//! Workgroup construction.
//!
//! Two partitioning strategies cover the sparse and dense regimes:
//!
//! * **Hash-band**: the output bucket space `[0, C)` is cut into contiguous
//!   bands, one per worker. Every worker scans the full Cartesian product
//!   but only deposits products whose bucket falls inside its band, so the
//!   per-worker accumulators are disjoint by construction and merge without
//!   equality checks. The redundant classification is cheap when most pairs
//!   produce distinct monomials.
//! * **Row-band**: the left operand's term range is cut into contiguous
//!   chunks, one per worker; products of different workers can collide and
//!   the final merge is a merging fold. Preferred when the output is much
//!   smaller than the pair count, where hash-band's redundant passes would
//!   dominate.
//!
//! The choice is a single density test on the estimator's prediction.

use std::ops::Range;

/// Predicted output terms per input pair below which the product counts as
/// dense and row-band partitioning is used.
const DENSE_OUTPUT_RATIO: f64 = 1.0 / 16.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Strategy {
    Serial,
    HashBand,
    RowBand,
}

pub(crate) fn choose_strategy(
    pairs: usize,
    predicted_terms: usize,
    workers: usize,
    min_parallel_work: usize,
) -> Strategy {
    if workers <= 1 || pairs < min_parallel_work {
        return Strategy::Serial;
    }
    if (predicted_terms as f64) < DENSE_OUTPUT_RATIO * pairs as f64 {
        Strategy::RowBand
    } else {
        Strategy::HashBand
    }
}

/// Split `[0, size)` into at most `parts` contiguous non-empty ranges that
/// cover it exactly.
pub(crate) fn contiguous_bands(size: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, size.max(1));
    (0..parts)
        .map(|k| (size * k / parts)..(size * (k + 1) / parts))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bands_cover_and_are_disjoint() {
        for (size, parts) in [(16, 4), (17, 4), (5, 8), (1, 3), (1024, 3)] {
            let bands = contiguous_bands(size, parts);
            assert!(bands.len() <= parts.max(1));
            let mut next = 0;
            for band in &bands {
                assert_eq!(band.start, next);
                assert!(band.end > band.start);
                next = band.end;
            }
            assert_eq!(next, size);
        }
    }

    #[test]
    fn strategy_selection() {
        assert_eq!(choose_strategy(100, 90, 4, 1 << 14), Strategy::Serial);
        assert_eq!(choose_strategy(1 << 20, 1 << 19, 1, 0), Strategy::Serial);
        // dense: far fewer outputs than pairs
        assert_eq!(choose_strategy(1 << 20, 1 << 10, 4, 0), Strategy::RowBand);
        // sparse: outputs comparable to pairs
        assert_eq!(choose_strategy(1 << 20, 1 << 18, 4, 0), Strategy::HashBand);
    }
}

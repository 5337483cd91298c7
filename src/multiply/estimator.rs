//! Output-cardinality estimation.
//!
//! Before scheduling, the driver predicts how many distinct monomials the
//! product will have, to size the output table and pick a partition
//! strategy. The estimate runs repeated birthday trials: draw random term
//! pairs and count the draws until a product monomial repeats. For a
//! universe of `N` distinct products the first repeat arrives after about
//! `sqrt(pi/2 * N)` draws, so `N ≈ (2/pi) * k²` for mean trial length `k`.
//!
//! The estimate is deterministic (fixed seed) and deliberately biased
//! upwards: overestimation only wastes memory, while underestimation costs
//! a mid-flight resize.

use std::f64::consts::FRAC_2_PI;

use ahash::{HashSet, HashSetExt};
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

const ESTIMATOR_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Margin applied on top of the birthday estimate.
const SAFETY_FACTOR: f64 = 2.0;

/// Predict the number of distinct product monomials of an `len_a × len_b`
/// term product, spending at most `samples` pair draws. `product_hash`
/// maps a pair of term indices to the hash of their product monomial.
pub(crate) fn estimate_output_terms(
    len_a: usize,
    len_b: usize,
    samples: usize,
    mut product_hash: impl FnMut(usize, usize) -> u64,
) -> usize {
    debug_assert!(len_a > 0 && len_b > 0);
    let total = len_a.saturating_mul(len_b);
    if total <= samples.max(1) {
        // cheaper to just take the trivial bound
        return total;
    }

    let mut rng = Xoshiro256StarStar::seed_from_u64(ESTIMATOR_SEED);
    let mut seen = HashSet::new();
    let mut trial_lengths: Vec<usize> = Vec::new();
    let mut budget = samples;

    while budget > 0 {
        seen.clear();
        let mut draws = 0usize;
        let collided = loop {
            if budget == 0 {
                break false;
            }
            budget -= 1;
            draws += 1;
            let i = rng.gen_range(0..len_a);
            let j = rng.gen_range(0..len_b);
            if !seen.insert(product_hash(i, j)) {
                break true;
            }
        };
        if draws > 0 {
            // a truncated final trial still enters as a lower bound
            trial_lengths.push(draws);
        }
        if !collided {
            break;
        }
    }

    let mean = trial_lengths.iter().sum::<usize>() as f64 / trial_lengths.len().max(1) as f64;
    let estimate = FRAC_2_PI * mean * mean * SAFETY_FACTOR;
    (estimate.ceil() as usize).clamp(1, total)
}

//! The sparse series multiplier.
//!
//! [`multiply`] computes the product of two series with an output-size-
//! proportional parallel schedule:
//!
//! 1. check symbol-set compatibility, short-circuit empty operands;
//! 2. predict the output cardinality by random sampling (birthday trials)
//!    and size the output bucket space from it;
//! 3. pick a strategy: serial below the work threshold, otherwise hash-band
//!    partitioning for sparse products or row-band partitioning for dense
//!    ones;
//! 4. run one worker per band, each with a private accumulator; the hot
//!    loop takes no locks;
//! 5. merge the private accumulators into the result.
//!
//! The call is all-or-nothing: inputs are never mutated and no partial
//! result escapes. For exact coefficient rings the result is identical for
//! every thread count; floating-point coefficients inherit the usual
//! non-associativity of `f64` addition across configurations.

mod estimator;
mod kernel;
mod partition;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::domains::{CoefficientError, Ring};
use crate::monomial::{hash_exponents, hash_packed, Exponent, INLINED_EXPONENTS};
use crate::series::{Series, TermView};
use crate::table::{bucket_count_for, PackedTermTable, TermTable, DEFAULT_MAX_LOAD};

use self::estimator::estimate_output_terms;
use self::kernel::{
    general_worker, max_degrees, pack_plan, pack_terms, packed_worker, unpack_key, PackWidth,
    WorkerContext,
};
use self::partition::{choose_strategy, contiguous_bands, Strategy};

/// Predicate deciding whether a product term enters the result. Rejected
/// products are discarded before they touch an accumulator.
pub type TermFilter<R, E> = dyn Fn(&<R as Ring>::Element, &[E]) -> bool + Send + Sync;

/// Multiplier tuning knobs.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum worker threads; 0 selects the available parallelism.
    pub thread_count: usize,
    /// Products with fewer term pairs than this run serially.
    pub min_parallel_work: usize,
    /// Term pairs sampled by the cardinality estimator.
    pub estimator_samples: usize,
    /// Hash-table load threshold.
    pub max_load_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thread_count: 0,
            min_parallel_work: 1 << 14,
            estimator_samples: 512,
            max_load_factor: DEFAULT_MAX_LOAD,
        }
    }
}

static GLOBAL_CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

impl Config {
    /// The process-wide default configuration.
    pub fn global() -> Config {
        GLOBAL_CONFIG.read().unwrap().clone()
    }

    /// Replace the process-wide default configuration.
    pub fn set_global(config: Config) {
        *GLOBAL_CONFIG.write().unwrap() = config;
    }

    fn resolve_threads(&self) -> usize {
        if self.thread_count == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.thread_count
        }
    }
}

/// Failure of a series multiplication.
#[derive(Clone, Debug, Error)]
pub enum MultiplyError {
    #[error("operands are defined over different symbol sets")]
    IncompatibleSymbols,
    #[error("multiplication was cancelled")]
    Cancelled,
    #[error(
        "coefficient operation failed in worker {worker} on term pair ({left}, {right}): {source}"
    )]
    Coefficient {
        worker: usize,
        left: usize,
        right: usize,
        #[source]
        source: CoefficientError,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum DriverState {
    Idle,
    Estimating,
    Scheduling,
    Running,
    Merging,
    Cancelled,
    Done,
    Failed,
}

/// Multiply two series with `config`.
pub fn multiply<R: Ring, E: Exponent>(
    lhs: &Series<R, E>,
    rhs: &Series<R, E>,
    config: &Config,
) -> Result<Series<R, E>, MultiplyError> {
    Multiplier::new(lhs, rhs).with_config(config.clone()).run()
}

/// The multiplication driver. [`multiply`] covers the common case; the
/// builder exists for the per-call hooks (term filter, cancellation token).
pub struct Multiplier<'a, R: Ring, E: Exponent> {
    lhs: &'a Series<R, E>,
    rhs: &'a Series<R, E>,
    config: Config,
    filter: Option<&'a TermFilter<R, E>>,
    cancel: Option<Arc<AtomicBool>>,
    state: DriverState,
}

impl<'a, R: Ring, E: Exponent> Multiplier<'a, R, E> {
    pub fn new(lhs: &'a Series<R, E>, rhs: &'a Series<R, E>) -> Self {
        Multiplier {
            lhs,
            rhs,
            config: Config::global(),
            filter: None,
            cancel: None,
            state: DriverState::Idle,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Install a predicate on product terms; rejected products are dropped.
    pub fn with_filter(mut self, filter: &'a TermFilter<R, E>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Install a cancellation token. Setting it aborts the multiplication
    /// within one row of each worker's outer loop.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "multiplier state");
        self.state = next;
    }

    fn fail(&mut self, error: MultiplyError) -> MultiplyError {
        if matches!(error, MultiplyError::Cancelled) && self.state == DriverState::Running {
            self.transition(DriverState::Cancelled);
        }
        self.transition(DriverState::Failed);
        error
    }

    /// Run the multiplication.
    pub fn run(mut self) -> Result<Series<R, E>, MultiplyError> {
        debug_assert_eq!(self.state, DriverState::Idle);

        if self.lhs.symbols() != self.rhs.symbols() || self.lhs.ring() != self.rhs.ring() {
            return Err(self.fail(MultiplyError::IncompatibleSymbols));
        }
        let ring = self.lhs.ring().clone();
        let symbols = self.lhs.symbols().clone();
        let nvars = symbols.len();

        if self.lhs.is_empty() || self.rhs.is_empty() {
            self.transition(DriverState::Done);
            return Ok(Series::new(&ring, &symbols));
        }

        let cancel = self.cancel.clone();
        let filter = self.filter;
        if cancel
            .as_deref()
            .map_or(false, |c| c.load(Ordering::Relaxed))
        {
            return Err(self.fail(MultiplyError::Cancelled));
        }

        // the larger operand becomes the partitioned row range
        let (a, b) = if self.lhs.len() >= self.rhs.len() {
            (self.lhs, self.rhs)
        } else {
            (self.rhs, self.lhs)
        };
        let a_terms: Vec<TermView<'_, R, E>> = a.terms().collect();
        let b_terms: Vec<TermView<'_, R, E>> = b.terms().collect();
        let pairs = a_terms.len().saturating_mul(b_terms.len());

        self.transition(DriverState::Estimating);

        let plan = if filter.is_none() {
            pack_plan(&max_degrees(&a_terms, nvars), &max_degrees(&b_terms, nvars))
        } else {
            // the filter hook sees unpacked exponents
            None
        };
        let (a_keys, b_keys) = match plan {
            Some(width) => (pack_terms(&a_terms, width), pack_terms(&b_terms, width)),
            None => (Vec::new(), Vec::new()),
        };

        let samples = self.config.estimator_samples;
        let predicted = match plan {
            Some(_) => estimate_output_terms(a_terms.len(), b_terms.len(), samples, |i, j| {
                hash_packed(a_keys[i] + b_keys[j])
            }),
            None => {
                let mut scratch: SmallVec<[E; INLINED_EXPONENTS]> =
                    SmallVec::from_elem(E::zero(), nvars);
                estimate_output_terms(a_terms.len(), b_terms.len(), samples, |i, j| {
                    for ((p, ea), eb) in scratch
                        .iter_mut()
                        .zip(a_terms[i].exponents)
                        .zip(b_terms[j].exponents)
                    {
                        *p = ea
                            .checked_add(eb)
                            .expect("exponent overflow in monomial product");
                    }
                    hash_exponents(&scratch)
                })
            }
        };

        let max_load = self.config.max_load_factor;
        let capacity = bucket_count_for(predicted, max_load);
        let bucket_mask = (capacity - 1) as u64;

        self.transition(DriverState::Scheduling);
        let threads = self.config.resolve_threads();
        let strategy = choose_strategy(pairs, predicted, threads, self.config.min_parallel_work);
        debug!(
            rows = a_terms.len(),
            columns = b_terms.len(),
            predicted,
            capacity,
            threads,
            ?strategy,
            packed = plan.is_some(),
            "scheduling series product"
        );

        let stop = AtomicBool::new(false);
        let first_error = Mutex::new(None);
        let ctx = WorkerContext {
            stop: &stop,
            user_cancel: cancel.as_deref(),
            error: &first_error,
        };

        self.transition(DriverState::Running);

        let output = if strategy == Strategy::Serial {
            match plan {
                Some(width) => {
                    let table = match packed_worker(
                        0,
                        &a_keys,
                        &collect_coefficients(&a_terms),
                        &b_keys,
                        &collect_coefficients(&b_terms),
                        0..a_terms.len(),
                        None,
                        bucket_mask,
                        predicted,
                        max_load,
                        &ctx,
                        &ring,
                    ) {
                        Ok(t) => t,
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.transition(DriverState::Merging);
                    unpack_tables(&ring, nvars, width, vec![table], predicted, max_load)
                }
                None => {
                    let table = match general_worker(
                        0,
                        &a_terms,
                        &b_terms,
                        nvars,
                        0..a_terms.len(),
                        None,
                        bucket_mask,
                        predicted,
                        max_load,
                        filter,
                        &ctx,
                        &ring,
                    ) {
                        Ok(t) => t,
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.transition(DriverState::Merging);
                    table
                }
            }
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .expect("failed to build worker thread pool");

            let workgroups: Vec<(std::ops::Range<usize>, Option<std::ops::Range<usize>>)> =
                match strategy {
                    Strategy::HashBand => contiguous_bands(capacity, threads)
                        .into_iter()
                        .map(|band| (0..a_terms.len(), Some(band)))
                        .collect(),
                    Strategy::RowBand => contiguous_bands(a_terms.len(), threads)
                        .into_iter()
                        .map(|rows| (rows, None))
                        .collect(),
                    Strategy::Serial => unreachable!(),
                };
            let expected = predicted / workgroups.len() + 1;

            match plan {
                Some(width) => {
                    let a_coefficients = collect_coefficients(&a_terms);
                    let b_coefficients = collect_coefficients(&b_terms);
                    let results: Vec<Result<PackedTermTable<R>, MultiplyError>> =
                        pool.install(|| {
                            workgroups
                                .into_par_iter()
                                .enumerate()
                                .map(|(worker, (rows, band))| {
                                    packed_worker(
                                        worker,
                                        &a_keys,
                                        &a_coefficients,
                                        &b_keys,
                                        &b_coefficients,
                                        rows,
                                        band,
                                        bucket_mask,
                                        expected,
                                        max_load,
                                        &ctx,
                                        &ring,
                                    )
                                })
                                .collect()
                        });

                    let tables = match self.collect_worker_tables(results, &first_error, &cancel) {
                        Ok(t) => t,
                        Err(e) => return Err(e),
                    };
                    self.transition(DriverState::Merging);
                    if strategy == Strategy::HashBand {
                        // bands are disjoint: a plain concatenation
                        unpack_tables(&ring, nvars, width, tables, predicted, max_load)
                    } else {
                        let mut iter = tables.into_iter();
                        let mut merged = iter.next().expect("at least one workgroup");
                        for table in iter {
                            merged.merge(table);
                        }
                        unpack_tables(&ring, nvars, width, vec![merged], predicted, max_load)
                    }
                }
                None => {
                    let results: Vec<Result<TermTable<R, E>, MultiplyError>> = pool.install(|| {
                        workgroups
                            .into_par_iter()
                            .enumerate()
                            .map(|(worker, (rows, band))| {
                                general_worker(
                                    worker,
                                    &a_terms,
                                    &b_terms,
                                    nvars,
                                    rows,
                                    band,
                                    bucket_mask,
                                    expected,
                                    max_load,
                                    filter,
                                    &ctx,
                                    &ring,
                                )
                            })
                            .collect()
                    });

                    let tables = match self.collect_worker_tables(results, &first_error, &cancel) {
                        Ok(t) => t,
                        Err(e) => return Err(e),
                    };
                    self.transition(DriverState::Merging);
                    let mut out =
                        TermTable::with_capacity(ring.clone(), nvars, predicted, max_load);
                    for table in tables {
                        if strategy == Strategy::HashBand {
                            out.concat(table);
                        } else {
                            out.merge(table);
                        }
                    }
                    out
                }
            }
        };

        self.transition(DriverState::Done);
        Ok(Series::from_table(output, symbols))
    }

    /// Sort worker results: surface the first recorded error, then user
    /// cancellation, and only then unwrap the private accumulators.
    fn collect_worker_tables<T>(
        &mut self,
        results: Vec<Result<T, MultiplyError>>,
        first_error: &Mutex<Option<MultiplyError>>,
        cancel: &Option<Arc<AtomicBool>>,
    ) -> Result<Vec<T>, MultiplyError> {
        if let Some(error) = first_error.lock().unwrap().take() {
            return Err(self.fail(error));
        }
        if cancel
            .as_deref()
            .map_or(false, |c| c.load(Ordering::Relaxed))
        {
            return Err(self.fail(MultiplyError::Cancelled));
        }
        match results.into_iter().collect() {
            Ok(tables) => Ok(tables),
            Err(error) => Err(self.fail(error)),
        }
    }
}

fn collect_coefficients<'t, R: Ring, E: Exponent>(
    terms: &[TermView<'t, R, E>],
) -> Vec<&'t R::Element> {
    terms.iter().map(|t| t.coefficient).collect()
}

/// Move packed accumulators into slice-keyed storage. The caller guarantees
/// the keys are globally unique across `tables` (disjoint bands, or a
/// single pre-merged table).
fn unpack_tables<R: Ring, E: Exponent>(
    ring: &R,
    nvars: usize,
    width: PackWidth,
    tables: Vec<PackedTermTable<R>>,
    expected: usize,
    max_load: f64,
) -> TermTable<R, E> {
    let mut out = TermTable::with_capacity(ring.clone(), nvars, expected, max_load);
    let mut exponents: SmallVec<[E; INLINED_EXPONENTS]> = SmallVec::from_elem(E::zero(), nvars);
    for table in tables {
        for (_, key, coefficient) in table.drain() {
            unpack_key(key, width, &mut exponents);
            out.insert_unique(hash_exponents(&exponents), &exponents, coefficient);
        }
    }
    out
}

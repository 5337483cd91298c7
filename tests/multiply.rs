//! End-to-end tests of the series multiplier: the algebraic laws, the
//! dense/sparse benchmark cardinalities, thread-count determinism,
//! cancellation, filtering, and symbol alignment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use piranha::domains::float::R64;
use piranha::domains::integer::{Integer, Z};
use piranha::domains::rational::{Rational, Q};
use piranha::domains::series::SeriesRing;
use piranha::domains::Ring;
use piranha::{multiply, Config, Multiplier, MultiplyError, Series, SymbolSet};

fn serial() -> Config {
    Config {
        thread_count: 1,
        min_parallel_work: usize::MAX,
        ..Config::default()
    }
}

fn threads(n: usize) -> Config {
    Config {
        thread_count: n,
        min_parallel_work: 0,
        ..Config::default()
    }
}

fn poly<const N: usize>(
    symbols: &Arc<SymbolSet>,
    terms: &[(i64, [u8; N])],
) -> Series<Z, u8> {
    let mut f = Series::new(&Z, symbols);
    for (c, e) in terms {
        f.insert(Integer::from(*c), e).unwrap();
    }
    f
}

fn poly_f64<const N: usize>(
    symbols: &Arc<SymbolSet>,
    terms: &[(i64, [u8; N])],
) -> Series<R64, u8> {
    let mut f = Series::new(&R64, symbols);
    for (c, e) in terms {
        f.insert(*c as f64, e).unwrap();
    }
    f
}

#[test]
fn single_variable_square() {
    let s = SymbolSet::new(["x"]);
    let f = poly(&s, &[(1, [0]), (1, [1])]); // 1 + x
    let p = multiply(&f, &f, &Config::default()).unwrap();
    assert_eq!(p.len(), 3);
    assert_eq!(p.get(&[0]), Some(&Integer::from(1)));
    assert_eq!(p.get(&[1]), Some(&Integer::from(2)));
    assert_eq!(p.get(&[2]), Some(&Integer::from(1)));
}

#[test]
fn cancelling_cross_terms_are_evicted() {
    let s = SymbolSet::new(["x", "y"]);
    let f = poly(&s, &[(1, [1, 0]), (-1, [0, 1])]); // x - y
    let g = poly(&s, &[(1, [1, 0]), (1, [0, 1])]); // x + y
    let p = multiply(&f, &g, &Config::default()).unwrap();
    assert_eq!(p.len(), 2);
    assert_eq!(p.get(&[2, 0]), Some(&Integer::from(1)));
    assert_eq!(p.get(&[0, 2]), Some(&Integer::from(-1)));
    assert_eq!(p.get(&[1, 1]), None);
}

fn dense_operands() -> (Series<Z, u8>, Series<Z, u8>, Series<Z, u8>) {
    let s = SymbolSet::new(["x", "y", "z", "t"]);
    let base = poly(
        &s,
        &[
            (1, [0, 0, 0, 0]),
            (1, [1, 0, 0, 0]),
            (1, [0, 1, 0, 0]),
            (1, [0, 0, 1, 0]),
            (1, [0, 0, 0, 1]),
        ],
    );
    let f = base.pow(10);
    let g = &f + &f.one();
    let h = poly(
        &s,
        &[
            (1, [0, 0, 0, 0]),
            (-1, [1, 0, 0, 0]),
            (1, [0, 1, 0, 0]),
            (1, [0, 0, 1, 0]),
            (1, [0, 0, 0, 1]),
        ],
    )
    .pow(10);
    (f, g, h)
}

#[test]
fn dense_product_size_is_thread_count_invariant() {
    let (f, g, _) = dense_operands();
    assert_eq!(f.len(), 1001);

    let reference = multiply(&f, &g, &Config::default()).unwrap();
    assert_eq!(reference.len(), 10626);

    for n in 1..=4 {
        let p = multiply(&f, &g, &threads(n)).unwrap();
        assert_eq!(p.len(), 10626);
        assert_eq!(p, reference);
    }
}

#[test]
fn dense_product_with_cancellations() {
    let (f, _, h) = dense_operands();
    let reference = multiply(&f, &h, &Config::default()).unwrap();
    assert_eq!(reference.len(), 5786);

    for n in 1..=4 {
        let p = multiply(&f, &h, &threads(n)).unwrap();
        assert_eq!(p.len(), 5786);
        assert_eq!(p, reference);
    }
}

fn sparse_operands() -> (Series<Z, u8>, Series<Z, u8>, Series<Z, u8>) {
    let s = SymbolSet::new(["x", "y", "z", "t", "u"]);
    let f = poly(
        &s,
        &[
            (1, [0, 0, 0, 0, 0]),
            (1, [1, 0, 0, 0, 0]),
            (1, [0, 1, 0, 0, 0]),
            (2, [0, 0, 2, 0, 0]),
            (3, [0, 0, 0, 3, 0]),
            (5, [0, 0, 0, 0, 5]),
        ],
    )
    .pow(8);
    let g = poly(
        &s,
        &[
            (1, [0, 0, 0, 0, 0]),
            (1, [0, 0, 0, 0, 1]),
            (1, [0, 0, 0, 1, 0]),
            (2, [0, 0, 2, 0, 0]),
            (3, [0, 3, 0, 0, 0]),
            (5, [5, 0, 0, 0, 0]),
        ],
    )
    .pow(8);
    let h = poly(
        &s,
        &[
            (1, [0, 0, 0, 0, 0]),
            (-1, [0, 0, 0, 0, 1]),
            (1, [0, 0, 0, 1, 0]),
            (2, [0, 0, 2, 0, 0]),
            (3, [0, 3, 0, 0, 0]),
            (5, [5, 0, 0, 0, 0]),
        ],
    )
    .pow(8);
    (f, g, h)
}

#[test]
fn sparse_product_size_is_thread_count_invariant() {
    let (f, g, _) = sparse_operands();
    assert_eq!(f.len(), 1287);

    let reference = multiply(&f, &g, &Config::default()).unwrap();
    assert_eq!(reference.len(), 591235);

    for n in [1, 2, 4] {
        let p = multiply(&f, &g, &threads(n)).unwrap();
        assert_eq!(p.len(), 591235);
        assert_eq!(p, reference);
    }
}

#[test]
fn sparse_product_with_cancellations() {
    let (f, _, h) = sparse_operands();
    let reference = multiply(&f, &h, &Config::default()).unwrap();
    assert_eq!(reference.len(), 591184);

    for n in [1, 4] {
        let p = multiply(&f, &h, &threads(n)).unwrap();
        assert_eq!(p.len(), 591184);
        assert_eq!(p, reference);
    }
}

// f64 is IEEE-754 in Rust, so the dense cardinalities hold exactly: every
// intermediate integer stays far below 2^53 and cancellations are exact.
#[test]
fn dense_sizes_hold_for_double_coefficients() {
    let s = SymbolSet::new(["x", "y", "z", "t"]);
    let base = poly_f64(
        &s,
        &[
            (1, [0, 0, 0, 0]),
            (1, [1, 0, 0, 0]),
            (1, [0, 1, 0, 0]),
            (1, [0, 0, 1, 0]),
            (1, [0, 0, 0, 1]),
        ],
    );
    let f = base.pow(10);
    let g = &f + &f.one();
    let h = poly_f64(
        &s,
        &[
            (1, [0, 0, 0, 0]),
            (-1, [1, 0, 0, 0]),
            (1, [0, 1, 0, 0]),
            (1, [0, 0, 1, 0]),
            (1, [0, 0, 0, 1]),
        ],
    )
    .pow(10);

    for n in 1..=4 {
        assert_eq!(multiply(&f, &g, &threads(n)).unwrap().len(), 10626);
        assert_eq!(multiply(&f, &h, &threads(n)).unwrap().len(), 5786);
    }
}

#[test]
fn incompatible_symbol_sets_are_rejected() {
    let f = poly(&SymbolSet::new(["x"]), &[(1, [1])]);
    let g = poly(&SymbolSet::new(["y"]), &[(1, [1])]);
    assert!(matches!(
        multiply(&f, &g, &Config::default()),
        Err(MultiplyError::IncompatibleSymbols)
    ));
}

#[test]
fn alignment_makes_operands_compatible() {
    let f = poly(&SymbolSet::new(["x"]), &[(1, [1]), (2, [0])]);
    let g = poly(&SymbolSet::new(["y"]), &[(1, [1])]);

    let merged = f.symbols().union(g.symbols());
    let fa = f.align_to(&merged).unwrap();
    let ga = g.align_to(&merged).unwrap();

    let p = multiply(&fa, &ga, &Config::default()).unwrap();
    assert_eq!(p.get(&[1, 1]), Some(&Integer::from(1)));
    assert_eq!(p.get(&[0, 1]), Some(&Integer::from(2)));
}

fn random_series<R: Ring>(
    rng: &mut Xoshiro256StarStar,
    ring: &R,
    symbols: &Arc<SymbolSet>,
    terms: usize,
    max_exp: u16,
) -> Series<R, u16> {
    let mut f = Series::new(ring, symbols);
    for _ in 0..terms {
        let exponents: Vec<u16> = (0..symbols.len())
            .map(|_| rng.gen_range(0..max_exp))
            .collect();
        let c = ring.sample(rng, (-10, 10));
        f.insert(c, &exponents).unwrap();
    }
    f
}

#[test]
fn ring_laws_hold_on_random_integer_series() {
    let mut rng = Xoshiro256StarStar::seed_from_u64(7);
    // nine variables forces the general (unpacked) kernels
    let symbols = SymbolSet::new(["a", "b", "c", "d", "e", "f", "g", "h", "i"]);
    for _ in 0..5 {
        let f = random_series(&mut rng, &Z, &symbols, 25, 3);
        let g = random_series(&mut rng, &Z, &symbols, 25, 3);
        let h = random_series(&mut rng, &Z, &symbols, 10, 3);
        let cfg = threads(3);

        // commutativity
        let fg = multiply(&f, &g, &cfg).unwrap();
        assert_eq!(fg, multiply(&g, &f, &cfg).unwrap());

        // associativity
        let fg_h = multiply(&fg, &h, &cfg).unwrap();
        let f_gh = multiply(&f, &multiply(&g, &h, &cfg).unwrap(), &cfg).unwrap();
        assert_eq!(fg_h, f_gh);

        // distributivity
        let f_gph = multiply(&f, &(&g + &h), &cfg).unwrap();
        assert_eq!(f_gph, &fg + &multiply(&f, &h, &cfg).unwrap());

        // cardinality bound and the non-zero invariant
        assert!(fg.len() <= f.len() * g.len());
        assert!(fg.terms().all(|t| !Integer::is_zero(t.coefficient)));
    }
}

#[test]
fn exact_rings_are_deterministic_across_configurations() {
    let mut rng = Xoshiro256StarStar::seed_from_u64(11);
    let symbols = SymbolSet::new(["x", "y", "z", "t"]);
    let f = random_series(&mut rng, &Z, &symbols, 60, 6);
    let g = random_series(&mut rng, &Z, &symbols, 60, 6);

    let reference = multiply(&f, &g, &serial()).unwrap();
    for n in 1..=4 {
        assert_eq!(multiply(&f, &g, &threads(n)).unwrap(), reference);
    }
}

#[test]
fn rational_coefficients_cancel_exactly() {
    let symbols = SymbolSet::new(["x"]);
    let mut f = Series::<Q, u8>::new(&Q, &symbols);
    f.insert(Rational::new(1, 2), &[1]).unwrap();
    f.insert(Rational::new(1, 3), &[0]).unwrap();
    let mut g = Series::<Q, u8>::new(&Q, &symbols);
    g.insert(Rational::new(2, 1), &[1]).unwrap();
    g.insert(Rational::new(-3, 1), &[0]).unwrap();

    // (x/2 + 1/3)(2x - 3) = x^2 - 3x/2 + 2x/3 - 1 = x^2 - 5x/6 - 1
    let p = multiply(&f, &g, &Config::default()).unwrap();
    assert_eq!(p.len(), 3);
    assert_eq!(p.get(&[2]), Some(&Rational::new(1, 1)));
    assert_eq!(p.get(&[1]), Some(&Rational::new(-5, 6)));
    assert_eq!(p.get(&[0]), Some(&Rational::new(-1, 1)));

    let mut minus = Series::<Q, u8>::new(&Q, &symbols);
    minus.insert(Rational::new(-1, 2), &[1]).unwrap();
    let sum = &f + &minus; // the x terms cancel
    assert_eq!(sum.len(), 1);
}

#[test]
fn multiplying_by_zero_and_one() {
    let (f, _, _) = dense_operands();
    let zero = Series::new(&Z, f.symbols());
    let p = multiply(&f, &zero, &Config::default()).unwrap();
    assert!(p.is_empty());

    let p = multiply(&f, &f.one(), &Config::default()).unwrap();
    assert_eq!(p, f);
}

#[test]
fn constants_multiply_over_the_empty_symbol_set() {
    let s = SymbolSet::empty();
    let a = Series::<Z, u8>::constant(&Z, &s, Integer::from(6));
    let b = Series::<Z, u8>::constant(&Z, &s, Integer::from(7));
    let p = multiply(&a, &b, &Config::default()).unwrap();
    assert_eq!(p.len(), 1);
    assert_eq!(p.get(&[]), Some(&Integer::from(42)));
}

#[test]
fn preset_cancellation_token_aborts_immediately() {
    let (f, g, _) = dense_operands();
    let token = Arc::new(AtomicBool::new(true));
    let result = Multiplier::new(&f, &g)
        .with_config(threads(2))
        .with_cancellation(token)
        .run();
    assert!(matches!(result, Err(MultiplyError::Cancelled)));
}

#[test]
fn mid_flight_cancellation_is_observed() {
    let symbols = SymbolSet::new(["x", "y", "z", "t"]);
    let mut rng = Xoshiro256StarStar::seed_from_u64(23);
    let f = random_series(&mut rng, &Z, &symbols, 80, 5);
    let g = random_series(&mut rng, &Z, &symbols, 80, 5);

    let token = Arc::new(AtomicBool::new(false));
    let tripwire = token.clone();
    // raise the token from inside the hot loop via the filter hook
    let filter = move |_: &Integer, _: &[u16]| {
        tripwire.store(true, Ordering::Relaxed);
        true
    };
    let result = Multiplier::new(&f, &g)
        .with_config(threads(2))
        .with_filter(&filter)
        .with_cancellation(token)
        .run();
    assert!(matches!(result, Err(MultiplyError::Cancelled)));
}

#[test]
fn filter_discards_products_before_accumulation() {
    let s = SymbolSet::new(["x", "y"]);
    let f = poly(&s, &[(1, [0, 0]), (1, [1, 0]), (1, [0, 1])]);

    let max_degree = |_: &Integer, exponents: &[u8]| {
        exponents.iter().map(|e| *e as u32).sum::<u32>() <= 1
    };
    let truncated = Multiplier::new(&f, &f)
        .with_filter(&max_degree)
        .run()
        .unwrap();

    // (1 + x + y)^2 truncated at degree 1: 1 + 2x + 2y
    assert_eq!(truncated.len(), 3);
    assert_eq!(truncated.get(&[0, 0]), Some(&Integer::from(1)));
    assert_eq!(truncated.get(&[1, 0]), Some(&Integer::from(2)));
    assert_eq!(truncated.get(&[0, 1]), Some(&Integer::from(2)));
    assert_eq!(truncated.get(&[1, 1]), None);
}

#[test]
fn filter_composes_with_row_band_partitioning() {
    // a dense product with a filter installed runs on the general kernel;
    // an accept-all filter must not change the result
    let (f, g, _) = dense_operands();
    let accept = |_: &Integer, _: &[u8]| true;
    let filtered = Multiplier::new(&f, &g)
        .with_config(threads(2))
        .with_filter(&accept)
        .run()
        .unwrap();
    assert_eq!(filtered, multiply(&f, &g, &serial()).unwrap());
}

#[test]
fn nested_series_coefficients_multiply_recursively() {
    let inner_symbols = SymbolSet::new(["u"]);
    let ring = SeriesRing::<Z, u8>::new(Z, inner_symbols.clone());
    let outer_symbols = SymbolSet::new(["x"]);

    let u = Series::<Z, u8>::variable(&Z, &inner_symbols, "u");
    let mut f: Series<SeriesRing<Z, u8>, u8> = Series::new(&ring, &outer_symbols);
    f.insert(u.clone(), &[1]).unwrap(); // u*x
    f.insert(ring.one(), &[0]).unwrap(); // + 1

    // (u*x + 1)^2 = u^2*x^2 + 2u*x + 1
    let p = multiply(&f, &f, &Config::default()).unwrap();
    assert_eq!(p.len(), 3);
    let x2 = p.get(&[2]).unwrap();
    assert_eq!(x2.get(&[2]), Some(&Integer::from(1)));
    let x1 = p.get(&[1]).unwrap();
    assert_eq!(x1.get(&[1]), Some(&Integer::from(2)));
}

#[test]
fn nested_symbol_mismatch_surfaces_as_coefficient_error() {
    let ring = SeriesRing::<Z, u8>::new(Z, SymbolSet::new(["u"]));
    let outer_symbols = SymbolSet::new(["x"]);

    let u = Series::<Z, u8>::variable(&Z, &SymbolSet::new(["u"]), "u");
    let v = Series::<Z, u8>::variable(&Z, &SymbolSet::new(["v"]), "v");

    let mut f: Series<SeriesRing<Z, u8>, u8> = Series::new(&ring, &outer_symbols);
    f.insert(u, &[1]).unwrap();
    let mut g: Series<SeriesRing<Z, u8>, u8> = Series::new(&ring, &outer_symbols);
    g.insert(v, &[1]).unwrap();

    let result = multiply(&f, &g, &serial());
    assert!(matches!(
        result,
        Err(MultiplyError::Coefficient { worker: 0, .. })
    ));
}

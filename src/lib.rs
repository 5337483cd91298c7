//! Piranha is a library for manipulating sparse multivariate series over
//! exact and floating-point coefficient rings.
//!
//! The centerpiece is the parallel sparse series multiplier: a hash-based
//! term accumulator with in-place merging and zero eviction, an
//! output-cardinality estimator, and a lock-free partitioning scheme over
//! either the output bucket space or the input term range.
//!
//! # Example
//!
//! ```rust
//! use piranha::domains::integer::Z;
//! use piranha::{multiply, Config, Series, SymbolSet};
//!
//! let symbols = SymbolSet::new(["x", "y"]);
//! let x = Series::<Z, u8>::variable(&Z, &symbols, "x");
//! let y = Series::<Z, u8>::variable(&Z, &symbols, "y");
//!
//! // (x + y) * (x - y) = x^2 - y^2: the x*y terms cancel and are evicted
//! let product = multiply(&(&x + &y), &(&x - &y), &Config::default()).unwrap();
//! assert_eq!(product.len(), 2);
//! ```

pub mod domains;
pub mod monomial;
pub mod multiply;
pub mod series;
pub mod symbols;
pub mod table;

pub use multiply::{multiply, Config, Multiplier, MultiplyError, TermFilter};
pub use series::{Series, TermView};
pub use symbols::SymbolSet;

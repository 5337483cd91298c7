//! Symbol bookkeeping.
//!
//! A [`SymbolSet`] is an ordered set of distinct symbol names. Monomials
//! carry no names themselves: the position of an exponent is given meaning
//! by the symbol set of the enclosing series. Two series multiply only when
//! their symbol sets are equal (same names, same order); callers bring them
//! into agreement with [`SymbolSet::union`] and
//! [`Series::align_to`](crate::series::Series::align_to).

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use smartstring::{LazyCompact, SmartString};

/// An ordered set of symbol names with stable insertion-order positions.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct SymbolSet {
    names: Vec<SmartString<LazyCompact>>,
}

impl SymbolSet {
    /// The empty symbol set (series over it are constants).
    pub fn empty() -> Arc<SymbolSet> {
        Arc::new(SymbolSet::default())
    }

    /// Build a symbol set from a list of names.
    ///
    /// Panics when a name occurs twice.
    pub fn new<I, S>(names: I) -> Arc<SymbolSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = SymbolSet::default();
        for name in names {
            let name = name.as_ref();
            assert!(
                set.position_of(name).is_none(),
                "duplicate symbol '{}'",
                name
            );
            set.names.push(name.into());
        }
        Arc::new(set)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The position of `name`, if present.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_str() == name)
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(|n| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }

    /// The union of two symbol sets: the names of `self` in their order,
    /// followed by the names of `other` not already present, in theirs.
    pub fn union(&self, other: &SymbolSet) -> Arc<SymbolSet> {
        let mut merged = self.clone();
        for name in other.iter() {
            if merged.position_of(name).is_none() {
                merged.names.push(name.into());
            }
        }
        Arc::new(merged)
    }
}

impl Display for SymbolSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, name) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str("}")
    }
}

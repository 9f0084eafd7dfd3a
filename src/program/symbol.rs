//! Interned names for classes, members, prototypes and types.
//!
//! Every name that appears in a program (class descriptors, member names, method prototypes,
//! field types) is interned once into a [`SymbolTable`] and referenced by a compact [`Symbol`].
//! Interning goes through a shared reference so that builders and parallel phases can intern
//! concurrently.

use std::{fmt, sync::Arc};

use dashmap::DashMap;

/// Compact handle for an interned string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    /// Returns the raw index of this symbol in its table
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Concurrent string interner.
///
/// Lookups go through a [`DashMap`] index while the strings themselves live in an append-only
/// [`boxcar::Vec`], so resolved `&str` references stay valid for the lifetime of the table even
/// while other threads intern.
#[derive(Default)]
pub struct SymbolTable {
    index: DashMap<Arc<str>, Symbol>,
    strings: boxcar::Vec<Arc<str>>,
}

impl SymbolTable {
    /// Creates an empty symbol table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `value`, returning the existing symbol if it was interned before.
    pub fn intern(&self, value: &str) -> Symbol {
        if let Some(existing) = self.index.get(value) {
            return *existing;
        }

        let key: Arc<str> = Arc::from(value);
        *self
            .index
            .entry(key.clone())
            .or_insert_with(|| Symbol(self.strings.push(key) as u32))
    }

    /// Returns the symbol of `value` without interning it.
    #[must_use]
    pub fn get(&self, value: &str) -> Option<Symbol> {
        self.index.get(value).map(|entry| *entry)
    }

    /// Resolves a symbol back to its string.
    #[must_use]
    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.strings.get(symbol.index()).map(AsRef::as_ref)
    }

    /// Resolves a symbol for display purposes, `"<unknown>"` if it is foreign to this table.
    #[must_use]
    pub fn display(&self, symbol: Symbol) -> &str {
        self.resolve(symbol).unwrap_or("<unknown>")
    }

    /// Number of interned strings
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.count()
    }

    /// Returns true if nothing was interned yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_intern_is_stable() {
        let table = SymbolTable::new();
        let a = table.intern("com.example.A");
        let b = table.intern("com.example.B");
        assert_ne!(a, b);
        assert_eq!(table.intern("com.example.A"), a);
        assert_eq!(table.resolve(a), Some("com.example.A"));
        assert_eq!(table.get("com.example.B"), Some(b));
        assert_eq!(table.get("com.example.C"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_concurrent_intern() {
        let table = SymbolTable::new();
        let symbols: Vec<Symbol> = (0..256)
            .into_par_iter()
            .map(|i| table.intern(&format!("name{}", i % 16)))
            .collect();

        assert_eq!(table.len(), 16);
        for (i, symbol) in symbols.iter().enumerate() {
            assert_eq!(table.resolve(*symbol), Some(format!("name{}", i % 16).as_str()));
        }
    }
}

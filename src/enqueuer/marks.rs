//! Monotone mark sets of a pass.

use std::collections::{btree_set, BTreeSet};

use crate::program::Token;

/// Insert-only set of items.
///
/// There is no removal: an item marked once stays marked for the rest of the pass, which is
/// what bounds the number of fixpoint iterations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSet {
    items: BTreeSet<Token>,
}

impl MarkSet {
    /// Creates an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `item`, returning true if it was not marked before
    pub fn insert(&mut self, item: Token) -> bool {
        self.items.insert(item)
    }

    /// Returns true if `item` is marked
    #[must_use]
    pub fn contains(&self, item: Token) -> bool {
        self.items.contains(&item)
    }

    /// Number of marked items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is marked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Marked items in token order
    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        self.items.iter().copied()
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Token;
    type IntoIter = btree_set::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// All mark sets owned by the driver.
///
/// Invariants, maintained by the driver at every point of a pass:
/// `instantiated_types ⊆ live_types`, `live_methods ⊆ targeted_methods`,
/// `initialized_classes ⊆ live_types`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSets {
    /// Program types that must exist
    pub live_types: MarkSet,
    /// Program types whose instances may exist
    pub instantiated_types: MarkSet,
    /// Interfaces implemented by live lambdas
    pub lambda_interfaces: MarkSet,
    /// Program types whose static initializer may run
    pub initialized_classes: MarkSet,
    /// Methods that are the resolution target of a live reference
    pub targeted_methods: MarkSet,
    /// Methods whose body may execute
    pub live_methods: MarkSet,
    /// Fields with a traced access or kept by a rule
    pub live_fields: MarkSet,
    /// Library and classpath types referenced by live code
    pub live_non_program: MarkSet,
}

impl MarkSets {
    /// Creates empty mark sets
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes of the sets, in declaration order
    #[must_use]
    pub fn sizes(&self) -> [usize; 8] {
        [
            self.live_types.len(),
            self.instantiated_types.len(),
            self.lambda_interfaces.len(),
            self.initialized_classes.len(),
            self.targeted_methods.len(),
            self.live_methods.len(),
            self.live_fields.len(),
            self.live_non_program.len(),
        ]
    }

    /// Returns true if the invariants between the sets hold
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.instantiated_types.iter().all(|ty| self.live_types.contains(ty))
            && self.initialized_classes.iter().all(|ty| self.live_types.contains(ty))
            && self
                .live_methods
                .iter()
                .all(|method| self.targeted_methods.contains(method))
    }
}

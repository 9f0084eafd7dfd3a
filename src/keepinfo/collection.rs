//! Mutable keep information of all items during a pass, and its frozen snapshot.

use std::collections::{BTreeSet, HashMap};

use crate::{
    keepinfo::{
        GlobalKeepInfoConfiguration, JoinSemiLattice, KeepClassInfo, KeepClassJoiner,
        KeepConstraints, KeepFieldInfo, KeepFieldJoiner, KeepInfo, KeepInfoJoiner, KeepItemKind,
        KeepMethodInfo, KeepMethodJoiner,
    },
    program::Token,
    rules::RuleId,
};

/// Result of joining constraints into the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The stored value changed
    pub changed: bool,
    /// The item went from unpinned to pinned
    pub newly_pinned: bool,
}

#[derive(Debug)]
struct KindTable<K: KeepItemKind> {
    infos: HashMap<Token, KeepInfo<K>>,
    rules: HashMap<Token, BTreeSet<RuleId>>,
}

impl<K: KeepItemKind> KindTable<K> {
    fn new() -> Self {
        KindTable {
            infos: HashMap::new(),
            rules: HashMap::new(),
        }
    }

    fn get(&self, token: Token) -> KeepInfo<K> {
        self.infos.get(&token).copied().unwrap_or_default()
    }

    fn join(&mut self, token: Token, joiner: &KeepInfoJoiner<K>) -> JoinOutcome {
        let previous = self.get(token);
        let mut merged = previous.joiner();
        merged.merge(joiner);
        let joined = merged.build();
        debug_assert!(previous.is_less_than_or_equals(&joined));
        debug_assert_eq!(joined, previous.join(&joined));

        if !joiner.rules().is_empty() {
            self.rules
                .entry(token)
                .or_default()
                .extend(joiner.rules().iter().copied());
        }

        if joined == previous {
            return JoinOutcome {
                changed: false,
                newly_pinned: false,
            };
        }
        self.infos.insert(token, joined);
        JoinOutcome {
            changed: true,
            newly_pinned: joined.is_pinned() && !previous.is_pinned(),
        }
    }
}

/// Keep information of every class, method and field, mutable during a pass.
///
/// Items without an entry are at bottom. Joins only move values upwards; in debug builds every
/// join asserts it.
#[derive(Debug)]
pub struct KeepInfoCollection {
    classes: KindTable<crate::keepinfo::ClassItem>,
    methods: KindTable<crate::keepinfo::MethodItem>,
    fields: KindTable<crate::keepinfo::FieldItem>,
}

impl Default for KeepInfoCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl KeepInfoCollection {
    /// Creates a collection with every item at bottom
    #[must_use]
    pub fn new() -> Self {
        KeepInfoCollection {
            classes: KindTable::new(),
            methods: KindTable::new(),
            fields: KindTable::new(),
        }
    }

    /// Keep information of a class
    #[must_use]
    pub fn class_info(&self, token: Token) -> KeepClassInfo {
        self.classes.get(token)
    }

    /// Keep information of a method
    #[must_use]
    pub fn method_info(&self, token: Token) -> KeepMethodInfo {
        self.methods.get(token)
    }

    /// Keep information of a field
    #[must_use]
    pub fn field_info(&self, token: Token) -> KeepFieldInfo {
        self.fields.get(token)
    }

    /// Constraints of any item, dispatching on the token kind
    #[must_use]
    pub fn constraints(&self, token: Token) -> KeepConstraints {
        if token.is_class() {
            self.classes.get(token).constraints()
        } else if token.is_method() {
            self.methods.get(token).constraints()
        } else if token.is_field() {
            self.fields.get(token).constraints()
        } else {
            KeepConstraints::empty()
        }
    }

    /// Returns true if the item is pinned
    #[must_use]
    pub fn is_pinned(&self, token: Token) -> bool {
        self.constraints(token).contains(KeepConstraints::PINNED)
    }

    /// Joins constraints into a class
    pub fn join_class(&mut self, token: Token, joiner: &KeepClassJoiner) -> JoinOutcome {
        self.classes.join(token, joiner)
    }

    /// Joins constraints into a method
    pub fn join_method(&mut self, token: Token, joiner: &KeepMethodJoiner) -> JoinOutcome {
        self.methods.join(token, joiner)
    }

    /// Joins constraints into a field
    pub fn join_field(&mut self, token: Token, joiner: &KeepFieldJoiner) -> JoinOutcome {
        self.fields.join(token, joiner)
    }

    /// Rules that contributed constraints to the item
    #[must_use]
    pub fn rules_of(&self, token: Token) -> Option<&BTreeSet<RuleId>> {
        if token.is_class() {
            self.classes.rules.get(&token)
        } else if token.is_method() {
            self.methods.rules.get(&token)
        } else {
            self.fields.rules.get(&token)
        }
    }

    /// Freezes the collection into an immutable snapshot
    #[must_use]
    pub fn freeze(self, global: GlobalKeepInfoConfiguration) -> KeepInfoSnapshot {
        KeepInfoSnapshot {
            collection: self,
            global,
        }
    }
}

/// Immutable keep information published with a pass result.
#[derive(Debug)]
pub struct KeepInfoSnapshot {
    collection: KeepInfoCollection,
    global: GlobalKeepInfoConfiguration,
}

impl KeepInfoSnapshot {
    /// The global configuration gating every permission
    #[must_use]
    pub fn global(&self) -> &GlobalKeepInfoConfiguration {
        &self.global
    }

    /// Keep information of a class
    #[must_use]
    pub fn class_info(&self, token: Token) -> KeepClassInfo {
        self.collection.class_info(token)
    }

    /// Keep information of a method
    #[must_use]
    pub fn method_info(&self, token: Token) -> KeepMethodInfo {
        self.collection.method_info(token)
    }

    /// Keep information of a field
    #[must_use]
    pub fn field_info(&self, token: Token) -> KeepFieldInfo {
        self.collection.field_info(token)
    }

    /// Returns true if the item is pinned
    #[must_use]
    pub fn is_pinned(&self, token: Token) -> bool {
        self.collection.is_pinned(token)
    }

    /// Returns true if the item may be removed when unreachable
    #[must_use]
    pub fn is_shrinking_allowed(&self, token: Token) -> bool {
        self.global.shrinking && !self.is_pinned(token)
    }

    /// Returns true if the item may be renamed
    #[must_use]
    pub fn is_minification_allowed(&self, token: Token) -> bool {
        self.global.minification
            && !self
                .collection
                .constraints(token)
                .contains(KeepConstraints::DISALLOW_MINIFICATION)
    }

    /// Rules that contributed constraints to the item
    #[must_use]
    pub fn rules_of(&self, token: Token) -> Option<&BTreeSet<RuleId>> {
        self.collection.rules_of(token)
    }

    /// All pinned items in canonical order
    #[must_use]
    pub fn pinned_items(&self) -> Vec<Token> {
        let mut pinned: Vec<Token> = self
            .collection
            .classes
            .infos
            .iter()
            .filter(|(_, info)| info.is_pinned())
            .map(|(token, _)| *token)
            .chain(
                self.collection
                    .methods
                    .infos
                    .iter()
                    .filter(|(_, info)| info.is_pinned())
                    .map(|(token, _)| *token),
            )
            .chain(
                self.collection
                    .fields
                    .infos
                    .iter()
                    .filter(|(_, info)| info.is_pinned())
                    .map(|(token, _)| *token),
            )
            .collect();
        pinned.sort_unstable();
        pinned
    }

    /// Returns true if the item is at top for its kind
    #[must_use]
    pub fn is_top(&self, token: Token) -> bool {
        if token.is_class() {
            self.class_info(token).is_top()
        } else if token.is_method() {
            self.method_info(token).is_top()
        } else {
            self.field_info(token).is_top()
        }
    }

    /// Returns true if the item is at bottom for its kind
    #[must_use]
    pub fn is_bottom(&self, token: Token) -> bool {
        self.collection.constraints(token).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_reports_changes() {
        let mut collection = KeepInfoCollection::new();
        let class = Token::class(0);

        let mut joiner = KeepClassJoiner::new();
        joiner.disallow_minification();
        let outcome = collection.join_class(class, &joiner);
        assert!(outcome.changed);
        assert!(!outcome.newly_pinned);

        let outcome = collection.join_class(class, &joiner);
        assert!(!outcome.changed);

        let mut pin = KeepClassJoiner::new();
        pin.pin().add_rule(RuleId::new(3));
        let outcome = collection.join_class(class, &pin);
        assert!(outcome.changed);
        assert!(outcome.newly_pinned);
        assert!(collection.is_pinned(class));
        assert!(collection.class_info(class).constraints().contains(KeepConstraints::DISALLOW_MINIFICATION));
        assert_eq!(collection.rules_of(class).map(BTreeSet::len), Some(1));
    }

    #[test]
    fn test_join_order_does_not_matter() {
        let method = Token::method(0);
        let mut a = KeepMethodJoiner::new();
        a.disallow_inlining();
        let mut b = KeepMethodJoiner::new();
        b.pin();

        let mut first = KeepInfoCollection::new();
        first.join_method(method, &a);
        first.join_method(method, &b);

        let mut second = KeepInfoCollection::new();
        second.join_method(method, &b);
        second.join_method(method, &a);

        assert_eq!(first.method_info(method), second.method_info(method));
    }

    #[test]
    fn test_snapshot() {
        let mut collection = KeepInfoCollection::new();
        let mut top = KeepFieldJoiner::new();
        top.disallow_all();
        collection.join_field(Token::field(1), &top);
        collection.join_method(Token::method(0), KeepMethodJoiner::new().pin());

        let snapshot = collection.freeze(GlobalKeepInfoConfiguration::default());
        assert_eq!(snapshot.pinned_items(), vec![Token::field(1), Token::method(0)]);
        assert!(snapshot.is_top(Token::field(1)));
        assert!(!snapshot.is_top(Token::method(0)));
        assert!(snapshot.is_bottom(Token::class(0)));
        assert!(snapshot.is_shrinking_allowed(Token::class(0)));
        assert!(!snapshot.is_shrinking_allowed(Token::method(0)));
        assert!(!snapshot.is_minification_allowed(Token::field(1)));
    }
}

//! Minimum keep information required by rules, optionally guarded by a precondition.

use std::collections::BTreeMap;

use crate::{
    keepinfo::{KeepClassJoiner, KeepFieldJoiner, KeepMethodJoiner},
    program::Token,
};

/// Condition under which minimum keep information applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeepPrecondition {
    /// Applies immediately
    Unconditional,
    /// Applies once the class becomes live
    ClassLive(Token),
}

/// Joiners per item, accumulated from rule matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinimumKeepInfo {
    classes: BTreeMap<Token, KeepClassJoiner>,
    methods: BTreeMap<Token, KeepMethodJoiner>,
    fields: BTreeMap<Token, KeepFieldJoiner>,
}

impl MinimumKeepInfo {
    /// Creates an empty set of requirements
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joiner for a class, created at bottom on first access
    pub fn class_joiner(&mut self, token: Token) -> &mut KeepClassJoiner {
        self.classes.entry(token).or_default()
    }

    /// Joiner for a method, created at bottom on first access
    pub fn method_joiner(&mut self, token: Token) -> &mut KeepMethodJoiner {
        self.methods.entry(token).or_default()
    }

    /// Joiner for a field, created at bottom on first access
    pub fn field_joiner(&mut self, token: Token) -> &mut KeepFieldJoiner {
        self.fields.entry(token).or_default()
    }

    /// Merges all requirements of `other` into this set
    pub fn merge(&mut self, other: &MinimumKeepInfo) {
        for (token, joiner) in &other.classes {
            self.class_joiner(*token).merge(joiner);
        }
        for (token, joiner) in &other.methods {
            self.method_joiner(*token).merge(joiner);
        }
        for (token, joiner) in &other.fields {
            self.field_joiner(*token).merge(joiner);
        }
    }

    /// Class requirements in token order
    pub fn classes(&self) -> impl Iterator<Item = (&Token, &KeepClassJoiner)> {
        self.classes.iter()
    }

    /// Method requirements in token order
    pub fn methods(&self) -> impl Iterator<Item = (&Token, &KeepMethodJoiner)> {
        self.methods.iter()
    }

    /// Field requirements in token order
    pub fn fields(&self) -> impl Iterator<Item = (&Token, &KeepFieldJoiner)> {
        self.fields.iter()
    }

    /// Number of items with requirements
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len() + self.methods.len() + self.fields.len()
    }

    /// Returns true if there are no requirements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Minimum keep information grouped by precondition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependentMinimumKeepInfo {
    by_precondition: BTreeMap<KeepPrecondition, MinimumKeepInfo>,
}

impl DependentMinimumKeepInfo {
    /// Creates an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requirements guarded by `precondition`, created empty on first access
    pub fn get_or_create(&mut self, precondition: KeepPrecondition) -> &mut MinimumKeepInfo {
        self.by_precondition.entry(precondition).or_default()
    }

    /// Requirements guarded by `precondition`, if any
    #[must_use]
    pub fn get(&self, precondition: KeepPrecondition) -> Option<&MinimumKeepInfo> {
        self.by_precondition.get(&precondition)
    }

    /// Removes and returns the requirements guarded by `precondition`
    pub fn remove(&mut self, precondition: KeepPrecondition) -> Option<MinimumKeepInfo> {
        self.by_precondition.remove(&precondition)
    }

    /// Merges all requirements of `other` into this collection
    pub fn merge(&mut self, other: DependentMinimumKeepInfo) {
        for (precondition, minimum) in other.by_precondition {
            self.get_or_create(precondition).merge(&minimum);
        }
    }

    /// All preconditions with requirements, in order
    pub fn preconditions(&self) -> impl Iterator<Item = &KeepPrecondition> {
        self.by_precondition.keys()
    }

    /// Returns true if there are no requirements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_precondition.values().all(MinimumKeepInfo::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleId;

    #[test]
    fn test_merge_by_precondition() {
        let class = Token::class(3);
        let mut first = DependentMinimumKeepInfo::new();
        first
            .get_or_create(KeepPrecondition::ClassLive(class))
            .method_joiner(Token::method(1))
            .pin()
            .add_rule(RuleId::new(0));

        let mut second = DependentMinimumKeepInfo::new();
        second
            .get_or_create(KeepPrecondition::ClassLive(class))
            .method_joiner(Token::method(1))
            .disallow_minification()
            .add_rule(RuleId::new(1));
        second
            .get_or_create(KeepPrecondition::Unconditional)
            .class_joiner(class)
            .pin();

        first.merge(second);
        let dependent = first.remove(KeepPrecondition::ClassLive(class)).unwrap();
        let (_, joiner) = dependent.methods().next().unwrap();
        assert!(joiner.is_pinned());
        assert_eq!(joiner.rules().len(), 2);
        assert!(first.get(KeepPrecondition::ClassLive(class)).is_none());
        assert_eq!(first.get(KeepPrecondition::Unconditional).map(MinimumKeepInfo::len), Some(1));
    }
}

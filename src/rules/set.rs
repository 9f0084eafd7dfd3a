//! Ordered collection of all rules of a compilation.

use std::fmt;

use crate::{
    rules::{ClassSpec, ConstraintRule, IfRule, KeepRule, NamePattern},
    Result,
};

/// Identifier of a rule inside its [`RuleSet`], in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RuleId(u32);

impl RuleId {
    /// Creates a rule id from its index
    #[must_use]
    pub fn new(index: u32) -> Self {
        RuleId(index)
    }

    /// Index of the rule in its set
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// A rule of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::IntoStaticStr)]
pub enum Rule {
    /// Unconditional keep rule
    Keep(KeepRule),
    /// Conditional keep rule
    If(IfRule),
    /// Optimization-control rule
    Constraint(ConstraintRule),
    /// Keep rule that only seeds main-dex tracing
    MainDex(KeepRule),
}

/// All rules of a compilation.
///
/// Keep, conditional, constraint and main-dex rules share one id space. Suppression
/// (`-dontwarn`) and diagnostic requests (`-checkdiscard`, `-whyareyoukeeping`) are kept in
/// separate lists since nothing refers to them by id.
///
/// # Examples
///
/// ```rust
/// use shaker::rules::{ClassSpec, KeepRule, MemberSpec, RuleSet};
///
/// let mut rules = RuleSet::new();
/// let id = rules.add_keep(KeepRule::keep(
///     ClassSpec::named("com.foo.**")?.member(MemberSpec::all_methods()),
/// ));
/// rules.add_dont_warn("org.optional.**")?;
///
/// assert_eq!(rules.keep_rules().count(), 1);
/// assert!(rules.get(id).is_some());
/// assert!(rules.is_dont_warn("org.optional.Thing"));
/// # Ok::<(), shaker::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    dont_warn: Vec<NamePattern>,
    check_discard: Vec<ClassSpec>,
    why_are_you_keeping: Vec<ClassSpec>,
}

impl RuleSet {
    /// Creates an empty rule set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, rule: Rule) -> RuleId {
        let id = RuleId(u32::try_from(self.rules.len()).unwrap_or(u32::MAX));
        self.rules.push(rule);
        id
    }

    /// Adds an unconditional keep rule
    pub fn add_keep(&mut self, rule: KeepRule) -> RuleId {
        self.push(Rule::Keep(rule))
    }

    /// Adds a conditional keep rule
    pub fn add_if(&mut self, rule: IfRule) -> RuleId {
        self.push(Rule::If(rule))
    }

    /// Adds an optimization-control rule
    pub fn add_constraint(&mut self, rule: ConstraintRule) -> RuleId {
        self.push(Rule::Constraint(rule))
    }

    /// Adds a main-dex keep rule
    pub fn add_main_dex(&mut self, rule: KeepRule) -> RuleId {
        self.push(Rule::MainDex(rule))
    }

    /// Suppresses missing-definition reports for names matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if `pattern` does not compile.
    pub fn add_dont_warn(&mut self, pattern: &str) -> Result<()> {
        self.dont_warn.push(NamePattern::parse(pattern)?);
        Ok(())
    }

    /// Requests a report if any class matched by `spec` (or its matched members) survives
    pub fn add_check_discard(&mut self, spec: ClassSpec) {
        self.check_discard.push(spec);
    }

    /// Requests an explanation of why items matched by `spec` are kept
    pub fn add_why_are_you_keeping(&mut self, spec: ClassSpec) {
        self.why_are_you_keeping.push(spec);
    }

    /// The rule with the given id
    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    /// All rules with their ids, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| (RuleId(index as u32), rule))
    }

    /// Unconditional keep rules
    pub fn keep_rules(&self) -> impl Iterator<Item = (RuleId, &KeepRule)> {
        self.iter().filter_map(|(id, rule)| match rule {
            Rule::Keep(keep) => Some((id, keep)),
            _ => None,
        })
    }

    /// Conditional keep rules
    pub fn if_rules(&self) -> impl Iterator<Item = (RuleId, &IfRule)> {
        self.iter().filter_map(|(id, rule)| match rule {
            Rule::If(conditional) => Some((id, conditional)),
            _ => None,
        })
    }

    /// Optimization-control rules
    pub fn constraint_rules(&self) -> impl Iterator<Item = (RuleId, &ConstraintRule)> {
        self.iter().filter_map(|(id, rule)| match rule {
            Rule::Constraint(constraint) => Some((id, constraint)),
            _ => None,
        })
    }

    /// Main-dex keep rules
    pub fn main_dex_rules(&self) -> impl Iterator<Item = (RuleId, &KeepRule)> {
        self.iter().filter_map(|(id, rule)| match rule {
            Rule::MainDex(keep) => Some((id, keep)),
            _ => None,
        })
    }

    /// Check-discard requests
    #[must_use]
    pub fn check_discard(&self) -> &[ClassSpec] {
        &self.check_discard
    }

    /// Why-are-you-keeping requests
    #[must_use]
    pub fn why_are_you_keeping(&self) -> &[ClassSpec] {
        &self.why_are_you_keeping
    }

    /// Returns true if missing-definition reports for `name` are suppressed
    #[must_use]
    pub fn is_dont_warn(&self, name: &str) -> bool {
        self.dont_warn.iter().any(|pattern| pattern.matches_name(name))
    }

    /// Number of rules with ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules with ids
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ConstraintKind;

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut rules = RuleSet::new();
        let keep = rules.add_keep(KeepRule::keep(ClassSpec::any()));
        let conditional = rules.add_if(IfRule::new(
            ClassSpec::any(),
            KeepRule::keep(ClassSpec::any()),
        ));
        let constraint = rules.add_constraint(ConstraintRule::new(
            ConstraintKind::NoMerging,
            ClassSpec::any(),
        ));
        let main_dex = rules.add_main_dex(KeepRule::keep(ClassSpec::any()));

        assert_eq!(keep, RuleId::new(0));
        assert_eq!(conditional, RuleId::new(1));
        assert_eq!(constraint, RuleId::new(2));
        assert_eq!(main_dex, RuleId::new(3));
        assert_eq!(rules.len(), 4);

        assert_eq!(rules.keep_rules().map(|(id, _)| id).collect::<Vec<_>>(), vec![keep]);
        assert_eq!(rules.if_rules().count(), 1);
        assert_eq!(rules.constraint_rules().count(), 1);
        assert_eq!(rules.main_dex_rules().map(|(id, _)| id).collect::<Vec<_>>(), vec![main_dex]);
        assert!(matches!(rules.get(conditional), Some(Rule::If(_))));
        assert_eq!(main_dex.to_string(), "rule#3");
    }

    #[test]
    fn test_dont_warn() {
        let mut rules = RuleSet::new();
        rules.add_dont_warn("javax.annotation.**").unwrap();
        assert!(rules.is_dont_warn("javax.annotation.Nullable"));
        assert!(!rules.is_dont_warn("javax.inject.Inject"));
        assert!(rules.add_dont_warn("a.****").is_err());
    }
}

//! Retention rules.
//!
//! Rules are constructed programmatically; parsing a textual configuration is left to the
//! embedder. A [`RuleSet`] assigns every keep, conditional, constraint and main-dex rule a
//! [`RuleId`] so that keep information and diagnostics can name the rule responsible for
//! retaining an item.
//!
//! # Key Components
//!
//! - [`NamePattern`] / [`Captures`] - Wildcard patterns with back-references
//! - [`ClassSpec`] / [`MemberSpec`] - Class and member predicates
//! - [`KeepRule`] - `-keep`, `-keepclassmembers` and `-keepclasseswithmembers`
//! - [`IfRule`] - Keep rules gated on a live class satisfying a precondition
//! - [`ConstraintRule`] - Optimization control that never pins
//! - [`RuleSet`] - All rules plus `-dontwarn`, `-checkdiscard` and `-whyareyoukeeping`
//!
//! # Capture Order
//!
//! Wildcards capture in the order they are matched: class name, then the inheritance clause,
//! then each member in specification order (type, name, parameters). A back-reference `<n>`
//! refers to the n-th capture of that sequence.

mod class_spec;
mod conditional;
mod constraint;
mod keep_rule;
mod member_spec;
mod pattern;
mod set;

pub use class_spec::{ClassSpec, ClassTypeFilter, InheritanceSpec, NameFilter};
pub use conditional::IfRule;
pub use constraint::{ConstraintKind, ConstraintRule};
pub use keep_rule::{KeepModifiers, KeepRule, KeepRuleKind};
pub use member_spec::{ArgsPattern, MemberAccess, MemberKind, MemberSpec};
pub use pattern::{Captures, NamePattern};
pub use set::{Rule, RuleId, RuleSet};

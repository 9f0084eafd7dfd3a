//! Optimization-control rules that constrain items without keeping them.

use crate::{
    keepinfo::{KeepConstraints, KeepInfoJoiner, KeepItemKind},
    rules::{ClassSpec, RuleId},
};

/// Kind of optimization-control rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ConstraintKind {
    /// Matched methods must not be inlined (`-neverinline`)
    NeverInline,
    /// Instances of matched classes must not be inlined (`-neverclassinline`)
    NeverClassInline,
    /// Matched classes must not be merged (`-nomerging`)
    NoMerging,
    /// Calls to matched methods may be removed when their result is unused
    /// (`-assumenosideeffects`)
    AssumeNoSideEffects,
}

/// A rule adding non-pinning constraints to the items it matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintRule {
    /// What the rule forbids or assumes
    pub kind: ConstraintKind,
    /// Items the rule applies to
    pub spec: ClassSpec,
}

impl ConstraintRule {
    /// Creates a constraint rule
    #[must_use]
    pub fn new(kind: ConstraintKind, spec: ClassSpec) -> Self {
        ConstraintRule { kind, spec }
    }

    /// Constraints added to matched items; never includes [`KeepConstraints::PINNED`]
    #[must_use]
    pub fn constraints(&self) -> KeepConstraints {
        match self.kind {
            ConstraintKind::NeverInline => KeepConstraints::DISALLOW_INLINING,
            ConstraintKind::NeverClassInline => KeepConstraints::DISALLOW_CLASS_INLINING,
            ConstraintKind::NoMerging => KeepConstraints::DISALLOW_MERGING,
            ConstraintKind::AssumeNoSideEffects => KeepConstraints::empty(),
        }
    }

    /// Returns true if the rule applies to the matched classes themselves rather than members
    #[must_use]
    pub fn targets_classes(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::NeverClassInline | ConstraintKind::NoMerging
        )
    }

    /// Joiner carrying the constraints of this rule for one item kind
    #[must_use]
    pub fn joiner<K: KeepItemKind>(&self, id: RuleId) -> KeepInfoJoiner<K> {
        let mut joiner = KeepInfoJoiner::new();
        joiner.disallow(self.constraints()).add_rule(id);
        joiner
    }
}

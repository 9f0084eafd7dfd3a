//! Keep rules and their minimum keep information.

use bitflags::bitflags;

use crate::{
    keepinfo::{KeepConstraints, KeepInfoJoiner, KeepItemKind, KeepPrecondition},
    program::Token,
    rules::{Captures, ClassSpec, RuleId},
    Result,
};

/// Kind of keep rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum KeepRuleKind {
    /// Keeps matching classes and their matching members (`-keep`)
    Keep,
    /// Keeps matching members of classes that are live for other reasons (`-keepclassmembers`)
    KeepClassMembers,
    /// Keeps classes, and their matching members, that have all listed members
    /// (`-keepclasseswithmembers`)
    KeepClassesWithMembers,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Modifiers relaxing what a keep rule retains.
    pub struct KeepModifiers: u32 {
        /// Matched items may still be removed when unreachable
        const ALLOW_SHRINKING = 1 << 0;
        /// Matched items may be renamed
        const ALLOW_OBFUSCATION = 1 << 1;
        /// Matched items may be optimized
        const ALLOW_OPTIMIZATION = 1 << 2;
        /// Visibility of matched items may change
        const ALLOW_ACCESS_MODIFICATION = 1 << 3;
        /// Matched classes may be moved to another package
        const ALLOW_REPACKAGING = 1 << 4;
        /// Classes in the descriptors of matched members keep their names
        const INCLUDE_DESCRIPTOR_CLASSES = 1 << 5;
    }
}

/// A keep rule: kind, modifiers and the class specification it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeepRule {
    /// What the rule keeps
    pub kind: KeepRuleKind,
    /// Relaxations of the retained properties
    pub modifiers: KeepModifiers,
    /// Classes and members the rule applies to
    pub spec: ClassSpec,
}

impl KeepRule {
    /// `-keep` rule for `spec`
    #[must_use]
    pub fn keep(spec: ClassSpec) -> Self {
        KeepRule {
            kind: KeepRuleKind::Keep,
            modifiers: KeepModifiers::empty(),
            spec,
        }
    }

    /// `-keepclassmembers` rule for `spec`
    #[must_use]
    pub fn keep_class_members(spec: ClassSpec) -> Self {
        KeepRule {
            kind: KeepRuleKind::KeepClassMembers,
            ..Self::keep(spec)
        }
    }

    /// `-keepclasseswithmembers` rule for `spec`
    #[must_use]
    pub fn keep_classes_with_members(spec: ClassSpec) -> Self {
        KeepRule {
            kind: KeepRuleKind::KeepClassesWithMembers,
            ..Self::keep(spec)
        }
    }

    /// Adds modifiers to the rule
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: KeepModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Constraints every item matched by this rule receives.
    ///
    /// An unmodified rule yields the full constraint set; each `allow*` modifier removes the
    /// constraints of the transformation it allows.
    #[must_use]
    pub fn minimum_constraints(&self) -> KeepConstraints {
        let allows = |modifier| self.modifiers.contains(modifier);
        let mut constraints = KeepConstraints::empty();

        if !allows(KeepModifiers::ALLOW_SHRINKING) {
            constraints |= KeepConstraints::PINNED;
        }
        if !allows(KeepModifiers::ALLOW_OBFUSCATION) {
            constraints |= KeepConstraints::DISALLOW_MINIFICATION
                | KeepConstraints::DISALLOW_ANNOTATION_REMOVAL
                | KeepConstraints::DISALLOW_SIGNATURE_REMOVAL;
        }
        if !allows(KeepModifiers::ALLOW_OPTIMIZATION) {
            constraints |= KeepConstraints::DISALLOW_OPTIMIZATION
                | KeepConstraints::DISALLOW_INLINING
                | KeepConstraints::DISALLOW_CLASS_INLINING
                | KeepConstraints::DISALLOW_MERGING
                | KeepConstraints::DISALLOW_UNUSED_ARGUMENT_REMOVAL
                | KeepConstraints::DISALLOW_FIELD_TYPE_STRENGTHENING;
        }
        if !allows(KeepModifiers::ALLOW_ACCESS_MODIFICATION) {
            constraints |= KeepConstraints::DISALLOW_ACCESS_MODIFICATION;
        }
        if !allows(KeepModifiers::ALLOW_REPACKAGING) {
            constraints |= KeepConstraints::DISALLOW_REPACKAGING;
        }
        constraints
    }

    /// Joiner carrying the minimum keep information of this rule for one item kind
    #[must_use]
    pub fn minimum_keep_info<K: KeepItemKind>(&self, id: RuleId) -> KeepInfoJoiner<K> {
        let mut joiner = KeepInfoJoiner::new();
        joiner.disallow(self.minimum_constraints()).add_rule(id);
        joiner
    }

    /// Precondition under which matched members of `class` are kept
    #[must_use]
    pub fn member_precondition(&self, class: Token) -> KeepPrecondition {
        match self.kind {
            KeepRuleKind::KeepClassMembers => KeepPrecondition::ClassLive(class),
            KeepRuleKind::Keep | KeepRuleKind::KeepClassesWithMembers => {
                KeepPrecondition::Unconditional
            }
        }
    }

    /// Returns true if the rule keeps the matched class itself
    #[must_use]
    pub fn keeps_class(&self) -> bool {
        self.kind != KeepRuleKind::KeepClassMembers
    }

    /// Returns true if the rule has no wildcards or back-references
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.spec.is_concrete()
    }

    /// Replaces back-references by captured texts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRule`] if a back-reference exceeds `captures`.
    pub fn substitute(&self, captures: &Captures) -> Result<KeepRule> {
        Ok(KeepRule {
            kind: self.kind,
            modifiers: self.modifiers,
            spec: self.spec.substitute(captures)?,
        })
    }
}

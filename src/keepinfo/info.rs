//! Per-item keep information and its upward-only joiner.

use std::{collections::BTreeSet, fmt, hash::Hash, marker::PhantomData};

use crate::{
    keepinfo::{GlobalKeepInfoConfiguration, JoinSemiLattice, KeepConstraints, Lattice},
    rules::RuleId,
};

/// Item kind a [`KeepInfo`] value belongs to.
pub trait KeepItemKind: Copy + fmt::Debug + Eq + Hash + Send + Sync + 'static {
    /// Constraints that are meaningful for this kind; also the kind's top element
    const APPLICABLE: KeepConstraints;
    /// Human readable name of the kind
    const NAME: &'static str;
}

/// Marker for class keep information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassItem;

/// Marker for method keep information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodItem;

/// Marker for field keep information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldItem;

impl KeepItemKind for ClassItem {
    const APPLICABLE: KeepConstraints = KeepConstraints::CLASS;
    const NAME: &'static str = "class";
}

impl KeepItemKind for MethodItem {
    const APPLICABLE: KeepConstraints = KeepConstraints::METHOD;
    const NAME: &'static str = "method";
}

impl KeepItemKind for FieldItem {
    const APPLICABLE: KeepConstraints = KeepConstraints::FIELD;
    const NAME: &'static str = "field";
}

/// Immutable keep information of one item.
///
/// Values are plain bit sets, so two values with the same constraints are equal and
/// interchangeable. The shared [`KeepInfo::bottom`] and [`KeepInfo::top`] constants are the
/// canonical extremes of each kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeepInfo<K: KeepItemKind> {
    constraints: KeepConstraints,
    kind: PhantomData<K>,
}

/// Keep information of a class
pub type KeepClassInfo = KeepInfo<ClassItem>;
/// Keep information of a method
pub type KeepMethodInfo = KeepInfo<MethodItem>;
/// Keep information of a field
pub type KeepFieldInfo = KeepInfo<FieldItem>;

impl<K: KeepItemKind> KeepInfo<K> {
    const BOTTOM: Self = KeepInfo {
        constraints: KeepConstraints::empty(),
        kind: PhantomData,
    };

    const TOP: Self = KeepInfo {
        constraints: K::APPLICABLE,
        kind: PhantomData,
    };

    fn with_constraints(constraints: KeepConstraints) -> Self {
        KeepInfo {
            constraints: constraints & K::APPLICABLE,
            kind: PhantomData,
        }
    }

    /// The constraints carried by this value
    #[must_use]
    pub fn constraints(&self) -> KeepConstraints {
        self.constraints
    }

    /// Starts a joiner seeded with this value
    #[must_use]
    pub fn joiner(&self) -> KeepInfoJoiner<K> {
        KeepInfoJoiner::from_info(*self)
    }

    /// Returns true if the item must be retained
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.constraints.contains(KeepConstraints::PINNED)
    }

    fn allows(&self, enabled: bool, constraint: KeepConstraints) -> bool {
        enabled && !self.constraints.intersects(constraint)
    }

    /// Returns true if the item may be removed when unreachable
    #[must_use]
    pub fn is_shrinking_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(global.shrinking, KeepConstraints::PINNED)
    }

    /// Returns true if the item may be renamed
    #[must_use]
    pub fn is_minification_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(global.minification, KeepConstraints::DISALLOW_MINIFICATION)
    }

    /// Returns true if the item may be optimized
    #[must_use]
    pub fn is_optimization_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(global.optimization, KeepConstraints::DISALLOW_OPTIMIZATION)
    }

    /// Returns true if the item may be inlined into callers
    #[must_use]
    pub fn is_inlining_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(
            global.optimization,
            KeepConstraints::DISALLOW_OPTIMIZATION | KeepConstraints::DISALLOW_INLINING,
        )
    }

    /// Returns true if the item may be moved to another package
    #[must_use]
    pub fn is_repackaging_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(
            global.repackaging,
            KeepConstraints::DISALLOW_REPACKAGING | KeepConstraints::DISALLOW_MINIFICATION,
        )
    }

    /// Returns true if the item's visibility may change
    #[must_use]
    pub fn is_access_modification_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(global.access_modification, KeepConstraints::DISALLOW_ACCESS_MODIFICATION)
    }

    /// Returns true if the item's annotations may be removed
    #[must_use]
    pub fn is_annotation_removal_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(global.annotation_removal, KeepConstraints::DISALLOW_ANNOTATION_REMOVAL)
    }

    /// Returns true if the item's generic signature may be removed
    #[must_use]
    pub fn is_signature_removal_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(global.annotation_removal, KeepConstraints::DISALLOW_SIGNATURE_REMOVAL)
    }

    /// Returns true if instances of the class may be inlined into their users
    #[must_use]
    pub fn is_class_inlining_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(
            global.optimization,
            KeepConstraints::DISALLOW_OPTIMIZATION | KeepConstraints::DISALLOW_CLASS_INLINING,
        )
    }

    /// Returns true if the class may be merged with another class
    #[must_use]
    pub fn is_merging_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(
            global.optimization,
            KeepConstraints::DISALLOW_OPTIMIZATION | KeepConstraints::DISALLOW_MERGING,
        )
    }

    /// Returns true if unused arguments of the method may be removed
    #[must_use]
    pub fn is_unused_argument_removal_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(
            global.optimization,
            KeepConstraints::DISALLOW_OPTIMIZATION
                | KeepConstraints::DISALLOW_UNUSED_ARGUMENT_REMOVAL,
        )
    }

    /// Returns true if the field's declared type may be strengthened
    #[must_use]
    pub fn is_field_type_strengthening_allowed(&self, global: &GlobalKeepInfoConfiguration) -> bool {
        self.allows(
            global.optimization,
            KeepConstraints::DISALLOW_OPTIMIZATION
                | KeepConstraints::DISALLOW_FIELD_TYPE_STRENGTHENING,
        )
    }

    /// Returns true if survival of the item must be reported
    #[must_use]
    pub fn is_check_discarded_enabled(&self) -> bool {
        self.constraints.contains(KeepConstraints::CHECK_DISCARDED)
    }
}

impl<K: KeepItemKind> JoinSemiLattice for KeepInfo<K> {
    fn join(&self, other: &Self) -> Self {
        Self::with_constraints(self.constraints | other.constraints)
    }

    fn is_top(&self) -> bool {
        self.constraints == K::APPLICABLE
    }

    fn is_less_than_or_equals(&self, other: &Self) -> bool {
        other.constraints.contains(self.constraints)
    }
}

impl<K: KeepItemKind> Lattice for KeepInfo<K> {
    fn top() -> Self {
        Self::TOP
    }

    fn bottom() -> Self {
        Self::BOTTOM
    }

    fn is_bottom(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl<K: KeepItemKind> Default for KeepInfo<K> {
    fn default() -> Self {
        Self::BOTTOM
    }
}

impl<K: KeepItemKind> fmt::Debug for KeepInfo<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeepInfo<{}>({:?})", K::NAME, self.constraints)
    }
}

/// Mutable builder that can only add constraints.
///
/// A joiner starts from an existing [`KeepInfo`] and accumulates constraints plus the ids of
/// the rules that caused them. [`KeepInfoJoiner::build`] returns the original value when
/// nothing changed and the shared extremes when the result is bottom or top.
#[derive(Clone, PartialEq, Eq)]
pub struct KeepInfoJoiner<K: KeepItemKind> {
    original: KeepInfo<K>,
    constraints: KeepConstraints,
    rules: BTreeSet<RuleId>,
}

/// Joiner for class keep information
pub type KeepClassJoiner = KeepInfoJoiner<ClassItem>;
/// Joiner for method keep information
pub type KeepMethodJoiner = KeepInfoJoiner<MethodItem>;
/// Joiner for field keep information
pub type KeepFieldJoiner = KeepInfoJoiner<FieldItem>;

impl<K: KeepItemKind> KeepInfoJoiner<K> {
    /// Creates a joiner starting at bottom
    #[must_use]
    pub fn new() -> Self {
        Self::from_info(KeepInfo::BOTTOM)
    }

    fn from_info(original: KeepInfo<K>) -> Self {
        KeepInfoJoiner {
            original,
            constraints: original.constraints,
            rules: BTreeSet::new(),
        }
    }

    /// Adds arbitrary constraints, ignoring those not applicable to the kind
    pub fn disallow(&mut self, constraints: KeepConstraints) -> &mut Self {
        self.constraints |= constraints & K::APPLICABLE;
        self
    }

    /// Forbids removal
    pub fn pin(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::PINNED)
    }

    /// Forbids all transformations
    pub fn disallow_all(&mut self) -> &mut Self {
        self.disallow(K::APPLICABLE)
    }

    /// Forbids optimization
    pub fn disallow_optimization(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_OPTIMIZATION)
    }

    /// Forbids inlining
    pub fn disallow_inlining(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_INLINING)
    }

    /// Forbids renaming
    pub fn disallow_minification(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_MINIFICATION)
    }

    /// Forbids repackaging
    pub fn disallow_repackaging(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_REPACKAGING)
    }

    /// Forbids visibility changes
    pub fn disallow_access_modification(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_ACCESS_MODIFICATION)
    }

    /// Forbids annotation removal
    pub fn disallow_annotation_removal(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_ANNOTATION_REMOVAL)
    }

    /// Forbids signature removal
    pub fn disallow_signature_removal(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_SIGNATURE_REMOVAL)
    }

    /// Forbids class inlining
    pub fn disallow_class_inlining(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_CLASS_INLINING)
    }

    /// Forbids merging
    pub fn disallow_merging(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_MERGING)
    }

    /// Forbids unused argument removal
    pub fn disallow_unused_argument_removal(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_UNUSED_ARGUMENT_REMOVAL)
    }

    /// Forbids field type strengthening
    pub fn disallow_field_type_strengthening(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::DISALLOW_FIELD_TYPE_STRENGTHENING)
    }

    /// Requests a report if the item survives
    pub fn set_check_discarded(&mut self) -> &mut Self {
        self.disallow(KeepConstraints::CHECK_DISCARDED)
    }

    /// Records the rule responsible for the added constraints
    pub fn add_rule(&mut self, rule: RuleId) -> &mut Self {
        self.rules.insert(rule);
        self
    }

    /// Merges the constraints and rules of `other` into this joiner.
    ///
    /// Merging is commutative and associative.
    pub fn merge(&mut self, other: &KeepInfoJoiner<K>) -> &mut Self {
        self.constraints |= other.constraints;
        self.rules.extend(other.rules.iter().copied());
        self
    }

    /// The constraints accumulated so far
    #[must_use]
    pub fn constraints(&self) -> KeepConstraints {
        self.constraints
    }

    /// The rules recorded so far
    #[must_use]
    pub fn rules(&self) -> &BTreeSet<RuleId> {
        &self.rules
    }

    /// Returns true if the joiner carries no constraints
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Returns true if the joiner carries every applicable constraint
    #[must_use]
    pub fn is_top(&self) -> bool {
        self.constraints == K::APPLICABLE
    }

    /// Returns true if the joiner pins the item
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.constraints.contains(KeepConstraints::PINNED)
    }

    /// Returns true if building would change the original value
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.constraints != self.original.constraints
    }

    /// Produces the joined value.
    ///
    /// Returns the original value when nothing changed, and the canonical extremes for
    /// bottom and top.
    #[must_use]
    pub fn build(&self) -> KeepInfo<K> {
        if !self.is_changed() {
            return self.original;
        }
        if self.is_top() {
            return KeepInfo::TOP;
        }
        if self.is_bottom() {
            return KeepInfo::BOTTOM;
        }
        KeepInfo::with_constraints(self.constraints)
    }
}

impl<K: KeepItemKind> Default for KeepInfoJoiner<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeepItemKind> fmt::Debug for KeepInfoJoiner<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepInfoJoiner")
            .field("kind", &K::NAME)
            .field("constraints", &self.constraints)
            .field("rules", &self.rules)
            .finish()
    }
}

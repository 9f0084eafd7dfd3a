use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    /// Constraints carried by keep information.
    ///
    /// A set bit forbids the corresponding transformation. The empty set is the lattice bottom
    /// (everything allowed), the per-kind applicable set is the top (fully pinned).
    pub struct KeepConstraints: u32 {
        /// The item must not be removed
        const PINNED = 1 << 0;
        /// The item must not be optimized
        const DISALLOW_OPTIMIZATION = 1 << 1;
        /// The method must not be inlined
        const DISALLOW_INLINING = 1 << 2;
        /// The item must not be renamed
        const DISALLOW_MINIFICATION = 1 << 3;
        /// The class must not be moved to another package
        const DISALLOW_REPACKAGING = 1 << 4;
        /// The item's visibility must not change
        const DISALLOW_ACCESS_MODIFICATION = 1 << 5;
        /// The item's annotations must be retained
        const DISALLOW_ANNOTATION_REMOVAL = 1 << 6;
        /// The item's generic signature must be retained
        const DISALLOW_SIGNATURE_REMOVAL = 1 << 7;
        /// Instances of the class must not be inlined into their users
        const DISALLOW_CLASS_INLINING = 1 << 8;
        /// The class must not be merged with another class
        const DISALLOW_MERGING = 1 << 9;
        /// Unused arguments of the method must be retained
        const DISALLOW_UNUSED_ARGUMENT_REMOVAL = 1 << 10;
        /// The field's declared type must not be strengthened
        const DISALLOW_FIELD_TYPE_STRENGTHENING = 1 << 11;
        /// The item must be reported if it survives shrinking
        const CHECK_DISCARDED = 1 << 12;
    }
}

impl KeepConstraints {
    /// Constraints that apply to every item kind
    pub const COMMON: Self = Self::PINNED
        .union(Self::DISALLOW_OPTIMIZATION)
        .union(Self::DISALLOW_MINIFICATION)
        .union(Self::DISALLOW_ACCESS_MODIFICATION)
        .union(Self::DISALLOW_ANNOTATION_REMOVAL)
        .union(Self::DISALLOW_SIGNATURE_REMOVAL)
        .union(Self::CHECK_DISCARDED);

    /// Constraints applicable to classes
    pub const CLASS: Self = Self::COMMON
        .union(Self::DISALLOW_REPACKAGING)
        .union(Self::DISALLOW_CLASS_INLINING)
        .union(Self::DISALLOW_MERGING);

    /// Constraints applicable to methods
    pub const METHOD: Self = Self::COMMON
        .union(Self::DISALLOW_INLINING)
        .union(Self::DISALLOW_UNUSED_ARGUMENT_REMOVAL);

    /// Constraints applicable to fields
    pub const FIELD: Self = Self::COMMON.union(Self::DISALLOW_FIELD_TYPE_STRENGTHENING);
}

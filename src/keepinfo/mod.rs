//! Keep information: what each class, method and field must retain.
//!
//! Every item carries a [`KeepInfo`] value from a small bounded lattice. Bottom means every
//! transformation (removal, renaming, optimization, ...) is allowed; top means the item is
//! fully pinned. Rules and the reachability analysis only ever join constraints into items, so
//! values move monotonically upwards during a pass.
//!
//! # Key Components
//!
//! - [`KeepConstraints`] - The constraint bits and their per-kind applicable masks
//! - [`KeepInfo`] - Immutable per-item value, typed by [`ClassItem`], [`MethodItem`], [`FieldItem`]
//! - [`KeepInfoJoiner`] - Upward-only builder recording responsible rules
//! - [`KeepInfoCollection`] - Mutable per-pass store, frozen into a [`KeepInfoSnapshot`]
//! - [`DependentMinimumKeepInfo`] - Rule requirements guarded by a [`KeepPrecondition`]
//! - [`GlobalKeepInfoConfiguration`] - Global switches gating every permission
//!
//! # Examples
//!
//! ```rust
//! use shaker::keepinfo::{GlobalKeepInfoConfiguration, KeepMethodInfo, JoinSemiLattice, Lattice};
//!
//! let global = GlobalKeepInfoConfiguration::default();
//! let mut joiner = KeepMethodInfo::bottom().joiner();
//! joiner.disallow_inlining();
//! let info = joiner.build();
//!
//! assert!(!info.is_inlining_allowed(&global));
//! assert!(info.is_shrinking_allowed(&global));
//! assert!(KeepMethodInfo::bottom().is_less_than_or_equals(&info));
//! ```

mod collection;
mod constraints;
mod global;
mod info;
mod lattice;
mod minimum;

pub use collection::{JoinOutcome, KeepInfoCollection, KeepInfoSnapshot};
pub use constraints::KeepConstraints;
pub use global::GlobalKeepInfoConfiguration;
pub use info::{
    ClassItem, FieldItem, KeepClassInfo, KeepClassJoiner, KeepFieldInfo, KeepFieldJoiner,
    KeepInfo, KeepInfoJoiner, KeepItemKind, KeepMethodInfo, KeepMethodJoiner, MethodItem,
};
pub use lattice::{JoinSemiLattice, Lattice};
pub use minimum::{DependentMinimumKeepInfo, KeepPrecondition, MinimumKeepInfo};

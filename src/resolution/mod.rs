//! Member resolution, virtual dispatch and single-target caching.
//!
//! This module provides resolution of symbolic references against a [`crate::program::Program`]:
//! - Class hierarchy indexing for subtype and supertype walks
//! - Method and field resolution following the virtual machine's lookup rules
//! - Virtual dispatch lookup for a given receiver type
//! - Access checks of members from a calling context
//! - A memoized single-target answer for virtual calls, invalidated as instantiation grows
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌─────────────────────┐    ┌─────────────────────┐
//! │  ClassHierarchy  │───>│  resolve_method /   │───>│ SingleTargetCache   │
//! │ (sub/supertypes) │    │  dispatch lookup    │    │ (per receiver memo) │
//! └──────────────────┘    └─────────────────────┘    └─────────────────────┘
//! ```

mod hierarchy;
mod lookup;
mod single_target;

pub use hierarchy::{ClassHierarchy, HierarchyStats};
pub use lookup::{
    is_accessible, lookup_virtual_dispatch_target, resolve_field, resolve_method, same_nest,
    same_package, FieldResolution, MethodResolution,
};
pub use single_target::{
    InstantiationInfo, MethodKey, SingleTargetCache, SingleTargetQuery, SingleTargetStats,
};

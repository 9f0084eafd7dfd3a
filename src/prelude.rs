//! # shaker Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the shaker
//! library. Import this module to get quick access to everything needed to build a program,
//! describe rules and run a pass.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all shaker operations
pub use crate::Error;

/// The result type used throughout shaker
pub use crate::Result;

/// Configuration shared by all passes
pub use crate::config::ShakerConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Single-pass and multi-pass tree shaking
pub use crate::pipeline::{shake, ShakeOutcome, Shaker};

/// The fixpoint driver, its modes and its result
pub use crate::enqueuer::{Enqueuer, EnqueuerResult, EnqueuerState, Mode};

// ================================================================================================
// Program Graph
// ================================================================================================

/// Definitions and handles
pub use crate::program::{ClassDef, FieldDef, MethodDef, Program, Symbol, Token};

/// Construction of programs
pub use crate::program::{ConstValue, FieldFlags, MethodFlags, ProgramBuilder};

/// References used by instructions
pub use crate::program::{FieldRef, InvokeKind, MethodRef};

// ================================================================================================
// Rules and Keep Information
// ================================================================================================

/// Rule objects
pub use crate::rules::{
    ClassSpec, ConstraintKind, ConstraintRule, IfRule, KeepModifiers, KeepRule, MemberSpec,
    RuleId, RuleSet,
};

/// Keep-information queries on a finished pass
pub use crate::keepinfo::{GlobalKeepInfoConfiguration, KeepInfoSnapshot};

// ================================================================================================
// Diagnostics
// ================================================================================================

/// Retention graph and reports
pub use crate::diagnostics::{
    CheckDiscardReport, CollectingGraphConsumer, EdgeKind, GraphNode, KeepPath, KeptGraph,
    KeptGraphConsumer, MainDexInfo, MissingItemsReport,
};

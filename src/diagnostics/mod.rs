//! Diagnostics produced by a tree-shaking pass.
//!
//! None of these stop tracing. The enqueuer feeds them while it runs (retention edges,
//! missing references) or they are computed from its result afterwards (discard checks,
//! main-dex classes). Every report is sorted before it is handed out so that output does not
//! depend on worklist order.
//!
//! # Key Components
//!
//! - [`KeptGraphConsumer`] / [`CollectingGraphConsumer`] - Receivers of retention edges
//! - [`KeptGraph`] - Collected edges answering `-whyareyoukeeping` queries
//! - [`MissingItemsCollector`] - References to undefined classes and members
//! - [`CheckDiscard`] - `-checkdiscard` verification
//! - [`MainDexInfo`] - Main-dex roots and their direct dependencies

mod checkdiscard;
mod graph;
mod maindex;
mod missing;

pub use checkdiscard::{CheckDiscard, CheckDiscardReport};
pub use graph::{CollectingGraphConsumer, EdgeKind, GraphNode, KeepPath, KeptGraph, KeptGraphConsumer};
pub use maindex::MainDexInfo;
pub use missing::{MissingEntry, MissingItem, MissingItemsCollector, MissingItemsReport};

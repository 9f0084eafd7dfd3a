//! Directed graph infrastructure.
//!
//! Used to record retention edges while tracing and to answer path queries over them
//! afterwards.
//!
//! # Key Components
//!
//! - [`DirectedGraph`] - Adjacency-list graph with node and edge payloads
//! - [`IndexedGraph`] - Keyed wrapper mapping domain values to [`NodeId`]s
//! - [`GraphBase`], [`Successors`], [`Predecessors`] - Traits the algorithms are written against
//! - [`algorithms`] - Breadth-first traversal and shortest paths

pub mod algorithms;
mod directed;
mod edge;
mod indexed;
mod node;
mod traits;

pub use directed::DirectedGraph;
pub use edge::EdgeId;
pub use indexed::IndexedGraph;
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, Successors};

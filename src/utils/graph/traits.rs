//! Trait definitions for graph abstractions.
//!
//! Algorithms are written against these traits rather than a concrete graph type:
//!
//! - [`GraphBase`] - Node count and node iteration
//! - [`Successors`] - Forward edge traversal
//! - [`Predecessors`] - Backward edge traversal
//!
//! Adjacency queries return iterators so simple traversals never allocate.

use crate::utils::graph::NodeId;

/// Base trait providing core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers, in insertion order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward traversal over outgoing edges.
pub trait Successors: GraphBase {
    /// Returns the targets of all edges leaving `node`.
    ///
    /// An unknown `node` has no successors.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward traversal over incoming edges.
pub trait Predecessors: GraphBase {
    /// Returns the sources of all edges entering `node`.
    ///
    /// An unknown `node` has no predecessors.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

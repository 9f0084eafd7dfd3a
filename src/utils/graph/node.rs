//! Node identifier for directed graphs.

use std::fmt;

/// A strongly-typed identifier for nodes within a directed graph.
///
/// Node ids are assigned sequentially starting from 0 as nodes are added, so they can be used
/// directly to index per-node vectors.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a node id from a raw index
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the underlying 0-based index
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_format() {
        let node = NodeId::new(7);
        assert_eq!(node.index(), 7);
        assert_eq!(format!("{:?}", node), "NodeId(7)");
        assert_eq!(node.to_string(), "n7");
        assert!(NodeId::new(1) < NodeId::new(2));
    }
}

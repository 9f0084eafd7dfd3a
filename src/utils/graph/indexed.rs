//! Indexed graph wrapper for domain-typed nodes.
//!
//! [`IndexedGraph`] wraps a [`DirectedGraph`] and maintains the mapping between domain keys and
//! [`NodeId`]s, so callers can add edges between keys and map algorithm results back to keys.
//!
//! # Examples
//!
//! ```rust
//! use shaker::utils::graph::IndexedGraph;
//!
//! let mut graph: IndexedGraph<&str, ()> = IndexedGraph::new();
//! graph.add_edge("root", "A", ())?;
//! graph.add_edge("A", "B", ())?;
//!
//! assert_eq!(graph.shortest_path(&"root", &"B"), Some(vec!["root", "A", "B"]));
//! # Ok::<(), shaker::Error>(())
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use crate::{
    utils::graph::{algorithms, DirectedGraph, GraphBase, NodeId},
    Result,
};

/// A graph whose nodes are identified by keys of type `K`, with edge payloads `E`.
///
/// Adding a node is idempotent and adding an edge between two keys creates missing nodes.
/// Parallel edges with equal payloads are stored once.
#[derive(Debug, Clone)]
pub struct IndexedGraph<K, E>
where
    K: Hash + Eq + Clone,
{
    graph: DirectedGraph<K, E>,
    key_to_node: HashMap<K, NodeId>,
}

impl<K, E> Default for IndexedGraph<K, E>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, E> IndexedGraph<K, E>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty graph
    #[must_use]
    pub fn new() -> Self {
        IndexedGraph {
            graph: DirectedGraph::new(),
            key_to_node: HashMap::new(),
        }
    }

    /// Adds a node for `key`, returning the existing id if the key is already present
    pub fn add_node(&mut self, key: K) -> NodeId {
        if let Some(&id) = self.key_to_node.get(&key) {
            return id;
        }
        let id = self.graph.add_node(key.clone());
        self.key_to_node.insert(key, id);
        id
    }

    /// Adds an edge between two keys, creating missing nodes.
    ///
    /// Returns `false` if an edge with the same endpoints and payload already exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if the underlying graph rejects the edge.
    pub fn add_edge(&mut self, source: K, target: K, data: E) -> Result<bool>
    where
        E: PartialEq,
    {
        let source = self.add_node(source);
        let target = self.add_node(target);
        let duplicate = self
            .graph
            .outgoing_edges(source)
            .any(|(_, existing, payload)| existing == target && *payload == data);
        if duplicate {
            return Ok(false);
        }
        self.graph.add_edge(source, target, data)?;
        Ok(true)
    }

    /// Node id of a key
    #[must_use]
    pub fn get_node_id(&self, key: &K) -> Option<NodeId> {
        self.key_to_node.get(key).copied()
    }

    /// Key of a node id
    #[must_use]
    pub fn get_key(&self, id: NodeId) -> Option<&K> {
        self.graph.node(id)
    }

    /// Returns true if `key` has a node
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.key_to_node.contains_key(key)
    }

    /// The underlying graph
    #[must_use]
    pub fn inner(&self) -> &DirectedGraph<K, E> {
        &self.graph
    }

    /// All keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.graph.node_ids().filter_map(|id| self.graph.node(id))
    }

    /// Edges leaving `key` as target keys and payloads
    pub fn edges_from(&self, key: &K) -> Vec<(&K, &E)> {
        let Some(id) = self.get_node_id(key) else {
            return Vec::new();
        };
        self.graph
            .outgoing_edges(id)
            .filter_map(|(_, target, data)| self.graph.node(target).map(|key| (key, data)))
            .collect()
    }

    /// Edges entering `key` as source keys and payloads
    pub fn edges_to(&self, key: &K) -> Vec<(&K, &E)> {
        let Some(id) = self.get_node_id(key) else {
            return Vec::new();
        };
        self.graph
            .incoming_edges(id)
            .filter_map(|(_, source, data)| self.graph.node(source).map(|key| (key, data)))
            .collect()
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true if the graph has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Maps node ids back to keys, skipping unknown ids
    #[must_use]
    pub fn map_nodes_to_keys(&self, nodes: &[NodeId]) -> Vec<K> {
        nodes
            .iter()
            .filter_map(|id| self.graph.node(*id).cloned())
            .collect()
    }

    /// Keys reachable from `start` in breadth-first order, `start` included
    #[must_use]
    pub fn reachable_from(&self, start: &K) -> Vec<K> {
        match self.get_node_id(start) {
            Some(id) => {
                let order: Vec<NodeId> = algorithms::bfs(&self.graph, id).collect();
                self.map_nodes_to_keys(&order)
            }
            None => Vec::new(),
        }
    }

    /// A shortest path of keys from `start` to `target`, both included.
    #[must_use]
    pub fn shortest_path(&self, start: &K, target: &K) -> Option<Vec<K>> {
        let start = self.get_node_id(start)?;
        let target = self.get_node_id(target)?;
        let path = algorithms::shortest_path(&self.graph, &[start], target)?;
        Some(self.map_nodes_to_keys(&path))
    }

    /// A shortest path to `target` starting at whichever of `starts` is closest.
    #[must_use]
    pub fn shortest_path_from_any<'k>(
        &self,
        starts: impl IntoIterator<Item = &'k K>,
        target: &K,
    ) -> Option<Vec<K>>
    where
        K: 'k,
    {
        let starts: Vec<NodeId> = starts
            .into_iter()
            .filter_map(|key| self.get_node_id(key))
            .collect();
        let target = self.get_node_id(target)?;
        let path = algorithms::shortest_path(&self.graph, &starts, target)?;
        Some(self.map_nodes_to_keys(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_graph_basic() {
        let mut graph: IndexedGraph<&str, ()> = IndexedGraph::new();

        let a = graph.add_node("A");
        let b = graph.add_node("B");

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.get_node_id(&"A"), Some(a));
        assert_eq!(graph.get_key(b), Some(&"B"));
        assert_eq!(graph.add_node("A"), a);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_indexed_graph_add_edge() {
        let mut graph: IndexedGraph<&str, i32> = IndexedGraph::new();

        assert!(graph.add_edge("A", "B", 10).unwrap());
        assert!(graph.add_edge("B", "C", 20).unwrap());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        assert!(!graph.add_edge("A", "B", 10).unwrap());
        assert!(graph.add_edge("A", "B", 11).unwrap());
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edges_from(&"A").len(), 2);
        assert_eq!(graph.edges_to(&"C"), vec![(&"B", &20)]);
    }

    #[test]
    fn test_indexed_graph_shortest_path() {
        let mut graph: IndexedGraph<&str, ()> = IndexedGraph::new();

        // root -> A -> B -> D and root -> C -> D
        graph.add_edge("root", "A", ()).unwrap();
        graph.add_edge("A", "B", ()).unwrap();
        graph.add_edge("B", "D", ()).unwrap();
        graph.add_edge("root", "C", ()).unwrap();
        graph.add_edge("C", "D", ()).unwrap();
        graph.add_node("isolated");

        assert_eq!(
            graph.shortest_path(&"root", &"D"),
            Some(vec!["root", "C", "D"])
        );
        assert_eq!(graph.shortest_path(&"root", &"isolated"), None);
        assert_eq!(graph.shortest_path(&"root", &"unknown"), None);
        assert_eq!(
            graph.shortest_path_from_any([&"B", &"C"], &"D"),
            Some(vec!["B", "D"])
        );
        assert_eq!(graph.reachable_from(&"C"), vec!["C", "D"]);
    }
}

//! Graph traversal algorithms.
//!
//! # Algorithms
//!
//! - [`bfs`] - Lazy breadth-first search from a single node
//! - [`shortest_path`] - Unweighted shortest path from a set of start nodes
//! - [`reachable_backwards`] - Every node that can reach a given node

use std::collections::VecDeque;

use crate::utils::graph::{NodeId, Predecessors, Successors};

/// Breadth-first search iterator over graph nodes.
///
/// Visits every node reachable from the start exactly once, in order of increasing distance.
pub struct BfsIterator<'g, G: Successors> {
    graph: &'g G,
    queue: VecDeque<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> BfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return BfsIterator {
                graph,
                queue: VecDeque::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;
        BfsIterator {
            graph,
            queue: VecDeque::from([start]),
            visited,
        }
    }
}

impl<G: Successors> Iterator for BfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        for succ in self.graph.successors(node) {
            if !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.queue.push_back(succ);
            }
        }
        Some(node)
    }
}

/// Returns a breadth-first search iterator starting from `start`.
///
/// An unknown start node yields nothing.
///
/// # Examples
///
/// ```rust
/// use shaker::utils::graph::{algorithms::bfs, DirectedGraph, NodeId};
///
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let a = graph.add_node("A");
/// let b = graph.add_node("B");
/// let c = graph.add_node("C");
/// graph.add_edge(a, b, ())?;
/// graph.add_edge(b, c, ())?;
///
/// let order: Vec<NodeId> = bfs(&graph, a).collect();
/// assert_eq!(order, vec![a, b, c]);
/// # Ok::<(), shaker::Error>(())
/// ```
pub fn bfs<G: Successors>(graph: &G, start: NodeId) -> BfsIterator<'_, G> {
    BfsIterator::new(graph, start)
}

/// Computes a shortest path from any of `starts` to `target`.
///
/// Runs a multi-source breadth-first search recording the predecessor of every discovered node,
/// then walks the predecessors back from `target`. Ties are broken by the order of `starts` and
/// of each node's successors, so the result is deterministic for a given graph.
///
/// # Arguments
///
/// * `graph` - The graph to search
/// * `starts` - Nodes at distance zero
/// * `target` - The node to reach
///
/// # Returns
///
/// The path including both endpoints, or `None` if `target` is unreachable.
#[must_use]
pub fn shortest_path<G: Successors>(graph: &G, starts: &[NodeId], target: NodeId) -> Option<Vec<NodeId>> {
    let node_count = graph.node_count();
    if target.index() >= node_count {
        return None;
    }

    let mut parent: Vec<Option<NodeId>> = vec![None; node_count];
    let mut visited = vec![false; node_count];
    let mut queue = VecDeque::new();
    for &start in starts {
        if start.index() < node_count && !visited[start.index()] {
            visited[start.index()] = true;
            queue.push_back(start);
        }
    }

    while let Some(node) = queue.pop_front() {
        if node == target {
            let mut path = vec![node];
            let mut current = node;
            while let Some(previous) = parent[current.index()] {
                path.push(previous);
                current = previous;
            }
            path.reverse();
            return Some(path);
        }
        for succ in graph.successors(node) {
            if !visited[succ.index()] {
                visited[succ.index()] = true;
                parent[succ.index()] = Some(node);
                queue.push_back(succ);
            }
        }
    }
    None
}

/// Returns every node from which `target` is reachable, `target` included.
#[must_use]
pub fn reachable_backwards<G: Predecessors>(graph: &G, target: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if target.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    visited[target.index()] = true;
    let mut order = vec![target];
    let mut index = 0;
    while index < order.len() {
        let node = order[index];
        index += 1;
        for pred in graph.predecessors(node) {
            if !visited[pred.index()] {
                visited[pred.index()] = true;
                order.push(pred);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::DirectedGraph;

    fn diamond() -> (DirectedGraph<char, ()>, [NodeId; 5]) {
        let mut graph = DirectedGraph::new();
        let a = graph.add_node('A');
        let b = graph.add_node('B');
        let c = graph.add_node('C');
        let d = graph.add_node('D');
        let e = graph.add_node('E');
        graph.add_edge(a, b, ()).unwrap();
        graph.add_edge(a, c, ()).unwrap();
        graph.add_edge(b, d, ()).unwrap();
        graph.add_edge(c, d, ()).unwrap();
        graph.add_edge(d, a, ()).unwrap();
        (graph, [a, b, c, d, e])
    }

    #[test]
    fn test_bfs_visits_by_distance() {
        let (graph, [a, b, c, d, _]) = diamond();
        let order: Vec<NodeId> = bfs(&graph, a).collect();
        assert_eq!(order, vec![a, b, c, d]);
        assert_eq!(bfs(&graph, NodeId::new(99)).count(), 0);
    }

    #[test]
    fn test_shortest_path() {
        let (graph, [a, b, c, d, e]) = diamond();
        assert_eq!(shortest_path(&graph, &[a], d), Some(vec![a, b, d]));
        assert_eq!(shortest_path(&graph, &[c, a], d), Some(vec![c, d]));
        assert_eq!(shortest_path(&graph, &[a], a), Some(vec![a]));
        assert_eq!(shortest_path(&graph, &[a], e), None);
        assert_eq!(shortest_path(&graph, &[], d), None);
    }

    #[test]
    fn test_reachable_backwards() {
        let (graph, [a, b, c, d, e]) = diamond();
        let mut reaching = reachable_backwards(&graph, b);
        reaching.sort();
        assert_eq!(reaching, vec![a, b, c, d]);
        assert_eq!(reachable_backwards(&graph, e), vec![e]);
    }
}

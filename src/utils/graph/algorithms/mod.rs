//! Graph algorithms over the [`Successors`](crate::utils::graph::Successors) and
//! [`Predecessors`](crate::utils::graph::Predecessors) traits.
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | [`bfs`] | O(V + E) | Reachability in distance order |
//! | [`shortest_path`] | O(V + E) | Explaining why an item is retained |
//! | [`reachable_backwards`] | O(V + E) | Every retention source of an item |

mod traversal;

pub use traversal::{bfs, reachable_backwards, shortest_path, BfsIterator};

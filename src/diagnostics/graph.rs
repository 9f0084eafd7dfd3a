//! Retention edges reported while tracing, and path queries over them.
//!
//! The enqueuer reports one edge per discovered retention fact to an attached
//! [`KeptGraphConsumer`]. Without a consumer nothing is recorded. [`CollectingGraphConsumer`]
//! accumulates the edges into a [`KeptGraph`], which answers "why is this item kept" by a
//! breadth-first search from the roots.

use std::fmt::{self, Write as _};

use crate::{
    program::{Program, Token},
    rules::RuleId,
    utils::{graph::IndexedGraph, DotWriter},
    Result,
};

/// A node of the retention graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphNode {
    /// Implicit roots: disabled shrinking, main-dex roots
    Root,
    /// A keep rule
    Rule(RuleId),
    /// A class, method or field
    Item(Token),
}

impl GraphNode {
    /// Returns true for nodes a retention path may start at
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, GraphNode::Root | GraphNode::Rule(_))
    }

    /// Renders the node with item descriptors resolved against `program`
    #[must_use]
    pub fn describe(&self, program: &Program) -> String {
        match self {
            GraphNode::Root => "<root>".to_string(),
            GraphNode::Rule(id) => id.to_string(),
            GraphNode::Item(token) => program.descriptor(*token),
        }
    }
}

/// Kind of a retention edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
pub enum EdgeKind {
    /// Matched by a keep rule
    KeepRule,
    /// Matched by the consequence of a satisfied conditional rule
    ConditionalKeepRule,
    /// Kept because shrinking is disabled or because it is a main-dex root
    ImplicitRoot,
    /// Invoked from a live method
    InvokedFrom,
    /// Invoked through a super call from a live method
    InvokedViaSuper,
    /// Runs when a live virtual call dispatches on an instantiated type
    DispatchTarget,
    /// Allocated in a live method
    InstantiatedIn,
    /// Interface implemented by a lambda created in a live method
    InstantiatedViaLambda,
    /// Referenced by a live method
    ReferencedFrom,
    /// Referenced by an annotation on a live item
    ReferencedInAnnotation,
    /// Supertype of a live type
    SupertypeOf,
    /// Declares a live member
    HolderOf,
    /// Initializer of an initialized class
    ClassInitializer,
    /// Overrides a library method on an instantiated class
    LibraryMethodOverride,
    /// Looked up reflectively from a live method
    ReflectiveUse,
    /// Targeted by a constant method handle or lambda
    MethodHandle,
    /// Catch type of an exception guard in a live method
    CatchType,
}

/// Receiver of retention edges.
///
/// Implementations must tolerate repeated edges; the enqueuer reports an edge every time a
/// fact is derived, not only the first time. Targets are always items the pass marked.
pub trait KeptGraphConsumer: Send {
    /// Records that `target` is retained because of `source`
    fn accept_edge(&mut self, source: GraphNode, target: GraphNode, kind: EdgeKind);

    /// Hands over the collected graph once the pass is done, if the consumer keeps one
    fn finish(self: Box<Self>) -> Option<KeptGraph> {
        None
    }
}

/// Retention graph collected during a pass.
#[derive(Debug, Clone, Default)]
pub struct KeptGraph {
    graph: IndexedGraph<GraphNode, EdgeKind>,
}

impl KeptGraph {
    /// Creates an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge, returning false if it was already present.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if the underlying graph rejects the edge.
    pub fn add_edge(&mut self, source: GraphNode, target: GraphNode, kind: EdgeKind) -> Result<bool> {
        self.graph.add_edge(source, target, kind)
    }

    /// Returns true if `node` has been recorded
    #[must_use]
    pub fn contains(&self, node: &GraphNode) -> bool {
        self.graph.contains(node)
    }

    /// Number of distinct nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct reasons for `node`: every source with the kind of its edge
    #[must_use]
    pub fn reasons_for(&self, node: &GraphNode) -> Vec<(GraphNode, EdgeKind)> {
        let mut reasons: Vec<(GraphNode, EdgeKind)> = self
            .graph
            .edges_to(node)
            .into_iter()
            .map(|(source, kind)| (*source, *kind))
            .collect();
        reasons.sort();
        reasons
    }

    /// Shortest retention path from any root or rule to `target`.
    ///
    /// Returns `None` if the target was never reached by a recorded edge.
    #[must_use]
    pub fn why_are_you_keeping(&self, target: GraphNode) -> Option<KeepPath> {
        let roots: Vec<&GraphNode> = self.graph.keys().filter(|node| node.is_root()).collect();
        let nodes = self.graph.shortest_path_from_any(roots, &target)?;

        let mut edges = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            let kind = self
                .graph
                .edges_from(&pair[0])
                .into_iter()
                .filter(|(next, _)| **next == pair[1])
                .map(|(_, kind)| *kind)
                .min()?;
            edges.push(kind);
        }
        Some(KeepPath { nodes, edges })
    }

    /// Renders the graph in Graphviz DOT format; roots are drawn with a double border.
    #[must_use]
    pub fn to_dot(&self, program: &Program) -> String {
        let mut writer = DotWriter::new("kept");
        for node in self.graph.keys() {
            if let Some(id) = self.graph.get_node_id(node) {
                writer.node(id.index(), &node.describe(program), node.is_root());
            }
        }
        for node in self.graph.keys() {
            let Some(source) = self.graph.get_node_id(node) else {
                continue;
            };
            for (target, kind) in self.graph.edges_from(node) {
                if let Some(target) = self.graph.get_node_id(target) {
                    writer.edge(source.index(), target.index(), &kind.to_string());
                }
            }
        }
        writer.finish()
    }
}

/// A retention path: a root, then each retained node with the edge that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepPath {
    /// Nodes from the root to the queried item
    pub nodes: Vec<GraphNode>,
    /// `edges[i]` connects `nodes[i]` to `nodes[i + 1]`
    pub edges: Vec<EdgeKind>,
}

impl KeepPath {
    /// The root the path starts at
    #[must_use]
    pub fn root(&self) -> Option<&GraphNode> {
        self.nodes.first()
    }

    /// Number of edges on the path
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns true for a path consisting of the root only
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Renders the path one step per line, the queried item first
    #[must_use]
    pub fn render(&self, program: &Program) -> String {
        let mut out = String::new();
        for (index, node) in self.nodes.iter().enumerate().rev() {
            let _ = write!(out, "{}", node.describe(program));
            if index > 0 {
                let _ = write!(out, "\n  <- {} <- ", self.edges[index - 1]);
            }
        }
        out
    }
}

impl fmt::Display for KeepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, node) in self.nodes.iter().enumerate() {
            if index > 0 {
                write!(f, " -[{}]-> ", self.edges[index - 1])?;
            }
            match node {
                GraphNode::Root => write!(f, "<root>")?,
                GraphNode::Rule(id) => write!(f, "{}", id)?,
                GraphNode::Item(token) => write!(f, "{}", token)?,
            }
        }
        Ok(())
    }
}

/// Consumer that stores every edge into a [`KeptGraph`].
#[derive(Debug, Default)]
pub struct CollectingGraphConsumer {
    graph: KeptGraph,
}

impl CollectingGraphConsumer {
    /// Creates an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The edges collected so far
    #[must_use]
    pub fn graph(&self) -> &KeptGraph {
        &self.graph
    }
}

impl KeptGraphConsumer for CollectingGraphConsumer {
    fn accept_edge(&mut self, source: GraphNode, target: GraphNode, kind: EdgeKind) {
        if let Err(error) = self.graph.add_edge(source, target, kind) {
            log::warn!("dropping retention edge: {}", error);
        }
    }

    fn finish(self: Box<Self>) -> Option<KeptGraph> {
        Some(self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize) -> GraphNode {
        GraphNode::Item(Token::method(index))
    }

    #[test]
    fn test_why_are_you_keeping_prefers_shortest_path() {
        let mut consumer = CollectingGraphConsumer::new();
        let rule = GraphNode::Rule(RuleId::new(0));
        consumer.accept_edge(rule, item(0), EdgeKind::KeepRule);
        consumer.accept_edge(item(0), item(1), EdgeKind::InvokedFrom);
        consumer.accept_edge(item(1), item(2), EdgeKind::InvokedFrom);
        consumer.accept_edge(GraphNode::Root, item(2), EdgeKind::ImplicitRoot);
        consumer.accept_edge(item(0), item(1), EdgeKind::InvokedFrom);

        let graph = Box::new(consumer).finish().unwrap();
        assert_eq!(graph.edge_count(), 4);

        let path = graph.why_are_you_keeping(item(1)).unwrap();
        assert_eq!(path.nodes, vec![rule, item(0), item(1)]);
        assert_eq!(path.edges, vec![EdgeKind::KeepRule, EdgeKind::InvokedFrom]);
        assert_eq!(path.root(), Some(&rule));

        let path = graph.why_are_you_keeping(item(2)).unwrap();
        assert_eq!(path.nodes, vec![GraphNode::Root, item(2)]);
        assert_eq!(path.len(), 1);

        assert!(graph.why_are_you_keeping(item(9)).is_none());
        assert_eq!(
            graph.reasons_for(&item(2)),
            vec![
                (GraphNode::Root, EdgeKind::ImplicitRoot),
                (item(1), EdgeKind::InvokedFrom)
            ]
        );
    }

    #[test]
    fn test_unrooted_items_have_no_path() {
        let mut graph = KeptGraph::new();
        graph.add_edge(item(0), item(1), EdgeKind::InvokedFrom).unwrap();
        assert!(graph.contains(&item(1)));
        assert!(graph.why_are_you_keeping(item(1)).is_none());
    }

    #[test]
    fn test_dot_marks_roots() {
        let program = crate::test::virtual_call_program();
        let main = program.class_by_name("app.A").unwrap().token;
        let mut graph = KeptGraph::new();
        graph
            .add_edge(GraphNode::Rule(RuleId::new(0)), GraphNode::Item(main), EdgeKind::KeepRule)
            .unwrap();

        let dot = graph.to_dot(&program);
        assert!(dot.starts_with("digraph kept {"));
        assert_eq!(dot.matches("peripheries=2").count(), 1);
        assert!(dot.contains("app.A"));
        assert_eq!(dot.matches(" -> ").count(), 1);
    }
}

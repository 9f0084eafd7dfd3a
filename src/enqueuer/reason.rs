//! Why an action was enqueued.

use crate::{
    diagnostics::{EdgeKind, GraphNode},
    program::Token,
    rules::RuleId,
};

/// Why an item was marked.
///
/// Reasons only feed diagnostics; they never influence what is live. Each reason maps to one
/// retention edge: [`KeepReason::source`] to the item being marked, labelled
/// [`KeepReason::edge_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    /// Matched by a keep rule
    KeepRule(RuleId),
    /// Matched by the materialized consequence of a conditional rule
    ConditionalRule(RuleId),
    /// Root without a rule: disabled shrinking
    ImplicitRoot,
    /// Invoked from the given method
    InvokedFrom(Token),
    /// Invoked through a super call from the given method
    InvokedViaSuper(Token),
    /// Dispatch target of a live virtual call to the given resolved method
    DispatchTarget(Token),
    /// Allocated in the given method
    InstantiatedIn(Token),
    /// Lambda interface of a call site in the given method
    InstantiatedViaLambda(Token),
    /// Referenced from the given item
    ReferencedFrom(Token),
    /// Referenced by an annotation on the given item
    ReferencedInAnnotation(Token),
    /// Supertype of the given live type
    SupertypeOf(Token),
    /// Declares the given live member
    HolderOf(Token),
    /// Initializer of the given class
    ClassInitializer(Token),
    /// Overrides a library method on the given instantiated class
    LibraryMethodOverride(Token),
    /// Looked up reflectively from the given method
    ReflectiveUse(Token),
    /// Target of a method handle in the given method
    MethodHandle(Token),
    /// Catch type of a guard in the given method
    CatchType(Token),
}

impl KeepReason {
    /// Kind of the retention edge this reason stands for
    #[must_use]
    pub fn edge_kind(&self) -> EdgeKind {
        match self {
            KeepReason::KeepRule(_) => EdgeKind::KeepRule,
            KeepReason::ConditionalRule(_) => EdgeKind::ConditionalKeepRule,
            KeepReason::ImplicitRoot => EdgeKind::ImplicitRoot,
            KeepReason::InvokedFrom(_) => EdgeKind::InvokedFrom,
            KeepReason::InvokedViaSuper(_) => EdgeKind::InvokedViaSuper,
            KeepReason::DispatchTarget(_) => EdgeKind::DispatchTarget,
            KeepReason::InstantiatedIn(_) => EdgeKind::InstantiatedIn,
            KeepReason::InstantiatedViaLambda(_) => EdgeKind::InstantiatedViaLambda,
            KeepReason::ReferencedFrom(_) => EdgeKind::ReferencedFrom,
            KeepReason::ReferencedInAnnotation(_) => EdgeKind::ReferencedInAnnotation,
            KeepReason::SupertypeOf(_) => EdgeKind::SupertypeOf,
            KeepReason::HolderOf(_) => EdgeKind::HolderOf,
            KeepReason::ClassInitializer(_) => EdgeKind::ClassInitializer,
            KeepReason::LibraryMethodOverride(_) => EdgeKind::LibraryMethodOverride,
            KeepReason::ReflectiveUse(_) => EdgeKind::ReflectiveUse,
            KeepReason::MethodHandle(_) => EdgeKind::MethodHandle,
            KeepReason::CatchType(_) => EdgeKind::CatchType,
        }
    }

    /// Node the retention edge starts at
    #[must_use]
    pub fn source(&self) -> GraphNode {
        match *self {
            KeepReason::KeepRule(rule) | KeepReason::ConditionalRule(rule) => GraphNode::Rule(rule),
            KeepReason::ImplicitRoot => GraphNode::Root,
            KeepReason::InvokedFrom(item)
            | KeepReason::InvokedViaSuper(item)
            | KeepReason::DispatchTarget(item)
            | KeepReason::InstantiatedIn(item)
            | KeepReason::InstantiatedViaLambda(item)
            | KeepReason::ReferencedFrom(item)
            | KeepReason::ReferencedInAnnotation(item)
            | KeepReason::SupertypeOf(item)
            | KeepReason::HolderOf(item)
            | KeepReason::ClassInitializer(item)
            | KeepReason::LibraryMethodOverride(item)
            | KeepReason::ReflectiveUse(item)
            | KeepReason::MethodHandle(item)
            | KeepReason::CatchType(item) => GraphNode::Item(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_reasons_start_at_rule_nodes() {
        let rule = RuleId::new(3);
        assert_eq!(KeepReason::KeepRule(rule).source(), GraphNode::Rule(rule));
        assert_eq!(
            KeepReason::ConditionalRule(rule).edge_kind(),
            EdgeKind::ConditionalKeepRule
        );
        assert!(KeepReason::ImplicitRoot.source().is_root());
        assert!(!KeepReason::InvokedFrom(Token::method(0)).source().is_root());
    }
}

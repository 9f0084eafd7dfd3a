//! Work items of the enqueuer.

use crate::{
    enqueuer::KeepReason,
    program::{
        AnnotatedItem, CallSite, FieldAccessKind, FieldRef, InvokeKind, MethodHandle, MethodRef,
        Receiver, Symbol, Token,
    },
};

/// A unit of work for the fixpoint driver.
///
/// `Mark*` actions add an item to a mark set and derive its consequences. `Trace*` actions
/// interpret one reference found in a live method or annotation. Actions are created when a
/// new edge is discovered and consumed exactly once.
#[derive(Debug, Clone, PartialEq, strum::IntoStaticStr)]
pub enum EnqueuerAction {
    /// The type must exist in the output
    MarkTypeLive {
        /// The type
        ty: Token,
        /// Why
        reason: KeepReason,
    },
    /// Instances of the type may exist at runtime
    MarkTypeInstantiated {
        /// The type
        ty: Token,
        /// Why
        reason: KeepReason,
    },
    /// A lambda implementing the interface may exist at runtime
    MarkInterfaceInstantiatedViaLambda {
        /// The functional interface
        interface: Token,
        /// Why
        reason: KeepReason,
    },
    /// The static initializer of the type may run
    MarkClassInitialized {
        /// The type
        ty: Token,
        /// Why
        reason: KeepReason,
    },
    /// The method is the resolution target of a live reference
    MarkMethodTargeted {
        /// The method
        method: Token,
        /// Why
        reason: KeepReason,
    },
    /// The method body may execute
    MarkMethodLive {
        /// The method
        method: Token,
        /// Why
        reason: KeepReason,
    },
    /// The field is pinned and must be kept with all its accesses
    MarkFieldKept {
        /// The field
        field: Token,
        /// Why
        reason: KeepReason,
    },
    /// An invocation in a live method
    TraceInvoke {
        /// Invocation kind
        kind: InvokeKind,
        /// Referenced method
        method: MethodRef,
        /// Receiver bounds if known
        receiver: Option<Receiver>,
        /// The invoking item
        context: Token,
        /// Invoked through a method handle rather than an invoke instruction
        via_handle: bool,
    },
    /// A field access in a live method, annotation or handle
    TraceFieldAccess {
        /// Referenced field
        field: FieldRef,
        /// Kind of access
        kind: FieldAccessKind,
        /// The accessing item
        context: Token,
        /// Allocated type of a stored value, if known
        value: Option<Symbol>,
        /// Index of the accessing instruction, if the access is an instruction
        site: Option<usize>,
        /// Replayed from deferral, or otherwise excluded from deferral
        replay: bool,
    },
    /// An allocation
    TraceNewInstance {
        /// Allocated class
        ty: Symbol,
        /// The allocating method
        context: Token,
    },
    /// A type mentioned by an instruction, annotation or guard
    TraceTypeReference {
        /// The type descriptor, possibly an array type
        ty: Symbol,
        /// Why the type is referenced
        reason: KeepReason,
    },
    /// An explicit class initialization
    TraceInitClass {
        /// The class
        ty: Symbol,
        /// The initializing method
        context: Token,
    },
    /// A lambda creation
    TraceCallSite {
        /// The call site
        call_site: CallSite,
        /// The creating method
        context: Token,
    },
    /// A constant method handle
    TraceMethodHandle {
        /// The handle
        handle: MethodHandle,
        /// The method containing the constant
        context: Token,
    },
    /// A reflective class lookup
    TraceReflectiveClass {
        /// The looked up class
        ty: Symbol,
        /// The looking up method
        context: Token,
    },
    /// A reflective field lookup
    TraceReflectiveField {
        /// The looked up field
        field: FieldRef,
        /// The looking up method
        context: Token,
    },
    /// A reflective method lookup
    TraceReflectiveMethod {
        /// The looked up method
        method: MethodRef,
        /// The looking up method
        context: Token,
    },
    /// The annotations of a live item or parameter
    TraceAnnotations {
        /// The annotated location
        item: AnnotatedItem,
    },
}

/// Discriminant of an [`EnqueuerAction`], used to count processed actions per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, strum::EnumCount)]
pub enum ActionKind {
    /// See [`EnqueuerAction::MarkTypeLive`]
    MarkTypeLive,
    /// See [`EnqueuerAction::MarkTypeInstantiated`]
    MarkTypeInstantiated,
    /// See [`EnqueuerAction::MarkInterfaceInstantiatedViaLambda`]
    MarkInterfaceInstantiatedViaLambda,
    /// See [`EnqueuerAction::MarkClassInitialized`]
    MarkClassInitialized,
    /// See [`EnqueuerAction::MarkMethodTargeted`]
    MarkMethodTargeted,
    /// See [`EnqueuerAction::MarkMethodLive`]
    MarkMethodLive,
    /// See [`EnqueuerAction::MarkFieldKept`]
    MarkFieldKept,
    /// See [`EnqueuerAction::TraceInvoke`]
    TraceInvoke,
    /// See [`EnqueuerAction::TraceFieldAccess`]
    TraceFieldAccess,
    /// See [`EnqueuerAction::TraceNewInstance`]
    TraceNewInstance,
    /// See [`EnqueuerAction::TraceTypeReference`]
    TraceTypeReference,
    /// See [`EnqueuerAction::TraceInitClass`]
    TraceInitClass,
    /// See [`EnqueuerAction::TraceCallSite`]
    TraceCallSite,
    /// See [`EnqueuerAction::TraceMethodHandle`]
    TraceMethodHandle,
    /// See [`EnqueuerAction::TraceReflectiveClass`]
    TraceReflectiveClass,
    /// See [`EnqueuerAction::TraceReflectiveField`]
    TraceReflectiveField,
    /// See [`EnqueuerAction::TraceReflectiveMethod`]
    TraceReflectiveMethod,
    /// See [`EnqueuerAction::TraceAnnotations`]
    TraceAnnotations,
}

impl EnqueuerAction {
    /// Kind of this action
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            EnqueuerAction::MarkTypeLive { .. } => ActionKind::MarkTypeLive,
            EnqueuerAction::MarkTypeInstantiated { .. } => ActionKind::MarkTypeInstantiated,
            EnqueuerAction::MarkInterfaceInstantiatedViaLambda { .. } => {
                ActionKind::MarkInterfaceInstantiatedViaLambda
            }
            EnqueuerAction::MarkClassInitialized { .. } => ActionKind::MarkClassInitialized,
            EnqueuerAction::MarkMethodTargeted { .. } => ActionKind::MarkMethodTargeted,
            EnqueuerAction::MarkMethodLive { .. } => ActionKind::MarkMethodLive,
            EnqueuerAction::MarkFieldKept { .. } => ActionKind::MarkFieldKept,
            EnqueuerAction::TraceInvoke { .. } => ActionKind::TraceInvoke,
            EnqueuerAction::TraceFieldAccess { .. } => ActionKind::TraceFieldAccess,
            EnqueuerAction::TraceNewInstance { .. } => ActionKind::TraceNewInstance,
            EnqueuerAction::TraceTypeReference { .. } => ActionKind::TraceTypeReference,
            EnqueuerAction::TraceInitClass { .. } => ActionKind::TraceInitClass,
            EnqueuerAction::TraceCallSite { .. } => ActionKind::TraceCallSite,
            EnqueuerAction::TraceMethodHandle { .. } => ActionKind::TraceMethodHandle,
            EnqueuerAction::TraceReflectiveClass { .. } => ActionKind::TraceReflectiveClass,
            EnqueuerAction::TraceReflectiveField { .. } => ActionKind::TraceReflectiveField,
            EnqueuerAction::TraceReflectiveMethod { .. } => ActionKind::TraceReflectiveMethod,
            EnqueuerAction::TraceAnnotations { .. } => ActionKind::TraceAnnotations,
        }
    }

    /// Name of the action variant, for tracing
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use strum::EnumCount;

    use super::*;

    #[test]
    fn test_kind_and_name() {
        let action = EnqueuerAction::MarkMethodLive {
            method: Token::method(0),
            reason: KeepReason::ImplicitRoot,
        };
        assert_eq!(action.kind(), ActionKind::MarkMethodLive);
        assert_eq!(action.name(), "MarkMethodLive");
        assert_eq!(ActionKind::COUNT, 18);
    }
}

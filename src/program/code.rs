//! Method bodies as seen by the reachability analysis.
//!
//! A [`Code`] body is a flat list of [`Insn`] plus the catch types of its exception guards.
//! Only instructions that reference other program items are modelled; everything else is an
//! opaque [`Insn::Other`]. Bodies are consumed through the [`UseRegistry`] visitor, which
//! receives one callback per reference in instruction order.
//!
//! # Key Components
//!
//! - [`Insn`] - A single instruction referencing types, methods or fields
//! - [`MethodRef`] / [`FieldRef`] - Unresolved symbolic member references
//! - [`CallSite`] / [`MethodHandle`] - Dynamically linked call sites and constant handles
//! - [`UseRegistry`] - Visitor receiving every reference of a body
//! - [`CodeRewrite`] - Instruction replacement produced between passes

use crate::program::Symbol;

/// Symbolic reference to a method: holder type, name and prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodRef {
    /// Type the reference is made against
    pub holder: Symbol,
    /// Method name
    pub name: Symbol,
    /// Method prototype, e.g. `(int)void`
    pub proto: Symbol,
}

/// Symbolic reference to a field: holder type, name and field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldRef {
    /// Type the reference is made against
    pub holder: Symbol,
    /// Field name
    pub name: Symbol,
    /// Declared field type
    pub ty: Symbol,
}

/// Invocation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum InvokeKind {
    /// Virtual dispatch on a class receiver
    Virtual,
    /// Virtual dispatch on an interface receiver
    Interface,
    /// Non-virtual call of the super implementation
    Super,
    /// Non-virtual call of a private method or an initializer
    Direct,
    /// Static call
    Static,
}

impl InvokeKind {
    /// Returns true if the kind dispatches on the runtime type of the receiver
    #[must_use]
    pub fn is_virtual_dispatch(self) -> bool {
        matches!(self, InvokeKind::Virtual | InvokeKind::Interface)
    }
}

/// Statically known bounds of an invocation receiver.
///
/// `ty` is the refined upper bound of the receiver. When `exact` is set the lower bound equals
/// the upper bound, i.e. the receiver is known to be exactly `ty` (freshly allocated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Receiver {
    /// Refined upper bound of the receiver type
    pub ty: Symbol,
    /// Whether the receiver is known to be exactly `ty`
    pub exact: bool,
}

/// The four kinds of field accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum FieldAccessKind {
    /// Instance field read
    InstanceRead,
    /// Instance field write
    InstanceWrite,
    /// Static field read
    StaticRead,
    /// Static field write
    StaticWrite,
}

impl FieldAccessKind {
    /// Returns the access kind for a read or write of a static or instance field
    #[must_use]
    pub fn new(is_static: bool, is_write: bool) -> Self {
        match (is_static, is_write) {
            (false, false) => FieldAccessKind::InstanceRead,
            (false, true) => FieldAccessKind::InstanceWrite,
            (true, false) => FieldAccessKind::StaticRead,
            (true, true) => FieldAccessKind::StaticWrite,
        }
    }

    /// Returns true for reads
    #[must_use]
    pub fn is_read(self) -> bool {
        matches!(
            self,
            FieldAccessKind::InstanceRead | FieldAccessKind::StaticRead
        )
    }

    /// Returns true for writes
    #[must_use]
    pub fn is_write(self) -> bool {
        !self.is_read()
    }

    /// Returns true for static accesses
    #[must_use]
    pub fn is_static(self) -> bool {
        matches!(
            self,
            FieldAccessKind::StaticRead | FieldAccessKind::StaticWrite
        )
    }
}

/// Kinds of constant method handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum MethodHandleKind {
    /// Handle to a static method
    InvokeStatic,
    /// Handle to a virtual method of a class
    InvokeInstance,
    /// Handle to a virtual method of an interface
    InvokeInterface,
    /// Handle to a private method
    InvokeDirect,
    /// Handle to an instance initializer, allocating a new object
    InvokeConstructor,
    /// Handle reading a static field
    StaticGet,
    /// Handle writing a static field
    StaticPut,
    /// Handle reading an instance field
    InstanceGet,
    /// Handle writing an instance field
    InstancePut,
}

/// Member targeted by a method handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleTarget {
    /// A method handle target
    Method(MethodRef),
    /// A field handle target
    Field(FieldRef),
}

/// Constant method handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    /// What the handle does with its target
    pub kind: MethodHandleKind,
    /// The referenced member
    pub target: HandleTarget,
}

/// Dynamically linked call site creating a lambda instance.
///
/// The call site produces an object implementing `interface` whose method `name` with
/// prototype `proto` forwards to `implementation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Functional interface implemented by the produced object
    pub interface: Symbol,
    /// Name of the implemented interface method
    pub name: Symbol,
    /// Prototype of the implemented interface method
    pub proto: Symbol,
    /// The method invoked by the lambda
    pub implementation: MethodHandle,
}

/// Instruction of a method body.
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Method invocation
    Invoke {
        /// Invocation kind
        kind: InvokeKind,
        /// Referenced method
        method: MethodRef,
        /// Receiver bounds if known
        receiver: Option<Receiver>,
    },
    /// Field read
    FieldGet {
        /// Referenced field
        field: FieldRef,
        /// Static access
        is_static: bool,
    },
    /// Field write
    FieldPut {
        /// Referenced field
        field: FieldRef,
        /// Static access
        is_static: bool,
        /// Allocated type of the stored value if known
        value: Option<Symbol>,
    },
    /// Object allocation
    NewInstance(Symbol),
    /// Array allocation of the given array type
    NewArray(Symbol),
    /// Class literal
    ConstClass(Symbol),
    /// Type test
    InstanceOf(Symbol),
    /// Type cast
    CheckCast(Symbol),
    /// Lambda creation through a dynamically linked call site
    InvokeCustom(CallSite),
    /// Constant method handle
    ConstMethodHandle(MethodHandle),
    /// Reflective lookup of a class by name
    ReflectiveClass(Symbol),
    /// Reflective lookup of a field
    ReflectiveField(FieldRef),
    /// Reflective lookup of a method
    ReflectiveMethod(MethodRef),
    /// Default value of the given type (zero, false or null)
    ConstDefault(Symbol),
    /// Discards the top of stack
    Pop,
    /// Triggers initialization of the given class
    InitClass(Symbol),
    /// Any instruction without item references
    Other,
}

/// Method body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    /// Instructions in program order
    pub insns: Vec<Insn>,
    /// Catch types of the exception guards
    pub guards: Vec<Symbol>,
}

impl Code {
    /// Creates an empty body
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports every reference of this body to `registry`, instructions first then guards.
    pub fn register_uses<R: UseRegistry + ?Sized>(&self, registry: &mut R) {
        for (index, insn) in self.insns.iter().enumerate() {
            registry.set_instruction_index(index);
            match insn {
                Insn::Invoke {
                    kind,
                    method,
                    receiver,
                } => registry.register_invoke(*kind, method, receiver.as_ref()),
                Insn::FieldGet { field, is_static } => {
                    registry.register_field_access(field, FieldAccessKind::new(*is_static, false), None);
                }
                Insn::FieldPut {
                    field,
                    is_static,
                    value,
                } => {
                    registry.register_field_access(field, FieldAccessKind::new(*is_static, true), *value);
                }
                Insn::NewInstance(ty) => registry.register_new_instance(*ty),
                Insn::NewArray(ty)
                | Insn::ConstClass(ty)
                | Insn::InstanceOf(ty)
                | Insn::CheckCast(ty)
                | Insn::ConstDefault(ty) => registry.register_type_reference(*ty),
                Insn::InvokeCustom(call_site) => registry.register_call_site(call_site),
                Insn::ConstMethodHandle(handle) => registry.register_method_handle(handle),
                Insn::ReflectiveClass(ty) => registry.register_reflective_class(*ty),
                Insn::ReflectiveField(field) => registry.register_reflective_field(field),
                Insn::ReflectiveMethod(method) => registry.register_reflective_method(method),
                Insn::InitClass(ty) => registry.register_init_class(*ty),
                Insn::Pop | Insn::Other => {}
            }
        }
        for guard in &self.guards {
            registry.register_exception_guard(*guard);
        }
    }

    /// Applies a rewrite, replacing single instructions with their replacement sequences.
    ///
    /// Replacements are applied back to front so that earlier indices stay valid.
    /// Returns the number of replaced instructions.
    pub fn apply(&mut self, rewrite: &CodeRewrite) -> usize {
        let mut replacements: Vec<&(usize, Vec<Insn>)> = rewrite
            .replacements
            .iter()
            .filter(|(index, _)| *index < self.insns.len())
            .collect();
        replacements.sort_by(|a, b| b.0.cmp(&a.0));
        replacements.dedup_by_key(|r| r.0);

        for (index, replacement) in &replacements {
            self.insns
                .splice(*index..=*index, replacement.iter().cloned());
        }
        replacements.len()
    }
}

/// Replacement of single instructions of one method body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeRewrite {
    /// Pairs of instruction index and replacement sequence
    pub replacements: Vec<(usize, Vec<Insn>)>,
}

/// Visitor receiving every item reference of a method body.
///
/// Implementors decide what each reference means; the enqueuer turns them into trace actions,
/// the main-dex computation collects referenced classes.
pub trait UseRegistry {
    /// Called before the references of the instruction at `index` are reported
    fn set_instruction_index(&mut self, _index: usize) {}

    /// An invocation of `method` with the given kind and receiver bounds
    fn register_invoke(&mut self, kind: InvokeKind, method: &MethodRef, receiver: Option<&Receiver>);

    /// A field access; `value` is the allocated type of a stored value if known
    fn register_field_access(&mut self, field: &FieldRef, kind: FieldAccessKind, value: Option<Symbol>);

    /// An allocation of `ty`
    fn register_new_instance(&mut self, ty: Symbol);

    /// A plain type reference (array allocation, class literal, type test or cast)
    fn register_type_reference(&mut self, ty: Symbol);

    /// A lambda creation
    fn register_call_site(&mut self, call_site: &CallSite);

    /// A constant method handle
    fn register_method_handle(&mut self, handle: &MethodHandle);

    /// A reflective class lookup
    fn register_reflective_class(&mut self, ty: Symbol) {
        self.register_type_reference(ty);
    }

    /// A reflective field lookup
    fn register_reflective_field(&mut self, field: &FieldRef);

    /// A reflective method lookup
    fn register_reflective_method(&mut self, method: &MethodRef);

    /// An explicit class initialization
    fn register_init_class(&mut self, ty: Symbol) {
        self.register_type_reference(ty);
    }

    /// The catch type of an exception guard
    fn register_exception_guard(&mut self, ty: Symbol) {
        self.register_type_reference(ty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::SymbolTable;

    #[derive(Default)]
    struct Counting {
        invokes: usize,
        reads: usize,
        writes: usize,
        types: usize,
        guards: usize,
    }

    impl UseRegistry for Counting {
        fn register_invoke(&mut self, _: InvokeKind, _: &MethodRef, _: Option<&Receiver>) {
            self.invokes += 1;
        }
        fn register_field_access(&mut self, _: &FieldRef, kind: FieldAccessKind, _: Option<Symbol>) {
            if kind.is_read() {
                self.reads += 1;
            } else {
                self.writes += 1;
            }
        }
        fn register_new_instance(&mut self, _: Symbol) {
            self.types += 1;
        }
        fn register_type_reference(&mut self, _: Symbol) {
            self.types += 1;
        }
        fn register_call_site(&mut self, _: &CallSite) {}
        fn register_method_handle(&mut self, _: &MethodHandle) {}
        fn register_reflective_field(&mut self, _: &FieldRef) {}
        fn register_reflective_method(&mut self, _: &MethodRef) {}
        fn register_exception_guard(&mut self, _: Symbol) {
            self.guards += 1;
        }
    }

    fn field(symbols: &SymbolTable) -> FieldRef {
        FieldRef {
            holder: symbols.intern("a.A"),
            name: symbols.intern("f"),
            ty: symbols.intern("int"),
        }
    }

    #[test]
    fn test_register_uses() {
        let symbols = SymbolTable::new();
        let ty = symbols.intern("a.A");
        let code = Code {
            insns: vec![
                Insn::NewInstance(ty),
                Insn::Invoke {
                    kind: InvokeKind::Direct,
                    method: MethodRef {
                        holder: ty,
                        name: symbols.intern("<init>"),
                        proto: symbols.intern("()void"),
                    },
                    receiver: None,
                },
                Insn::FieldGet {
                    field: field(&symbols),
                    is_static: false,
                },
                Insn::FieldPut {
                    field: field(&symbols),
                    is_static: true,
                    value: None,
                },
                Insn::Other,
                Insn::CheckCast(ty),
            ],
            guards: vec![symbols.intern("java.lang.Exception")],
        };

        let mut counting = Counting::default();
        code.register_uses(&mut counting);
        assert_eq!(counting.invokes, 1);
        assert_eq!(counting.reads, 1);
        assert_eq!(counting.writes, 1);
        assert_eq!(counting.types, 2);
        assert_eq!(counting.guards, 1);
    }

    #[test]
    fn test_apply_rewrite() {
        let symbols = SymbolTable::new();
        let int = symbols.intern("int");
        let mut code = Code {
            insns: vec![
                Insn::Other,
                Insn::FieldGet {
                    field: field(&symbols),
                    is_static: false,
                },
                Insn::FieldPut {
                    field: field(&symbols),
                    is_static: true,
                    value: None,
                },
            ],
            guards: vec![],
        };
        let rewrite = CodeRewrite {
            replacements: vec![
                (1, vec![Insn::ConstDefault(int)]),
                (2, vec![Insn::Pop, Insn::InitClass(field(&symbols).holder)]),
            ],
        };

        assert_eq!(code.apply(&rewrite), 2);
        assert_eq!(
            code.insns,
            vec![
                Insn::Other,
                Insn::ConstDefault(int),
                Insn::Pop,
                Insn::InitClass(field(&symbols).holder),
            ]
        );
    }

    #[test]
    fn test_field_access_kind() {
        assert!(FieldAccessKind::new(true, false).is_static());
        assert!(FieldAccessKind::new(false, true).is_write());
        assert!(FieldAccessKind::InstanceRead.is_read());
    }
}

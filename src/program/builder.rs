//! Fluent construction of [`Program`]s.
//!
//! Builders intern names through a shared [`SymbolTable`] reference, so nested class, method
//! and annotation builders can be handed out while the program builder is being filled.
//! Tokens are assigned in [`ProgramBuilder::build`], in declaration order.

use std::collections::HashSet;

use crate::{
    program::{
        Annotation, AnnotationElement, AnnotationValue, AnnotationVisibility, CallSite, ClassDef,
        ClassFlags, ClassKind, Code, ConstValue, FieldDef, FieldFlags, FieldRef, HandleTarget,
        Insn, InvokeKind, MethodDef, MethodFlags, MethodHandle, MethodHandleKind, MethodKind,
        MethodRef, Program, Receiver, Symbol, SymbolTable, Token,
    },
    Error, Result,
};

const OBJECT: &str = "java.lang.Object";

struct PendingMethod {
    name: Symbol,
    proto: Symbol,
    flags: MethodFlags,
    kind: MethodKind,
    code: Option<Code>,
    annotations: Vec<Annotation>,
    parameter_annotations: Vec<Vec<Annotation>>,
}

struct PendingField {
    name: Symbol,
    ty: Symbol,
    flags: FieldFlags,
    static_value: Option<ConstValue>,
    annotations: Vec<Annotation>,
}

struct PendingClass {
    name: Symbol,
    kind: ClassKind,
    flags: ClassFlags,
    superclass: Option<Symbol>,
    interfaces: Vec<Symbol>,
    methods: Vec<PendingMethod>,
    fields: Vec<PendingField>,
    annotations: Vec<Annotation>,
    nest_host: Option<Symbol>,
    merged_from: Vec<Symbol>,
    is_record: bool,
}

/// Builder for a whole program.
#[derive(Default)]
pub struct ProgramBuilder {
    symbols: SymbolTable,
    classes: Vec<PendingClass>,
}

impl ProgramBuilder {
    /// Creates an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The symbol table names are interned into
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Adds a program class
    pub fn class<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut ClassBuilder<'_>),
    {
        self.add(ClassKind::Program, name, f)
    }

    /// Adds a library class
    pub fn library_class<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut ClassBuilder<'_>),
    {
        self.add(ClassKind::Library, name, f)
    }

    /// Adds a classpath class
    pub fn classpath_class<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut ClassBuilder<'_>),
    {
        self.add(ClassKind::Classpath, name, f)
    }

    fn add<F>(&mut self, kind: ClassKind, name: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut ClassBuilder<'_>),
    {
        let symbols = &self.symbols;
        let superclass = (name != OBJECT).then(|| symbols.intern(OBJECT));
        let mut builder = ClassBuilder {
            symbols,
            class: PendingClass {
                name: symbols.intern(name),
                kind,
                flags: ClassFlags::PUBLIC,
                superclass,
                interfaces: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                annotations: Vec::new(),
                nest_host: None,
                merged_from: Vec::new(),
                is_record: false,
            },
        };
        f(&mut builder);
        let class = builder.class;
        self.classes.push(class);
        self
    }

    /// Assigns tokens and produces the program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateDefinition`] if two classes share a name, or a class declares
    /// two methods (or fields) with the same signature.
    pub fn build(self) -> Result<Program> {
        let ProgramBuilder { symbols, classes } = self;

        let mut seen_classes = HashSet::new();
        let mut class_defs = Vec::with_capacity(classes.len());
        let mut method_defs = Vec::new();
        let mut field_defs = Vec::new();

        for (class_index, pending) in classes.into_iter().enumerate() {
            if !seen_classes.insert(pending.name) {
                return Err(Error::DuplicateDefinition(
                    symbols.display(pending.name).to_string(),
                ));
            }

            let token = Token::class(class_index);
            let mut method_tokens = Vec::with_capacity(pending.methods.len());
            let mut seen_methods = HashSet::new();
            for method in pending.methods {
                if !seen_methods.insert((method.name, method.proto)) {
                    return Err(Error::DuplicateDefinition(format!(
                        "{}.{}{}",
                        symbols.display(pending.name),
                        symbols.display(method.name),
                        symbols.display(method.proto)
                    )));
                }
                let method_token = Token::method(method_defs.len());
                method_tokens.push(method_token);
                method_defs.push(MethodDef {
                    token: method_token,
                    holder: token,
                    name: method.name,
                    proto: method.proto,
                    flags: method.flags,
                    kind: method.kind,
                    code: method.code,
                    annotations: method.annotations,
                    parameter_annotations: method.parameter_annotations,
                });
            }

            let mut field_tokens = Vec::with_capacity(pending.fields.len());
            let mut seen_fields = HashSet::new();
            for field in pending.fields {
                if !seen_fields.insert((field.name, field.ty)) {
                    return Err(Error::DuplicateDefinition(format!(
                        "{}.{}:{}",
                        symbols.display(pending.name),
                        symbols.display(field.name),
                        symbols.display(field.ty)
                    )));
                }
                let field_token = Token::field(field_defs.len());
                field_tokens.push(field_token);
                field_defs.push(FieldDef {
                    token: field_token,
                    holder: token,
                    name: field.name,
                    ty: field.ty,
                    flags: field.flags,
                    static_value: field.static_value,
                    annotations: field.annotations,
                });
            }

            class_defs.push(ClassDef {
                token,
                name: pending.name,
                kind: pending.kind,
                flags: pending.flags,
                superclass: pending.superclass,
                interfaces: pending.interfaces,
                methods: method_tokens,
                fields: field_tokens,
                annotations: pending.annotations,
                nest_host: pending.nest_host,
                merged_from: pending.merged_from,
                is_record: pending.is_record,
            });
        }

        Ok(Program::from_parts(symbols, class_defs, method_defs, field_defs))
    }
}

/// Builder for a single class.
pub struct ClassBuilder<'a> {
    symbols: &'a SymbolTable,
    class: PendingClass,
}

impl ClassBuilder<'_> {
    /// Sets the superclass
    pub fn extends(&mut self, name: &str) -> &mut Self {
        self.class.superclass = Some(self.symbols.intern(name));
        self
    }

    /// Removes the superclass, for hierarchy roots
    pub fn no_superclass(&mut self) -> &mut Self {
        self.class.superclass = None;
        self
    }

    /// Adds a directly implemented interface
    pub fn implements(&mut self, name: &str) -> &mut Self {
        self.class.interfaces.push(self.symbols.intern(name));
        self
    }

    /// Replaces the class modifiers
    pub fn flags(&mut self, flags: ClassFlags) -> &mut Self {
        self.class.flags = flags;
        self
    }

    /// Marks the class as an interface
    pub fn interface(&mut self) -> &mut Self {
        self.class.flags |= ClassFlags::INTERFACE | ClassFlags::ABSTRACT;
        self
    }

    /// Marks the class as abstract
    pub fn abstract_class(&mut self) -> &mut Self {
        self.class.flags |= ClassFlags::ABSTRACT;
        self
    }

    /// Marks the class as final
    pub fn final_class(&mut self) -> &mut Self {
        self.class.flags |= ClassFlags::FINAL;
        self
    }

    /// Marks the class as an enum
    pub fn enum_class(&mut self) -> &mut Self {
        self.class.flags |= ClassFlags::ENUM | ClassFlags::FINAL;
        self
    }

    /// Marks the class as an annotation interface
    pub fn annotation_interface(&mut self) -> &mut Self {
        self.class.flags |= ClassFlags::ANNOTATION | ClassFlags::INTERFACE | ClassFlags::ABSTRACT;
        self
    }

    /// Marks the class as a record
    pub fn record(&mut self) -> &mut Self {
        self.class.is_record = true;
        self
    }

    /// Sets the nest host
    pub fn nest_host(&mut self, name: &str) -> &mut Self {
        self.class.nest_host = Some(self.symbols.intern(name));
        self
    }

    /// Records that the named class was merged into this class
    pub fn merged_from(&mut self, name: &str) -> &mut Self {
        self.class.merged_from.push(self.symbols.intern(name));
        self
    }

    /// Adds a runtime visible annotation built by `f`
    pub fn annotate<F>(&mut self, ty: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut AnnotationBuilder<'_>),
    {
        let annotation = build_annotation(self.symbols, ty, f);
        self.class.annotations.push(annotation);
        self
    }

    /// Adds a field
    pub fn field(&mut self, name: &str, ty: &str, flags: FieldFlags) -> &mut Self {
        self.field_with(name, ty, flags, |_| {})
    }

    /// Adds a field configured by `f`
    pub fn field_with<F>(&mut self, name: &str, ty: &str, flags: FieldFlags, f: F) -> &mut Self
    where
        F: FnOnce(&mut FieldBuilder<'_>),
    {
        let mut builder = FieldBuilder {
            symbols: self.symbols,
            field: PendingField {
                name: self.symbols.intern(name),
                ty: self.symbols.intern(ty),
                flags,
                static_value: None,
                annotations: Vec::new(),
            },
        };
        f(&mut builder);
        self.class.fields.push(builder.field);
        self
    }

    /// Adds a static final field holding a compile time constant
    pub fn constant(&mut self, name: &str, ty: &str, value: ConstValue) -> &mut Self {
        self.field_with(
            name,
            ty,
            FieldFlags::PUBLIC | FieldFlags::STATIC | FieldFlags::FINAL,
            |f| {
                f.value(value);
            },
        )
    }

    /// Adds a method with a body built by `f`
    pub fn method<F>(&mut self, name: &str, proto: &str, flags: MethodFlags, f: F) -> &mut Self
    where
        F: FnOnce(&mut MethodBuilder<'_>),
    {
        let has_code = !flags.intersects(MethodFlags::ABSTRACT | MethodFlags::NATIVE);
        let mut builder = MethodBuilder {
            symbols: self.symbols,
            code: Code::new(),
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
        };
        f(&mut builder);

        let kind = match name {
            "<init>" => MethodKind::InstanceInitializer,
            "<clinit>" => MethodKind::ClassInitializer,
            _ => MethodKind::Regular,
        };
        let flags = if kind == MethodKind::ClassInitializer {
            flags | MethodFlags::STATIC
        } else {
            flags
        };

        self.class.methods.push(PendingMethod {
            name: self.symbols.intern(name),
            proto: self.symbols.intern(proto),
            flags,
            kind,
            code: has_code.then_some(builder.code),
            annotations: builder.annotations,
            parameter_annotations: builder.parameter_annotations,
        });
        self
    }

    /// Adds an abstract method
    pub fn abstract_method(&mut self, name: &str, proto: &str, flags: MethodFlags) -> &mut Self {
        self.method(name, proto, flags | MethodFlags::ABSTRACT, |_| {})
    }

    /// Adds a public no-argument instance initializer with a body built by `f`
    pub fn init<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut MethodBuilder<'_>),
    {
        self.method("<init>", "()void", MethodFlags::PUBLIC, f)
    }

    /// Adds a class initializer with a body built by `f`
    pub fn clinit<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut MethodBuilder<'_>),
    {
        self.method("<clinit>", "()void", MethodFlags::STATIC, f)
    }
}

/// Builder for a single field.
pub struct FieldBuilder<'a> {
    symbols: &'a SymbolTable,
    field: PendingField,
}

impl FieldBuilder<'_> {
    /// Sets the compile time constant value
    pub fn value(&mut self, value: ConstValue) -> &mut Self {
        self.field.static_value = Some(value);
        self
    }

    /// Adds a runtime visible annotation built by `f`
    pub fn annotate<F>(&mut self, ty: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut AnnotationBuilder<'_>),
    {
        let annotation = build_annotation(self.symbols, ty, f);
        self.field.annotations.push(annotation);
        self
    }
}

/// Builder for a method body and its annotations.
pub struct MethodBuilder<'a> {
    symbols: &'a SymbolTable,
    code: Code,
    annotations: Vec<Annotation>,
    parameter_annotations: Vec<Vec<Annotation>>,
}

impl MethodBuilder<'_> {
    fn method_ref(&self, holder: &str, name: &str, proto: &str) -> MethodRef {
        MethodRef {
            holder: self.symbols.intern(holder),
            name: self.symbols.intern(name),
            proto: self.symbols.intern(proto),
        }
    }

    fn field_ref(&self, holder: &str, name: &str, ty: &str) -> FieldRef {
        FieldRef {
            holder: self.symbols.intern(holder),
            name: self.symbols.intern(name),
            ty: self.symbols.intern(ty),
        }
    }

    /// Appends a raw instruction
    pub fn insn(&mut self, insn: Insn) -> &mut Self {
        self.code.insns.push(insn);
        self
    }

    /// Appends an invocation without receiver information
    pub fn invoke(&mut self, kind: InvokeKind, holder: &str, name: &str, proto: &str) -> &mut Self {
        let method = self.method_ref(holder, name, proto);
        self.insn(Insn::Invoke {
            kind,
            method,
            receiver: None,
        })
    }

    /// Appends an invocation with a refined receiver type
    pub fn invoke_on(
        &mut self,
        kind: InvokeKind,
        holder: &str,
        name: &str,
        proto: &str,
        receiver: &str,
        exact: bool,
    ) -> &mut Self {
        let method = self.method_ref(holder, name, proto);
        let receiver = Receiver {
            ty: self.symbols.intern(receiver),
            exact,
        };
        self.insn(Insn::Invoke {
            kind,
            method,
            receiver: Some(receiver),
        })
    }

    /// Appends a virtual invocation
    pub fn invoke_virtual(&mut self, holder: &str, name: &str, proto: &str) -> &mut Self {
        self.invoke(InvokeKind::Virtual, holder, name, proto)
    }

    /// Appends an interface invocation
    pub fn invoke_interface(&mut self, holder: &str, name: &str, proto: &str) -> &mut Self {
        self.invoke(InvokeKind::Interface, holder, name, proto)
    }

    /// Appends a super invocation
    pub fn invoke_super(&mut self, holder: &str, name: &str, proto: &str) -> &mut Self {
        self.invoke(InvokeKind::Super, holder, name, proto)
    }

    /// Appends a direct invocation
    pub fn invoke_direct(&mut self, holder: &str, name: &str, proto: &str) -> &mut Self {
        self.invoke(InvokeKind::Direct, holder, name, proto)
    }

    /// Appends a static invocation
    pub fn invoke_static(&mut self, holder: &str, name: &str, proto: &str) -> &mut Self {
        self.invoke(InvokeKind::Static, holder, name, proto)
    }

    /// Appends `new ty()`: the allocation followed by the no-argument initializer call
    pub fn construct(&mut self, ty: &str) -> &mut Self {
        self.new_instance(ty);
        self.invoke_direct(ty, "<init>", "()void")
    }

    /// Appends an instance field read
    pub fn get_field(&mut self, holder: &str, name: &str, ty: &str) -> &mut Self {
        let field = self.field_ref(holder, name, ty);
        self.insn(Insn::FieldGet {
            field,
            is_static: false,
        })
    }

    /// Appends an instance field write
    pub fn put_field(&mut self, holder: &str, name: &str, ty: &str) -> &mut Self {
        let field = self.field_ref(holder, name, ty);
        self.insn(Insn::FieldPut {
            field,
            is_static: false,
            value: None,
        })
    }

    /// Appends an instance field write of a value with known allocated type
    pub fn put_field_value(&mut self, holder: &str, name: &str, ty: &str, value: &str) -> &mut Self {
        let field = self.field_ref(holder, name, ty);
        let value = Some(self.symbols.intern(value));
        self.insn(Insn::FieldPut {
            field,
            is_static: false,
            value,
        })
    }

    /// Appends a static field read
    pub fn get_static(&mut self, holder: &str, name: &str, ty: &str) -> &mut Self {
        let field = self.field_ref(holder, name, ty);
        self.insn(Insn::FieldGet {
            field,
            is_static: true,
        })
    }

    /// Appends a static field write
    pub fn put_static(&mut self, holder: &str, name: &str, ty: &str) -> &mut Self {
        let field = self.field_ref(holder, name, ty);
        self.insn(Insn::FieldPut {
            field,
            is_static: true,
            value: None,
        })
    }

    /// Appends an allocation
    pub fn new_instance(&mut self, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.insn(Insn::NewInstance(ty))
    }

    /// Appends an array allocation, `ty` is the array type
    pub fn new_array(&mut self, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.insn(Insn::NewArray(ty))
    }

    /// Appends a class literal
    pub fn const_class(&mut self, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.insn(Insn::ConstClass(ty))
    }

    /// Appends a type test
    pub fn instance_of(&mut self, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.insn(Insn::InstanceOf(ty))
    }

    /// Appends a cast
    pub fn check_cast(&mut self, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.insn(Insn::CheckCast(ty))
    }

    /// Appends a lambda creation implementing `interface.name proto` by the given method
    pub fn lambda(
        &mut self,
        interface: &str,
        name: &str,
        proto: &str,
        implementation: (MethodHandleKind, &str, &str, &str),
    ) -> &mut Self {
        let (kind, holder, impl_name, impl_proto) = implementation;
        let call_site = CallSite {
            interface: self.symbols.intern(interface),
            name: self.symbols.intern(name),
            proto: self.symbols.intern(proto),
            implementation: MethodHandle {
                kind,
                target: HandleTarget::Method(self.method_ref(holder, impl_name, impl_proto)),
            },
        };
        self.insn(Insn::InvokeCustom(call_site))
    }

    /// Appends a constant method handle to a method
    pub fn method_handle(&mut self, kind: MethodHandleKind, holder: &str, name: &str, proto: &str) -> &mut Self {
        let target = HandleTarget::Method(self.method_ref(holder, name, proto));
        self.insn(Insn::ConstMethodHandle(MethodHandle { kind, target }))
    }

    /// Appends a constant method handle to a field
    pub fn field_handle(&mut self, kind: MethodHandleKind, holder: &str, name: &str, ty: &str) -> &mut Self {
        let target = HandleTarget::Field(self.field_ref(holder, name, ty));
        self.insn(Insn::ConstMethodHandle(MethodHandle { kind, target }))
    }

    /// Appends a reflective class lookup
    pub fn reflective_class(&mut self, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.insn(Insn::ReflectiveClass(ty))
    }

    /// Appends a reflective field lookup
    pub fn reflective_field(&mut self, holder: &str, name: &str, ty: &str) -> &mut Self {
        let field = self.field_ref(holder, name, ty);
        self.insn(Insn::ReflectiveField(field))
    }

    /// Appends a reflective method lookup
    pub fn reflective_method(&mut self, holder: &str, name: &str, proto: &str) -> &mut Self {
        let method = self.method_ref(holder, name, proto);
        self.insn(Insn::ReflectiveMethod(method))
    }

    /// Adds an exception guard catching `ty`
    pub fn catch(&mut self, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.code.guards.push(ty);
        self
    }

    /// Appends an instruction without references
    pub fn other(&mut self) -> &mut Self {
        self.insn(Insn::Other)
    }

    /// Adds a runtime visible method annotation built by `f`
    pub fn annotate<F>(&mut self, ty: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut AnnotationBuilder<'_>),
    {
        let annotation = build_annotation(self.symbols, ty, f);
        self.annotations.push(annotation);
        self
    }

    /// Adds a runtime visible annotation to the parameter at `index`
    pub fn annotate_parameter<F>(&mut self, index: usize, ty: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut AnnotationBuilder<'_>),
    {
        let annotation = build_annotation(self.symbols, ty, f);
        if self.parameter_annotations.len() <= index {
            self.parameter_annotations.resize_with(index + 1, Vec::new);
        }
        self.parameter_annotations[index].push(annotation);
        self
    }
}

fn build_annotation<F>(symbols: &SymbolTable, ty: &str, f: F) -> Annotation
where
    F: FnOnce(&mut AnnotationBuilder<'_>),
{
    let mut builder = AnnotationBuilder {
        symbols,
        annotation: Annotation::new(symbols.intern(ty), AnnotationVisibility::Runtime),
    };
    f(&mut builder);
    builder.annotation
}

/// Builder for an annotation.
pub struct AnnotationBuilder<'a> {
    symbols: &'a SymbolTable,
    annotation: Annotation,
}

impl AnnotationBuilder<'_> {
    /// Sets the retention
    pub fn visibility(&mut self, visibility: AnnotationVisibility) -> &mut Self {
        self.annotation.visibility = visibility;
        self
    }

    /// Adds an element with an arbitrary value
    pub fn element(&mut self, name: &str, value: AnnotationValue) -> &mut Self {
        self.annotation.elements.push(AnnotationElement {
            name: self.symbols.intern(name),
            value,
        });
        self
    }

    /// Adds an integral element
    pub fn int(&mut self, name: &str, value: i64) -> &mut Self {
        self.element(name, AnnotationValue::Int(value))
    }

    /// Adds a string element
    pub fn string(&mut self, name: &str, value: &str) -> &mut Self {
        self.element(name, AnnotationValue::Str(value.to_string()))
    }

    /// Adds a class literal element
    pub fn class_value(&mut self, name: &str, ty: &str) -> &mut Self {
        let ty = self.symbols.intern(ty);
        self.element(name, AnnotationValue::Type(ty))
    }

    /// Adds an enum constant element
    pub fn enum_value(&mut self, name: &str, ty: &str, constant: &str) -> &mut Self {
        let value = self.enum_constant(ty, constant);
        self.element(name, value)
    }

    /// Adds a nested annotation element built by `f`
    pub fn nested<F>(&mut self, name: &str, ty: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut AnnotationBuilder<'_>),
    {
        let nested = build_annotation(self.symbols, ty, f);
        self.element(name, AnnotationValue::Annotation(Box::new(nested)))
    }

    /// Creates an enum constant value, e.g. for use inside arrays
    pub fn enum_constant(&self, ty: &str, constant: &str) -> AnnotationValue {
        AnnotationValue::Enum {
            ty: self.symbols.intern(ty),
            name: self.symbols.intern(constant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_assigns_tokens() {
        let mut builder = ProgramBuilder::new();
        builder.library_class(OBJECT, |_| {});
        builder.class("a.A", |c| {
            c.field("f", "int", FieldFlags::PRIVATE);
            c.init(|m| {
                m.invoke_direct(OBJECT, "<init>", "()void");
            });
            c.abstract_method("m", "()void", MethodFlags::PUBLIC);
        });

        let program = builder.build().unwrap();
        let object = program.class_by_name(OBJECT).unwrap();
        assert_eq!(object.superclass, None);
        assert!(!object.is_program());

        let a = program.class_by_name("a.A").unwrap();
        assert_eq!(a.token, Token::class(1));
        assert_eq!(a.superclass, Some(program.object_symbol()));
        assert_eq!(a.methods.len(), 2);

        let init = program.method(a.methods[0]).unwrap();
        assert!(init.is_instance_initializer());
        assert!(init.has_code());
        let m = program.method(a.methods[1]).unwrap();
        assert!(m.is_abstract());
        assert!(!m.has_code());
        assert_eq!(program.descriptor(m.token), "a.A.m()void");
        assert_eq!(program.descriptor(a.fields[0]), "a.A.f:int");
    }

    #[test]
    fn test_duplicate_class() {
        let mut builder = ProgramBuilder::new();
        builder.class("a.A", |_| {});
        builder.class("a.A", |_| {});
        assert!(matches!(builder.build(), Err(Error::DuplicateDefinition(name)) if name == "a.A"));
    }

    #[test]
    fn test_duplicate_method() {
        let mut builder = ProgramBuilder::new();
        builder.class("a.A", |c| {
            c.method("m", "()void", MethodFlags::PUBLIC, |_| {});
            c.method("m", "()void", MethodFlags::PRIVATE, |_| {});
        });
        assert!(matches!(
            builder.build(),
            Err(Error::DuplicateDefinition(name)) if name == "a.A.m()void"
        ));
    }

    #[test]
    fn test_class_initializer_is_static() {
        let mut builder = ProgramBuilder::new();
        builder.class("a.A", |c| {
            c.method("<clinit>", "()void", MethodFlags::empty(), |_| {});
        });
        let program = builder.build().unwrap();
        let a = program.class_by_name("a.A").unwrap();
        let clinit = program.class_initializer(a).unwrap();
        assert!(clinit.is_static());
        assert!(clinit.is_class_initializer());
    }

    #[test]
    fn test_apply_rewrites() {
        let mut builder = ProgramBuilder::new();
        builder.class("a.A", |c| {
            c.field("f", "int", FieldFlags::empty());
            c.init(|m| {
                m.put_field("a.A", "f", "int");
            });
        });
        let mut program = builder.build().unwrap();
        let init = Token::method(0);

        let mut rewrites = crate::program::MethodRewrites::new();
        rewrites.insert(
            init,
            crate::program::CodeRewrite {
                replacements: vec![(0, vec![Insn::Pop])],
            },
        );
        assert_eq!(program.apply_rewrites(&rewrites).unwrap(), 1);
        let code = program.method(init).unwrap().code.as_ref().unwrap();
        assert_eq!(code.insns, vec![Insn::Pop]);

        let mut bad = crate::program::MethodRewrites::new();
        bad.insert(Token::method(7), crate::program::CodeRewrite::default());
        assert!(matches!(
            program.apply_rewrites(&bad),
            Err(Error::UnknownItem(_))
        ));
    }
}

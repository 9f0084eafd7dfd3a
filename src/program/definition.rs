//! Class, method and field definitions.
//!
//! Definitions are immutable during a pass. They reference each other through [`Token`]s
//! (for resolved links inside the program, e.g. a class's declared members) and [`Symbol`]s
//! (for symbolic references that may point outside the program, e.g. a superclass).

use crate::program::{
    Annotation, ClassFlags, Code, FieldFlags, MethodFlags, Symbol, Token, Visibility,
};

/// Origin of a class definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ClassKind {
    /// Compiled as part of the program, subject to shrinking
    Program,
    /// Provided by the runtime library; only visible, never shrunk
    Library,
    /// Available at compile time only; only visible, never shrunk
    Classpath,
}

/// Kind of a method with respect to construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum MethodKind {
    /// Any regular method
    Regular,
    /// Instance initializer (`<init>`)
    InstanceInitializer,
    /// Class initializer (`<clinit>`)
    ClassInitializer,
}

/// Compile time constant of a static field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// Integral constant
    Int(i64),
    /// Boolean constant
    Bool(bool),
    /// String constant
    Str(String),
}

/// A class or interface definition.
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Handle of this class
    pub token: Token,
    /// Fully qualified name
    pub name: Symbol,
    /// Origin of the definition
    pub kind: ClassKind,
    /// Modifiers
    pub flags: ClassFlags,
    /// Superclass, `None` only for the root of the hierarchy
    pub superclass: Option<Symbol>,
    /// Directly implemented interfaces
    pub interfaces: Vec<Symbol>,
    /// Declared methods
    pub methods: Vec<Token>,
    /// Declared fields
    pub fields: Vec<Token>,
    /// Class annotations
    pub annotations: Vec<Annotation>,
    /// Host of the nest this class belongs to
    pub nest_host: Option<Symbol>,
    /// Names of classes that were merged into this class by earlier passes
    pub merged_from: Vec<Symbol>,
    /// Whether this class is a record
    pub is_record: bool,
}

impl ClassDef {
    /// Returns true if the class is part of the program
    #[must_use]
    pub fn is_program(&self) -> bool {
        self.kind == ClassKind::Program
    }

    /// Returns true for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    /// Returns true for abstract classes and interfaces
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags
            .intersects(ClassFlags::ABSTRACT | ClassFlags::INTERFACE)
    }

    /// Returns true for final classes
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(ClassFlags::FINAL)
    }

    /// Returns true for annotation interfaces
    #[must_use]
    pub fn is_annotation(&self) -> bool {
        self.flags.contains(ClassFlags::ANNOTATION)
    }

    /// Returns true for enum classes
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.flags.contains(ClassFlags::ENUM)
    }

    /// Returns true if instances of this class can be allocated
    #[must_use]
    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract()
    }

    /// The nest host of this class, the class itself if it declares none
    #[must_use]
    pub fn nest(&self) -> Symbol {
        self.nest_host.unwrap_or(self.name)
    }
}

/// A method definition.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Handle of this method
    pub token: Token,
    /// Declaring class
    pub holder: Token,
    /// Method name
    pub name: Symbol,
    /// Method prototype
    pub proto: Symbol,
    /// Modifiers
    pub flags: MethodFlags,
    /// Initializer kind
    pub kind: MethodKind,
    /// Body, `None` for abstract and native methods
    pub code: Option<Code>,
    /// Method annotations
    pub annotations: Vec<Annotation>,
    /// Annotations per parameter
    pub parameter_annotations: Vec<Vec<Annotation>>,
}

impl MethodDef {
    /// Returns true for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// Returns true for private methods
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.flags.contains(MethodFlags::PRIVATE)
    }

    /// Returns true for abstract methods
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    /// Returns true for final methods
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(MethodFlags::FINAL)
    }

    /// Returns true for native methods
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.flags.contains(MethodFlags::NATIVE)
    }

    /// Returns true for instance initializers
    #[must_use]
    pub fn is_instance_initializer(&self) -> bool {
        self.kind == MethodKind::InstanceInitializer
    }

    /// Returns true for class initializers
    #[must_use]
    pub fn is_class_initializer(&self) -> bool {
        self.kind == MethodKind::ClassInitializer
    }

    /// Returns true if calls to this method are subject to virtual dispatch
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        !self.is_static() && !self.is_private() && self.kind == MethodKind::Regular
    }

    /// Returns true if the method has a body to trace
    #[must_use]
    pub fn has_code(&self) -> bool {
        self.code.is_some()
    }

    /// Visibility of the method
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.flags.visibility()
    }
}

/// A field definition.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Handle of this field
    pub token: Token,
    /// Declaring class
    pub holder: Token,
    /// Field name
    pub name: Symbol,
    /// Declared type
    pub ty: Symbol,
    /// Modifiers
    pub flags: FieldFlags,
    /// Compile time constant, only for static final fields
    pub static_value: Option<ConstValue>,
    /// Field annotations
    pub annotations: Vec<Annotation>,
}

impl FieldDef {
    /// Returns true for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldFlags::STATIC)
    }

    /// Returns true for final fields
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(FieldFlags::FINAL)
    }

    /// Returns true for fields whose constant value is inlined into readers by the compiler.
    ///
    /// Reads of such fields may be absent from the program even though the source reads them.
    #[must_use]
    pub fn is_compile_time_constant(&self) -> bool {
        self.is_static() && self.is_final() && self.static_value.is_some()
    }

    /// Visibility of the field
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.flags.visibility()
    }
}

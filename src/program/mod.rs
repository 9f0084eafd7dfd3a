//! Program model: classes, methods, fields and their bodies.
//!
//! A [`Program`] is an arena of definitions addressed by [`Token`]s. It is built once with a
//! [`ProgramBuilder`] and stays immutable while an analysis pass runs. Between passes the
//! embedder may apply the instruction rewrites produced by a pass through
//! [`Program::apply_rewrites`].
//!
//! # Key Components
//!
//! - [`Program`] - Definition arena with name indices
//! - [`ProgramBuilder`] - Fluent construction of programs
//! - [`ClassDef`], [`MethodDef`], [`FieldDef`] - The definitions
//! - [`Code`], [`Insn`], [`UseRegistry`] - Method bodies and their visitor
//! - [`SymbolTable`] - Concurrent interner for all names
//!
//! # Examples
//!
//! ```rust
//! use shaker::program::{ProgramBuilder, MethodFlags};
//!
//! # fn main() -> shaker::Result<()> {
//! let mut builder = ProgramBuilder::new();
//! builder.library_class("java.lang.Object", |_| {});
//! builder.class("com.example.Main", |c| {
//!     c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
//!         m.new_instance("com.example.Main");
//!     });
//! });
//! let program = builder.build()?;
//! assert!(program.class_by_name("com.example.Main").is_some());
//! # Ok(())
//! # }
//! ```

mod annotation;
mod builder;
mod code;
mod definition;
pub mod descriptor;
mod flags;
mod symbol;
mod token;

pub use annotation::{
    AnnotatedItem, Annotation, AnnotationElement, AnnotationValue, AnnotationVisibility,
};
pub use builder::{AnnotationBuilder, ClassBuilder, FieldBuilder, MethodBuilder, ProgramBuilder};
pub use code::{
    CallSite, Code, CodeRewrite, FieldAccessKind, FieldRef, HandleTarget, Insn, InvokeKind,
    MethodHandle, MethodHandleKind, MethodRef, Receiver, UseRegistry,
};
pub use definition::{ClassDef, ClassKind, ConstValue, FieldDef, MethodDef, MethodKind};
pub use flags::{ClassFlags, FieldFlags, MethodFlags, Visibility};
pub use symbol::{Symbol, SymbolTable};
pub use token::Token;

use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use crossbeam_skiplist::SkipMap;

use crate::Result;

/// Instruction rewrites for a set of methods, keyed by method.
pub type MethodRewrites = BTreeMap<Token, CodeRewrite>;

/// Whole program: program classes plus the visible library and classpath classes.
pub struct Program {
    symbols: SymbolTable,
    classes: Vec<ClassDef>,
    methods: Vec<MethodDef>,
    fields: Vec<FieldDef>,
    by_symbol: HashMap<Symbol, Token>,
    by_name: SkipMap<Arc<str>, Token>,
    init: Symbol,
    clinit: Symbol,
    object: Symbol,
}

impl Program {
    pub(crate) fn from_parts(
        symbols: SymbolTable,
        classes: Vec<ClassDef>,
        methods: Vec<MethodDef>,
        fields: Vec<FieldDef>,
    ) -> Self {
        let by_name = SkipMap::new();
        let mut by_symbol = HashMap::with_capacity(classes.len());
        for class in &classes {
            by_symbol.insert(class.name, class.token);
            by_name.insert(Arc::from(symbols.display(class.name)), class.token);
        }

        let init = symbols.intern("<init>");
        let clinit = symbols.intern("<clinit>");
        let object = symbols.intern("java.lang.Object");

        Program {
            symbols,
            classes,
            methods,
            fields,
            by_symbol,
            by_name,
            init,
            clinit,
            object,
        }
    }

    /// The symbol table holding every name of this program
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Resolves a symbol to its string, `"<unknown>"` for foreign symbols
    #[must_use]
    pub fn name(&self, symbol: Symbol) -> &str {
        self.symbols.display(symbol)
    }

    /// Interns a name into this program's symbol table
    pub fn intern(&self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    /// Symbol of the instance initializer name
    #[must_use]
    pub fn init_symbol(&self) -> Symbol {
        self.init
    }

    /// Symbol of the class initializer name
    #[must_use]
    pub fn clinit_symbol(&self) -> Symbol {
        self.clinit
    }

    /// Symbol of the hierarchy root `java.lang.Object`
    #[must_use]
    pub fn object_symbol(&self) -> Symbol {
        self.object
    }

    /// Returns the class with the given token
    #[must_use]
    pub fn class(&self, token: Token) -> Option<&ClassDef> {
        if !token.is_class() {
            return None;
        }
        self.classes.get(token.index()?)
    }

    /// Returns the method with the given token
    #[must_use]
    pub fn method(&self, token: Token) -> Option<&MethodDef> {
        if !token.is_method() {
            return None;
        }
        self.methods.get(token.index()?)
    }

    /// Returns the field with the given token
    #[must_use]
    pub fn field(&self, token: Token) -> Option<&FieldDef> {
        if !token.is_field() {
            return None;
        }
        self.fields.get(token.index()?)
    }

    /// Returns the class defined under the given name symbol
    #[must_use]
    pub fn class_by_symbol(&self, name: Symbol) -> Option<&ClassDef> {
        self.by_symbol
            .get(&name)
            .and_then(|token| self.class(*token))
    }

    /// Returns the class defined under the given name
    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<&ClassDef> {
        self.by_name
            .get(name)
            .and_then(|entry| self.class(*entry.value()))
    }

    /// Returns the class defined under the given name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ClassNotFound`] if no class has that name.
    pub fn require_class(&self, name: &str) -> Result<&ClassDef> {
        self.class_by_name(name)
            .ok_or_else(|| crate::Error::ClassNotFound(name.to_string()))
    }

    /// All classes in definition order
    #[must_use]
    pub fn classes(&self) -> &[ClassDef] {
        &self.classes
    }

    /// All methods in definition order
    #[must_use]
    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// All fields in definition order
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Program classes in definition order
    pub fn program_classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter().filter(|class| class.is_program())
    }

    /// Tokens of all classes ordered by class name
    pub fn classes_by_name(&self) -> impl Iterator<Item = Token> + '_ {
        self.by_name.iter().map(|entry| *entry.value())
    }

    /// Declared methods of a class
    pub fn methods_of<'a>(&'a self, class: &'a ClassDef) -> impl Iterator<Item = &'a MethodDef> {
        class.methods.iter().filter_map(|token| self.method(*token))
    }

    /// Declared fields of a class
    pub fn fields_of<'a>(&'a self, class: &'a ClassDef) -> impl Iterator<Item = &'a FieldDef> {
        class.fields.iter().filter_map(|token| self.field(*token))
    }

    /// Finds a method declared in `class` with the given name and prototype
    #[must_use]
    pub fn find_method(&self, class: &ClassDef, name: Symbol, proto: Symbol) -> Option<&MethodDef> {
        class
            .methods
            .iter()
            .filter_map(|token| self.method(*token))
            .find(|method| method.name == name && method.proto == proto)
    }

    /// Finds a field declared in `class` with the given name and type
    #[must_use]
    pub fn find_field(&self, class: &ClassDef, name: Symbol, ty: Symbol) -> Option<&FieldDef> {
        class
            .fields
            .iter()
            .filter_map(|token| self.field(*token))
            .find(|field| field.name == name && field.ty == ty)
    }

    /// Returns the class initializer of `class`, if it declares one
    #[must_use]
    pub fn class_initializer(&self, class: &ClassDef) -> Option<&MethodDef> {
        class
            .methods
            .iter()
            .filter_map(|token| self.method(*token))
            .find(|method| method.is_class_initializer())
    }

    /// Returns the class declaring the given method or field
    #[must_use]
    pub fn holder_of(&self, member: Token) -> Option<&ClassDef> {
        if let Some(method) = self.method(member) {
            return self.class(method.holder);
        }
        self.field(member).and_then(|field| self.class(field.holder))
    }

    /// Canonical descriptor of any item, used for reporting and for sorted diagnostics.
    ///
    /// Classes render as `a.B`, methods as `a.B.m(int)void` and fields as `a.B.f:int`.
    #[must_use]
    pub fn descriptor(&self, token: Token) -> String {
        if let Some(class) = self.class(token) {
            return self.name(class.name).to_string();
        }
        if let Some(method) = self.method(token) {
            let holder = self
                .class(method.holder)
                .map_or("<unknown>", |class| self.name(class.name));
            return format!(
                "{}.{}{}",
                holder,
                self.name(method.name),
                self.name(method.proto)
            );
        }
        if let Some(field) = self.field(token) {
            let holder = self
                .class(field.holder)
                .map_or("<unknown>", |class| self.name(class.name));
            return format!("{}.{}:{}", holder, self.name(field.name), self.name(field.ty));
        }
        format!("<unknown {}>", token)
    }

    /// Descriptor of a symbolic method reference
    #[must_use]
    pub fn method_ref_descriptor(&self, method: &MethodRef) -> String {
        format!(
            "{}.{}{}",
            self.name(method.holder),
            self.name(method.name),
            self.name(method.proto)
        )
    }

    /// Descriptor of a symbolic field reference
    #[must_use]
    pub fn field_ref_descriptor(&self, field: &FieldRef) -> String {
        format!(
            "{}.{}:{}",
            self.name(field.holder),
            self.name(field.name),
            self.name(field.ty)
        )
    }

    /// Applies instruction rewrites produced by a finished pass.
    ///
    /// Must only be called between passes. Returns the number of replaced instructions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownItem`] if a rewrite targets a method that does not
    /// exist, and an invariant error if it targets a method without a body.
    pub fn apply_rewrites(&mut self, rewrites: &MethodRewrites) -> Result<usize> {
        let mut replaced = 0;
        for (token, rewrite) in rewrites {
            let index = match (token.is_method(), token.index()) {
                (true, Some(index)) if index < self.methods.len() => index,
                _ => return Err(crate::Error::UnknownItem(*token)),
            };
            let method = &mut self.methods[index];
            let Some(code) = method.code.as_mut() else {
                return Err(invariant_error!("rewrite of method {} without code", token));
            };
            replaced += code.apply(rewrite);
        }
        Ok(replaced)
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("classes", &self.classes.len())
            .field("methods", &self.methods.len())
            .field("fields", &self.fields.len())
            .finish()
    }
}

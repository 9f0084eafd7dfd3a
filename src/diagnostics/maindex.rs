//! Main-dex classes: the roots of a main-dex trace and their direct dependencies.
//!
//! Classes that must be loadable before secondary program units are available are the live
//! types of a [`crate::enqueuer::Mode::MainDexTracing`] pass (the roots) plus every program
//! class directly referenced by the code or the declaration of a root. Dependencies are
//! collected per root class in parallel.

use std::{collections::BTreeSet, sync::Mutex};

use rayon::prelude::*;

use crate::{
    program::{
        descriptor, CallSite, FieldAccessKind, FieldRef, HandleTarget, InvokeKind, MethodHandle,
        MethodRef, Program, Receiver, Symbol, Token, UseRegistry,
    },
    Result,
};

/// Collects the class names referenced by a method body.
struct Collector<'a> {
    program: &'a Program,
    names: Vec<Symbol>,
}

impl Collector<'_> {
    fn type_name(&mut self, ty: Symbol) {
        if let Some(class) = descriptor::referenced_class(self.program.name(ty)) {
            self.names.push(self.program.intern(class));
        }
    }
}

impl UseRegistry for Collector<'_> {
    fn register_invoke(&mut self, _kind: InvokeKind, method: &MethodRef, _receiver: Option<&Receiver>) {
        self.names.push(method.holder);
    }

    fn register_field_access(&mut self, field: &FieldRef, _kind: FieldAccessKind, _value: Option<Symbol>) {
        self.names.push(field.holder);
    }

    fn register_new_instance(&mut self, ty: Symbol) {
        self.names.push(ty);
    }

    fn register_type_reference(&mut self, ty: Symbol) {
        self.type_name(ty);
    }

    fn register_call_site(&mut self, call_site: &CallSite) {
        self.names.push(call_site.interface);
        self.register_method_handle(&call_site.implementation);
    }

    fn register_method_handle(&mut self, handle: &MethodHandle) {
        match handle.target {
            HandleTarget::Method(method) => self.names.push(method.holder),
            HandleTarget::Field(field) => self.names.push(field.holder),
        }
    }

    fn register_reflective_field(&mut self, field: &FieldRef) {
        self.names.push(field.holder);
    }

    fn register_reflective_method(&mut self, method: &MethodRef) {
        self.names.push(method.holder);
    }
}

/// Main-dex roots and their direct dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainDexInfo {
    roots: BTreeSet<Token>,
    dependencies: BTreeSet<Token>,
}

impl MainDexInfo {
    /// Computes the direct dependencies of `roots`.
    ///
    /// A dependency is a program class that is not itself a root and is named by a root's
    /// supertypes, member signatures or method bodies.
    ///
    /// # Arguments
    ///
    /// * `program` - The traced program
    /// * `roots` - Live types of the main-dex trace
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the shared result set cannot be consumed.
    pub fn compute(program: &Program, roots: impl IntoIterator<Item = Token>) -> Result<Self> {
        let roots: BTreeSet<Token> = roots
            .into_iter()
            .filter(|token| program.class(*token).is_some_and(|class| class.is_program()))
            .collect();
        let dependencies = Mutex::new(BTreeSet::new());

        let ordered: Vec<Token> = roots.iter().copied().collect();
        ordered.par_iter().for_each(|&root| {
            let Some(class) = program.class(root) else {
                return;
            };

            let mut collector = Collector {
                program,
                names: Vec::new(),
            };
            collector.names.extend(class.superclass);
            collector.names.extend(class.interfaces.iter().copied());
            for field in program.fields_of(class) {
                collector.type_name(field.ty);
            }
            for method in program.methods_of(class) {
                for name in descriptor::proto_classes(program.name(method.proto)) {
                    collector.names.push(program.intern(name));
                }
                if let Some(code) = &method.code {
                    code.register_uses(&mut collector);
                }
            }

            let found: Vec<Token> = collector
                .names
                .into_iter()
                .filter_map(|name| program.class_by_symbol(name))
                .filter(|dependency| dependency.is_program() && !roots.contains(&dependency.token))
                .map(|dependency| dependency.token)
                .collect();
            if !found.is_empty() {
                lock!(dependencies).extend(found);
            }
        });

        Ok(MainDexInfo {
            roots,
            dependencies: into_inner!(dependencies)?,
        })
    }

    /// The main-dex roots
    #[must_use]
    pub fn roots(&self) -> &BTreeSet<Token> {
        &self.roots
    }

    /// Direct dependencies of the roots, excluding the roots themselves
    #[must_use]
    pub fn dependencies(&self) -> &BTreeSet<Token> {
        &self.dependencies
    }

    /// Returns true if the class must be placed in the main unit
    #[must_use]
    pub fn contains(&self, class: Token) -> bool {
        self.roots.contains(&class) || self.dependencies.contains(&class)
    }

    /// All main-dex classes in token order
    pub fn classes(&self) -> impl Iterator<Item = Token> + '_ {
        self.roots.union(&self.dependencies).copied()
    }

    /// Number of main-dex classes
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len() + self.dependencies.len()
    }

    /// Returns true if there are no main-dex classes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::{FieldFlags, MethodFlags},
        test::builder_with_object,
    };

    #[test]
    fn test_direct_dependencies_only() {
        let mut builder = builder_with_object();
        builder.class("app.Main", |c| {
            c.field("helper", "app.Helper", FieldFlags::empty())
                .method("run", "(app.Arg)void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                    m.invoke_static("app.Util", "work", "()void")
                        .const_class("app.Literal[]");
                });
        });
        builder.class("app.Helper", |_| {});
        builder.class("app.Arg", |_| {});
        builder.class("app.Literal", |_| {});
        builder.class("app.Util", |c| {
            c.method("work", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.new_instance("app.Transitive");
            });
        });
        builder.class("app.Transitive", |_| {});
        let program = builder.build().unwrap();
        let token = |name: &str| program.class_by_name(name).unwrap().token;

        let info = MainDexInfo::compute(&program, [token("app.Main"), token("java.lang.Object")]).unwrap();

        assert_eq!(info.roots().len(), 1);
        for name in ["app.Helper", "app.Arg", "app.Literal", "app.Util"] {
            assert!(info.dependencies().contains(&token(name)), "{} missing", name);
        }
        assert!(!info.contains(token("app.Transitive")));
        assert!(!info.dependencies().contains(&token("app.Main")));
        assert_eq!(info.len(), 5);
    }
}

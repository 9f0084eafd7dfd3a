//! Shared fixtures for unit tests.

use crate::program::{MethodFlags, Program, ProgramBuilder};

/// A builder that already defines `java.lang.Object` as a library class.
///
/// `Object` declares no fields, so the first field of the first program class receives
/// `Token::field(0)`. Its only method is `<init>()void`.
pub(crate) fn builder_with_object() -> ProgramBuilder {
    let mut builder = ProgramBuilder::new();
    builder.library_class("java.lang.Object", |c| {
        c.no_superclass()
            .method("<init>", "()void", MethodFlags::PUBLIC, |_| {});
    });
    builder
}

/// `A.main()` allocating a `B extends A` and calling `virtualCall` through an `A` reference.
pub(crate) fn virtual_call_program() -> Program {
    let mut builder = builder_with_object();
    builder.class("app.A", |c| {
        c.init(|m| {
            m.invoke_direct("java.lang.Object", "<init>", "()void");
        })
        .method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
            m.construct("app.B").invoke_virtual("app.A", "virtualCall", "()void");
        })
        .method("virtualCall", "()void", MethodFlags::PUBLIC, |_| {});
    });
    builder.class("app.B", |c| {
        c.extends("app.A")
            .init(|m| {
                m.invoke_direct("app.A", "<init>", "()void");
            })
            .method("virtualCall", "()void", MethodFlags::PUBLIC, |_| {});
    });
    builder.build().expect("valid program")
}

//! Member resolution and virtual dispatch lookup.
//!
//! Implements the resolution rules of the target virtual machine for symbolic method and field
//! references, the runtime dispatch lookup for a given receiver type, and the access checks a
//! caller context must pass.

use std::collections::HashSet;

use crate::{
    program::{
        descriptor::package_of, ClassDef, FieldDef, FieldRef, InvokeKind, MethodDef, MethodRef,
        Program, Token, Visibility,
    },
    resolution::ClassHierarchy,
};

/// Outcome of resolving a symbolic method reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodResolution {
    /// The reference resolved to a method definition
    Found(Token),
    /// The referenced holder class has no definition
    ClassNotFound,
    /// No method with the referenced name and prototype exists in the hierarchy
    NoSuchMethod,
    /// The holder kind does not match the invocation kind (class vs. interface)
    IncompatibleClassChange,
}

impl MethodResolution {
    /// The resolved method, if any
    #[must_use]
    pub fn method(self) -> Option<Token> {
        match self {
            MethodResolution::Found(method) => Some(method),
            _ => None,
        }
    }
}

/// Outcome of resolving a symbolic field reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldResolution {
    /// The reference resolved to a field definition
    Found(Token),
    /// The referenced holder class has no definition
    ClassNotFound,
    /// No field with the referenced name and type exists in the hierarchy
    NoSuchField,
}

impl FieldResolution {
    /// The resolved field, if any
    #[must_use]
    pub fn field(self) -> Option<Token> {
        match self {
            FieldResolution::Found(field) => Some(field),
            _ => None,
        }
    }
}

/// Resolves a symbolic method reference for the given invocation kind.
///
/// Class references search the holder and its superclasses first and then the maximally
/// specific superinterface methods. Interface references search the interface, then the public
/// methods of `java.lang.Object`, then superinterfaces.
///
/// # Arguments
///
/// * `program` - The program holding the definitions
/// * `hierarchy` - Precomputed hierarchy of `program`
/// * `method` - The symbolic reference
/// * `kind` - Invocation kind the reference is used with
#[must_use]
pub fn resolve_method(
    program: &Program,
    hierarchy: &ClassHierarchy,
    method: &MethodRef,
    kind: InvokeKind,
) -> MethodResolution {
    let Some(holder) = program.class_by_symbol(method.holder) else {
        return MethodResolution::ClassNotFound;
    };

    match (kind, holder.is_interface()) {
        (InvokeKind::Virtual, true) | (InvokeKind::Interface, false) => {
            return MethodResolution::IncompatibleClassChange;
        }
        _ => {}
    }

    if holder.is_interface() {
        if let Some(found) = program.find_method(holder, method.name, method.proto) {
            return MethodResolution::Found(found.token);
        }
        let object = program
            .class_by_symbol(program.object_symbol())
            .and_then(|object| program.find_method(object, method.name, method.proto))
            .filter(|found| found.visibility() == Visibility::Public && !found.is_static());
        if let Some(found) = object {
            return MethodResolution::Found(found.token);
        }
    } else {
        let chain = std::iter::once(holder.token).chain(hierarchy.superclass_chain(holder.token));
        for class in chain.filter_map(|token| program.class(token)) {
            if let Some(found) = program.find_method(class, method.name, method.proto) {
                return MethodResolution::Found(found.token);
            }
        }
    }

    match maximally_specific_method(program, hierarchy, holder.token, method, false) {
        Some(found) => MethodResolution::Found(found),
        None => MethodResolution::NoSuchMethod,
    }
}

/// Resolves a symbolic field reference.
///
/// Searches the holder, then its superinterfaces recursively, then its superclass.
#[must_use]
pub fn resolve_field(program: &Program, hierarchy: &ClassHierarchy, field: &FieldRef) -> FieldResolution {
    let Some(holder) = program.class_by_symbol(field.holder) else {
        return FieldResolution::ClassNotFound;
    };

    let mut visited = HashSet::new();
    match lookup_field(program, hierarchy, holder, field, &mut visited) {
        Some(found) => FieldResolution::Found(found.token),
        None => FieldResolution::NoSuchField,
    }
}

fn lookup_field<'p>(
    program: &'p Program,
    hierarchy: &ClassHierarchy,
    class: &'p ClassDef,
    field: &FieldRef,
    visited: &mut HashSet<Token>,
) -> Option<&'p FieldDef> {
    if !visited.insert(class.token) {
        return None;
    }
    if let Some(found) = program.find_field(class, field.name, field.ty) {
        return Some(found);
    }

    for interface in &class.interfaces {
        if let Some(interface) = program.class_by_symbol(*interface) {
            if let Some(found) = lookup_field(program, hierarchy, interface, field, visited) {
                return Some(found);
            }
        }
    }

    hierarchy
        .superclass(class.token)
        .and_then(|superclass| program.class(superclass))
        .filter(|_| !class.is_interface())
        .and_then(|superclass| lookup_field(program, hierarchy, superclass, field, visited))
}

/// Finds the maximally specific superinterface method of `ty` matching `method`.
///
/// Candidates are non-private, non-static interface methods with the referenced name and
/// prototype. Candidates declared in a superinterface of another candidate's holder are
/// discarded. With `require_default` only non-abstract candidates are considered and the
/// result is `None` unless exactly one remains.
fn maximally_specific_method(
    program: &Program,
    hierarchy: &ClassHierarchy,
    ty: Token,
    method: &MethodRef,
    require_default: bool,
) -> Option<Token> {
    let mut candidates: Vec<&MethodDef> = hierarchy
        .all_supertypes(ty)
        .into_iter()
        .chain(std::iter::once(ty))
        .filter_map(|token| program.class(token))
        .filter(|class| class.is_interface())
        .filter_map(|class| program.find_method(class, method.name, method.proto))
        .filter(|found| !found.is_private() && !found.is_static())
        .collect();

    let holders: Vec<Token> = candidates.iter().map(|found| found.holder).collect();
    candidates.retain(|found| {
        !holders
            .iter()
            .any(|other| *other != found.holder && hierarchy.is_subtype_of(*other, found.holder))
    });
    candidates.sort_by_key(|found| found.token);

    let non_abstract: Vec<&MethodDef> = candidates
        .iter()
        .copied()
        .filter(|found| !found.is_abstract())
        .collect();

    if require_default {
        return match non_abstract.as_slice() {
            [single] => Some(single.token),
            _ => None,
        };
    }

    match non_abstract.as_slice() {
        [single] => Some(single.token),
        _ => candidates.first().map(|found| found.token),
    }
}

/// Looks up the method that runs when `resolved` is invoked on an instance of `ty`.
///
/// Walks `ty` and its superclasses for a declaration overriding `resolved`, then falls back to
/// the unique maximally specific default method. Returns `None` when dispatch would fail at
/// runtime (abstract target, ambiguous defaults, or no implementation).
#[must_use]
pub fn lookup_virtual_dispatch_target(
    program: &Program,
    hierarchy: &ClassHierarchy,
    ty: Token,
    resolved: Token,
) -> Option<Token> {
    let resolved_def = program.method(resolved)?;
    if resolved_def.is_private() || !resolved_def.is_virtual() {
        return Some(resolved);
    }

    let method = MethodRef {
        holder: program.class(resolved_def.holder)?.name,
        name: resolved_def.name,
        proto: resolved_def.proto,
    };

    let chain = std::iter::once(ty).chain(hierarchy.superclass_chain(ty));
    for class in chain.filter_map(|token| program.class(token)) {
        let Some(candidate) = program.find_method(class, method.name, method.proto) else {
            continue;
        };
        if candidate.is_static() || candidate.is_private() {
            continue;
        }
        if candidate.token == resolved || overrides(program, candidate, resolved_def) {
            return (!candidate.is_abstract()).then_some(candidate.token);
        }
    }

    maximally_specific_method(program, hierarchy, ty, &method, true)
}

/// Returns true if `candidate` overrides `resolved` under the visibility rules.
fn overrides(program: &Program, candidate: &MethodDef, resolved: &MethodDef) -> bool {
    match resolved.visibility() {
        Visibility::Public | Visibility::Protected => true,
        Visibility::PackagePrivate => match (program.class(candidate.holder), program.class(resolved.holder)) {
            (Some(a), Some(b)) => same_package(program, a, b),
            _ => false,
        },
        Visibility::Private => false,
    }
}

/// Returns true if both classes are declared in the same package
#[must_use]
pub fn same_package(program: &Program, a: &ClassDef, b: &ClassDef) -> bool {
    package_of(program.name(a.name)) == package_of(program.name(b.name))
}

/// Returns true if both classes belong to the same nest
#[must_use]
pub fn same_nest(a: &ClassDef, b: &ClassDef) -> bool {
    a.token == b.token || a.nest() == b.nest()
}

/// Checks whether a member with `visibility` declared in `holder` is accessible from `context`.
#[must_use]
pub fn is_accessible(
    program: &Program,
    hierarchy: &ClassHierarchy,
    visibility: Visibility,
    holder: &ClassDef,
    context: &ClassDef,
) -> bool {
    match visibility {
        Visibility::Public => true,
        Visibility::Private => same_nest(holder, context),
        Visibility::PackagePrivate => same_package(program, holder, context),
        Visibility::Protected => {
            same_package(program, holder, context)
                || hierarchy.is_subtype_of(context.token, holder.token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{program::MethodFlags, test::builder_with_object};

    fn method_ref(program: &Program, holder: &str, name: &str) -> MethodRef {
        MethodRef {
            holder: program.intern(holder),
            name: program.intern(name),
            proto: program.intern("()void"),
        }
    }

    fn method_token(program: &Program, holder: &str, name: &str) -> Token {
        let class = program.class_by_name(holder).unwrap();
        program
            .find_method(class, program.intern(name), program.intern("()void"))
            .unwrap()
            .token
    }

    fn dispatch_program() -> Program {
        let mut builder = builder_with_object();
        builder.class("a.I", |c| {
            c.interface();
            c.method("d", "()void", MethodFlags::PUBLIC, |_| {});
            c.abstract_method("m", "()void", MethodFlags::PUBLIC);
        });
        builder.class("a.A", |c| {
            c.abstract_class().implements("a.I");
            c.method("m", "()void", MethodFlags::PUBLIC, |_| {});
            c.method("p", "()void", MethodFlags::empty(), |_| {});
            c.method("s", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |_| {});
        });
        builder.class("a.B", |c| {
            c.extends("a.A");
            c.method("m", "()void", MethodFlags::PUBLIC, |_| {});
        });
        builder.class("b.C", |c| {
            c.extends("a.A");
            c.method("p", "()void", MethodFlags::empty(), |_| {});
        });
        builder.build().unwrap()
    }

    #[test]
    fn test_resolve_method_in_superclass() {
        let program = dispatch_program();
        let hierarchy = ClassHierarchy::new(&program);
        let reference = method_ref(&program, "a.B", "s");
        assert_eq!(
            resolve_method(&program, &hierarchy, &reference, InvokeKind::Static),
            MethodResolution::Found(method_token(&program, "a.A", "s"))
        );
    }

    #[test]
    fn test_resolve_method_default() {
        let program = dispatch_program();
        let hierarchy = ClassHierarchy::new(&program);
        let reference = method_ref(&program, "a.B", "d");
        assert_eq!(
            resolve_method(&program, &hierarchy, &reference, InvokeKind::Virtual),
            MethodResolution::Found(method_token(&program, "a.I", "d"))
        );
    }

    #[test]
    fn test_resolve_method_failures() {
        let program = dispatch_program();
        let hierarchy = ClassHierarchy::new(&program);

        let missing = method_ref(&program, "a.Missing", "m");
        assert_eq!(
            resolve_method(&program, &hierarchy, &missing, InvokeKind::Virtual),
            MethodResolution::ClassNotFound
        );

        let unknown = method_ref(&program, "a.B", "unknown");
        assert_eq!(
            resolve_method(&program, &hierarchy, &unknown, InvokeKind::Virtual),
            MethodResolution::NoSuchMethod
        );

        let interface = method_ref(&program, "a.I", "m");
        assert_eq!(
            resolve_method(&program, &hierarchy, &interface, InvokeKind::Virtual),
            MethodResolution::IncompatibleClassChange
        );
        assert_eq!(
            resolve_method(&program, &hierarchy, &interface, InvokeKind::Interface),
            MethodResolution::Found(method_token(&program, "a.I", "m"))
        );
    }

    #[test]
    fn test_dispatch_lookup() {
        let program = dispatch_program();
        let hierarchy = ClassHierarchy::new(&program);
        let b = program.class_by_name("a.B").unwrap().token;
        let c = program.class_by_name("b.C").unwrap().token;
        let i_m = method_token(&program, "a.I", "m");
        let i_d = method_token(&program, "a.I", "d");

        assert_eq!(
            lookup_virtual_dispatch_target(&program, &hierarchy, b, i_m),
            Some(method_token(&program, "a.B", "m"))
        );
        assert_eq!(
            lookup_virtual_dispatch_target(&program, &hierarchy, c, i_m),
            Some(method_token(&program, "a.A", "m"))
        );
        assert_eq!(
            lookup_virtual_dispatch_target(&program, &hierarchy, c, i_d),
            Some(i_d)
        );
    }

    #[test]
    fn test_package_private_not_overridden_across_packages() {
        let program = dispatch_program();
        let hierarchy = ClassHierarchy::new(&program);
        let c = program.class_by_name("b.C").unwrap().token;
        let a_p = method_token(&program, "a.A", "p");

        // b.C.p lives in another package and does not override a.A.p
        assert_eq!(
            lookup_virtual_dispatch_target(&program, &hierarchy, c, a_p),
            Some(a_p)
        );
    }

    #[test]
    fn test_accessibility() {
        let program = dispatch_program();
        let hierarchy = ClassHierarchy::new(&program);
        let a = program.class_by_name("a.A").unwrap();
        let b = program.class_by_name("a.B").unwrap();
        let c = program.class_by_name("b.C").unwrap();

        assert!(is_accessible(&program, &hierarchy, Visibility::PackagePrivate, a, b));
        assert!(!is_accessible(&program, &hierarchy, Visibility::PackagePrivate, a, c));
        assert!(is_accessible(&program, &hierarchy, Visibility::Protected, a, c));
        assert!(!is_accessible(&program, &hierarchy, Visibility::Private, a, b));
        assert!(is_accessible(&program, &hierarchy, Visibility::Private, a, a));
    }
}

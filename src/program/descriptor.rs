//! Helpers for the textual type and prototype descriptors used throughout a program.
//!
//! Types are written in source form: `com.example.Foo`, `int`, `com.example.Foo[][]`.
//! Method prototypes are written as `(param,param)return`, e.g. `(int,java.lang.String)void`.

/// Names of the primitive types, including `void`
pub const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// Returns true if `ty` names a primitive type
#[must_use]
pub fn is_primitive(ty: &str) -> bool {
    PRIMITIVES.contains(&ty)
}

/// Strips all array dimensions from `ty`.
///
/// ```rust
/// use shaker::program::descriptor::base_type;
///
/// assert_eq!(base_type("com.example.Foo[][]"), "com.example.Foo");
/// assert_eq!(base_type("int"), "int");
/// ```
#[must_use]
pub fn base_type(ty: &str) -> &str {
    let mut base = ty;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
    }
    base
}

/// Returns the class that a type reference resolves to, `None` for primitives and their arrays.
#[must_use]
pub fn referenced_class(ty: &str) -> Option<&str> {
    let base = base_type(ty);
    if base.is_empty() || is_primitive(base) {
        None
    } else {
        Some(base)
    }
}

/// Returns the package of a class name, the empty string for the default package.
#[must_use]
pub fn package_of(class: &str) -> &str {
    match class.rfind('.') {
        Some(pos) => &class[..pos],
        None => "",
    }
}

/// Splits a method prototype into its parameter types and its return type.
///
/// Returns `None` if the prototype is not of the form `(params)return`.
///
/// ```rust
/// use shaker::program::descriptor::split_proto;
///
/// let (params, ret) = split_proto("(int,com.example.A)void").unwrap();
/// assert_eq!(params, vec!["int", "com.example.A"]);
/// assert_eq!(ret, "void");
/// ```
#[must_use]
pub fn split_proto(proto: &str) -> Option<(Vec<&str>, &str)> {
    let rest = proto.strip_prefix('(')?;
    let close = rest.find(')')?;
    let params = &rest[..close];
    let ret = &rest[close + 1..];
    let params = if params.trim().is_empty() {
        Vec::new()
    } else {
        params.split(',').map(str::trim).collect()
    };
    Some((params, ret.trim()))
}

/// All class types mentioned by a prototype, in declaration order (return type last).
#[must_use]
pub fn proto_classes(proto: &str) -> Vec<&str> {
    match split_proto(proto) {
        Some((params, ret)) => params
            .into_iter()
            .chain(std::iter::once(ret))
            .filter_map(referenced_class)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_class() {
        assert_eq!(referenced_class("int[]"), None);
        assert_eq!(referenced_class("void"), None);
        assert_eq!(referenced_class("a.B[]"), Some("a.B"));
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("com.example.Foo"), "com.example");
        assert_eq!(package_of("Foo"), "");
    }

    #[test]
    fn test_split_proto() {
        assert_eq!(split_proto("()void"), Some((vec![], "void")));
        assert_eq!(split_proto("garbage"), None);
        assert_eq!(
            proto_classes("(int,a.B,c.D[])e.F"),
            vec!["a.B", "c.D", "e.F"]
        );
    }
}

//! Member predicates of class specifications.

use bitflags::bitflags;

use crate::{
    program::{descriptor, Annotation, FieldDef, FieldFlags, MethodDef, MethodFlags, Program},
    rules::{Captures, NamePattern},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Modifiers a member specification can require or forbid.
    ///
    /// Method and field flags share bit values in the binary encoding, so members are mapped
    /// into this common set before matching.
    pub struct MemberAccess: u32 {
        /// public
        const PUBLIC = 1 << 0;
        /// private
        const PRIVATE = 1 << 1;
        /// protected
        const PROTECTED = 1 << 2;
        /// static
        const STATIC = 1 << 3;
        /// final
        const FINAL = 1 << 4;
        /// synchronized (methods)
        const SYNCHRONIZED = 1 << 5;
        /// bridge (methods)
        const BRIDGE = 1 << 6;
        /// varargs (methods)
        const VARARGS = 1 << 7;
        /// native (methods)
        const NATIVE = 1 << 8;
        /// abstract (methods)
        const ABSTRACT = 1 << 9;
        /// volatile (fields)
        const VOLATILE = 1 << 10;
        /// transient (fields)
        const TRANSIENT = 1 << 11;
        /// synthetic
        const SYNTHETIC = 1 << 12;
    }
}

impl MemberAccess {
    /// Modifiers of a method
    #[must_use]
    pub fn of_method(flags: MethodFlags) -> Self {
        let pairs = [
            (MethodFlags::PUBLIC, MemberAccess::PUBLIC),
            (MethodFlags::PRIVATE, MemberAccess::PRIVATE),
            (MethodFlags::PROTECTED, MemberAccess::PROTECTED),
            (MethodFlags::STATIC, MemberAccess::STATIC),
            (MethodFlags::FINAL, MemberAccess::FINAL),
            (MethodFlags::SYNCHRONIZED, MemberAccess::SYNCHRONIZED),
            (MethodFlags::BRIDGE, MemberAccess::BRIDGE),
            (MethodFlags::VARARGS, MemberAccess::VARARGS),
            (MethodFlags::NATIVE, MemberAccess::NATIVE),
            (MethodFlags::ABSTRACT, MemberAccess::ABSTRACT),
            (MethodFlags::SYNTHETIC, MemberAccess::SYNTHETIC),
        ];
        pairs
            .into_iter()
            .filter(|(flag, _)| flags.contains(*flag))
            .fold(MemberAccess::empty(), |access, (_, bit)| access | bit)
    }

    /// Modifiers of a field
    #[must_use]
    pub fn of_field(flags: FieldFlags) -> Self {
        let pairs = [
            (FieldFlags::PUBLIC, MemberAccess::PUBLIC),
            (FieldFlags::PRIVATE, MemberAccess::PRIVATE),
            (FieldFlags::PROTECTED, MemberAccess::PROTECTED),
            (FieldFlags::STATIC, MemberAccess::STATIC),
            (FieldFlags::FINAL, MemberAccess::FINAL),
            (FieldFlags::VOLATILE, MemberAccess::VOLATILE),
            (FieldFlags::TRANSIENT, MemberAccess::TRANSIENT),
            (FieldFlags::SYNTHETIC, MemberAccess::SYNTHETIC),
        ];
        pairs
            .into_iter()
            .filter(|(flag, _)| flags.contains(*flag))
            .fold(MemberAccess::empty(), |access, (_, bit)| access | bit)
    }
}

/// Parameter list of a method specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgsPattern {
    /// Any parameter list (`...`)
    Any,
    /// Exactly these parameter types
    Exact(Vec<NamePattern>),
}

/// What kind of members a specification selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Every field and method except class initializers (`*`)
    AllMembers,
    /// Every method except class initializers (`<methods>`)
    AllMethods,
    /// Every field (`<fields>`)
    AllFields,
    /// Every instance initializer (`<init>`)
    Initializers,
    /// Methods by name, parameters and return type
    Method {
        /// Name pattern
        name: NamePattern,
        /// Parameter pattern
        args: ArgsPattern,
        /// Return type pattern, `None` for any
        ret: Option<NamePattern>,
    },
    /// Fields by name and type
    Field {
        /// Name pattern
        name: NamePattern,
        /// Type pattern, `None` for any
        ty: Option<NamePattern>,
    },
}

/// Predicate over the methods or fields of a class.
///
/// Wildcards capture in reading order: type or return type first, then the name, then the
/// parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSpec {
    kind: MemberKind,
    required: MemberAccess,
    forbidden: MemberAccess,
    annotation: Option<NamePattern>,
}

impl MemberSpec {
    fn with_kind(kind: MemberKind) -> Self {
        MemberSpec {
            kind,
            required: MemberAccess::empty(),
            forbidden: MemberAccess::empty(),
            annotation: None,
        }
    }

    /// All fields and methods
    #[must_use]
    pub fn all_members() -> Self {
        Self::with_kind(MemberKind::AllMembers)
    }

    /// All methods
    #[must_use]
    pub fn all_methods() -> Self {
        Self::with_kind(MemberKind::AllMethods)
    }

    /// All fields
    #[must_use]
    pub fn all_fields() -> Self {
        Self::with_kind(MemberKind::AllFields)
    }

    /// All instance initializers
    #[must_use]
    pub fn initializers() -> Self {
        Self::with_kind(MemberKind::Initializers)
    }

    /// Methods named like `name` with any parameters and return type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if `name` does not compile.
    pub fn method(name: &str) -> Result<Self> {
        Ok(Self::with_kind(MemberKind::Method {
            name: NamePattern::parse(name)?,
            args: ArgsPattern::Any,
            ret: None,
        }))
    }

    /// Methods matching a name, return type and parameter list.
    ///
    /// `args` is either `...` for any parameter list or a comma separated list of type
    /// patterns, and `ret` is a type pattern.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if any pattern does not compile.
    pub fn method_with(ret: &str, name: &str, args: &str) -> Result<Self> {
        let args = match args.trim() {
            "..." => ArgsPattern::Any,
            "" => ArgsPattern::Exact(Vec::new()),
            list => ArgsPattern::Exact(
                list.split(',')
                    .map(|arg| NamePattern::parse(arg.trim()))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(Self::with_kind(MemberKind::Method {
            name: NamePattern::parse(name)?,
            args,
            ret: Some(NamePattern::parse(ret)?),
        }))
    }

    /// Fields named like `name` of any type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if `name` does not compile.
    pub fn field(name: &str) -> Result<Self> {
        Ok(Self::with_kind(MemberKind::Field {
            name: NamePattern::parse(name)?,
            ty: None,
        }))
    }

    /// Fields matching a type and name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if any pattern does not compile.
    pub fn field_with(ty: &str, name: &str) -> Result<Self> {
        Ok(Self::with_kind(MemberKind::Field {
            name: NamePattern::parse(name)?,
            ty: Some(NamePattern::parse(ty)?),
        }))
    }

    /// Requires the given modifiers
    #[must_use]
    pub fn require(mut self, access: MemberAccess) -> Self {
        self.required |= access;
        self
    }

    /// Forbids the given modifiers
    #[must_use]
    pub fn forbid(mut self, access: MemberAccess) -> Self {
        self.forbidden |= access;
        self
    }

    /// Requires an annotation matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if `pattern` does not compile.
    pub fn annotated(mut self, pattern: &str) -> Result<Self> {
        self.annotation = Some(NamePattern::parse(pattern)?);
        Ok(self)
    }

    /// The member kind selected
    #[must_use]
    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    /// Returns true if the specification can match methods
    #[must_use]
    pub fn selects_methods(&self) -> bool {
        matches!(
            self.kind,
            MemberKind::AllMembers
                | MemberKind::AllMethods
                | MemberKind::Initializers
                | MemberKind::Method { .. }
        )
    }

    /// Returns true if the specification can match fields
    #[must_use]
    pub fn selects_fields(&self) -> bool {
        matches!(
            self.kind,
            MemberKind::AllMembers | MemberKind::AllFields | MemberKind::Field { .. }
        )
    }

    fn access_matches(&self, access: MemberAccess) -> bool {
        access.contains(self.required) && !access.intersects(self.forbidden)
    }

    fn annotation_matches(&self, program: &Program, annotations: &[Annotation]) -> bool {
        self.annotation.as_ref().is_none_or(|pattern| {
            annotations
                .iter()
                .any(|annotation| pattern.matches_name(program.name(annotation.ty)))
        })
    }

    /// Matches a method, appending wildcard captures on success.
    pub fn matches_method(&self, program: &Program, method: &MethodDef, captures: &mut Captures) -> bool {
        if method.is_class_initializer() && !self.names_class_initializer() {
            return false;
        }
        if !self.access_matches(MemberAccess::of_method(method.flags))
            || !self.annotation_matches(program, &method.annotations)
        {
            return false;
        }

        match &self.kind {
            MemberKind::AllMembers | MemberKind::AllMethods => true,
            MemberKind::Initializers => method.is_instance_initializer(),
            MemberKind::AllFields | MemberKind::Field { .. } => false,
            MemberKind::Method { name, args, ret } => {
                let Some((params, returns)) = descriptor::split_proto(program.name(method.proto))
                else {
                    return false;
                };

                let mark = captures.len();
                let matched = ret.as_ref().is_none_or(|ret| ret.matches(returns, captures))
                    && name.matches(program.name(method.name), captures)
                    && match args {
                        ArgsPattern::Any => true,
                        ArgsPattern::Exact(patterns) => {
                            patterns.len() == params.len()
                                && patterns
                                    .iter()
                                    .zip(&params)
                                    .all(|(pattern, param)| pattern.matches(param, captures))
                        }
                    };
                if !matched {
                    captures.truncate(mark);
                }
                matched
            }
        }
    }

    /// Matches a field, appending wildcard captures on success.
    pub fn matches_field(&self, program: &Program, field: &FieldDef, captures: &mut Captures) -> bool {
        if !self.access_matches(MemberAccess::of_field(field.flags))
            || !self.annotation_matches(program, &field.annotations)
        {
            return false;
        }

        match &self.kind {
            MemberKind::AllMembers | MemberKind::AllFields => true,
            MemberKind::Field { name, ty } => {
                let mark = captures.len();
                let matched = ty
                    .as_ref()
                    .is_none_or(|ty| ty.matches(program.name(field.ty), captures))
                    && name.matches(program.name(field.name), captures);
                if !matched {
                    captures.truncate(mark);
                }
                matched
            }
            _ => false,
        }
    }

    fn names_class_initializer(&self) -> bool {
        match &self.kind {
            MemberKind::Method { name, .. } => name.is_concrete() && name.matches_name("<clinit>"),
            _ => false,
        }
    }

    /// Returns true if the specification has no wildcards or back-references
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        let concrete = |pattern: &NamePattern| pattern.is_concrete();
        self.annotation.as_ref().is_none_or(concrete)
            && match &self.kind {
                MemberKind::Method { name, args, ret } => {
                    name.is_concrete()
                        && ret.as_ref().is_none_or(concrete)
                        && match args {
                            ArgsPattern::Any => true,
                            ArgsPattern::Exact(args) => args.iter().all(concrete),
                        }
                }
                MemberKind::Field { name, ty } => name.is_concrete() && ty.as_ref().is_none_or(concrete),
                _ => true,
            }
    }

    /// Replaces back-references by captured texts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRule`] if a back-reference exceeds `captures`.
    pub fn substitute(&self, captures: &Captures) -> Result<MemberSpec> {
        let substitute = |pattern: &NamePattern| pattern.substitute(captures);
        let kind = match &self.kind {
            MemberKind::Method { name, args, ret } => MemberKind::Method {
                name: substitute(name)?,
                args: match args {
                    ArgsPattern::Any => ArgsPattern::Any,
                    ArgsPattern::Exact(args) => {
                        ArgsPattern::Exact(args.iter().map(substitute).collect::<Result<_>>()?)
                    }
                },
                ret: ret.as_ref().map(substitute).transpose()?,
            },
            MemberKind::Field { name, ty } => MemberKind::Field {
                name: substitute(name)?,
                ty: ty.as_ref().map(substitute).transpose()?,
            },
            other => other.clone(),
        };
        Ok(MemberSpec {
            kind,
            required: self.required,
            forbidden: self.forbidden,
            annotation: self.annotation.as_ref().map(substitute).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{program::Token, test::builder_with_object};

    fn program() -> Program {
        let mut builder = builder_with_object();
        builder.class("a.A", |c| {
            c.field("count", "int", FieldFlags::PRIVATE)
                .field("name", "java.lang.String", FieldFlags::PUBLIC)
                .init(|_| {})
                .clinit(|_| {})
                .method("getName", "()java.lang.String", MethodFlags::PUBLIC, |_| {})
                .method("setName", "(java.lang.String)void", MethodFlags::PUBLIC, |_| {})
                .method("helper", "(int,long)void", MethodFlags::PRIVATE | MethodFlags::STATIC, |_| {});
        });
        builder.build().unwrap()
    }

    fn method<'a>(program: &'a Program, name: &str) -> &'a MethodDef {
        program
            .methods()
            .iter()
            .find(|method| program.name(method.name) == name)
            .unwrap()
    }

    #[test]
    fn test_all_methods_skip_class_initializer() {
        let program = program();
        let spec = MemberSpec::all_methods();
        assert!(spec.matches_method(&program, method(&program, "<init>"), &mut Captures::new()));
        assert!(!spec.matches_method(&program, method(&program, "<clinit>"), &mut Captures::new()));
        assert!(spec.matches_method(&program, method(&program, "getName"), &mut Captures::new()));
        assert!(!MemberSpec::all_fields().matches_method(&program, method(&program, "getName"), &mut Captures::new()));
    }

    #[test]
    fn test_method_pattern_captures() {
        let program = program();
        let spec = MemberSpec::method_with("***", "get*", "").unwrap();
        let mut captures = Captures::new();
        assert!(spec.matches_method(&program, method(&program, "getName"), &mut captures));
        assert_eq!(captures.iter().collect::<Vec<_>>(), vec!["java.lang.String", "Name"]);

        let setter = MemberSpec::method_with("void", "set<2>", "...").unwrap();
        assert!(setter.matches_method(&program, method(&program, "setName"), &mut captures));
        assert!(!setter.matches_method(&program, method(&program, "helper"), &mut captures));
        assert_eq!(captures.len(), 2);
    }

    #[test]
    fn test_argument_patterns() {
        let program = program();
        let helper = method(&program, "helper");
        assert!(MemberSpec::method_with("void", "helper", "int,%").unwrap().matches_method(&program, helper, &mut Captures::new()));
        assert!(!MemberSpec::method_with("void", "helper", "int").unwrap().matches_method(&program, helper, &mut Captures::new()));
        assert!(MemberSpec::method_with("void", "helper", "...").unwrap().matches_method(&program, helper, &mut Captures::new()));
    }

    #[test]
    fn test_access_filters() {
        let program = program();
        let statics = MemberSpec::all_methods().require(MemberAccess::STATIC);
        assert!(statics.matches_method(&program, method(&program, "helper"), &mut Captures::new()));
        assert!(!statics.matches_method(&program, method(&program, "getName"), &mut Captures::new()));

        let public_fields = MemberSpec::all_fields().forbid(MemberAccess::PRIVATE);
        let count = program.field(Token::field(0)).unwrap();
        let name = program.field(Token::field(1)).unwrap();
        assert!(!public_fields.matches_field(&program, count, &mut Captures::new()));
        assert!(public_fields.matches_field(&program, name, &mut Captures::new()));
    }

    #[test]
    fn test_field_type_pattern() {
        let program = program();
        let spec = MemberSpec::field_with("%", "*").unwrap();
        let mut captures = Captures::new();
        assert!(spec.matches_field(&program, program.field(Token::field(0)).unwrap(), &mut captures));
        assert_eq!(captures.iter().collect::<Vec<_>>(), vec!["int", "count"]);
        assert!(!spec.matches_field(&program, program.field(Token::field(1)).unwrap(), &mut captures));
    }

    #[test]
    fn test_substitute_member() {
        let spec = MemberSpec::method("get<1>").unwrap();
        assert!(!spec.is_concrete());
        let mut captures = Captures::new();
        assert!(NamePattern::parse("*").unwrap().matches("Name", &mut captures));
        let concrete = spec.substitute(&captures).unwrap();
        assert!(concrete.is_concrete());
        assert_eq!(
            concrete.kind(),
            &MemberKind::Method {
                name: NamePattern::literal("getName"),
                args: ArgsPattern::Any,
                ret: None,
            }
        );
    }
}

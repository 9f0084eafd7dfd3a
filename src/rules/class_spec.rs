//! Class predicates of keep, conditional and diagnostic rules.

use crate::{
    program::{Annotation, ClassDef, ClassFlags, Program},
    resolution::ClassHierarchy,
    rules::{Captures, MemberSpec, NamePattern},
    Result,
};

/// Kind of class a specification selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ClassTypeFilter {
    /// Any class or interface (`class`)
    Class,
    /// Interfaces, including annotation interfaces (`interface`)
    Interface,
    /// Enum classes (`enum`)
    Enum,
    /// Annotation interfaces (`@interface`)
    Annotation,
}

impl ClassTypeFilter {
    fn matches(self, class: &ClassDef) -> bool {
        match self {
            ClassTypeFilter::Class => true,
            ClassTypeFilter::Interface => class.is_interface(),
            ClassTypeFilter::Enum => class.is_enum(),
            ClassTypeFilter::Annotation => class.is_annotation(),
        }
    }
}

/// One entry of a class name list, possibly negated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameFilter {
    /// The name pattern
    pub pattern: NamePattern,
    /// Whether a match excludes the class
    pub negated: bool,
}

/// `extends` / `implements` clause of a class specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InheritanceSpec {
    /// Pattern a transitive supertype name must match
    pub pattern: NamePattern,
    /// Annotation the matching supertype must carry
    pub annotation: Option<NamePattern>,
}

/// Predicate over classes and their members.
///
/// # Examples
///
/// ```rust
/// use shaker::rules::{ClassSpec, MemberSpec};
///
/// // class com.foo.** extends com.foo.Base { <methods>; }
/// let spec = ClassSpec::named("com.foo.**")?
///     .extends("com.foo.Base")?
///     .member(MemberSpec::all_methods());
/// assert!(!spec.is_concrete());
/// # Ok::<(), shaker::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSpec {
    type_filter: ClassTypeFilter,
    type_negated: bool,
    required: ClassFlags,
    forbidden: ClassFlags,
    annotation: Option<NamePattern>,
    names: Vec<NameFilter>,
    inheritance: Option<InheritanceSpec>,
    members: Vec<MemberSpec>,
}

impl ClassSpec {
    /// Specification matching every class
    #[must_use]
    pub fn any() -> Self {
        ClassSpec {
            type_filter: ClassTypeFilter::Class,
            type_negated: false,
            required: ClassFlags::empty(),
            forbidden: ClassFlags::empty(),
            annotation: None,
            names: vec![NameFilter {
                pattern: NamePattern::any(),
                negated: false,
            }],
            inheritance: None,
            members: Vec::new(),
        }
    }

    /// Specification matching classes named like `pattern`.
    ///
    /// A comma separated list is accepted; entries prefixed with `!` exclude classes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if a pattern does not compile.
    pub fn named(pattern: &str) -> Result<Self> {
        let names = pattern
            .split(',')
            .map(str::trim)
            .map(|entry| match entry.strip_prefix('!') {
                Some(negated) => NamePattern::parse(negated).map(|pattern| NameFilter {
                    pattern,
                    negated: true,
                }),
                None => NamePattern::parse(entry).map(|pattern| NameFilter {
                    pattern,
                    negated: false,
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ClassSpec {
            names,
            ..Self::any()
        })
    }

    /// Restricts the kind of class
    #[must_use]
    pub fn of_type(mut self, filter: ClassTypeFilter) -> Self {
        self.type_filter = filter;
        self.type_negated = false;
        self
    }

    /// Excludes a kind of class
    #[must_use]
    pub fn not_of_type(mut self, filter: ClassTypeFilter) -> Self {
        self.type_filter = filter;
        self.type_negated = true;
        self
    }

    /// Requires the given class modifiers
    #[must_use]
    pub fn require(mut self, flags: ClassFlags) -> Self {
        self.required |= flags;
        self
    }

    /// Forbids the given class modifiers
    #[must_use]
    pub fn forbid(mut self, flags: ClassFlags) -> Self {
        self.forbidden |= flags;
        self
    }

    /// Requires a class annotation matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if `pattern` does not compile.
    pub fn annotated(mut self, pattern: &str) -> Result<Self> {
        self.annotation = Some(NamePattern::parse(pattern)?);
        Ok(self)
    }

    /// Requires a transitive supertype named like `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if `pattern` does not compile.
    pub fn extends(mut self, pattern: &str) -> Result<Self> {
        self.inheritance = Some(InheritanceSpec {
            pattern: NamePattern::parse(pattern)?,
            annotation: None,
        });
        Ok(self)
    }

    /// Requires a transitive supertype named like `pattern` carrying `annotation`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if a pattern does not compile.
    pub fn extends_annotated(mut self, pattern: &str, annotation: &str) -> Result<Self> {
        self.inheritance = Some(InheritanceSpec {
            pattern: NamePattern::parse(pattern)?,
            annotation: Some(NamePattern::parse(annotation)?),
        });
        Ok(self)
    }

    /// Adds a member specification
    #[must_use]
    pub fn member(mut self, member: MemberSpec) -> Self {
        self.members.push(member);
        self
    }

    /// The member specifications
    #[must_use]
    pub fn members(&self) -> &[MemberSpec] {
        &self.members
    }

    /// The class name filters
    #[must_use]
    pub fn names(&self) -> &[NameFilter] {
        &self.names
    }

    /// The single class name this specification selects, if it names exactly one class
    #[must_use]
    pub fn concrete_name(&self) -> Option<String> {
        match self.names.as_slice() {
            [NameFilter {
                pattern,
                negated: false,
            }] if pattern.is_concrete() => Some(pattern.to_string()),
            _ => None,
        }
    }

    /// Returns true if no pattern of the specification contains wildcards or back-references
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.names.iter().all(|filter| filter.pattern.is_concrete())
            && self.annotation.as_ref().is_none_or(NamePattern::is_concrete)
            && self.inheritance.as_ref().is_none_or(|inheritance| {
                inheritance.pattern.is_concrete()
                    && inheritance.annotation.as_ref().is_none_or(NamePattern::is_concrete)
            })
            && self.members.iter().all(MemberSpec::is_concrete)
    }

    /// Matches the class-level predicate against `class`, appending wildcard captures.
    ///
    /// Members are not considered; see [`ClassSpec::members`].
    pub fn matches_class(
        &self,
        program: &Program,
        hierarchy: &ClassHierarchy,
        class: &ClassDef,
        captures: &mut Captures,
    ) -> bool {
        self.matches_class_named(program, hierarchy, class, program.name(class.name), captures)
    }

    /// Matches the class-level predicate against `class` as if it were named `name`.
    ///
    /// Used for classes merged into `class` by earlier passes, which keep satisfying rules that
    /// named them.
    pub fn matches_class_named(
        &self,
        program: &Program,
        hierarchy: &ClassHierarchy,
        class: &ClassDef,
        name: &str,
        captures: &mut Captures,
    ) -> bool {
        if self.type_filter.matches(class) == self.type_negated {
            return false;
        }
        if !class.flags.contains(self.required) || class.flags.intersects(self.forbidden) {
            return false;
        }
        if let Some(annotation) = &self.annotation {
            if !has_annotation(program, annotation, &class.annotations) {
                return false;
            }
        }

        let mark = captures.len();
        if !self.name_matches(name, captures) {
            return false;
        }
        if let Some(inheritance) = &self.inheritance {
            if !Self::inheritance_matches(program, hierarchy, class, inheritance, captures) {
                captures.truncate(mark);
                return false;
            }
        }
        true
    }

    fn name_matches(&self, name: &str, captures: &mut Captures) -> bool {
        for filter in &self.names {
            if filter.negated {
                if filter.pattern.matches_name(name) {
                    return false;
                }
            } else if filter.pattern.matches(name, captures) {
                return true;
            }
        }
        self.names.iter().all(|filter| filter.negated)
    }

    fn inheritance_matches(
        program: &Program,
        hierarchy: &ClassHierarchy,
        class: &ClassDef,
        inheritance: &InheritanceSpec,
        captures: &mut Captures,
    ) -> bool {
        let defined = hierarchy
            .all_supertypes(class.token)
            .into_iter()
            .filter_map(|token| program.class(token));
        for supertype in defined {
            let annotated = inheritance
                .annotation
                .as_ref()
                .is_none_or(|annotation| has_annotation(program, annotation, &supertype.annotations));
            if annotated && inheritance.pattern.matches(program.name(supertype.name), captures) {
                return true;
            }
        }

        if inheritance.annotation.is_some() {
            return false;
        }
        let with_missing = std::iter::once(class.token).chain(hierarchy.all_supertypes(class.token));
        for token in with_missing {
            for missing in hierarchy.missing_supertypes(token) {
                if inheritance.pattern.matches(program.name(*missing), captures) {
                    return true;
                }
            }
        }
        false
    }

    /// Replaces back-references by captured texts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRule`] if a back-reference exceeds `captures`.
    pub fn substitute(&self, captures: &Captures) -> Result<ClassSpec> {
        let substitute = |pattern: &NamePattern| pattern.substitute(captures);
        Ok(ClassSpec {
            type_filter: self.type_filter,
            type_negated: self.type_negated,
            required: self.required,
            forbidden: self.forbidden,
            annotation: self.annotation.as_ref().map(substitute).transpose()?,
            names: self
                .names
                .iter()
                .map(|filter| -> Result<NameFilter> {
                    Ok(NameFilter {
                        pattern: substitute(&filter.pattern)?,
                        negated: filter.negated,
                    })
                })
                .collect::<Result<_>>()?,
            inheritance: self
                .inheritance
                .as_ref()
                .map(|inheritance| -> Result<InheritanceSpec> {
                    Ok(InheritanceSpec {
                        pattern: substitute(&inheritance.pattern)?,
                        annotation: inheritance.annotation.as_ref().map(substitute).transpose()?,
                    })
                })
                .transpose()?,
            members: self
                .members
                .iter()
                .map(|member| member.substitute(captures))
                .collect::<Result<_>>()?,
        })
    }
}

fn has_annotation(program: &Program, pattern: &NamePattern, annotations: &[Annotation]) -> bool {
    annotations
        .iter()
        .any(|annotation| pattern.matches_name(program.name(annotation.ty)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::builder_with_object;

    fn program() -> Program {
        let mut builder = builder_with_object();
        builder
            .class("com.foo.Base", |c| {
                c.abstract_class().annotate("com.foo.Marker", |_| {});
            })
            .class("com.foo.Impl", |c| {
                c.extends("com.foo.Base").final_class();
            })
            .class("com.foo.Api", |c| {
                c.interface();
            })
            .class("com.bar.Plugin", |c| {
                c.extends("org.missing.Parent").implements("com.foo.Api");
            })
            .class("com.foo.Color", |c| {
                c.enum_class();
            });
        builder.build().unwrap()
    }

    fn matches(spec: &ClassSpec, program: &Program, name: &str) -> bool {
        let hierarchy = ClassHierarchy::new(program);
        let class = program.class_by_name(name).unwrap();
        spec.matches_class(program, &hierarchy, class, &mut Captures::new())
    }

    #[test]
    fn test_name_lists_and_negation() {
        let program = program();
        let spec = ClassSpec::named("!com.foo.Impl,com.foo.**").unwrap();
        assert!(matches(&spec, &program, "com.foo.Base"));
        assert!(!matches(&spec, &program, "com.foo.Impl"));
        assert!(!matches(&spec, &program, "com.bar.Plugin"));

        let only_negated = ClassSpec::named("!com.foo.**").unwrap();
        assert!(matches(&only_negated, &program, "com.bar.Plugin"));
        assert!(!matches(&only_negated, &program, "com.foo.Api"));
    }

    #[test]
    fn test_type_and_flags() {
        let program = program();
        let interfaces = ClassSpec::any().of_type(ClassTypeFilter::Interface);
        assert!(matches(&interfaces, &program, "com.foo.Api"));
        assert!(!matches(&interfaces, &program, "com.foo.Impl"));

        let not_interfaces = ClassSpec::any().not_of_type(ClassTypeFilter::Interface);
        assert!(matches(&not_interfaces, &program, "com.foo.Impl"));

        let enums = ClassSpec::any().of_type(ClassTypeFilter::Enum);
        assert!(matches(&enums, &program, "com.foo.Color"));

        let finals = ClassSpec::any().require(ClassFlags::FINAL);
        assert!(matches(&finals, &program, "com.foo.Impl"));
        assert!(!matches(&finals, &program, "com.foo.Base"));
        let non_abstract = ClassSpec::any().forbid(ClassFlags::ABSTRACT);
        assert!(!matches(&non_abstract, &program, "com.foo.Base"));
    }

    #[test]
    fn test_inheritance() {
        let program = program();
        let spec = ClassSpec::any().extends("com.foo.Base").unwrap();
        assert!(matches(&spec, &program, "com.foo.Impl"));
        assert!(!matches(&spec, &program, "com.foo.Base"));

        let annotated = ClassSpec::any()
            .extends_annotated("**", "com.foo.Marker")
            .unwrap();
        assert!(matches(&annotated, &program, "com.foo.Impl"));
        assert!(!matches(&annotated, &program, "com.bar.Plugin"));

        let missing = ClassSpec::any().extends("org.missing.*").unwrap();
        assert!(matches(&missing, &program, "com.bar.Plugin"));

        let implements = ClassSpec::any().extends("com.foo.Api").unwrap();
        assert!(matches(&implements, &program, "com.bar.Plugin"));
    }

    #[test]
    fn test_annotation_filter() {
        let program = program();
        let spec = ClassSpec::any().annotated("com.foo.*").unwrap();
        assert!(matches(&spec, &program, "com.foo.Base"));
        assert!(!matches(&spec, &program, "com.foo.Impl"));
    }

    #[test]
    fn test_captures_and_merged_names() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let spec = ClassSpec::named("com.*.Impl").unwrap();
        let class = program.class_by_name("com.foo.Impl").unwrap();

        let mut captures = Captures::new();
        assert!(spec.matches_class(&program, &hierarchy, class, &mut captures));
        assert_eq!(captures.get(1), Some("foo"));

        let merged = ClassSpec::named("com.old.Impl").unwrap();
        assert!(!merged.matches_class(&program, &hierarchy, class, &mut Captures::new()));
        assert!(merged.matches_class_named(&program, &hierarchy, class, "com.old.Impl", &mut Captures::new()));
    }

    #[test]
    fn test_substitute_and_concrete_name() {
        let spec = ClassSpec::named("com.foo.<1>Impl").unwrap();
        assert_eq!(spec.concrete_name(), None);
        let mut captures = Captures::new();
        assert!(NamePattern::parse("*").unwrap().matches("Service", &mut captures));
        let concrete = spec.substitute(&captures).unwrap();
        assert!(concrete.is_concrete());
        assert_eq!(concrete.concrete_name().as_deref(), Some("com.foo.ServiceImpl"));
    }
}

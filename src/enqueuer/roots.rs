//! Root set construction: matching rules against all program classes.
//!
//! Matching is independent per class and runs on the rayon pool. Matches are gathered in an
//! append-only [`boxcar::Vec`] and sorted by rule and class before they are folded into
//! [`DependentMinimumKeepInfo`], so the resulting keep information and the reasons attached to
//! it do not depend on scheduling.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::{
    config::ShakerConfig,
    enqueuer::Mode,
    keepinfo::{DependentMinimumKeepInfo, KeepClassJoiner, KeepPrecondition},
    program::{descriptor, ClassDef, Program, Token},
    resolution::ClassHierarchy,
    rules::{Captures, ClassSpec, ConstraintKind, KeepModifiers, KeepRule, KeepRuleKind, RuleId, RuleSet},
};

/// A class matched by a class specification, with the members its member specs selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMatch {
    /// The matched class
    pub class: Token,
    /// Selected methods in token order
    pub methods: Vec<Token>,
    /// Selected fields in token order
    pub fields: Vec<Token>,
}

/// Matches `spec` against `class`.
///
/// Each member spec is matched with a copy of the class-level captures, so back-references in
/// member patterns see the class name wildcards. With `require_all_members`, a member spec
/// that selects nothing rejects the class (`-keepclasseswithmembers`).
#[must_use]
pub fn match_class(
    program: &Program,
    hierarchy: &ClassHierarchy,
    spec: &ClassSpec,
    class: &ClassDef,
    require_all_members: bool,
) -> Option<ClassMatch> {
    let mut captures = Captures::new();
    if !spec.matches_class(program, hierarchy, class, &mut captures) {
        return None;
    }

    let mut methods = BTreeSet::new();
    let mut fields = BTreeSet::new();
    for member in spec.members() {
        let mut selected = false;
        if member.selects_methods() {
            for method in program.methods_of(class) {
                if member.matches_method(program, method, &mut captures.clone()) {
                    methods.insert(method.token);
                    selected = true;
                }
            }
        }
        if member.selects_fields() {
            for field in program.fields_of(class) {
                if member.matches_field(program, field, &mut captures.clone()) {
                    fields.insert(field.token);
                    selected = true;
                }
            }
        }
        if require_all_members && !selected {
            return None;
        }
    }

    Some(ClassMatch {
        class: class.token,
        methods: methods.into_iter().collect(),
        fields: fields.into_iter().collect(),
    })
}

/// Matches `spec` against every program class in parallel, in class order.
#[must_use]
pub fn match_program(
    program: &Program,
    hierarchy: &ClassHierarchy,
    spec: &ClassSpec,
    require_all_members: bool,
) -> Vec<ClassMatch> {
    let mut matches: Vec<ClassMatch> = program
        .classes()
        .par_iter()
        .filter(|class| class.is_program())
        .filter_map(|class| match_class(program, hierarchy, spec, class, require_all_members))
        .collect();
    matches.sort_by_key(|found| found.class);
    matches
}

/// Minimum keep information implied by one keep rule over the whole program.
///
/// The matched class of a `-keep` or `-keepclasseswithmembers` rule is kept unconditionally;
/// its matched members are guarded by [`KeepRule::member_precondition`].
#[must_use]
pub fn evaluate_keep_rule(
    program: &Program,
    hierarchy: &ClassHierarchy,
    id: RuleId,
    rule: &KeepRule,
) -> DependentMinimumKeepInfo {
    let mut dependent = DependentMinimumKeepInfo::new();
    let require_all = rule.kind == KeepRuleKind::KeepClassesWithMembers;
    for found in match_program(program, hierarchy, &rule.spec, require_all) {
        record_keep_match(program, &mut dependent, id, rule, &found);
    }
    dependent
}

fn record_keep_match(
    program: &Program,
    dependent: &mut DependentMinimumKeepInfo,
    id: RuleId,
    rule: &KeepRule,
    found: &ClassMatch,
) {
    if rule.keeps_class() {
        dependent
            .get_or_create(KeepPrecondition::Unconditional)
            .class_joiner(found.class)
            .merge(&rule.minimum_keep_info(id));
    }

    if !found.methods.is_empty() || !found.fields.is_empty() {
        let members = dependent.get_or_create(rule.member_precondition(found.class));
        for method in &found.methods {
            members.method_joiner(*method).merge(&rule.minimum_keep_info(id));
        }
        for field in &found.fields {
            members.field_joiner(*field).merge(&rule.minimum_keep_info(id));
        }
    }

    if rule.modifiers.contains(KeepModifiers::INCLUDE_DESCRIPTOR_CLASSES) {
        let mut names = Vec::new();
        for method in found.methods.iter().filter_map(|method| program.method(*method)) {
            names.extend(descriptor::proto_classes(program.name(method.proto)));
        }
        for field in found.fields.iter().filter_map(|field| program.field(*field)) {
            names.extend(descriptor::referenced_class(program.name(field.ty)));
        }

        let mut joiner = KeepClassJoiner::new();
        joiner.disallow_minification().add_rule(id);
        let unconditional = dependent.get_or_create(KeepPrecondition::Unconditional);
        for class in names.into_iter().filter_map(|name| program.class_by_name(name)) {
            if class.is_program() {
                unconditional.class_joiner(class.token).merge(&joiner);
            }
        }
    }
}

/// Everything a pass starts from.
#[derive(Debug, Clone, Default)]
pub struct RootSet {
    /// Rule requirements, unconditional or guarded by class liveness
    pub dependent: DependentMinimumKeepInfo,
    /// Methods matched by `-assumenosideeffects`
    pub assume_no_side_effects: BTreeSet<Token>,
    /// Items named by `-whyareyoukeeping`
    pub why_are_you_keeping: Vec<Token>,
}

/// Builds the [`RootSet`] of a pass from the rules.
pub struct RootSetBuilder<'a> {
    program: &'a Program,
    hierarchy: &'a ClassHierarchy,
    rules: &'a RuleSet,
    config: &'a ShakerConfig,
    mode: Mode,
}

impl<'a> RootSetBuilder<'a> {
    /// Creates a builder for one pass
    #[must_use]
    pub fn new(
        program: &'a Program,
        hierarchy: &'a ClassHierarchy,
        rules: &'a RuleSet,
        config: &'a ShakerConfig,
        mode: Mode,
    ) -> Self {
        RootSetBuilder {
            program,
            hierarchy,
            rules,
            config,
            mode,
        }
    }

    /// Matches every rule relevant to the mode against the program.
    ///
    /// Keep rules (main-dex rules in [`Mode::MainDexTracing`]) are matched in parallel per
    /// class; constraint, check-discard and why-are-you-keeping requests follow. With shrinking
    /// disabled, every program item is pinned as an implicit root.
    #[must_use]
    pub fn build(self) -> RootSet {
        let mut roots = RootSet::default();

        let keep_rules: Vec<(RuleId, &KeepRule)> = if self.mode.is_main_dex_tracing() {
            self.rules.main_dex_rules().collect()
        } else {
            self.rules.keep_rules().collect()
        };

        let matches = boxcar::Vec::new();
        self.program
            .classes()
            .par_iter()
            .filter(|class| class.is_program())
            .for_each(|class| {
                for (id, rule) in &keep_rules {
                    let require_all = rule.kind == KeepRuleKind::KeepClassesWithMembers;
                    if let Some(found) = match_class(self.program, self.hierarchy, &rule.spec, class, require_all) {
                        matches.push((*id, found));
                    }
                }
            });

        let mut matches: Vec<(RuleId, ClassMatch)> = matches.into_iter().collect();
        matches.sort_by_key(|(id, found)| (*id, found.class));
        for (id, found) in &matches {
            if let Some((_, rule)) = keep_rules.iter().find(|(rule_id, _)| rule_id == id) {
                record_keep_match(self.program, &mut roots.dependent, *id, rule, found);
            }
        }

        if self.mode.is_main_dex_tracing() {
            return roots;
        }

        self.add_constraint_rules(&mut roots);
        self.add_check_discard(&mut roots);
        self.add_why_are_you_keeping(&mut roots);
        if !self.config.shrinking {
            self.pin_everything(&mut roots);
        }
        roots
    }

    fn add_constraint_rules(&self, roots: &mut RootSet) {
        for (id, rule) in self.rules.constraint_rules() {
            let unconditional = roots.dependent.get_or_create(KeepPrecondition::Unconditional);
            for found in match_program(self.program, self.hierarchy, &rule.spec, false) {
                if rule.targets_classes() {
                    unconditional.class_joiner(found.class).merge(&rule.joiner(id));
                    continue;
                }
                for method in &found.methods {
                    unconditional.method_joiner(*method).merge(&rule.joiner(id));
                    if rule.kind == ConstraintKind::AssumeNoSideEffects {
                        roots.assume_no_side_effects.insert(*method);
                    }
                }
                for field in &found.fields {
                    unconditional.field_joiner(*field).merge(&rule.joiner(id));
                }
            }
        }
    }

    fn add_check_discard(&self, roots: &mut RootSet) {
        let unconditional = roots.dependent.get_or_create(KeepPrecondition::Unconditional);
        for spec in self.rules.check_discard() {
            for found in match_program(self.program, self.hierarchy, spec, false) {
                if spec.members().is_empty() {
                    unconditional.class_joiner(found.class).set_check_discarded();
                    continue;
                }
                for method in &found.methods {
                    unconditional.method_joiner(*method).set_check_discarded();
                }
                for field in &found.fields {
                    unconditional.field_joiner(*field).set_check_discarded();
                }
            }
        }
    }

    fn add_why_are_you_keeping(&self, roots: &mut RootSet) {
        for spec in self.rules.why_are_you_keeping() {
            for found in match_program(self.program, self.hierarchy, spec, false) {
                if spec.members().is_empty() {
                    roots.why_are_you_keeping.push(found.class);
                } else {
                    roots.why_are_you_keeping.extend(found.methods.iter().chain(&found.fields));
                }
            }
        }
    }

    fn pin_everything(&self, roots: &mut RootSet) {
        let unconditional = roots.dependent.get_or_create(KeepPrecondition::Unconditional);
        for class in self.program.program_classes() {
            unconditional.class_joiner(class.token).pin();
            for method in &class.methods {
                unconditional.method_joiner(*method).pin();
            }
            for field in &class.fields {
                unconditional.field_joiner(*field).pin();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::{FieldFlags, MethodFlags},
        rules::{ConstraintRule, MemberSpec},
        test::builder_with_object,
    };

    fn program() -> Program {
        let mut builder = builder_with_object();
        builder.class("com.foo.Bar", |c| {
            c.field("count", "int", FieldFlags::PRIVATE)
                .method("run", "(com.foo.Arg)void", MethodFlags::PUBLIC, |_| {})
                .method("stop", "()void", MethodFlags::PUBLIC, |_| {});
        });
        builder.class("com.foo.Arg", |_| {});
        builder.class("com.other.Baz", |c| {
            c.method("run", "()void", MethodFlags::PUBLIC, |_| {});
        });
        builder.build().unwrap()
    }

    #[test]
    fn test_keep_class_members_is_guarded() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let bar = program.class_by_name("com.foo.Bar").unwrap();

        let rule = KeepRule::keep_class_members(
            ClassSpec::named("com.foo.*").unwrap().member(MemberSpec::method("run").unwrap()),
        );
        let dependent = evaluate_keep_rule(&program, &hierarchy, RuleId::new(0), &rule);

        assert!(dependent.get(KeepPrecondition::Unconditional).is_none());
        let guarded = dependent.get(KeepPrecondition::ClassLive(bar.token)).unwrap();
        assert_eq!(guarded.methods().count(), 1);
        assert!(guarded.methods().all(|(_, joiner)| joiner.is_pinned()));
    }

    #[test]
    fn test_keep_classes_with_members_requires_every_member() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let spec = ClassSpec::named("com.**")
            .unwrap()
            .member(MemberSpec::method("run").unwrap())
            .member(MemberSpec::method("stop").unwrap());

        let found = match_program(&program, &hierarchy, &spec, true);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class, program.class_by_name("com.foo.Bar").unwrap().token);
        assert_eq!(found[0].methods.len(), 2);
        assert_eq!(match_program(&program, &hierarchy, &spec, false).len(), 2);
    }

    #[test]
    fn test_build_collects_constraints_and_descriptor_classes() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let mut rules = RuleSet::new();
        rules.add_keep(
            KeepRule::keep(ClassSpec::named("com.foo.Bar").unwrap().member(MemberSpec::method("run").unwrap()))
                .with_modifiers(KeepModifiers::INCLUDE_DESCRIPTOR_CLASSES),
        );
        rules.add_constraint(ConstraintRule::new(
            ConstraintKind::AssumeNoSideEffects,
            ClassSpec::named("com.other.Baz").unwrap().member(MemberSpec::all_methods()),
        ));
        rules.add_check_discard(ClassSpec::named("com.other.Baz").unwrap());

        let config = ShakerConfig::default();
        let roots = RootSetBuilder::new(&program, &hierarchy, &rules, &config, Mode::InitialTreeShaking).build();

        let unconditional = roots.dependent.get(KeepPrecondition::Unconditional).unwrap();
        let arg = program.class_by_name("com.foo.Arg").unwrap().token;
        let (_, arg_joiner) = unconditional.classes().find(|(token, _)| **token == arg).unwrap();
        assert!(!arg_joiner.is_pinned());
        assert!(!arg_joiner.is_bottom());
        assert_eq!(roots.assume_no_side_effects.len(), 1);

        let baz = program.class_by_name("com.other.Baz").unwrap().token;
        let (_, baz_joiner) = unconditional.classes().find(|(token, _)| **token == baz).unwrap();
        assert!(baz_joiner.build().is_check_discarded_enabled());
    }

    #[test]
    fn test_disabled_shrinking_pins_everything() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let rules = RuleSet::new();
        let config = ShakerConfig {
            shrinking: false,
            ..ShakerConfig::default()
        };
        let roots = RootSetBuilder::new(&program, &hierarchy, &rules, &config, Mode::InitialTreeShaking).build();
        let unconditional = roots.dependent.get(KeepPrecondition::Unconditional).unwrap();
        assert_eq!(unconditional.classes().count(), 3);
        assert_eq!(unconditional.methods().count(), 3);
        assert!(unconditional.fields().all(|(_, joiner)| joiner.is_pinned()));
    }
}

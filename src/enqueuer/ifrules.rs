//! Evaluation of conditional (`-if`) rules against the live part of the program.
//!
//! Rules sharing a precondition are evaluated together. A precondition holds for a live
//! program class when the class predicate matches its name (or a name it was merged from) and
//! every member condition is met by a distinct choice of live member. Member conditions are
//! matched by backtracking so that captures made by one member constrain the next.
//!
//! Each (group, class, captures) combination fires once per pass. A group whose consequences
//! have no back-references can produce nothing new after its first firing and is retired.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::{
    enqueuer::MarkSets,
    program::{ClassDef, Program, Token},
    resolution::ClassHierarchy,
    rules::{Captures, ClassSpec, IfRule, KeepRule, MemberSpec, RuleId, RuleSet},
    Result,
};

struct IfRuleGroup {
    precondition: ClassSpec,
    rules: Vec<(RuleId, IfRule)>,
    retired: bool,
}

impl IfRuleGroup {
    fn is_concrete(&self) -> bool {
        self.rules
            .iter()
            .all(|(_, rule)| rule.consequence_rule().is_concrete())
    }
}

/// Counters of conditional rule evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IfRuleStats {
    /// Evaluation rounds run
    pub rounds: usize,
    /// Distinct precondition groups
    pub groups: usize,
    /// Groups retired after firing
    pub retired: usize,
    /// Precondition matches that fired consequences
    pub firings: usize,
}

/// Repeatedly matches `-if` preconditions against the live program.
pub struct ConditionalRuleEvaluator {
    groups: Vec<IfRuleGroup>,
    fired: BTreeSet<(usize, Token, Captures)>,
    stats: IfRuleStats,
}

impl ConditionalRuleEvaluator {
    /// Groups the `-if` rules of `rules` by precondition, in rule order
    #[must_use]
    pub fn new(rules: &RuleSet) -> Self {
        let mut groups: Vec<IfRuleGroup> = Vec::new();
        for (id, rule) in rules.if_rules() {
            let existing = groups
                .iter()
                .position(|group| group.precondition == *rule.precondition_matchers());
            let slot = match existing {
                Some(slot) => slot,
                None => {
                    groups.push(IfRuleGroup {
                        precondition: rule.precondition_matchers().clone(),
                        rules: Vec::new(),
                        retired: false,
                    });
                    groups.len() - 1
                }
            };
            groups[slot].rules.push((id, rule.clone()));
        }

        let stats = IfRuleStats {
            groups: groups.len(),
            ..IfRuleStats::default()
        };
        ConditionalRuleEvaluator {
            groups,
            fired: BTreeSet::new(),
            stats,
        }
    }

    /// Returns true if some group can still fire
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.groups.iter().any(|group| !group.retired)
    }

    /// Evaluation counters
    #[must_use]
    pub fn stats(&self) -> IfRuleStats {
        self.stats
    }

    /// Runs one round over the current marks.
    ///
    /// Returns the materialized consequences of every precondition match not seen in an
    /// earlier round, ordered by group, class and captures.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRule`] if a consequence refers to a capture the
    /// precondition did not make.
    pub fn evaluate(
        &mut self,
        program: &Program,
        hierarchy: &ClassHierarchy,
        marks: &MarkSets,
    ) -> Result<Vec<(RuleId, KeepRule)>> {
        self.stats.rounds += 1;

        let live: Vec<&ClassDef> = marks
            .live_types
            .iter()
            .filter_map(|token| program.class(token))
            .filter(|class| class.is_program())
            .collect();

        let mut consequences = Vec::new();
        for (slot, group) in self.groups.iter_mut().enumerate() {
            if group.retired {
                continue;
            }

            let mut matches: Vec<(Token, Captures)> = live
                .par_iter()
                .flat_map_iter(|class| {
                    precondition_matches(program, hierarchy, marks, &group.precondition, class)
                        .into_iter()
                        .map(move |captures| (class.token, captures))
                })
                .collect();
            matches.sort();

            let mut fired_now = false;
            for (class, captures) in matches {
                if !self.fired.insert((slot, class, captures.clone())) {
                    continue;
                }
                fired_now = true;
                self.stats.firings += 1;
                log::trace!("if-rule precondition #{slot} holds for {}", program.descriptor(class));
                for (id, rule) in &group.rules {
                    consequences.push((*id, rule.materialize(&captures)?));
                }
            }

            if fired_now && group.is_concrete() {
                group.retired = true;
                self.stats.retired += 1;
            }
        }
        Ok(consequences)
    }
}

/// Every capture list under which `precondition` holds for the live class.
fn precondition_matches(
    program: &Program,
    hierarchy: &ClassHierarchy,
    marks: &MarkSets,
    precondition: &ClassSpec,
    class: &ClassDef,
) -> BTreeSet<Captures> {
    let mut solutions = BTreeSet::new();
    let names = std::iter::once(class.name).chain(class.merged_from.iter().copied());
    for name in names {
        let mut captures = Captures::new();
        if precondition.matches_class_named(program, hierarchy, class, program.name(name), &mut captures) {
            let mut used = Vec::new();
            match_members(program, marks, class, precondition.members(), captures, &mut used, &mut solutions);
        }
    }
    solutions
}

fn match_members(
    program: &Program,
    marks: &MarkSets,
    class: &ClassDef,
    members: &[MemberSpec],
    captures: Captures,
    used: &mut Vec<Token>,
    solutions: &mut BTreeSet<Captures>,
) {
    let Some((member, rest)) = members.split_first() else {
        solutions.insert(captures);
        return;
    };

    if member.selects_methods() {
        let live = program.methods_of(class).filter(|method| {
            marks.live_methods.contains(method.token) || marks.targeted_methods.contains(method.token)
        });
        for method in live {
            if used.contains(&method.token) {
                continue;
            }
            let mut attempt = captures.clone();
            if member.matches_method(program, method, &mut attempt) {
                used.push(method.token);
                match_members(program, marks, class, rest, attempt, used, solutions);
                used.pop();
            }
        }
    }

    if member.selects_fields() {
        // Compile-time constants never satisfy a member condition.
        let live = program
            .fields_of(class)
            .filter(|field| marks.live_fields.contains(field.token) && !field.is_compile_time_constant());
        for field in live {
            if used.contains(&field.token) {
                continue;
            }
            let mut attempt = captures.clone();
            if member.matches_field(program, field, &mut attempt) {
                used.push(field.token);
                match_members(program, marks, class, rest, attempt, used, solutions);
                used.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::{ConstValue, FieldFlags, MethodFlags},
        rules::KeepRule,
        test::builder_with_object,
    };

    fn program() -> Program {
        let mut builder = builder_with_object();
        builder.class("com.foo.UserModel", |c| {
            c.field("name", "java.lang.String", FieldFlags::PRIVATE)
                .constant("VERSION", "int", ConstValue::Int(3))
                .method("save", "()void", MethodFlags::PUBLIC, |_| {});
        });
        builder.class("com.foo.UserAdapter", |_| {});
        builder.build().unwrap()
    }

    fn adapter_rule(member: MemberSpec) -> RuleSet {
        let mut rules = RuleSet::new();
        rules.add_if(IfRule::new(
            ClassSpec::named("com.foo.*Model").unwrap().member(member),
            KeepRule::keep(ClassSpec::named("com.foo.<1>Adapter").unwrap()),
        ));
        rules
    }

    #[test]
    fn test_fires_once_with_captures() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let model = program.class_by_name("com.foo.UserModel").unwrap();
        let mut evaluator = ConditionalRuleEvaluator::new(&adapter_rule(MemberSpec::method("save").unwrap()));

        let mut marks = MarkSets::new();
        marks.live_types.insert(model.token);
        assert!(evaluator.evaluate(&program, &hierarchy, &marks).unwrap().is_empty());

        let save = program.methods_of(model).find(|m| program.name(m.name) == "save").unwrap();
        marks.targeted_methods.insert(save.token);
        let fired = evaluator.evaluate(&program, &hierarchy, &marks).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1.spec.concrete_name().as_deref(), Some("com.foo.UserAdapter"));

        assert!(evaluator.evaluate(&program, &hierarchy, &marks).unwrap().is_empty());
        assert_eq!(evaluator.stats().firings, 1);
        assert_eq!(evaluator.stats().rounds, 3);
    }

    #[test]
    fn test_constant_fields_never_satisfy_conditions() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let model = program.class_by_name("com.foo.UserModel").unwrap();
        let mut evaluator = ConditionalRuleEvaluator::new(&adapter_rule(MemberSpec::field("VERSION").unwrap()));

        let mut marks = MarkSets::new();
        marks.live_types.insert(model.token);
        for field in &model.fields {
            marks.live_fields.insert(*field);
        }
        assert!(evaluator.evaluate(&program, &hierarchy, &marks).unwrap().is_empty());
    }

    #[test]
    fn test_concrete_groups_retire() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let model = program.class_by_name("com.foo.UserModel").unwrap();

        let mut rules = RuleSet::new();
        let precondition = ClassSpec::named("com.foo.UserModel").unwrap();
        rules.add_if(IfRule::new(
            precondition.clone(),
            KeepRule::keep(ClassSpec::named("com.foo.UserAdapter").unwrap()),
        ));
        rules.add_if(IfRule::new(
            precondition,
            KeepRule::keep_class_members(ClassSpec::named("com.foo.UserModel").unwrap()),
        ));
        let mut evaluator = ConditionalRuleEvaluator::new(&rules);
        assert_eq!(evaluator.stats().groups, 1);

        let mut marks = MarkSets::new();
        marks.live_types.insert(model.token);
        assert_eq!(evaluator.evaluate(&program, &hierarchy, &marks).unwrap().len(), 2);
        assert!(!evaluator.has_pending());
    }
}

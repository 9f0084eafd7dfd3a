//! Frozen outcome of an enqueuer pass.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::{
    diagnostics::{CheckDiscardReport, GraphNode, KeepPath, KeptGraph, MainDexInfo, MissingItemsReport},
    enqueuer::{FieldAccessInfoCollection, IfRuleStats, MarkSet, MarkSets, Mode, WorklistStats},
    keepinfo::KeepInfoSnapshot,
    program::{Annotation, MethodRef, MethodRewrites, Program, Symbol, Token},
    resolution::{InstantiationInfo, SingleTargetStats},
};

/// Counters of a finished pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueuerStats {
    /// Worklist counters
    pub worklist: WorklistStats,
    /// Single-target cache counters
    pub cache: SingleTargetStats,
    /// Conditional rule counters
    pub if_rules: IfRuleStats,
    /// Deferred field accesses replayed into the worklist
    pub deferred_replays: usize,
    /// Fixpoint rounds (drains of the worklist)
    pub rounds: usize,
}

/// Everything a pass computed, read-only.
///
/// Mark sets, keep information and field accesses are the input of pruning and renaming.
/// Diagnostics are already sorted.
#[derive(Debug)]
pub struct EnqueuerResult {
    pub(crate) mode: Mode,
    pub(crate) marks: MarkSets,
    pub(crate) keep_info: KeepInfoSnapshot,
    pub(crate) field_access: FieldAccessInfoCollection,
    pub(crate) missing: MissingItemsReport,
    pub(crate) broken_super_invokes: BTreeSet<(Token, Token)>,
    pub(crate) failed_resolutions: BTreeSet<MethodRef>,
    pub(crate) assume_no_side_effects: BTreeSet<Token>,
    pub(crate) pruned_fields: BTreeSet<Token>,
    pub(crate) rewrites: MethodRewrites,
    pub(crate) check_discard: CheckDiscardReport,
    pub(crate) main_dex: Option<MainDexInfo>,
    pub(crate) graph: Option<KeptGraph>,
    pub(crate) why_are_you_keeping: Vec<(Token, Option<KeepPath>)>,
    pub(crate) stats: EnqueuerStats,
}

impl EnqueuerResult {
    /// Mode the pass ran in
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// All mark sets
    #[must_use]
    pub fn marks(&self) -> &MarkSets {
        &self.marks
    }

    /// Live program types
    #[must_use]
    pub fn live_types(&self) -> &MarkSet {
        &self.marks.live_types
    }

    /// Instantiated program types
    #[must_use]
    pub fn instantiated_types(&self) -> &MarkSet {
        &self.marks.instantiated_types
    }

    /// Interfaces instantiated through lambdas
    #[must_use]
    pub fn lambda_interfaces(&self) -> &MarkSet {
        &self.marks.lambda_interfaces
    }

    /// Classes whose static initializer may run
    #[must_use]
    pub fn initialized_classes(&self) -> &MarkSet {
        &self.marks.initialized_classes
    }

    /// Targeted methods
    #[must_use]
    pub fn targeted_methods(&self) -> &MarkSet {
        &self.marks.targeted_methods
    }

    /// Live methods
    #[must_use]
    pub fn live_methods(&self) -> &MarkSet {
        &self.marks.live_methods
    }

    /// Live fields
    #[must_use]
    pub fn live_fields(&self) -> &MarkSet {
        &self.marks.live_fields
    }

    /// Library and classpath types referenced by live code
    #[must_use]
    pub fn live_non_program_types(&self) -> &MarkSet {
        &self.marks.live_non_program
    }

    /// Returns true if `item` survives the pass: a live type, a targeted method or a live field
    #[must_use]
    pub fn is_live(&self, item: Token) -> bool {
        if item.is_class() {
            self.marks.live_types.contains(item)
        } else if item.is_method() {
            self.marks.targeted_methods.contains(item)
        } else {
            self.marks.live_fields.contains(item)
        }
    }

    /// Final keep information
    #[must_use]
    pub fn keep_info(&self) -> &KeepInfoSnapshot {
        &self.keep_info
    }

    /// Traced field accesses
    #[must_use]
    pub fn field_access(&self) -> &FieldAccessInfoCollection {
        &self.field_access
    }

    /// References to missing definitions
    #[must_use]
    pub fn missing(&self) -> &MissingItemsReport {
        &self.missing
    }

    /// Super invokes resolving to a private method, as (context, target) pairs
    #[must_use]
    pub fn broken_super_invokes(&self) -> &BTreeSet<(Token, Token)> {
        &self.broken_super_invokes
    }

    /// Method references that resolve to nothing or to the wrong kind of holder
    #[must_use]
    pub fn failed_resolutions(&self) -> &BTreeSet<MethodRef> {
        &self.failed_resolutions
    }

    /// Methods matched by `-assumenosideeffects`
    #[must_use]
    pub fn assume_no_side_effects(&self) -> &BTreeSet<Token> {
        &self.assume_no_side_effects
    }

    /// Fields whose deferred accesses were pruned
    #[must_use]
    pub fn pruned_fields(&self) -> &BTreeSet<Token> {
        &self.pruned_fields
    }

    /// Rewrites of the methods that accessed pruned fields
    #[must_use]
    pub fn rewrites(&self) -> &MethodRewrites {
        &self.rewrites
    }

    /// Items that should have been discarded but are live
    #[must_use]
    pub fn check_discard(&self) -> &CheckDiscardReport {
        &self.check_discard
    }

    /// Main-dex classes, for a main-dex pass
    #[must_use]
    pub fn main_dex(&self) -> Option<&MainDexInfo> {
        self.main_dex.as_ref()
    }

    /// Recorded retention graph, if a collecting consumer was attached
    #[must_use]
    pub fn graph(&self) -> Option<&KeptGraph> {
        self.graph.as_ref()
    }

    /// Answers for the `-whyareyoukeeping` requests, in request order
    #[must_use]
    pub fn why_are_you_keeping(&self) -> &[(Token, Option<KeepPath>)] {
        &self.why_are_you_keeping
    }

    /// Shortest retention path to `item` in the recorded graph
    #[must_use]
    pub fn keep_path(&self, item: Token) -> Option<KeepPath> {
        self.graph.as_ref()?.why_are_you_keeping(GraphNode::Item(item))
    }

    /// Pass counters
    #[must_use]
    pub fn stats(&self) -> &EnqueuerStats {
        &self.stats
    }

    /// Abstract methods of live classes that no live reference targets, in token order.
    ///
    /// Scanned on the rayon pool, one task per live class.
    #[must_use]
    pub fn unused_abstract_methods(&self, program: &Program) -> Vec<Token> {
        let live: Vec<Token> = self.marks.live_types.iter().collect();
        let mut unused: Vec<Token> = live
            .par_iter()
            .filter_map(|token| program.class(*token))
            .flat_map_iter(|class| {
                program
                    .methods_of(class)
                    .filter(|method| {
                        method.is_abstract()
                            && !self.marks.targeted_methods.contains(method.token)
                            && !self.keep_info.is_pinned(method.token)
                    })
                    .map(|method| method.token)
                    .collect::<Vec<_>>()
            })
            .collect();
        unused.sort_unstable();
        unused
    }

    /// Annotations of surviving items that later passes may drop, as (item, annotation type).
    ///
    /// An annotation may be dropped when the keep information of its item allows annotation
    /// removal and the annotation is either invisible at runtime or of a type that did not
    /// survive. Scanned on the rayon pool, one task per item.
    #[must_use]
    pub fn removable_annotations(&self, program: &Program) -> Vec<(Token, Symbol)> {
        let global = self.keep_info.global();
        let items: Vec<Token> = self
            .marks
            .live_types
            .iter()
            .chain(self.marks.targeted_methods.iter())
            .chain(self.marks.live_fields.iter())
            .collect();

        let mut removable: Vec<(Token, Symbol)> = items
            .par_iter()
            .flat_map_iter(|item| {
                let (annotations, allowed): (&[Annotation], bool) = if item.is_class() {
                    (
                        program
                            .class(*item)
                            .map(|class| class.annotations.as_slice())
                            .unwrap_or_default(),
                        self.keep_info.class_info(*item).is_annotation_removal_allowed(global),
                    )
                } else if item.is_method() {
                    (
                        program
                            .method(*item)
                            .map(|method| method.annotations.as_slice())
                            .unwrap_or_default(),
                        self.keep_info.method_info(*item).is_annotation_removal_allowed(global),
                    )
                } else {
                    (
                        program
                            .field(*item)
                            .map(|field| field.annotations.as_slice())
                            .unwrap_or_default(),
                        self.keep_info.field_info(*item).is_annotation_removal_allowed(global),
                    )
                };
                if !allowed {
                    return Vec::new();
                }
                annotations
                    .iter()
                    .filter(|annotation| !annotation.is_retained() || !self.is_type_live(program, annotation.ty))
                    .map(|annotation| (*item, annotation.ty))
                    .collect()
            })
            .collect();
        removable.sort_unstable();
        removable
    }

    fn is_type_live(&self, program: &Program, ty: Symbol) -> bool {
        program.class_by_symbol(ty).is_some_and(|class| {
            self.marks.live_types.contains(class.token) || self.marks.live_non_program.contains(class.token)
        })
    }
}

impl InstantiationInfo for EnqueuerResult {
    fn is_instantiated(&self, ty: Token) -> bool {
        self.marks.instantiated_types.contains(ty)
    }

    fn is_instantiated_via_lambda(&self, interface: Token) -> bool {
        self.marks.lambda_interfaces.contains(interface)
    }

    fn is_pinned(&self, ty: Token) -> bool {
        self.keep_info.is_pinned(ty)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ShakerConfig,
        enqueuer::{Enqueuer, Mode},
        program::{AnnotationVisibility, MethodFlags},
        rules::{ClassSpec, KeepRule, MemberSpec, RuleSet},
        test::builder_with_object,
    };

    #[test]
    fn test_parallel_scans() {
        let mut builder = builder_with_object();
        builder.class("app.Marker", |c| {
            c.annotation_interface();
        });
        builder.class("app.Shape", |c| {
            c.abstract_class()
                .abstract_method("area", "()int", MethodFlags::PUBLIC);
        });
        builder.class("app.Util", |c| {
            c.extends("app.Shape")
                .annotate("app.Marker", |_| {})
                .annotate("app.Tool", |a| {
                    a.visibility(AnnotationVisibility::Build);
                })
                .method("run", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |_| {});
        });
        builder.class("app.Main", |c| {
            c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.invoke_static("app.Util", "run", "()void");
            });
        });
        let program = builder.build().unwrap();

        let mut rules = RuleSet::new();
        rules.add_keep(KeepRule::keep(
            ClassSpec::named("app.Main").unwrap().member(MemberSpec::method("main").unwrap()),
        ));
        let config = ShakerConfig::default();
        let result = Enqueuer::new(&program, &rules, &config, Mode::InitialTreeShaking)
            .run()
            .unwrap();

        let shape = program.class_by_name("app.Shape").unwrap();
        let area = program.methods_of(shape).next().unwrap().token;
        assert_eq!(result.unused_abstract_methods(&program), vec![area]);

        let util = program.class_by_name("app.Util").unwrap().token;
        let marker = program.class_by_name("app.Marker").unwrap().token;
        assert!(result.live_types().contains(marker));
        assert_eq!(
            result.removable_annotations(&program),
            vec![(util, program.intern("app.Tool"))]
        );
    }
}

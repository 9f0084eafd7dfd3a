//! The worklist fixpoint driver.
//!
//! An [`Enqueuer`] owns every structure mutated during a pass: the mark sets, the keep-info
//! collection, the field access records, the recorded virtual calls and the side collections
//! for diagnostics. Satellite components ([`ConditionalRuleEvaluator`], [`DeferredTracing`],
//! [`SingleTargetCache`]) are called from the driver and only see its state by reference.
//!
//! # Pass states
//!
//! ```text
//!  Idle ──seed roots──> Running ──worklist empty──> Draining ──no new work──> Stable ──> Done
//!                          ^                            │                       │
//!                          └──── if-rule consequences ──┘                       │
//!                          └──────────── replayed deferred accesses ────────────┘
//! ```
//!
//! Every action may only be enqueued for an item that is not yet marked for that action, and
//! mark sets only grow, so a pass terminates after a number of pops bounded by the number of
//! items times the number of action kinds.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    config::ShakerConfig,
    diagnostics::{
        CheckDiscard, CollectingGraphConsumer, GraphNode, KeptGraphConsumer, MainDexInfo, MissingItem,
        MissingItemsCollector,
    },
    enqueuer::{
        evaluate_keep_rule, ConditionalRuleEvaluator, DeferredAccess, DeferredCommit, DeferredTracing,
        EnqueuerAction, EnqueuerResult, EnqueuerStats, FieldAccessFlags, FieldAccessInfoCollection,
        KeepReason, MarkSets, Mode, RootSetBuilder, Worklist,
    },
    keepinfo::{
        DependentMinimumKeepInfo, KeepClassJoiner, KeepFieldJoiner, KeepInfoCollection, KeepMethodJoiner,
        KeepPrecondition, MinimumKeepInfo,
    },
    program::{
        descriptor, AnnotatedItem, Annotation, AnnotationValue, CallSite, FieldAccessKind, FieldRef,
        HandleTarget, InvokeKind, MethodHandle, MethodHandleKind, MethodRef, Program,
        Receiver, Symbol, Token, UseRegistry,
    },
    resolution::{
        lookup_virtual_dispatch_target, resolve_field, resolve_method, ClassHierarchy, FieldResolution,
        InstantiationInfo, MethodResolution, SingleTargetCache, SingleTargetQuery,
    },
    rules::{Rule, RuleId, RuleSet},
    Error, Result,
};

/// Where a pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum EnqueuerState {
    /// Nothing seeded yet
    Idle,
    /// Popping actions from the worklist
    Running,
    /// Worklist empty, evaluating conditional rules
    Draining,
    /// Conditional rules quiet, reconciling deferred accesses
    Stable,
    /// Fixpoint reached
    Done,
}

/// Instantiation state of a running pass, as seen by the single-target cache.
struct LiveView<'b> {
    marks: &'b MarkSets,
    keep_info: &'b KeepInfoCollection,
}

impl InstantiationInfo for LiveView<'_> {
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

/// Turns the references of one live method body into trace actions.
struct UseCollector {
    context: Token,
    site: usize,
    actions: Vec<EnqueuerAction>,
}

impl UseCollector {
    fn new(context: Token) -> Self {
        UseCollector {
            context,
            site: 0,
            actions: Vec::new(),
        }
    }
}

impl UseRegistry for UseCollector {
    fn set_instruction_index(&mut self, index: usize) {
        self.site = index;
    }

    fn register_invoke(&mut self, kind: InvokeKind, method: &MethodRef, receiver: Option<&Receiver>) {
        self.actions.push(EnqueuerAction::TraceInvoke {
            kind,
            method: *method,
            receiver: receiver.copied(),
            context: self.context,
            via_handle: false,
        });
    }

    fn register_field_access(&mut self, field: &FieldRef, kind: FieldAccessKind, value: Option<Symbol>) {
        self.actions.push(EnqueuerAction::TraceFieldAccess {
            field: *field,
            kind,
            context: self.context,
            value,
            site: Some(self.site),
            replay: false,
        });
    }

    fn register_new_instance(&mut self, ty: Symbol) {
        self.actions.push(EnqueuerAction::TraceNewInstance {
            ty,
            context: self.context,
        });
    }

    fn register_type_reference(&mut self, ty: Symbol) {
        self.actions.push(EnqueuerAction::TraceTypeReference {
            ty,
            reason: KeepReason::ReferencedFrom(self.context),
        });
    }

    fn register_call_site(&mut self, call_site: &CallSite) {
        self.actions.push(EnqueuerAction::TraceCallSite {
            call_site: *call_site,
            context: self.context,
        });
    }

    fn register_method_handle(&mut self, handle: &MethodHandle) {
        self.actions.push(EnqueuerAction::TraceMethodHandle {
            handle: *handle,
            context: self.context,
        });
    }

    fn register_reflective_class(&mut self, ty: Symbol) {
        self.actions.push(EnqueuerAction::TraceReflectiveClass {
            ty,
            context: self.context,
        });
    }

    fn register_reflective_field(&mut self, field: &FieldRef) {
        self.actions.push(EnqueuerAction::TraceReflectiveField {
            field: *field,
            context: self.context,
        });
    }

    fn register_reflective_method(&mut self, method: &MethodRef) {
        self.actions.push(EnqueuerAction::TraceReflectiveMethod {
            method: *method,
            context: self.context,
        });
    }

    fn register_init_class(&mut self, ty: Symbol) {
        self.actions.push(EnqueuerAction::TraceInitClass {
            ty,
            context: self.context,
        });
    }

    fn register_exception_guard(&mut self, ty: Symbol) {
        self.actions.push(EnqueuerAction::TraceTypeReference {
            ty,
            reason: KeepReason::CatchType(self.context),
        });
    }
}

/// The reachability fixpoint over one program.
///
/// # Examples
///
/// ```rust
/// use shaker::{
///     config::ShakerConfig,
///     enqueuer::{Enqueuer, Mode},
///     program::{MethodFlags, ProgramBuilder},
///     rules::{ClassSpec, KeepRule, MemberSpec, RuleSet},
/// };
///
/// # fn main() -> shaker::Result<()> {
/// let mut builder = ProgramBuilder::new();
/// builder.library_class("java.lang.Object", |c| {
///     c.no_superclass();
/// });
/// builder.class("app.Main", |c| {
///     c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
///         m.invoke_static("app.Util", "help", "()void");
///     });
/// });
/// builder.class("app.Util", |c| {
///     c.method("help", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |_| {})
///         .method("unused", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |_| {});
/// });
/// let program = builder.build()?;
///
/// let mut rules = RuleSet::new();
/// rules.add_keep(KeepRule::keep(
///     ClassSpec::named("app.Main")?.member(MemberSpec::method("main")?),
/// ));
///
/// let config = ShakerConfig::default();
/// let result = Enqueuer::new(&program, &rules, &config, Mode::InitialTreeShaking).run()?;
/// let util = program.class_by_name("app.Util").unwrap();
/// assert!(result.live_types().contains(util.token));
/// assert_eq!(result.live_methods().len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Enqueuer<'a> {
    program: &'a Program,
    rules: &'a RuleSet,
    config: &'a ShakerConfig,
    mode: Mode,
    state: EnqueuerState,
    hierarchy: ClassHierarchy,
    worklist: Worklist,
    marks: MarkSets,
    keep_info: KeepInfoCollection,
    pending: DependentMinimumKeepInfo,
    field_access: FieldAccessInfoCollection,
    cache: SingleTargetCache,
    virtual_calls: BTreeMap<Token, BTreeSet<Token>>,
    broken_super_invokes: BTreeSet<(Token, Token)>,
    failed_resolutions: BTreeSet<MethodRef>,
    missing: MissingItemsCollector,
    if_rules: ConditionalRuleEvaluator,
    deferred: DeferredTracing,
    consumer: Option<Box<dyn KeptGraphConsumer>>,
    unretained_edges: BTreeMap<Token, Vec<KeepReason>>,
    assume_no_side_effects: BTreeSet<Token>,
    why_are_you_keeping: Vec<Token>,
    rounds: usize,
}

impl<'a> Enqueuer<'a> {
    /// Prepares a pass over `program`.
    ///
    /// A [`CollectingGraphConsumer`] is attached when the mode records the graph or the rules
    /// contain `-whyareyoukeeping` requests.
    ///
    /// # Arguments
    ///
    /// * `program` - The program, read-only for the whole pass
    /// * `rules` - Keep, conditional, constraint and diagnostic rules
    /// * `config` - Global switches
    /// * `mode` - Which kind of pass to run
    #[must_use]
    pub fn new(program: &'a Program, rules: &'a RuleSet, config: &'a ShakerConfig, mode: Mode) -> Self {
        let consumer: Option<Box<dyn KeptGraphConsumer>> =
            if mode.records_graph() || !rules.why_are_you_keeping().is_empty() {
                Some(Box::new(CollectingGraphConsumer::new()))
            } else {
                None
            };

        Enqueuer {
            program,
            rules,
            config,
            mode,
            state: EnqueuerState::Idle,
            hierarchy: ClassHierarchy::new(program),
            worklist: Worklist::new(),
            marks: MarkSets::new(),
            keep_info: KeepInfoCollection::new(),
            pending: DependentMinimumKeepInfo::new(),
            field_access: FieldAccessInfoCollection::new(),
            cache: SingleTargetCache::new(),
            virtual_calls: BTreeMap::new(),
            broken_super_invokes: BTreeSet::new(),
            failed_resolutions: BTreeSet::new(),
            missing: MissingItemsCollector::new(),
            if_rules: ConditionalRuleEvaluator::new(rules),
            deferred: DeferredTracing::new(config.deferred_tracing && mode.allows_deferred_tracing()),
            consumer,
            unretained_edges: BTreeMap::new(),
            assume_no_side_effects: BTreeSet::new(),
            why_are_you_keeping: Vec::new(),
            rounds: 0,
        }
    }

    /// Replaces the graph consumer; edges of the pass are reported to `consumer`
    #[must_use]
    pub fn with_graph_consumer(mut self, consumer: Box<dyn KeptGraphConsumer>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Current state of the pass
    #[must_use]
    pub fn state(&self) -> EnqueuerState {
        self.state
    }

    /// Runs the pass to its fixpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownItem`] or [`Error::Invariant`] if the program graph is
    /// structurally broken, [`Error::InvalidRule`] if a conditional rule cannot be
    /// materialized, and [`Error::LockError`] if a parallel diagnostic scan fails. Anomalies of
    /// the traced program are never errors here; they are collected into the result.
    pub fn run(mut self) -> Result<EnqueuerResult> {
        log::info!(
            "{} pass over {} classes with {} rules",
            self.mode,
            self.program.classes().len(),
            self.rules.len()
        );
        self.seed_roots();

        loop {
            self.transition(EnqueuerState::Running);
            self.rounds += 1;
            while let Some(action) = self.worklist.pop() {
                self.process(action)?;
            }

            self.transition(EnqueuerState::Draining);
            if self.apply_if_rules()? {
                continue;
            }

            self.transition(EnqueuerState::Stable);
            let replay = self.deferred.reconcile(&self.keep_info, &self.field_access);
            if replay.is_empty() {
                break;
            }
            for (field, access) in replay {
                self.replay(field, access);
            }
        }

        let commit = self.deferred.commit(self.program);
        for field in &commit.pruned_fields {
            self.field_access.remove(*field);
        }
        if !self.marks.is_consistent() {
            return Err(invariant_error!("mark sets inconsistent after {} pass", self.mode));
        }
        self.transition(EnqueuerState::Done);
        self.finish(commit)
    }

    fn transition(&mut self, next: EnqueuerState) {
        log::debug!(
            "{}: {} -> {} (pending {}, live types {}, live methods {})",
            self.mode,
            self.state,
            next,
            self.worklist.len(),
            self.marks.live_types.len(),
            self.marks.live_methods.len()
        );
        self.state = next;
    }

    fn seed_roots(&mut self) {
        let roots = RootSetBuilder::new(self.program, &self.hierarchy, self.rules, self.config, self.mode).build();
        self.assume_no_side_effects = roots.assume_no_side_effects;
        self.why_are_you_keeping = roots.why_are_you_keeping;
        self.apply_dependent(roots.dependent);
    }

    /// Evaluates one round of conditional rules, returning true if it produced work.
    fn apply_if_rules(&mut self) -> Result<bool> {
        if !self.mode.evaluates_if_rules() || !self.if_rules.has_pending() {
            return Ok(false);
        }
        if let Some(max) = self.config.max_if_rule_rounds {
            if self.if_rules.stats().rounds >= max {
                log::warn!("stopping conditional rule evaluation after {max} rounds");
                return Ok(false);
            }
        }

        let consequences = self.if_rules.evaluate(self.program, &self.hierarchy, &self.marks)?;
        for (id, rule) in consequences {
            let dependent = evaluate_keep_rule(self.program, &self.hierarchy, id, &rule);
            self.apply_dependent(dependent);
        }
        Ok(!self.worklist.is_empty())
    }

    fn finish(self, commit: DeferredCommit) -> Result<EnqueuerResult> {
        let program = self.program;
        let missing = self.missing.report(program, self.rules);
        let keep_info = self.keep_info.freeze(self.config.global_keep_info());
        let marks = self.marks;

        let check_discard = CheckDiscard::run(program, &keep_info, |item| {
            if item.is_class() {
                marks.live_types.contains(item)
            } else if item.is_method() {
                marks.targeted_methods.contains(item)
            } else {
                marks.live_fields.contains(item)
            }
        })?;

        let main_dex = if self.mode.is_main_dex_tracing() {
            Some(MainDexInfo::compute(program, marks.live_types.iter())?)
        } else {
            None
        };

        let graph = self.consumer.and_then(|consumer| consumer.finish());
        let why_are_you_keeping: Vec<_> = self
            .why_are_you_keeping
            .iter()
            .map(|item| {
                let path = graph
                    .as_ref()
                    .and_then(|graph| graph.why_are_you_keeping(GraphNode::Item(*item)));
                (*item, path)
            })
            .collect();
        for (item, path) in &why_are_you_keeping {
            match path {
                Some(path) => log::info!("{}", path.render(program)),
                None => log::info!("{} is not kept", program.descriptor(*item)),
            }
        }

        let stats = EnqueuerStats {
            worklist: self.worklist.stats().clone(),
            cache: self.cache.stats(),
            if_rules: self.if_rules.stats(),
            deferred_replays: self.deferred.replayed(),
            rounds: self.rounds,
        };
        log::info!(
            "{} pass done: {} live types, {} live methods, {} live fields, {} actions",
            self.mode,
            marks.live_types.len(),
            marks.live_methods.len(),
            marks.live_fields.len(),
            stats.worklist.processed
        );

        Ok(EnqueuerResult {
            mode: self.mode,
            marks,
            keep_info,
            field_access: self.field_access,
            missing,
            broken_super_invokes: self.broken_super_invokes,
            failed_resolutions: self.failed_resolutions,
            assume_no_side_effects: self.assume_no_side_effects,
            pruned_fields: commit.pruned_fields,
            rewrites: commit.rewrites,
            check_discard,
            main_dex,
            graph,
            why_are_you_keeping,
            stats,
        })
    }

    fn process(&mut self, action: EnqueuerAction) -> Result<()> {
        log::trace!("{}", action.name());
        match action {
            EnqueuerAction::MarkTypeLive { ty, reason } => self.mark_type_live(ty, reason),
            EnqueuerAction::MarkTypeInstantiated { ty, reason } => self.mark_type_instantiated(ty, reason),
            EnqueuerAction::MarkInterfaceInstantiatedViaLambda { interface, reason } => {
                self.mark_lambda_interface(interface, reason)
            }
            EnqueuerAction::MarkClassInitialized { ty, reason } => self.mark_class_initialized(ty, reason),
            EnqueuerAction::MarkMethodTargeted { method, reason } => self.mark_method_targeted(method, reason),
            EnqueuerAction::MarkMethodLive { method, reason } => self.mark_method_live(method, reason),
            EnqueuerAction::MarkFieldKept { field, reason } => self.mark_field_kept(field, reason),
            EnqueuerAction::TraceInvoke {
                kind,
                method,
                receiver,
                context,
                via_handle,
            } => self.trace_invoke(kind, &method, receiver, context, via_handle),
            EnqueuerAction::TraceFieldAccess {
                field,
                kind,
                context,
                value,
                site,
                replay,
            } => self.trace_field_access(&field, kind, context, value, site, replay),
            EnqueuerAction::TraceNewInstance { ty, context } => {
                self.trace_new_instance(ty, context);
                Ok(())
            }
            EnqueuerAction::TraceTypeReference { ty, reason } => {
                self.trace_type_reference(ty, reason);
                Ok(())
            }
            EnqueuerAction::TraceInitClass { ty, context } => {
                self.trace_init_class(ty, context);
                Ok(())
            }
            EnqueuerAction::TraceCallSite { call_site, context } => self.trace_call_site(&call_site, context),
            EnqueuerAction::TraceMethodHandle { handle, context } => self.trace_method_handle(&handle, context),
            EnqueuerAction::TraceReflectiveClass { ty, context } => {
                self.trace_reflective_class(ty, context);
                Ok(())
            }
            EnqueuerAction::TraceReflectiveField { field, context } => self.trace_reflective_field(&field, context),
            EnqueuerAction::TraceReflectiveMethod { method, context } => {
                self.trace_reflective_method(&method, context)
            }
            EnqueuerAction::TraceAnnotations { item } => self.trace_annotations(item),
        }
    }

    // Enqueueing. Every call reports its edge; the action is only pushed for unmarked items.

    /// Reports an edge to `target`; edges to unmarked items are held until the item is marked.
    fn report(&mut self, reason: KeepReason, target: Token) {
        if self.consumer.is_none() {
            return;
        }
        if self.is_retained(target) {
            if let Some(consumer) = self.consumer.as_mut() {
                consumer.accept_edge(reason.source(), GraphNode::Item(target), reason.edge_kind());
            }
        } else {
            self.unretained_edges.entry(target).or_default().push(reason);
        }
    }

    /// Forwards the edges held for `target` once it has been marked
    fn flush_edges(&mut self, target: Token) {
        let Some(reasons) = self.unretained_edges.remove(&target) else {
            return;
        };
        if let Some(consumer) = self.consumer.as_mut() {
            for reason in reasons {
                consumer.accept_edge(reason.source(), GraphNode::Item(target), reason.edge_kind());
            }
        }
    }

    fn is_retained(&self, item: Token) -> bool {
        if item.is_class() {
            self.marks.live_types.contains(item) || self.marks.live_non_program.contains(item)
        } else if item.is_method() {
            self.marks.targeted_methods.contains(item)
        } else {
            self.marks.live_fields.contains(item)
        }
    }

    fn enqueue_type_live(&mut self, ty: Token, reason: KeepReason) {
        self.report(reason, ty);
        if !self.marks.live_types.contains(ty) && !self.marks.live_non_program.contains(ty) {
            self.worklist.push(EnqueuerAction::MarkTypeLive { ty, reason });
        }
    }

    fn enqueue_type_instantiated(&mut self, ty: Token, reason: KeepReason) {
        self.report(reason, ty);
        if !self.marks.instantiated_types.contains(ty) {
            self.worklist.push(EnqueuerAction::MarkTypeInstantiated { ty, reason });
        }
    }

    fn enqueue_lambda_interface(&mut self, interface: Token, reason: KeepReason) {
        self.report(reason, interface);
        if !self.marks.lambda_interfaces.contains(interface) {
            self.worklist
                .push(EnqueuerAction::MarkInterfaceInstantiatedViaLambda { interface, reason });
        }
    }

    fn enqueue_class_initialized(&mut self, ty: Token, reason: KeepReason) {
        self.report(reason, ty);
        if !self.marks.initialized_classes.contains(ty) {
            self.worklist.push(EnqueuerAction::MarkClassInitialized { ty, reason });
        }
    }

    fn enqueue_method_targeted(&mut self, method: Token, reason: KeepReason) {
        self.report(reason, method);
        if !self.marks.targeted_methods.contains(method) {
            self.worklist.push(EnqueuerAction::MarkMethodTargeted { method, reason });
        }
    }

    fn enqueue_method_live(&mut self, method: Token, reason: KeepReason) {
        self.report(reason, method);
        if !self.marks.live_methods.contains(method) {
            self.worklist.push(EnqueuerAction::MarkMethodLive { method, reason });
        }
    }

    fn enqueue_field_kept(&mut self, field: Token, reason: KeepReason) {
        self.report(reason, field);
        if !self.field_access.has_any(field, FieldAccessFlags::KEPT) {
            self.worklist.push(EnqueuerAction::MarkFieldKept { field, reason });
        }
    }

    /// Instances of a program class exist once one of its constructors is kept or looked up.
    fn enqueue_constructed(&mut self, method: Token, reason: KeepReason) {
        let program = self.program;
        let Some(definition) = program.method(method) else {
            return;
        };
        if !definition.is_instance_initializer() {
            return;
        }
        let instantiable = program
            .class(definition.holder)
            .is_some_and(|holder| holder.is_program() && holder.is_instantiable());
        if instantiable {
            self.enqueue_type_instantiated(definition.holder, reason);
            self.enqueue_class_initialized(definition.holder, reason);
        }
    }

    fn replay(&mut self, field: Token, access: DeferredAccess) {
        log::trace!("replaying {} of field {field} in {}", access.kind, access.context);
        self.worklist.push(EnqueuerAction::TraceFieldAccess {
            field: access.field,
            kind: access.kind,
            context: access.context,
            value: access.value,
            site: Some(access.site),
            replay: true,
        });
    }

    // Keep information.

    fn reason_for_rules(&self, rules: &BTreeSet<RuleId>) -> KeepReason {
        match rules.first() {
            Some(id) => match self.rules.get(*id) {
                Some(Rule::If(_)) => KeepReason::ConditionalRule(*id),
                _ => KeepReason::KeepRule(*id),
            },
            None => KeepReason::ImplicitRoot,
        }
    }

    fn apply_dependent(&mut self, mut dependent: DependentMinimumKeepInfo) {
        if let Some(minimum) = dependent.remove(KeepPrecondition::Unconditional) {
            self.apply_minimum(&minimum);
        }

        let satisfied: Vec<KeepPrecondition> = dependent
            .preconditions()
            .copied()
            .filter(|precondition| match precondition {
                KeepPrecondition::ClassLive(class) => self.marks.live_types.contains(*class),
                KeepPrecondition::Unconditional => true,
            })
            .collect();
        for precondition in satisfied {
            if let Some(minimum) = dependent.remove(precondition) {
                self.apply_minimum(&minimum);
            }
        }
        self.pending.merge(dependent);
    }

    fn apply_minimum(&mut self, minimum: &MinimumKeepInfo) {
        for (class, joiner) in minimum.classes() {
            self.join_class(*class, joiner);
        }
        for (method, joiner) in minimum.methods() {
            self.join_method(*method, joiner);
        }
        for (field, joiner) in minimum.fields() {
            self.join_field(*field, joiner);
        }
    }

    fn join_class(&mut self, class: Token, joiner: &KeepClassJoiner) {
        let outcome = self.keep_info.join_class(class, joiner);
        if outcome.newly_pinned {
            self.cache.invalidate_pinned_type(&self.hierarchy, class);
        }
        if joiner.is_pinned() {
            let reason = self.reason_for_rules(joiner.rules());
            self.enqueue_type_live(class, reason);
            self.enqueue_class_initialized(class, reason);
        }
    }

    fn join_method(&mut self, method: Token, joiner: &KeepMethodJoiner) {
        self.keep_info.join_method(method, joiner);
        if joiner.is_pinned() {
            let reason = self.reason_for_rules(joiner.rules());
            self.enqueue_method_targeted(method, reason);
            self.enqueue_method_live(method, reason);
            self.enqueue_constructed(method, reason);
        }
    }

    fn join_field(&mut self, field: Token, joiner: &KeepFieldJoiner) {
        self.keep_info.join_field(field, joiner);
        if joiner.is_pinned() {
            let reason = self.reason_for_rules(joiner.rules());
            self.enqueue_field_kept(field, reason);
        }
    }

    // Mark actions.

    fn mark_type_live(&mut self, ty: Token, reason: KeepReason) -> Result<()> {
        let program = self.program;
        let class = program.class(ty).ok_or(Error::UnknownItem(ty))?;

        if !class.is_program() {
            if self.marks.live_non_program.insert(ty) {
                self.flush_edges(ty);
                for supertype in self.hierarchy.supertypes(ty).to_vec() {
                    self.enqueue_type_live(supertype, KeepReason::SupertypeOf(ty));
                }
            }
            return Ok(());
        }
        if !self.marks.live_types.insert(ty) {
            return Ok(());
        }
        self.flush_edges(ty);
        log::trace!("live type {} ({:?})", program.name(class.name), reason);

        for supertype in self.hierarchy.supertypes(ty).to_vec() {
            self.enqueue_type_live(supertype, KeepReason::SupertypeOf(ty));
        }
        for missing in self.hierarchy.missing_supertypes(ty) {
            self.missing.record(MissingItem::Class(*missing), ty);
        }
        if self.config.trace_annotations && !class.annotations.is_empty() {
            self.worklist.push(EnqueuerAction::TraceAnnotations {
                item: AnnotatedItem::Item(ty),
            });
        }
        if let Some(minimum) = self.pending.remove(KeepPrecondition::ClassLive(ty)) {
            self.apply_minimum(&minimum);
        }
        Ok(())
    }

    fn mark_type_instantiated(&mut self, ty: Token, reason: KeepReason) -> Result<()> {
        let program = self.program;
        let class = program.class(ty).ok_or(Error::UnknownItem(ty))?;
        self.mark_type_live(ty, reason)?;
        if !class.is_program() || !class.is_instantiable() {
            return Ok(());
        }
        if !self.marks.instantiated_types.insert(ty) {
            return Ok(());
        }

        let view = LiveView {
            marks: &self.marks,
            keep_info: &self.keep_info,
        };
        self.cache.remove_instantiated_type(&self.hierarchy, &view, ty);

        let supertypes = self.hierarchy.all_supertypes(ty);
        let mut targets = Vec::new();
        for receiver in std::iter::once(ty).chain(supertypes.iter().copied()) {
            if let Some(calls) = self.virtual_calls.get(&receiver) {
                for resolved in calls {
                    if let Some(target) = lookup_virtual_dispatch_target(program, &self.hierarchy, ty, *resolved) {
                        targets.push((target, KeepReason::DispatchTarget(*resolved)));
                    }
                }
            }
        }

        for supertype in supertypes.iter().filter_map(|token| program.class(*token)) {
            if supertype.is_program() {
                continue;
            }
            for method in program.methods_of(supertype).filter(|method| method.is_virtual()) {
                let Some(target) = lookup_virtual_dispatch_target(program, &self.hierarchy, ty, method.token) else {
                    continue;
                };
                let overrides = program
                    .method(target)
                    .and_then(|target| program.class(target.holder))
                    .is_some_and(|holder| holder.is_program());
                if overrides {
                    targets.push((target, KeepReason::LibraryMethodOverride(ty)));
                }
            }
        }

        for (target, reason) in targets {
            self.enqueue_method_live(target, reason);
        }
        Ok(())
    }

    fn mark_lambda_interface(&mut self, interface: Token, reason: KeepReason) -> Result<()> {
        let program = self.program;
        self.mark_type_live(interface, reason)?;
        if !self.marks.lambda_interfaces.insert(interface) {
            return Ok(());
        }
        self.cache.invalidate_pinned_type(&self.hierarchy, interface);

        let mut targets = Vec::new();
        let receivers = std::iter::once(interface).chain(self.hierarchy.all_supertypes(interface));
        for receiver in receivers {
            if let Some(calls) = self.virtual_calls.get(&receiver) {
                for resolved in calls {
                    if let Some(target) =
                        lookup_virtual_dispatch_target(program, &self.hierarchy, interface, *resolved)
                    {
                        targets.push((target, *resolved));
                    }
                }
            }
        }
        for (target, resolved) in targets {
            self.enqueue_method_live(target, KeepReason::DispatchTarget(resolved));
        }
        Ok(())
    }

    fn mark_class_initialized(&mut self, ty: Token, reason: KeepReason) -> Result<()> {
        let program = self.program;
        let class = program.class(ty).ok_or(Error::UnknownItem(ty))?;
        self.mark_type_live(ty, reason)?;
        if !class.is_program() || !self.marks.initialized_classes.insert(ty) {
            return Ok(());
        }

        if let Some(superclass) = self.hierarchy.superclass(ty) {
            self.enqueue_class_initialized(superclass, KeepReason::SupertypeOf(ty));
        }
        if let Some(initializer) = program.class_initializer(class) {
            self.enqueue_method_live(initializer.token, KeepReason::ClassInitializer(ty));
        }
        Ok(())
    }

    fn mark_method_targeted(&mut self, method: Token, reason: KeepReason) -> Result<()> {
        let program = self.program;
        let definition = program.method(method).ok_or(Error::UnknownItem(method))?;
        if !self.marks.targeted_methods.insert(method) {
            return Ok(());
        }
        self.flush_edges(method);
        self.enqueue_type_live(definition.holder, KeepReason::HolderOf(method));

        let promote = if definition.is_static() || !definition.is_virtual() {
            true
        } else {
            self.marks.instantiated_types.contains(definition.holder)
                && lookup_virtual_dispatch_target(program, &self.hierarchy, definition.holder, method) == Some(method)
        };
        if promote && !definition.is_abstract() {
            self.enqueue_method_live(method, reason);
        }
        Ok(())
    }

    fn mark_method_live(&mut self, method: Token, reason: KeepReason) -> Result<()> {
        let program = self.program;
        let definition = program.method(method).ok_or(Error::UnknownItem(method))?;
        let holder = program
            .class(definition.holder)
            .ok_or_else(|| invariant_error!("method {} without holder", method))?;

        if !holder.is_program() {
            self.mark_type_live(holder.token, reason)?;
            return Ok(());
        }

        if self.marks.targeted_methods.insert(method) {
            self.flush_edges(method);
        }
        if !self.marks.live_methods.insert(method) {
            return Ok(());
        }
        log::trace!("live method {} ({:?})", program.descriptor(method), reason);
        self.enqueue_type_live(holder.token, KeepReason::HolderOf(method));

        for class in descriptor::proto_classes(program.name(definition.proto)) {
            self.worklist.push(EnqueuerAction::TraceTypeReference {
                ty: program.intern(class),
                reason: KeepReason::ReferencedFrom(method),
            });
        }

        if let Some(code) = &definition.code {
            let mut collector = UseCollector::new(method);
            code.register_uses(&mut collector);
            self.worklist.extend(collector.actions);
        }

        if self.config.trace_annotations {
            if !definition.annotations.is_empty() {
                self.worklist.push(EnqueuerAction::TraceAnnotations {
                    item: AnnotatedItem::Item(method),
                });
            }
            for (index, annotations) in definition.parameter_annotations.iter().enumerate() {
                if !annotations.is_empty() {
                    self.worklist.push(EnqueuerAction::TraceAnnotations {
                        item: AnnotatedItem::Parameter(method, index),
                    });
                }
            }
        }
        Ok(())
    }

    fn mark_field_kept(&mut self, field: Token, reason: KeepReason) -> Result<()> {
        self.field_access.get_or_create(field).set(FieldAccessFlags::KEPT);
        self.mark_field_live(field, reason)?;
        if let Some(accesses) = self.deferred.take(field) {
            for access in accesses {
                self.replay(field, access);
            }
        }
        Ok(())
    }

    fn mark_field_live(&mut self, field: Token, reason: KeepReason) -> Result<()> {
        let program = self.program;
        let definition = program.field(field).ok_or(Error::UnknownItem(field))?;
        if !self.marks.live_fields.insert(field) {
            return Ok(());
        }
        self.flush_edges(field);
        log::trace!("live field {} ({:?})", program.descriptor(field), reason);
        self.enqueue_type_live(definition.holder, KeepReason::HolderOf(field));
        self.worklist.push(EnqueuerAction::TraceTypeReference {
            ty: definition.ty,
            reason: KeepReason::ReferencedFrom(field),
        });
        if self.config.trace_annotations && !definition.annotations.is_empty() {
            self.worklist.push(EnqueuerAction::TraceAnnotations {
                item: AnnotatedItem::Item(field),
            });
        }
        Ok(())
    }

    // Trace actions.

    fn trace_invoke(
        &mut self,
        kind: InvokeKind,
        method: &MethodRef,
        receiver: Option<Receiver>,
        context: Token,
        via_handle: bool,
    ) -> Result<()> {
        let program = self.program;
        let reason = if via_handle {
            KeepReason::MethodHandle(context)
        } else {
            KeepReason::InvokedFrom(context)
        };

        let reference_holder = program.class_by_symbol(method.holder);
        if let Some(holder) = reference_holder {
            self.enqueue_type_live(holder.token, KeepReason::ReferencedFrom(context));
        }

        let resolved = match resolve_method(program, &self.hierarchy, method, kind) {
            MethodResolution::Found(resolved) => resolved,
            MethodResolution::ClassNotFound => {
                self.missing.record(MissingItem::Class(method.holder), context);
                return Ok(());
            }
            failure => {
                log::debug!("{} resolves to {:?}", program.method_ref_descriptor(method), failure);
                self.failed_resolutions.insert(*method);
                let library = reference_holder.is_some_and(|holder| !holder.is_program());
                if library && failure == MethodResolution::NoSuchMethod {
                    self.missing.record(MissingItem::Method(*method), context);
                }
                return Ok(());
            }
        };

        let definition = program.method(resolved).ok_or(Error::UnknownItem(resolved))?;
        let holder = program
            .class(definition.holder)
            .ok_or_else(|| invariant_error!("method {} without holder", resolved))?;
        if !holder.is_program() {
            self.enqueue_type_live(holder.token, reason);
            return Ok(());
        }

        match kind {
            InvokeKind::Static => {
                self.enqueue_class_initialized(holder.token, KeepReason::ReferencedFrom(context));
                self.enqueue_method_live(resolved, reason);
            }
            InvokeKind::Direct => self.enqueue_method_live(resolved, reason),
            InvokeKind::Super => {
                if definition.is_private() {
                    log::debug!(
                        "super invoke of private {} from {}",
                        program.descriptor(resolved),
                        program.descriptor(context)
                    );
                    self.broken_super_invokes.insert((context, resolved));
                    self.marks.targeted_methods.insert(resolved);
                    self.report(reason, resolved);
                    self.flush_edges(resolved);
                    self.enqueue_type_live(holder.token, KeepReason::HolderOf(resolved));
                } else {
                    self.enqueue_method_targeted(resolved, reason);
                    let dispatch_on = reference_holder.map_or(holder.token, |holder| holder.token);
                    if let Some(target) = lookup_virtual_dispatch_target(program, &self.hierarchy, dispatch_on, resolved) {
                        self.enqueue_method_live(target, KeepReason::InvokedViaSuper(context));
                    }
                }
            }
            InvokeKind::Virtual | InvokeKind::Interface => {
                let bound = receiver
                    .and_then(|receiver| program.class_by_symbol(receiver.ty))
                    .filter(|class| class.is_program())
                    .or(reference_holder)
                    .map_or(holder.token, |class| class.token);
                let exact = receiver.is_some_and(|receiver| receiver.exact);
                self.trace_virtual_call(kind, resolved, bound, exact, context, reason);
            }
        }
        Ok(())
    }

    fn trace_virtual_call(
        &mut self,
        kind: InvokeKind,
        resolved: Token,
        bound: Token,
        exact: bool,
        context: Token,
        reason: KeepReason,
    ) {
        let program = self.program;
        self.enqueue_method_targeted(resolved, reason);
        if !exact && !self.virtual_calls.entry(bound).or_default().insert(resolved) {
            return;
        }

        let query = SingleTargetQuery {
            receiver: bound,
            method: resolved,
            kind,
            context,
            lower_bound: exact.then_some(bound),
        };
        let view = LiveView {
            marks: &self.marks,
            keep_info: &self.keep_info,
        };
        let single = self.cache.lookup_single_target(program, &self.hierarchy, &view, &query);
        if let Some(target) = single {
            self.enqueue_method_live(target, KeepReason::DispatchTarget(resolved));
        }
        if exact || single.is_some() {
            return;
        }

        let mut targets = Vec::new();
        for ty in std::iter::once(bound).chain(self.hierarchy.all_subtypes(bound)) {
            let dispatches = self.marks.instantiated_types.contains(ty) || self.marks.lambda_interfaces.contains(ty);
            if !dispatches {
                continue;
            }
            if let Some(target) = lookup_virtual_dispatch_target(program, &self.hierarchy, ty, resolved) {
                targets.push(target);
            }
        }
        for target in targets {
            self.enqueue_method_live(target, KeepReason::DispatchTarget(resolved));
        }
    }

    fn trace_field_access(
        &mut self,
        field: &FieldRef,
        kind: FieldAccessKind,
        context: Token,
        value: Option<Symbol>,
        site: Option<usize>,
        replay: bool,
    ) -> Result<()> {
        let program = self.program;
        let reference_holder = program.class_by_symbol(field.holder);
        if let Some(holder) = reference_holder {
            self.enqueue_type_live(holder.token, KeepReason::ReferencedFrom(context));
        }

        let resolved = match resolve_field(program, &self.hierarchy, field) {
            FieldResolution::Found(resolved) => resolved,
            FieldResolution::ClassNotFound => {
                self.missing.record(MissingItem::Class(field.holder), context);
                return Ok(());
            }
            FieldResolution::NoSuchField => {
                self.missing.record(MissingItem::Field(*field), context);
                return Ok(());
            }
        };

        let definition = program.field(resolved).ok_or(Error::UnknownItem(resolved))?;
        let holder = program
            .class(definition.holder)
            .ok_or_else(|| invariant_error!("field {} without holder", resolved))?;
        if !holder.is_program() {
            self.enqueue_type_live(holder.token, KeepReason::ReferencedFrom(context));
            return Ok(());
        }
        if kind.is_static() {
            self.enqueue_class_initialized(holder.token, KeepReason::ReferencedFrom(context));
        }

        if let (false, Some(site)) = (replay, site) {
            let eligible = self.deferred.is_eligible(
                program,
                &self.hierarchy,
                &self.keep_info,
                &self.field_access,
                definition,
                kind,
                context,
                value,
            );
            if eligible {
                self.deferred.defer(
                    resolved,
                    DeferredAccess {
                        field: *field,
                        kind,
                        context,
                        site,
                        value,
                    },
                );
                return Ok(());
            }
        }

        self.field_access.get_or_create(resolved).record(kind, context);
        self.mark_field_live(resolved, KeepReason::ReferencedFrom(context))?;
        self.report(KeepReason::ReferencedFrom(context), resolved);
        if let Some(accesses) = self.deferred.take(resolved) {
            for access in accesses {
                self.replay(resolved, access);
            }
        }
        Ok(())
    }

    fn trace_new_instance(&mut self, ty: Symbol, context: Token) {
        match self.program.class_by_symbol(ty) {
            Some(class) => {
                let reason = KeepReason::InstantiatedIn(context);
                self.enqueue_type_instantiated(class.token, reason);
                self.enqueue_class_initialized(class.token, reason);
            }
            None => self.missing.record(MissingItem::Class(ty), context),
        }
    }

    fn trace_type_reference(&mut self, ty: Symbol, reason: KeepReason) {
        let program = self.program;
        let Some(name) = descriptor::referenced_class(program.name(ty)) else {
            return;
        };
        match program.class_by_name(name) {
            Some(class) => self.enqueue_type_live(class.token, reason),
            None => {
                if let GraphNode::Item(context) = reason.source() {
                    self.missing.record(MissingItem::Class(program.intern(name)), context);
                }
            }
        }
    }

    fn trace_init_class(&mut self, ty: Symbol, context: Token) {
        match self.program.class_by_symbol(ty) {
            Some(class) => self.enqueue_class_initialized(class.token, KeepReason::ReferencedFrom(context)),
            None => self.missing.record(MissingItem::Class(ty), context),
        }
    }

    fn trace_call_site(&mut self, call_site: &CallSite, context: Token) -> Result<()> {
        let program = self.program;
        let reason = KeepReason::InstantiatedViaLambda(context);
        match program.class_by_symbol(call_site.interface) {
            Some(interface) if interface.is_program() && interface.is_interface() => {
                self.enqueue_lambda_interface(interface.token, reason);
                let method = MethodRef {
                    holder: call_site.interface,
                    name: call_site.name,
                    proto: call_site.proto,
                };
                if let Some(resolved) = resolve_method(program, &self.hierarchy, &method, InvokeKind::Interface).method() {
                    self.enqueue_method_targeted(resolved, reason);
                }
            }
            Some(interface) => self.enqueue_type_live(interface.token, reason),
            None => self.missing.record(MissingItem::Class(call_site.interface), context),
        }
        self.trace_method_handle(&call_site.implementation, context)
    }

    fn trace_method_handle(&mut self, handle: &MethodHandle, context: Token) -> Result<()> {
        match handle.target {
            HandleTarget::Method(method) => {
                let kind = match handle.kind {
                    MethodHandleKind::InvokeStatic => InvokeKind::Static,
                    MethodHandleKind::InvokeInstance => InvokeKind::Virtual,
                    MethodHandleKind::InvokeInterface => InvokeKind::Interface,
                    MethodHandleKind::InvokeDirect => InvokeKind::Direct,
                    MethodHandleKind::InvokeConstructor => {
                        self.trace_new_instance(method.holder, context);
                        InvokeKind::Direct
                    }
                    field_kind => {
                        return Err(invariant_error!("{} handle to a method", field_kind));
                    }
                };
                self.trace_invoke(kind, &method, None, context, true)
            }
            HandleTarget::Field(field) => {
                let kind = match handle.kind {
                    MethodHandleKind::StaticGet => FieldAccessKind::StaticRead,
                    MethodHandleKind::StaticPut => FieldAccessKind::StaticWrite,
                    MethodHandleKind::InstanceGet => FieldAccessKind::InstanceRead,
                    MethodHandleKind::InstancePut => FieldAccessKind::InstanceWrite,
                    method_kind => {
                        return Err(invariant_error!("{} handle to a field", method_kind));
                    }
                };
                if let Some(resolved) = resolve_field(self.program, &self.hierarchy, &field).field() {
                    self.field_access
                        .get_or_create(resolved)
                        .set(FieldAccessFlags::METHOD_HANDLE);
                }
                self.trace_field_access(&field, kind, context, None, None, true)
            }
        }
    }

    fn trace_reflective_class(&mut self, ty: Symbol, context: Token) {
        let program = self.program;
        let name = program.name(ty);
        let Some(class) = descriptor::referenced_class(name).and_then(|name| program.class_by_name(name)) else {
            if descriptor::referenced_class(name).is_some() {
                self.missing.record(MissingItem::Class(ty), context);
            }
            return;
        };

        let reason = KeepReason::ReflectiveUse(context);
        self.enqueue_type_live(class.token, reason);
        self.enqueue_class_initialized(class.token, reason);
        if class.is_program() {
            let mut joiner = KeepClassJoiner::new();
            joiner.disallow_minification();
            self.keep_info.join_class(class.token, &joiner);
        }
    }

    fn trace_reflective_field(&mut self, field: &FieldRef, context: Token) -> Result<()> {
        let program = self.program;
        let Some(resolved) = resolve_field(program, &self.hierarchy, field).field() else {
            return self.trace_field_access(field, FieldAccessKind::InstanceRead, context, None, None, true);
        };
        let definition = program.field(resolved).ok_or(Error::UnknownItem(resolved))?;

        self.field_access
            .get_or_create(resolved)
            .set(FieldAccessFlags::REFLECTIVE);
        let mut joiner = KeepFieldJoiner::new();
        joiner.disallow_minification().disallow_optimization();
        self.keep_info.join_field(resolved, &joiner);

        let is_static = definition.is_static();
        self.report(KeepReason::ReflectiveUse(context), resolved);
        self.trace_field_access(field, FieldAccessKind::new(is_static, false), context, None, None, true)?;
        self.trace_field_access(field, FieldAccessKind::new(is_static, true), context, None, None, true)
    }

    fn trace_reflective_method(&mut self, method: &MethodRef, context: Token) -> Result<()> {
        let program = self.program;
        let kind = match program.class_by_symbol(method.holder) {
            Some(holder) if holder.is_interface() => InvokeKind::Interface,
            Some(_) => InvokeKind::Virtual,
            None => {
                self.missing.record(MissingItem::Class(method.holder), context);
                return Ok(());
            }
        };
        let Some(resolved) = resolve_method(program, &self.hierarchy, method, kind).method() else {
            return self.trace_invoke(kind, method, None, context, false);
        };
        let definition = program.method(resolved).ok_or(Error::UnknownItem(resolved))?;

        let kind = if definition.is_static() {
            InvokeKind::Static
        } else if !definition.is_virtual() {
            InvokeKind::Direct
        } else {
            kind
        };
        self.trace_invoke(kind, method, None, context, false)?;

        let holder_is_program = program
            .class(definition.holder)
            .is_some_and(|holder| holder.is_program());
        if holder_is_program {
            let mut joiner = KeepMethodJoiner::new();
            joiner.disallow_minification();
            self.keep_info.join_method(resolved, &joiner);
            self.enqueue_method_live(resolved, KeepReason::ReflectiveUse(context));
            self.enqueue_constructed(resolved, KeepReason::ReflectiveUse(context));
        }
        Ok(())
    }

    fn trace_annotations(&mut self, item: AnnotatedItem) -> Result<()> {
        let program = self.program;
        let token = item.token();
        let annotations: &[Annotation] = match item {
            AnnotatedItem::Item(token) if token.is_class() => {
                &program.class(token).ok_or(Error::UnknownItem(token))?.annotations
            }
            AnnotatedItem::Item(token) if token.is_method() => {
                &program.method(token).ok_or(Error::UnknownItem(token))?.annotations
            }
            AnnotatedItem::Item(token) => &program.field(token).ok_or(Error::UnknownItem(token))?.annotations,
            AnnotatedItem::Parameter(method, index) => program
                .method(method)
                .ok_or(Error::UnknownItem(method))?
                .parameter_annotations
                .get(index)
                .map(Vec::as_slice)
                .unwrap_or_default(),
        };

        for annotation in annotations.iter().filter(|annotation| annotation.is_retained()) {
            self.trace_annotation(annotation, token)?;
        }
        Ok(())
    }

    fn trace_annotation(&mut self, annotation: &Annotation, context: Token) -> Result<()> {
        let program = self.program;
        let reason = KeepReason::ReferencedInAnnotation(context);
        match program.class_by_symbol(annotation.ty) {
            Some(class) => {
                self.enqueue_type_live(class.token, reason);
                if class.is_program() {
                    for element in &annotation.elements {
                        let methods: Vec<Token> = program
                            .methods_of(class)
                            .filter(|method| method.name == element.name)
                            .map(|method| method.token)
                            .collect();
                        for method in methods {
                            self.enqueue_method_live(method, reason);
                        }
                    }
                }
            }
            None => self.missing.record(MissingItem::Class(annotation.ty), context),
        }

        for element in &annotation.elements {
            self.trace_annotation_value(&element.value, context)?;
        }
        Ok(())
    }

    fn trace_annotation_value(&mut self, value: &AnnotationValue, context: Token) -> Result<()> {
        match value {
            AnnotationValue::Type(ty) => {
                self.trace_type_reference(*ty, KeepReason::ReferencedInAnnotation(context));
                Ok(())
            }
            AnnotationValue::Enum { ty, name } => {
                let constant = FieldRef {
                    holder: *ty,
                    name: *name,
                    ty: *ty,
                };
                self.trace_field_access(&constant, FieldAccessKind::StaticRead, context, None, None, true)
            }
            AnnotationValue::Annotation(nested) => self.trace_annotation(nested, context),
            AnnotationValue::Array(values) => {
                for value in values {
                    self.trace_annotation_value(value, context)?;
                }
                Ok(())
            }
            AnnotationValue::Int(_) | AnnotationValue::Bool(_) | AnnotationValue::Str(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::{FieldFlags, MethodFlags},
        rules::{ClassSpec, KeepRule, MemberSpec},
        test::{builder_with_object, virtual_call_program},
    };

    fn keep_main(class: &str) -> RuleSet {
        let mut rules = RuleSet::new();
        rules.add_keep(KeepRule::keep(
            ClassSpec::named(class).unwrap().member(MemberSpec::method("main").unwrap()),
        ));
        rules
    }

    fn method(program: &Program, class: &str, name: &str) -> Token {
        let class = program.class_by_name(class).unwrap();
        program
            .methods_of(class)
            .find(|method| program.name(method.name) == name)
            .unwrap()
            .token
    }

    fn run(program: &Program, rules: &RuleSet) -> EnqueuerResult {
        let config = ShakerConfig::default();
        Enqueuer::new(program, rules, &config, Mode::InitialTreeShaking)
            .run()
            .unwrap()
    }

    #[test]
    fn test_state_starts_idle() {
        let program = virtual_call_program();
        let rules = RuleSet::new();
        let config = ShakerConfig::default();
        let enqueuer = Enqueuer::new(&program, &rules, &config, Mode::InitialTreeShaking);
        assert_eq!(enqueuer.state(), EnqueuerState::Idle);
    }

    #[test]
    fn test_virtual_call_dispatches_to_instantiated_override() {
        let program = virtual_call_program();
        let result = run(&program, &keep_main("app.A"));

        let a = program.class_by_name("app.A").unwrap().token;
        let b = program.class_by_name("app.B").unwrap().token;
        assert!(result.live_types().contains(a));
        assert!(result.live_types().contains(b));
        assert!(result.instantiated_types().contains(b));
        assert!(!result.instantiated_types().contains(a));

        let a_call = method(&program, "app.A", "virtualCall");
        let b_call = method(&program, "app.B", "virtualCall");
        assert!(result.targeted_methods().contains(a_call));
        assert!(!result.live_methods().contains(a_call));
        assert!(result.live_methods().contains(b_call));
        assert!(result.marks().is_consistent());
    }

    #[test]
    fn test_exact_receiver_uses_single_target() {
        let mut builder = builder_with_object();
        builder.class("app.I", |c| {
            c.interface().abstract_method("m", "()void", MethodFlags::PUBLIC);
        });
        for name in ["app.X", "app.Y"] {
            builder.class(name, |c| {
                c.implements("app.I")
                    .init(|m| {
                        m.invoke_direct("java.lang.Object", "<init>", "()void");
                    })
                    .method("m", "()void", MethodFlags::PUBLIC, |_| {});
            });
        }
        builder.class("app.Main", |c| {
            c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.construct("app.X")
                    .invoke_on(InvokeKind::Interface, "app.I", "m", "()void", "app.X", true);
            });
        });
        let program = builder.build().unwrap();
        let result = run(&program, &keep_main("app.Main"));

        assert!(result.live_methods().contains(method(&program, "app.X", "m")));
        assert!(!result.live_methods().contains(method(&program, "app.Y", "m")));
        assert!(!result.live_types().contains(program.class_by_name("app.Y").unwrap().token));
    }

    #[test]
    fn test_static_access_runs_class_initializer() {
        let mut builder = builder_with_object();
        builder.class("app.Config", |c| {
            c.field("LEVEL", "int", FieldFlags::PUBLIC | FieldFlags::STATIC)
                .clinit(|m| {
                    m.put_static("app.Config", "LEVEL", "int");
                });
        });
        builder.class("app.Main", |c| {
            c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.get_static("app.Config", "LEVEL", "int");
            });
        });
        let program = builder.build().unwrap();
        let result = run(&program, &keep_main("app.Main"));

        let config = program.class_by_name("app.Config").unwrap();
        assert!(result.initialized_classes().contains(config.token));
        assert!(result.live_methods().contains(method(&program, "app.Config", "<clinit>")));
        assert!(result.live_fields().contains(config.fields[0]));
    }

    #[test]
    fn test_library_override_live_when_instantiated() {
        let mut builder = builder_with_object();
        builder.library_class("java.lang.Runnable", |c| {
            c.interface().abstract_method("run", "()void", MethodFlags::PUBLIC);
        });
        builder.class("app.Task", |c| {
            c.implements("java.lang.Runnable")
                .init(|m| {
                    m.invoke_direct("java.lang.Object", "<init>", "()void");
                })
                .method("run", "()void", MethodFlags::PUBLIC, |_| {});
        });
        builder.class("app.Main", |c| {
            c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.construct("app.Task");
            });
        });
        let program = builder.build().unwrap();
        let result = run(&program, &keep_main("app.Main"));

        let runnable = program.class_by_name("java.lang.Runnable").unwrap().token;
        assert!(result.live_non_program_types().contains(runnable));
        assert!(result.live_methods().contains(method(&program, "app.Task", "run")));
    }

    #[test]
    fn test_super_invoke_of_private_method_is_recorded() {
        let mut builder = builder_with_object();
        builder.class("app.Base", |c| {
            c.method("hidden", "()void", MethodFlags::PRIVATE, |_| {});
        });
        builder.class("app.Main", |c| {
            c.extends("app.Base")
                .method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                    m.invoke_super("app.Base", "hidden", "()void");
                });
        });
        let program = builder.build().unwrap();
        let result = run(&program, &keep_main("app.Main"));

        let hidden = method(&program, "app.Base", "hidden");
        let main = method(&program, "app.Main", "main");
        assert!(result.broken_super_invokes().contains(&(main, hidden)));
        assert!(result.targeted_methods().contains(hidden));
        assert!(!result.live_methods().contains(hidden));
    }

    #[test]
    fn test_missing_class_is_reported_not_fatal() {
        let mut builder = builder_with_object();
        builder.class("app.Main", |c| {
            c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.invoke_static("com.absent.Helper", "help", "()void");
            });
        });
        let program = builder.build().unwrap();
        let result = run(&program, &keep_main("app.Main"));

        assert_eq!(result.missing().descriptors(), vec!["com.absent.Helper"]);
        assert!(result.live_methods().contains(method(&program, "app.Main", "main")));
    }

    #[test]
    fn test_graph_records_keep_path() {
        let program = virtual_call_program();
        let rules = keep_main("app.A");
        let config = ShakerConfig::default();
        let result = Enqueuer::new(&program, &rules, &config, Mode::WhyAreYouKeeping)
            .run()
            .unwrap();

        let b_call = method(&program, "app.B", "virtualCall");
        let path = result.keep_path(b_call).unwrap();
        assert!(path.render(&program).contains("app.B"));
        assert!(result.keep_path(method(&program, "app.A", "virtualCall")).is_some());
    }

    #[test]
    fn test_graph_skips_edges_to_unmarked_items() {
        let mut builder = builder_with_object();
        builder.library_class("lib.Base", |c| {
            c.method("<init>", "()void", MethodFlags::PUBLIC, |_| {})
                .method("m", "()void", MethodFlags::PUBLIC, |_| {});
        });
        builder.class("app.I", |c| {
            c.interface().abstract_method("m", "()void", MethodFlags::PUBLIC);
        });
        builder.class("app.Impl", |c| {
            c.extends("lib.Base").implements("app.I").init(|m| {
                m.invoke_direct("lib.Base", "<init>", "()void");
            });
        });
        builder.class("app.Main", |c| {
            c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.construct("app.Impl").invoke_interface("app.I", "m", "()void");
            });
        });
        let program = builder.build().unwrap();
        let rules = keep_main("app.Main");
        let config = ShakerConfig::default();
        let result = Enqueuer::new(&program, &rules, &config, Mode::WhyAreYouKeeping)
            .run()
            .unwrap();

        let graph = result.graph().unwrap();
        let base_m = method(&program, "lib.Base", "m");
        assert!(!result.targeted_methods().contains(base_m));
        assert!(!graph.contains(&GraphNode::Item(base_m)));
        assert!(graph.contains(&GraphNode::Item(program.class_by_name("app.Impl").unwrap().token)));
        assert!(graph.contains(&GraphNode::Item(program.class_by_name("lib.Base").unwrap().token)));
    }

    #[test]
    fn test_field_reads_are_recorded_in_graph() {
        let mut builder = builder_with_object();
        builder.class("app.Main", |c| {
            c.field("COUNT", "int", FieldFlags::PUBLIC | FieldFlags::STATIC)
                .method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                    m.get_static("app.Main", "COUNT", "int");
                });
        });
        let program = builder.build().unwrap();
        let rules = keep_main("app.Main");
        let config = ShakerConfig::default();
        let result = Enqueuer::new(&program, &rules, &config, Mode::WhyAreYouKeeping)
            .run()
            .unwrap();

        let count = program.class_by_name("app.Main").unwrap().fields[0];
        let path = result.keep_path(count).unwrap();
        assert!(path.render(&program).contains("COUNT"));
    }
}

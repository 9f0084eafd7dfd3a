//! The reachability fixpoint ("enqueuer").
//!
//! An [`Enqueuer`] computes the transitive closure of live code from the roots named by the
//! keep rules. Work is expressed as [`EnqueuerAction`]s on a FIFO [`Worklist`]; each action
//! marks an item or traces the references of an item, and every action carries a
//! [`KeepReason`] that feeds the retention graph. Mark sets only grow, and an action is only
//! enqueued for an item not yet marked for it, which bounds the pass.
//!
//! # Key Components
//!
//! - [`Enqueuer`] - The fixpoint driver, one per pass
//! - [`Mode`] - Which kind of pass runs (initial, final, main-dex, why-are-you-keeping)
//! - [`RootSetBuilder`] - Parallel matching of keep rules into the initial keep information
//! - [`ConditionalRuleEvaluator`] - `-if` rules, re-evaluated whenever the worklist drains
//! - [`DeferredTracing`] - Speculative pruning of fields that are only written
//! - [`MarkSets`] / [`FieldAccessInfoCollection`] - The growing state of a pass
//! - [`EnqueuerResult`] - The frozen outcome handed to pruning and renaming
//!
//! # Examples
//!
//! ```rust
//! use shaker::{
//!     config::ShakerConfig,
//!     enqueuer::{Enqueuer, Mode},
//!     program::{MethodFlags, ProgramBuilder},
//!     rules::{ClassSpec, KeepRule, RuleSet},
//! };
//!
//! # fn main() -> shaker::Result<()> {
//! let mut builder = ProgramBuilder::new();
//! builder.library_class("java.lang.Object", |c| {
//!     c.no_superclass();
//! });
//! builder.class("app.Kept", |c| {
//!     c.method("run", "()void", MethodFlags::PUBLIC, |_| {});
//! });
//! builder.class("app.Dead", |_| {});
//! let program = builder.build()?;
//!
//! let mut rules = RuleSet::new();
//! rules.add_keep(KeepRule::keep(ClassSpec::named("app.Kept")?));
//!
//! let config = ShakerConfig::default();
//! let result = Enqueuer::new(&program, &rules, &config, Mode::InitialTreeShaking).run()?;
//! let dead = program.class_by_name("app.Dead").unwrap();
//! assert!(!result.is_live(dead.token));
//! # Ok(())
//! # }
//! ```

mod action;
mod deferred;
mod driver;
mod field_access;
mod ifrules;
mod marks;
mod mode;
mod reason;
mod result;
mod roots;
mod worklist;

pub use action::{ActionKind, EnqueuerAction};
pub use deferred::{DeferredAccess, DeferredCommit, DeferredTracing};
pub use driver::{Enqueuer, EnqueuerState};
pub use field_access::{FieldAccessFlags, FieldAccessInfo, FieldAccessInfoCollection};
pub use ifrules::{ConditionalRuleEvaluator, IfRuleStats};
pub use marks::{MarkSet, MarkSets};
pub use mode::Mode;
pub use reason::KeepReason;
pub use result::{EnqueuerResult, EnqueuerStats};
pub use roots::{evaluate_keep_rule, match_class, match_program, ClassMatch, RootSet, RootSetBuilder};
pub use worklist::{Worklist, WorklistStats};

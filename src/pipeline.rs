//! Multi-pass tree shaking.
//!
//! A full run traces the program once ([`Mode::InitialTreeShaking`]), applies the rewrites the
//! deferred field tracing produced, and traces the rewritten program again
//! ([`Mode::FinalTreeShaking`]). The program is only mutated between the two passes. If the
//! rules contain main-dex rules, a [`Mode::MainDexTracing`] pass runs on the final program.
//!
//! Missing references and `-checkdiscard` failures are reported once, after the last pass that
//! decides the output.

use crate::{
    config::ShakerConfig,
    enqueuer::{Enqueuer, EnqueuerResult, Mode},
    program::Program,
    rules::RuleSet,
    Result,
};

/// Results of the passes of one [`Shaker::run`].
#[derive(Debug)]
pub struct ShakeOutcome {
    initial: EnqueuerResult,
    rewritten: usize,
    final_pass: EnqueuerResult,
    main_dex: Option<EnqueuerResult>,
}

impl ShakeOutcome {
    /// Result of the trace before rewriting
    #[must_use]
    pub fn initial(&self) -> &EnqueuerResult {
        &self.initial
    }

    /// Number of instructions replaced between the passes
    #[must_use]
    pub fn rewritten_instructions(&self) -> usize {
        self.rewritten
    }

    /// Result of the trace of the rewritten program; this decides the output
    #[must_use]
    pub fn final_pass(&self) -> &EnqueuerResult {
        &self.final_pass
    }

    /// Result of the main-dex trace, if main-dex rules exist
    #[must_use]
    pub fn main_dex(&self) -> Option<&EnqueuerResult> {
        self.main_dex.as_ref()
    }

    /// Consumes the outcome, returning the deciding result
    #[must_use]
    pub fn into_final(self) -> EnqueuerResult {
        self.final_pass
    }
}

/// Runs the passes of a tree-shaking compilation with one configuration.
///
/// # Examples
///
/// ```rust
/// use shaker::{
///     config::ShakerConfig,
///     pipeline::Shaker,
///     program::{FieldFlags, MethodFlags, ProgramBuilder},
///     rules::{ClassSpec, KeepRule, MemberSpec, RuleSet},
/// };
///
/// # fn main() -> shaker::Result<()> {
/// let mut builder = ProgramBuilder::new();
/// builder.library_class("java.lang.Object", |c| {
///     c.no_superclass()
///         .method("<init>", "()void", MethodFlags::PUBLIC, |_| {});
/// });
/// builder.class("app.Holder", |c| {
///     c.field("cache", "int", FieldFlags::PRIVATE).init(|m| {
///         m.invoke_direct("java.lang.Object", "<init>", "()void")
///             .put_field("app.Holder", "cache", "int");
///     });
/// });
/// builder.class("app.Main", |c| {
///     c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
///         m.construct("app.Holder");
///     });
/// });
/// let mut program = builder.build()?;
///
/// let mut rules = RuleSet::new();
/// rules.add_keep(KeepRule::keep(
///     ClassSpec::named("app.Main")?.member(MemberSpec::method("main")?),
/// ));
///
/// let outcome = Shaker::new(ShakerConfig::default()).run(&mut program, &rules)?;
/// assert_eq!(outcome.initial().pruned_fields().len(), 1);
/// assert_eq!(outcome.rewritten_instructions(), 1);
/// assert!(outcome.final_pass().live_fields().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Shaker {
    config: ShakerConfig,
}

impl Shaker {
    /// Creates a shaker with the given configuration
    #[must_use]
    pub fn new(config: ShakerConfig) -> Self {
        Shaker { config }
    }

    /// The configuration every pass runs with
    #[must_use]
    pub fn config(&self) -> &ShakerConfig {
        &self.config
    }

    /// Runs a single pass of `mode` without reporting.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass hits a structural invariant violation.
    pub fn trace(&self, program: &Program, rules: &RuleSet, mode: Mode) -> Result<EnqueuerResult> {
        Enqueuer::new(program, rules, &self.config, mode).run()
    }

    /// Runs the initial pass, rewrites `program`, runs the final pass and reports.
    ///
    /// # Arguments
    ///
    /// * `program` - The program; receives the rewrites of pruned field accesses
    /// * `rules` - The rules all passes run with
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingDefinitions`] if missing references are configured as
    /// errors, [`crate::Error::CheckDiscardFailed`] if an item marked for discarding survives
    /// the final pass, and any structural error of the passes themselves.
    pub fn run(&self, program: &mut Program, rules: &RuleSet) -> Result<ShakeOutcome> {
        let initial = self.trace(program, rules, Mode::InitialTreeShaking)?;
        let rewritten = program.apply_rewrites(initial.rewrites())?;
        log::debug!(
            "rewrote {rewritten} instructions for {} pruned fields",
            initial.pruned_fields().len()
        );

        let final_pass = self.trace(program, rules, Mode::FinalTreeShaking)?;
        let main_dex = if rules.main_dex_rules().next().is_some() {
            Some(self.trace(program, rules, Mode::MainDexTracing)?)
        } else {
            None
        };

        self.report(&final_pass)?;
        Ok(ShakeOutcome {
            initial,
            rewritten,
            final_pass,
            main_dex,
        })
    }

    /// Reports the diagnostics of a deciding pass.
    ///
    /// # Errors
    ///
    /// See [`Shaker::run`].
    pub fn report(&self, result: &EnqueuerResult) -> Result<()> {
        result
            .missing()
            .clone()
            .into_result(self.config.missing_definitions_are_errors)?;

        result.check_discard().clone().into_result()
    }
}

/// Runs a single tree-shaking pass over `program` and reports its diagnostics.
///
/// The program is not rewritten; use [`Shaker::run`] for the full two-pass pipeline.
///
/// # Errors
///
/// See [`Shaker::run`].
pub fn shake(program: &Program, rules: &RuleSet, config: ShakerConfig) -> Result<EnqueuerResult> {
    let shaker = Shaker::new(config);
    let result = shaker.trace(program, rules, Mode::InitialTreeShaking)?;
    shaker.report(&result)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::MethodFlags,
        rules::{ClassSpec, KeepRule, MemberSpec},
        test::builder_with_object,
        Error,
    };

    fn program() -> Program {
        let mut builder = builder_with_object();
        builder.class("app.Main", |c| {
            c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
                m.invoke_static("app.Used", "run", "()void")
                    .invoke_static("com.gone.Helper", "help", "()void");
            });
        });
        builder.class("app.Used", |c| {
            c.method("run", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |_| {});
        });
        builder.build().unwrap()
    }

    fn rules() -> RuleSet {
        let mut rules = RuleSet::new();
        rules.add_keep(KeepRule::keep(
            ClassSpec::named("app.Main").unwrap().member(MemberSpec::method("main").unwrap()),
        ));
        rules
    }

    #[test]
    fn test_missing_definitions_as_errors() {
        let program = program();
        assert!(shake(&program, &rules(), ShakerConfig::default()).is_ok());

        let config = ShakerConfig {
            missing_definitions_are_errors: true,
            ..ShakerConfig::default()
        };
        match shake(&program, &rules(), config) {
            Err(Error::MissingDefinitions { count, items }) => {
                assert_eq!(count, 1);
                assert_eq!(items, vec!["com.gone.Helper".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dont_warn_suppresses_missing() {
        let program = program();
        let mut rules = rules();
        rules.add_dont_warn("com.gone.**").unwrap();
        let config = ShakerConfig {
            missing_definitions_are_errors: true,
            ..ShakerConfig::default()
        };
        assert!(shake(&program, &rules, config).is_ok());
    }

    #[test]
    fn test_check_discard_failure_is_error() {
        let program = program();
        let mut rules = rules();
        rules.add_check_discard(ClassSpec::named("app.Used").unwrap());
        match shake(&program, &rules, ShakerConfig::default()) {
            Err(Error::CheckDiscardFailed(items)) => assert_eq!(items, vec!["app.Used".to_string()]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_run_without_rewrites_matches_single_pass() {
        let mut program = program();
        let outcome = Shaker::new(ShakerConfig::default())
            .run(&mut program, &rules())
            .unwrap();
        assert_eq!(outcome.rewritten_instructions(), 0);
        assert_eq!(outcome.initial().marks(), outcome.final_pass().marks());
        assert!(outcome.main_dex().is_none());
    }
}

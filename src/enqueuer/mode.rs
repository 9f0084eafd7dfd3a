//! Pass modes of the enqueuer.

/// The kind of pass an [`crate::enqueuer::Enqueuer`] runs.
///
/// Every mode runs the same fixpoint. Modes differ in where roots come from and in which
/// optional stages run after the worklist drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Mode {
    /// First whole-program trace, before optimizations
    InitialTreeShaking,
    /// Trace of the optimized program
    FinalTreeShaking,
    /// Trace from the main-dex rules only
    MainDexTracing,
    /// Tree shaking that always records retention edges
    WhyAreYouKeeping,
}

impl Mode {
    /// Returns true for the modes that decide what the output keeps
    #[must_use]
    pub fn is_tree_shaking(self) -> bool {
        !matches!(self, Mode::MainDexTracing)
    }

    /// Returns true for the first tree-shaking pass
    #[must_use]
    pub fn is_initial(self) -> bool {
        self == Mode::InitialTreeShaking
    }

    /// Returns true for the main-dex trace
    #[must_use]
    pub fn is_main_dex_tracing(self) -> bool {
        self == Mode::MainDexTracing
    }

    /// Returns true if conditional rules are evaluated in this mode
    #[must_use]
    pub fn evaluates_if_rules(self) -> bool {
        self.is_tree_shaking()
    }

    /// Returns true if field accesses may be deferred in this mode.
    ///
    /// Deferral rewrites code, which a diagnostic trace must not do.
    #[must_use]
    pub fn allows_deferred_tracing(self) -> bool {
        matches!(self, Mode::InitialTreeShaking | Mode::FinalTreeShaking)
    }

    /// Returns true if a graph consumer is attached even when none was requested
    #[must_use]
    pub fn records_graph(self) -> bool {
        self == Mode::WhyAreYouKeeping
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_only_tree_shaking_modes_defer() {
        let deferring: Vec<Mode> = Mode::iter().filter(|mode| mode.allows_deferred_tracing()).collect();
        assert_eq!(deferring, vec![Mode::InitialTreeShaking, Mode::FinalTreeShaking]);
        assert!(!Mode::MainDexTracing.evaluates_if_rules());
        assert!(Mode::WhyAreYouKeeping.records_graph());
        assert_eq!(Mode::FinalTreeShaking.to_string(), "FinalTreeShaking");
    }
}

//! Configuration for tree shaking.
//!
//! [`ShakerConfig`] is an immutable value handed to every component that needs it. Global
//! switches that gate per-item permissions are derived from it through
//! [`ShakerConfig::global_keep_info`] and passed explicitly into keep-info queries.

use crate::keepinfo::GlobalKeepInfoConfiguration;

/// Configuration for the enqueuer and the passes around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShakerConfig {
    /// Remove unreachable items (default: true).
    ///
    /// When disabled every program class, method and field is a pinned root.
    pub shrinking: bool,

    /// Allow renaming of items that are not kept (default: true).
    pub minification: bool,

    /// Allow optimizations of items that are not kept (default: true).
    pub optimization: bool,

    /// Allow moving classes between packages (default: false).
    pub repackaging: bool,

    /// Allow widening visibility (default: false).
    pub access_modification: bool,

    /// Allow removal of annotations that are not kept (default: true).
    pub annotation_removal: bool,

    /// Defer tracing of field accesses that look prunable (default: true).
    pub deferred_tracing: bool,

    /// Report unsuppressed missing definitions as an error instead of a warning (default: false).
    pub missing_definitions_are_errors: bool,

    /// Trace annotations of live items (default: true).
    pub trace_annotations: bool,

    /// Upper bound on conditional-rule rounds per pass, `None` to run until stable.
    pub max_if_rule_rounds: Option<usize>,
}

impl Default for ShakerConfig {
    fn default() -> Self {
        Self {
            shrinking: true,
            minification: true,
            optimization: true,
            repackaging: false,
            access_modification: false,
            annotation_removal: true,
            deferred_tracing: true,
            missing_definitions_are_errors: false,
            trace_annotations: true,
            max_if_rule_rounds: None,
        }
    }
}

impl ShakerConfig {
    /// Creates the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that only computes reachability: no renaming, optimization or speculation.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            minification: false,
            optimization: false,
            deferred_tracing: false,
            annotation_removal: false,
            ..Self::default()
        }
    }

    /// Global switches for keep-info queries
    #[must_use]
    pub fn global_keep_info(&self) -> GlobalKeepInfoConfiguration {
        GlobalKeepInfoConfiguration {
            shrinking: self.shrinking,
            minification: self.minification,
            optimization: self.optimization,
            repackaging: self.repackaging,
            access_modification: self.access_modification,
            annotation_removal: self.annotation_removal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_keep_info_follows_switches() {
        let config = ShakerConfig {
            minification: false,
            repackaging: true,
            ..ShakerConfig::default()
        };
        let global = config.global_keep_info();
        assert!(global.shrinking);
        assert!(!global.minification);
        assert!(global.repackaging);
        assert!(!global.access_modification);

        let conservative = ShakerConfig::conservative();
        assert!(!conservative.deferred_tracing);
        assert!(conservative.shrinking);
    }
}

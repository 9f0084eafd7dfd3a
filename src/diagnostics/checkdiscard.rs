//! `-checkdiscard`: report items that were expected to be removed but survived.
//!
//! Items matched by a check-discard request carry [`KeepConstraints::CHECK_DISCARDED`] in their
//! keep information. After the pass, every program item is scanned in parallel; surviving
//! marked items are collected under a lock and sorted by descriptor, so the report does not
//! depend on scheduling.
//!
//! [`KeepConstraints::CHECK_DISCARDED`]: crate::keepinfo::KeepConstraints::CHECK_DISCARDED

use std::sync::Mutex;

use rayon::prelude::*;

use crate::{
    keepinfo::KeepInfoSnapshot,
    program::{Program, Token},
    Error, Result,
};

/// Parallel scan for surviving check-discard items.
pub struct CheckDiscard;

impl CheckDiscard {
    /// Collects every marked program item for which `is_live` holds.
    ///
    /// # Arguments
    ///
    /// * `program` - The program that was traced
    /// * `keep_info` - Frozen keep information of the pass
    /// * `is_live` - Whether an item survives the pass
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the shared failure list cannot be consumed.
    pub fn run<F>(program: &Program, keep_info: &KeepInfoSnapshot, is_live: F) -> Result<CheckDiscardReport>
    where
        F: Fn(Token) -> bool + Sync,
    {
        let failures = Mutex::new(Vec::new());

        program
            .classes()
            .par_iter()
            .filter(|class| class.is_program())
            .for_each(|class| {
                let mut found = Vec::new();
                if keep_info.class_info(class.token).is_check_discarded_enabled() && is_live(class.token) {
                    found.push(class.token);
                }
                for method in &class.methods {
                    if keep_info.method_info(*method).is_check_discarded_enabled() && is_live(*method) {
                        found.push(*method);
                    }
                }
                for field in &class.fields {
                    if keep_info.field_info(*field).is_check_discarded_enabled() && is_live(*field) {
                        found.push(*field);
                    }
                }
                if !found.is_empty() {
                    lock!(failures).extend(found);
                }
            });

        let mut failures: Vec<(String, Token)> = into_inner!(failures)?
            .into_iter()
            .map(|token| (program.descriptor(token), token))
            .collect();
        failures.sort();

        for (descriptor, _) in &failures {
            log::warn!("discard check failed: {} was not discarded", descriptor);
        }
        Ok(CheckDiscardReport { failures })
    }
}

/// Surviving check-discard items, sorted by descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckDiscardReport {
    failures: Vec<(String, Token)>,
}

impl CheckDiscardReport {
    /// Returns true if every marked item was discarded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of surviving items
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Surviving items in report order
    pub fn items(&self) -> impl Iterator<Item = Token> + '_ {
        self.failures.iter().map(|(_, token)| *token)
    }

    /// Descriptors of the surviving items in report order
    #[must_use]
    pub fn descriptors(&self) -> Vec<&str> {
        self.failures.iter().map(|(descriptor, _)| descriptor.as_str()).collect()
    }

    /// Converts the report into a result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CheckDiscardFailed`] listing every surviving item.
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(Error::CheckDiscardFailed(
            self.failures.into_iter().map(|(descriptor, _)| descriptor).collect(),
        ))
    }
}

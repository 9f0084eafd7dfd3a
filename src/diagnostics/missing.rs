//! Collection and reporting of references to missing definitions.
//!
//! Tracing never stops at a missing class or member. The reference is recorded together with
//! the item that made it, and once the pass is done the collected references are turned into a
//! sorted [`MissingItemsReport`]. Names matched by a `-dontwarn` pattern are suppressed.

use std::collections::BTreeSet;

use dashmap::DashMap;

use crate::{
    program::{FieldRef, MethodRef, Program, Symbol, Token},
    rules::RuleSet,
    Error, Result,
};

/// A reference to something the program does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MissingItem {
    /// A class that is not defined at all
    Class(Symbol),
    /// A method not found in a defined class
    Method(MethodRef),
    /// A field not found in a defined class
    Field(FieldRef),
}

impl MissingItem {
    /// The class the missing item belongs to
    #[must_use]
    pub fn class(&self) -> Symbol {
        match self {
            MissingItem::Class(name) => *name,
            MissingItem::Method(method) => method.holder,
            MissingItem::Field(field) => field.holder,
        }
    }

    /// Descriptor of the missing item
    #[must_use]
    pub fn describe(&self, program: &Program) -> String {
        match self {
            MissingItem::Class(name) => program.name(*name).to_string(),
            MissingItem::Method(method) => program.method_ref_descriptor(method),
            MissingItem::Field(field) => program.field_ref_descriptor(field),
        }
    }
}

/// Concurrent collector of missing references and the items that made them.
#[derive(Debug, Default)]
pub struct MissingItemsCollector {
    items: DashMap<MissingItem, BTreeSet<Token>>,
}

impl MissingItemsCollector {
    /// Creates an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `context` references the missing `item`
    pub fn record(&self, item: MissingItem, context: Token) {
        self.items.entry(item).or_default().insert(context);
    }

    /// Returns true if `item` has been recorded
    #[must_use]
    pub fn contains(&self, item: &MissingItem) -> bool {
        self.items.contains_key(item)
    }

    /// Number of distinct missing items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is missing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Builds the sorted report, suppressing items whose class matches a `-dontwarn` pattern.
    #[must_use]
    pub fn report(&self, program: &Program, rules: &RuleSet) -> MissingItemsReport {
        let mut entries = Vec::new();
        let mut suppressed = 0;
        for entry in &self.items {
            let item = entry.key();
            if rules.is_dont_warn(program.name(item.class())) {
                suppressed += 1;
                continue;
            }
            let mut contexts: Vec<String> = entry
                .value()
                .iter()
                .map(|context| program.descriptor(*context))
                .collect();
            contexts.sort();
            entries.push(MissingEntry {
                item: *item,
                descriptor: item.describe(program),
                contexts,
            });
        }
        entries.sort_by(|a, b| a.descriptor.cmp(&b.descriptor));

        MissingItemsReport {
            entries,
            suppressed,
        }
    }
}

/// A missing item with the descriptors of its referencing contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntry {
    /// The missing item
    pub item: MissingItem,
    /// Descriptor of the missing item
    pub descriptor: String,
    /// Sorted descriptors of the items referencing it
    pub contexts: Vec<String>,
}

/// Unsuppressed missing references, sorted by descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingItemsReport {
    entries: Vec<MissingEntry>,
    suppressed: usize,
}

impl MissingItemsReport {
    /// The unsuppressed entries in descriptor order
    #[must_use]
    pub fn entries(&self) -> &[MissingEntry] {
        &self.entries
    }

    /// Descriptors of the unsuppressed entries
    #[must_use]
    pub fn descriptors(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.descriptor.as_str()).collect()
    }

    /// Number of items suppressed by `-dontwarn`
    #[must_use]
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Returns true if nothing needs reporting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logs every entry as a warning
    pub fn log_warnings(&self) {
        for entry in &self.entries {
            log::warn!(
                "missing definition {} referenced from {}",
                entry.descriptor,
                entry.contexts.join(", ")
            );
        }
    }

    /// Converts the report into a result.
    ///
    /// With `as_errors` unset every entry is logged as a warning and `Ok` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDefinitions`] if `as_errors` is set and any entry exists.
    pub fn into_result(self, as_errors: bool) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        if !as_errors {
            self.log_warnings();
            return Ok(());
        }
        Err(Error::MissingDefinitions {
            count: self.entries.len(),
            items: self.entries.into_iter().map(|entry| entry.descriptor).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::builder_with_object;

    #[test]
    fn test_report_sorted_and_filtered() {
        let program = builder_with_object().build().unwrap();
        let context = Token::method(0);
        let collector = MissingItemsCollector::new();
        collector.record(MissingItem::Class(program.intern("z.Gone")), context);
        collector.record(MissingItem::Class(program.intern("a.Gone")), context);
        collector.record(
            MissingItem::Method(MethodRef {
                holder: program.intern("a.Gone"),
                name: program.intern("run"),
                proto: program.intern("()void"),
            }),
            context,
        );
        collector.record(MissingItem::Class(program.intern("javax.Optional")), context);
        collector.record(MissingItem::Class(program.intern("a.Gone")), context);
        assert_eq!(collector.len(), 4);

        let mut rules = RuleSet::new();
        rules.add_dont_warn("javax.**").unwrap();
        let report = collector.report(&program, &rules);

        assert_eq!(report.descriptors(), vec!["a.Gone", "a.Gone.run()void", "z.Gone"]);
        assert_eq!(report.suppressed(), 1);
        assert_eq!(
            report.entries()[0].contexts,
            vec!["java.lang.Object.<init>()void".to_string()]
        );

        assert!(report.clone().into_result(false).is_ok());
        match report.into_result(true) {
            Err(Error::MissingDefinitions { count, items }) => {
                assert_eq!(count, 3);
                assert_eq!(items[0], "a.Gone");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

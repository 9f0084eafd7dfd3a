//! Per-field record of traced reads and writes.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;

use crate::program::{FieldAccessKind, Token};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Ways a field is accessed other than by plain instructions.
    pub struct FieldAccessFlags: u8 {
        /// Looked up through reflection
        const REFLECTIVE = 1 << 0;
        /// Target of a constant method handle
        const METHOD_HANDLE = 1 << 1;
        /// Kept by a rule
        const KEPT = 1 << 2;
        /// Accessed statically at least once
        const STATIC = 1 << 3;
    }
}

/// Traced accesses of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAccessInfo {
    reads: BTreeSet<Token>,
    writes: BTreeSet<Token>,
    flags: FieldAccessFlags,
}

impl FieldAccessInfo {
    /// Records an access from `context`, returning true if the context is new for this kind
    pub fn record(&mut self, kind: FieldAccessKind, context: Token) -> bool {
        if kind.is_static() {
            self.flags |= FieldAccessFlags::STATIC;
        }
        if kind.is_read() {
            self.reads.insert(context)
        } else {
            self.writes.insert(context)
        }
    }

    /// Adds flags
    pub fn set(&mut self, flags: FieldAccessFlags) {
        self.flags |= flags;
    }

    /// Items reading the field
    #[must_use]
    pub fn readers(&self) -> &BTreeSet<Token> {
        &self.reads
    }

    /// Items writing the field
    #[must_use]
    pub fn writers(&self) -> &BTreeSet<Token> {
        &self.writes
    }

    /// The access flags
    #[must_use]
    pub fn flags(&self) -> FieldAccessFlags {
        self.flags
    }

    /// Returns true if any read was traced
    #[must_use]
    pub fn is_read(&self) -> bool {
        !self.reads.is_empty()
    }

    /// Returns true if any write was traced
    #[must_use]
    pub fn is_written(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Returns true if an instruction access was traced
    #[must_use]
    pub fn has_traced_access(&self) -> bool {
        self.is_read() || self.is_written()
    }

    /// Returns true if the field is accessed reflectively
    #[must_use]
    pub fn is_reflective(&self) -> bool {
        self.flags.contains(FieldAccessFlags::REFLECTIVE)
    }

    /// Returns true if the field is the target of a method handle
    #[must_use]
    pub fn is_method_handle_target(&self) -> bool {
        self.flags.contains(FieldAccessFlags::METHOD_HANDLE)
    }

    /// Returns true if the field is kept by a rule
    #[must_use]
    pub fn is_kept(&self) -> bool {
        self.flags.contains(FieldAccessFlags::KEPT)
    }

    /// Returns true if writes may be removed: the field is never read and nothing outside the
    /// traced instructions can observe it
    #[must_use]
    pub fn is_write_only(&self) -> bool {
        !self.is_read()
            && !self
                .flags
                .intersects(FieldAccessFlags::REFLECTIVE | FieldAccessFlags::METHOD_HANDLE | FieldAccessFlags::KEPT)
    }
}

/// Access records of all fields, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAccessInfoCollection {
    infos: BTreeMap<Token, FieldAccessInfo>,
}

impl FieldAccessInfoCollection {
    /// Creates an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The record of a field, if any access was seen
    #[must_use]
    pub fn get(&self, field: Token) -> Option<&FieldAccessInfo> {
        self.infos.get(&field)
    }

    /// The record of a field, created empty on first access
    pub fn get_or_create(&mut self, field: Token) -> &mut FieldAccessInfo {
        self.infos.entry(field).or_default()
    }

    /// Returns true if the field has a record with a traced access
    #[must_use]
    pub fn has_traced_access(&self, field: Token) -> bool {
        self.infos
            .get(&field)
            .is_some_and(FieldAccessInfo::has_traced_access)
    }

    /// Returns true if the field has a record carrying any of `flags`
    #[must_use]
    pub fn has_any(&self, field: Token, flags: FieldAccessFlags) -> bool {
        self.infos
            .get(&field)
            .is_some_and(|info| info.flags().intersects(flags))
    }

    /// Drops the record of a field whose accesses were pruned
    pub(crate) fn remove(&mut self, field: Token) -> Option<FieldAccessInfo> {
        self.infos.remove(&field)
    }

    /// All records in field order
    pub fn iter(&self) -> impl Iterator<Item = (Token, &FieldAccessInfo)> {
        self.infos.iter().map(|(field, info)| (*field, info))
    }

    /// Number of fields with a record
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns true if no field has a record
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_flags() {
        let mut collection = FieldAccessInfoCollection::new();
        let field = Token::field(0);
        let context = Token::method(2);

        assert!(!collection.has_traced_access(field));
        let info = collection.get_or_create(field);
        assert!(info.record(FieldAccessKind::InstanceWrite, context));
        assert!(!info.record(FieldAccessKind::InstanceWrite, context));
        assert!(info.is_write_only());

        info.set(FieldAccessFlags::REFLECTIVE);
        assert!(!info.is_write_only());
        assert!(collection.has_traced_access(field));
        assert!(collection.has_any(field, FieldAccessFlags::REFLECTIVE | FieldAccessFlags::KEPT));

        let info = collection.get_or_create(field);
        info.record(FieldAccessKind::StaticRead, context);
        assert!(info.flags().contains(FieldAccessFlags::STATIC));
        assert_eq!(info.readers().len(), 1);
        assert!(collection.remove(field).is_some());
        assert!(collection.is_empty());
    }
}

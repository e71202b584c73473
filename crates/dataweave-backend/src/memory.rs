//! In-memory reference backend.

use dataweave_core::identifier::Id;
use indexmap::IndexMap;
use log::{debug, trace};

use crate::{
    backend::Backend,
    error::BackendError,
    record::{Attribute, EntityKind, Record},
};

/// Keeps every record in insertion-ordered maps.
///
/// Nothing is persisted; [`Backend::flush`] only counts calls.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: IndexMap<Id, Record>,
    children: IndexMap<Id, Vec<Id>>,
    flushes: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of successful flushes.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn children_of(&self, parent: Id) -> impl Iterator<Item = &Record> {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
    }
}

impl Backend for MemoryBackend {
    fn create(&mut self, record: Record) -> Result<(), BackendError> {
        let id = record.id();
        if self.records.contains_key(&id) {
            return Err(BackendError::AlreadyExists(id));
        }
        if let Some(parent) = record.parent() {
            if !self.records.contains_key(&parent) {
                return Err(BackendError::NotFound(parent));
            }
            self.children.entry(parent).or_default().push(id);
        }
        trace!(id:%, kind:% = record.kind(); "Stored record");
        self.records.insert(id, record);
        Ok(())
    }

    fn delete(&mut self, id: Id) -> Result<Vec<Id>, BackendError> {
        let Some(record) = self.records.get(&id) else {
            return Err(BackendError::NotFound(id));
        };
        if let Some(parent) = record.parent()
            && let Some(siblings) = self.children.get_mut(&parent)
        {
            siblings.retain(|sibling| *sibling != id);
        }

        let mut removed = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(owned) = self.children.shift_remove(&next) {
                pending.extend(owned.into_iter().rev());
            }
            self.records.shift_remove(&next);
            removed.push(next);
        }

        debug!(id:%, removed = removed.len(); "Deleted record subtree");
        Ok(removed)
    }

    fn get(&self, id: Id) -> Option<&Record> {
        self.records.get(&id)
    }

    fn find(&self, parent: Id, kind: EntityKind, name: &str) -> Option<Id> {
        self.children_of(parent)
            .find(|record| record.kind() == kind && record.name() == Some(name))
            .map(Record::id)
    }

    fn list(&self, parent: Id, kind: EntityKind) -> Vec<Id> {
        self.children_of(parent)
            .filter(|record| record.kind() == kind)
            .map(Record::id)
            .collect()
    }

    fn records(&self, kind: EntityKind) -> Vec<Id> {
        self.records
            .values()
            .filter(|record| record.kind() == kind)
            .map(Record::id)
            .collect()
    }

    fn set_attribute(&mut self, id: Id, key: &str, value: Option<Attribute>) -> Result<(), BackendError> {
        let record = self.records.get_mut(&id).ok_or(BackendError::NotFound(id))?;
        record.set(key, value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        self.flushes += 1;
        trace!(records = self.records.len(); "Flushed memory backend");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::attr;

    fn named(kind: EntityKind, parent: Option<Id>, name: &str) -> Record {
        Record::new(Id::generate(), kind, parent).with(attr::NAME, Attribute::Text(name.to_string()))
    }

    #[test]
    fn test_create_requires_parent() {
        let mut backend = MemoryBackend::new();
        let orphan = named(EntityKind::Block, Some(Id::generate()), "b");
        assert!(matches!(backend.create(orphan), Err(BackendError::NotFound(_))));
        assert!(backend.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut backend = MemoryBackend::new();
        let file = Record::new(Id::generate(), EntityKind::File, None);
        backend.create(file.clone()).unwrap();
        assert!(matches!(backend.create(file), Err(BackendError::AlreadyExists(_))));
    }

    #[test]
    fn test_find_by_kind_and_name() {
        let mut backend = MemoryBackend::new();
        let file = Record::new(Id::generate(), EntityKind::File, None);
        let file_id = file.id();
        backend.create(file).unwrap();

        let block = named(EntityKind::Block, Some(file_id), "session");
        let block_id = block.id();
        backend.create(block).unwrap();
        backend.create(named(EntityKind::Section, Some(file_id), "session")).unwrap();

        assert_eq!(backend.find(file_id, EntityKind::Block, "session"), Some(block_id));
        assert_eq!(backend.find(file_id, EntityKind::Block, "other"), None);
        assert_eq!(backend.list(file_id, EntityKind::Section).len(), 1);
    }
}

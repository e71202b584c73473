//! The storage contract consumed by the entity layer.

use std::fmt;

use dataweave_core::identifier::Id;

use crate::{
    error::BackendError,
    record::{Attribute, EntityKind, Record},
};

/// A store of entity records organised as an ownership tree.
///
/// Every record except the file record has a parent; deleting a record
/// deletes everything it owns. Backends only keep the tree and attributes
/// consistent with themselves: cross-references between records are the
/// concern of the entity layer.
///
/// All calls are synchronous.
pub trait Backend: fmt::Debug + Send + Sync {
    /// Stores a new record under its parent.
    ///
    /// # Errors
    ///
    /// [`BackendError::AlreadyExists`] for a reused id and
    /// [`BackendError::NotFound`] for a missing parent.
    fn create(&mut self, record: Record) -> Result<(), BackendError>;

    /// Removes a record together with every record it owns.
    ///
    /// Returns the removed ids, owners before the records they own.
    fn delete(&mut self, id: Id) -> Result<Vec<Id>, BackendError>;

    /// Returns the record with the given id.
    fn get(&self, id: Id) -> Option<&Record>;

    /// Returns the child of `parent` of the given kind with the given name.
    fn find(&self, parent: Id, kind: EntityKind, name: &str) -> Option<Id>;

    /// Returns the children of `parent` of the given kind in creation order.
    fn list(&self, parent: Id, kind: EntityKind) -> Vec<Id>;

    /// Returns every record of the given kind in creation order.
    fn records(&self, kind: EntityKind) -> Vec<Id>;

    /// Sets (`Some`) or clears (`None`) one attribute of a record.
    fn set_attribute(&mut self, id: Id, key: &str, value: Option<Attribute>) -> Result<(), BackendError>;

    /// Reads one attribute of a record.
    fn attribute(&self, id: Id, key: &str) -> Result<Option<&Attribute>, BackendError> {
        self.get(id)
            .map(|record| record.get(key))
            .ok_or(BackendError::NotFound(id))
    }

    /// Persists pending changes.
    fn flush(&mut self) -> Result<(), BackendError>;

    fn contains(&self, id: Id) -> bool {
        self.get(id).is_some()
    }
}

//! Shared ownership of an open file's backend.
//!
//! Every public entity wraps an optional [`Handle`]: the shared file state
//! plus the id of the entity's record. Cloning an entity clones the handle
//! and never copies backend state. The backend is released when the file is
//! closed or the last handle is dropped.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use dataweave_backend::{Attribute, Backend, EntityKind, Record, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
};

use crate::config::Config;

type Slot = Option<Box<dyn Backend>>;

/// State shared by every handle of one file.
pub(crate) struct FileShared {
    backend: RwLock<Slot>,
    config: Config,
    file_id: Id,
}

impl FileShared {
    pub(crate) fn new(backend: Box<dyn Backend>, config: Config, file_id: Id) -> Self {
        Self {
            backend: RwLock::new(Some(backend)),
            config,
            file_id,
        }
    }

    fn read_slot(&self) -> Result<RwLockReadGuard<'_, Slot>> {
        self.backend
            .read()
            .map_err(|_| Error::invalid_file("file lock poisoned"))
    }

    fn write_slot(&self) -> Result<RwLockWriteGuard<'_, Slot>> {
        self.backend
            .write()
            .map_err(|_| Error::invalid_file("file lock poisoned"))
    }

    pub(crate) fn is_open(&self) -> bool {
        self.read_slot().is_ok_and(|slot| slot.is_some())
    }

    /// Detaches the backend; later calls through any handle fail as uninitialized.
    pub(crate) fn take(&self) -> Result<Option<Box<dyn Backend>>> {
        Ok(self.write_slot()?.take())
    }
}

/// A bound reference to one record of an open file.
#[derive(Clone)]
pub struct Handle {
    file: Arc<FileShared>,
    id: Id,
    kind: EntityKind,
}

impl Handle {
    pub(crate) fn new(file: Arc<FileShared>, id: Id, kind: EntityKind) -> Self {
        Self { file, id, kind }
    }

    pub(crate) fn id(&self) -> Id {
        self.id
    }

    pub(crate) fn kind(&self) -> EntityKind {
        self.kind
    }

    pub(crate) fn config(&self) -> &Config {
        &self.file.config
    }

    pub(crate) fn file_id(&self) -> Id {
        self.file.file_id
    }

    pub(crate) fn shared(&self) -> &Arc<FileShared> {
        &self.file
    }

    /// Returns a handle to another record of the same file.
    pub(crate) fn with(&self, id: Id, kind: EntityKind) -> Handle {
        Handle::new(Arc::clone(&self.file), id, kind)
    }

    pub(crate) fn same_file(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.file, &other.file)
    }

    /// Returns `true` while the file is open and the record exists.
    pub(crate) fn exists(&self) -> bool {
        self.file
            .read_slot()
            .is_ok_and(|slot| slot.as_deref().is_some_and(|backend| backend.contains(self.id)))
    }

    /// Runs `f` against the backend and this handle's record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UninitializedEntity`] if the file is closed or the
    /// record no longer exists, otherwise whatever `f` returns.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&dyn Backend, &Record) -> Result<R>) -> Result<R> {
        let slot = self.file.read_slot()?;
        let backend = slot.as_deref().ok_or_else(closed)?;
        let record = backend.get(self.id).ok_or_else(|| self.gone())?;
        f(backend, record)
    }

    /// Runs a mutation against the backend.
    ///
    /// The record must exist when `f` starts. After `f` succeeds the
    /// record's modification time is bumped if it still exists.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut dyn Backend) -> Result<R>) -> Result<R> {
        let mut slot = self.file.write_slot()?;
        let backend = slot.as_deref_mut().ok_or_else(closed)?;
        if !backend.contains(self.id) {
            return Err(self.gone());
        }
        let result = f(&mut *backend)?;
        if backend.contains(self.id) {
            backend.set_attribute(self.id, attr::UPDATED_AT, Some(Attribute::Integer(now())))?;
        }
        Ok(result)
    }

    /// Runs `f` against the backend without requiring this record to exist.
    pub(crate) fn with_backend<R>(&self, f: impl FnOnce(&mut dyn Backend) -> Result<R>) -> Result<R> {
        let mut slot = self.file.write_slot()?;
        let backend = slot.as_deref_mut().ok_or_else(closed)?;
        f(backend)
    }

    fn gone(&self) -> Error {
        Error::uninitialized(format!("{} {} no longer exists", self.kind, self.id))
    }
}

fn closed() -> Error {
    Error::uninitialized("file is closed")
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.same_file(other) && self.id == other.id
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.file).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

/// Access to the handle of a public entity type.
pub trait HasHandle {
    #[doc(hidden)]
    fn raw_handle(&self) -> Option<&Handle>;

    #[doc(hidden)]
    fn handle(&self) -> Result<&Handle> {
        self.raw_handle()
            .ok_or_else(|| Error::uninitialized("entity handle is not bound"))
    }
}

/// Construction of a public entity type from a handle.
pub trait Wrap: HasHandle + Sized {
    #[doc(hidden)]
    const KIND: EntityKind;

    #[doc(hidden)]
    fn from_handle(handle: Handle) -> Self;

    /// Wraps the record `id` of the file `handle` belongs to.
    #[doc(hidden)]
    fn wrap(handle: &Handle, id: Id) -> Self {
        Self::from_handle(handle.with(id, Self::KIND))
    }
}

/// Current time in unix seconds.
pub(crate) fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Fetches a record that must exist.
pub(crate) fn record(backend: &dyn Backend, id: Id) -> Result<&Record> {
    backend
        .get(id)
        .ok_or_else(|| Error::uninitialized(format!("record {id} no longer exists")))
}

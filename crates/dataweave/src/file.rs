//! The root container: blocks and root metadata sections.

use std::sync::Arc;

use dataweave_backend::{Attribute, Backend, EntityKind, MemoryBackend, Record, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
};
use log::{debug, info, warn};

use crate::{
    block::Block,
    config::Config,
    entity::{entity_type, required_text},
    filter::Filter,
    graph,
    handle::{FileShared, Handle, HasHandle, Wrap, now},
    section::{self, Section},
    validator::{self, ValidationReport},
};

/// Format version written into new files.
pub const FORMAT_VERSION: [u64; 3] = [1, 2, 0];

entity_type!(
    /// An open data file.
    ///
    /// A file owns blocks and root sections. Closing the file (or dropping
    /// its last handle, including the handles of every entity obtained from
    /// it) releases the backend.
    ///
    /// # Examples
    ///
    /// ```
    /// use dataweave::{File, NamedEntity, config::Config};
    ///
    /// let file = File::create(Config::default()).unwrap();
    /// let block = file.create_block("session", "recording").unwrap();
    /// assert_eq!(block.name().unwrap(), "session");
    ///
    /// file.close().unwrap();
    /// assert!(block.name().is_err());
    /// ```
    File,
    EntityKind::File
);

impl File {
    /// Creates a new file kept in memory.
    pub fn create(config: Config) -> Result<File> {
        File::create_in(Box::new(MemoryBackend::new()), config)
    }

    /// Creates a new file in an empty backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFile`] if the backend already holds a file.
    pub fn create_in(mut backend: Box<dyn Backend>, config: Config) -> Result<File> {
        if !backend.records(EntityKind::File).is_empty() {
            return Err(Error::invalid_file("backend already contains a file"));
        }

        let time = now();
        let id = Id::generate();
        let record = Record::new(id, EntityKind::File, None)
            .with(attr::FORMAT, Attribute::Text(config.file().format().to_string()))
            .with(attr::VERSION, Attribute::Integers(FORMAT_VERSION.to_vec()))
            .with(attr::CREATED_AT, Attribute::Integer(time))
            .with(attr::UPDATED_AT, Attribute::Integer(time));
        backend.create(record)?;

        info!(id:%, format = config.file().format(); "Created file");
        Ok(File::bind(backend, config, id))
    }

    /// Opens the file stored in `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFile`] if the backend does not hold exactly one
    /// file, the format tag differs from the configured one, or the format
    /// version is not compatible.
    pub fn open(backend: Box<dyn Backend>, config: Config) -> Result<File> {
        let files = backend.records(EntityKind::File);
        let [id] = files.as_slice() else {
            return Err(Error::invalid_file(format!(
                "backend holds {} files, expected one",
                files.len()
            )));
        };
        let id = *id;
        let record = backend
            .get(id)
            .ok_or_else(|| Error::invalid_file("file record vanished"))?;

        let format = record.text(attr::FORMAT).unwrap_or_default();
        if format != config.file().format() {
            return Err(Error::invalid_file(format!(
                "file format `{format}` does not match `{}`",
                config.file().format()
            )));
        }

        let version = record.integers(attr::VERSION);
        if !is_compatible(version) {
            return Err(Error::invalid_file(format!(
                "file version {version:?} is not compatible with {FORMAT_VERSION:?}"
            )));
        }

        info!(id:%, format; "Opened file");
        Ok(File::bind(backend, config, id))
    }

    fn bind(backend: Box<dyn Backend>, config: Config, id: Id) -> File {
        let shared = Arc::new(FileShared::new(backend, config, id));
        File::from_handle(Handle::new(shared, id, EntityKind::File))
    }

    /// Returns `true` until [`File::close`] is called.
    pub fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.shared().is_open())
    }

    pub fn format(&self) -> Result<String> {
        self.handle()?.read(|_, record| required_text(record, attr::FORMAT))
    }

    pub fn version(&self) -> Result<Vec<u64>> {
        self.handle()?
            .read(|_, record| Ok(record.integers(attr::VERSION).to_vec()))
    }

    /// Returns the configuration the file was created or opened with.
    pub fn config(&self) -> Result<&Config> {
        Ok(self.handle()?.config())
    }

    /// Persists pending changes.
    pub fn flush(&self) -> Result<()> {
        let handle = self.handle()?;
        handle.with_backend(|backend| Ok(backend.flush()?))?;
        info!(id:% = handle.id(); "Flushed file");
        Ok(())
    }

    /// Flushes and releases the backend.
    ///
    /// Every handle obtained from this file becomes invalid. Closing a closed
    /// file does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFile`] if the backend fails to flush; the file
    /// then stays open.
    pub fn close(&self) -> Result<()> {
        let handle = self.handle()?;
        if !handle.shared().is_open() {
            return Ok(());
        }

        if handle.config().file().validate_on_close() {
            let report = self.validate()?;
            for issue in report.issues() {
                warn!(severity:% = issue.severity(), entity:% = issue.entity(); "{}", issue.message());
            }
        }

        // A failed flush leaves the file open
        handle.with_backend(|backend| Ok(backend.flush()?))?;
        handle.shared().take()?;
        info!(id:% = handle.id(); "Closed file");
        Ok(())
    }

    /// Checks the whole object graph.
    pub fn validate(&self) -> Result<ValidationReport> {
        let handle = self.handle()?;
        handle.read(|backend, _| Ok(validator::validate(backend)))
    }

    // Blocks

    /// Creates a block.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyString`] for an empty name or type
    /// - [`Error::InvalidName`] for a name containing `/`
    /// - [`Error::DuplicateName`] if a block of that name exists
    pub fn create_block(&self, name: &str, ty: &str) -> Result<Block> {
        let handle = self.handle()?;
        handle.write(|backend| {
            let record = graph::named_record(backend, handle.id(), EntityKind::Block, name, ty)?;
            let id = record.id();
            backend.create(record)?;
            debug!(id:%, name; "Created block");
            Ok(Block::wrap(handle, id))
        })
    }

    /// Returns the block with the given name or id.
    pub fn block(&self, name_or_id: &str) -> Result<Option<Block>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_block(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<Block>(self.handle()?, name_or_id)
    }

    pub fn blocks(&self, filter: &Filter) -> Result<Vec<Block>> {
        graph::list(self.handle()?, filter)
    }

    pub fn block_count(&self) -> Result<usize> {
        graph::count::<Block>(self.handle()?)
    }

    /// Deletes a block with everything it holds.
    pub fn delete_block(&self, block: &Block) -> Result<()> {
        graph::delete(self.handle()?, block)
    }

    // Sections

    /// Creates a root section.
    pub fn create_section(&self, name: &str, ty: &str) -> Result<Section> {
        section::create_child(self.handle()?, name, ty)
    }

    pub fn section(&self, name_or_id: &str) -> Result<Option<Section>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_section(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<Section>(self.handle()?, name_or_id)
    }

    pub fn sections(&self, filter: &Filter) -> Result<Vec<Section>> {
        graph::list(self.handle()?, filter)
    }

    pub fn section_count(&self) -> Result<usize> {
        graph::count::<Section>(self.handle()?)
    }

    /// Deletes a root section; references to any deleted section are cleared.
    pub fn delete_section(&self, section: &Section) -> Result<()> {
        graph::delete(self.handle()?, section)
    }

    /// Searches the section trees breadth-first; root sections have depth 0.
    pub fn find_sections(&self, filter: &Filter, max_depth: usize) -> Result<Vec<Section>> {
        let handle = self.handle()?;
        handle.read(|backend, _| {
            let roots = backend.list(handle.id(), EntityKind::Section);
            Ok(section::search(handle, backend, roots, filter, max_depth))
        })
    }
}

fn is_compatible(version: &[u64]) -> bool {
    match version {
        [major, minor, _] => *major == FORMAT_VERSION[0] && *minor <= FORMAT_VERSION[1],
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use dataweave_backend::BackendError;
    use dataweave_core::error::ErrorKind;

    use super::*;
    use crate::entity::Entity;

    #[test]
    fn test_version_compatibility() {
        assert!(is_compatible(&[1, 2, 0]));
        assert!(is_compatible(&[1, 0, 3]));
        assert!(!is_compatible(&[1, 3, 0]));
        assert!(!is_compatible(&[2, 0, 0]));
        assert!(!is_compatible(&[1, 2]));
    }

    #[test]
    fn test_create_in_rejects_populated_backend() {
        let mut backend = MemoryBackend::new();
        backend
            .create(Record::new(Id::generate(), EntityKind::File, None))
            .unwrap();
        let err = File::create_in(Box::new(backend), Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[derive(Debug, Default)]
    struct ReadOnlyBackend(MemoryBackend);

    impl Backend for ReadOnlyBackend {
        fn create(&mut self, record: Record) -> std::result::Result<(), BackendError> {
            self.0.create(record)
        }

        fn delete(&mut self, id: Id) -> std::result::Result<Vec<Id>, BackendError> {
            self.0.delete(id)
        }

        fn get(&self, id: Id) -> Option<&Record> {
            self.0.get(id)
        }

        fn find(&self, parent: Id, kind: EntityKind, name: &str) -> Option<Id> {
            self.0.find(parent, kind, name)
        }

        fn list(&self, parent: Id, kind: EntityKind) -> Vec<Id> {
            self.0.list(parent, kind)
        }

        fn records(&self, kind: EntityKind) -> Vec<Id> {
            self.0.records(kind)
        }

        fn set_attribute(
            &mut self,
            id: Id,
            key: &str,
            value: Option<Attribute>,
        ) -> std::result::Result<(), BackendError> {
            self.0.set_attribute(id, key, value)
        }

        fn flush(&mut self) -> std::result::Result<(), BackendError> {
            Err(BackendError::Other("medium is read-only".to_string()))
        }
    }

    #[test]
    fn test_failed_close_keeps_file_open() {
        let file = File::create_in(Box::new(ReadOnlyBackend::default()), Config::default()).unwrap();
        let block = file.create_block("session", "recording").unwrap();

        let err = file.close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
        assert!(file.is_open());
        assert_eq!(file.block_count().unwrap(), 1);
        assert!(block.id().is_ok());
    }

    #[test]
    fn test_unbound_file() {
        let file = File::default();
        assert!(!file.is_open());
        assert_eq!(file.block_count().unwrap_err().kind(), ErrorKind::UninitializedEntity);
    }
}

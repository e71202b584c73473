//! Storage contract of the Dataweave data model.
//!
//! The entity API never stores anything itself; every entity is a [`Record`]
//! kept by a [`Backend`]. This crate defines that contract and ships
//! [`MemoryBackend`], the reference implementation used by new files.

pub mod backend;
pub mod error;
pub mod memory;
pub mod record;

pub use backend::Backend;
pub use error::BackendError;
pub use memory::MemoryBackend;
pub use record::{Attribute, EntityKind, Record, attr};

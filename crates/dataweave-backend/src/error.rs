//! Backend failures and their translation into the Dataweave taxonomy.

use std::io;

use dataweave_core::{error::Error, identifier::Id};
use thiserror::Error;

/// Errors raised by a [`Backend`](crate::Backend) implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("record {0} not found")]
    NotFound(Id),

    #[error("record {0} already exists")]
    AlreadyExists(Id),

    #[error("backend is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<BackendError> for Error {
    /// Missing records mean the handle outlived its entity; everything else
    /// is a storage failure and keeps the backend error as its source.
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(_) => Error::uninitialized(err.to_string()),
            other => Error::invalid_file_with("backend operation failed", other),
        }
    }
}

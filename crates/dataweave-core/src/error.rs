//! Error taxonomy shared by every Dataweave crate.
//!
//! Every validation failure maps to exactly one leaf [`ErrorKind`]. The leaves
//! are grouped into three classes:
//! - [`ErrorClass::InvalidArgument`] - the caller passed something unusable
//! - [`ErrorClass::OutOfRange`] - an index, rank, or region does not fit
//! - [`ErrorClass::Runtime`] - the object graph itself refuses the operation
//!
//! Callers branch on [`Error::kind`] rather than on the concrete variant.
//!
//! # Example
//!
//! ```
//! # use dataweave_core::error::{Error, ErrorClass, ErrorKind};
//! let err = Error::duplicate_name("data array `voltage` already exists");
//! assert_eq!(err.kind(), ErrorKind::DuplicateName);
//! assert_eq!(err.kind().class(), ErrorClass::InvalidArgument);
//! ```

use std::fmt;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used to carry the original reason of a backend failure.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by every fallible Dataweave operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("DuplicateName: {0}")]
    DuplicateName(String),

    #[error("EmptyString: {0}")]
    EmptyString(String),

    #[error("InvalidName: {0}")]
    InvalidName(String),

    #[error("InvalidUnit: {0}")]
    InvalidUnit(String),

    #[error("InvalidDimension: {0}")]
    InvalidDimension(String),

    #[error("IncompatibleDimensions: {0}")]
    IncompatibleDimensions(String),

    #[error("UnsortedTicks: {0}")]
    UnsortedTicks(String),

    #[error("InvalidValue: {0}")]
    InvalidValue(String),

    /// A file could not be opened, read, or written.
    ///
    /// Backend failures end up here with the original error kept as source.
    #[error("InvalidFile: {message}")]
    InvalidFile {
        message: String,
        #[source]
        source: Option<GenericError>,
    },

    #[error("InvalidRank: {0}")]
    InvalidRank(String),

    #[error("OutOfBounds: {0}")]
    OutOfBounds(String),

    #[error("MissingAttribute: {0}")]
    MissingAttribute(String),

    /// The operation would break a relation in the object graph.
    ///
    /// Raised for cycles, dangling references, and deletes that would orphan
    /// a live reference.
    #[error("ConsistencyError: {0}")]
    Consistency(String),

    #[error("UninitializedEntity: {0}")]
    UninitializedEntity(String),
}

impl Error {
    /// Returns the flat discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateName(_) => ErrorKind::DuplicateName,
            Error::EmptyString(_) => ErrorKind::EmptyString,
            Error::InvalidName(_) => ErrorKind::InvalidName,
            Error::InvalidUnit(_) => ErrorKind::InvalidUnit,
            Error::InvalidDimension(_) => ErrorKind::InvalidDimension,
            Error::IncompatibleDimensions(_) => ErrorKind::IncompatibleDimensions,
            Error::UnsortedTicks(_) => ErrorKind::UnsortedTicks,
            Error::InvalidValue(_) => ErrorKind::InvalidValue,
            Error::InvalidFile { .. } => ErrorKind::InvalidFile,
            Error::InvalidRank(_) => ErrorKind::InvalidRank,
            Error::OutOfBounds(_) => ErrorKind::OutOfBounds,
            Error::MissingAttribute(_) => ErrorKind::MissingAttribute,
            Error::Consistency(_) => ErrorKind::Consistency,
            Error::UninitializedEntity(_) => ErrorKind::UninitializedEntity,
        }
    }

    /// Returns the human-readable payload without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::DuplicateName(msg)
            | Error::EmptyString(msg)
            | Error::InvalidName(msg)
            | Error::InvalidUnit(msg)
            | Error::InvalidDimension(msg)
            | Error::IncompatibleDimensions(msg)
            | Error::UnsortedTicks(msg)
            | Error::InvalidValue(msg)
            | Error::InvalidRank(msg)
            | Error::OutOfBounds(msg)
            | Error::MissingAttribute(msg)
            | Error::Consistency(msg)
            | Error::UninitializedEntity(msg) => msg,
            Error::InvalidFile { message, .. } => message,
        }
    }

    /// Create a new `DuplicateName` error.
    pub fn duplicate_name<S: Into<String>>(msg: S) -> Self {
        Self::DuplicateName(msg.into())
    }

    /// Create a new `EmptyString` error.
    pub fn empty_string<S: Into<String>>(msg: S) -> Self {
        Self::EmptyString(msg.into())
    }

    /// Create a new `InvalidName` error.
    pub fn invalid_name<S: Into<String>>(msg: S) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Create a new `InvalidUnit` error.
    pub fn invalid_unit<S: Into<String>>(msg: S) -> Self {
        Self::InvalidUnit(msg.into())
    }

    /// Create a new `InvalidDimension` error.
    pub fn invalid_dimension<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDimension(msg.into())
    }

    /// Create a new `IncompatibleDimensions` error.
    pub fn incompatible_dimensions<S: Into<String>>(msg: S) -> Self {
        Self::IncompatibleDimensions(msg.into())
    }

    /// Create a new `UnsortedTicks` error.
    pub fn unsorted_ticks<S: Into<String>>(msg: S) -> Self {
        Self::UnsortedTicks(msg.into())
    }

    /// Create a new `InvalidValue` error.
    pub fn invalid_value<S: Into<String>>(msg: S) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Create a new `InvalidFile` error without an underlying cause.
    pub fn invalid_file<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFile {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new `InvalidFile` error wrapping the original failure.
    pub fn invalid_file_with<S, E>(msg: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<GenericError>,
    {
        Self::InvalidFile {
            message: msg.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new `InvalidRank` error.
    pub fn invalid_rank<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRank(msg.into())
    }

    /// Create a new `OutOfBounds` error.
    pub fn out_of_bounds<S: Into<String>>(msg: S) -> Self {
        Self::OutOfBounds(msg.into())
    }

    /// Create a new `MissingAttribute` error.
    pub fn missing_attribute<S: Into<String>>(msg: S) -> Self {
        Self::MissingAttribute(msg.into())
    }

    /// Create a new `ConsistencyError`.
    pub fn consistency<S: Into<String>>(msg: S) -> Self {
        Self::Consistency(msg.into())
    }

    /// Create a new `UninitializedEntity` error.
    pub fn uninitialized<S: Into<String>>(msg: S) -> Self {
        Self::UninitializedEntity(msg.into())
    }
}

/// Flat discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // =========================================================================
    // Argument errors
    // =========================================================================
    /// A sibling of the same kind already holds the name.
    DuplicateName,

    /// A required string was empty.
    EmptyString,

    /// A name contains characters that are not allowed.
    InvalidName,

    /// A unit is not a recognised SI unit.
    InvalidUnit,

    /// A dimension descriptor is malformed or accessed as the wrong variant.
    InvalidDimension,

    /// Vector lengths or ranks do not line up.
    IncompatibleDimensions,

    /// Range ticks are not strictly ascending.
    UnsortedTicks,

    /// A value has the wrong data type or is not usable numerically.
    InvalidValue,

    /// A file or backend could not be used.
    InvalidFile,

    // =========================================================================
    // Range errors
    // =========================================================================
    /// The number of axes is wrong.
    InvalidRank,

    /// An index or region lies outside the valid range.
    OutOfBounds,

    // =========================================================================
    // Runtime errors
    // =========================================================================
    /// A required attribute is absent from the backend record.
    MissingAttribute,

    /// The operation would break a relation in the object graph.
    Consistency,

    /// The handle is not bound to a live entity.
    UninitializedEntity,
}

impl ErrorKind {
    /// Returns the class this kind belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::DuplicateName
            | ErrorKind::EmptyString
            | ErrorKind::InvalidName
            | ErrorKind::InvalidUnit
            | ErrorKind::InvalidDimension
            | ErrorKind::IncompatibleDimensions
            | ErrorKind::UnsortedTicks
            | ErrorKind::InvalidValue
            | ErrorKind::InvalidFile => ErrorClass::InvalidArgument,
            ErrorKind::InvalidRank | ErrorKind::OutOfBounds => ErrorClass::OutOfRange,
            ErrorKind::MissingAttribute
            | ErrorKind::Consistency
            | ErrorKind::UninitializedEntity => ErrorClass::Runtime,
        }
    }

    /// Returns the kebab-case name of the condition (e.g. "duplicate-name").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateName => "duplicate-name",
            ErrorKind::EmptyString => "empty-string",
            ErrorKind::InvalidName => "invalid-name",
            ErrorKind::InvalidUnit => "invalid-unit",
            ErrorKind::InvalidDimension => "invalid-dimension",
            ErrorKind::IncompatibleDimensions => "incompatible-dimensions",
            ErrorKind::UnsortedTicks => "unsorted-ticks",
            ErrorKind::InvalidValue => "invalid-value",
            ErrorKind::InvalidFile => "invalid-file",
            ErrorKind::InvalidRank => "invalid-rank",
            ErrorKind::OutOfBounds => "out-of-bounds",
            ErrorKind::MissingAttribute => "missing-attribute",
            ErrorKind::Consistency => "consistency-error",
            ErrorKind::UninitializedEntity => "uninitialized-entity",
        }
    }

    /// Returns a short description of what this kind means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateName => "name already used by a sibling",
            ErrorKind::EmptyString => "string must not be empty",
            ErrorKind::InvalidName => "name contains invalid characters",
            ErrorKind::InvalidUnit => "unit is not a valid SI unit",
            ErrorKind::InvalidDimension => "invalid dimension descriptor",
            ErrorKind::IncompatibleDimensions => "dimensionality mismatch",
            ErrorKind::UnsortedTicks => "ticks are not strictly ascending",
            ErrorKind::InvalidValue => "value has an unusable type",
            ErrorKind::InvalidFile => "file or backend failure",
            ErrorKind::InvalidRank => "wrong number of axes",
            ErrorKind::OutOfBounds => "index out of bounds",
            ErrorKind::MissingAttribute => "required attribute is missing",
            ErrorKind::Consistency => "object graph consistency violated",
            ErrorKind::UninitializedEntity => "entity handle is not bound",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three families of [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Invalid input supplied by the caller.
    InvalidArgument,

    /// An index, rank, or region outside the valid range.
    OutOfRange,

    /// The state of the object graph rejects the operation.
    Runtime,
}

impl ErrorClass {
    /// Returns `true` for argument-class errors.
    pub fn is_argument(&self) -> bool {
        matches!(self, ErrorClass::InvalidArgument)
    }

    /// Returns `true` for range-class errors.
    pub fn is_range(&self) -> bool {
        matches!(self, ErrorClass::OutOfRange)
    }

    /// Returns `true` for runtime-class errors.
    pub fn is_runtime(&self) -> bool {
        matches!(self, ErrorClass::Runtime)
    }
}

/// Return early with the given error constructor when the condition fails.
///
/// ```
/// # use dataweave_core::{ensure, error::{Error, Result}};
/// fn positive(x: f64) -> Result<f64> {
///     ensure!(x > 0.0, invalid_dimension: "expected a positive value, got {x}");
///     Ok(x)
/// }
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $ctor:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::$ctor(format!($($msg)*)));
        }
    };
}

//! Core types of the Dataweave scientific data model.
//!
//! This crate holds the pieces every other Dataweave crate builds on:
//! - [`identifier::Id`] - globally unique, interned entity identifiers
//! - [`value`] - tagged scalars used as metadata values
//! - [`dimension`] - the sampled, range and set axis descriptors
//! - [`units`] - SI unit recognition and scaling
//! - [`ndbuffer::NdBuffer`] - n-dimensional element storage
//! - [`error`] - the error taxonomy shared across the workspace

pub mod dimension;
pub mod error;
pub mod identifier;
pub mod link_type;
pub mod ndbuffer;
pub mod units;
pub mod value;

pub use dimension::{
    Dimension, DimensionKind, DimensionType, PositionInRange, PositionMatch, RangeDimension,
    RangeMatch, SampledDimension, SetDimension,
};
pub use error::{Error, ErrorClass, ErrorKind, Result};
pub use identifier::Id;
pub use link_type::LinkType;
pub use ndbuffer::{ArrayValues, NdBuffer};
pub use value::{DataType, Value, Variant};

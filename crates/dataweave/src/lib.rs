//! Dataweave - a hierarchical data model for scientific datasets.
//!
//! A [`File`] owns [`Block`]s; each block owns [`DataArray`]s, [`Tag`]s,
//! [`MultiTag`]s, [`Group`]s and [`Source`]s. Data arrays describe every
//! axis with a [`Dimension`]. Tags bind regions of arrays to features,
//! sources and metadata. Metadata lives in an independent tree of
//! [`Section`]s and [`Property`]s referenced by any entity.
//!
//! Entities are cheap handles onto a shared [`Backend`]. Every mutation
//! validates the graph invariants before anything is written and fails
//! with a typed [`Error`] otherwise.
//!
//! # Examples
//!
//! ```
//! use dataweave::{Entity, EntityWithSources, File, Filter, NamedEntity, config::Config};
//!
//! let file = File::create(Config::default()).unwrap();
//! let block = file.create_block("session", "recording").unwrap();
//! let electrode = block.create_source("electrode", "hardware").unwrap();
//! let tag = block.create_tag("stimulus", "event", vec![1.5]).unwrap();
//! tag.add_source(&electrode).unwrap();
//!
//! let tagged = block.tags(&Filter::Source(electrode.id().unwrap())).unwrap();
//! assert_eq!(tagged[0].name().unwrap(), "stimulus");
//! ```

pub mod config;

mod block;
mod check;
mod data_array;
mod data_view;
mod entity;
mod feature;
mod file;
mod filter;
mod graph;
mod group;
mod handle;
mod multi_tag;
mod property;
mod section;
mod source;
mod tag;
mod validator;

pub use dataweave_backend::{Backend, BackendError, MemoryBackend};
pub use dataweave_core::{
    dimension::{
        Dimension, DimensionKind, DimensionType, PositionInRange, PositionMatch, RangeDimension,
        RangeMatch, SampledDimension, SetDimension,
    },
    error::{Error, ErrorClass, ErrorKind, Result},
    identifier::Id,
    link_type::LinkType,
    ndbuffer::{ArrayValues, NdBuffer},
    units,
    value::{DataType, Value, Variant},
};

pub use block::Block;
pub use data_array::DataArray;
pub use data_view::DataView;
pub use entity::{Entity, EntityWithMetadata, EntityWithSources, NamedEntity};
pub use feature::Feature;
pub use file::{FORMAT_VERSION, File};
pub use filter::Filter;
pub use group::Group;
pub use multi_tag::MultiTag;
pub use property::Property;
pub use section::Section;
pub use source::Source;
pub use tag::Tag;
pub use validator::{Issue, Severity, ValidationReport};

//! Records and attributes stored by a backend.

use std::fmt;

use dataweave_core::{
    dimension::Dimension, identifier::Id, link_type::LinkType, ndbuffer::NdBuffer, value::Value,
};
use indexmap::IndexMap;

/// Attribute keys used by the entity layer.
pub mod attr {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const DEFINITION: &str = "definition";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const METADATA: &str = "metadata";
    pub const SOURCES: &str = "sources";

    pub const FORMAT: &str = "format";
    pub const VERSION: &str = "version";

    pub const DATA: &str = "data";
    pub const DIMENSIONS: &str = "dimensions";
    pub const UNIT: &str = "unit";
    pub const LABEL: &str = "label";
    pub const EXPANSION_ORIGIN: &str = "expansion_origin";
    pub const POLYNOM_COEFFICIENTS: &str = "polynom_coefficients";

    pub const POSITION: &str = "position";
    pub const EXTENT: &str = "extent";
    pub const UNITS: &str = "units";
    pub const REFERENCES: &str = "references";
    pub const POSITIONS: &str = "positions";
    pub const EXTENTS: &str = "extents";

    pub const LINK_TYPE: &str = "link_type";
    pub const FEATURE_DATA: &str = "feature_data";

    pub const DATA_ARRAYS: &str = "data_arrays";
    pub const TAGS: &str = "tags";
    pub const MULTI_TAGS: &str = "multi_tags";

    pub const LINKED_SOURCES: &str = "linked_sources";

    pub const REPOSITORY: &str = "repository";
    pub const LINK: &str = "link";
    pub const VALUES: &str = "values";
}

/// Kind of entity a record stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    File,
    Block,
    DataArray,
    Tag,
    MultiTag,
    Feature,
    Group,
    Source,
    Section,
    Property,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Block => "block",
            EntityKind::DataArray => "data array",
            EntityKind::Tag => "tag",
            EntityKind::MultiTag => "multi tag",
            EntityKind::Feature => "feature",
            EntityKind::Group => "group",
            EntityKind::Source => "source",
            EntityKind::Section => "section",
            EntityKind::Property => "property",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Text(String),
    Texts(Vec<String>),
    Number(f64),
    Numbers(Vec<f64>),
    Integer(u64),
    Integers(Vec<u64>),
    Ref(Id),
    Refs(Vec<Id>),
    Values(Vec<Value>),
    Dimensions(Vec<Dimension>),
    Data(NdBuffer),
    Link(LinkType),
}

/// One stored entity: identity, kind, owner and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Id,
    kind: EntityKind,
    parent: Option<Id>,
    attributes: IndexMap<String, Attribute>,
}

impl Record {
    pub fn new(id: Id, kind: EntityKind, parent: Option<Id>) -> Self {
        Self {
            id,
            kind,
            parent,
            attributes: IndexMap::new(),
        }
    }

    /// Builder-style attribute assignment used while assembling a new record.
    pub fn with(mut self, key: &str, value: Attribute) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The owning record; `None` only for the file record.
    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    pub fn attributes(&self) -> &IndexMap<String, Attribute> {
        &self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: &str, value: Option<Attribute>) {
        match value {
            Some(value) => {
                self.attributes.insert(key.to_string(), value);
            }
            None => {
                self.attributes.shift_remove(key);
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.text(attr::NAME)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Attribute::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn texts(&self, key: &str) -> &[String] {
        match self.get(key) {
            Some(Attribute::Texts(texts)) => texts,
            _ => &[],
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(Attribute::Number(number)) => Some(*number),
            _ => None,
        }
    }

    pub fn numbers(&self, key: &str) -> Option<&[f64]> {
        match self.get(key) {
            Some(Attribute::Numbers(numbers)) => Some(numbers),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<u64> {
        match self.get(key) {
            Some(Attribute::Integer(integer)) => Some(*integer),
            _ => None,
        }
    }

    pub fn integers(&self, key: &str) -> &[u64] {
        match self.get(key) {
            Some(Attribute::Integers(integers)) => integers,
            _ => &[],
        }
    }

    pub fn reference(&self, key: &str) -> Option<Id> {
        match self.get(key) {
            Some(Attribute::Ref(id)) => Some(*id),
            _ => None,
        }
    }

    /// Ordered references; empty when the attribute is unset.
    pub fn refs(&self, key: &str) -> &[Id] {
        match self.get(key) {
            Some(Attribute::Refs(ids)) => ids,
            _ => &[],
        }
    }

    /// Returns `true` if `id` appears in the single or multi reference `key`.
    pub fn references(&self, key: &str, id: Id) -> bool {
        self.reference(key) == Some(id) || self.refs(key).contains(&id)
    }

    pub fn values(&self, key: &str) -> &[Value] {
        match self.get(key) {
            Some(Attribute::Values(values)) => values,
            _ => &[],
        }
    }

    pub fn dimensions(&self, key: &str) -> &[Dimension] {
        match self.get(key) {
            Some(Attribute::Dimensions(dims)) => dims,
            _ => &[],
        }
    }

    pub fn data(&self, key: &str) -> Option<&NdBuffer> {
        match self.get(key) {
            Some(Attribute::Data(data)) => Some(data),
            _ => None,
        }
    }

    pub fn link_type(&self, key: &str) -> Option<LinkType> {
        match self.get(key) {
            Some(Attribute::Link(link)) => Some(*link),
            _ => None,
        }
    }
}

//! Predicates for listing child entities.

use dataweave_backend::{Record, attr};
use dataweave_core::identifier::Id;

/// Selects entities by identity, name, type or references.
///
/// # Examples
///
/// ```
/// use dataweave::{File, Filter, NamedEntity, config::Config};
///
/// let file = File::create(Config::default()).unwrap();
/// file.create_block("session-1", "recording").unwrap();
/// file.create_block("session-2", "simulation").unwrap();
///
/// let recordings = file.blocks(&Filter::Type("recording".into())).unwrap();
/// assert_eq!(recordings.len(), 1);
/// assert_eq!(recordings[0].name().unwrap(), "session-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    /// Accept every entity.
    #[default]
    All,
    /// Accept the entity with this id.
    Id(Id),
    /// Accept entities whose id is listed.
    Ids(Vec<Id>),
    /// Accept entities with this name.
    Name(String),
    /// Accept entities with this type.
    Type(String),
    /// Accept entities referencing this metadata section.
    Metadata(Id),
    /// Accept entities referencing this source.
    Source(Id),
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Id(id) => record.id() == *id,
            Filter::Ids(ids) => ids.contains(&record.id()),
            Filter::Name(name) => record.name() == Some(name.as_str()),
            Filter::Type(ty) => record.text(attr::TYPE) == Some(ty.as_str()),
            Filter::Metadata(section) => record.reference(attr::METADATA) == Some(*section),
            Filter::Source(source) => record.refs(attr::SOURCES).contains(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use dataweave_backend::{Attribute, EntityKind};

    use super::*;

    #[test]
    fn test_matches() {
        let section = Id::generate();
        let source = Id::generate();
        let record = Record::new(Id::generate(), EntityKind::DataArray, None)
            .with(attr::NAME, Attribute::Text("lfp".to_string()))
            .with(attr::TYPE, Attribute::Text("signal".to_string()))
            .with(attr::METADATA, Attribute::Ref(section))
            .with(attr::SOURCES, Attribute::Refs(vec![source]));

        assert!(Filter::All.matches(&record));
        assert!(Filter::Id(record.id()).matches(&record));
        assert!(Filter::Ids(vec![Id::generate(), record.id()]).matches(&record));
        assert!(Filter::Name("lfp".to_string()).matches(&record));
        assert!(!Filter::Name("spikes".to_string()).matches(&record));
        assert!(Filter::Type("signal".to_string()).matches(&record));
        assert!(Filter::Metadata(section).matches(&record));
        assert!(Filter::Source(source).matches(&record));
        assert!(!Filter::Source(section).matches(&record));
    }
}

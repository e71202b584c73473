//! Capability traits shared by the public entity types.
//!
//! The capabilities stack in a fixed order, each assuming the previous:
//! - [`Entity`] - identity, validity and timestamps
//! - [`NamedEntity`] - name, type and definition
//! - [`EntityWithMetadata`] - an optional reference to a [`Section`]
//! - [`EntityWithSources`] - an ordered set of references to [`Source`]s
//!
//! Every method fails with [`Error::UninitializedEntity`] when called on an
//! unbound handle, on an entity that was deleted, or after the file closed.

use dataweave_backend::{Attribute, Backend, EntityKind, Record, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
};
use log::debug;

use crate::{
    check,
    filter::Filter,
    handle::{HasHandle, Wrap, record},
    section::Section,
    source::Source,
};

/// Declares a public entity type backed by a [`Handle`](crate::handle::Handle).
macro_rules! entity_type {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            handle: Option<$crate::handle::Handle>,
        }

        impl $crate::handle::HasHandle for $name {
            fn raw_handle(&self) -> Option<&$crate::handle::Handle> {
                self.handle.as_ref()
            }
        }

        impl $crate::handle::Wrap for $name {
            const KIND: dataweave_backend::EntityKind = $kind;

            fn from_handle(handle: $crate::handle::Handle) -> Self {
                Self {
                    handle: Some(handle),
                }
            }
        }

        impl $crate::entity::Entity for $name {}

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match &self.handle {
                    Some(handle) => write!(f, "{}({})", stringify!($name), handle.id()),
                    None => write!(f, "{}(<unbound>)", stringify!($name)),
                }
            }
        }
    };
}

pub(crate) use entity_type;

/// Identity and lifecycle of any entity.
pub trait Entity: HasHandle {
    /// Returns `true` if the handle is bound, the file open and the entity
    /// not deleted.
    fn is_valid(&self) -> bool {
        self.raw_handle().is_some_and(|handle| handle.exists())
    }

    /// The identity assigned at creation.
    fn id(&self) -> Result<Id> {
        Ok(self.handle()?.id())
    }

    /// Creation time in unix seconds.
    fn created_at(&self) -> Result<u64> {
        self.handle()?.read(|_, record| timestamp(record, attr::CREATED_AT))
    }

    /// Time of the last successful mutation in unix seconds.
    fn updated_at(&self) -> Result<u64> {
        self.handle()?.read(|_, record| timestamp(record, attr::UPDATED_AT))
    }
}

fn timestamp(record: &Record, key: &str) -> Result<u64> {
    record
        .integer(key)
        .ok_or_else(|| Error::missing_attribute(format!("{} has no {key}", record.id())))
}

pub(crate) fn required_text(record: &Record, key: &str) -> Result<String> {
    record
        .text(key)
        .map(str::to_string)
        .ok_or_else(|| Error::missing_attribute(format!("{} has no {key}", record.id())))
}

/// Entities with a name that is unique among siblings of the same kind.
pub trait NamedEntity: Entity {
    fn name(&self) -> Result<String> {
        self.handle()?.read(|_, record| required_text(record, attr::NAME))
    }

    /// Renames the entity.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyString`] for an empty name
    /// - [`Error::InvalidName`] for a name containing `/`
    /// - [`Error::DuplicateName`] if a sibling of the same kind holds the name
    fn set_name(&self, name: &str) -> Result<()> {
        let handle = self.handle()?;
        check::check_name(name)?;
        handle.write(|backend| {
            let parent = record(backend, handle.id())?.parent();
            if let Some(parent) = parent {
                check::check_unique(backend, parent, handle.kind(), name, Some(handle.id()))?;
            }
            backend.set_attribute(handle.id(), attr::NAME, Some(Attribute::Text(name.to_string())))?;
            debug!(id:% = handle.id(), name; "Renamed entity");
            Ok(())
        })
    }

    fn entity_type(&self) -> Result<String> {
        self.handle()?.read(|_, record| required_text(record, attr::TYPE))
    }

    fn set_type(&self, ty: &str) -> Result<()> {
        let handle = self.handle()?;
        check::check_type(ty)?;
        handle.write(|backend| {
            backend.set_attribute(handle.id(), attr::TYPE, Some(Attribute::Text(ty.to_string())))?;
            Ok(())
        })
    }

    fn definition(&self) -> Result<Option<String>> {
        self.handle()?
            .read(|_, record| Ok(record.text(attr::DEFINITION).map(str::to_string)))
    }

    /// Sets or clears (`None`) the definition.
    fn set_definition(&self, definition: Option<&str>) -> Result<()> {
        let handle = self.handle()?;
        if let Some(definition) = definition {
            check::check_text("definition", definition)?;
        }
        handle.write(|backend| {
            let value = definition.map(|d| Attribute::Text(d.to_string()));
            backend.set_attribute(handle.id(), attr::DEFINITION, value)?;
            Ok(())
        })
    }
}

/// Entities that may reference a metadata [`Section`].
pub trait EntityWithMetadata: NamedEntity {
    /// The referenced section, if any.
    fn metadata(&self) -> Result<Option<Section>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            Ok(record
                .reference(attr::METADATA)
                .filter(|id| backend.contains(*id))
                .map(|id| Section::wrap(handle, id)))
        })
    }

    /// References `section` as metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] if the section belongs to another file
    /// or no longer exists.
    fn set_metadata(&self, section: &Section) -> Result<()> {
        let handle = self.handle()?;
        let other = section.handle()?;
        handle.write(|backend| {
            let section_id = check::target(handle, backend, other, EntityKind::Section)?;
            backend.set_attribute(handle.id(), attr::METADATA, Some(Attribute::Ref(section_id)))?;
            debug!(id:% = handle.id(), section:% = section_id; "Attached metadata");
            Ok(())
        })
    }

    fn remove_metadata(&self) -> Result<()> {
        let handle = self.handle()?;
        handle.write(|backend| {
            backend.set_attribute(handle.id(), attr::METADATA, None)?;
            Ok(())
        })
    }
}

/// Entities that reference provenance [`Source`]s.
pub trait EntityWithSources: EntityWithMetadata {
    /// Referenced sources in insertion order.
    fn sources(&self, filter: &Filter) -> Result<Vec<Source>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            Ok(record
                .refs(attr::SOURCES)
                .iter()
                .filter_map(|id| backend.get(*id))
                .filter(|source| filter.matches(source))
                .map(|source| Source::wrap(handle, source.id()))
                .collect())
        })
    }

    fn source_count(&self) -> Result<usize> {
        self.handle()?
            .read(|_, record| Ok(record.refs(attr::SOURCES).len()))
    }

    fn has_source(&self, source: &Source) -> Result<bool> {
        let id = source.handle()?.id();
        self.handle()?
            .read(|_, record| Ok(record.refs(attr::SOURCES).contains(&id)))
    }

    /// Adds a reference to `source`; adding a present source is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] if the source no longer exists or is
    /// owned by a different block.
    fn add_source(&self, source: &Source) -> Result<()> {
        let handle = self.handle()?;
        let other = source.handle()?;
        handle.write(|backend| {
            let source_id = check::target(handle, backend, other, EntityKind::Source)?;
            check::same_block(backend, handle.id(), source_id)?;
            push_ref(backend, handle.id(), attr::SOURCES, source_id)?;
            debug!(id:% = handle.id(), source:% = source_id; "Added source reference");
            Ok(())
        })
    }

    /// Drops the reference to `source`; absent sources are ignored.
    fn remove_source(&self, source: &Source) -> Result<()> {
        let handle = self.handle()?;
        let source_id = source.handle()?.id();
        handle.write(|backend| remove_ref(backend, handle.id(), attr::SOURCES, source_id))
    }
}

/// Appends `target` to the reference list `key` unless already present.
pub(crate) fn push_ref(backend: &mut dyn Backend, id: Id, key: &str, target: Id) -> Result<()> {
    let mut refs = record(backend, id)?.refs(key).to_vec();
    if !refs.contains(&target) {
        refs.push(target);
        backend.set_attribute(id, key, Some(Attribute::Refs(refs)))?;
    }
    Ok(())
}

/// Removes `target` from the reference list `key`.
pub(crate) fn remove_ref(backend: &mut dyn Backend, id: Id, key: &str, target: Id) -> Result<()> {
    let refs = record(backend, id)?.refs(key);
    if refs.contains(&target) {
        let kept = refs.iter().copied().filter(|r| *r != target).collect();
        backend.set_attribute(id, key, Some(Attribute::Refs(kept)))?;
    }
    Ok(())
}

#[cfg(test)]
mod proptest_tests {
    use std::collections::HashSet;

    use dataweave_core::error::ErrorKind;
    use proptest::prelude::*;

    use crate::{File, NamedEntity, config::Config, filter::Filter};

    #[derive(Debug, Clone)]
    enum Op {
        Create(usize),
        Rename(usize, usize),
    }

    const NAMES: [&str; 4] = ["onset", "offset", "peak", "trough"];

    // ===================
    // Strategies
    // ===================

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..NAMES.len()).prop_map(Op::Create),
            (0usize..8, 0..NAMES.len()).prop_map(|(tag, name)| Op::Rename(tag, name)),
        ]
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Siblings never share a name, whatever creates and renames run.
    fn check_sibling_names_stay_unique(ops: Vec<Op>) -> Result<(), TestCaseError> {
        let file = File::create(Config::default()).expect("file");
        let block = file.create_block("session", "recording").expect("block");
        let mut created = 0;

        for op in ops {
            let result = match op {
                Op::Create(name) => block
                    .create_tag(NAMES[name], "event", vec![1.0])
                    .map(|_| created += 1),
                Op::Rename(tag, name) => {
                    let tags = block.tags(&Filter::All).expect("tags");
                    if tags.is_empty() {
                        continue;
                    }
                    tags[tag % tags.len()].set_name(NAMES[name])
                }
            };
            if let Err(err) = result {
                prop_assert_eq!(err.kind(), ErrorKind::DuplicateName);
            }

            let names: Vec<String> = block
                .tags(&Filter::All)
                .expect("tags")
                .iter()
                .map(|tag| tag.name().expect("name"))
                .collect();
            let unique: HashSet<&String> = names.iter().collect();
            prop_assert_eq!(unique.len(), names.len());
            prop_assert_eq!(names.len(), created);
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn sibling_names_stay_unique(ops in prop::collection::vec(op_strategy(), 1..40)) {
            check_sibling_names_stay_unique(ops)?;
        }
    }
}

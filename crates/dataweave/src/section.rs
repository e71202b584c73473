//! The metadata tree.
//!
//! Sections form trees rooted in the file, independent of the block
//! hierarchy. Data entities reference sections without owning them. A
//! section may link a template section whose properties it inherits.

use dataweave_backend::{Attribute, Backend, EntityKind, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
    value::Value,
};
use log::{debug, trace};

use crate::{
    check,
    entity::{NamedEntity, entity_type},
    filter::Filter,
    graph,
    handle::{Handle, HasHandle, Wrap, record},
    property::{self, Property},
};

entity_type!(
    /// A named node of the metadata tree holding properties and child sections.
    ///
    /// # Examples
    ///
    /// ```
    /// use dataweave::{EntityWithMetadata, File, Value, config::Config};
    ///
    /// let file = File::create(Config::default()).unwrap();
    /// let subject = file.create_section("subject", "animal").unwrap();
    /// subject.create_property("species", vec![Value::from("mouse")]).unwrap();
    ///
    /// let block = file.create_block("session", "recording").unwrap();
    /// block.set_metadata(&subject).unwrap();
    ///
    /// let metadata = block.metadata().unwrap().unwrap();
    /// let species = metadata.property("species").unwrap().unwrap();
    /// assert_eq!(species.values().unwrap(), vec![Value::from("mouse")]);
    /// ```
    Section,
    EntityKind::Section
);

impl NamedEntity for Section {}

impl Section {
    pub fn repository(&self) -> Result<Option<String>> {
        self.handle()?
            .read(|_, record| Ok(record.text(attr::REPOSITORY).map(str::to_string)))
    }

    pub fn set_repository(&self, repository: Option<&str>) -> Result<()> {
        if let Some(repository) = repository {
            check::check_text("repository", repository)?;
        }
        let handle = self.handle()?;
        handle.write(|backend| {
            let value = repository.map(|r| Attribute::Text(r.to_string()));
            backend.set_attribute(handle.id(), attr::REPOSITORY, value)?;
            Ok(())
        })
    }

    /// The linked template section, if any.
    pub fn link(&self) -> Result<Option<Section>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            Ok(record
                .reference(attr::LINK)
                .filter(|id| backend.contains(*id))
                .map(|id| Section::wrap(handle, id)))
        })
    }

    /// Links a template section or removes the link (`None`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] if the section lives in another file,
    /// no longer exists, is this section, or links back to it.
    pub fn set_link(&self, section: Option<&Section>) -> Result<()> {
        let handle = self.handle()?;
        let Some(section) = section else {
            return handle.write(|backend| {
                backend.set_attribute(handle.id(), attr::LINK, None)?;
                Ok(())
            });
        };
        let other = section.handle()?;
        handle.write(|backend| {
            let target = check::target(handle, backend, other, EntityKind::Section)?;
            if link_chain(backend, target).contains(&handle.id()) {
                return Err(Error::consistency(format!(
                    "linking section {target} from {} would create a cycle",
                    handle.id()
                )));
            }
            backend.set_attribute(handle.id(), attr::LINK, Some(Attribute::Ref(target)))?;
            debug!(id:% = handle.id(), link:% = target; "Linked section");
            Ok(())
        })
    }

    /// The owning section, `None` for root sections.
    pub fn parent_section(&self) -> Result<Option<Section>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            Ok(record
                .parent()
                .and_then(|parent| backend.get(parent))
                .filter(|parent| parent.kind() == EntityKind::Section)
                .map(|parent| Section::wrap(handle, parent.id())))
        })
    }

    // Child sections

    pub fn create_section(&self, name: &str, ty: &str) -> Result<Section> {
        create_child(self.handle()?, name, ty)
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

    /// Deletes a child section with its subtree; references into it are cleared.
    pub fn delete_section(&self, section: &Section) -> Result<()> {
        graph::delete(self.handle()?, section)
    }

    /// Searches the subtree breadth-first from this section (depth 0).
    pub fn find_sections(&self, filter: &Filter, max_depth: usize) -> Result<Vec<Section>> {
        let handle = self.handle()?;
        handle.read(|backend, _| Ok(search(handle, backend, vec![handle.id()], filter, max_depth)))
    }

    // Properties

    /// Creates a property holding `values`.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyString`] or [`Error::InvalidName`] for a bad name
    /// - [`Error::DuplicateName`] if the section already has the property
    /// - [`Error::InvalidValue`] if the values differ in data type
    pub fn create_property(&self, name: &str, values: Vec<Value>) -> Result<Property> {
        property::create(self.handle()?, name, values)
    }

    /// Looks up an own property by name or id.
    pub fn property(&self, name_or_id: &str) -> Result<Option<Property>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_property(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<Property>(self.handle()?, name_or_id)
    }

    /// Own properties in creation order.
    pub fn properties(&self, filter: &Filter) -> Result<Vec<Property>> {
        graph::list(self.handle()?, filter)
    }

    pub fn property_count(&self) -> Result<usize> {
        graph::count::<Property>(self.handle()?)
    }

    pub fn delete_property(&self, property: &Property) -> Result<()> {
        graph::delete(self.handle()?, property)
    }

    /// Properties of the linked section; empty without a link.
    pub fn inherited_properties(&self) -> Result<Vec<Property>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            let Some(link) = record.reference(attr::LINK).filter(|id| backend.contains(*id)) else {
                return Ok(Vec::new());
            };
            Ok(backend
                .list(link, EntityKind::Property)
                .into_iter()
                .map(|id| Property::wrap(handle, id))
                .collect())
        })
    }

    /// Looks up a property by name, falling back to the inherited properties.
    pub fn property_by_name(&self, name: &str) -> Result<Option<Property>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            let found = backend.find(handle.id(), EntityKind::Property, name).or_else(|| {
                record
                    .reference(attr::LINK)
                    .and_then(|link| backend.find(link, EntityKind::Property, name))
            });
            trace!(id:% = handle.id(), name, found:? = found; "Resolved property");
            Ok(found.map(|id| Property::wrap(handle, id)))
        })
    }
}

/// Creates a section owned by the file or section `owner`.
pub(crate) fn create_child(owner: &Handle, name: &str, ty: &str) -> Result<Section> {
    owner.write(|backend| {
        let record = graph::named_record(backend, owner.id(), EntityKind::Section, name, ty)?;
        let id = record.id();
        backend.create(record)?;
        debug!(id:%, owner:% = owner.id(), name; "Created section");
        Ok(Section::wrap(owner, id))
    })
}

/// Breadth-first search over child sections.
pub(crate) fn search(
    handle: &Handle,
    backend: &dyn Backend,
    roots: Vec<Id>,
    filter: &Filter,
    max_depth: usize,
) -> Vec<Section> {
    check::breadth_first(roots, max_depth, |id| backend.list(id, EntityKind::Section))
        .into_iter()
        .filter_map(|id| backend.get(id))
        .filter(|section| filter.matches(section))
        .map(|section| Section::wrap(handle, section.id()))
        .collect()
}

/// Sections reached by following links from `start`, `start` included.
fn link_chain(backend: &dyn Backend, start: Id) -> Vec<Id> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(next) = record(backend, current).ok().and_then(|r| r.reference(attr::LINK)) {
        if chain.contains(&next) {
            break;
        }
        chain.push(next);
        current = next;
    }
    chain
}

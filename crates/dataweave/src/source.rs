//! The provenance graph.
//!
//! Sources are owned by a block (root sources) or by another source. A
//! source may additionally link an existing source of the same block as a
//! child. Owned children and links together form the provenance graph,
//! which is kept acyclic.

use std::collections::HashMap;

use dataweave_backend::{Backend, EntityKind, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
};
use log::{debug, trace};
use petgraph::{
    algo::has_path_connecting,
    graph::{DiGraph, NodeIndex},
};

use crate::{
    check,
    entity::{EntityWithMetadata, NamedEntity, entity_type, push_ref, remove_ref},
    filter::Filter,
    graph,
    handle::{Handle, HasHandle, Wrap},
};

entity_type!(
    /// A node of the provenance graph.
    ///
    /// # Examples
    ///
    /// ```
    /// use dataweave::{ErrorKind, File, Filter, config::Config};
    ///
    /// let file = File::create(Config::default()).unwrap();
    /// let block = file.create_block("session", "recording").unwrap();
    /// let a = block.create_source("electrode", "hardware").unwrap();
    /// let b = block.create_source("amplifier", "hardware").unwrap();
    ///
    /// a.link_source(&b).unwrap();
    /// let err = b.link_source(&a).unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::Consistency);
    /// assert_eq!(a.sources(&Filter::All).unwrap(), vec![b]);
    /// ```
    Source,
    EntityKind::Source
);

impl NamedEntity for Source {}
impl EntityWithMetadata for Source {}

impl Source {
    /// Creates a source owned by this one.
    pub fn create_source(&self, name: &str, ty: &str) -> Result<Source> {
        create_child(self.handle()?, name, ty)
    }

    /// Looks up an owned child by name or id.
    pub fn source(&self, name_or_id: &str) -> Result<Option<Source>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_source(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<Source>(self.handle()?, name_or_id)
    }

    /// Owned children followed by linked ones.
    pub fn sources(&self, filter: &Filter) -> Result<Vec<Source>> {
        let handle = self.handle()?;
        handle.read(|backend, _| {
            Ok(children(backend, handle.id())
                .into_iter()
                .filter_map(|id| backend.get(id))
                .filter(|source| filter.matches(source))
                .map(|source| Source::wrap(handle, source.id()))
                .collect())
        })
    }

    pub fn source_count(&self) -> Result<usize> {
        let handle = self.handle()?;
        handle.read(|backend, _| Ok(children(backend, handle.id()).len()))
    }

    /// Deletes an owned child and everything it owns.
    ///
    /// # Errors
    ///
    /// - [`Error::Consistency`] if the source is not owned by this one or a
    ///   tag or multi tag references a deleted source
    /// - [`Error::UninitializedEntity`] if it was already deleted
    pub fn delete_source(&self, source: &Source) -> Result<()> {
        graph::delete(self.handle()?, source)
    }

    /// Links `source` as an additional child.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] if `source` is this source, lives in
    /// another block, or already leads back to this source.
    pub fn link_source(&self, source: &Source) -> Result<()> {
        let handle = self.handle()?;
        let other = source.handle()?;
        handle.write(|backend| {
            let child = check::target(handle, backend, other, EntityKind::Source)?;
            check::same_block(backend, handle.id(), child)?;
            if child == handle.id() {
                return Err(Error::consistency(format!("source {child} cannot link itself")));
            }
            if creates_cycle(backend, handle.id(), child)? {
                return Err(Error::consistency(format!(
                    "linking {child} under {} would create a cycle",
                    handle.id()
                )));
            }
            push_ref(backend, handle.id(), attr::LINKED_SOURCES, child)?;
            debug!(id:% = handle.id(), child:%; "Linked source");
            Ok(())
        })
    }

    /// Removes a link created by [`Source::link_source`].
    pub fn unlink_source(&self, source: &Source) -> Result<()> {
        let handle = self.handle()?;
        let child = source.handle()?.id();
        handle.write(|backend| remove_ref(backend, handle.id(), attr::LINKED_SOURCES, child))
    }

    /// The owning source, `None` for root sources.
    pub fn parent_source(&self) -> Result<Option<Source>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            Ok(record
                .parent()
                .and_then(|parent| backend.get(parent))
                .filter(|parent| parent.kind() == EntityKind::Source)
                .map(|parent| Source::wrap(handle, parent.id())))
        })
    }

    /// Searches the provenance graph breadth-first from this source (depth 0).
    pub fn find_sources(&self, filter: &Filter, max_depth: usize) -> Result<Vec<Source>> {
        let handle = self.handle()?;
        handle.read(|backend, _| Ok(search(handle, backend, vec![handle.id()], filter, max_depth)))
    }
}

/// Creates a source owned by the block or source `owner`.
pub(crate) fn create_child(owner: &Handle, name: &str, ty: &str) -> Result<Source> {
    owner.write(|backend| {
        let record = graph::named_record(backend, owner.id(), EntityKind::Source, name, ty)?;
        let id = record.id();
        backend.create(record)?;
        debug!(id:%, owner:% = owner.id(), name; "Created source");
        Ok(Source::wrap(owner, id))
    })
}

/// Breadth-first search over owned and linked children.
pub(crate) fn search(
    handle: &Handle,
    backend: &dyn Backend,
    roots: Vec<Id>,
    filter: &Filter,
    max_depth: usize,
) -> Vec<Source> {
    let found = check::breadth_first(roots, max_depth, |id| children(backend, id));
    trace!(found = found.len(), max_depth; "Searched sources");
    found
        .into_iter()
        .filter_map(|id| backend.get(id))
        .filter(|source| filter.matches(source))
        .map(|source| Source::wrap(handle, source.id()))
        .collect()
}

fn children(backend: &dyn Backend, id: Id) -> Vec<Id> {
    let mut children = backend.list(id, EntityKind::Source);
    if let Some(source) = backend.get(id) {
        for linked in source.refs(attr::LINKED_SOURCES) {
            if backend.contains(*linked) && !children.contains(linked) {
                children.push(*linked);
            }
        }
    }
    children
}

/// Returns `true` if a path already leads from `child` to `parent`.
fn creates_cycle(backend: &dyn Backend, parent: Id, child: Id) -> Result<bool> {
    let block = check::owning_block(backend, parent)
        .ok_or_else(|| Error::consistency(format!("source {parent} is not owned by a block")))?;

    let mut graph = DiGraph::<Id, ()>::new();
    let mut nodes: HashMap<Id, NodeIndex> = HashMap::new();
    let sources = check::breadth_first(backend.list(block, EntityKind::Source), usize::MAX, |id| {
        children(backend, id)
    });
    for id in &sources {
        nodes.insert(*id, graph.add_node(*id));
    }
    for id in &sources {
        for next in children(backend, *id) {
            if let (Some(from), Some(to)) = (nodes.get(id), nodes.get(&next)) {
                graph.add_edge(*from, *to, ());
            }
        }
    }

    let (Some(from), Some(to)) = (nodes.get(&child), nodes.get(&parent)) else {
        return Ok(false);
    };
    Ok(has_path_connecting(&graph, *from, *to, None))
}

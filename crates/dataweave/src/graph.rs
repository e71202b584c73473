//! Creation, lookup and deletion of owned children.
//!
//! Deleting an entity removes everything it owns. Before anything is
//! removed, references from tags and multi tags outside the deleted subtree
//! are checked: such a reference rejects the whole deletion. All other
//! references into the subtree (metadata, section links, group members,
//! source references and source links) are detached afterwards.

use std::collections::HashSet;

use dataweave_backend::{Attribute, Backend, EntityKind, Record, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
};
use log::{debug, trace};

use crate::{
    check,
    filter::Filter,
    handle::{Handle, Wrap, now},
};

const ALL_KINDS: [EntityKind; 10] = [
    EntityKind::File,
    EntityKind::Block,
    EntityKind::DataArray,
    EntityKind::Tag,
    EntityKind::MultiTag,
    EntityKind::Feature,
    EntityKind::Group,
    EntityKind::Source,
    EntityKind::Section,
    EntityKind::Property,
];

/// Reference keys that block the deletion of their target.
const BINDING_KEYS: [&str; 4] = [attr::REFERENCES, attr::SOURCES, attr::POSITIONS, attr::EXTENTS];

/// Reference keys that are silently cleaned up when their target goes away.
const DETACHED_KEYS: [&str; 7] = [
    attr::METADATA,
    attr::LINK,
    attr::DATA_ARRAYS,
    attr::TAGS,
    attr::MULTI_TAGS,
    attr::SOURCES,
    attr::LINKED_SOURCES,
];

/// Starts a record for a new named child after checking name, type and
/// sibling uniqueness.
pub(crate) fn named_record(
    backend: &dyn Backend,
    parent: Id,
    kind: EntityKind,
    name: &str,
    ty: &str,
) -> Result<Record> {
    check::check_name(name)?;
    check::check_type(ty)?;
    check::check_unique(backend, parent, kind, name, None)?;
    Ok(timestamped(kind, parent)
        .with(attr::NAME, Attribute::Text(name.to_string()))
        .with(attr::TYPE, Attribute::Text(ty.to_string())))
}

/// Starts a record with a fresh id and creation timestamps.
pub(crate) fn timestamped(kind: EntityKind, parent: Id) -> Record {
    let time = now();
    Record::new(Id::generate(), kind, Some(parent))
        .with(attr::CREATED_AT, Attribute::Integer(time))
        .with(attr::UPDATED_AT, Attribute::Integer(time))
}

/// Looks up a child of `owner` by name or id.
pub(crate) fn get<T: Wrap>(owner: &Handle, name_or_id: &str) -> Result<Option<T>> {
    owner.read(|backend, _| {
        let found = check::resolve_child(backend, owner.id(), T::KIND, name_or_id);
        trace!(owner:% = owner.id(), name_or_id, found:? = found; "Resolved child");
        Ok(found.map(|id| T::wrap(owner, id)))
    })
}

pub(crate) fn has<T: Wrap>(owner: &Handle, name_or_id: &str) -> Result<bool> {
    owner.read(|backend, _| Ok(check::resolve_child(backend, owner.id(), T::KIND, name_or_id).is_some()))
}

/// Children of `owner` of `T`'s kind accepted by `filter`, in creation order.
pub(crate) fn list<T: Wrap>(owner: &Handle, filter: &Filter) -> Result<Vec<T>> {
    owner.read(|backend, _| {
        Ok(backend
            .list(owner.id(), T::KIND)
            .into_iter()
            .filter(|id| backend.get(*id).is_some_and(|record| filter.matches(record)))
            .map(|id| T::wrap(owner, id))
            .collect())
    })
}

pub(crate) fn count<T: Wrap>(owner: &Handle) -> Result<usize> {
    owner.read(|backend, _| Ok(backend.list(owner.id(), T::KIND).len()))
}

/// Deletes `child`, which must be owned by `owner`.
///
/// # Errors
///
/// - [`Error::UninitializedEntity`] if the child was already deleted
/// - [`Error::Consistency`] if the child is owned elsewhere or still bound
///   to a tag or multi tag
pub(crate) fn delete<T: Wrap>(owner: &Handle, child: &T) -> Result<()> {
    let child = child.handle()?;
    if !owner.same_file(child) {
        return Err(Error::consistency(format!(
            "{} {} belongs to a different file",
            T::KIND,
            child.id()
        )));
    }
    owner.write(|backend| {
        let record = backend.get(child.id()).ok_or_else(|| {
            Error::uninitialized(format!("{} {} was already deleted", T::KIND, child.id()))
        })?;
        if record.parent() != Some(owner.id()) || record.kind() != T::KIND {
            return Err(Error::consistency(format!(
                "{} is not a {} owned by {}",
                child.id(),
                T::KIND,
                owner.id()
            )));
        }
        delete_subtree(backend, child.id())
    })
}

/// Ids of `root` and everything it owns.
pub(crate) fn subtree(backend: &dyn Backend, root: Id) -> Vec<Id> {
    check::breadth_first(vec![root], usize::MAX, |id| {
        ALL_KINDS.iter().flat_map(|kind| backend.list(id, *kind)).collect()
    })
}

/// Removes `root` with its subtree after the reference checks.
pub(crate) fn delete_subtree(backend: &mut dyn Backend, root: Id) -> Result<()> {
    let doomed: HashSet<Id> = subtree(backend, root).into_iter().collect();

    if let Some((holder, target)) = binding_reference(backend, &doomed) {
        return Err(Error::consistency(format!(
            "{target} is still referenced by {holder}; detach the reference first"
        )));
    }

    let mut detached = 0usize;
    for kind in ALL_KINDS {
        for id in backend.records(kind) {
            if doomed.contains(&id) {
                continue;
            }
            detached += detach(backend, id, &doomed)?;
        }
    }

    let removed = backend.delete(root)?;
    debug!(id:% = root, removed = removed.len(), detached; "Deleted entity");
    Ok(())
}

/// Finds a tag, multi tag or feature outside `doomed` that binds into it.
fn binding_reference(backend: &dyn Backend, doomed: &HashSet<Id>) -> Option<(Id, Id)> {
    let holders = [EntityKind::Tag, EntityKind::MultiTag, EntityKind::Feature]
        .into_iter()
        .flat_map(|kind| backend.records(kind))
        .filter(|id| !doomed.contains(id))
        .filter_map(|id| backend.get(id));

    for holder in holders {
        let keys: &[&str] = if holder.kind() == EntityKind::Feature {
            &[attr::FEATURE_DATA]
        } else {
            &BINDING_KEYS
        };
        for key in keys {
            let targets = holder.reference(key).into_iter().chain(holder.refs(key).iter().copied());
            for target in targets {
                if doomed.contains(&target) {
                    // features are bound through their tag
                    let bound_by = match holder.kind() {
                        EntityKind::Feature => holder.parent().unwrap_or(holder.id()),
                        _ => holder.id(),
                    };
                    return Some((bound_by, target));
                }
            }
        }
    }
    None
}

/// Strips references into `doomed` from one record; returns how many were removed.
fn detach(backend: &mut dyn Backend, id: Id, doomed: &HashSet<Id>) -> Result<usize> {
    let Some(record) = backend.get(id) else {
        return Ok(0);
    };

    let mut updates = Vec::new();
    for key in DETACHED_KEYS {
        match record.get(key) {
            Some(Attribute::Ref(target)) if doomed.contains(target) => updates.push((key, None, 1)),
            Some(Attribute::Refs(targets)) if targets.iter().any(|t| doomed.contains(t)) => {
                let kept: Vec<Id> = targets.iter().copied().filter(|t| !doomed.contains(t)).collect();
                let dropped = targets.len() - kept.len();
                updates.push((key, Some(Attribute::Refs(kept)), dropped));
            }
            _ => {}
        }
    }

    let mut count = 0;
    for (key, value, dropped) in updates {
        backend.set_attribute(id, key, value)?;
        count += dropped;
    }
    Ok(count)
}

//! Validation rules shared by the entity types.
//!
//! Every function here only inspects; mutations happen after all checks of
//! an operation have passed.

use std::collections::VecDeque;

use dataweave_backend::{Backend, EntityKind, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
    units,
};

use crate::{config::Config, handle::Handle};

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::empty_string("name must not be empty"));
    }
    if name.contains('/') {
        return Err(Error::invalid_name(format!(
            "name `{name}` must not contain '/'"
        )));
    }
    Ok(())
}

pub(crate) fn check_type(ty: &str) -> Result<()> {
    if ty.is_empty() {
        return Err(Error::empty_string("type must not be empty"));
    }
    Ok(())
}

pub(crate) fn check_text(what: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(Error::empty_string(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Fails if a sibling of the same kind other than `except` holds `name`.
pub(crate) fn check_unique(
    backend: &dyn Backend,
    parent: Id,
    kind: EntityKind,
    name: &str,
    except: Option<Id>,
) -> Result<()> {
    match backend.find(parent, kind, name) {
        Some(existing) if Some(existing) != except => Err(Error::duplicate_name(format!(
            "{kind} named `{name}` already exists"
        ))),
        _ => Ok(()),
    }
}

/// Normalises and validates a unit according to the configuration.
pub(crate) fn unit(config: &Config, unit: &str) -> Result<String> {
    let unit = if config.units().sanitize() {
        units::sanitize_unit(unit)
    } else {
        unit.to_string()
    };
    units::check_unit(&unit)?;
    Ok(unit)
}

/// Like [`unit`] but also accepts the `none` placeholder.
pub(crate) fn optional_unit(config: &Config, value: &str) -> Result<String> {
    if value == "none" {
        return Ok(value.to_string());
    }
    unit(config, value)
}

pub(crate) fn check_finite(what: &str, values: &[f64]) -> Result<()> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::invalid_value(format!(
            "{what} must be finite, got {bad}"
        )));
    }
    Ok(())
}

/// Resolves the handle of an entity passed as argument.
///
/// The entity must be bound, live in the same file as `owner`, be of
/// `kind` and still exist.
pub(crate) fn target(owner: &Handle, backend: &dyn Backend, other: &Handle, kind: EntityKind) -> Result<Id> {
    if !owner.same_file(other) {
        return Err(Error::consistency(format!(
            "{kind} {} belongs to a different file",
            other.id()
        )));
    }
    match backend.get(other.id()) {
        Some(record) if record.kind() == kind => Ok(record.id()),
        Some(record) => Err(Error::consistency(format!(
            "{} is a {}, expected a {kind}",
            record.id(),
            record.kind()
        ))),
        None => Err(Error::consistency(format!(
            "{kind} {} no longer exists",
            other.id()
        ))),
    }
}

/// Returns the block that (transitively) owns `id`.
pub(crate) fn owning_block(backend: &dyn Backend, id: Id) -> Option<Id> {
    let mut current = backend.get(id)?;
    loop {
        if current.kind() == EntityKind::Block {
            return Some(current.id());
        }
        current = backend.get(current.parent()?)?;
    }
}

/// Fails unless `a` and `b` are owned by the same block.
pub(crate) fn same_block(backend: &dyn Backend, a: Id, b: Id) -> Result<()> {
    let (block_a, block_b) = (owning_block(backend, a), owning_block(backend, b));
    if block_a.is_none() || block_a != block_b {
        return Err(Error::consistency(format!(
            "{a} and {b} do not belong to the same block"
        )));
    }
    Ok(())
}

/// Rank of the data held by a data array record.
pub(crate) fn rank(backend: &dyn Backend, array: Id) -> Result<usize> {
    crate::handle::record(backend, array)?
        .data(attr::DATA)
        .map(|data| data.rank())
        .ok_or_else(|| Error::missing_attribute(format!("data array {array} has no data")))
}

/// Resolves a child of `parent` by id text or, failing that, by name.
pub(crate) fn resolve_child(backend: &dyn Backend, parent: Id, kind: EntityKind, name_or_id: &str) -> Option<Id> {
    if let Some(id) = Id::lookup(name_or_id)
        && let Some(record) = backend.get(id)
        && record.kind() == kind
        && record.parent() == Some(parent)
    {
        return Some(id);
    }
    backend.find(parent, kind, name_or_id)
}

/// Breadth-first walk over a graph given by `next`, starting at `roots`
/// (depth 0). Nodes are visited once; `max_depth` bounds the depth.
pub(crate) fn breadth_first(roots: Vec<Id>, max_depth: usize, mut next: impl FnMut(Id) -> Vec<Id>) -> Vec<Id> {
    let mut visited = Vec::new();
    let mut queue: VecDeque<(Id, usize)> = roots.into_iter().map(|id| (id, 0)).collect();
    while let Some((id, depth)) = queue.pop_front() {
        if visited.contains(&id) {
            continue;
        }
        visited.push(id);
        if depth < max_depth {
            queue.extend(next(id).into_iter().map(|child| (child, depth + 1)));
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use dataweave_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_names() {
        assert!(check_name("trial-1").is_ok());
        assert_eq!(check_name("").unwrap_err().kind(), ErrorKind::EmptyString);
        assert_eq!(check_name("a/b").unwrap_err().kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_unit_sanitizing() {
        let config = Config::default();
        assert_eq!(unit(&config, " µV").unwrap(), "uV");
        assert_eq!(optional_unit(&config, "none").unwrap(), "none");
        assert_eq!(unit(&config, "furlong").unwrap_err().kind(), ErrorKind::InvalidUnit);

        let strict = Config::from_toml_str("[units]\nsanitize = false").unwrap();
        assert_eq!(unit(&strict, " mV").unwrap_err().kind(), ErrorKind::InvalidUnit);
    }

    #[test]
    fn test_breadth_first_visits_once() {
        let ids: Vec<Id> = (0..4).map(|_| Id::generate()).collect();
        // 0 -> 1, 2; 1 -> 3; 2 -> 3, 0
        let edges = |id: Id| -> Vec<Id> {
            match ids.iter().position(|x| *x == id) {
                Some(0) => vec![ids[1], ids[2]],
                Some(1) => vec![ids[3]],
                Some(2) => vec![ids[3], ids[0]],
                _ => vec![],
            }
        };
        assert_eq!(breadth_first(vec![ids[0]], usize::MAX, edges), ids);
        assert_eq!(breadth_first(vec![ids[0]], 1, edges), ids[..3].to_vec());
        assert_eq!(breadth_first(vec![ids[0]], 0, edges), vec![ids[0]]);
    }
}

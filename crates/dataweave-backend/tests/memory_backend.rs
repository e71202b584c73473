use std::collections::HashSet;

use dataweave_backend::{Attribute, Backend, BackendError, EntityKind, MemoryBackend, Record, attr};
use dataweave_core::identifier::Id;
use proptest::prelude::*;

fn file(backend: &mut MemoryBackend) -> Id {
    let record = Record::new(Id::generate(), EntityKind::File, None);
    let id = record.id();
    backend.create(record).unwrap();
    id
}

fn child(backend: &mut MemoryBackend, parent: Id, kind: EntityKind) -> Id {
    let record = Record::new(Id::generate(), kind, Some(parent));
    let id = record.id();
    backend.create(record).unwrap();
    id
}

#[test]
fn test_delete_cascades_to_owned_records() {
    let mut backend = MemoryBackend::new();
    let root = file(&mut backend);
    let block = child(&mut backend, root, EntityKind::Block);
    let array = child(&mut backend, block, EntityKind::DataArray);
    let tag = child(&mut backend, block, EntityKind::Tag);
    let feature = child(&mut backend, tag, EntityKind::Feature);
    let other = child(&mut backend, root, EntityKind::Block);

    let removed = backend.delete(block).unwrap();

    assert_eq!(removed[0], block);
    assert_eq!(
        removed.iter().copied().collect::<HashSet<_>>(),
        HashSet::from([block, array, tag, feature])
    );
    assert!(!backend.contains(feature));
    assert!(backend.contains(other));
    assert_eq!(backend.list(root, EntityKind::Block), vec![other]);
}

#[test]
fn test_delete_missing_record() {
    let mut backend = MemoryBackend::new();
    let root = file(&mut backend);
    let block = child(&mut backend, root, EntityKind::Block);
    backend.delete(block).unwrap();

    assert!(matches!(backend.delete(block), Err(BackendError::NotFound(id)) if id == block));
}

#[test]
fn test_attributes_roundtrip() {
    let mut backend = MemoryBackend::new();
    let root = file(&mut backend);

    backend
        .set_attribute(root, attr::FORMAT, Some(Attribute::Text("nix".to_string())))
        .unwrap();
    assert_eq!(
        backend.attribute(root, attr::FORMAT).unwrap(),
        Some(&Attribute::Text("nix".to_string()))
    );

    backend.set_attribute(root, attr::FORMAT, None).unwrap();
    assert_eq!(backend.attribute(root, attr::FORMAT).unwrap(), None);

    let stale = Id::generate();
    assert!(matches!(
        backend.set_attribute(stale, attr::NAME, None),
        Err(BackendError::NotFound(_))
    ));
    assert!(backend.attribute(stale, attr::NAME).is_err());
}

#[test]
fn test_records_by_kind_keeps_creation_order() {
    let mut backend = MemoryBackend::new();
    let root = file(&mut backend);
    let a = child(&mut backend, root, EntityKind::Section);
    let b = child(&mut backend, a, EntityKind::Section);
    let c = child(&mut backend, root, EntityKind::Section);

    assert_eq!(backend.records(EntityKind::Section), vec![a, b, c]);

    backend.flush().unwrap();
    assert_eq!(backend.flush_count(), 1);
}

// ===================
// Property tests
// ===================

/// Parent choices for a random tree: node `i + 1` is owned by node `parents[i] % (i + 1)`.
fn tree_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 1..40)
}

fn check_delete_removes_exact_subtree(parents: Vec<usize>, victim: usize) -> Result<(), TestCaseError> {
    let mut backend = MemoryBackend::new();
    let mut ids = vec![file(&mut backend)];
    let mut owner = vec![None];
    for (i, choice) in parents.iter().enumerate() {
        let parent = choice % (i + 1);
        ids.push(child(&mut backend, ids[parent], EntityKind::Section));
        owner.push(Some(parent));
    }

    let victim = 1 + victim % parents.len();
    let in_subtree = |mut node: usize| loop {
        if node == victim {
            return true;
        }
        match owner[node] {
            Some(parent) => node = parent,
            None => return false,
        }
    };

    let removed: HashSet<Id> = backend.delete(ids[victim]).unwrap().into_iter().collect();
    for (node, id) in ids.iter().enumerate() {
        prop_assert_eq!(removed.contains(id), in_subtree(node));
        prop_assert_eq!(backend.contains(*id), !in_subtree(node));
    }
    Ok(())
}

proptest! {
    #[test]
    fn delete_removes_exact_subtree(parents in tree_strategy(), victim in any::<usize>()) {
        check_delete_removes_exact_subtree(parents, victim)?;
    }
}

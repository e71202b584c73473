//! Integration tests for ownership, naming and deletion across the entity graph.
//!
//! These tests drive the public API only: entities are created through their
//! owners, bound to each other, and deleted again while the invariants of
//! the graph are checked at every step.

use dataweave::{
    Entity, EntityWithMetadata, EntityWithSources, ErrorKind, File, Filter, MemoryBackend, NamedEntity,
    NdBuffer, RangeDimension, SampledDimension, SetDimension, config::Config,
};

fn new_file() -> File {
    File::create(Config::default()).expect("file should be created")
}

fn signal(len: usize) -> NdBuffer {
    NdBuffer::vector((0..len).map(|i| i as f64).collect())
}

fn sampled() -> dataweave::Dimension {
    SampledDimension::new(1.0)
        .and_then(|dim| dim.with_unit("s"))
        .expect("valid dimension")
        .into()
}

#[test]
fn test_sibling_names_are_unique() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();

    let err = file.create_block("session", "other").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);

    let other = file.create_block("baseline", "recording").unwrap();
    let err = other.set_name("session").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    assert_eq!(other.name().unwrap(), "baseline");

    // Renaming to the current name is allowed
    block.set_name("session").unwrap();

    // Names are scoped to the kind: a tag may share a data array's name
    block
        .create_data_array("spikes", "event", signal(3), vec![sampled()])
        .unwrap();
    block.create_tag("spikes", "event", vec![1.0]).unwrap();
    assert_eq!(block.data_array_count().unwrap(), 1);
    assert_eq!(block.tag_count().unwrap(), 1);
}

#[test]
fn test_names_are_validated() {
    let file = new_file();

    assert_eq!(
        file.create_block("", "recording").unwrap_err().kind(),
        ErrorKind::EmptyString
    );
    assert_eq!(
        file.create_block("a/b", "recording").unwrap_err().kind(),
        ErrorKind::InvalidName
    );
    assert_eq!(
        file.create_block("session", "").unwrap_err().kind(),
        ErrorKind::EmptyString
    );
}

#[test]
fn test_lookup_by_name_and_id() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let id = block.id().unwrap();

    let by_name = file.block("session").unwrap().unwrap();
    let by_id = file.block(&id.to_string()).unwrap().unwrap();
    assert_eq!(by_name, block);
    assert_eq!(by_id, block);
    assert!(file.block("missing").unwrap().is_none());
    assert!(file.has_block("session").unwrap());
}

#[test]
fn test_filters_select_children() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let left = block.create_source("left", "electrode").unwrap();
    block.create_source("right", "electrode").unwrap();
    block.create_source("camera", "video").unwrap();

    let electrodes = block.sources(&Filter::Type("electrode".into())).unwrap();
    let names: Vec<String> = electrodes.iter().map(|s| s.name().unwrap()).collect();
    assert_eq!(names, vec!["left", "right"]);

    let by_id = block.sources(&Filter::Id(left.id().unwrap())).unwrap();
    assert_eq!(by_id, vec![left]);

    let by_name = block.sources(&Filter::Name("camera".into())).unwrap();
    assert_eq!(by_name.len(), 1);
}

#[test]
fn test_dimension_count_matches_rank() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();

    let err = block
        .create_data_array("lfp", "signal", signal(4), vec![])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRank);

    let err = block
        .create_data_array("lfp", "signal", signal(4), vec![sampled(), sampled()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRank);

    let array = block
        .create_data_array("lfp", "signal", signal(4), vec![sampled()])
        .unwrap();
    assert_eq!(array.dimension_count().unwrap(), 1);
    assert_eq!(array.dimension(1).unwrap().index(), 1);
    assert_eq!(array.dimension(2).unwrap_err().kind(), ErrorKind::OutOfBounds);

    let matrix = NdBuffer::matrix(vec![vec![1.0, 2.0]]).unwrap();
    assert_eq!(array.write(matrix).unwrap_err().kind(), ErrorKind::InvalidRank);
}

#[test]
fn test_range_ticks_must_ascend() {
    assert_eq!(
        RangeDimension::new(vec![1.0, 2.0, 2.0]).unwrap_err().kind(),
        ErrorKind::UnsortedTicks
    );
    assert_eq!(
        RangeDimension::new(vec![3.0, 1.0, 2.0]).unwrap_err().kind(),
        ErrorKind::UnsortedTicks
    );
    assert!(RangeDimension::new(vec![1.0, 2.0, 3.0]).is_ok());
}

#[test]
fn test_set_dimension_keeps_type() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array("lfp", "signal", signal(3), vec![sampled()])
        .unwrap();

    let err = array
        .set_dimension(1, SetDimension::new(["a", "b", "c"]).into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDimension);

    let slower = SampledDimension::new(2.0).unwrap();
    array.set_dimension(1, slower.into()).unwrap();
    let dim = array.dimension(1).unwrap();
    assert_eq!(dim.as_sampled().unwrap().sampling_interval(), 2.0);
}

#[test]
fn test_source_cycles_are_rejected() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let rig = block.create_source("rig", "hardware").unwrap();
    let probe = rig.create_source("probe", "hardware").unwrap();
    let channel = probe.create_source("channel", "hardware").unwrap();

    let err = channel.link_source(&rig).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert_eq!(channel.source_count().unwrap(), 0);
    let err = rig.link_source(&rig).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert_eq!(rig.sources(&Filter::All).unwrap(), vec![probe.clone()]);

    // A second path without a cycle is fine
    let amplifier = block.create_source("amplifier", "hardware").unwrap();
    amplifier.link_source(&channel).unwrap();
    assert_eq!(amplifier.source_count().unwrap(), 1);

    let err = channel.link_source(&amplifier).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert!(channel.sources(&Filter::All).unwrap().is_empty());
    assert_eq!(amplifier.sources(&Filter::All).unwrap(), vec![channel.clone()]);

    let found = block.find_sources(&Filter::Name("channel".into()), usize::MAX).unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_sources_stay_in_their_block() {
    let file = new_file();
    let first = file.create_block("first", "recording").unwrap();
    let second = file.create_block("second", "recording").unwrap();
    let source = first.create_source("rig", "hardware").unwrap();
    let array = second
        .create_data_array("lfp", "signal", signal(3), vec![sampled()])
        .unwrap();

    let err = array.add_source(&source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert_eq!(array.source_count().unwrap(), 0);
}

#[test]
fn test_referenced_array_cannot_be_deleted() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array("lfp", "signal", signal(10), vec![sampled()])
        .unwrap();
    let tag = block.create_tag("stimulus", "event", vec![2.0]).unwrap();
    tag.add_reference(&array).unwrap();

    let err = block.delete_data_array(&array).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert!(array.is_valid());

    tag.remove_reference(&array).unwrap();
    block.delete_data_array(&array).unwrap();
    assert!(!array.is_valid());
    assert_eq!(block.data_array_count().unwrap(), 0);
}

#[test]
fn test_stale_delete_fails() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let group = block.create_group("trials", "selection").unwrap();

    block.delete_group(&group).unwrap();
    let err = block.delete_group(&group).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UninitializedEntity);
    assert_eq!(group.name().unwrap_err().kind(), ErrorKind::UninitializedEntity);
}

#[test]
fn test_delete_cascades_to_children() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array("lfp", "signal", signal(10), vec![sampled()])
        .unwrap();
    let tag = block.create_tag("stimulus", "event", vec![2.0]).unwrap();
    tag.add_reference(&array).unwrap();
    let rig = block.create_source("rig", "hardware").unwrap();
    let probe = rig.create_source("probe", "hardware").unwrap();

    file.delete_block(&block).unwrap();
    assert_eq!(file.block_count().unwrap(), 0);
    assert!(!array.is_valid());
    assert!(!tag.is_valid());
    assert!(!rig.is_valid());
    assert!(!probe.is_valid());
}

#[test]
fn test_group_members_are_detached_on_delete() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array("lfp", "signal", signal(3), vec![sampled()])
        .unwrap();
    let tag = block.create_tag("stimulus", "event", vec![1.0]).unwrap();
    let group = block.create_group("trials", "selection").unwrap();

    group.add_data_array(&array).unwrap();
    group.add_tag(&tag).unwrap();
    group.add_data_array(&array).unwrap();
    assert_eq!(group.data_array_count().unwrap(), 1);
    assert!(group.has_tag(&tag).unwrap());

    block.delete_data_array(&array).unwrap();
    block.delete_tag(&tag).unwrap();
    assert_eq!(group.data_array_count().unwrap(), 0);
    assert_eq!(group.tag_count().unwrap(), 0);
}

#[test]
fn test_group_members_stay_in_their_block() {
    let file = new_file();
    let first = file.create_block("first", "recording").unwrap();
    let second = file.create_block("second", "recording").unwrap();
    let array = first
        .create_data_array("lfp", "signal", signal(3), vec![sampled()])
        .unwrap();
    let group = second.create_group("trials", "selection").unwrap();

    let err = group.add_data_array(&array).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
}

#[test]
fn test_source_filters_on_tagged_entities() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let rig = block.create_source("rig", "hardware").unwrap();
    let array = block
        .create_data_array("lfp", "signal", signal(3), vec![sampled()])
        .unwrap();
    block
        .create_data_array("ecg", "signal", signal(3), vec![sampled()])
        .unwrap();

    array.add_source(&rig).unwrap();
    array.add_source(&rig).unwrap();
    assert_eq!(array.source_count().unwrap(), 1);

    let from_rig = block.data_arrays(&Filter::Source(rig.id().unwrap())).unwrap();
    assert_eq!(from_rig, vec![array.clone()]);

    // Deleting the source detaches it from the data array
    block.delete_source(&rig).unwrap();
    assert_eq!(array.source_count().unwrap(), 0);
}

#[test]
fn test_closed_file_invalidates_handles() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    assert!(file.is_open());

    file.close().unwrap();
    assert!(!file.is_open());
    assert!(!block.is_valid());
    assert_eq!(block.name().unwrap_err().kind(), ErrorKind::UninitializedEntity);
    assert_eq!(
        file.create_block("other", "recording").unwrap_err().kind(),
        ErrorKind::UninitializedEntity
    );

    // Closing twice is harmless
    file.close().unwrap();
}

#[test]
fn test_unbound_entities_are_uninitialized() {
    let block = dataweave::Block::default();
    assert!(!block.is_valid());
    assert_eq!(block.id().unwrap_err().kind(), ErrorKind::UninitializedEntity);
}

#[test]
fn test_open_requires_a_file() {
    let err = File::open(Box::new(MemoryBackend::new()), Config::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFile);
}

#[test]
fn test_timestamps_advance_on_write() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let created = block.created_at().unwrap();

    block.set_definition(Some("first recording")).unwrap();
    assert!(block.updated_at().unwrap() >= created);
    assert_eq!(block.definition().unwrap().as_deref(), Some("first recording"));

    block.set_definition(None).unwrap();
    assert!(block.definition().unwrap().is_none());
}

#[test]
fn test_metadata_reference_is_optional() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    assert!(block.metadata().unwrap().is_none());

    let section = file.create_section("subject", "animal").unwrap();
    block.set_metadata(&section).unwrap();
    assert_eq!(block.metadata().unwrap(), Some(section.clone()));

    let tagged = file.blocks(&Filter::Metadata(section.id().unwrap())).unwrap();
    assert_eq!(tagged, vec![block.clone()]);

    block.remove_metadata().unwrap();
    assert!(block.metadata().unwrap().is_none());
}

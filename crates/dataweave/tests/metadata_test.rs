//! Integration tests for the metadata tree of sections and properties.

use dataweave::{
    DataType, Entity, EntityWithMetadata, ErrorKind, File, Filter, NamedEntity, Value, Variant,
    config::Config,
};

fn new_file() -> File {
    File::create(Config::default()).expect("file should be created")
}

#[test]
fn test_property_round_trip() {
    let file = new_file();
    let subject = file.create_section("subject", "animal").unwrap();
    let weight = subject
        .create_property("weight", vec![Value::from(21.5), Value::from(22.0)])
        .unwrap();
    weight.set_unit(Some("g")).unwrap();
    weight.set_definition(Some("body weight before surgery")).unwrap();

    let found = subject.property("weight").unwrap().unwrap();
    assert_eq!(found.name().unwrap(), "weight");
    assert_eq!(found.values().unwrap(), vec![Value::from(21.5), Value::from(22.0)]);
    assert_eq!(found.unit().unwrap().as_deref(), Some("g"));
    assert_eq!(found.data_type().unwrap(), DataType::Double);
    assert_eq!(found.value_count().unwrap(), 2);

    found.delete_values().unwrap();
    assert_eq!(found.data_type().unwrap(), DataType::Nothing);
    assert_eq!(weight.value_count().unwrap(), 0);
}

#[test]
fn test_property_values_share_a_type() {
    let file = new_file();
    let subject = file.create_section("subject", "animal").unwrap();

    let err = subject
        .create_property("mixed", vec![Value::from(1.0), Value::from("one")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    assert_eq!(subject.property_count().unwrap(), 0);

    let tags = subject
        .create_property("tags", vec![Value::from("awake"), Value::from("head-fixed")])
        .unwrap();
    let err = tags.set_values(vec![Value::from(true), Value::from(2_i64)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    assert!(matches!(tags.values().unwrap()[0].variant(), Variant::String(_)));
}

#[test]
fn test_property_names_are_unique() {
    let file = new_file();
    let subject = file.create_section("subject", "animal").unwrap();
    subject.create_property("species", vec![Value::from("mouse")]).unwrap();

    let err = subject.create_property("species", vec![]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
}

#[test]
fn test_property_unit_is_checked() {
    let file = new_file();
    let subject = file.create_section("subject", "animal").unwrap();
    let age = subject.create_property("age", vec![Value::from(12_i64)]).unwrap();

    let err = age.set_unit(Some("fortnights")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUnit);
    assert!(age.unit().unwrap().is_none());
}

#[test]
fn test_section_tree() {
    let file = new_file();
    let experiment = file.create_section("experiment", "protocol").unwrap();
    let stimulus = experiment.create_section("stimulus", "visual").unwrap();
    let grating = stimulus.create_section("grating", "visual").unwrap();

    assert_eq!(grating.parent_section().unwrap(), Some(stimulus.clone()));
    assert!(experiment.parent_section().unwrap().is_none());

    let visual = file.find_sections(&Filter::Type("visual".into()), usize::MAX).unwrap();
    assert_eq!(visual, vec![stimulus.clone(), grating.clone()]);

    let shallow = experiment.find_sections(&Filter::All, 1).unwrap();
    assert_eq!(shallow, vec![experiment.clone(), stimulus.clone()]);
}

#[test]
fn test_linked_section_is_inherited() {
    let file = new_file();
    let template = file.create_section("template", "animal").unwrap();
    template.create_property("species", vec![Value::from("mouse")]).unwrap();
    template.create_property("strain", vec![Value::from("C57BL/6")]).unwrap();

    let subject = file.create_section("subject", "animal").unwrap();
    subject.create_property("strain", vec![Value::from("BALB/c")]).unwrap();
    subject.set_link(Some(&template)).unwrap();
    assert_eq!(subject.link().unwrap(), Some(template.clone()));

    assert_eq!(subject.inherited_properties().unwrap().len(), 2);
    let strain = subject.property_by_name("strain").unwrap().unwrap();
    assert_eq!(strain.values().unwrap(), vec![Value::from("BALB/c")]);
    let species = subject.property_by_name("species").unwrap().unwrap();
    assert_eq!(species.values().unwrap(), vec![Value::from("mouse")]);
    assert!(subject.property("species").unwrap().is_none());

    let err = template.set_link(Some(&subject)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);

    subject.set_link(None).unwrap();
    assert!(subject.inherited_properties().unwrap().is_empty());
}

#[test]
fn test_deleting_a_section_clears_references() {
    let file = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let subject = file.create_section("subject", "animal").unwrap();
    let history = subject.create_section("history", "notes").unwrap();
    let derived = file.create_section("derived", "animal").unwrap();

    block.set_metadata(&history).unwrap();
    derived.set_link(Some(&subject)).unwrap();

    file.delete_section(&subject).unwrap();
    assert!(!history.is_valid());
    assert!(block.metadata().unwrap().is_none());
    assert!(derived.link().unwrap().is_none());
    assert_eq!(file.section_count().unwrap(), 1);
}

#[test]
fn test_sections_are_shared_between_blocks() {
    let file = new_file();
    let first = file.create_block("first", "recording").unwrap();
    let second = file.create_block("second", "recording").unwrap();
    let rig = file.create_section("rig", "hardware").unwrap();

    first.set_metadata(&rig).unwrap();
    second.set_metadata(&rig).unwrap();
    let users = file.blocks(&Filter::Metadata(rig.id().unwrap())).unwrap();
    assert_eq!(users.len(), 2);

    // Deleting a block leaves the section alone
    file.delete_block(&first).unwrap();
    assert!(rig.is_valid());
    assert_eq!(second.metadata().unwrap().unwrap().name().unwrap(), "rig");
}

#[test]
fn test_metadata_must_live_in_the_same_file() {
    let file = new_file();
    let other = new_file();
    let block = file.create_block("session", "recording").unwrap();
    let foreign = other.create_section("subject", "animal").unwrap();

    let err = block.set_metadata(&foreign).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);
}

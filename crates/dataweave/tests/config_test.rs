//! Integration tests for configuration loading and whole-file validation.

use std::fs;

use tempfile::tempdir;

use dataweave::{
    ErrorKind, File, NdBuffer, SetDimension,
    config::{Config, load_config},
};

#[test]
fn test_load_config_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dataweave.toml");
    fs::write(
        &path,
        "[units]\nsanitize = false\n\n[file]\nformat = \"weave\"\nvalidate_on_close = true\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert!(!config.units().sanitize());
    assert_eq!(config.file().format(), "weave");
    assert!(config.file().validate_on_close());

    let file = File::create(config).unwrap();
    assert_eq!(file.format().unwrap(), "weave");
    file.close().unwrap();
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let err = load_config(dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFile);
}

#[test]
fn test_malformed_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[file\nformat = ").unwrap();

    let err = load_config(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFile);
}

#[test]
fn test_unit_sanitizing_follows_config() {
    let strict = Config::from_toml_str("[units]\nsanitize = false\n").unwrap();
    let file = File::create(strict).unwrap();
    let block = file.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array(
            "lfp",
            "signal",
            NdBuffer::vector(vec![0.0, 1.0]),
            vec![SetDimension::new(["a", "b"]).into()],
        )
        .unwrap();

    let err = array.set_unit(Some(" mV ")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUnit);

    let lenient = File::create(Config::default()).unwrap();
    let block = lenient.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array(
            "lfp",
            "signal",
            NdBuffer::vector(vec![0.0, 1.0]),
            vec![SetDimension::new(["a", "b"]).into()],
        )
        .unwrap();
    array.set_unit(Some(" mV ")).unwrap();
    assert_eq!(array.unit().unwrap().as_deref(), Some("mV"));
}

#[test]
fn test_validate_clean_file() {
    let file = File::create(Config::default()).unwrap();
    let block = file.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array(
            "lfp",
            "signal",
            NdBuffer::vector(vec![0.0, 1.0]),
            vec![SetDimension::new(["a", "b"]).into()],
        )
        .unwrap();
    let tag = block.create_tag("stimulus", "event", vec![1.0]).unwrap();
    tag.add_reference(&array).unwrap();

    let report = file.validate().unwrap();
    assert!(report.is_ok(), "unexpected issues: {:?}", report.issues());
}

#[test]
fn test_validate_reports_label_mismatch() {
    let file = File::create(Config::default()).unwrap();
    let block = file.create_block("session", "recording").unwrap();
    let array = block
        .create_data_array(
            "lfp",
            "signal",
            NdBuffer::vector(vec![0.0, 1.0]),
            vec![SetDimension::new(["a", "b"]).into()],
        )
        .unwrap();

    // Growing the axis leaves the labels behind
    array.append(&NdBuffer::vector(vec![2.0]), 0).unwrap();

    let report = file.validate().unwrap();
    assert!(report.is_ok());
    assert_eq!(report.warnings().count(), 1);
    assert_eq!(report.errors().count(), 0);
}

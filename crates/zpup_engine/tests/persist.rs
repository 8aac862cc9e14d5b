use std::fs;

use tempfile::TempDir;
use zpup_engine::{ensure_output_dir, AtomicFileWriter, PersistError};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("reports").join("daily");
    assert!(!nested.exists());
    ensure_output_dir(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn output_dir_that_is_a_file_is_refused() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("taken");
    fs::write(&file, "x").unwrap();
    assert!(matches!(
        ensure_output_dir(&file),
        Err(PersistError::OutputDir(_))
    ));
}

#[test]
fn report_write_replaces_previous_content() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("out").join("report.ron"));

    let first = writer.write(b"(uploaded: {})").unwrap().to_path_buf();
    assert_eq!(fs::read_to_string(&first).unwrap(), "(uploaded: {})");

    let second = writer.write(b"(uploaded: {\"a\": \"b\"})").unwrap();
    assert_eq!(first, second);
    assert_eq!(
        fs::read_to_string(second).unwrap(),
        "(uploaded: {\"a\": \"b\"})"
    );

    let leftovers: Vec<_> = fs::read_dir(temp.path().join("out"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec!["report.ron"]);
}

#[test]
fn no_partial_file_when_parent_is_not_a_directory() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let writer = AtomicFileWriter::new(blocker.join("report.json"));
    assert!(writer.write(b"{}").is_err());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}

#[test]
fn target_without_file_name_is_rejected() {
    let writer = AtomicFileWriter::new("/".into());
    assert!(matches!(
        writer.write(b"{}"),
        Err(PersistError::InvalidTarget(_))
    ));
}

use std::fs;

use tempfile::TempDir;
use vidjob_engine::{ensure_output_dir, AtomicFileWriter, PersistError};

fn entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("output").join("videos");
    assert!(!nested.exists());
    ensure_output_dir(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("output");
    fs::write(&file_path, "x").unwrap();

    let err = ensure_output_dir(&file_path).unwrap_err();
    assert!(matches!(err, PersistError::OutputDir(_)));
}

#[test]
fn write_replaces_earlier_artifact() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("processed_abc.mp4", b"first").unwrap();
    assert_eq!(first, temp.path().join("processed_abc.mp4"));
    assert_eq!(fs::read(&first).unwrap(), b"first");

    let second = writer.write("processed_abc.mp4", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"second");
    assert_eq!(entries(temp.path()), vec!["processed_abc.mp4".to_string()]);
}

#[test]
fn path_like_names_are_refused() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    for name in ["", ".", "..", "../escape.mp4", "a/b.mp4", "a\\b.mp4"] {
        let err = writer.write(name, b"data").unwrap_err();
        assert!(matches!(err, PersistError::FileName(_)), "{name:?}");
    }
    assert!(entries(temp.path()).is_empty());
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("processed_abc.mp4", b"data");
    assert!(result.is_err());
    assert_eq!(entries(temp.path()), vec!["not_a_dir".to_string()]);
}

//! Tests for the CSV file sink

use std::fs;

use msgsync::sink::{CsvSink, SinkRow, TabularSink};
use msgsync::{Record, SyncError};
use tempfile::TempDir;

use super::row;

#[test]
fn test_replace_overwrites_previous_contents() {
    let temp = TempDir::new().unwrap();
    let sink = CsvSink::new(temp.path().join("results.csv"));

    sink.replace(&[row("a", "first", ""), row("b", "first", "")]).unwrap();
    sink.replace(&[row("b", "second", "pic")]).unwrap();

    let contents = fs::read_to_string(sink.path()).unwrap();
    assert_eq!(contents, "b,author b,second,1,pic\n");
    assert_eq!(sink.load().unwrap(), vec![row("b", "second", "pic")]);
}

#[test]
fn test_replace_with_no_rows_empties_file() {
    let temp = TempDir::new().unwrap();
    let sink = CsvSink::new(temp.path().join("results.csv"));

    sink.replace(&[row("a", "m", "")]).unwrap();
    sink.replace(&[]).unwrap();

    assert_eq!(fs::read_to_string(sink.path()).unwrap(), "");
    assert!(sink.load().unwrap().is_empty());
}

#[test]
fn test_message_with_commas_survives_reload() {
    let temp = TempDir::new().unwrap();
    let sink = CsvSink::new(temp.path().join("results.csv"));
    let rows = vec![row("a", "one, two, three", "img")];

    sink.replace(&rows).unwrap();

    assert_eq!(sink.load().unwrap(), rows);
}

#[test]
fn test_load_skips_blank_lines() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("results.csv");
    fs::write(&path, "a,author a,m,1,\n\nb,author b,m,2,img\n").unwrap();

    let rows = CsvSink::new(&path).load().unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].likes, 2);
    assert_eq!(rows[1].image, "img");
}

#[test]
fn test_load_rejects_malformed_row() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("results.csv");
    fs::write(&path, "not a row\n").unwrap();

    assert!(matches!(
        CsvSink::new(&path).load(),
        Err(SyncError::Storage(_))
    ));
}

#[test]
fn test_failed_replace_keeps_previous_contents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("results.csv");
    let sink = CsvSink::new(&path);
    sink.replace(&[row("a", "kept", "")]).unwrap();

    // A directory in place of the tmp file makes the write fail
    fs::create_dir(temp.path().join("results.csv.tmp")).unwrap();
    let result = sink.replace(&[row("b", "lost", "")]);

    assert!(matches!(result, Err(SyncError::SinkWrite(_))));
    assert_eq!(sink.load().unwrap(), vec![row("a", "kept", "")]);
}

#[test]
fn test_record_projection() {
    let record = Record::new("x", "bob", "hi", 3, None);
    let line = SinkRow::from(&record).to_line();

    assert_eq!(line, "x,bob,hi,3,");
    assert_eq!(SinkRow::parse(&line).unwrap().into_record(), record);
}

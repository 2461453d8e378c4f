//! Integration tests for CSV loading and the stratified train/test split.

use std::io::Write;

use healthrisk_classifiers::data_handling::{load_data, split_data, Column, Frame, ID_COLUMN};
use healthrisk_classifiers::ErrorKind;

fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

fn labelled_frame(n: usize, positive_every: usize) -> Frame {
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| if i % positive_every == 0 { 1.0 } else { 0.0 })
        .collect();
    Frame::new(vec![
        Column::numeric("x", x),
        Column::numeric("disease_risk", y),
    ])
    .unwrap()
}

fn positive_rate(y: &[i32]) -> f64 {
    y.iter().filter(|&&v| v == 1).count() as f64 / y.len() as f64
}

// ---------------------------------------------------------------------------
// load_data
// ---------------------------------------------------------------------------

#[test]
fn load_drops_id_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "health.csv",
        "id,age,gender,disease_risk\n\
         1,40,Male,0\n\
         2,40,Male,0\n\
         3,55,Female,1\n\
         4,61,Female,1\n\
         5,55,Female,1\n",
    );
    let df = load_data(&path).unwrap();
    assert!(!df.contains_column(ID_COLUMN));
    // rows 2 and 5 only differ from earlier rows by id
    assert_eq!(df.n_rows(), 3);
    assert_eq!(df.column_names(), vec!["age", "gender", "disease_risk"]);
    assert!(df.column("gender").map(|c| !c.is_numeric()).unwrap());
}

#[test]
fn load_missing_file_yields_empty_frame() {
    let dir = tempfile::tempdir().unwrap();
    let df = load_data(dir.path().join("nope.csv")).unwrap();
    assert!(df.is_empty());
}

#[test]
fn load_without_id_column_keeps_all_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "plain.csv", "a,b\n1,2\n3,4\n");
    let df = load_data(&path).unwrap();
    assert_eq!(df.n_cols(), 2);
    assert_eq!(df.n_rows(), 2);
}

// ---------------------------------------------------------------------------
// split_data
// ---------------------------------------------------------------------------

#[test]
fn split_is_stratified_within_two_points() {
    for (n, every) in [(500, 4), (997, 3), (1200, 10)] {
        let df = labelled_frame(n, every);
        let split = split_data(&df, "disease_risk", 0.2, 42).unwrap();
        let source = (0..n).filter(|i| i % every == 0).count() as f64 / n as f64;
        assert!((positive_rate(&split.y_train) - source).abs() < 0.02);
        assert!((positive_rate(&split.y_test) - source).abs() < 0.02);
        assert_eq!(split.y_train.len() + split.y_test.len(), n);
        assert!(!split.x_train.contains_column("disease_risk"));
    }
}

#[test]
fn split_partitions_are_disjoint_and_sized() {
    let df = labelled_frame(250, 5);
    let split = split_data(&df, "disease_risk", 0.2, 42).unwrap();
    assert_eq!(split.x_test.n_rows(), 50);
    assert_eq!(split.x_train.n_rows(), 200);

    let mut ids: Vec<f64> = split.x_train.numeric("x").unwrap().to_vec();
    ids.extend_from_slice(split.x_test.numeric("x").unwrap());
    ids.sort_by(f64::total_cmp);
    ids.dedup();
    assert_eq!(ids.len(), 250);
}

#[test]
fn split_is_deterministic_for_a_seed() {
    let df = labelled_frame(300, 4);
    let a = split_data(&df, "disease_risk", 0.2, 42).unwrap();
    let b = split_data(&df, "disease_risk", 0.2, 42).unwrap();
    assert_eq!(a.x_test, b.x_test);
    assert_eq!(a.y_train, b.y_train);

    let c = split_data(&df, "disease_risk", 0.2, 7).unwrap();
    assert_ne!(a.x_test, c.x_test);
}

#[test]
fn split_rejects_empty_and_unknown_target() {
    let err = split_data(&Frame::default(), "disease_risk", 0.2, 42).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(err.to_string().contains("DataFrame is empty"));

    let df = labelled_frame(20, 2);
    assert!(split_data(&df, "missing", 0.2, 42).is_err());
    assert!(split_data(&df, "disease_risk", 1.5, 42).is_err());
}

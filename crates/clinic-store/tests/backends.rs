use std::fs;
use std::path::PathBuf;

use clinic_store::{CsvSheetStore, MemorySheetStore, RecordStore, StoreError, TableId};

fn temp_store_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("clinic_store_{stamp}"));
    dir
}

fn cleanup_dir(dir: &PathBuf) {
    let _ = fs::remove_dir_all(dir);
}

fn sample_row(pid: &str) -> Vec<String> {
    vec![
        pid.to_string(),
        "Nguyen Van A".to_string(),
        "2026-01-05 08:00:00".to_string(),
        "NV01".to_string(),
    ]
}

#[test]
fn memory_overwrite_is_compare_and_set() {
    let store = MemorySheetStore::new();
    store
        .append_rows(TableId::Patients, vec![sample_row("P001")])
        .expect("append");

    // Two readers take the same snapshot.
    let first = store.read_all(TableId::Patients).expect("read");
    let second = store.read_all(TableId::Patients).expect("read");
    assert_eq!(first.revision, second.revision);

    // First writer wins.
    store
        .overwrite_all(
            TableId::Patients,
            first.columns.clone(),
            first.rows.clone(),
            &first.revision,
        )
        .expect("first overwrite");

    // Second writer holds a stale revision and must fail.
    let err = store
        .overwrite_all(
            TableId::Patients,
            second.columns.clone(),
            second.rows.clone(),
            &second.revision,
        )
        .expect_err("stale overwrite must fail");
    assert!(matches!(err, StoreError::RevisionMismatch { .. }));
    assert!(err.is_retryable());
}

#[test]
fn memory_append_invalidates_held_snapshots() {
    let store = MemorySheetStore::new();
    let snapshot = store.read_all(TableId::Patients).expect("read");

    store
        .append_rows(TableId::Patients, vec![sample_row("P001")])
        .expect("append");

    let err = store
        .overwrite_all(
            TableId::Patients,
            snapshot.columns.clone(),
            snapshot.rows.clone(),
            &snapshot.revision,
        )
        .expect_err("append must bump the revision");
    assert!(matches!(err, StoreError::RevisionMismatch { .. }));
}

#[test]
fn memory_clones_share_state() {
    let store = MemorySheetStore::new();
    let other = store.clone();
    store
        .append_rows(TableId::Sessions, vec![vec!["1".to_string()]])
        .expect("append");
    let snapshot = other.read_all(TableId::Sessions).expect("read");
    assert_eq!(snapshot.rows.len(), 1);
}

#[test]
fn csv_store_round_trip() {
    let dir = temp_store_dir();
    let store = CsvSheetStore::open(&dir).expect("open store");

    let snapshot = store.read_all(TableId::Patients).expect("read");
    assert_eq!(snapshot.columns.len(), clinic_store::PATIENT_COLUMNS.len());
    assert!(snapshot.rows.is_empty());

    store
        .append_rows(TableId::Patients, vec![sample_row("P001"), sample_row("P002")])
        .expect("append");
    let snapshot = store.read_all(TableId::Patients).expect("read");
    assert_eq!(snapshot.rows.len(), 2);
    assert_eq!(snapshot.rows[0][0], "P001");

    cleanup_dir(&dir);
}

#[test]
fn csv_store_overwrite_is_compare_and_set() {
    let dir = temp_store_dir();
    let store = CsvSheetStore::open(&dir).expect("open store");
    store
        .append_rows(TableId::Patients, vec![sample_row("P001")])
        .expect("append");

    let stale = store.read_all(TableId::Patients).expect("read");
    store
        .append_rows(TableId::Patients, vec![sample_row("P002")])
        .expect("append");

    let err = store
        .overwrite_all(
            TableId::Patients,
            stale.columns.clone(),
            stale.rows.clone(),
            &stale.revision,
        )
        .expect_err("stale overwrite must fail");
    assert!(matches!(err, StoreError::RevisionMismatch { .. }));

    // A fresh read succeeds and yields a new revision.
    let fresh = store.read_all(TableId::Patients).expect("read");
    let new_rev = store
        .overwrite_all(
            TableId::Patients,
            fresh.columns.clone(),
            fresh.rows.clone(),
            &fresh.revision,
        )
        .expect("fresh overwrite");
    assert_ne!(new_rev, stale.revision);

    cleanup_dir(&dir);
}

#[test]
fn csv_store_reopen_preserves_rows() {
    let dir = temp_store_dir();
    {
        let store = CsvSheetStore::open(&dir).expect("open store");
        store
            .append_rows(TableId::Patients, vec![sample_row("P001")])
            .expect("append");
    }
    let store = CsvSheetStore::open(&dir).expect("reopen store");
    let snapshot = store.read_all(TableId::Patients).expect("read");
    assert_eq!(snapshot.rows.len(), 1);

    cleanup_dir(&dir);
}

#[test]
fn csv_store_tolerates_short_rows_on_disk() {
    let dir = temp_store_dir();
    let store = CsvSheetStore::open(&dir).expect("open store");
    // A manually edited sheet often drops trailing cells entirely.
    store
        .append_rows(TableId::Patients, vec![vec!["P001".to_string()]])
        .expect("append short row");
    let snapshot = store.read_all(TableId::Patients).expect("read");
    assert_eq!(snapshot.cell(&snapshot.rows[0], 0), "P001");
    assert_eq!(snapshot.cell(&snapshot.rows[0], 5), "");

    cleanup_dir(&dir);
}

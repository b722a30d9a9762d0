//! Table-file store: staged overwrite commits and freshness waiting.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use grid_sync_core::config::SyncConfig;
use grid_sync_core::session::SessionError;
use grid_sync_core::store::FileTable;
use grid_sync_core::{ChangeSet, ConsistencyWaiter, EditSession, IdAssignment, RowStore, Value};

use super::helpers::{name, product_rows_with_ids};

#[test]
fn test_session_on_table_file_assigns_client_ids() {
    let dir = tempdir().unwrap();
    let table = FileTable::open(dir.path().join("Tables/product.json"), "id");
    table.init(product_rows_with_ids(&[1, 2, 3])).unwrap();

    let mut session = EditSession::open(table, &SyncConfig::default()).unwrap();
    let report = session
        .submit(
            ChangeSet::new()
                .edit(0, name("Alice"))
                .delete(2)
                .add(name("Dana"))
                .add(name("Eve")),
        )
        .unwrap();
    assert_eq!(report.total(), 4);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.len(), 4);
    assert_eq!(
        snapshot.get(0).and_then(|r| r.get("name")),
        Some(&Value::from("Alice"))
    );

    // New rows got distinct identifiers that avoid the existing ones
    let new_ids: Vec<i64> = snapshot.rows()[2..]
        .iter()
        .map(|r| r.get("id").and_then(Value::as_i64).unwrap())
        .collect();
    assert_eq!(new_ids.len(), 2);
    assert_ne!(new_ids[0], new_ids[1]);
    for id in new_ids {
        assert!(![1, 2, 3].contains(&id));
        assert!((1..i32::MAX as i64).contains(&id));
    }
    assert_eq!(session.store().version().unwrap(), 2);
}

#[test]
fn test_failed_commit_is_all_or_nothing() {
    let dir = tempdir().unwrap();
    let table = FileTable::open(dir.path().join("product.json"), "id")
        .with_id_assignment(IdAssignment::Sequential);
    table.init(product_rows_with_ids(&[1, 2, 3])).unwrap();
    let mut session = EditSession::open(table.clone(), &SyncConfig::default()).unwrap();

    // Someone else rewrites the table between render and submit
    table.init(product_rows_with_ids(&[1, 2])).unwrap();

    let err = session
        .submit(ChangeSet::new().delete(0).delete(2))
        .unwrap_err();
    match err {
        SessionError::Batch(failure) => {
            assert_eq!(failure.applied, 0);
            assert_eq!(failure.index, Some(1));
        }
        other => panic!("Expected Batch failure, got {:?}", other),
    }

    // Nothing from the batch landed; session now shows the rewritten table
    assert_eq!(table.read().unwrap().len(), 2);
    assert_eq!(session.snapshot().len(), 2);
}

#[test]
fn test_waiter_sees_commit_from_another_writer() {
    let dir = tempdir().unwrap();
    let table = Arc::new(FileTable::open(dir.path().join("product.json"), "id"));
    table.init(product_rows_with_ids(&[1, 2, 3])).unwrap();

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            let mut session = EditSession::open(table, &SyncConfig::default()).unwrap();
            session.submit(ChangeSet::new().delete(1)).unwrap();
        })
    };

    let waiter = ConsistencyWaiter::new(Duration::from_secs(5), Duration::from_millis(25));
    let changed = waiter.wait(|| table.version()).unwrap();
    writer.join().unwrap();

    assert!(changed);
    assert_eq!(table.read().unwrap().len(), 2);
}

#[test]
fn test_waiter_surfaces_signal_read_errors() {
    let dir = tempdir().unwrap();
    let table = FileTable::open(dir.path().join("product.json"), "id");
    table.init(product_rows_with_ids(&[1])).unwrap();

    let remover = {
        let table = table.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            table.remove().unwrap();
        })
    };

    let waiter = ConsistencyWaiter::new(Duration::from_secs(5), Duration::from_millis(25));
    let result = waiter.wait(|| table.version());
    remover.join().unwrap();

    assert!(result.is_err());
}

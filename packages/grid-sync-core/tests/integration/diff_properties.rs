//! Change-set properties checked end to end against a memory table.

use std::collections::HashSet;

use grid_sync_core::config::SyncConfig;
use grid_sync_core::error::ApplyError;
use grid_sync_core::{
    ChangeSet, DiffApplier, EditSession, IdAssignment, Mutation, Record, RowStore, Value,
};

use super::helpers::{name, product_snapshot, product_table};

#[test]
fn test_documented_order_example() {
    let snapshot = product_snapshot(&[101, 102, 103]);
    let changes = ChangeSet::new()
        .edit(1, name("X"))
        .delete(0)
        .add(name("Y"));

    let batch = DiffApplier::new().apply(&snapshot, changes).unwrap();

    assert_eq!(
        batch.as_slice(),
        &[
            Mutation::Update {
                id: Value::Int(102),
                fields: name("X"),
            },
            Mutation::Delete {
                id: Value::Int(101)
            },
            Mutation::Insert { fields: name("Y") },
        ]
    );
}

#[test]
fn test_deleted_ids_never_updated_or_inserted() {
    let snapshot = product_snapshot(&[1, 2, 3]);
    let changes = ChangeSet::new()
        .edit(0, name("edited and deleted"))
        .edit(2, name("kept"))
        .delete(0)
        .delete(1)
        .add(name("new"));

    let applier = DiffApplier::new().with_id_assignment(IdAssignment::Sequential);
    let batch = applier.apply(&snapshot, changes).unwrap();

    let deleted: HashSet<i64> = batch
        .iter()
        .filter_map(|m| match m {
            Mutation::Delete { id } => id.as_i64(),
            _ => None,
        })
        .collect();
    assert_eq!(deleted, HashSet::from([1, 2]));

    for mutation in batch.iter() {
        let touched = match mutation {
            Mutation::Update { id, .. } => id.as_i64(),
            Mutation::Insert { fields } => fields.get("id").and_then(Value::as_i64),
            Mutation::Delete { .. } => None,
        };
        if let Some(id) = touched {
            assert!(!deleted.contains(&id), "{:?} touches deleted id {}", mutation, id);
        }
    }
}

#[test]
fn test_inserted_ids_unique_across_batch() {
    let snapshot = product_snapshot(&[1, 2, 3]);
    let changes = (0..50).fold(ChangeSet::new(), |changes, i| {
        changes.add(name(&format!("bulk {}", i)))
    });

    let config = SyncConfig {
        random_id_low: 1,
        random_id_high: 200,
        ..Default::default()
    };
    let applier = DiffApplier::new().with_id_assignment(IdAssignment::random(&config));
    let batch = applier.apply(&snapshot, changes).unwrap();

    let mut seen: HashSet<i64> = HashSet::from([1, 2, 3]);
    for mutation in batch.iter() {
        match mutation {
            Mutation::Insert { fields } => {
                let id = fields.get("id").and_then(Value::as_i64).unwrap();
                assert!(seen.insert(id), "identifier {} reused", id);
            }
            other => panic!("Expected Insert, got {:?}", other),
        }
    }
    assert_eq!(seen.len(), 53);
}

#[test]
fn test_out_of_range_leaves_store_untouched() {
    let mut session = EditSession::open(product_table(), &SyncConfig::default()).unwrap();
    let err = session
        .submit(ChangeSet::new().edit(0, name("X")).delete(3))
        .unwrap_err();

    assert!(err.to_string().contains("out of range"));
    assert_eq!(session.store().version(), 0);
    assert_eq!(
        session.snapshot().get(0).and_then(|r| r.get("name")),
        Some(&Value::from("Product A"))
    );
}

#[test]
fn test_editor_payload_round_trip_through_session() {
    let mut session = EditSession::open(product_table(), &SyncConfig::default()).unwrap();
    let payload = r#"{
        "edited_rows": {"2": {"category": "Category 9"}},
        "added_rows": [{"name": "Product D", "category": "Category 4"}],
        "deleted_rows": [1]
    }"#;
    let changes: ChangeSet = serde_json::from_str(payload).unwrap();

    let report = session.submit(changes).unwrap();
    assert_eq!((report.updated, report.deleted, report.inserted), (1, 1, 1));

    let rows: Vec<(Value, Value)> = session
        .snapshot()
        .rows()
        .iter()
        .map(|r| (r.get("id").cloned().unwrap(), r.get("category").cloned().unwrap()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (Value::Int(1), Value::from("Category 1")),
            (Value::Int(3), Value::from("Category 9")),
            (Value::Int(4), Value::from("Category 4")),
        ]
    );
}

#[test]
fn test_identifier_edit_rejected_by_session() {
    let mut session = EditSession::open(product_table(), &SyncConfig::default()).unwrap();
    let edit = Record::from_iter([("id", 42)]);
    let err = session.submit(ChangeSet::new().edit(0, edit)).unwrap_err();
    assert!(err.to_string().contains("identifier column 'id'"));

    let applier = DiffApplier::new();
    let snapshot = session.store().read().unwrap();
    assert_eq!(
        applier.apply(&snapshot, ChangeSet::new().edit(0, Record::from_iter([("id", 42)]))),
        Err(ApplyError::IdentifierEdited {
            position: 0,
            column: "id".to_string()
        })
    );
}

//! SQL store driven by a client that replays statements onto a memory table.

use std::sync::Mutex;

use grid_sync_core::config::SyncConfig;
use grid_sync_core::error::StoreError;
use grid_sync_core::sql::{Statement, TableName};
use grid_sync_core::store::{MemoryTable, SqlClient, SqlTable};
use grid_sync_core::{ChangeSet, EditSession, Mutation, Record, RowStore, Value};

use super::helpers::{name, product_table};

/// Interprets the statements `SqlTable` emits against a memory table, and
/// keeps the log for inspection.
struct ReplayClient {
    table: MemoryTable,
    log: Mutex<Vec<Statement>>,
}

impl ReplayClient {
    fn new(table: MemoryTable) -> Self {
        Self {
            table,
            log: Mutex::new(Vec::new()),
        }
    }

    fn columns(sql: &str) -> Vec<String> {
        let open = sql.find('(').unwrap();
        let close = sql.find(')').unwrap();
        sql[open + 1..close]
            .split(", ")
            .map(|c| c.trim_matches(|ch| ch == '[' || ch == ']').to_string())
            .collect()
    }
}

impl SqlClient for ReplayClient {
    type Error = StoreError;

    fn query(&self, statement: &Statement) -> Result<Vec<Record>, StoreError> {
        self.log.lock().unwrap().push(statement.clone());
        Ok(self.table.read()?.into_rows())
    }

    fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        self.log.lock().unwrap().push(statement.clone());
        let sql = statement.sql.as_str();
        let params = &statement.params;

        let mutation = if sql.starts_with("INSERT") {
            let fields = Self::columns(sql).into_iter().zip(params.iter().cloned()).collect();
            Mutation::Insert { fields }
        } else if sql.starts_with("DELETE") {
            Mutation::Delete {
                id: params[0].clone(),
            }
        } else {
            let set = &sql[sql.find(" SET ").unwrap() + 5..sql.find(" WHERE ").unwrap()];
            let columns = set
                .split(", ")
                .map(|assignment| assignment.split(" = ").next().unwrap())
                .map(|c| c.trim_matches(|ch| ch == '[' || ch == ']').to_string());
            let fields = columns.zip(params.iter().cloned()).collect();
            Mutation::Update {
                id: params.last().cloned().unwrap(),
                fields,
            }
        };
        self.table.apply(&mutation)?;
        Ok(1)
    }
}

#[test]
fn test_sql_session_applies_parameterized_statements() {
    let client = ReplayClient::new(product_table());
    let store = SqlTable::new(client, TableName::new("dbo", "product"), "id")
        .with_columns(["id", "name", "category"]);
    let mut session = EditSession::open(store, &SyncConfig::default()).unwrap();

    let hostile = "Robert'); DROP TABLE dbo.product; --";
    let report = session
        .submit(
            ChangeSet::new()
                .edit(1, name(hostile))
                .delete(0)
                .add(name("Product D")),
        )
        .unwrap();
    assert_eq!(report.total(), 3);

    let log = session.store().client().log.lock().unwrap();
    let executed: Vec<&Statement> = log
        .iter()
        .filter(|s| !s.sql.starts_with("SELECT"))
        .collect();
    assert_eq!(executed.len(), 3);
    assert_eq!(
        executed[0].sql,
        "UPDATE [dbo].[product] SET [name] = ? WHERE [id] = ?"
    );
    assert_eq!(executed[0].params, vec![Value::from(hostile), Value::Int(2)]);
    assert!(log.iter().all(|s| !s.sql.contains("DROP")));

    assert_eq!(log[0].sql, "SELECT [id], [name], [category] FROM [dbo].[product]");
    drop(log);

    let names: Vec<&Value> = session
        .snapshot()
        .rows()
        .iter()
        .filter_map(|r| r.get("name"))
        .collect();
    assert_eq!(
        names,
        vec![
            &Value::from(hostile),
            &Value::from("Product C"),
            &Value::from("Product D"),
        ]
    );
}

#[test]
fn test_sql_store_error_is_store_error_unchanged() {
    let client = ReplayClient::new(product_table());
    let store = SqlTable::new(client, TableName::new("dbo", "product"), "id");

    let err = store
        .apply(&Mutation::Delete { id: Value::Int(99) })
        .unwrap_err();
    assert!(matches!(err, StoreError::RowNotFound { .. }));
}

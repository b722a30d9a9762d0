//! SQL table accessed through a caller-supplied client.

use crate::diff::{IdAssignment, Mutation};
use crate::sql::{Placeholder, Statement, StatementBuilder, TableName};
use crate::table::{Record, Snapshot, Value};

use super::RowStore;

/// Minimal SQL client: run a parameterized query or command.
///
/// Connection setup and credentials belong to the implementor; build the
/// client once and hand it to `SqlTable`.
pub trait SqlClient {
    /// Driver error type, passed through unchanged.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs a query and returns its rows.
    fn query(&self, statement: &Statement) -> Result<Vec<Record>, Self::Error>;

    /// Runs a command and returns the affected row count.
    fn execute(&self, statement: &Statement) -> Result<u64, Self::Error>;
}

/// Row store over one SQL table.
///
/// Each mutation runs as its own statement; whether the batch is wrapped in
/// a transaction is up to the client.
///
/// Unlike the memory and file stores, an update or delete whose row is gone
/// is not an error: the statement affects no rows, a warning is logged and
/// the mutation still counts as applied (last write wins).
#[derive(Debug)]
pub struct SqlTable<C> {
    client: C,
    statements: StatementBuilder,
    columns: Vec<String>,
    ids: IdAssignment,
}

impl<C: SqlClient> SqlTable<C> {
    /// Creates a store for `table`, with identity-assigned identifiers.
    pub fn new(client: C, table: TableName, id_column: impl Into<String>) -> Self {
        Self {
            client,
            statements: StatementBuilder::new(table, id_column),
            columns: Vec::new(),
            ids: IdAssignment::StoreAssigned,
        }
    }

    /// Restricts reads to these columns (default: all).
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.statements = self.statements.with_placeholder(placeholder);
        self
    }

    /// For tables without an identity column (e.g. warehouse tables).
    pub fn with_id_assignment(mut self, ids: IdAssignment) -> Self {
        self.ids = ids;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn statements(&self) -> &StatementBuilder {
        &self.statements
    }

    /// Returns `true` if the table is listed in `INFORMATION_SCHEMA.TABLES`.
    pub fn exists(&self) -> Result<bool, C::Error> {
        let rows = self.client.query(&self.statements.table_exists())?;
        Ok(!rows.is_empty())
    }

    /// Reads the table's last modification time, `Value::Null` if unknown.
    pub fn last_modified(&self) -> Result<Value, C::Error> {
        let rows = self.client.query(&self.statements.last_modified())?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove("modify_date"))
            .unwrap_or_default())
    }
}

impl<C: SqlClient> RowStore for SqlTable<C> {
    type Error = C::Error;

    fn read(&self) -> Result<Snapshot, C::Error> {
        let rows = self
            .client
            .query(&self.statements.select_all(&self.columns))?;
        Ok(Snapshot::new(self.statements.id_column(), rows))
    }

    fn apply(&self, mutation: &Mutation) -> Result<(), C::Error> {
        if let Mutation::Update { fields, .. } = mutation {
            if fields.is_empty() {
                return Ok(());
            }
        }

        let statement = self.statements.for_mutation(mutation);
        let affected = self.client.execute(&statement)?;
        if affected == 0 && !matches!(mutation, Mutation::Insert { .. }) {
            tracing::warn!(
                table = %self.statements.table(),
                op = mutation.kind(),
                id = ?mutation.id(),
                "Statement affected no rows"
            );
        }
        Ok(())
    }

    fn id_assignment(&self) -> IdAssignment {
        self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::MutationBatch;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("driver error: {0}")]
    struct DriverError(String);

    /// Records statements and answers queries with canned rows.
    #[derive(Default)]
    struct RecordingClient {
        executed: Mutex<Vec<Statement>>,
        rows: Vec<Record>,
        fail_on: Option<usize>,
    }

    impl SqlClient for RecordingClient {
        type Error = DriverError;

        fn query(&self, _statement: &Statement) -> Result<Vec<Record>, DriverError> {
            Ok(self.rows.clone())
        }

        fn execute(&self, statement: &Statement) -> Result<u64, DriverError> {
            let mut executed = self.executed.lock().unwrap();
            if self.fail_on == Some(executed.len()) {
                return Err(DriverError("deadlock victim".to_string()));
            }
            executed.push(statement.clone());
            Ok(1)
        }
    }

    fn table(client: RecordingClient) -> SqlTable<RecordingClient> {
        SqlTable::new(client, TableName::new("dbo", "product"), "id")
            .with_columns(["id", "name", "category"])
    }

    #[test]
    fn test_read_builds_snapshot() {
        let client = RecordingClient {
            rows: vec![Record::from_iter([("id", 1), ("name", 2)])],
            ..Default::default()
        };
        let snapshot = table(client).read().unwrap();
        assert_eq!(snapshot.id_column(), "id");
        assert_eq!(snapshot.identifier_at(0).unwrap(), &Value::Int(1));
    }

    #[test]
    fn test_batch_runs_one_statement_per_mutation() {
        let store = table(RecordingClient::default());
        let batch = MutationBatch::from(vec![
            Mutation::Update {
                id: Value::Int(2),
                fields: Record::from_iter([("name", "X")]),
            },
            Mutation::Delete { id: Value::Int(1) },
            Mutation::Insert {
                fields: Record::from_iter([("name", "Y")]),
            },
        ]);

        let report = store.execute_batch(&batch).unwrap();
        assert_eq!(report.total(), 3);

        let executed = store.client().executed.lock().unwrap();
        let sql: Vec<&str> = executed.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "UPDATE [dbo].[product] SET [name] = ? WHERE [id] = ?",
                "DELETE FROM [dbo].[product] WHERE [id] = ?",
                "INSERT INTO [dbo].[product] ([name]) VALUES (?)",
            ]
        );
    }

    #[test]
    fn test_empty_update_is_skipped_and_not_counted() {
        let store = table(RecordingClient::default());
        let batch = MutationBatch::from(vec![
            Mutation::Update {
                id: Value::Int(2),
                fields: Record::new(),
            },
            Mutation::Delete { id: Value::Int(1) },
        ]);

        let report = store.execute_batch(&batch).unwrap();
        assert_eq!(report.updated, 0);
        assert_eq!(report.deleted, 1);
        assert_eq!(store.client().executed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_driver_error_passes_through() {
        let store = table(RecordingClient {
            fail_on: Some(1),
            ..Default::default()
        });
        let batch = MutationBatch::from(vec![
            Mutation::Delete { id: Value::Int(1) },
            Mutation::Delete { id: Value::Int(2) },
            Mutation::Delete { id: Value::Int(3) },
        ]);

        let failure = store.execute_batch(&batch).unwrap_err();
        assert_eq!(failure.applied, 1);
        assert_eq!(failure.index, Some(1));
        assert_eq!(failure.source.to_string(), "driver error: deadlock victim");
        assert_eq!(store.client().executed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_last_modified_reads_first_row() {
        let client = RecordingClient {
            rows: vec![Record::from_iter([("modify_date", "2024-07-24 10:00:00")])],
            ..Default::default()
        };
        let store = table(client);
        assert_eq!(
            store.last_modified().unwrap(),
            Value::from("2024-07-24 10:00:00")
        );
        assert!(store.exists().unwrap());

        let empty = table(RecordingClient::default());
        assert_eq!(empty.last_modified().unwrap(), Value::Null);
        assert!(!empty.exists().unwrap());
    }
}

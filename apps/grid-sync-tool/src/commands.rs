//! Command implementations. Each returns its output instead of printing so
//! it can be tested.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use grid_sync_core::config::SyncConfig;
use grid_sync_core::sql::{Placeholder, Statement, StatementBuilder, TableName};
use grid_sync_core::store::FileTable;
use grid_sync_core::{
    BatchReport, ChangeSet, ConsistencyWaiter, DiffApplier, EditSession, IdAssignment,
    MutationBatch, Record, Snapshot, Value,
};

use crate::cli::IdStrategy;

/// Loads the sync configuration, falling back to defaults.
pub fn load_config(path: Option<&Path>, id_column: Option<String>) -> Result<SyncConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => SyncConfig::default(),
    };
    if let Some(id_column) = id_column {
        config.id_column = id_column;
    }
    Ok(config)
}

fn read_change_set(path: &Path) -> Result<ChangeSet> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read change-set {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid change-set {}", path.display()))
}

fn read_snapshot(path: &Path, config: &SyncConfig) -> Result<Snapshot> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let rows: Vec<Record> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid snapshot {}", path.display()))?;
    Ok(Snapshot::new(config.id_column.clone(), rows))
}

fn id_assignment(strategy: IdStrategy, config: &SyncConfig) -> IdAssignment {
    match strategy {
        IdStrategy::Store => IdAssignment::StoreAssigned,
        IdStrategy::Random => IdAssignment::random(config),
        IdStrategy::Sequential => IdAssignment::Sequential,
    }
}

/// Diffs `changes` against `snapshot` into a mutation batch.
pub fn plan(
    snapshot: &Path,
    changes: &Path,
    ids: IdStrategy,
    config: &SyncConfig,
) -> Result<MutationBatch> {
    let snapshot = read_snapshot(snapshot, config)?;
    let changes = read_change_set(changes)?;
    let applier = DiffApplier::new().with_id_assignment(id_assignment(ids, config));
    Ok(applier.apply(&snapshot, changes)?)
}

/// Renders a batch as parameterized statements for `table`.
pub fn plan_sql(
    batch: &MutationBatch,
    table: &str,
    numbered: bool,
    config: &SyncConfig,
) -> Vec<Statement> {
    let placeholder = if numbered {
        Placeholder::Numbered
    } else {
        Placeholder::Question
    };
    StatementBuilder::new(TableName::parse(table), config.id_column.clone())
        .with_placeholder(placeholder)
        .for_batch(batch)
}

fn table_file(path: &Path, config: &SyncConfig) -> FileTable {
    FileTable::open(path, config.id_column.clone())
        .with_id_assignment(IdAssignment::random(config))
}

/// Demo rows for `init`.
pub fn demo_rows(config: &SyncConfig) -> Vec<Record> {
    [(1, "Alice", "car"), (2, "Bob", "book"), (3, "Charlie", "movie")]
        .into_iter()
        .map(|(id, name, category)| {
            Record::from_iter([
                (config.id_column.as_str(), Value::Int(id)),
                ("name", Value::from(name)),
                ("category", Value::from(category)),
            ])
        })
        .collect()
}

pub fn init(path: &Path, config: &SyncConfig) -> Result<()> {
    table_file(path, config)
        .init(demo_rows(config))
        .with_context(|| format!("Failed to initialize {}", path.display()))
}

/// Applies the change-set in `changes` to the table file.
pub fn apply(path: &Path, changes: &Path, config: &SyncConfig) -> Result<BatchReport> {
    let changes = read_change_set(changes)?;
    let mut session = EditSession::open(table_file(path, config), config)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let report = session.submit(changes)?;
    Ok(report)
}

/// Waits for the table file version to change. Returns `false` on timeout.
pub fn wait(path: &Path, config: &SyncConfig) -> Result<bool> {
    let table = table_file(path, config);
    let waiter = ConsistencyWaiter::from_config(config);
    tracing::info!(
        path = %path.display(),
        timeout_ms = config.wait_timeout_ms,
        poll_ms = config.poll_interval_ms,
        "Waiting for table version change"
    );
    Ok(waiter.wait(|| table.version())?)
}

pub fn drop_table(path: &Path, config: &SyncConfig) -> Result<()> {
    Ok(table_file(path, config).remove()?)
}

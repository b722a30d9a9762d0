//! Table file rewritten as a whole on every commit.
//!
//! File layout (JSON):
//! - `format`: layout version (1)
//! - `version`: bumped on every commit, used as a freshness signal
//! - `checksum`: CRC32 of the serialized `rows`
//! - `rows`: records in display order
//!
//! Writes go to a temporary file that is synced and atomically renamed over
//! the table file, so readers see either the old or the new table.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::diff::{IdAssignment, Mutation, MutationBatch};
use crate::error::{PartialBatchFailure, StoreError};
use crate::table::{Record, Snapshot, Value};

use super::{BatchReport, RowStore};

const FORMAT_VERSION: u32 = 1;

/// On-disk table file.
#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    format: u32,
    version: u64,
    checksum: u32,
    rows: Vec<Record>,
}

/// Row store backed by a single table file, overwritten on each commit.
///
/// Has no identity column: inserts must carry a client-assigned identifier.
#[derive(Debug, Clone)]
pub struct FileTable {
    /// Table file path
    path: PathBuf,
    /// Identifier column name
    id_column: String,
    /// Identifier generation expected from the applier
    ids: IdAssignment,
}

impl FileTable {
    /// Opens (without reading) the table file at `path`.
    pub fn open(path: impl Into<PathBuf>, id_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id_column: id_column.into(),
            ids: IdAssignment::Random {
                low: 1,
                high: i32::MAX as i64,
            },
        }
    }

    /// Overrides client-side identifier generation. `StoreAssigned` is not
    /// accepted and falls back to `Sequential`.
    pub fn with_id_assignment(mut self, ids: IdAssignment) -> Self {
        self.ids = match ids {
            IdAssignment::StoreAssigned => IdAssignment::Sequential,
            other => other,
        };
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the table file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Creates or overwrites the table with `rows`.
    ///
    /// An existing file that cannot be parsed or fails its checksum is
    /// overwritten too; its version is carried forward when still readable.
    ///
    /// # Arguments
    /// * `rows` - Rows to write; each must carry an identifier
    ///
    /// # Returns
    /// `Result<(), StoreError>` indicating success or failure.
    pub fn init(&self, rows: Vec<Record>) -> Result<(), StoreError> {
        if let Some(row) = rows
            .iter()
            .find(|row| row.get_non_null(&self.id_column).is_none())
        {
            tracing::debug!(?row, "Seed row without identifier");
            return Err(StoreError::MissingIdentifier {
                table: self.display_name(),
                column: self.id_column.clone(),
            });
        }

        let version = match self.load() {
            Ok(file) => file.version + 1,
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => 1,
            Err(e @ (StoreError::DataCorruption(_) | StoreError::Serialization(_))) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Overwriting unreadable table file: {}",
                    e
                );
                self.raw_version().map_or(1, |v| v + 1)
            }
            Err(e) => return Err(e),
        };
        self.write(rows, version)?;
        tracing::info!(path = %self.path.display(), version, "Table file initialized");
        Ok(())
    }

    /// Deletes the table file. Missing files are not an error.
    pub fn remove(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Table file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("Failed to remove table file")(e)),
        }
    }

    /// Reads the committed version from disk.
    pub fn version(&self) -> Result<u64, StoreError> {
        Ok(self.load()?.version)
    }

    fn display_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn load(&self) -> Result<TableFile, StoreError> {
        let contents =
            fs::read(&self.path).map_err(StoreError::io("Failed to read table file"))?;
        let file: TableFile = serde_json::from_slice(&contents)?;

        if file.format != FORMAT_VERSION {
            return Err(StoreError::DataCorruption(format!(
                "Unsupported table file format {} in {}",
                file.format,
                self.path.display()
            )));
        }

        let actual = rows_checksum(&file.rows)?;
        if actual != file.checksum {
            return Err(StoreError::DataCorruption(format!(
                "Checksum mismatch for {}: expected {:08x}, got {:08x}",
                self.path.display(),
                file.checksum,
                actual
            )));
        }
        Ok(file)
    }

    /// Best-effort read of the `version` field from a file that failed to load.
    fn raw_version(&self) -> Option<u64> {
        let contents = fs::read(&self.path).ok()?;
        let file: serde_json::Value = serde_json::from_slice(&contents).ok()?;
        file.get("version")?.as_u64()
    }

    fn write(&self, rows: Vec<Record>, version: u64) -> Result<(), StoreError> {
        let checksum = rows_checksum(&rows)?;
        let file = TableFile {
            format: FORMAT_VERSION,
            version,
            checksum,
            rows,
        };
        let contents = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StoreError::io("Failed to create table directory"))?;
        }

        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        let committed = File::create(&temp_path)
            .map_err(StoreError::io("Failed to create temp file"))
            .and_then(|mut temp| {
                temp.write_all(&contents)
                    .map_err(StoreError::io("Failed to write table file"))?;
                temp.sync_all()
                    .map_err(StoreError::io("Failed to sync table file"))
            })
            // Atomic rename
            .and_then(|()| {
                fs::rename(&temp_path, &self.path)
                    .map_err(StoreError::io("Failed to rename table file"))
            });

        if committed.is_err() && temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path) {
                tracing::warn!(path = %temp_path.display(), "Failed to remove temp file: {}", e);
            }
        }
        committed
    }

    /// Applies one mutation to the staged rows.
    fn stage(&self, rows: &mut Vec<Record>, mutation: &Mutation) -> Result<(), StoreError> {
        let position_of = |rows: &[Record], id: &Value| {
            rows.iter()
                .position(|row| row.get(&self.id_column) == Some(id))
                .ok_or_else(|| StoreError::RowNotFound {
                    table: self.display_name(),
                    id: id.clone(),
                })
        };

        match mutation {
            Mutation::Update { id, fields } => {
                let position = position_of(rows.as_slice(), id)?;
                rows[position].merge(fields);
            }
            Mutation::Delete { id } => {
                let position = position_of(rows.as_slice(), id)?;
                rows.remove(position);
            }
            Mutation::Insert { fields } => {
                let id = fields.get_non_null(&self.id_column).ok_or_else(|| {
                    StoreError::MissingIdentifier {
                        table: self.display_name(),
                        column: self.id_column.clone(),
                    }
                })?;
                if position_of(rows.as_slice(), id).is_ok() {
                    return Err(StoreError::DuplicateIdentifier {
                        table: self.display_name(),
                        id: id.clone(),
                    });
                }
                rows.push(fields.clone());
            }
        }
        Ok(())
    }
}

fn rows_checksum(rows: &[Record]) -> Result<u32, StoreError> {
    let mut hasher = Hasher::new();
    hasher.update(&serde_json::to_vec(rows)?);
    Ok(hasher.finalize())
}

impl RowStore for FileTable {
    type Error = StoreError;

    fn read(&self) -> Result<Snapshot, StoreError> {
        let file = self.load()?;
        Ok(Snapshot::new(self.id_column.clone(), file.rows))
    }

    fn apply(&self, mutation: &Mutation) -> Result<(), StoreError> {
        self.execute_batch(&MutationBatch::from(vec![mutation.clone()]))
            .map(|_| ())
            .map_err(|failure| failure.source)
    }

    fn id_assignment(&self) -> IdAssignment {
        self.ids
    }

    /// Stages the whole batch on a copy of the table, then commits it in a
    /// single overwrite. Either every mutation lands or none does.
    fn execute_batch(
        &self,
        batch: &MutationBatch,
    ) -> Result<BatchReport, PartialBatchFailure<StoreError>> {
        if batch.is_empty() {
            return Ok(BatchReport::default());
        }

        let file = self.load().map_err(|source| PartialBatchFailure {
            applied: 0,
            index: None,
            mutation: None,
            source,
        })?;
        let mut rows = file.rows;

        for (index, mutation) in batch.iter().enumerate() {
            if let Err(source) = self.stage(&mut rows, mutation) {
                tracing::error!(
                    index,
                    op = mutation.kind(),
                    "Staging failed, table file left unchanged: {}",
                    source
                );
                return Err(PartialBatchFailure::at(0, index, mutation, source));
            }
        }

        let version = file.version + 1;
        self.write(rows, version)
            .map_err(|source| PartialBatchFailure {
                applied: 0,
                index: None,
                mutation: None,
                source,
            })?;

        tracing::info!(
            path = %self.path.display(),
            version,
            mutations = batch.len(),
            "Table file committed"
        );
        Ok(BatchReport::of(batch))
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON sync configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Identifier column (overrides the configuration file)
    #[arg(long, global = true)]
    pub id_column: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diff a change-set against a snapshot and print the mutation batch
    Plan {
        /// Rendered snapshot (JSON array of rows)
        #[arg(long)]
        snapshot: PathBuf,

        /// Editor change-set (JSON)
        #[arg(long)]
        changes: PathBuf,

        /// How inserted rows get identifiers
        #[arg(long, value_enum, default_value_t = IdStrategy::Store)]
        ids: IdStrategy,

        /// Print parameterized SQL statements instead of mutations
        #[arg(long)]
        sql: bool,

        /// Target table for SQL output (`schema.name`)
        #[arg(long, default_value = "dbo.product")]
        table: String,

        /// Use `@P1` placeholders instead of `?`
        #[arg(long)]
        numbered: bool,
    },

    /// Create (or overwrite) a table file with the demo product rows
    Init {
        /// Table file path
        #[arg(long)]
        table_file: PathBuf,
    },

    /// Apply a change-set to a table file and print the report
    Apply {
        /// Table file path
        #[arg(long)]
        table_file: PathBuf,

        /// Editor change-set (JSON)
        #[arg(long)]
        changes: PathBuf,
    },

    /// Wait until the table file version changes (exit code 2 on timeout)
    Wait {
        /// Table file path
        #[arg(long)]
        table_file: PathBuf,

        /// Maximum wait in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Poll interval in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,
    },

    /// Delete a table file
    Drop {
        /// Table file path
        #[arg(long)]
        table_file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdStrategy {
    /// Leave identifiers to the store's identity column
    Store,
    /// Random integers in the configured range
    Random,
    /// One past the largest existing identifier
    Sequential,
}

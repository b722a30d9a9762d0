//! CLI for planning and applying data-grid change-sets.
//!
//! Provides commands for:
//! - Planning a change-set into mutations or parameterized SQL
//! - Seeding, editing and dropping a table file
//! - Waiting for a table file to change

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = commands::load_config(cli.config.as_deref(), cli.id_column)?;

    match cli.command {
        Commands::Plan {
            snapshot,
            changes,
            ids,
            sql,
            table,
            numbered,
        } => {
            let batch = commands::plan(&snapshot, &changes, ids, &config)?;
            if sql {
                let statements = commands::plan_sql(&batch, &table, numbered, &config);
                println!("{}", serde_json::to_string_pretty(&statements)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            }
        }
        Commands::Init { table_file } => {
            commands::init(&table_file, &config)?;
            println!("Initialized {}", table_file.display());
        }
        Commands::Apply {
            table_file,
            changes,
        } => {
            let report = commands::apply(&table_file, &changes, &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Wait {
            table_file,
            timeout_ms,
            poll_ms,
        } => {
            if let Some(timeout_ms) = timeout_ms {
                config.wait_timeout_ms = timeout_ms;
            }
            if let Some(poll_ms) = poll_ms {
                config.poll_interval_ms = poll_ms;
            }
            if !commands::wait(&table_file, &config)? {
                println!("Timeout reached, table unchanged");
                return Ok(ExitCode::from(2));
            }
            println!("Table changed");
        }
        Commands::Drop { table_file } => {
            commands::drop_table(&table_file, &config)?;
            println!("Dropped {}", table_file.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

//! Field log admin commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use fieldlog_core::{FieldLogService, RecordKey};
use fieldlog_server::{Backend, BackendArgs};

use crate::output;

#[derive(Args, Debug)]
pub struct LogsCommand {
    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(subcommand)]
    pub command: LogsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum LogsSubcommand {
    /// List active field logs, newest first
    List {
        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Fetch a single field log (active or deleted)
    Get {
        /// Field log id
        id: String,
    },

    /// Soft-delete a field log
    Delete {
        /// Field log id
        id: String,
    },
}

pub async fn handle(cmd: LogsCommand) -> Result<()> {
    let backend = Backend::connect(&cmd.backend).context("Failed to configure backend")?;
    let logs = FieldLogService::new(backend.store(), backend.blobs());

    match cmd.command {
        LogsSubcommand::List { pretty } => {
            let records = logs.list_active().await.context("Failed to list field logs")?;

            if records.is_empty() {
                eprintln!("{}", "No field logs found.".dimmed());
                return Ok(());
            }

            for record in &records {
                if pretty {
                    output::json_pretty(record)?;
                } else {
                    output::json(record)?;
                }
            }
        }
        LogsSubcommand::Get { id } => {
            let id = RecordKey::new(id).context("Invalid field log id")?;
            let record = logs.get(&id).await.context("Failed to get field log")?;
            output::json_pretty(&record)?;
        }
        LogsSubcommand::Delete { id } => {
            let id = RecordKey::new(id).context("Invalid field log id")?;
            logs.soft_delete(&id)
                .await
                .context("Failed to delete field log")?;
            output::success(&format!("Deleted field log {}", id));
        }
    }

    Ok(())
}

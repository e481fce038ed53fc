//! CLI argument definitions.

use clap::{Parser, Subcommand};

use fieldlog_server::ServeArgs;

use crate::commands::logs::LogsCommand;
use crate::commands::users::UsersCommand;

/// Field log backend: HTTP API server and admin tool.
#[derive(Parser, Debug)]
#[command(name = "fieldlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),

    /// Field log administration
    Logs(LogsCommand),

    /// User administration
    Users(UsersCommand),
}

//! User admin commands.

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Args, Subcommand};
use colored::Colorize;

use fieldlog_core::{AccountService, Role, TokenIssuer, UserQuery, UserStatus};
use fieldlog_server::{Backend, BackendArgs};

use crate::output;

#[derive(Args, Debug)]
pub struct UsersCommand {
    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(subcommand)]
    pub command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersSubcommand {
    /// List every user profile
    List {
        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Find users by name or email
    Search {
        /// Case-insensitive text matched against name and email
        query: String,

        /// Only users with this role
        #[arg(long)]
        role: Option<String>,

        /// Only inactive users
        #[arg(long)]
        inactive: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

pub async fn handle(cmd: UsersCommand) -> Result<()> {
    let backend = Backend::connect(&cmd.backend).context("Failed to configure backend")?;

    // Admin commands never issue sessions, so the signing key is throwaway.
    let tokens = TokenIssuer::new(uuid::Uuid::new_v4().as_bytes(), Duration::minutes(1));
    let accounts = AccountService::new(
        backend.store(),
        backend.blobs(),
        backend.identity(),
        tokens,
    );

    let (query, pretty) = match cmd.command {
        UsersSubcommand::List { pretty } => (UserQuery::default(), pretty),
        UsersSubcommand::Search {
            query,
            role,
            inactive,
            pretty,
        } => {
            let role = role
                .map(|r| r.parse::<Role>())
                .transpose()
                .context("Invalid role")?;
            let status = inactive.then_some(UserStatus::Inactive);
            (
                UserQuery {
                    q: Some(query),
                    role,
                    status,
                },
                pretty,
            )
        }
    };

    let users = accounts.search(&query).await.context("Failed to list users")?;

    if users.is_empty() {
        eprintln!("{}", "No users found.".dimmed());
        return Ok(());
    }

    for user in &users {
        if pretty {
            output::json_pretty(user)?;
        } else {
            output::json(user)?;
        }
    }

    Ok(())
}

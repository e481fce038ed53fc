//! Runtime configuration.
//!
//! Every setting is a command-line flag with an environment fallback, and a
//! `.env` file in the working directory is loaded before parsing.

use clap::{Args, ValueEnum};

/// Where records, blobs and identities live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Local filesystem (development and tests)
    File,
    /// Hosted database, storage and identity REST APIs
    Rest,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::File => "file",
            BackendKind::Rest => "rest",
        }
    }
}

/// Backend connection settings, shared by the server and admin commands.
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Backend kind (inferred from the database URL scheme when omitted)
    #[arg(long, env = "FIELDLOG_BACKEND", value_enum)]
    pub backend: Option<BackendKind>,

    /// Realtime database URL, or file:///path/to/data for the file backend
    #[arg(long, env = "FIELDLOG_DATABASE_URL")]
    pub database_url: String,

    /// Object storage REST endpoint
    #[arg(
        long,
        env = "FIELDLOG_STORAGE_URL",
        default_value = "https://firebasestorage.googleapis.com"
    )]
    pub storage_url: String,

    /// Object storage bucket (required for the REST backend)
    #[arg(long, env = "FIELDLOG_STORAGE_BUCKET")]
    pub storage_bucket: Option<String>,

    /// Identity REST endpoint
    #[arg(
        long,
        env = "FIELDLOG_IDENTITY_URL",
        default_value = "https://identitytoolkit.googleapis.com"
    )]
    pub identity_url: String,

    /// Web API key for the identity service (required for the REST backend)
    #[arg(long, env = "FIELDLOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Admin credential for the database, storage and identity services
    #[arg(long, env = "FIELDLOG_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Public base URL serving the file backend's blob directory
    #[arg(long, env = "FIELDLOG_PUBLIC_BLOB_URL")]
    pub public_blob_url: Option<String>,
}

/// HTTP server settings.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "FIELDLOG_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Secret used to sign session tokens
    #[arg(long, env = "FIELDLOG_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Session token lifetime in seconds
    #[arg(long, env = "FIELDLOG_TOKEN_TTL_SECS", default_value_t = 3600)]
    pub token_ttl_secs: i64,

    #[command(flatten)]
    pub backend: BackendArgs,
}

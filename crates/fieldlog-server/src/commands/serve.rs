//! Serve command implementation.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::Duration;
use tokio::net::TcpListener;
use tracing::info;

use fieldlog_core::TokenIssuer;
use fieldlog_server::{AppState, Backend, ServeArgs, build_app};

use crate::output;

pub async fn run(args: ServeArgs) -> Result<()> {
    if args.token_ttl_secs <= 0 {
        anyhow::bail!("Token lifetime must be positive");
    }

    let backend = Backend::connect(&args.backend).context("Failed to configure backend")?;
    let tokens = TokenIssuer::new(
        args.secret_key.as_bytes(),
        Duration::seconds(args.token_ttl_secs),
    );
    let app = build_app(AppState::new(&backend, tokens));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr().context("Failed to read local address")?;

    output::success("Server started");
    output::field("Listening", &format!("http://{}", local));
    output::field("Backend", backend.kind().as_str());
    info!(%local, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

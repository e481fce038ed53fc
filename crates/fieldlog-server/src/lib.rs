//! fieldlog-server - HTTP API over the field log services.
//!
//! [`build_app`] assembles the router; the `fieldlog` binary adds
//! configuration, logging and the admin commands around it.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod multipart;
pub mod routes;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use backend::Backend;
pub use config::{BackendArgs, BackendKind, ServeArgs};
pub use error::ApiError;
pub use state::AppState;

/// The complete application: `/api/log`, `/api/user` and `/healthz`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .nest("/api", routes::api())
        .layer(DefaultBodyLimit::max(multipart::MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

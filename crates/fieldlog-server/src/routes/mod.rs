//! HTTP routes.

mod logs;
mod users;

use axum::Json;
use axum::Router;
use serde_json::{Value, json};

use crate::state::AppState;

/// Everything under `/api`.
pub fn api() -> Router<AppState> {
    Router::new()
        .nest("/log", logs::router())
        .nest("/user", users::router())
}

pub async fn healthz() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

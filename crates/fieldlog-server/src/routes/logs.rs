//! Field log routes, mounted under `/api/log`.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use fieldlog_core::{CommentRecord, Error, FieldLogRecord, LogDraft, PhotoFile, RecordKey};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::multipart::{Form, LOG_FILES};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new-field-logs", post(create_log))
        .route("/update-field-logs/{id}", post(update_log))
        .route("/field-logs", get(list_logs))
        .route("/field-logs/{id}", get(get_log))
        .route("/delete-log/{id}", delete(delete_log))
        .route(
            "/field-logs/{id}/comments",
            get(list_comments).post(add_comment),
        )
}

/// The JSON `data` part plus the two photo groups of a log form.
struct LogForm {
    draft: LogDraft,
    site: Vec<PhotoFile>,
    species: Vec<PhotoFile>,
}

impl LogForm {
    async fn read(multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Form::read(multipart, LOG_FILES).await?;

        let data = form
            .take_text("data")
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| Error::bad_request("No data provided"))?;

        Ok(Self {
            draft: LogDraft::from_json(&data)?,
            site: form.take_files("sitePhotos"),
            species: form.take_files("speciesPhotos[]"),
        })
    }
}

async fn create_log(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = LogForm::read(multipart).await?;
    let record = state
        .logs
        .create(form.draft, &form.site, &form.species)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Field log created",
            "data": record,
        })),
    ))
}

async fn update_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let id = RecordKey::new(id)?;
    let form = LogForm::read(multipart).await?;

    let record = match state
        .logs
        .update(&id, form.draft, &form.site, &form.species)
        .await
    {
        Ok(record) => record,
        // Editing a log that does not exist is refused outright.
        Err(Error::NotFound(e)) => return Err(ApiError::Forbidden(e.to_string())),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(json!({
        "success": true,
        "message": "Field log updated",
        "data": record,
    })))
}

async fn list_logs(State(state): State<AppState>) -> Result<Json<Vec<FieldLogRecord>>, ApiError> {
    Ok(Json(state.logs.list_active().await?))
}

async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FieldLogRecord>, ApiError> {
    let id = RecordKey::new(id)?;
    Ok(Json(state.logs.get(&id).await?))
}

async fn delete_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = RecordKey::new(id)?;
    state.logs.soft_delete(&id).await?;
    info!(%id, "Soft-deleted field log");

    Ok(Json(json!({
        "success": true,
        "message": "Field log deleted",
    })))
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    #[serde(default)]
    text: Option<String>,
}

async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = RecordKey::new(id)?;
    let comment = state
        .logs
        .add_comment(&id, &claims, request.text.as_deref().unwrap_or_default())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Comment added",
            "data": comment,
        })),
    ))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentRecord>>, ApiError> {
    let id = RecordKey::new(id)?;
    Ok(Json(state.logs.list_comments(&id).await?))
}

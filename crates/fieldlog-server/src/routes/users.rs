//! Account routes, mounted under `/api/user`.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use fieldlog_core::error::AuthError;
use fieldlog_core::{
    Error, FederatedProvider, RecordKey, Registration, Session, UserQuery, UserRecord,
};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::multipart::{Form, PROFILE_FILES};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/reset-password", post(reset_password))
        .route("/google-login", post(google_login))
        .route("/github-login", post(github_login))
        .route("/twitter-login", post(twitter_login))
        .route("/verify-token", post(verify_token))
        .route("/me", get(me))
        .route("/users", get(list_users))
        .route("/search", get(search_users))
        .route("/update-user/{uid}", put(update_user))
        .route("/delete-user/{uid}", delete(delete_user))
}

fn session_body(message: &str, session: Session) -> Json<Value> {
    Json(json!({
        "message": message,
        "user": session.user,
        "token": session.token.token.as_str(),
        "expirationDate": session.token.expires_at_millis,
    }))
}

async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = Form::read(multipart, PROFILE_FILES).await?;

    let registration = Registration {
        first_name: form.take_text("firstName"),
        last_name: form.take_text("lastName"),
        email: form.take_text("email"),
        password: form.take_text("password"),
        role: form.take_text("role"),
        photo: form.take_files("photo").into_iter().next(),
    };

    let session = state.accounts.register(registration).await?;
    Ok(session_body("User registered", session))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .accounts
        .login(request.email.as_deref(), request.password.as_deref())
        .await?;
    Ok(session_body("Signed in", session))
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    email: Option<String>,
}

async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<Value>, ApiError> {
    state.accounts.reset_password(request.email.as_deref()).await?;
    Ok(Json(json!({"message": "Password reset email sent"})))
}

/// Google sends an ID token; GitHub and Twitter send an access token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FederatedRequest {
    id_token: Option<String>,
    access_token: Option<String>,
}

async fn federated(
    state: AppState,
    provider: FederatedProvider,
    token: Option<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .accounts
        .federated_login(provider, token.as_deref())
        .await?;
    Ok(session_body(&format!("Signed in with {}", provider), session))
}

async fn google_login(
    State(state): State<AppState>,
    Json(request): Json<FederatedRequest>,
) -> Result<Json<Value>, ApiError> {
    federated(state, FederatedProvider::Google, request.id_token).await
}

async fn github_login(
    State(state): State<AppState>,
    Json(request): Json<FederatedRequest>,
) -> Result<Json<Value>, ApiError> {
    federated(state, FederatedProvider::Github, request.access_token).await
}

async fn twitter_login(
    State(state): State<AppState>,
    Json(request): Json<FederatedRequest>,
) -> Result<Json<Value>, ApiError> {
    federated(state, FederatedProvider::Twitter, request.access_token).await
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    token: Option<String>,
}

async fn verify_token(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Response, ApiError> {
    let Some(token) = request.token.filter(|t| !t.is_empty()) else {
        return Err(Error::bad_request("Token not provided").into());
    };

    match state.accounts.verify_session(&token).await {
        Ok((_, user)) => Ok(Json(json!({
            "isValid": true,
            "userData": user.profile,
        }))
        .into_response()),
        Err(Error::Auth(err)) => {
            let message = match err {
                AuthError::TokenExpired => "Token expired",
                _ => "Invalid token",
            };
            Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({"isValid": false, "message": message})),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let uid = RecordKey::new(claims.uid.as_str())
        .map_err(|_| Error::from(AuthError::InvalidToken("token names an invalid uid".into())))?;
    let user = state.accounts.get_user(&uid).await?;

    Ok(Json(json!({
        "uid": user.uid,
        "email": claims.email,
        "firstName": user.profile.first_name,
        "lastName": user.profile.last_name,
        "role": user.profile.role,
    })))
}

async fn list_users(State(state): State<AppState>) -> Result<Response, ApiError> {
    let users = state.accounts.list_users().await?;
    if users.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "No users found"})),
        )
            .into_response());
    }
    Ok(Json(users).into_response())
}

async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.accounts.search(&query).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let uid = RecordKey::new(uid)?;
    let user = state.accounts.update_user(&uid, fields).await?;
    Ok(Json(json!({"message": "User updated", "user": user})))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let uid = RecordKey::new(uid)?;
    state.accounts.delete_user(&uid).await?;
    Ok(Json(json!({"message": "User deleted"})))
}

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use chrono::Duration;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

use fieldlog_core::TokenIssuer;
use fieldlog_server::{AppState, Backend, BackendArgs, build_app};

pub const SECRET: &[u8] = b"test-secret";

/// A running server over a fresh file backend.
pub struct TestServer {
    pub base: String,
    pub data: TempDir,
    pub client: reqwest::Client,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn data_url(&self) -> String {
        file_url(self.data.path())
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

pub fn file_url(path: &Path) -> String {
    Url::from_directory_path(path)
        .expect("Failed to convert path to file URL")
        .to_string()
}

pub fn backend_args(database_url: &str) -> BackendArgs {
    BackendArgs {
        backend: None,
        database_url: database_url.to_string(),
        storage_url: "https://firebasestorage.googleapis.com".to_string(),
        storage_bucket: None,
        identity_url: "https://identitytoolkit.googleapis.com".to_string(),
        api_key: None,
        admin_token: None,
        public_blob_url: Some("http://blobs.test".to_string()),
    }
}

pub async fn start_server() -> TestServer {
    let data = TempDir::new().expect("temp dir");
    let backend = Backend::connect(&backend_args(&file_url(data.path()))).expect("backend");
    let state = AppState::new(&backend, TokenIssuer::new(SECRET, Duration::hours(1)));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        data,
        client: reqwest::Client::new(),
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

pub fn photo(name: &str) -> Part {
    Part::bytes(format!("jpeg:{name}").into_bytes())
        .file_name(name.to_string())
        .mime_str("image/jpeg")
        .unwrap()
}

/// A field log form with `data` and the given photo file names.
pub fn log_form(data: &Value, site: &[&str], species: &[&str]) -> Form {
    let mut form = Form::new().text("data", data.to_string());
    for name in site {
        form = form.part("sitePhotos", photo(name));
    }
    for name in species {
        form = form.part("speciesPhotos[]", photo(name));
    }
    form
}

pub fn registration_form(email: &str, role: &str) -> Form {
    Form::new()
        .text("firstName", "Ada")
        .text("lastName", "Lovelace")
        .text("email", email.to_string())
        .text("password", "hunter22")
        .text("role", role.to_string())
        .part("photo", photo("me.jpg"))
}

/// Register a user and return `(uid, token)`.
pub async fn register(server: &TestServer, email: &str) -> (String, String) {
    let resp = server
        .client
        .post(server.url("/api/user/register"))
        .multipart(registration_form(email, "Investigador"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    (
        body["user"]["uid"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

/// Create a log and return its JSON record.
pub async fn create_log(server: &TestServer, data: &Value, site: &[&str], species: &[&str]) -> Value {
    let resp = server
        .client
        .post(server.url("/api/log/new-field-logs"))
        .multipart(log_form(data, site, species))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    body["data"].clone()
}

/// Run the CLI binary against a data directory.
pub fn run_cli(args: &[&str], database_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fieldlog"));
    cmd.args(args);
    cmd.env("FIELDLOG_DATABASE_URL", database_url);
    cmd.env_remove("FIELDLOG_BACKEND");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], database_url: &str) -> String {
    let output = run_cli(args, database_url);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

//! JSON-over-HTTP client shared by the REST collaborators.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use fieldlog_core::BackendUrl;
use fieldlog_core::error::{BackendError, ProtocolError, TransportError};

/// Convert a reqwest failure into the matching backend error.
pub(crate) fn map_reqwest(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        TransportError::Timeout.into()
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
        .into()
    } else if err.is_decode() {
        BackendError::Decode {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
        .into()
    }
}

/// Error envelope used by the database, storage and identity services.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    /// `{"error": "Permission denied"}`
    Text(String),
    /// `{"error": {"code": 400, "message": "EMAIL_EXISTS"}}`
    Detailed { message: Option<String> },
}

/// HTTP client bound to one service base URL.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base: BackendUrl,
}

impl RestClient {
    /// Create a client for the service at `base`.
    pub fn new(base: BackendUrl) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fieldlog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_reqwest)?;

        Ok(Self { client, base })
    }

    pub fn base(&self) -> &BackendUrl {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        self.base.join(path)
    }

    /// Start a request to `path` with an optional bearer token.
    pub fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match bearer {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// GET a JSON document.
    #[instrument(skip(self, query), fields(base = %self.base))]
    pub async fn get_json<R>(&self, path: &str, query: &[(&str, &str)]) -> Result<R, BackendError>
    where
        R: DeserializeOwned,
    {
        debug!("GET");
        let request = self.request(Method::GET, path, None).query(query);
        self.send(request).await
    }

    /// Send a JSON body with `method` and decode the JSON reply.
    #[instrument(skip(self, query, body), fields(base = %self.base))]
    pub async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(%method, "JSON request");
        let request = self.request(method, path, None).query(query).json(body);
        self.send(request).await
    }

    /// Upload raw bytes and decode the JSON reply.
    #[instrument(skip(self, query, bytes, bearer), fields(base = %self.base, len = bytes.len()))]
    pub async fn post_bytes<R>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bytes: Vec<u8>,
        content_type: &str,
        bearer: Option<&str>,
    ) -> Result<R, BackendError>
    where
        R: DeserializeOwned,
    {
        debug!(content_type, "Uploading bytes");
        let request = self
            .request(Method::POST, path, bearer)
            .query(query)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(request).await
    }

    /// Send a request whose reply body is ignored.
    #[instrument(skip(self, query), fields(base = %self.base))]
    pub async fn send_no_response(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(), BackendError> {
        debug!(%method, "Request (no response)");
        let response = self
            .request(method, path, None)
            .query(query)
            .send()
            .await
            .map_err(map_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::parse_error_response(response).await.into())
        }
    }

    /// Send a prepared request and decode its reply.
    pub async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, BackendError> {
        let response = request.send().await.map_err(map_reqwest)?;
        Self::handle_response(response).await
    }

    /// Decode a success body or turn an error status into a [`ProtocolError`].
    async fn handle_response<R: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<R, BackendError> {
        let status = response.status();
        trace!(status = %status, "Response");

        if status.is_success() {
            response.json::<R>().await.map_err(map_reqwest)
        } else {
            Err(Self::parse_error_response(response).await.into())
        }
    }

    async fn parse_error_response(response: reqwest::Response) -> ProtocolError {
        let status = response.status().as_u16();

        match response.json::<ErrorEnvelope>().await {
            Ok(ErrorEnvelope {
                error: ErrorBody::Text(text),
            }) => ProtocolError::new(status, Some(text), None),
            Ok(ErrorEnvelope {
                error: ErrorBody::Detailed { message: Some(message) },
            }) => {
                // Identity messages look like "WEAK_PASSWORD : Password should be ..."
                match message.split_once(" : ") {
                    Some((code, detail)) => {
                        ProtocolError::new(status, Some(code.to_string()), Some(detail.to_string()))
                    }
                    None => ProtocolError::new(status, Some(message), None),
                }
            }
            _ => ProtocolError::new(status, None, None),
        }
    }
}

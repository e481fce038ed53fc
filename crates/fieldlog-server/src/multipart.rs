//! Multipart form reading with per-field upload limits.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use thiserror::Error;
use tracing::debug;

use fieldlog_core::PhotoFile;

/// Largest accepted file, in bytes.
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// A file field a form accepts, and how many files it may carry.
#[derive(Debug, Clone, Copy)]
pub struct FileField {
    pub name: &'static str,
    pub max_count: usize,
}

impl FileField {
    pub const fn new(name: &'static str, max_count: usize) -> Self {
        Self { name, max_count }
    }
}

/// Field log forms: site photos and species photos.
pub const LOG_FILES: &[FileField] = &[
    FileField::new("sitePhotos", 10),
    FileField::new("speciesPhotos[]", 50),
];

/// Registration form: a single profile photo.
pub const PROFILE_FILES: &[FileField] = &[FileField::new("photo", 1)];

/// Largest request body any form may send.
pub const MAX_BODY_BYTES: usize = 61 * MAX_FILE_BYTES;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file in '{field}' exceeds {limit} bytes")]
    FileTooLarge { field: String, limit: usize },

    #[error("too many files in '{field}' (max {max})")]
    TooManyFiles { field: String, max: usize },

    #[error("unexpected file field '{field}'")]
    UnexpectedField { field: String },

    #[error("malformed multipart body: {0}")]
    Malformed(#[from] MultipartError),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::TooManyFiles { .. } | UploadError::UnexpectedField { .. } => {
                StatusCode::BAD_REQUEST
            }
            UploadError::Malformed(err) => err.status(),
        }
    }
}

/// A fully read multipart form.
#[derive(Debug, Default)]
pub struct Form {
    text: HashMap<String, String>,
    files: HashMap<&'static str, Vec<PhotoFile>>,
}

impl Form {
    /// Read every part of `multipart`. Parts with a file name must belong to
    /// one of `accepted`; other parts are kept as text.
    ///
    /// On any rejection the rest of the body is consumed before returning.
    pub async fn read(mut multipart: Multipart, accepted: &[FileField]) -> Result<Self, UploadError> {
        let mut form = Form::default();

        if let Err(err) = form.read_parts(&mut multipart, accepted).await {
            drain(&mut multipart).await;
            return Err(err);
        }

        debug!(
            text = form.text.len(),
            files = form.files.values().map(Vec::len).sum::<usize>(),
            "Read multipart form"
        );
        Ok(form)
    }

    async fn read_parts(
        &mut self,
        multipart: &mut Multipart,
        accepted: &[FileField],
    ) -> Result<(), UploadError> {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_none() {
                let value = field.text().await?;
                self.text.insert(name, value);
                continue;
            }

            let Some(accepted_field) = accepted.iter().find(|f| f.name == name) else {
                return Err(UploadError::UnexpectedField { field: name });
            };

            let files = self.files.entry(accepted_field.name).or_default();
            if files.len() >= accepted_field.max_count {
                return Err(UploadError::TooManyFiles {
                    field: name,
                    max: accepted_field.max_count,
                });
            }
            files.push(read_file(field, &name).await?);
        }
        Ok(())
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.text.remove(name)
    }

    /// Files received under `name`, in arrival order.
    pub fn take_files(&mut self, name: &str) -> Vec<PhotoFile> {
        self.files.remove(name).unwrap_or_default()
    }
}

async fn read_file(mut field: Field<'_>, name: &str) -> Result<PhotoFile, UploadError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if bytes.len() + chunk.len() > MAX_FILE_BYTES {
            return Err(UploadError::FileTooLarge {
                field: name.to_string(),
                limit: MAX_FILE_BYTES,
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(PhotoFile::new(file_name, content_type, bytes))
}

/// Consume what is left of the body so the client reads the error response
/// instead of a reset connection.
async fn drain(multipart: &mut Multipart) {
    while let Ok(Some(mut field)) = multipart.next_field().await {
        while let Ok(Some(_)) = field.chunk().await {}
    }
}

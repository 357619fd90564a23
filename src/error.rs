//! # Error Handling
//!
//! Every failure of the training pipeline is per-request and recoverable.
//! Each one is reported to the client in the same envelope the hotword
//! clients already understand:
//!
//! ```json
//! { "err": true, "errmsg": "Incorrect number of files: 2 (3 required)" }
//! ```
//!
//! ## Status codes:
//! Application errors are returned with HTTP 200 and `err: true`. Existing
//! clients branch on the `err` flag, not on the status line.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Errors produced while serving a request.
///
/// The `String` payload of each variant is the full client-facing message.
///
/// ## Rust Concepts:
/// - **One variant per pipeline stage**: the variant says where the request
///   failed, the payload says what the client sees
/// - **ResponseError**: actix calls `error_response` whenever a handler
///   returns `Err(AppError)`, which is how the envelope gets rendered
/// - **From impls**: let `?` convert `anyhow` and multipart errors in place
#[derive(Debug)]
pub enum AppError {
    /// Missing or mismatched API key, or the key file could not be read
    Authentication(String),

    /// Wrong number of uploaded files
    FileCount(String),

    /// Declared content type is not `audio/wav`
    ContentType(String),

    /// File exceeds the size ceiling
    FileSize(String),

    /// Content is not a RIFF/WAVE file
    FormatValidation(String),

    /// Writing uploads to the temp directory failed
    FilesystemWrite(String),

    /// The training tool could not be launched, timed out or exited non-zero
    Invocation(String),

    /// The model artifact could not be read back
    FilesystemRead(String),

    /// Malformed multipart body or query parameters
    BadRequest(String),

    /// Anything else
    Internal(String),
}

impl AppError {
    /// Machine-readable category, used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Authentication(_) => "authentication_error",
            AppError::FileCount(_) => "file_count_error",
            AppError::ContentType(_) => "content_type_error",
            AppError::FileSize(_) => "file_size_error",
            AppError::FormatValidation(_) => "format_validation_error",
            AppError::FilesystemWrite(_) => "filesystem_write_error",
            AppError::Invocation(_) => "invocation_error",
            AppError::FilesystemRead(_) => "filesystem_read_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Authentication(msg)
            | AppError::FileCount(msg)
            | AppError::ContentType(msg)
            | AppError::FileSize(msg)
            | AppError::FormatValidation(msg)
            | AppError::FilesystemWrite(msg)
            | AppError::Invocation(msg)
            | AppError::FilesystemRead(msg)
            | AppError::BadRequest(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AppError {}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<'a> {
    pub err: bool,
    pub errmsg: &'a str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorEnvelope {
            err: true,
            errmsg: self.message(),
        })
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Malformed multipart body: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

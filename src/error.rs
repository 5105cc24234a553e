//! Error types for anon-batch
//!
//! This module provides error handling for the library, including:
//! - Fatal setup errors (configuration, authentication, unreadable source tree)
//! - Per-task errors that abort a single file's pipeline only
//! - Context information (HTTP status, response body, file path, task id)

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for anon-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for anon-batch
///
/// Fatal variants (`Config`, `Auth`, `SourceDir`) abort the whole run; `Task`
/// errors are caught at the pipeline boundary and only fail the affected file.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "extensions")
        key: Option<String>,
    },

    /// Authentication rejected or the sign-in exchange failed
    ///
    /// Never retried: a rejected credential exchange is treated as a
    /// configuration problem, not a transient fault.
    #[error("authentication failed (status {status:?}): {body}")]
    Auth {
        /// HTTP status of the sign-in response, if one was received
        status: Option<StatusCode>,
        /// Response body or transport error text
        body: String,
    },

    /// Source directory could not be read
    #[error("failed to read source directory {path}: {source}")]
    SourceDir {
        /// The directory that could not be enumerated
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Per-task error (create, upload, status check, detail, result fetch)
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors confined to one file's task pipeline
///
/// Each variant carries the HTTP status and response body so a failed task is
/// diagnosable from its log line alone.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Creating the remote task failed
    #[error("creating task failed (status {status}): {body}")]
    Create {
        /// HTTP status of the create-task response
        status: StatusCode,
        /// Response body text
        body: String,
    },

    /// Uploading the input file to the task's upload URL failed
    #[error("upload of {path} failed (status {status}): {body}")]
    Upload {
        /// The input file whose upload failed
        path: PathBuf,
        /// HTTP status of the upload response
        status: StatusCode,
        /// Response body text
        body: String,
    },

    /// Reading the input file from disk failed
    #[error("could not read input file {path}: {source}")]
    ReadInput {
        /// The input file that could not be read
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Querying task status failed at the transport/HTTP level
    #[error("status check for task {task_id} failed (status {status}): {body}")]
    StatusCheck {
        /// The task whose status check failed
        task_id: String,
        /// HTTP status of the status response
        status: StatusCode,
        /// Response body text
        body: String,
    },

    /// Fetching task detail (result location) failed
    #[error("fetching detail for task {task_id} failed (status {status}): {body}")]
    Detail {
        /// The task whose detail fetch failed
        task_id: String,
        /// HTTP status of the detail response
        status: StatusCode,
        /// Response body text
        body: String,
    },

    /// Downloading the anonymized result failed
    #[error("result download for task {task_id} failed (status {status}): {body}")]
    FetchResult {
        /// The task whose result download failed
        task_id: String,
        /// HTTP status of the download response
        status: StatusCode,
        /// Response body text
        body: String,
    },

    /// Writing the anonymized result to the output path failed
    #[error("could not write output file {path}: {source}")]
    WriteOutput {
        /// The output file that could not be written
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for configuration errors
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Error::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }

    /// Returns true if this error aborts the whole run rather than one file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::Auth { .. } | Error::SourceDir { .. }
        )
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        let config = Error::config("bad extension", Some("extensions"));
        assert!(config.is_fatal());

        let auth = Error::Auth {
            status: Some(StatusCode::UNAUTHORIZED),
            body: "bad credentials".to_string(),
        };
        assert!(auth.is_fatal());

        let task = Error::Task(TaskError::Create {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        });
        assert!(!task.is_fatal());
    }

    #[test]
    fn task_error_display_includes_status_and_body() {
        let err = TaskError::Upload {
            path: PathBuf::from("in/a.jpg"),
            status: StatusCode::FORBIDDEN,
            body: "expired url".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("expired url"));
        assert!(msg.contains("a.jpg"));
    }
}

//! Core types for anon-batch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One input file queued for processing
///
/// Identified by its path relative to the source root. Immutable once
/// produced by the resume filter; consumed exactly once by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// Root of the source tree the item was discovered under
    pub source_root: PathBuf,
    /// Path of the file relative to `source_root`
    pub relative_path: PathBuf,
}

impl WorkItem {
    /// Absolute (or root-relative) path of the input file
    pub fn input_path(&self) -> PathBuf {
        self.source_root.join(&self.relative_path)
    }

    /// Output path derived by swapping the source root for `output_root`
    /// while preserving the relative path
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.relative_path)
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.relative_path.display())
    }
}

/// The current authentication token and its issuance time
///
/// Replaced wholesale on refresh, never mutated in place. Pipelines capture a
/// snapshot; a replaced session does not invalidate in-flight requests that
/// already hold the old token.
#[derive(Clone, Debug)]
pub struct Session {
    /// Access token presented in the `Authorization` header
    pub token: String,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
}

/// Remote handle returned by a create-task call
#[derive(Clone, Debug, Deserialize)]
pub struct TaskHandle {
    /// Remote task identifier
    pub task_id: String,
    /// Pre-signed URL the input bytes are PUT to
    pub upload_url: String,
}

/// Remote task status as reported by the status endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task created, nothing uploaded yet
    New,
    /// Input received, waiting for a worker
    Queued,
    /// Anonymization in progress
    Processing,
    /// Result ready for download
    Done,
    /// Remote processing failed
    Failed,
    /// Unrecognized status string, kept verbatim
    Other(String),
}

impl TaskStatus {
    /// True once the result is ready for download
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s {
            "new" => TaskStatus::New,
            "queued" => TaskStatus::Queued,
            "processing" => TaskStatus::Processing,
            "done" => TaskStatus::Done,
            "failed" => TaskStatus::Failed,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::New => write!(f, "new"),
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Terminal outcome of one file's pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Result downloaded to the output path
    Downloaded,
    /// Poll budget exhausted without reaching "done"; nothing was written,
    /// the file stays eligible for a later run
    TimedOut,
}

/// Lifecycle events emitted while a batch runs
///
/// Delivered over a lossy broadcast channel; consumers that fall behind miss
/// events, the batch itself is unaffected.
#[derive(Clone, Debug, Serialize)]
pub enum Event {
    /// Remote task created for a file
    TaskCreated {
        /// Remote task identifier
        task_id: String,
        /// Input file, relative to the source root
        relative_path: PathBuf,
    },

    /// Input bytes uploaded to the task's upload URL
    Uploaded {
        /// Remote task identifier
        task_id: String,
        /// Input file, relative to the source root
        relative_path: PathBuf,
    },

    /// Anonymized result written to the output path
    Downloaded {
        /// Remote task identifier
        task_id: String,
        /// Input file, relative to the source root
        relative_path: PathBuf,
        /// Process-wide count of completed downloads, including this one
        completed: u64,
    },

    /// Poll budget exhausted before the task reported "done"
    TimedOut {
        /// Remote task identifier
        task_id: String,
        /// Input file, relative to the source root
        relative_path: PathBuf,
    },

    /// A file's pipeline failed; sibling pipelines continue
    TaskFailed {
        /// Input file, relative to the source root
        relative_path: PathBuf,
        /// Error message
        error: String,
    },

    /// The session token was replaced after N completed downloads
    SessionRefreshed {
        /// Completion count at the time of the refresh
        completed: u64,
    },
}

/// Aggregate result of one batch run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files whose anonymized result was downloaded
    pub downloaded: u64,
    /// Files whose poll budget was exhausted (re-attemptable next run)
    pub timed_out: u64,
    /// Files whose pipeline failed outright
    pub failed: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_item_paths_preserve_relative_structure() {
        let item = WorkItem {
            source_root: PathBuf::from("/data/in"),
            relative_path: PathBuf::from("sub/dir/a.jpg"),
        };
        assert_eq!(item.input_path(), PathBuf::from("/data/in/sub/dir/a.jpg"));
        assert_eq!(
            item.output_path(Path::new("/data/out")),
            PathBuf::from("/data/out/sub/dir/a.jpg")
        );
    }

    #[test]
    fn task_status_from_str() {
        assert_eq!(TaskStatus::from("done"), TaskStatus::Done);
        assert_eq!(TaskStatus::from("queued"), TaskStatus::Queued);
        assert_eq!(
            TaskStatus::from("paused"),
            TaskStatus::Other("paused".to_string())
        );
        assert!(TaskStatus::from("done").is_done());
        assert!(!TaskStatus::from("processing").is_done());
    }

    #[test]
    fn task_status_display_round_trips_known_values() {
        for s in ["new", "queued", "processing", "done", "failed"] {
            assert_eq!(TaskStatus::from(s).to_string(), s);
        }
    }
}

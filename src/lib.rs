//! # anon-batch
//!
//! Batch client library for cloud image anonymization services.
//!
//! Submits local image files to a remote anonymization API, tracks each file
//! through the remote task lifecycle (create → upload → poll → download), and
//! writes the processed result next to its original relative path under an
//! output root. Runs resume safely: a file whose output already exists is
//! never re-submitted, so an interrupted or timed-out batch just continues on
//! the next invocation.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Best-effort batches** - One file's failure never stops the rest
//! - **Resume by presence** - The output tree is the only progress state
//! - **Event-driven** - Consumers subscribe to lifecycle events, no polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use anon_batch::{BatchClient, Config, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         credentials: Credentials {
//!             username: "user".to_string(),
//!             password: "secret".to_string(),
//!         },
//!         input_dir: "images".into(),
//!         output_dir: "anonymized".into(),
//!         recursive: true,
//!         anonymization: serde_json::json!({ "face": true }),
//!         ..Default::default()
//!     };
//!
//!     let client = BatchClient::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = client.run().await?;
//!     println!(
//!         "done: {} downloaded, {} timed out, {} failed",
//!         summary.downloaded, summary.timed_out, summary.failed
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote API surface (sign-in, tasks, content transfer)
pub mod api;
/// Batch dispatcher and client entry point
pub mod batch;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-file task pipeline
pub mod pipeline;
/// Fixed-interval bounded status polling
pub mod poll;
/// Resume filter (pending-file discovery)
pub mod scan;
/// Session lifecycle and completion counting
pub mod session;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use api::{ApiClient, TaskDetail};
pub use batch::BatchClient;
pub use config::{Config, Credentials, PollConfig};
pub use error::{Error, Result, TaskError};
pub use pipeline::TaskPipeline;
pub use poll::{PollOutcome, poll_until_done};
pub use scan::{SUPPORTED_EXTENSIONS, Scanner, normalize_extensions};
pub use session::SessionManager;
pub use types::{BatchSummary, Event, Session, TaskHandle, TaskOutcome, TaskStatus, WorkItem};

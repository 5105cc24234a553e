//! Batch dispatcher: drives many task pipelines under a concurrency cap
//!
//! Consumes the resume filter's pending files and runs one pipeline per file
//! through a buffered stream. The remote service sets the real concurrency
//! ceiling; the local cap keeps the process from exhausting memory (uploads
//! buffer whole files) or sockets on large input sets. A single pipeline's
//! failure or timeout never stops the others; the batch is best-effort, not
//! all-or-nothing.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::TaskPipeline;
use crate::scan::{Scanner, normalize_extensions};
use crate::session::SessionManager;
use crate::types::{BatchSummary, Event, TaskOutcome, WorkItem};

/// Capacity of the lossy event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Entry point: one authenticated client driving batch runs
///
/// Construction validates the configuration and performs the initial
/// sign-in; both failure modes are fatal setup errors. A constructed client
/// can drive [`run`](BatchClient::run) repeatedly — the resume filter makes
/// later runs pick up exactly the files earlier runs left unfinished.
#[derive(Debug)]
pub struct BatchClient {
    config: Config,
    api: ApiClient,
    sessions: Arc<SessionManager>,
    event_tx: broadcast::Sender<Event>,
}

impl BatchClient {
    /// Validate the configuration, sign in, and build the client
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let api = ApiClient::new(&config.endpoint)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let sessions = Arc::new(
            SessionManager::connect(
                api.clone(),
                config.credentials.clone(),
                config.tasks_per_authentication,
                event_tx.clone(),
            )
            .await?,
        );
        Ok(Self {
            config,
            api,
            sessions,
            event_tx,
        })
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Total downloads completed by this client so far, across runs
    pub async fn completed_count(&self) -> u64 {
        self.sessions.completed_count().await
    }

    /// Process every pending file and report the aggregate outcome
    ///
    /// Scan errors (unreadable source tree) abort the run; per-file errors
    /// are caught at the pipeline boundary, logged, and tallied.
    pub async fn run(&self) -> Result<BatchSummary> {
        let start = Instant::now();

        let extensions = normalize_extensions(&self.config.extensions)?;
        let scanner = Scanner::new(
            &self.config.input_dir,
            &self.config.output_dir,
            extensions,
            self.config.recursive,
        );
        let items: Vec<WorkItem> = scanner.pending()?.collect::<Result<Vec<_>>>()?;

        tracing::info!(
            pending = items.len(),
            max_concurrent = self.config.max_concurrent_tasks,
            "starting batch"
        );

        let pipeline = Arc::new(TaskPipeline::new(
            self.api.clone(),
            Arc::clone(&self.sessions),
            self.config.poll,
            Arc::new(self.config.anonymization.clone()),
            self.config.output_dir.clone(),
            self.event_tx.clone(),
        ));

        let results: Vec<(WorkItem, Result<TaskOutcome>)> = stream::iter(items)
            .map(|item| {
                let pipeline = Arc::clone(&pipeline);
                async move {
                    let outcome = pipeline.run(&item).await;
                    (item, outcome)
                }
            })
            .buffer_unordered(self.config.max_concurrent_tasks)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for (item, result) in results {
            match result {
                Ok(TaskOutcome::Downloaded) => summary.downloaded += 1,
                Ok(TaskOutcome::TimedOut) => summary.timed_out += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(file = %item, error = %e, "pipeline failed");
                    self.event_tx
                        .send(Event::TaskFailed {
                            relative_path: item.relative_path,
                            error: e.to_string(),
                        })
                        .ok();
                }
            }
        }
        summary.elapsed = start.elapsed();

        tracing::info!(
            downloaded = summary.downloaded,
            timed_out = summary.timed_out,
            failed = summary.failed,
            elapsed_secs = summary.elapsed.as_secs(),
            "batch completed"
        );
        Ok(summary)
    }
}

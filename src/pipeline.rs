//! Per-file task pipeline: create, upload, poll, download
//!
//! Each pipeline drives exactly one file through the remote task lifecycle
//! and owns no shared state beyond the session snapshot it captures up front
//! and the completion counter it bumps at the very end. Stage order within a
//! pipeline is strict; nothing orders one pipeline against another.
//!
//! Any error here fails this file only. The dispatcher catches it at the
//! pipeline boundary and keeps driving the rest of the batch.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::api::ApiClient;
use crate::config::PollConfig;
use crate::error::{Result, TaskError};
use crate::poll::{PollOutcome, poll_until_done};
use crate::session::SessionManager;
use crate::types::{Event, TaskOutcome, WorkItem};

/// Drives one [`WorkItem`] through create → upload → poll → download
#[derive(Debug)]
pub struct TaskPipeline {
    api: ApiClient,
    sessions: Arc<SessionManager>,
    poll: PollConfig,
    profile: Arc<serde_json::Value>,
    output_root: PathBuf,
    event_tx: broadcast::Sender<Event>,
}

impl TaskPipeline {
    /// Wire a pipeline to the shared client, session manager, and event bus
    pub fn new(
        api: ApiClient,
        sessions: Arc<SessionManager>,
        poll: PollConfig,
        profile: Arc<serde_json::Value>,
        output_root: PathBuf,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            api,
            sessions,
            poll,
            profile,
            output_root,
            event_tx,
        }
    }

    /// Run the full lifecycle for one file
    ///
    /// Returns [`TaskOutcome::Downloaded`] once the anonymized result is on
    /// disk, or [`TaskOutcome::TimedOut`] if the poll budget ran out — in
    /// which case nothing was written and the file stays eligible for the
    /// next run. Only a successful download increments the completion counter
    /// (and may trigger a session refresh).
    pub async fn run(&self, item: &WorkItem) -> Result<TaskOutcome> {
        // The snapshot captured here stays in use for the whole pipeline,
        // even if a sibling triggers a refresh mid-flight.
        let session = self.sessions.current().await;

        let task = self.api.create_task(&self.profile, &session.token).await?;
        self.event_tx
            .send(Event::TaskCreated {
                task_id: task.task_id.clone(),
                relative_path: item.relative_path.clone(),
            })
            .ok();

        let input_path = item.input_path();
        let bytes = tokio::fs::read(&input_path)
            .await
            .map_err(|e| TaskError::ReadInput {
                path: input_path.clone(),
                source: e,
            })?;
        self.api.upload(&task.upload_url, bytes, &input_path).await?;
        self.event_tx
            .send(Event::Uploaded {
                task_id: task.task_id.clone(),
                relative_path: item.relative_path.clone(),
            })
            .ok();

        let outcome = poll_until_done(&self.poll, || {
            self.api.task_status(&task.task_id, &session.token)
        })
        .await?;

        match outcome {
            PollOutcome::TimedOut { last_status } => {
                tracing::warn!(
                    task_id = %task.task_id,
                    file = %item,
                    last_status = %last_status.map(|s| s.to_string()).unwrap_or_default(),
                    "task did not finish within the poll budget, leaving file for a later run"
                );
                self.event_tx
                    .send(Event::TimedOut {
                        task_id: task.task_id.clone(),
                        relative_path: item.relative_path.clone(),
                    })
                    .ok();
                Ok(TaskOutcome::TimedOut)
            }
            PollOutcome::Done => {
                let detail = self.api.task_detail(&task.task_id, &session.token).await?;
                let dest = item.output_path(&self.output_root);
                self.api
                    .fetch_result(&task.task_id, &detail.anonymized_url, &dest)
                    .await?;

                let completed = self.sessions.note_completed().await?;
                tracing::info!(
                    task_id = %task.task_id,
                    file = %item,
                    completed = completed,
                    "task completed"
                );
                self.event_tx
                    .send(Event::Downloaded {
                        task_id: task.task_id,
                        relative_path: item.relative_path.clone(),
                        completed,
                    })
                    .ok();
                Ok(TaskOutcome::Downloaded)
            }
        }
    }
}

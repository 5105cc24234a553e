//! Session lifecycle and the process-wide completion counter
//!
//! Exactly one live [`Session`] exists at a time. Pipelines read snapshots
//! through an `Arc` swap guarded by a read-write lock, so a reader always
//! sees the fully-old or fully-new session, never a partial update. The
//! completion counter lives behind a mutex that is held across a triggered
//! refresh, making the "refresh once every N downloads" trigger exactly-once
//! under concurrency: the pipeline that crosses the multiple performs the
//! refresh, later completions wait for it to finish.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};

use crate::api::ApiClient;
use crate::config::Credentials;
use crate::error::Result;
use crate::types::{Event, Session};

/// Owns the current session and refreshes it every N completed downloads
#[derive(Debug)]
pub struct SessionManager {
    api: ApiClient,
    credentials: Credentials,
    tasks_per_authentication: u64,
    session: RwLock<Arc<Session>>,
    completions: Mutex<u64>,
    event_tx: broadcast::Sender<Event>,
}

impl SessionManager {
    /// Sign in and build the manager around the initial session
    ///
    /// Authentication failure here is fatal to the run and never retried.
    pub async fn connect(
        api: ApiClient,
        credentials: Credentials,
        tasks_per_authentication: u64,
        event_tx: broadcast::Sender<Event>,
    ) -> Result<Self> {
        let token = api.sign_in(&credentials).await?;
        Ok(Self {
            api,
            credentials,
            tasks_per_authentication,
            session: RwLock::new(Arc::new(Session {
                token,
                issued_at: Utc::now(),
            })),
            completions: Mutex::new(0),
            event_tx,
        })
    }

    /// Snapshot of the current session
    ///
    /// The snapshot stays valid for the caller's in-flight requests even if a
    /// refresh replaces the session afterwards; the server decides whether an
    /// old token is still honored.
    pub async fn current(&self) -> Arc<Session> {
        Arc::clone(&*self.session.read().await)
    }

    /// Record one successfully downloaded task and return the running total
    ///
    /// When the total crosses a multiple of `tasks_per_authentication`, the
    /// calling pipeline performs the refresh before returning; the counter
    /// lock is held throughout, so concurrent completions cannot trigger a
    /// second refresh for the same multiple and observe the new session once
    /// they proceed.
    pub async fn note_completed(&self) -> Result<u64> {
        let mut completions = self.completions.lock().await;
        *completions += 1;
        let count = *completions;

        if count % self.tasks_per_authentication == 0 {
            tracing::info!(
                completed = count,
                "completion threshold reached, refreshing session"
            );
            self.refresh(count).await?;
        }

        Ok(count)
    }

    /// Total completed downloads so far
    pub async fn completed_count(&self) -> u64 {
        *self.completions.lock().await
    }

    /// Replace the session with a freshly authenticated one
    async fn refresh(&self, completed: u64) -> Result<()> {
        let token = self.api.sign_in(&self.credentials).await?;
        let mut session = self.session.write().await;
        *session = Arc::new(Session {
            token,
            issued_at: Utc::now(),
        });
        drop(session);

        self.event_tx.send(Event::SessionRefreshed { completed }).ok();
        Ok(())
    }
}

//! Fixed-interval status polling with a bounded check budget
//!
//! The remote task queue sets the pace; the client only bounds how long it
//! waits. A constant interval separates consecutive status checks and a
//! constant maximum number of checks bounds total wait (the defaults give a
//! ceiling of roughly 2.8 hours). No exponential backoff, no jitter.
//!
//! Only "not yet done" is retried. A transport failure during polling
//! propagates to the caller and fails that file's pipeline.
//!
//! # Example
//!
//! ```no_run
//! use anon_batch::config::PollConfig;
//! use anon_batch::poll::{PollOutcome, poll_until_done};
//! use anon_batch::types::TaskStatus;
//! use anon_batch::error::Error;
//!
//! # async fn example() -> Result<(), Error> {
//! let config = PollConfig::default();
//! let outcome = poll_until_done(&config, || async {
//!     // Query the remote status endpoint here
//!     Ok::<TaskStatus, Error>(TaskStatus::Done)
//! })
//! .await?;
//! assert!(matches!(outcome, PollOutcome::Done));
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use crate::config::PollConfig;
use crate::types::TaskStatus;

/// Result of a bounded polling loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The task reported "done" within the budget
    Done,
    /// The budget was exhausted without reaching "done"
    ///
    /// Not an error: the caller leaves the file unprocessed and it stays
    /// eligible for a later run.
    TimedOut {
        /// The last status observed before giving up, if any check succeeded
        last_status: Option<TaskStatus>,
    },
}

/// Poll a status source until it reports "done" or the budget runs out
///
/// Performs at most `config.max_checks` status reads with `config.interval`
/// between consecutive reads (no trailing sleep after the final one). Errors
/// from the status source are not retried.
pub async fn poll_until_done<F, Fut, E>(
    config: &PollConfig,
    mut check: F,
) -> Result<PollOutcome, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TaskStatus, E>>,
{
    let mut last_status = None;

    for attempt in 1..=config.max_checks {
        let status = check().await?;

        if status.is_done() {
            tracing::debug!(attempts = attempt, "task reported done");
            return Ok(PollOutcome::Done);
        }

        tracing::debug!(
            attempt = attempt,
            max_checks = config.max_checks,
            status = %status,
            interval_secs = config.interval.as_secs_f64(),
            "task not done yet"
        );
        last_status = Some(status);

        if attempt < config.max_checks {
            tokio::time::sleep(config.interval).await;
        }
    }

    tracing::warn!(
        max_checks = config.max_checks,
        last_status = %last_status.as_ref().map(ToString::to_string).unwrap_or_default(),
        "poll budget exhausted before task finished"
    );
    Ok(PollOutcome::TimedOut { last_status })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    fn fast_config(max_checks: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(5),
            max_checks,
        }
    }

    #[tokio::test]
    async fn returns_done_on_first_check() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let outcome = poll_until_done(&fast_config(10), || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, crate::error::Error>(TaskStatus::Done)
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keeps_checking_until_done() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let outcome = poll_until_done(&fast_config(10), || {
            let calls = Arc::clone(&calls_clone);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= 3 {
                    Ok::<_, crate::error::Error>(TaskStatus::Done)
                } else {
                    Ok(TaskStatus::Processing)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn performs_exactly_max_checks_then_times_out() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let config = fast_config(5);

        let start = Instant::now();
        let outcome = poll_until_done(&config, || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, crate::error::Error>(TaskStatus::Processing)
            }
        })
        .await
        .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                last_status: Some(TaskStatus::Processing)
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // 4 sleeps between 5 checks, none after the last
        assert!(start.elapsed() >= config.interval * 4);
    }

    #[tokio::test]
    async fn transport_error_propagates_without_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result = poll_until_done(&fast_config(10), || {
            let calls = Arc::clone(&calls_clone);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 2 {
                    Err("connection reset".to_string())
                } else {
                    Ok(TaskStatus::Queued)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "connection reset");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

//! Configuration types for anon-batch

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// API credentials exchanged for an access token at sign-in
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
}

/// Status polling policy (fixed interval, fixed budget)
///
/// No exponential backoff and no jitter: the remote task queue sets the pace,
/// the client only bounds how long it is willing to wait.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait between consecutive status checks (default: 10 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Maximum number of status checks before giving up (default: 1000)
    #[serde(default = "default_max_checks")]
    pub max_checks: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_checks: default_max_checks(),
        }
    }
}

/// Main configuration for a batch run
///
/// The anonymization profile is an opaque JSON document attached verbatim to
/// every create-task call; the client never inspects its contents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the anonymization API (default: the public v2 endpoint)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Sign-in credentials
    pub credentials: Credentials,

    /// Root of the tree containing input images
    pub input_dir: PathBuf,

    /// Root the anonymized results are written under, mirroring the input
    /// tree's relative structure
    pub output_dir: PathBuf,

    /// Recurse into subdirectories of `input_dir` (default: false)
    #[serde(default)]
    pub recursive: bool,

    /// Accepted file extensions; empty means the default set
    /// (`.jpg`, `.jpeg`, `.png`)
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Maximum number of task pipelines in flight at once (default: 30)
    ///
    /// Uploads buffer whole files in memory, so this also bounds peak memory
    /// for large batches.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,

    /// Refresh the session after this many completed downloads (default: 50)
    #[serde(default = "default_tasks_per_authentication")]
    pub tasks_per_authentication: u64,

    /// Status polling policy
    #[serde(default)]
    pub poll: PollConfig,

    /// Opaque anonymization profile forwarded with every create-task call
    #[serde(default)]
    pub anonymization: serde_json::Value,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            credentials: Credentials::default(),
            input_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            recursive: false,
            extensions: Vec::new(),
            max_concurrent_tasks: default_max_concurrent(),
            tasks_per_authentication: default_tasks_per_authentication(),
            poll: PollConfig::default(),
            anonymization: serde_json::Value::Null,
        }
    }
}

impl Config {
    /// Validate the configuration before any network or file I/O happens
    ///
    /// Checks the endpoint URL, the concurrency and refresh limits, and the
    /// extension list (normalization rejects anything outside the supported
    /// set). Returns [`Error::Config`] on the first problem found.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.endpoint).map_err(|e| {
            Error::config(format!("invalid endpoint URL: {}", e), Some("endpoint"))
        })?;

        if self.max_concurrent_tasks == 0 {
            return Err(Error::config(
                "max_concurrent_tasks must be at least 1",
                Some("max_concurrent_tasks"),
            ));
        }

        if self.tasks_per_authentication == 0 {
            return Err(Error::config(
                "tasks_per_authentication must be at least 1",
                Some("tasks_per_authentication"),
            ));
        }

        if self.poll.max_checks == 0 {
            return Err(Error::config(
                "poll.max_checks must be at least 1",
                Some("poll.max_checks"),
            ));
        }

        crate::scan::normalize_extensions(&self.extensions)?;

        Ok(())
    }
}

fn default_endpoint() -> String {
    "https://api.celantur.com/v2/".to_string()
}

fn default_max_concurrent() -> usize {
    30
}

fn default_tasks_per_authentication() -> u64 {
    50
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_checks() -> u32 {
    1000
}

// Duration serialization helper (integer seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

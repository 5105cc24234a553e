//! HTTP surface of the remote anonymization API
//!
//! Thin typed wrapper over the remote endpoints: sign-in, task creation,
//! status, task detail, plus the unauthenticated content transfers (raw PUT
//! to the task's upload URL, GET of the anonymized result). The API's
//! behavior is consumed as-is, not redefined here; every non-success response
//! surfaces its HTTP status and body in the returned error.

use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::config::Credentials;
use crate::error::{Error, Result, TaskError};
use crate::types::{TaskHandle, TaskStatus};

/// Sign-in response payload
#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(rename = "AccessToken")]
    access_token: String,
}

/// Status endpoint payload
#[derive(Debug, Deserialize)]
struct StatusResponse {
    task_status: String,
}

/// Task detail payload (only the fields the client consumes)
#[derive(Clone, Debug, Deserialize)]
pub struct TaskDetail {
    /// Location of the anonymized result
    pub anonymized_url: String,
}

/// Client for one remote API endpoint
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections across
/// all concurrently running pipelines.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    signin_url: String,
    task_url: String,
}

impl ApiClient {
    /// Build a client for `endpoint` (e.g. `https://api.example.com/v2/`)
    pub fn new(endpoint: &str) -> Result<Self> {
        url::Url::parse(endpoint).map_err(|e| {
            Error::config(format!("invalid endpoint URL: {}", e), Some("endpoint"))
        })?;
        let base = endpoint.trim_end_matches('/');
        Ok(Self {
            http: reqwest::Client::new(),
            signin_url: format!("{}/signin/", base),
            task_url: format!("{}/task/", base),
        })
    }

    /// Exchange credentials for an access token
    ///
    /// Any failure here is fatal and never retried: a rejected exchange is a
    /// configuration problem, not a transient fault.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<String> {
        let response = self
            .http
            .post(&self.signin_url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| Error::Auth {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth {
                status: Some(status),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: SignInResponse = response.json().await.map_err(|e| Error::Auth {
            status: Some(status),
            body: format!("malformed sign-in response: {}", e),
        })?;
        tracing::info!("authenticated, access token received");
        Ok(body.access_token)
    }

    /// Create a remote anonymization task
    ///
    /// Submits the opaque profile document as the request body and returns
    /// the task id plus its pre-signed upload URL.
    pub async fn create_task(
        &self,
        profile: &serde_json::Value,
        token: &str,
    ) -> Result<TaskHandle> {
        let response = self
            .http
            .post(&self.task_url)
            .header("Authorization", token)
            .json(profile)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Create {
                status,
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        let task: TaskHandle = response.json().await?;
        tracing::info!(task_id = %task.task_id, "task created");
        Ok(task)
    }

    /// Query the current status of a task
    pub async fn task_status(&self, task_id: &str, token: &str) -> Result<TaskStatus> {
        let url = format!("{}{}/status", self.task_url, task_id);
        let response = self
            .http
            .get(&url)
            .header("Authorization", token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::StatusCheck {
                task_id: task_id.to_string(),
                status,
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        let body: StatusResponse = response.json().await?;
        Ok(TaskStatus::from(body.task_status.as_str()))
    }

    /// Fetch the full task record, including the anonymized result location
    pub async fn task_detail(&self, task_id: &str, token: &str) -> Result<TaskDetail> {
        let url = format!("{}{}", self.task_url, task_id);
        let response = self
            .http
            .get(&url)
            .header("Authorization", token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Detail {
                task_id: task_id.to_string(),
                status,
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        Ok(response.json().await?)
    }

    /// PUT the input bytes to a task's pre-signed upload URL
    ///
    /// The upload URL is unauthenticated; no token is attached. `input_path`
    /// is only used to contextualize a failure.
    pub async fn upload(&self, upload_url: &str, bytes: Vec<u8>, input_path: &Path) -> Result<()> {
        let response = self.http.put(upload_url).body(bytes).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Upload {
                path: input_path.to_path_buf(),
                status,
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        tracing::info!(file = %input_path.display(), "input uploaded");
        Ok(())
    }

    /// Stream the anonymized result to `dest`, creating missing directories
    ///
    /// Directory creation races across concurrent pipelines writing into the
    /// same parent are benign (`create_dir_all` treats "already exists" as
    /// success).
    pub async fn fetch_result(
        &self,
        task_id: &str,
        anonymized_url: &str,
        dest: &Path,
    ) -> Result<()> {
        let mut response = self.http.get(anonymized_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::FetchResult {
                task_id: task_id.to_string(),
                status,
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskError::WriteOutput {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| TaskError::WriteOutput {
                path: dest.to_path_buf(),
                source: e,
            })?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| TaskError::WriteOutput {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
        }
        file.flush().await.map_err(|e| TaskError::WriteOutput {
            path: dest.to_path_buf(),
            source: e,
        })?;

        tracing::info!(task_id = %task_id, output = %dest.display(), "anonymized result received");
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_in_returns_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signin/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "AccessToken": "token-1",
                "ExpiresIn": 3600
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let token = api.sign_in(&credentials()).await.unwrap();
        assert_eq!(token, "token-1");
    }

    #[tokio::test]
    async fn sign_in_rejection_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signin/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let err = api.sign_in(&credentials()).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, Error::Auth { status: Some(s), .. } if s.as_u16() == 401));
    }

    #[tokio::test]
    async fn create_task_sends_profile_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task/"))
            .and(header("Authorization", "token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "t-42",
                "upload_url": "https://storage.example/upload/t-42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let task = api
            .create_task(&json!({"face": true}), "token-1")
            .await
            .unwrap();
        assert_eq!(task.task_id, "t-42");
        assert_eq!(task.upload_url, "https://storage.example/upload/t-42");
    }

    #[tokio::test]
    async fn create_task_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/task/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let err = api.create_task(&json!({}), "token-1").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("backend down"));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn task_status_maps_string_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/task/t-1/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"task_status": "processing"})),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let status = api.task_status("t-1", "token-1").await.unwrap();
        assert_eq!(status, TaskStatus::Processing);
    }

    #[tokio::test]
    async fn upload_puts_raw_bytes_without_auth() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/upload/t-1"))
            .and(body_string("raw image bytes"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        api.upload(
            &format!("{}/upload/t-1", server.uri()),
            b"raw image bytes".to_vec(),
            Path::new("in/a.jpg"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn fetch_result_writes_file_and_creates_directories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/result/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"anonymized".to_vec()))
            .mount(&server)
            .await;

        let out = tempfile::TempDir::new().unwrap();
        let dest = out.path().join("nested/dir/a.jpg");

        let api = ApiClient::new(&server.uri()).unwrap();
        api.fetch_result("t-1", &format!("{}/result/t-1", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"anonymized");
    }
}

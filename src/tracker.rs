//! Tracker client
//!
//! The tracker hands out tasks and collects result streams over a small HTTP API:
//!
//! | Request | Success | Notes |
//! |---------|---------|-------|
//! | `GET task/clear` | 200 | Drops all leased but unsubmitted tasks |
//! | `GET task/get` | 200 | Body is `null` or a task object |
//! | `POST task/put?id=..&username=..` | 200 | 409 means the tracker no longer wants it |
//!
//! Every request carries `version=<client version>`. A 403 carries a human-readable
//! reason in its body, usually a ban notice, which is surfaced in the error.
//!
//! Failures are returned to the caller untouched; retrying is the worker loop's job.

use crate::config::{HttpConfig, TrackerConfig};
use crate::service::build_http_client;
use crate::task::Task;
use crate::TrackerError;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use std::io::{self, Read, Seek, SeekFrom};
use url::Url;

/// What happened to a submitted result stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The tracker stored the results
    Accepted,

    /// The tracker already has results for the task, or withdrew it (409)
    Rejected,
}

/// Client for one tracker endpoint
pub struct TrackerClient {
    base: Url,
    version: String,
    client: Client,
}

impl TrackerClient {
    /// Creates a client for the tracker at `config.url`
    ///
    /// A trailing slash is appended to the URL when missing so endpoints resolve below it.
    pub fn new(config: &TrackerConfig, http: &HttpConfig) -> Result<Self, TrackerError> {
        let mut url = config.url.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        tracing::info!("Initializing tracker at {}", url);

        Ok(Self {
            base: Url::parse(&url)?,
            version: config.version.clone(),
            client: build_http_client(http)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Asks the tracker to discard all pending tasks
    pub async fn clear(&self) -> Result<(), TrackerError> {
        tracing::info!("Clearing all tasks");
        let (status, _) = self.send(self.request(Method::GET, "task/clear")?).await?;
        expect_ok("task/clear", status)
    }

    /// Leases a task
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Task))` - A task to run
    /// * `Ok(None)` - The tracker has no work right now
    /// * `Err(TrackerError)` - Unexpected status, malformed task or transport failure
    pub async fn fetch(&self) -> Result<Option<Task>, TrackerError> {
        let (status, body) = self.send(self.request(Method::GET, "task/get")?).await?;
        expect_ok("task/get", status)?;

        let task: Option<Task> = serde_json::from_slice(&body)?;
        match &task {
            Some(task) => tracing::info!("Received task {} for service {}", task.id, task.service),
            None => tracing::info!("No tasks available"),
        }
        Ok(task)
    }

    /// Submits the result stream for `task`
    ///
    /// The stream is rewound and read in full on the blocking pool before sending.
    ///
    /// # Returns
    ///
    /// * `Ok(Submission::Accepted)` - Stored by the tracker
    /// * `Ok(Submission::Rejected)` - 409 Conflict; logged, not an error
    /// * `Err(TrackerError)` - Any other status or a transport failure
    pub async fn put<R>(
        &self,
        task: &Task,
        mut data: R,
        username: Option<&str>,
    ) -> Result<Submission, TrackerError>
    where
        R: Read + Seek + Send + 'static,
    {
        let body = tokio::task::spawn_blocking(move || -> io::Result<Vec<u8>> {
            data.seek(SeekFrom::Start(0))?;
            let mut body = Vec::new();
            data.read_to_end(&mut body)?;
            Ok(body)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        let mut request = self
            .request(Method::POST, "task/put")?
            .query(&[("id", task.id.as_str())]);
        if let Some(username) = username {
            request = request.query(&[("username", username)]);
        }

        let (status, _) = self.send(request.body(body)).await?;
        match status {
            StatusCode::OK => {
                tracing::info!("Successfully submitted task {}", task.id);
                Ok(Submission::Accepted)
            }
            StatusCode::CONFLICT => {
                tracing::warn!("Server refused data for task {}", task.id);
                Ok(Submission::Rejected)
            }
            other => Err(TrackerError::UnexpectedStatus {
                endpoint: "task/put".to_string(),
                status: other.as_u16(),
            }),
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, TrackerError> {
        let url = self.base.join(endpoint)?;
        Ok(self
            .client
            .request(method, url)
            .query(&[("version", self.version.as_str())]))
    }

    /// Sends a request, turning a 403 into an error carrying the tracker's reason
    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Vec<u8>), TrackerError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status == StatusCode::FORBIDDEN {
            let reason = String::from_utf8_lossy(&body).trim().to_string();
            tracing::warn!("Received 403 Forbidden from tracker");
            tracing::warn!("Tracker says: {}", reason);
            return Err(TrackerError::Forbidden { reason });
        }

        Ok((status, body))
    }
}

fn expect_ok(endpoint: &str, status: StatusCode) -> Result<(), TrackerError> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(TrackerError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}

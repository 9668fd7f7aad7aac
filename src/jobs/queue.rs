use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FormError, FormResult};

/// Source of application URLs and sink for their results.
pub trait JobQueue: Send + Sync {
    /// The next URL to apply to, or `None` when the queue is empty.
    fn next_job(&self) -> FormResult<Option<String>>;

    fn report(&self, url: &str, success: bool) -> FormResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
}

impl From<bool> for JobStatus {
    fn from(success: bool) -> Self {
        if success { JobStatus::Success } else { JobStatus::Failed }
    }
}

// ============================================================================
// HTTP queue
// ============================================================================

#[derive(Deserialize)]
struct NextJob {
    url: Option<String>,
}

#[derive(Serialize)]
struct JobUpdate<'a> {
    url: &'a str,
    status: JobStatus,
}

/// Job server speaking `GET /next-job` and `POST /job/update`.
pub struct HttpJobQueue {
    server: String,
    client: reqwest::blocking::Client,
}

impl HttpJobQueue {
    pub fn new(server: &str, timeout: Duration) -> FormResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FormError::Http { context: "building job client".into(), source: e })?;
        Ok(Self { server: server.trim_end_matches('/').to_string(), client })
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl JobQueue for HttpJobQueue {
    fn next_job(&self) -> FormResult<Option<String>> {
        let endpoint = format!("{}/next-job", self.server);
        let response = self
            .client
            .get(&endpoint)
            .send()
            .map_err(|e| FormError::Http { context: format!("GET {}", endpoint), source: e })?;

        // The server answers 404 when nothing is queued.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("job server has no new jobs");
            return Ok(None);
        }
        let body: NextJob = response
            .error_for_status()
            .and_then(|r| r.json())
            .map_err(|e| FormError::Http { context: format!("GET {}", endpoint), source: e })?;
        Ok(body.url.filter(|u| !u.trim().is_empty()))
    }

    fn report(&self, url: &str, success: bool) -> FormResult<()> {
        let endpoint = format!("{}/job/update", self.server);
        let update = JobUpdate { url, status: success.into() };
        self.client
            .post(&endpoint)
            .json(&update)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FormError::Http { context: format!("POST {}", endpoint), source: e })?;
        debug!(url, status = ?update.status, "job result reported");
        Ok(())
    }
}

// ============================================================================
// In-memory queue
// ============================================================================

/// A fixed list of URLs; results are kept for inspection.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    pending: Mutex<VecDeque<String>>,
    results: Mutex<Vec<(String, JobStatus)>>,
}

impl InMemoryJobQueue {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pending: Mutex::new(urls.into_iter().map(Into::into).collect()),
            results: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, url: impl Into<String>) {
        self.pending.lock().push_back(url.into());
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn results(&self) -> Vec<(String, JobStatus)> {
        self.results.lock().clone()
    }
}

impl JobQueue for InMemoryJobQueue {
    fn next_job(&self) -> FormResult<Option<String>> {
        Ok(self.pending.lock().pop_front())
    }

    fn report(&self, url: &str, success: bool) -> FormResult<()> {
        let status = JobStatus::from(success);
        info!(url, status = ?status, "job result recorded");
        self.results.lock().push((url.to_string(), status));
        Ok(())
    }
}

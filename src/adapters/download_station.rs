//! Synology DSM Web API client for Download Station.
//!
//! Two calls per poll cycle: `SYNO.API.Auth` login for a session id, then
//! `SYNO.DownloadStation.Task` list with the `detail` and `file` extras. Both decode the
//! same envelope, `{"success": bool, "data": {...}, "error": {"code": n}}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::core::models::Job;
use crate::core::source::{ApiCode, AuthError, Credentials, FetchError, JobSource, SessionToken};

const AUTH_PATH: &str = "/webapi/auth.cgi";
const TASK_PATH: &str = "/webapi/DownloadStation/task.cgi";

pub struct DownloadStationClient {
    base_url: String,
    host: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: i64,
}

#[derive(Deserialize)]
struct LoginData {
    sid: String,
}

#[derive(Deserialize)]
struct TaskListData {
    #[serde(default)]
    tasks: Option<Vec<Value>>,
}

impl Envelope {
    fn code(&self) -> ApiCode {
        ApiCode(self.error.as_ref().map(|e| e.code))
    }
}

impl DownloadStationClient {
    /// Build a client for `base_url` (e.g. `http://192.168.1.34:5000`) with a per-request
    /// timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let host = base_url
            .split_once("://")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_else(|| base_url.clone());
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            host,
            client,
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.base_url(), config.request_timeout())
    }

    /// GET `path` and return the body. Errors carry no URL: the query holds the password
    /// or the session id.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, reqwest::Error> {
        let body = async {
            self.client
                .get(format!("{}{}", self.base_url, path))
                .query(query)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        body.await.map_err(reqwest::Error::without_url)
    }
}

#[async_trait]
impl JobSource for DownloadStationClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let body = self
            .get(
                AUTH_PATH,
                &[
                    ("api", "SYNO.API.Auth"),
                    ("method", "login"),
                    ("version", "7"),
                    ("account", credentials.account.as_str()),
                    ("passwd", credentials.password.as_str()),
                    ("format", "json"),
                ],
            )
            .await
            .map_err(|source| AuthError::Transport {
                host: self.host.clone(),
                source,
            })?;

        parse_login(&self.host, &body)
    }

    async fn list_jobs(&self, session: &SessionToken) -> Result<Vec<Job>, FetchError> {
        let body = self
            .get(
                TASK_PATH,
                &[
                    ("api", "SYNO.DownloadStation.Task"),
                    ("method", "list"),
                    ("version", "1"),
                    ("_sid", session.as_str()),
                    ("additional", "detail,file"),
                ],
            )
            .await
            .map_err(|source| FetchError::Transport {
                host: self.host.clone(),
                source,
            })?;

        let listing = parse_task_list(&self.host, &body)?;
        debug!(
            host = %self.host,
            jobs = listing.jobs.len(),
            skipped = listing.skipped,
            "Fetched task list"
        );
        Ok(listing.jobs)
    }
}

pub(crate) fn parse_login(host: &str, body: &str) -> Result<SessionToken, AuthError> {
    let malformed = |reason: String| AuthError::Malformed {
        host: host.to_string(),
        reason,
    };

    let envelope: Envelope = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    if !envelope.success {
        return Err(AuthError::Rejected {
            host: host.to_string(),
            code: envelope.code(),
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| malformed("missing data".to_string()))?;
    let data: LoginData =
        serde_json::from_value(data).map_err(|e| malformed(format!("data.sid: {}", e)))?;

    Ok(SessionToken::new(data.sid))
}

#[derive(Debug)]
pub(crate) struct TaskListing {
    pub jobs: Vec<Job>,
    pub skipped: usize,
}

pub(crate) fn parse_task_list(host: &str, body: &str) -> Result<TaskListing, FetchError> {
    let malformed = |source: serde_json::Error| FetchError::Malformed {
        host: host.to_string(),
        source,
    };

    let envelope: Envelope = serde_json::from_str(body).map_err(malformed)?;
    if !envelope.success {
        return Err(FetchError::Rejected {
            host: host.to_string(),
            code: envelope.code(),
        });
    }

    let entries = match envelope.data {
        Some(data) => serde_json::from_value::<TaskListData>(data)
            .map_err(malformed)?
            .tasks
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let mut listing = TaskListing {
        jobs: Vec::with_capacity(entries.len()),
        skipped: 0,
    };

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Job>(entry) {
            Ok(job) => listing.jobs.push(job),
            Err(e) => {
                warn!(host, index, error = %e, "Skipping malformed task entry");
                listing.skipped += 1;
            }
        }
    }

    Ok(listing)
}

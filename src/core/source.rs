use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use super::models::Job;

/// Account used to log into the remote job source.
#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl Credentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session id returned by a successful login. Valid for a single poll cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login request to {host} failed: {source}")]
    Transport {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("login to {host} rejected: {code}")]
    Rejected { host: String, code: ApiCode },

    #[error("malformed login response from {host}: {reason}")]
    Malformed { host: String, reason: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("task list request to {host} failed: {source}")]
    Transport {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("task list from {host} rejected: {code}")]
    Rejected { host: String, code: ApiCode },

    #[error("malformed task list response from {host}: {source}")]
    Malformed {
        host: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error code carried in a failed DSM Web API envelope, if the remote sent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiCode(pub Option<i64>);

impl fmt::Display for ApiCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(code) = self.0 else {
            return f.write_str("no error code given");
        };
        write!(f, "{} (code {})", describe_api_code(code), code)
    }
}

/// Descriptions for the DSM Web API error codes shared by the auth and task APIs.
pub fn describe_api_code(code: i64) -> &'static str {
    match code {
        100 => "unknown error",
        101 => "invalid parameter",
        102 => "requested API does not exist",
        103 => "requested method does not exist",
        104 => "requested version does not support the functionality",
        105 => "session has no permission",
        106 => "session timeout",
        107 => "session interrupted by duplicate login",
        400 => "no such account or incorrect password",
        401 => "account disabled",
        402 => "permission denied",
        403 => "2-step verification code required",
        404 => "failed to authenticate 2-step verification code",
        _ => "unrecognised error",
    }
}

/// A remote system that can be polled for its job queue.
///
/// Implementations hold no session state between calls; the monitor logs in again
/// at the start of every cycle.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Short human-readable name of the remote, used in log fields.
    fn host(&self) -> &str;

    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, AuthError>;

    /// Jobs in the order the remote lists them. Entries that fail to decode are skipped.
    async fn list_jobs(&self, session: &SessionToken) -> Result<Vec<Job>, FetchError>;
}

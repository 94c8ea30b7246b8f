use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Download Station task as returned by `SYNO.DownloadStation.Task` `list`.
///
/// `id` and `status` are required; everything else falls back to its default so that
/// older DSM versions which omit a field still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub additional: JobAdditional,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAdditional {
    #[serde(default)]
    pub detail: JobDetail,
    #[serde(default, rename = "file")]
    pub files: Vec<JobFile>,
}

/// Epoch seconds; zero means "not yet occurred".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(default)]
    pub started_time: i64,
    #[serde(default)]
    pub completed_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(rename = "filename", alias = "name", default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// Status tokens that count as "work in progress" for [`Job::is_running`].
const RUNNING_STATUSES: &[&str] = &["downloading", "finishing", "hash_checking", "extracting"];

impl Job {
    pub fn is_running(&self) -> bool {
        RUNNING_STATUSES.contains(&self.status.as_str())
    }

    /// Seconds between start and completion, only when the job has actually finished.
    pub fn download_duration_secs(&self) -> Option<i64> {
        let detail = &self.additional.detail;
        detail
            .completed_time
            .checked_sub(detail.started_time)
            .filter(|&secs| secs > 0)
    }
}

/// Jobs retrieved in one poll cycle. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub jobs: Vec<Job>,
    /// `None` until the first successful cycle.
    pub polled_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(jobs: Vec<Job>, polled_at: DateTime<Utc>) -> Self {
        Self {
            jobs,
            polled_at: Some(polled_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// A status change observed for a job that was already known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub job_id: String,
    pub title: String,
    pub previous: String,
    pub current: String,
}

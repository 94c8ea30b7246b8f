//! Periodic status polling and change detection.
//!
//! The published view (snapshot + running flags) sits behind one `RwLock` and is
//! replaced wholesale at the end of each successful cycle, so readers only ever see a
//! complete snapshot. The diff baseline is private to the poller; its `Mutex` is held for
//! the whole cycle, which also keeps cycles from overlapping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::diff::{self, Baseline};
use super::models::{Snapshot, Transition};
use super::notifications::{self, ChatId, Notifier};
use super::source::{AuthError, Credentials, FetchError, JobSource};
use super::summary;

#[derive(Default)]
struct Published {
    snapshot: Arc<Snapshot>,
    running: HashMap<String, bool>,
}

/// Result of a single poll cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed {
        jobs: usize,
        transitions: Vec<Transition>,
    },
    /// The cycle was abandoned; published state and baseline are untouched.
    Skipped(CycleError),
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub struct StatusMonitor {
    source: Arc<dyn JobSource>,
    credentials: Credentials,
    notifier: Arc<dyn Notifier>,
    recipients: Vec<ChatId>,
    interval: Duration,
    published: RwLock<Published>,
    baseline: Mutex<Baseline>,
}

impl StatusMonitor {
    pub fn new(
        source: Arc<dyn JobSource>,
        credentials: Credentials,
        notifier: Arc<dyn Notifier>,
        recipients: Vec<ChatId>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            credentials,
            notifier,
            recipients,
            interval,
            published: RwLock::new(Published::default()),
            baseline: Mutex::new(Baseline::new()),
        }
    }

    /// Spawn the polling loop. The first cycle runs immediately; later cycles run every
    /// `interval` after the previous one finishes. Cancellation is checked between cycles.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                host = self.source.host(),
                interval_secs = self.interval.as_secs(),
                recipients = self.recipients.len(),
                "Status monitor started"
            );

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                self.poll_once().await;
            }

            info!("Status monitor stopped");
        })
    }

    /// Run one login → list → diff → publish → notify cycle.
    pub async fn poll_once(&self) -> CycleOutcome {
        let mut baseline = self.baseline.lock().await;
        let host = self.source.host();

        let session = match self.source.login(&self.credentials).await {
            Ok(session) => session,
            Err(e) => {
                warn!(host, error = %e, "Login failed, skipping poll cycle");
                return CycleOutcome::Skipped(e.into());
            }
        };

        let jobs = match self.source.list_jobs(&session).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(host, error = %e, "Failed to fetch tasks, skipping poll cycle");
                return CycleOutcome::Skipped(e.into());
            }
        };

        let transitions = diff::detect_transitions(&mut baseline, &jobs);
        let running = diff::running_flags(&jobs);
        let polled_at = Utc::now();
        let snapshot = Arc::new(Snapshot::new(jobs, polled_at));
        let job_count = snapshot.jobs.len();

        {
            let mut published = self.published.write().await;
            published.snapshot = snapshot;
            published.running = running;
        }

        debug!(host, jobs = job_count, transitions = transitions.len(), "Poll cycle complete");

        for transition in &transitions {
            info!(
                job_id = %transition.job_id,
                title = %transition.title,
                previous = %transition.previous,
                current = %transition.current,
                "Task status changed"
            );
            let message = summary::transition_message(transition, polled_at);
            let report =
                notifications::broadcast(self.notifier.as_ref(), &self.recipients, &message).await;
            if !report.failed.is_empty() {
                warn!(
                    job_id = %transition.job_id,
                    delivered = report.delivered,
                    failed = report.failed.len(),
                    "Some status change notifications were not delivered"
                );
            }
        }

        CycleOutcome::Completed {
            jobs: job_count,
            transitions,
        }
    }

    /// Latest published snapshot. Empty with no timestamp before the first successful cycle.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.published.read().await.snapshot.clone()
    }

    pub async fn has_active_jobs(&self) -> bool {
        self.published.read().await.running.values().any(|&running| running)
    }

    pub async fn running_flags(&self) -> HashMap<String, bool> {
        self.published.read().await.running.clone()
    }

    pub async fn format_summary(&self) -> String {
        summary::render(&*self.snapshot().await)
    }

    /// Copy of the diff baseline, for diagnostics and tests.
    pub async fn baseline(&self) -> Baseline {
        self.baseline.lock().await.clone()
    }
}

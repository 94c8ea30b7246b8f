use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::models::Job;
use crate::core::source::{ApiCode, AuthError, Credentials, FetchError, JobSource, SessionToken};

const SIMULATED_HOST: &str = "simulated";

#[derive(Default)]
struct SimulatedState {
    jobs: Vec<Job>,
    reject_login: bool,
    reject_listing: bool,
    logins: usize,
}

/// In-memory job source driven by a [`Simulator`] handle.
pub struct SimulatedSource {
    state: Arc<Mutex<SimulatedState>>,
}

/// Controller for a [`SimulatedSource`]; cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct Simulator {
    state: Arc<Mutex<SimulatedState>>,
}

fn lock(state: &Mutex<SimulatedState>) -> MutexGuard<'_, SimulatedState> {
    // A panicking test thread must not wedge the other handle.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedSource {
    pub fn new() -> (Self, Simulator) {
        let state = Arc::new(Mutex::new(SimulatedState::default()));
        (
            Self {
                state: state.clone(),
            },
            Simulator { state },
        )
    }
}

impl Simulator {
    /// Insert a job or change the status of an existing one, keeping listing order.
    pub fn set_job(&self, id: &str, status: &str) {
        let mut state = lock(&self.state);
        match state.jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => job.status = status.to_string(),
            None => state.jobs.push(Job {
                id: id.to_string(),
                title: format!("simulated-{}", id),
                status: status.to_string(),
                size: 512 * 1024 * 1024,
                kind: "http".to_string(),
                username: "simulator".to_string(),
                additional: Default::default(),
            }),
        }
    }

    /// Replace the whole listing.
    pub fn set_jobs(&self, jobs: Vec<Job>) {
        lock(&self.state).jobs = jobs;
    }

    pub fn remove_job(&self, id: &str) {
        lock(&self.state).jobs.retain(|job| job.id != id);
    }

    pub fn reject_login(&self, reject: bool) {
        lock(&self.state).reject_login = reject;
    }

    pub fn reject_listing(&self, reject: bool) {
        lock(&self.state).reject_listing = reject;
    }

    /// Number of login attempts seen so far.
    pub fn logins(&self) -> usize {
        lock(&self.state).logins
    }
}

#[async_trait]
impl JobSource for SimulatedSource {
    fn host(&self) -> &str {
        SIMULATED_HOST
    }

    async fn login(&self, _credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let mut state = lock(&self.state);
        state.logins += 1;
        if state.reject_login {
            return Err(AuthError::Rejected {
                host: SIMULATED_HOST.to_string(),
                code: ApiCode(Some(400)),
            });
        }
        Ok(SessionToken::new(format!("sim-{}", state.logins)))
    }

    async fn list_jobs(&self, _session: &SessionToken) -> Result<Vec<Job>, FetchError> {
        let state = lock(&self.state);
        if state.reject_listing {
            return Err(FetchError::Rejected {
                host: SIMULATED_HOST.to_string(),
                code: ApiCode(Some(106)),
            });
        }
        Ok(state.jobs.clone())
    }
}

//! RPC method handlers.
//!
//! Every method is a read of the monitor's published state; none of them wait on a
//! poll cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use crate::context::AppContext;

use super::protocol::{JOB_NOT_FOUND, Request, Response};

pub struct MethodHandler {
    ctx: AppContext,
    start_time: Instant,
}

/// Result of `daemon.status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub version: String,
    pub uptime_secs: u64,
    pub remote: String,
    pub poll_interval_secs: u64,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub job_count: usize,
    pub has_active_jobs: bool,
    pub simulation: bool,
}

impl MethodHandler {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            start_time: Instant::now(),
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        let id = request.id.clone().unwrap_or(Value::Null);
        let params = request.params.unwrap_or(Value::Null);

        match request.method.as_str() {
            "daemon.status" => self.daemon_status(id).await,
            "monitor.summary" => Response::success(id, self.ctx.monitor.format_summary().await),
            "monitor.active" => Response::success(id, self.ctx.monitor.has_active_jobs().await),
            "monitor.snapshot" => Response::success(id, &*self.ctx.monitor.snapshot().await),
            "monitor.job" => self.monitor_job(id, params).await,
            _ => Response::method_not_found(id, &request.method),
        }
    }

    async fn daemon_status(&self, id: Value) -> Response {
        let snapshot = self.ctx.monitor.snapshot().await;
        let config = &self.ctx.config;

        Response::success(
            id,
            DaemonStatus {
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: self.start_time.elapsed().as_secs(),
                remote: config.remote.base_url(),
                poll_interval_secs: config.monitor.poll_interval_secs,
                last_polled_at: snapshot.polled_at,
                job_count: snapshot.jobs.len(),
                has_active_jobs: self.ctx.monitor.has_active_jobs().await,
                simulation: config.simulation,
            },
        )
    }

    /// A single job from the current snapshot.
    async fn monitor_job(&self, id: Value, params: Value) -> Response {
        #[derive(Deserialize)]
        struct Params {
            id: String,
        }

        let params: Params = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return Response::invalid_params(id, e.to_string()),
        };

        let snapshot = self.ctx.monitor.snapshot().await;
        match snapshot.jobs.iter().find(|job| job.id == params.id) {
            Some(job) => Response::success(id, job),
            None => Response::error(id, JOB_NOT_FOUND, format!("Job not found: {}", params.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{SimulatedSource, Simulator};
    use crate::config::AppConfig;
    use crate::core::StatusMonitor;
    use crate::core::notifications::LogNotifier;
    use crate::rpc::protocol::{INVALID_PARAMS, METHOD_NOT_FOUND};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn handler() -> (MethodHandler, Simulator) {
        let (source, sim) = SimulatedSource::new();
        let config = AppConfig::default();
        let monitor = StatusMonitor::new(
            Arc::new(source),
            config.credentials(),
            Arc::new(LogNotifier),
            Vec::new(),
            Duration::from_secs(300),
        );
        (MethodHandler::new(AppContext::new(config, monitor)), sim)
    }

    fn call(method: &str, params: Option<Value>) -> Request {
        Request::new(method, params, json!(1))
    }

    #[tokio::test]
    async fn test_summary_before_first_poll() {
        let (handler, _sim) = handler();
        let resp = handler.handle(call("monitor.summary", None)).await;
        assert_eq!(resp.result, Some(json!("No download tasks found.")));
    }

    #[tokio::test]
    async fn test_job_lookup() {
        let (handler, sim) = handler();
        sim.set_job("dbid_7", "downloading");
        handler.ctx.monitor.poll_once().await;

        let resp = handler
            .handle(call("monitor.job", Some(json!({"id": "dbid_7"}))))
            .await;
        assert_eq!(resp.result.unwrap()["status"], "downloading");

        let resp = handler
            .handle(call("monitor.job", Some(json!({"id": "missing"}))))
            .await;
        assert_eq!(resp.error.unwrap().code, JOB_NOT_FOUND);

        let resp = handler.handle(call("monitor.job", None)).await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_daemon_status_reports_poll() {
        let (handler, sim) = handler();
        sim.set_job("a", "downloading");
        handler.ctx.monitor.poll_once().await;

        let resp = handler.handle(call("daemon.status", None)).await;
        let status: DaemonStatus = serde_json::from_value(resp.result.unwrap()).unwrap();

        assert_eq!(status.job_count, 1);
        assert!(status.has_active_jobs);
        assert!(status.last_polled_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (handler, _sim) = handler();
        let resp = handler.handle(call("jobs.delete", None)).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }
}

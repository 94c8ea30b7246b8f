//! JSON-RPC 2.0 status interface over TCP.
//!
//! Methods (all read-only):
//! - `daemon.status`: version, uptime, remote, last poll time, job count
//! - `monitor.summary`: the formatted status report
//! - `monitor.active`: whether any job is currently running
//! - `monitor.snapshot`: the latest snapshot as JSON
//! - `monitor.job`: one job by `{"id": ...}`

pub mod client;
pub mod methods;
mod protocol;
mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

pub use client::{ClientError, RpcClient};
pub use methods::{DaemonStatus, MethodHandler};
pub use protocol::{Request, Response, RpcError};

pub struct RpcServer {
    listener: TcpListener,
    handler: Arc<MethodHandler>,
}

impl RpcServer {
    pub async fn bind(ctx: AppContext, addr: SocketAddr) -> anyhow::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            handler: Arc::new(MethodHandler::new(ctx)),
        })
    }

    /// Actual bound address; differs from the requested one when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        transport::serve(self.listener, self.handler, shutdown).await
    }
}

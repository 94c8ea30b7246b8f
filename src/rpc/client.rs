use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::protocol::{Request, Response, RpcError};

/// One-request-per-connection client for the daemon's RPC port.
pub struct RpcClient {
    addr: SocketAddr,
    next_id: AtomicU64,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to daemon at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("communication error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("daemon closed the connection without replying")]
    NoReply,
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),
}

impl RpcClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let stream = TcpStream::connect(self.addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr,
                source,
            })?;
        let (reader, mut writer) = stream.into_split();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_vec(&Request::new(method, params, id.into()))?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;

        let line = BufReader::new(reader)
            .lines()
            .next_line()
            .await?
            .ok_or(ClientError::NoReply)?;
        let response: Response = serde_json::from_str(&line)?;

        if let Some(error) = response.error {
            return Err(ClientError::Rpc(error));
        }
        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }
}

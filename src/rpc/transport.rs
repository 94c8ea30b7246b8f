//! Newline-delimited JSON over TCP, one task per connection.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::methods::MethodHandler;
use super::protocol::{Request, Response};

pub async fn serve(
    listener: TcpListener,
    handler: Arc<MethodHandler>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "RPC server listening");

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("RPC server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "Failed to accept RPC connection");
                    continue;
                }
            },
        };

        let handler = handler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                result = handle_connection(stream, peer, handler) => {
                    if let Err(e) = result {
                        debug!(%peer, error = %e, "RPC connection error");
                    }
                }
            }
            debug!(%peer, "RPC client disconnected");
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<MethodHandler>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Err(e) => {
                warn!(%peer, error = %e, "Unparseable RPC request");
                Response::parse_error()
            }
            Ok(request) => {
                let id = request.id.clone().unwrap_or(serde_json::Value::Null);
                if let Err(reason) = request.validate() {
                    Response::invalid_request(id, reason)
                } else if request.is_notification() {
                    // Every method is a read, so a notification has nothing to do.
                    debug!(%peer, method = %request.method, "Ignoring RPC notification");
                    continue;
                } else {
                    handler.handle(request).await
                }
            }
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
    }

    Ok(())
}

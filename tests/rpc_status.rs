use std::sync::Arc;
use std::time::Duration;

use dsmon::adapters::SimulatedSource;
use dsmon::config::AppConfig;
use dsmon::context::AppContext;
use dsmon::core::StatusMonitor;
use dsmon::core::notifications::LogNotifier;
use dsmon::rpc::{ClientError, DaemonStatus, RpcClient, RpcServer};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_status_round_trip() {
    let (source, sim) = SimulatedSource::new();
    let config = AppConfig {
        simulation: true,
        ..AppConfig::default()
    };
    let monitor = StatusMonitor::new(
        Arc::new(source),
        config.credentials(),
        Arc::new(LogNotifier),
        Vec::new(),
        Duration::from_secs(300),
    );
    let ctx = AppContext::new(config, monitor);

    let server = RpcServer::bind(ctx.clone(), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let server_task = tokio::spawn(server.run(shutdown.clone()));

    let client = RpcClient::new(addr);

    let active: bool = client.call("monitor.active", None).await.unwrap();
    assert!(!active);

    sim.set_job("dbid_1", "downloading");
    ctx.monitor.poll_once().await;

    let summary: String = client.call("monitor.summary", None).await.unwrap();
    assert!(summary.contains("📦 simulated-dbid_1"));
    assert!(summary.contains("Status: downloading"));

    let active: bool = client.call("monitor.active", None).await.unwrap();
    assert!(active);

    let snapshot: Value = client.call("monitor.snapshot", None).await.unwrap();
    assert_eq!(snapshot["jobs"][0]["id"], "dbid_1");
    assert!(snapshot["polled_at"].is_string());

    let status: DaemonStatus = client.call("daemon.status", None).await.unwrap();
    assert_eq!(status.job_count, 1);
    assert!(status.simulation);

    let err = client
        .call::<Value>("monitor.job", Some(json!({"id": "nope"})))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rpc(_)));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server did not shut down")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_garbage_line_gets_parse_error() {
    let (source, _sim) = SimulatedSource::new();
    let config = AppConfig::default();
    let monitor = StatusMonitor::new(
        Arc::new(source),
        config.credentials(),
        Arc::new(LogNotifier),
        Vec::new(),
        Duration::from_secs(300),
    );
    let server = RpcServer::bind(
        AppContext::new(config, monitor),
        "127.0.0.1:0".parse().unwrap(),
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(server.run(shutdown.clone()));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer.write_all(b"not json\n").await.unwrap();

    let line = BufReader::new(reader)
        .lines()
        .next_line()
        .await
        .unwrap()
        .unwrap();
    let response: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);

    shutdown.cancel();
}

#[tokio::test]
async fn test_client_reports_unreachable_daemon() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let err = RpcClient::new(addr)
        .call::<String>("monitor.summary", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
}

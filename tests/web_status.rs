use std::sync::Arc;
use std::time::Duration;

use dsmon::adapters::SimulatedSource;
use dsmon::config::AppConfig;
use dsmon::context::AppContext;
use dsmon::core::StatusMonitor;
use dsmon::core::notifications::LogNotifier;
use dsmon::web;
use serde_json::Value;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_http_status_routes() {
    let (source, sim) = SimulatedSource::new();
    let config = AppConfig::default();
    let monitor = StatusMonitor::new(
        Arc::new(source),
        config.credentials(),
        Arc::new(LogNotifier),
        Vec::new(),
        Duration::from_secs(300),
    );
    let ctx = AppContext::new(config, monitor);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let router = web::router(ctx.clone());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let http = reqwest::Client::new();

    let text = http.get(format!("{base}/status")).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "No download tasks found.");

    sim.set_job("x", "extracting");
    ctx.monitor.poll_once().await;

    let text = http.get(format!("{base}/status")).send().await.unwrap().text().await.unwrap();
    assert!(text.contains("Status: extracting"));

    let active: Value = http
        .get(format!("{base}/api/active"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active["active"], true);

    let snapshot: Value = http
        .get(format!("{base}/api/snapshot"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["jobs"].as_array().map(Vec::len), Some(1));
    assert_eq!(snapshot["jobs"][0]["type"], "http");
}

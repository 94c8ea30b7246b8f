use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dsmon::core::notifications::create_notifier;
use dsmon::core::{CycleOutcome, StatusMonitor};
use dsmon::logging::{self, LogConfig};
use dsmon::rpc::{RpcClient, RpcServer};
use dsmon::{adapters, config::AppConfig, context::AppContext, web};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "dsmon")]
#[command(about = "Download Station status monitor with chat alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the remote forever, alerting admins on status changes
    Daemon(ServerArgs),
    /// Print the summary held by a running daemon
    Status {
        #[arg(long, default_value = "127.0.0.1:7420")]
        rpc_addr: SocketAddr,
    },
    /// Poll the remote once and print the summary
    Check(ServerArgs),
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[command(flatten)]
    remote: RemoteArgs,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    rpc_bind: Option<SocketAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    http_bind: Option<SocketAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    simulation: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    json_logs: Option<bool>,
}

#[derive(Args, Serialize)]
struct RemoteArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    scheme: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Daemon(args) => {
            let config = load_config(args)?;
            run_daemon(config).await.context("Daemon failed")
        }
        Commands::Check(args) => {
            let config = load_config(args)?;
            run_check(config).await.context("Status check failed")
        }
        Commands::Status { rpc_addr } => run_status(*rpc_addr)
            .await
            .context("Failed to query the daemon"),
    }
}

fn load_config(args: &ServerArgs) -> Result<AppConfig> {
    let config = AppConfig::new(Some(args))?;
    logging::init(LogConfig {
        json: config.json_logs,
        verbose: config.verbose,
    });
    for value in &config.notifications.admin_users.ignored {
        tracing::warn!(value = %value, "Ignoring invalid admin user id");
    }
    Ok(config)
}

fn build_monitor(config: &AppConfig) -> Result<StatusMonitor> {
    let source = adapters::get_source(config)?;
    let notifier =
        create_notifier(&config.notifications).context("Failed to build chat HTTP client")?;

    if config.notifications.admin_users.ids.is_empty() {
        tracing::warn!("No admin users configured; status changes will only be logged");
    }

    Ok(StatusMonitor::new(
        source,
        config.credentials(),
        notifier,
        config.notifications.admin_users.ids.clone(),
        config.poll_interval(),
    ))
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let monitor = build_monitor(&config)?;
    let ctx = AppContext::new(config, monitor);
    let shutdown = CancellationToken::new();

    let rpc = RpcServer::bind(ctx.clone(), ctx.config.rpc_bind)
        .await
        .with_context(|| format!("Failed to bind RPC server on {}", ctx.config.rpc_bind))?;
    let rpc_task = tokio::spawn(rpc.run(shutdown.clone()));

    let http_task = ctx
        .config
        .http_bind
        .map(|addr| tokio::spawn(web::serve(ctx.clone(), addr, shutdown.clone())));

    let poller = ctx.monitor.clone().start(shutdown.clone());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");
    shutdown.cancel();

    poller.await.context("Monitor task panicked")?;
    rpc_task.await.context("RPC task panicked")??;
    if let Some(task) = http_task {
        task.await.context("HTTP task panicked")??;
    }

    Ok(())
}

async fn run_check(config: AppConfig) -> Result<()> {
    let monitor = build_monitor(&config)?;

    match monitor.poll_once().await {
        CycleOutcome::Completed { jobs, .. } => {
            tracing::debug!(jobs, "Fetched tasks");
            println!("{}", monitor.format_summary().await);
            Ok(())
        }
        CycleOutcome::Skipped(e) => Err(e.into()),
    }
}

async fn run_status(addr: SocketAddr) -> Result<()> {
    let client = RpcClient::new(addr);
    let summary: String = client.call("monitor.summary", None).await?;
    println!("{}", summary);
    Ok(())
}

//! taskid-sync - queue checkpoint reconciliation service
//!
//! # Usage
//!
//! ```bash
//! # Background service: poll today's pending bookings
//! taskid-sync run
//!
//! # Manual batches
//! taskid-sync batch autoorder --today
//! taskid-sync batch updatewaktu --date 2024-03-04
//! taskid-sync batch all --today --rebuild
//! taskid-sync batch retry-task --today --task 3
//!
//! # Connectivity check
//! taskid-sync status
//! ```
//!
//! Configuration is read from `config.yaml` (or `--config`) and `TASKID_*`
//! environment variables; a `.env` file is loaded first when present.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use core_kernel::temporal::parse_date;
use core_kernel::HealthCheckable;
use domain_queue::TaskId;
use interface_service::config::{ServiceConfig, DEFAULT_CONFIG_FILE};
use interface_service::context::ServiceContext;
use interface_service::{create_router, BatchKind, BatchOptions};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "taskid-sync", version, about = "Reconciles and reports queue task times")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the background watcher (and the status API when enabled)
    Run,
    /// Run a manual batch over one service date
    Batch {
        #[arg(value_enum)]
        kind: BatchArg,
        /// Use today's date
        #[arg(long, conflicts_with = "date")]
        today: bool,
        /// Service date, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Task number for retry-task
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=7))]
        task: u8,
        /// Delete every persisted row, confirmed ones included, before auto-ordering
        #[arg(long)]
        rebuild: bool,
    },
    /// Check database and queue service connectivity
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BatchArg {
    Autoorder,
    Updatewaktu,
    All,
    RetryTask,
}

impl From<BatchArg> for BatchKind {
    fn from(arg: BatchArg) -> Self {
        match arg {
            BatchArg::Autoorder => BatchKind::AutoOrder,
            BatchArg::Updatewaktu => BatchKind::UpdateTime,
            BatchArg::All => BatchKind::All,
            BatchArg::RetryTask => BatchKind::RetryTask,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ServiceConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    init_tracing(&config.log_level);

    match cli.command {
        Command::Run => run_service(config).await,
        Command::Batch {
            kind,
            today,
            date,
            task,
            rebuild,
        } => {
            let task = TaskId::from_number(i64::from(task))?;
            run_batch(config, kind.into(), today, date, BatchOptions { task, rebuild }).await
        }
        Command::Status => check_status(config).await,
    }
}

/// Initializes the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn run_service(config: ServiceConfig) -> anyhow::Result<()> {
    let context = ServiceContext::connect(config).await?;

    let watcher = context.watcher();
    let handle = watcher.start();

    let shutdown = CancellationToken::new();
    let api = if context.config.api.enabled {
        let addr = context.config.api.server_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind status API on {addr}"))?;
        tracing::info!(%addr, "Status API listening");

        let app = create_router(context.app_state());
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        }))
    } else {
        None
    };

    shutdown_signal().await;
    tracing::info!("Shutting down");

    watcher.stop();
    shutdown.cancel();
    handle.await.context("watcher task failed")?;
    if let Some(api) = api {
        api.await.context("status API task failed")??;
    }

    context.pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_batch(
    config: ServiceConfig,
    kind: BatchKind,
    today: bool,
    date: Option<String>,
    options: BatchOptions,
) -> anyhow::Result<()> {
    let timezone = config.service.timezone()?;
    let date: NaiveDate = match (today, date) {
        (true, _) => timezone.today(),
        (false, Some(raw)) => parse_date(&raw)?,
        (false, None) => bail!("use --today or --date YYYY-MM-DD"),
    };

    let context = ServiceContext::connect(config).await?;
    let summary = context.batch_runner().run(kind, date, options).await?;

    println!(
        "\nResult: {}/{} {} for {}",
        summary.succeeded, summary.total, kind, summary.date
    );
    context.pool.close().await;
    Ok(())
}

async fn check_status(config: ServiceConfig) -> anyhow::Result<()> {
    let context = match ServiceContext::connect(config).await {
        Ok(context) => context,
        Err(e) => {
            println!("Not ready: {e}");
            return Ok(());
        }
    };

    println!("Database: connected");
    let service = context.client.health_check().await;
    match service.message {
        Some(message) => println!("Queue service: {:?} ({message})", service.status),
        None => println!("Queue service: {:?} ({} ms)", service.status, service.latency_ms),
    }

    let today = context.reports.summary(context.timezone.today()).await?;
    println!(
        "Today: {} processed, {} success, {} failed",
        today.processed, today.success, today.failed
    );

    context.pool.close().await;
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

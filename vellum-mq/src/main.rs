//! vellum-mq (Moderation Queue) - service entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vellum_common::config::{self, ConfigOverrides, ServiceConfig};
use vellum_common::db::{get_setting, init_database};
use vellum_common::EventBus;
use vellum_mq::pipeline::EffectRelay;
use vellum_mq::services::{AnalysisTrigger, AnalyzerClient};
use vellum_mq::{build_router, AppState};

/// Command-line arguments for vellum-mq
#[derive(Parser, Debug)]
#[command(name = "vellum-mq")]
#[command(about = "Moderation queue service for Vellum")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Folder holding the record store
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Base URL of the analyzer service
    #[arg(long)]
    analyzer_url: Option<String>,

    /// TOML config file (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => Some(
            config::read_toml_config(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
        ),
        None => config::load_toml_config(),
    };

    let config = ServiceConfig::resolve(
        ConfigOverrides {
            root_folder: args.root_folder,
            port: args.port,
            analyzer_base_url: args.analyzer_url,
        },
        file_config,
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "vellum_mq={level},vellum_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Vellum Moderation Queue (vellum-mq) v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Root folder: {}", config.root_folder.display());

    config
        .ensure_root_folder()
        .context("Failed to create root folder")?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let event_bus = EventBus::new(config.event_capacity);

    let analyzer_timeout: u64 = get_setting(&pool, "analyzer_timeout_secs", 10).await?;
    let client = AnalyzerClient::new(
        config.analyzer_base_url.clone(),
        Duration::from_secs(analyzer_timeout),
    )
    .context("Failed to build analyzer client")?;
    info!("Analyzer: {}", client.base_url());

    let categories = Some(config.analyzable_categories.clone());
    let trigger = AnalysisTrigger::new(client, event_bus.clone(), categories);

    if get_setting(&pool, "triage_sweep_on_startup", true).await? {
        if let Err(e) = trigger.sweep(&pool).await {
            warn!("Startup analysis sweep failed: {}", e);
        }
    }
    trigger.spawn_watcher(pool.clone());

    let state = AppState::new(pool.clone(), event_bus, trigger);
    spawn_outbox_relay(state.pipeline.relay().clone(), &pool).await?;

    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("vellum-mq listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Periodically retry decision follow-ups left in the outbox
async fn spawn_outbox_relay(relay: EffectRelay, pool: &sqlx::SqlitePool) -> Result<()> {
    let interval_secs: u64 = get_setting(pool, "outbox_retry_interval_secs", 30).await?;
    let batch_size: i64 = get_setting(pool, "outbox_batch_size", 100).await?;
    info!(interval_secs, batch_size, "Outbox relay started");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = relay.drain(batch_size).await {
                warn!("Outbox drain failed: {}", e);
            }
        }
    });

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

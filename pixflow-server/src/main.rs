//! pixflow server
//!
//! Receives DigitoPay PIX webhooks and settles deposits and withdrawals
//! against user balances.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use pixflow_core::debug_log::DebugLogger;
use pixflow_core::framework::DatabaseProcessor;
use pixflow_core::gateway::{DigitoPayClient, StatusPoller};
use pixflow_core::processors::{DebugLogWriter, Reconciler};
use pixflow_core::store::PgLedgerStore;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// pixflow - DigitoPay PIX reconciliation service
#[derive(Parser, Debug)]
#[command(name = "pixflow-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./pixflow-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting pixflow-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    if loaded_config.webhook.secret.is_none() {
        tracing::warn!(
            "No webhook secret configured, unsigned webhooks are accepted as settlement triggers"
        );
    }
    tracing::info!("Configuration loaded from {:?}", args.config);

    let shared_config = loaded_config.into_shared();

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let db = DatabaseProcessor {
        pool: db_pool.clone(),
    };

    // Debug log: handle for producers, background writer for persistence
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (debug_log, debug_log_rx) = DebugLogger::new(Arc::new(db.clone()));
    let writer_handle = tokio::spawn(
        DebugLogWriter::new(Arc::new(db.clone()), debug_log_rx, shutdown_rx).run(),
    );

    let gateway = DigitoPayClient::new(shared_config.gateway.clone());
    let poller = StatusPoller::new(Arc::new(gateway), debug_log.clone());
    let reconciler = Reconciler::new(
        Arc::new(PgLedgerStore::new(db.clone())),
        debug_log.clone(),
    );

    let state = AppState {
        db,
        config: shared_config,
        reconciler: Arc::new(reconciler),
        poller,
        debug_log,
    };

    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    shutdown_notify.notify_one();

    // Flush queued debug log entries before the pool goes away
    let _ = shutdown_tx.send(true);
    if let Err(e) = writer_handle.await {
        tracing::error!("Debug log writer task failed: {}", e);
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

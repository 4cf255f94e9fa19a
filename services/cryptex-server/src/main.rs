//! Cryptex API Server
//!
//! Serves the trading REST API and the order event stream, and runs the
//! outbox dispatcher that feeds it.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (config/default.toml, development mode)
//! cryptex-server
//!
//! # Start with a custom config file
//! cryptex-server --config /etc/cryptex/production.toml
//!
//! # Environment overrides
//! CRYPTEX__SERVER__PORT=8080 cryptex-server
//!
//! # Operator tooling
//! cryptex-server deposit --wallet <uuid> --amount 10.5
//! cryptex-server set-wallet-status --wallet <uuid> --status suspended
//! cryptex-server issue-token --user <uuid>
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::{watch, Notify};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use cryptex_api::{create_router, AppState};
use cryptex_auth::JwtService;
use cryptex_db::Database;
use cryptex_settlement::{
    BroadcastNotifier, ChannelMatcher, Matcher, NoopMatcher, OutboxDispatcher, OutboxWaker,
    SettlementGuard,
};
use cryptex_types::{parse_positive, to_atoms, WalletStatus};

use crate::config::{Environment, LoggingConfig, ServerConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Cryptex exchange API server
#[derive(Parser, Debug)]
#[command(name = "cryptex-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "CRYPTEX_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "CRYPTEX_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CRYPTEX_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CRYPTEX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "CRYPTEX_LOG_FORMAT")]
    log_format: Option<String>,

    /// SQLite connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// JWT secret key
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Force development mode (error details, relaxed secret check)
    #[arg(long, env = "CRYPTEX_DEV_MODE")]
    dev_mode: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the API server (default)
    Serve,
    /// Credit funds to a wallet
    Deposit {
        #[arg(long)]
        wallet: Uuid,
        /// Decimal amount, e.g. `10.5`
        #[arg(long)]
        amount: String,
    },
    /// Set a wallet's status; only active wallets accept new orders
    SetWalletStatus {
        #[arg(long)]
        wallet: Uuid,
        /// `active`, `inactive` or `suspended`
        #[arg(long)]
        status: WalletStatus,
    },
    /// Print a bearer token for a user
    IssueToken {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        email: Option<String>,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    apply_overrides(&mut server_config, &args);

    init_logging(&server_config.logging)?;

    let secret_configured = !server_config.auth.secret.is_empty();
    validate_config(&mut server_config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(server_config).await,
        Command::Deposit { wallet, amount } => deposit(&server_config, wallet, &amount).await,
        Command::SetWalletStatus { wallet, status } => {
            set_wallet_status(&server_config, wallet, status).await
        }
        Command::IssueToken { user, email } => {
            if !secret_configured {
                anyhow::bail!("No JWT secret configured, a token signed now would not be accepted");
            }
            let jwt = JwtService::new(server_config.auth.clone());
            println!("{}", jwt.issue(user, email.as_deref())?);
            Ok(())
        }
    }
}

fn apply_overrides(config: &mut ServerConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = &args.database_url {
        config.database.url = url.clone();
    }
    if let Some(secret) = &args.jwt_secret {
        config.auth.secret = secret.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.logging.format = format.clone();
    }
    if args.dev_mode {
        config.server.environment = Environment::Development;
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting Cryptex API Server"
    );

    let db = init_database(&config).await?;

    if config.metrics.enabled {
        start_metrics_exporter(config.metrics.port)?;
    }

    let notifier = BroadcastNotifier::new(config.settlement.notifier_capacity);
    let waker = OutboxWaker::new();
    let matcher = init_matcher(config.settlement.matcher_queue);
    let guard = SettlementGuard::new(db.clone(), matcher, waker.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = OutboxDispatcher::new(
        db.clone(),
        Arc::new(notifier.clone()),
        waker,
        config.settlement.outbox.clone(),
    )
    .spawn(shutdown_rx);

    let jwt = Arc::new(JwtService::new(config.auth.clone()));
    let state = Arc::new(AppState::new(db, guard, notifier, jwt));
    let app = create_router(state, config.api_config());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, "Server listening");

    let signalled = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let signalled = signalled.clone();
        async move {
            shutdown_signal().await;
            signalled.notify_one();
        }
    });

    let grace = config.server.shutdown_timeout();
    tokio::select! {
        result = async { server.await } => result?,
        _ = async {
            signalled.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                timeout_secs = grace.as_secs(),
                "In-flight requests did not finish in time, closing connections"
            );
        }
    }

    // Stop the dispatcher after the last request so their events go out
    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatcher.await {
        tracing::error!(error = %e, "Outbox dispatcher task failed");
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn deposit(config: &ServerConfig, wallet_id: Uuid, amount: &str) -> anyhow::Result<()> {
    let amount = to_atoms(parse_positive("amount", amount)?)?;
    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let wallet = db.wallet_repo().deposit(wallet_id, amount, None).await?;
    tracing::info!(
        wallet_id = %wallet.id,
        currency = %wallet.currency,
        balance = wallet.balance,
        available = wallet.available_balance,
        "Deposit credited"
    );

    Ok(())
}

async fn set_wallet_status(
    config: &ServerConfig,
    wallet_id: Uuid,
    status: WalletStatus,
) -> anyhow::Result<()> {
    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let wallet = db.wallet_repo().set_status(wallet_id, status).await?;
    tracing::info!(
        wallet_id = %wallet.id,
        currency = %wallet.currency,
        status = %wallet.status,
        "Wallet status updated"
    );

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true))
            .try_init()?,
    }

    Ok(())
}

/// Validate configuration
fn validate_config(config: &mut ServerConfig) -> anyhow::Result<()> {
    if config.server.environment.is_production() {
        config
            .auth
            .validate()
            .context("Set JWT_SECRET or CRYPTEX__AUTH__SECRET for production")?;
    } else if config.auth.secret.is_empty() {
        // Tokens signed with this secret die with the process
        let bytes: [u8; 32] = rand::random();
        config.auth.secret = hex::encode(bytes);
        tracing::warn!("No JWT secret configured, using an ephemeral development secret");
    } else if config.auth.validate().is_err() {
        tracing::warn!("JWT secret is shorter than recommended");
    }

    if config.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be at least 1");
    }

    Ok(())
}

/// Connect, migrate and seed trading pairs
async fn init_database(config: &ServerConfig) -> anyhow::Result<Database> {
    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let health = db.health_check().await;
    if !health.healthy {
        anyhow::bail!("Database health check failed");
    }

    let repo = db.trading_pair_repo();
    for seed in &config.trading_pairs {
        let pair = repo
            .upsert(
                &seed.symbol,
                &seed.base_currency,
                &seed.quote_currency,
                to_atoms(seed.maker_fee)?,
                to_atoms(seed.taker_fee)?,
            )
            .await
            .with_context(|| format!("Failed to seed trading pair {}", seed.symbol))?;
        tracing::info!(id = pair.id, symbol = %pair.symbol, "Trading pair ready");
    }

    Ok(db)
}

/// Hand order ids to a matching engine queue, or drop them when none is configured
fn init_matcher(queue: usize) -> Arc<dyn Matcher> {
    if queue == 0 {
        return Arc::new(NoopMatcher);
    }

    let (matcher, mut orders) = ChannelMatcher::new(queue);
    tokio::spawn(async move {
        while let Some(order_id) = orders.recv().await {
            tracing::debug!(%order_id, "Match requested");
        }
    });
    Arc::new(matcher)
}

/// Start Prometheus metrics exporter
fn start_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to start metrics exporter")?;

    tracing::info!(port, "Metrics exporter started");
    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    tracing::info!("Waiting for in-flight requests to complete...");
}

// =============================================================================
// Tests
// =============================================================================

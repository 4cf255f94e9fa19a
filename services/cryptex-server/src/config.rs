//! Server Configuration
//!
//! Layered from `config/default`, `config/local`, an optional `--config`
//! file and `CRYPTEX__SECTION__KEY` environment variables, in that order of
//! increasing precedence. CLI flags are applied on top by `main`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use cryptex_api::ApiConfig;
use cryptex_auth::JwtConfig;
use cryptex_db::DatabaseConfig;
use cryptex_settlement::OutboxConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub database: DatabaseConfig,
    pub auth: JwtConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub settlement: SettlementSettings,
    pub metrics: MetricsConfig,
    /// Pairs upserted at startup
    pub trading_pairs: Vec<TradingPairSeed>,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Server binding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Grace period for in-flight requests after a shutdown signal
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (`info`, `cryptex_settlement=debug`)
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementSettings {
    pub outbox: OutboxConfig,
    /// Buffered events per `/api/ws` subscriber
    pub notifier_capacity: usize,
    /// Queue size for order ids handed to a matching engine; 0 disables it
    pub matcher_queue: usize,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            outbox: OutboxConfig::default(),
            notifier_capacity: 1024,
            matcher_queue: 0,
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// A trading pair to create or refresh at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingPairSeed {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
}

impl ServerConfig {
    /// Load configuration from files and the environment
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CRYPTEX")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("api.cors_origins"),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// API router settings for this environment
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            expose_error_details: !self.server.environment.is_production(),
            ..self.api.clone()
        }
    }
}

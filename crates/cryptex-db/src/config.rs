//! Database configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL (`sqlite://path/to/file.db`)
    pub url: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Minimum pool connections
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,
    /// How long a writer waits for the SQLite write lock, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://cryptex.db".to_string()),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
            busy_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    /// Create config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT", defaults.acquire_timeout_secs),
            busy_timeout_ms: env_or("DB_BUSY_TIMEOUT_MS", defaults.busy_timeout_ms),
            ..defaults
        }
    }

    /// Config pointing at a database file on disk
    pub fn sqlite_file(path: &Path) -> Self {
        Self {
            url: format!("sqlite://{}", path.display()),
            ..Self::default()
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_url() {
        let config = DatabaseConfig::sqlite_file(Path::new("/tmp/cryptex/test.db"));
        assert_eq!(config.url, "sqlite:///tmp/cryptex/test.db");
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(env_or("CRYPTEX_TEST_UNSET_VARIABLE", 42u32), 42);
    }
}

//! Authentication configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

/// Shortest accepted HMAC secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// JWT token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens (at least 256 bits)
    #[serde(default)]
    pub secret: String,
    /// Lifetime of tokens issued by [`crate::JwtService::issue`]
    #[serde(with = "humantime_serde", default = "default_token_lifetime")]
    pub token_lifetime: Duration,
    /// Token issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Token audience claim
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Clock skew tolerated when checking `exp` / `nbf`, in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

fn default_token_lifetime() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_issuer() -> String {
    "cryptex".to_string()
}

fn default_audience() -> String {
    "cryptex-api".to_string()
}

fn default_leeway() -> u64 {
    30
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(), // Must be set in production
            token_lifetime: default_token_lifetime(),
            issuer: default_issuer(),
            audience: default_audience(),
            leeway_secs: default_leeway(),
        }
    }
}

impl JwtConfig {
    /// Reject secrets too short to sign with
    pub fn validate(&self) -> AuthResult<()> {
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        Ok(())
    }
}

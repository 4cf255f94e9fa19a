//! Cryptex Authentication Layer
//!
//! Bearer-token authentication for the trading API:
//!
//! - [`JwtService`] verifies HS256 tokens (issuer, audience, expiry)
//! - [`AuthLayer`] attaches the caller to each request it authenticates
//! - [`RequireAuth`] rejects handlers' requests that carry no caller with 401
//!
//! ```text
//! Request → AuthLayer ──valid token──► extensions += AuthenticatedUser → Handler
//!              │ no token ────────────────────────────────────────────► Handler
//!              └ bad token ──► 401 {message}
//! ```

pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod types;

pub use config::JwtConfig;
pub use error::{AuthError, AuthResult, ErrorResponse};
pub use jwt::JwtService;
pub use middleware::{auth_error_response, bearer_token, AuthLayer, AuthMiddleware, RequireAuth};
pub use types::{AuthenticatedUser, TokenClaims};

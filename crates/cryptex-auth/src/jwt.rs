//! JWT Token Service
//!
//! Verifies HS256 bearer tokens. Tokens are normally issued by the identity
//! service; [`JwtService::issue`] exists for development tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::types::{AuthenticatedUser, TokenClaims};

/// JWT service for token management
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Sign a token for `user_id`
    pub fn issue(&self, user_id: Uuid, email: Option<&str>) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now
            + Duration::from_std(self.config.token_lifetime)
                .map_err(|e| AuthError::Internal(e.to_string()))?;

        let claims = TokenClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to encode token: {}", e)))
    }

    /// Decode and validate a token
    pub fn validate(&self, token: &str) -> AuthResult<TokenClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = self.config.leeway_secs;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token and resolve the caller it identifies
    pub fn authenticate(&self, token: &str) -> AuthResult<AuthenticatedUser> {
        let claims = self.validate(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-jwt-tokens-min-32-bytes!".to_string(),
            token_lifetime: std::time::Duration::from_secs(900),
            issuer: "test-issuer".to_string(),
            audience: "test-audience".to_string(),
            leeway_secs: 0,
        }
    }

    #[test]
    fn test_issue_and_authenticate() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id, Some("trader@example.com")).unwrap();
        let user = service.authenticate(&token).unwrap();

        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email.as_deref(), Some("trader@example.com"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtService::new(test_config()).issue(Uuid::new_v4(), None).unwrap();
        let other = JwtService::new(JwtConfig {
            secret: "another-secret-key-that-is-long-enough!!".to_string(),
            ..test_config()
        });

        assert!(matches!(other.validate(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = JwtService::new(test_config()).issue(Uuid::new_v4(), None).unwrap();
        let other = JwtService::new(JwtConfig {
            audience: "someone-else".to_string(),
            ..test_config()
        });

        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new(test_config());
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: Uuid::new_v4().to_string(),
            email: None,
            iat: now - 3_600,
            exp: now - 1_800,
            nbf: now - 3_600,
            iss: "test-issuer".to_string(),
            aud: "test-audience".to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::default(), &claims, &service.encoding_key).unwrap();

        assert!(matches!(service.validate(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let service = JwtService::new(test_config());
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: "42".to_string(),
            email: None,
            iat: now,
            exp: now + 600,
            nbf: now,
            iss: "test-issuer".to_string(),
            aud: "test-audience".to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::default(), &claims, &service.encoding_key).unwrap();

        assert!(matches!(service.authenticate(&token), Err(AuthError::InvalidToken)));
    }
}

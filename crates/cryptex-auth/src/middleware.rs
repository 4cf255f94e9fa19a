//! Authentication middleware for Axum
//!
//! [`AuthLayer`] validates `Authorization: Bearer` tokens and stores the
//! caller in the request extensions. Requests without credentials pass
//! through untouched; handlers that need a caller use [`RequireAuth`].

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::Response,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

use crate::error::{AuthError, ErrorResponse};
use crate::jwt::JwtService;
use crate::types::AuthenticatedUser;

/// Authentication middleware layer
#[derive(Clone)]
pub struct AuthLayer {
    jwt: Arc<JwtService>,
}

impl AuthLayer {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            jwt: self.jwt.clone(),
        }
    }
}

/// Authentication middleware service
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    jwt: Arc<JwtService>,
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let jwt = self.jwt.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match authenticate_request(req.headers(), &jwt) {
                Ok(user) => {
                    let (mut parts, body) = req.into_parts();
                    parts.extensions.insert(user);
                    inner.call(Request::from_parts(parts, body)).await
                }
                // No credentials: the handler decides whether that is acceptable
                Err(AuthError::Unauthenticated) => inner.call(req).await,
                Err(e) => {
                    debug!(error = %e, "Rejected bearer token");
                    Ok(auth_error_response(e))
                }
            }
        })
    }
}

fn authenticate_request(headers: &HeaderMap, jwt: &JwtService) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?.ok_or(AuthError::Unauthenticated)?;
    jwt.authenticate(token)
}

/// Extract the token from an `Authorization: Bearer` header.
///
/// `Ok(None)` when the header is absent; a present but malformed header is
/// an [`AuthError::InvalidToken`].
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AuthError::InvalidToken),
    }
}

/// Create error response for authentication errors
pub fn auth_error_response(error: AuthError) -> Response {
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::to_string(&ErrorResponse::from(&error)).unwrap_or_default();

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

// =============================================================================
// Axum Extractors
// =============================================================================

/// Extractor for required authenticated user
/// Returns 401 if not authenticated
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or_else(|| auth_error_response(AuthError::Unauthenticated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap(), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "bearer  xyz".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), Some("xyz"));

        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidToken)));

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_err());
    }

    async fn echo_user(req: Request) -> Result<Response, std::convert::Infallible> {
        let body = req
            .extensions()
            .get::<AuthenticatedUser>()
            .map(|u| u.user_id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());
        Ok(Response::new(Body::from(body)))
    }

    async fn call_with(auth: Option<&str>) -> Response {
        use tower::ServiceExt;

        let jwt = Arc::new(JwtService::new(crate::JwtConfig {
            secret: "middleware-test-secret-at-least-32-bytes".to_string(),
            ..Default::default()
        }));
        let service = AuthLayer::new(jwt).layer(tower::service_fn(echo_user));

        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        service.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_attaches_user() {
        let jwt = JwtService::new(crate::JwtConfig {
            secret: "middleware-test-secret-at-least-32-bytes".to_string(),
            ..Default::default()
        });
        let user_id = uuid::Uuid::new_v4();
        let token = jwt.issue(user_id, None).unwrap();

        let response = call_with(Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, user_id.to_string());
    }

    #[tokio::test]
    async fn test_missing_token_passes_through() {
        let response = call_with(None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let response = call_with(Some("Bearer not-a-jwt")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, r#"{"message":"Invalid token"}"#);
    }

    #[test]
    fn test_auth_error_response() {
        let response = auth_error_response(AuthError::InvalidToken);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}

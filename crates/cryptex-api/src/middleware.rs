//! API Middleware

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use http::header::CONTENT_LENGTH;
use std::time::Instant;

use crate::error::ErrorDetails;

/// Rewrite error bodies to include their `details`.
///
/// Only installed when the server runs outside production.
pub async fn expose_error_details(response: Response) -> Response {
    let Some(ErrorDetails(body)) = response.extensions().get::<ErrorDetails>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Json(body).into_response().into_body())
}

/// Request timing middleware
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());

    if elapsed.as_millis() > 1000 {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %response.status(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow request"
        );
    }

    response
}

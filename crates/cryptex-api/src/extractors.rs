//! Custom Axum Extractors
//!
//! JSON bodies and query strings that are deserialized and then validated,
//! with failures answered in the API's error format.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// Query extractor with validation
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| error_response(ApiError::Validation(e.body_text())))?;

        value
            .validate()
            .map_err(|e| error_response(ApiError::from(e)))?;

        Ok(ValidatedQuery(value))
    }
}

/// JSON extractor with validation
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| error_response(ApiError::InvalidRequestBody(e.body_text())))?;

        value
            .validate()
            .map_err(|e| error_response(ApiError::from(e)))?;

        Ok(ValidatedJson(value))
    }
}

/// Create an error response
pub fn error_response(error: ApiError) -> Response {
    error.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct LimitParams {
        #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
        limit: i64,
    }

    #[tokio::test]
    async fn test_validated_query() {
        let (mut parts, _) = Request::builder()
            .uri("/x?limit=5")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let ValidatedQuery(params) = ValidatedQuery::<LimitParams>::from_request_parts(&mut parts, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(params.limit, 5);

        let (mut parts, _) = Request::builder()
            .uri("/x?limit=500")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let rejection = ValidatedQuery::<LimitParams>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_validated_json_rejects_malformed_body() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let rejection = ValidatedJson::<LimitParams>::from_request(req, &()).await.err().unwrap();
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }
}

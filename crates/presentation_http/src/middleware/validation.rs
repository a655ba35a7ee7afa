//! Request validation
//!
//! Provides a `ValidatedJson` extractor that validates request bodies using
//! the validator crate. Every rejection (missing content type, malformed
//! JSON, wrong shape, failed rule) answers 400.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use validator::Validate;

use crate::error::ErrorResponse;

/// Validation error type
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] JsonRejection),
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::JsonError(e) => e.body_text(),
            Self::ValidationFailed(msg) => msg.clone(),
        };
        tracing::debug!(error = %message, "Request body rejected");

        let body = ErrorResponse {
            error: message,
            code: "bad_request".to_string(),
        };

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// JSON extractor that runs the `validator` rules of the target type
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateTaskRequest {
///     #[validate(length(min = 1))]
///     title: String,
/// }
///
/// async fn create(ValidatedJson(req): ValidatedJson<CreateTaskRequest>) { /* ... */ }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;

        value.validate().map_err(|e| {
            let errors: Vec<String> = e
                .field_errors()
                .iter()
                .flat_map(|(field, errors)| {
                    errors
                        .iter()
                        .map(|error| {
                            format!(
                                "{}: {}",
                                field,
                                error
                                    .message
                                    .as_ref()
                                    .map_or_else(|| error.code.to_string(), ToString::to_string)
                            )
                        })
                        .collect::<Vec<_>>()
                })
                .collect();

            ValidationError::ValidationFailed(errors.join("; "))
        })?;

        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::header, routing::post};
    use tower::ServiceExt;

    use super::*;
    use crate::handlers::tasks::CreateTaskRequest;

    async fn echo_title(ValidatedJson(req): ValidatedJson<CreateTaskRequest>) -> String {
        req.title
    }

    async fn submit(content_type: Option<&str>, body: &'static str) -> Response {
        let mut request = axum::http::Request::builder().method("POST").uri("/tasks");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        Router::new()
            .route("/tasks", post(echo_title))
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn assert_bad_request(response: Response) -> String {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["code"], "bad_request");
        json["error"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn title_reaches_handler() {
        let response = submit(Some("application/json"), r#"{"title": "Buy milk"}"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Buy milk");
    }

    #[tokio::test]
    async fn missing_title_is_bad_request() {
        assert_bad_request(submit(Some("application/json"), "{}").await).await;
    }

    #[tokio::test]
    async fn empty_title_names_the_rule() {
        let message =
            assert_bad_request(submit(Some("application/json"), r#"{"title": ""}"#).await).await;
        assert_eq!(message, "title: Title is required");
    }

    #[tokio::test]
    async fn numeric_title_is_bad_request() {
        assert_bad_request(submit(Some("application/json"), r#"{"title": 7}"#).await).await;
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        assert_bad_request(submit(Some("application/json"), r#"{"title": "#).await).await;
    }

    #[tokio::test]
    async fn missing_content_type_is_bad_request() {
        assert_bad_request(submit(None, r#"{"title": "Buy milk"}"#).await).await;
    }

    #[tokio::test]
    async fn non_json_content_type_is_bad_request() {
        assert_bad_request(submit(Some("text/plain"), r#"{"title": "Buy milk"}"#).await).await;
    }
}

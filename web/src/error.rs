//! Error types for web handlers.
//!
//! This module defines the error type every rejection on the GraphQL mount
//! point goes through, implementing Axum's `IntoResponse` trait.

use axum::{
    http::{header::ALLOW, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Boxed error kept for logging.
type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application error type for web handlers.
///
/// Rejections that happen before GraphQL execution starts (bad credentials,
/// malformed bodies, wrong methods) are reported with this type. Errors
/// raised during execution are part of the GraphQL response instead.
///
/// # Examples
///
/// ```ignore
/// async fn handler(body: String) -> Result<Json<Value>, AppError> {
///     let value = serde_json::from_str(&body)
///         .map_err(|e| AppError::bad_request("Body is not JSON").with_source(e))?;
///     Ok(Json(value))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Value of the `Allow` header, for 405 responses
    allow: Option<&'static str>,
    /// Internal error (for logging, not exposed to client)
    source: Option<Source>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            allow: None,
            source: None,
        }
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error with a specific code.
    #[must_use]
    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, code)
    }

    /// Create a 405 Method Not Allowed error advertising `allow`.
    #[must_use]
    pub fn method_not_allowed(message: impl Into<String>, allow: &'static str) -> Self {
        let mut err = Self::new(StatusCode::METHOD_NOT_ALLOWED, message, "METHOD_NOT_ALLOWED");
        err.allow = Some(allow);
        err
    }

    /// Create a 400 Bad Request error for a body that could not be decoded,
    /// keeping the decoder's error as the source.
    #[must_use]
    pub fn invalid_body<E>(rejection: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::bad_request(rejection.to_string()).with_source(rejection)
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self.source {
            Some(source) => tracing::debug!(
                status = %self.status,
                code = %self.code,
                error = %source,
                "Request rejected"
            ),
            None => tracing::debug!(
                status = %self.status,
                code = %self.code,
                "Request rejected"
            ),
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(allow) = self.allow {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Must provide query string.");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Must provide query string.");
    }

    #[test]
    fn test_unauthorized_keeps_code() {
        let err = AppError::unauthorized("INVALID_TOKEN", "jwt expired");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "INVALID_TOKEN");
        assert_eq!(err.message(), "jwt expired");
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = AppError::method_not_allowed("POST only", "POST").into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "POST");
    }

    #[test]
    fn test_invalid_body_keeps_source() {
        use std::error::Error as _;

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AppError::invalid_body(parse);

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_other_errors_have_no_allow_header() {
        let response = AppError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(ALLOW).is_none());
    }
}

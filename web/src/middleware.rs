//! Request tracing for the GraphQL mount point.
//!
//! Every request is tagged with a correlation ID, taken from an inbound
//! `X-Correlation-ID` header when it holds a UUID and generated otherwise.
//! The ID is stored in the request extensions for [`CorrelationId`] and
//! carried by a `graphql_request` span that wraps the rest of the stack.
//! Nothing is added to the response.
//!
//! The span declares an empty `authenticated` field; the handler records it
//! once the bearer-token policy has run.
//!
//! [`CorrelationId`]: crate::extractors::CorrelationId

use axum::{extract::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Inbound header an upstream proxy may use to pass its own request ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Create the request tracing layer.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = inbound_id(&req).unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "graphql_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
            authenticated = tracing::field::Empty,
        );

        let fut = span.in_scope(|| self.inner.call(req));
        Box::pin(fut.instrument(span))
    }
}

fn inbound_id(req: &Request) -> Option<Uuid> {
    let value = req.headers().get(CORRELATION_ID_HEADER)?.to_str().ok()?;
    Uuid::parse_str(value).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        async fn echo(CorrelationId(id): CorrelationId) -> String {
            id.to_string()
        }

        Router::new()
            .route("/", get(echo))
            .layer(correlation_id_layer())
    }

    async fn call(request: Request<Body>) -> (Response, String) {
        let response = app().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (
            Response::from_parts(parts, Body::empty()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let (response, id) = call(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let (_, id) = call(request).await;

        assert_eq!(id, request_uuid.to_string());
    }

    #[tokio::test]
    async fn test_malformed_inbound_id_is_replaced() {
        let request = Request::builder()
            .uri("/")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let (_, id) = call(request).await;

        assert_ne!(id, "not-a-uuid");
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_response_headers_untouched() {
        let request = Request::builder()
            .uri("/")
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();

        let (response, _) = call(request).await;

        assert!(response.headers().get(CORRELATION_ID_HEADER).is_none());
    }
}

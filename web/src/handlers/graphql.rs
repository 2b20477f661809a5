//! GraphQL endpoint.
//!
//! One handler serves both GET and POST, in this order:
//!
//! 1. Decode the parameters (query string and body); an undecodable body is
//!    400 before anything else is looked at
//! 2. Apply the bearer-token policy; a rejected token is 401
//! 3. Validate the parameters (missing query, bad variables, mutation over
//!    GET)
//! 4. Execute with the [`AuthContext`] in the request data, so resolvers
//!    read it with `ctx.data::<AuthContext>()`
//!
//! The response is always JSON: there is no interactive IDE, whatever the
//! `Accept` header asks for.

use crate::auth::{authenticate, AuthContext};
use crate::error::AppError;
use crate::extractors::{CorrelationId, GraphQLParams};
use crate::state::GraphQLState;
use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    Json,
};

/// Execute one GraphQL request.
///
/// # Endpoint
///
/// ```text
/// GET  /?query=...&variables=...&operationName=...
/// POST /   {"query": "...", "variables": {...}, "operationName": "..."}
/// ```
///
/// # Errors
///
/// Returns an [`AppError`] when the request is rejected before execution.
pub async fn graphql_handler(
    State(state): State<GraphQLState>,
    CorrelationId(correlation_id): CorrelationId,
    method: Method,
    headers: HeaderMap,
    params: GraphQLParams,
) -> Result<(StatusCode, Json<async_graphql::Response>), AppError> {
    let auth = authenticate(state.verifier(), &method, &headers).inspect_err(|err| {
        tracing::info!(correlation_id = %correlation_id, error = %err, "Rejected credentials");
    })?;
    tracing::Span::current().record("authenticated", auth.is_authenticated());

    let request = params.into_request(&method)?;

    tracing::debug!(
        correlation_id = %correlation_id,
        operation = request.operation_name.as_deref().unwrap_or("<anonymous>"),
        authenticated = auth.is_authenticated(),
        "Executing GraphQL request"
    );

    let response = state.schema().execute(request.data(auth)).await;
    let status = response_status(&response);

    if response.is_err() {
        tracing::debug!(
            correlation_id = %correlation_id,
            errors = response.errors.len(),
            status = %status,
            "GraphQL request finished with errors"
        );
    }

    Ok((status, Json(response)))
}

/// HTTP status for an executed request.
///
/// - no errors, or errors next to partial data: 200
/// - no data and only errors without a field path (the document did not
///   parse or validate, or the operation could not be selected): 400
/// - no data because execution failed: 500
fn response_status(response: &async_graphql::Response) -> StatusCode {
    if response.errors.is_empty() || response.data != async_graphql::Value::Null {
        StatusCode::OK
    } else if response.errors.iter().all(|e| e.path.is_empty()) {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_graphql::{PathSegment, ServerError, Value};

    fn response(data: Value, errors: Vec<ServerError>) -> async_graphql::Response {
        let mut response = async_graphql::Response::new(data);
        response.errors = errors;
        response
    }

    fn field_error() -> ServerError {
        let mut err = ServerError::new("boom", None);
        err.path = vec![PathSegment::Field("broken".to_string())];
        err
    }

    #[test]
    fn test_success_is_200() {
        let ok = response(Value::from_json(serde_json::json!({"a": 1})).unwrap(), vec![]);
        assert_eq!(response_status(&ok), StatusCode::OK);
    }

    #[test]
    fn test_partial_data_is_200() {
        let partial = response(
            Value::from_json(serde_json::json!({"a": null})).unwrap(),
            vec![field_error()],
        );
        assert_eq!(response_status(&partial), StatusCode::OK);
    }

    #[test]
    fn test_request_errors_are_400() {
        let invalid = response(Value::Null, vec![ServerError::new("Unknown field", None)]);
        assert_eq!(response_status(&invalid), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_failed_execution_is_500() {
        let failed = response(Value::Null, vec![field_error()]);
        assert_eq!(response_status(&failed), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

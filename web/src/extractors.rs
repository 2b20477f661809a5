//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation ID
//! - `GraphQLParams`: `query`, `variables` and `operationName`, read from the
//!   query string and the body
//!
//! # Examples
//!
//! ```ignore
//! use sdl_gateway_web::extractors::{CorrelationId, GraphQLParams};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     method: Method,
//!     params: GraphQLParams,
//! ) -> Result<Json<async_graphql::Response>, AppError> {
//!     let request = params.into_request(&method)?;
//!     // ...
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use async_graphql::parser::types::{DocumentOperations, OperationType};
use async_graphql::Variables;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap, Method},
    Form, Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Reads the ID stored by the correlation middleware. Without the
/// middleware it falls back to the `X-Correlation-ID` header, or a new UUID.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// GraphQL-over-HTTP parameters.
///
/// Extraction only decodes the transport: the query string always, and the
/// body according to its content type.
///
/// | Content type                        | Body read as                  |
/// |-------------------------------------|-------------------------------|
/// | `application/json`, `*/*+json`      | JSON object                   |
/// | `application/x-www-form-urlencoded` | form fields                   |
/// | `application/graphql`               | the query text                |
/// | anything else, or none              | ignored                       |
///
/// A value in the query string wins over the same field in the body. An
/// undecodable body is rejected with 400; everything else (a missing query,
/// bad variables, a mutation over GET) is checked by
/// [`GraphQLParams::into_request`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphQLParams {
    /// Document text
    pub query: Option<String>,
    /// Variables, as a JSON object or as JSON text
    pub variables: Option<serde_json::Value>,
    /// Operation to run when the document has several
    #[serde(rename = "operationName")]
    pub operation_name: Option<String>,
}

impl GraphQLParams {
    /// Fill the fields missing here from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            query: self.query.or(fallback.query),
            variables: self.variables.or(fallback.variables),
            operation_name: self.operation_name.or(fallback.operation_name),
        }
    }

    /// Validate the parameters and build the executable request.
    ///
    /// # Errors
    ///
    /// - 400 if `query` is missing or empty, or `variables` is not a JSON
    ///   object
    /// - 405 with `Allow: POST` if a GET request selects a mutation
    pub fn into_request(self, method: &Method) -> Result<async_graphql::Request, AppError> {
        let query = self
            .query
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::bad_request("Must provide query string."))?;

        if *method == Method::GET && is_mutation(&query, self.operation_name.as_deref()) {
            return Err(AppError::method_not_allowed(
                "Can only perform a mutation operation from a POST request.",
                "POST",
            ));
        }

        let mut request = async_graphql::Request::new(query);
        if let Some(name) = self.operation_name.filter(|n| !n.is_empty()) {
            request = request.operation_name(name);
        }
        if let Some(variables) = parse_variables(self.variables)? {
            request = request.variables(variables);
        }
        Ok(request)
    }
}

/// Variables arrive either as a JSON object or as JSON text.
fn parse_variables(raw: Option<serde_json::Value>) -> Result<Option<Variables>, AppError> {
    let value = match raw {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(text)) if text.is_empty() => return Ok(None),
        Some(serde_json::Value::String(text)) => serde_json::from_str(&text)
            .map_err(|e| AppError::bad_request("Variables are invalid JSON.").with_source(e))?,
        Some(value) => value,
    };

    match value {
        serde_json::Value::Object(_) => Ok(Some(Variables::from_json(value))),
        serde_json::Value::Null => Ok(None),
        _ => Err(AppError::bad_request("Variables are invalid JSON.")),
    }
}

/// Whether the selected operation is a mutation. Documents that do not
/// parse are left for the executor to report.
fn is_mutation(query: &str, operation_name: Option<&str>) -> bool {
    let Ok(document) = async_graphql::parser::parse_query(query) else {
        return false;
    };

    let ty = match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), _) => Some(operation.node.ty),
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, operation)| operation.node.ty),
        (DocumentOperations::Multiple(_), None) => None,
    };

    ty == Some(OperationType::Mutation)
}

/// How a body is decoded, by content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Form,
    GraphQL,
}

fn body_format(headers: &HeaderMap) -> Option<BodyFormat> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => Some(BodyFormat::Json),
        "application/x-www-form-urlencoded" => Some(BodyFormat::Form),
        "application/graphql" => Some(BodyFormat::GraphQL),
        other if other.starts_with("application/") && other.ends_with("+json") => {
            Some(BodyFormat::Json)
        }
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequest<S> for GraphQLParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(from_url) = Query::<Self>::try_from_uri(req.uri())
            .map_err(|e| AppError::bad_request(e.body_text()).with_source(e))?;

        let from_body = match body_format(req.headers()) {
            Some(BodyFormat::Json) => {
                let Json(params) = Json::<Self>::from_request(req, state)
                    .await
                    .map_err(AppError::invalid_body)?;
                params
            }
            Some(BodyFormat::Form) => {
                let Form(params) = Form::<Self>::from_request(req, state)
                    .await
                    .map_err(AppError::invalid_body)?;
                params
            }
            Some(BodyFormat::GraphQL) => {
                let query = String::from_request(req, state)
                    .await
                    .map_err(AppError::invalid_body)?;
                Self {
                    query: Some(query),
                    ..Self::default()
                }
            }
            None => Self::default(),
        };

        Ok(from_url.or(from_body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    async fn extract(req: axum::http::Request<Body>) -> Result<GraphQLParams, AppError> {
        GraphQLParams::from_request(req, &()).await
    }

    async fn extract_request(
        req: axum::http::Request<Body>,
    ) -> Result<async_graphql::Request, AppError> {
        let method = req.method().clone();
        extract(req).await?.into_request(&method)
    }

    fn post_as(uri: &str, content_type: &str, body: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post(body: &str) -> axum::http::Request<Body> {
        post_as("/", "application/json", body)
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_correlation_id_from_extension() {
        let id = Uuid::new_v4();
        let mut req = get("/");
        req.extensions_mut().insert(id);
        let (mut parts, _) = req.into_parts();

        let CorrelationId(extracted) = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted, id);
    }

    #[tokio::test]
    async fn test_post_body() {
        let request = extract_request(post(
            r#"{"query":"query Q($id: ID) { a }","variables":{"id":"1"},"operationName":"Q"}"#,
        ))
        .await
        .unwrap();

        assert_eq!(request.query, "query Q($id: ID) { a }");
        assert_eq!(request.operation_name.as_deref(), Some("Q"));
        assert_eq!(
            request.variables.into_value().into_json().unwrap(),
            serde_json::json!({"id": "1"})
        );
    }

    #[tokio::test]
    async fn test_post_variables_as_text() {
        let request = extract_request(post(r#"{"query":"{ a }","variables":"{\"n\":1}"}"#))
            .await
            .unwrap();
        assert_eq!(
            request.variables.into_value().into_json().unwrap(),
            serde_json::json!({"n": 1})
        );
    }

    #[tokio::test]
    async fn test_malformed_json_body() {
        let err = extract(post(r#"{"query": "{ a }""#)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_json_suffix_content_type() {
        let params = extract(post_as(
            "/",
            "application/graphql-response+json; charset=utf-8",
            r#"{"query":"{ a }"}"#,
        ))
        .await
        .unwrap();
        assert_eq!(params.query.as_deref(), Some("{ a }"));
    }

    #[tokio::test]
    async fn test_query_string_on_post() {
        let params = extract(post_as("/?query=%7B%20a%20%7D", "application/json", "{}"))
            .await
            .unwrap();
        assert_eq!(params.query.as_deref(), Some("{ a }"));
    }

    #[tokio::test]
    async fn test_query_string_wins_over_body() {
        let params = extract(post_as(
            "/?operationName=FromUrl",
            "application/json",
            r#"{"query":"{ a }","operationName":"FromBody"}"#,
        ))
        .await
        .unwrap();

        assert_eq!(params.query.as_deref(), Some("{ a }"));
        assert_eq!(params.operation_name.as_deref(), Some("FromUrl"));
    }

    #[tokio::test]
    async fn test_graphql_body() {
        let params = extract(post_as("/", "application/graphql", "{ a }"))
            .await
            .unwrap();
        assert_eq!(params.query.as_deref(), Some("{ a }"));
    }

    #[tokio::test]
    async fn test_form_body() {
        let params = extract(post_as(
            "/",
            "application/x-www-form-urlencoded",
            "query=%7B%20a%20%7D&variables=%7B%22n%22%3A1%7D",
        ))
        .await
        .unwrap();

        assert_eq!(params.query.as_deref(), Some("{ a }"));
        assert_eq!(
            params.variables,
            Some(serde_json::Value::String(r#"{"n":1}"#.to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_content_type_body_is_ignored() {
        let params = extract(post_as("/", "text/plain", r#"{"query":"{ a }"}"#))
            .await
            .unwrap();
        assert_eq!(params, GraphQLParams::default());

        let req = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(r#"{"query":"{ a }"}"#))
            .unwrap();
        let err = extract_request(req).await.unwrap_err();
        assert_eq!(err.message(), "Must provide query string.");
    }

    #[tokio::test]
    async fn test_missing_query() {
        let err = extract_request(post("{}")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Must provide query string.");

        let err = extract_request(get("/")).await.unwrap_err();
        assert_eq!(err.message(), "Must provide query string.");
    }

    #[tokio::test]
    async fn test_invalid_variables() {
        let err = extract_request(get("/?query=%7B%20a%20%7D&variables=%7Bnope"))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Variables are invalid JSON.");
    }

    #[tokio::test]
    async fn test_get_query_string() {
        let request = extract_request(get("/?query=%7B%20a%20%7D&operationName="))
            .await
            .unwrap();
        assert_eq!(request.query, "{ a }");
        assert_eq!(request.operation_name, None);
    }

    #[tokio::test]
    async fn test_get_mutation_is_refused() {
        let err = extract_request(get("/?query=mutation%20%7B%20a%20%7D"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_operation_selection() {
        let doc = "query A { a } mutation B { b }";
        assert!(is_mutation(doc, Some("B")));
        assert!(!is_mutation(doc, Some("A")));
        assert!(!is_mutation(doc, None));
        assert!(!is_mutation("{ unterminated", None));
    }
}

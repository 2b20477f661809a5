//! The GraphQL mount point.

use crate::auth::JwtVerifier;
use crate::handlers::graphql_handler;
use crate::middleware::correlation_id_layer;
use crate::state::GraphQLState;
use axum::{routing::get, Router};
use sdl_gateway_schema::CompiledSchema;
use tower_http::trace::TraceLayer;

/// Build the application: the GraphQL handler on `/` and every path below
/// it, for GET and POST.
///
/// Layers, outermost first: HTTP tracing, correlation IDs. Authentication
/// happens in the handler once the body has been decoded, so a malformed
/// body is a 400 even when the token is bad too.
#[must_use]
pub fn graphql_router(schema: CompiledSchema, verifier: JwtVerifier) -> Router {
    Router::new()
        .route("/", get(graphql_handler).post(graphql_handler))
        .route("/*path", get(graphql_handler).post(graphql_handler))
        .with_state(GraphQLState::new(schema, verifier))
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
}

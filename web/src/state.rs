//! Application state for the GraphQL handler.

use crate::auth::JwtVerifier;
use sdl_gateway_schema::CompiledSchema;
use std::sync::Arc;

/// State shared across all requests on the mount point.
///
/// Both parts are read-only; cloning the state is cheap.
///
/// # Examples
///
/// ```ignore
/// use axum::{extract::State, Json};
/// use sdl_gateway_web::GraphQLState;
///
/// async fn sdl(State(state): State<GraphQLState>) -> String {
///     state.schema().sdl()
/// }
/// ```
#[derive(Clone, Debug)]
pub struct GraphQLState {
    schema: CompiledSchema,
    verifier: Arc<JwtVerifier>,
}

impl GraphQLState {
    /// Create the state around a compiled schema and the token verifier.
    #[must_use]
    pub fn new(schema: CompiledSchema, verifier: JwtVerifier) -> Self {
        Self {
            schema,
            verifier: Arc::new(verifier),
        }
    }

    /// The schema every request executes against.
    #[must_use]
    pub const fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Verifier for bearer tokens.
    #[must_use]
    pub fn verifier(&self) -> &JwtVerifier {
        &self.verifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone_send_sync() {
        // Axum state must be Clone + Send + Sync + 'static
        fn assert_state<T: Clone + Send + Sync + 'static>() {}
        assert_state::<GraphQLState>();
    }
}

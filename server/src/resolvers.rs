//! Resolver map served by the binary.
//!
//! Business resolvers are plugged in here. The built-in ones only expose
//! what the gateway itself knows: the caller's token payload and whether
//! the database is reachable.

use crate::database::DatabaseHandle;
use async_graphql::Value;
use sdl_gateway_schema::dynamic::{FieldFuture, FieldValue};
use sdl_gateway_schema::ResolverMap;
use sdl_gateway_web::AuthContext;

/// Resolvers for `src/schema.gql`.
#[must_use]
pub fn resolver_map() -> ResolverMap {
    ResolverMap::new()
        .field("Query", "viewer", |ctx| {
            FieldFuture::new(async move {
                let auth = ctx.data::<AuthContext>()?;
                let Some(claims) = auth.claims() else {
                    return Ok(None);
                };
                let viewer = Value::from_json(serde_json::json!({ "claims": claims }))?;
                Ok(Some(FieldValue::value(viewer)))
            })
        })
        .field("Query", "databaseReady", |ctx| {
            FieldFuture::new(async move {
                let database = ctx.data::<DatabaseHandle>()?;
                Ok(Some(FieldValue::value(database.is_ready())))
            })
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_graphql::{value, Request};
    use sdl_gateway_schema::{compile_schema, MONGODB_DIRECTIVES};

    const SCHEMA: &str = include_str!("schema.gql");

    async fn execute(auth: AuthContext) -> async_graphql::Response {
        let resolvers = resolver_map().data(DatabaseHandle::new());
        let schema = compile_schema(MONGODB_DIRECTIVES, SCHEMA, resolvers).unwrap();
        schema
            .execute(Request::new("{ viewer { claims } databaseReady }").data(auth))
            .await
    }

    #[tokio::test]
    async fn test_bundled_schema_compiles_with_resolvers() {
        let response = execute(AuthContext::Anonymous).await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data,
            value!({ "viewer": null, "databaseReady": false })
        );
    }

    #[tokio::test]
    async fn test_viewer_exposes_claims() {
        let claims = serde_json::json!({"sub": "u1", "roles": ["admin"]})
            .as_object()
            .cloned()
            .unwrap();

        let response = execute(AuthContext::Authenticated(claims)).await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data,
            value!({
                "viewer": { "claims": { "sub": "u1", "roles": ["admin"] } },
                "databaseReady": false,
            })
        );
    }
}

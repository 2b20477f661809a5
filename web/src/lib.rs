//! Axum HTTP surface for the SDL gateway.
//!
//! This crate turns a [`CompiledSchema`](sdl_gateway_schema::CompiledSchema)
//! into an HTTP application speaking the GraphQL-over-HTTP convention on a
//! single mount point.
//!
//! # Request Flow
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  TraceLayer                             │  ← HTTP spans (tower-http)
//! │  Correlation ID middleware              │  ← graphql_request span
//! ├─────────────────────────────────────────┤
//! │  GraphQLParams extractor                │  ← query string + body
//! │  graphql_handler                        │  ← bearer token, then execute
//! └─────────────────────────────────────────┘
//! ```
//!
//! Rejections before execution (malformed body, bad token, missing query,
//! mutation over GET) are answered with an [`AppError`] JSON body. Executed
//! requests always return the GraphQL response as JSON, with 400 for a
//! document that does not parse or validate and 500 when execution produced
//! no data.
//!
//! # Example
//!
//! ```ignore
//! use sdl_gateway_web::{graphql_router, JwtVerifier};
//!
//! let app = graphql_router(schema, JwtVerifier::hs256(secret.as_bytes()));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use auth::{authenticate, AuthContext, AuthError, Claims, JwtVerifier, TokenError};
pub use error::AppError;
pub use extractors::{CorrelationId, GraphQLParams};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use router::graphql_router;
pub use state::GraphQLState;

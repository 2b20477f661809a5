//! SDL-first schema compilation.
//!
//! Takes a directive-definition document, an application schema document and
//! a [`ResolverMap`], and produces a [`CompiledSchema`] ready to execute
//! requests. Nothing here performs I/O: reading the SDL file and serving the
//! schema over HTTP happen elsewhere.
//!
//! # Example
//!
//! ```ignore
//! use sdl_gateway_schema::{compile_schema, ResolverMap, MONGODB_DIRECTIVES};
//! use sdl_gateway_schema::dynamic::{FieldFuture, FieldValue};
//!
//! let resolvers = ResolverMap::new().field("Query", "hello", |_| {
//!     FieldFuture::new(async { Ok(Some(FieldValue::value("world".to_string()))) })
//! });
//!
//! let schema = compile_schema(MONGODB_DIRECTIVES, "type Query { hello: String }", resolvers)?;
//! let response = schema.execute(async_graphql::Request::new("{ hello }")).await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compile;
pub mod directives;
pub mod error;
pub mod resolvers;

pub use compile::{compile_schema, CompiledSchema};
pub use directives::MONGODB_DIRECTIVES;
pub use error::{Document, Result, SchemaError};
pub use resolvers::{field_value, json_value, Resolver, ResolverMap};

/// Dynamic-schema building blocks resolver authors need
/// (`FieldFuture`, `FieldValue`, `ResolverContext`, ...).
pub use async_graphql::dynamic;

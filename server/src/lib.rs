//! # SDL Gateway
//!
//! Boots a GraphQL API server from a schema-definition-language file.
//!
//! ```text
//! Config::from_env ─► MongoConnector::initiate (background)
//!                  ─► read SDL ─► compile_schema ─► graphql_router
//!                  ─► bind ─► "Server started on port {port}."
//! ```
//!
//! The pieces live in their own crates: schema compilation in
//! `sdl-gateway-schema`, the HTTP surface in `sdl-gateway-web`. This crate
//! owns configuration, the database connection and the startup sequence.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod resolvers;

pub use bootstrap::{run, startup_messages, Bootstrap, BootstrapError, Listening, Prepared};
pub use config::{AuthConfig, Config, ConfigError, DatabaseConfig, ServerConfig};
pub use database::{DatabaseConnector, DatabaseHandle, MongoConnector};
pub use resolvers::resolver_map;

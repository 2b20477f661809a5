//! HTTP request handlers.

pub mod graphql;

pub use graphql::graphql_handler;

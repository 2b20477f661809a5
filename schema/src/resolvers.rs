//! Resolver maps.
//!
//! A [`ResolverMap`] maps `(type, field)` coordinates to async resolver
//! functions. Fields without an entry fall back to the default resolver,
//! which reads the same-named key from the parent value.
//!
//! # Example
//!
//! ```ignore
//! use async_graphql::dynamic::{FieldFuture, FieldValue};
//! use sdl_gateway_schema::ResolverMap;
//!
//! let resolvers = ResolverMap::new()
//!     .field("Query", "version", |_| {
//!         FieldFuture::new(async { Ok(Some(FieldValue::value("1.0".to_string()))) })
//!     });
//! ```

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext, SchemaBuilder};
use async_graphql::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A field resolver shared across every execution of the schema.
pub type Resolver = Arc<dyn for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync>;

type DataInstaller = Box<dyn FnOnce(SchemaBuilder) -> SchemaBuilder + Send>;

/// Mapping from schema coordinates to resolver functions, plus the shared
/// data those resolvers read through `ctx.data::<T>()`.
#[derive(Default)]
pub struct ResolverMap {
    fields: BTreeMap<String, BTreeMap<String, Resolver>>,
    data: Vec<DataInstaller>,
}

impl ResolverMap {
    /// Create an empty resolver map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a resolver to `type_name.field_name`, replacing any earlier one.
    #[must_use]
    pub fn field<F>(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: F,
    ) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        self.fields
            .entry(type_name.into())
            .or_default()
            .insert(field_name.into(), Arc::new(resolver));
        self
    }

    /// Make `data` available to every resolver of the compiled schema.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data
            .push(Box::new(move |builder: SchemaBuilder| builder.data(data)));
        self
    }

    /// Resolver registered for a coordinate.
    #[must_use]
    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&Resolver> {
        self.fields.get(type_name)?.get(field_name)
    }

    /// Number of registered field resolvers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.values().map(BTreeMap::len).sum()
    }

    /// Whether no field resolvers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered coordinates in sorted order.
    pub(crate) fn coordinates(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().flat_map(|(type_name, fields)| {
            fields
                .keys()
                .map(move |field_name| (type_name.as_str(), field_name.as_str()))
        })
    }

    /// Hand the shared data over to a schema builder.
    pub(crate) fn install_data(&mut self, mut builder: SchemaBuilder) -> SchemaBuilder {
        for install in self.data.drain(..) {
            builder = install(builder);
        }
        builder
    }
}

impl std::fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverMap")
            .field(
                "fields",
                &self
                    .coordinates()
                    .map(|(t, n)| format!("{t}.{n}"))
                    .collect::<Vec<_>>(),
            )
            .field("data", &self.data.len())
            .finish()
    }
}

/// Default resolver: property lookup on an object parent, `null` otherwise.
pub(crate) fn resolve_default<'a>(ctx: &ResolverContext<'a>, field_name: &str) -> FieldFuture<'a> {
    let value = match ctx.parent_value.as_value() {
        Some(Value::Object(map)) => map.get(field_name).cloned(),
        _ => None,
    };

    let value = value.filter(|v| *v != Value::Null).map(field_value);
    FieldFuture::new(async move { Ok(value) })
}

/// Convert a plain value into a field value the executor can descend into.
///
/// Lists become list values element-wise. Objects carrying a string
/// `__typename` are tagged with that concrete type so they can be returned
/// from interface or union fields.
#[must_use]
pub fn field_value<'a>(value: Value) -> FieldValue<'a> {
    match value {
        Value::List(items) => FieldValue::list(items.into_iter().map(field_value)),
        Value::Object(map) => {
            let type_name = match map.get("__typename") {
                Some(Value::String(name)) => Some(name.clone()),
                _ => None,
            };
            let value = FieldValue::value(Value::Object(map));
            match type_name {
                Some(name) => value.with_type(name),
                None => value,
            }
        }
        other => FieldValue::value(other),
    }
}

/// Convert a JSON document (for example one read from the database) into a
/// field value.
///
/// # Errors
///
/// Returns an error if the JSON contains numbers GraphQL cannot represent.
pub fn json_value<'a>(value: serde_json::Value) -> async_graphql::Result<FieldValue<'a>> {
    Ok(field_value(Value::from_json(value)?))
}

//! SDL compilation.
//!
//! [`compile_schema`] is a pure function: two SDL documents and a resolver
//! map in, an executable schema (or the first problem found) out.
//!
//! # Steps
//!
//! 1. Parse the directive document and the schema document
//! 2. Collect directive definitions, merge type definitions and extensions
//! 3. Validate directive usages, type references and root operation types
//! 4. Check every resolver coordinate against the merged types
//! 5. Register everything with the dynamic schema builder

use crate::directives::{deprecation, DirectiveCatalog};
use crate::error::{Document, Result, SchemaError};
use crate::resolvers::{resolve_default, ResolverMap};
use async_graphql::dynamic::{
    self, Enum, EnumItem, Field, InputObject, InputValue, Interface, InterfaceField, Object,
    Scalar, TypeRef, Union,
};
use async_graphql::parser::types::{
    BaseType, DirectiveLocation, FieldDefinition, InputValueDefinition, SchemaDefinition,
    ServiceDocument, Type, TypeDefinition, TypeKind, TypeSystemDefinition,
};
use async_graphql::parser::Positioned;
use std::collections::HashMap;

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// An executable schema, read-only and cheap to clone.
#[derive(Clone)]
pub struct CompiledSchema {
    inner: dynamic::Schema,
    roots: RootOperations,
}

impl CompiledSchema {
    /// Execute one GraphQL request.
    pub async fn execute(&self, request: async_graphql::Request) -> async_graphql::Response {
        self.inner.execute(request).await
    }

    /// The merged schema rendered back as SDL.
    #[must_use]
    pub fn sdl(&self) -> String {
        self.inner.sdl()
    }

    /// Name of the query root type.
    #[must_use]
    pub fn query_type(&self) -> &str {
        &self.roots.query
    }

    /// Name of the mutation root type, if any.
    #[must_use]
    pub fn mutation_type(&self) -> Option<&str> {
        self.roots.mutation.as_deref()
    }

    /// Name of the subscription root type, if any. The type is part of the
    /// schema, but no subscription operation can be executed against it.
    #[must_use]
    pub fn subscription_type(&self) -> Option<&str> {
        self.roots.subscription.as_deref()
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

/// Root operation type names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RootOperations {
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
}

/// Compile a directive document and a schema document into an executable
/// schema with `resolvers` attached.
///
/// # Errors
///
/// Returns the first [`SchemaError`] found: syntax errors, unknown or
/// misplaced directives, duplicate or unknown types, a missing query root,
/// or resolvers that point at coordinates the schema does not have.
pub fn compile_schema(
    directive_sdl: &str,
    schema_sdl: &str,
    mut resolvers: ResolverMap,
) -> Result<CompiledSchema> {
    let documents = [
        parse(directive_sdl, Document::Directives)?,
        parse(schema_sdl, Document::Schema)?,
    ];

    let mut catalog = DirectiveCatalog::with_builtins()?;
    let mut types = TypeSet::default();
    let mut schema_definitions = Vec::new();

    for document in documents {
        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Directive(directive) => catalog.define(&directive.node)?,
                TypeSystemDefinition::Type(ty) => types.add(ty.node)?,
                TypeSystemDefinition::Schema(schema) => schema_definitions.push(schema.node),
            }
        }
    }

    types.apply_extensions()?;

    for schema in &schema_definitions {
        catalog.check(&schema.directives, DirectiveLocation::Schema, "schema")?;
    }
    for ty in &types.definitions {
        check_directives(&catalog, ty)?;
    }

    types.check_references()?;
    let roots = root_operations(&schema_definitions, &types)?;
    check_resolvers(&resolvers, &types)?;

    let mut builder = dynamic::Schema::build(&roots.query, roots.mutation.as_deref(), None);
    if let Some(subscription) = &roots.subscription {
        tracing::debug!(
            type_name = %subscription,
            "Subscription root registered as a plain object type"
        );
    }
    for ty in &types.definitions {
        if let Some(registered) = register(ty, &resolvers) {
            builder = builder.register(registered);
        }
    }
    builder = resolvers.install_data(builder);

    let inner = builder
        .finish()
        .map_err(|e| SchemaError::Build(e.to_string()))?;

    tracing::debug!(
        types = types.definitions.len(),
        resolvers = resolvers.len(),
        query = %roots.query,
        "Schema compiled"
    );

    Ok(CompiledSchema { inner, roots })
}

fn parse(sdl: &str, document: Document) -> Result<ServiceDocument> {
    if sdl.trim().is_empty() {
        return Ok(ServiceDocument {
            definitions: Vec::new(),
        });
    }
    async_graphql::parser::parse_schema(sdl).map_err(|e| SchemaError::Syntax {
        document,
        message: e.to_string(),
    })
}

/// Type definitions from both documents, with extensions kept aside until
/// every base definition has been seen.
#[derive(Default)]
struct TypeSet {
    definitions: Vec<TypeDefinition>,
    index: HashMap<String, usize>,
    extensions: Vec<TypeDefinition>,
}

impl TypeSet {
    fn add(&mut self, definition: TypeDefinition) -> Result<()> {
        if definition.extend {
            self.extensions.push(definition);
            return Ok(());
        }

        let name = definition.name.node.to_string();
        if self.index.contains_key(&name) {
            return Err(SchemaError::DuplicateType { name });
        }
        self.index.insert(name, self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    fn contains(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name) || self.index.contains_key(name)
    }

    fn apply_extensions(&mut self) -> Result<()> {
        for extension in std::mem::take(&mut self.extensions) {
            let name = extension.name.node.to_string();
            let Some(&i) = self.index.get(&name) else {
                return Err(SchemaError::UnknownType {
                    referenced_by: format!("extend {name}"),
                    name,
                });
            };
            merge(&mut self.definitions[i], extension)?;
        }
        Ok(())
    }

    fn check_references(&self) -> Result<()> {
        for definition in &self.definitions {
            let owner = definition.name.node.as_str();
            match &definition.kind {
                TypeKind::Object(object) => {
                    self.check_names(object.implements.iter().map(|n| n.node.as_str()), owner)?;
                    self.check_fields(&object.fields, owner)?;
                }
                TypeKind::Interface(interface) => {
                    self.check_names(interface.implements.iter().map(|n| n.node.as_str()), owner)?;
                    self.check_fields(&interface.fields, owner)?;
                }
                TypeKind::Union(union) => {
                    self.check_names(union.members.iter().map(|n| n.node.as_str()), owner)?;
                }
                TypeKind::InputObject(input) => {
                    for field in &input.fields {
                        let coordinate = format!("{owner}.{}", field.node.name.node);
                        self.check_type(&field.node.ty.node, &coordinate)?;
                    }
                }
                TypeKind::Scalar | TypeKind::Enum(_) => {}
            }
        }
        Ok(())
    }

    fn check_fields(&self, fields: &[Positioned<FieldDefinition>], owner: &str) -> Result<()> {
        for field in fields {
            let coordinate = format!("{owner}.{}", field.node.name.node);
            self.check_type(&field.node.ty.node, &coordinate)?;
            for argument in &field.node.arguments {
                let coordinate = format!("{coordinate}({}:)", argument.node.name.node);
                self.check_type(&argument.node.ty.node, &coordinate)?;
            }
        }
        Ok(())
    }

    fn check_names<'a>(&self, names: impl Iterator<Item = &'a str>, owner: &str) -> Result<()> {
        for name in names {
            if !self.contains(name) {
                return Err(SchemaError::UnknownType {
                    name: name.to_string(),
                    referenced_by: owner.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_type(&self, ty: &Type, coordinate: &str) -> Result<()> {
        let name = named_type(ty);
        if self.contains(name) {
            Ok(())
        } else {
            Err(SchemaError::UnknownType {
                name: name.to_string(),
                referenced_by: coordinate.to_string(),
            })
        }
    }
}

fn merge(base: &mut TypeDefinition, extension: TypeDefinition) -> Result<()> {
    base.directives.extend(extension.directives);
    match (&mut base.kind, extension.kind) {
        (TypeKind::Object(base), TypeKind::Object(ext)) => {
            base.implements.extend(ext.implements);
            base.fields.extend(ext.fields);
        }
        (TypeKind::Interface(base), TypeKind::Interface(ext)) => {
            base.implements.extend(ext.implements);
            base.fields.extend(ext.fields);
        }
        (TypeKind::Union(base), TypeKind::Union(ext)) => base.members.extend(ext.members),
        (TypeKind::Enum(base), TypeKind::Enum(ext)) => base.values.extend(ext.values),
        (TypeKind::InputObject(base), TypeKind::InputObject(ext)) => base.fields.extend(ext.fields),
        (TypeKind::Scalar, TypeKind::Scalar) => {}
        _ => {
            return Err(SchemaError::ExtensionMismatch {
                name: base.name.node.to_string(),
            });
        }
    }
    Ok(())
}

fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

fn check_directives(catalog: &DirectiveCatalog, definition: &TypeDefinition) -> Result<()> {
    let owner = definition.name.node.as_str();
    let location = match &definition.kind {
        TypeKind::Scalar => DirectiveLocation::Scalar,
        TypeKind::Object(_) => DirectiveLocation::Object,
        TypeKind::Interface(_) => DirectiveLocation::Interface,
        TypeKind::Union(_) => DirectiveLocation::Union,
        TypeKind::Enum(_) => DirectiveLocation::Enum,
        TypeKind::InputObject(_) => DirectiveLocation::InputObject,
    };
    catalog.check(&definition.directives, location, owner)?;

    match &definition.kind {
        TypeKind::Object(object) => check_field_directives(catalog, &object.fields, owner),
        TypeKind::Interface(interface) => {
            check_field_directives(catalog, &interface.fields, owner)
        }
        TypeKind::Enum(en) => {
            for value in &en.values {
                let target = format!("{owner}.{}", value.node.value.node);
                catalog.check(&value.node.directives, DirectiveLocation::EnumValue, &target)?;
            }
            Ok(())
        }
        TypeKind::InputObject(input) => {
            for field in &input.fields {
                let target = format!("{owner}.{}", field.node.name.node);
                catalog.check(
                    &field.node.directives,
                    DirectiveLocation::InputFieldDefinition,
                    &target,
                )?;
            }
            Ok(())
        }
        TypeKind::Scalar | TypeKind::Union(_) => Ok(()),
    }
}

fn check_field_directives(
    catalog: &DirectiveCatalog,
    fields: &[Positioned<FieldDefinition>],
    owner: &str,
) -> Result<()> {
    for field in fields {
        let target = format!("{owner}.{}", field.node.name.node);
        catalog.check(
            &field.node.directives,
            DirectiveLocation::FieldDefinition,
            &target,
        )?;
        for argument in &field.node.arguments {
            let target = format!("{target}({}:)", argument.node.name.node);
            catalog.check(
                &argument.node.directives,
                DirectiveLocation::ArgumentDefinition,
                &target,
            )?;
        }
    }
    Ok(())
}

fn root_operations(
    schema_definitions: &[SchemaDefinition],
    types: &TypeSet,
) -> Result<RootOperations> {
    let mut query = None;
    let mut mutation = None;
    let mut subscription = None;

    for schema in schema_definitions {
        query = schema.query.as_ref().map(|n| n.node.to_string()).or(query);
        mutation = schema.mutation.as_ref().map(|n| n.node.to_string()).or(mutation);
        subscription = schema
            .subscription
            .as_ref()
            .map(|n| n.node.to_string())
            .or(subscription);
    }

    if schema_definitions.is_empty() {
        let by_convention = |name: &str| types.get(name).map(|_| name.to_string());
        query = by_convention("Query");
        mutation = by_convention("Mutation");
        subscription = by_convention("Subscription");
    }

    let query = query.ok_or(SchemaError::MissingQueryRoot)?;
    for root in [Some(&query), mutation.as_ref(), subscription.as_ref()]
        .into_iter()
        .flatten()
    {
        match types.get(root) {
            Some(ty) if matches!(ty.kind, TypeKind::Object(_)) => {}
            Some(_) => return Err(SchemaError::Build(format!("root type {root} must be an object type"))),
            None => {
                return Err(SchemaError::UnknownType {
                    name: root.clone(),
                    referenced_by: "schema".to_string(),
                });
            }
        }
    }

    Ok(RootOperations {
        query,
        mutation,
        subscription,
    })
}

fn check_resolvers(resolvers: &ResolverMap, types: &TypeSet) -> Result<()> {
    for (type_name, field_name) in resolvers.coordinates() {
        let Some(ty) = types.get(type_name) else {
            return Err(SchemaError::ResolverTypeMissing {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
            });
        };

        let has_field = match &ty.kind {
            TypeKind::Object(object) => object
                .fields
                .iter()
                .any(|f| f.node.name.node.as_str() == field_name),
            _ => false,
        };

        if !has_field {
            return Err(SchemaError::ResolverFieldMissing {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
            });
        }
    }
    Ok(())
}

fn register(definition: &TypeDefinition, resolvers: &ResolverMap) -> Option<dynamic::Type> {
    let name = definition.name.node.as_str();
    let description = definition.description.as_ref().map(|d| d.node.as_str());

    let registered: dynamic::Type = match &definition.kind {
        TypeKind::Scalar => {
            if BUILTIN_SCALARS.contains(&name) {
                return None;
            }
            let mut scalar = Scalar::new(name);
            if let Some(description) = description {
                scalar = scalar.description(description);
            }
            scalar.into()
        }
        TypeKind::Object(object) => {
            let mut obj = Object::new(name);
            if let Some(description) = description {
                obj = obj.description(description);
            }
            for interface in &object.implements {
                obj = obj.implement(interface.node.as_str());
            }
            for field in &object.fields {
                obj = obj.field(object_field(name, &field.node, resolvers));
            }
            obj.into()
        }
        TypeKind::Interface(interface) => {
            let mut iface = Interface::new(name);
            if let Some(description) = description {
                iface = iface.description(description);
            }
            for parent in &interface.implements {
                iface = iface.implement(parent.node.as_str());
            }
            for field in &interface.fields {
                iface = iface.field(interface_field(&field.node));
            }
            iface.into()
        }
        TypeKind::Union(union) => {
            let mut un = Union::new(name);
            if let Some(description) = description {
                un = un.description(description);
            }
            for member in &union.members {
                un = un.possible_type(member.node.as_str());
            }
            un.into()
        }
        TypeKind::Enum(en) => {
            let mut enumeration = Enum::new(name);
            if let Some(description) = description {
                enumeration = enumeration.description(description);
            }
            for value in &en.values {
                let mut item = EnumItem::new(value.node.value.node.as_str());
                if let Some(description) = &value.node.description {
                    item = item.description(description.node.as_str());
                }
                if let Some(reason) = deprecation(&value.node.directives) {
                    item = item.deprecation(Some(reason.as_str()));
                }
                enumeration = enumeration.item(item);
            }
            enumeration.into()
        }
        TypeKind::InputObject(input) => {
            let mut object = InputObject::new(name);
            if let Some(description) = description {
                object = object.description(description);
            }
            for field in &input.fields {
                object = object.field(input_value(&field.node));
            }
            object.into()
        }
    };

    Some(registered)
}

fn object_field(type_name: &str, definition: &FieldDefinition, resolvers: &ResolverMap) -> Field {
    let name = definition.name.node.to_string();
    let ty = type_ref(&definition.ty.node);

    let mut field = if let Some(resolver) = resolvers.get(type_name, &name) {
        let resolver = resolver.clone();
        Field::new(name, ty, move |ctx| (*resolver)(ctx))
    } else {
        let key = name.clone();
        Field::new(name, ty, move |ctx| resolve_default(&ctx, &key))
    };

    if let Some(description) = &definition.description {
        field = field.description(description.node.as_str());
    }
    if let Some(reason) = deprecation(&definition.directives) {
        field = field.deprecation(Some(reason.as_str()));
    }
    for argument in &definition.arguments {
        field = field.argument(input_value(&argument.node));
    }
    field
}

fn interface_field(definition: &FieldDefinition) -> InterfaceField {
    let mut field = InterfaceField::new(
        definition.name.node.as_str(),
        type_ref(&definition.ty.node),
    );
    if let Some(description) = &definition.description {
        field = field.description(description.node.as_str());
    }
    if let Some(reason) = deprecation(&definition.directives) {
        field = field.deprecation(Some(reason.as_str()));
    }
    for argument in &definition.arguments {
        field = field.argument(input_value(&argument.node));
    }
    field
}

fn input_value(definition: &InputValueDefinition) -> InputValue {
    let mut value = InputValue::new(definition.name.node.as_str(), type_ref(&definition.ty.node));
    if let Some(description) = &definition.description {
        value = value.description(description.node.as_str());
    }
    if let Some(default) = &definition.default_value {
        value = value.default_value(default.node.clone());
    }
    value
}

fn type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::named(name.as_str()),
        BaseType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
    };
    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

//! Directive definitions and usage validation.
//!
//! The schema document is written against the MongoDB codegen directive set
//! (`@entity`, `@column`, `@id`, ...). Those directives only drive code
//! generation, so at runtime they are validated and then discarded.

use crate::error::{Document, Result, SchemaError};
use async_graphql::parser::types::{ConstDirective, DirectiveDefinition, DirectiveLocation};
use async_graphql::parser::Positioned;
use std::collections::HashMap;

/// Directive definitions published by the MongoDB codegen plugin.
///
/// Pass this as the directive document to [`compile_schema`](crate::compile_schema).
pub const MONGODB_DIRECTIVES: &str = r"
directive @union(discriminatorField: String, additionalFields: [AdditionalEntityFields]) on UNION
directive @abstractEntity(discriminatorField: String!, additionalFields: [AdditionalEntityFields]) on INTERFACE
directive @entity(embedded: Boolean, additionalFields: [AdditionalEntityFields]) on OBJECT
directive @column(overrideType: String) on FIELD_DEFINITION
directive @id on FIELD_DEFINITION
directive @link(overrideType: String) on FIELD_DEFINITION
directive @embedded on FIELD_DEFINITION
directive @map(path: String!) on FIELD_DEFINITION

input AdditionalEntityFields {
  path: String
  type: String
}
";

/// Type-system directives every schema may use without defining them.
const BUILTIN_DIRECTIVES: &str = r"
directive @deprecated(reason: String) on FIELD_DEFINITION | ARGUMENT_DEFINITION | INPUT_FIELD_DEFINITION | ENUM_VALUE
directive @specifiedBy(url: String!) on SCALAR
directive @oneOf on INPUT_OBJECT
directive @skip(if: Boolean!) on FIELD | FRAGMENT_SPREAD | INLINE_FRAGMENT
directive @include(if: Boolean!) on FIELD | FRAGMENT_SPREAD | INLINE_FRAGMENT
";

/// What a directive definition allows at its usages.
#[derive(Debug, Clone)]
struct DirectiveRules {
    locations: Vec<DirectiveLocation>,
    /// Declared argument names, with whether each one must be supplied.
    arguments: Vec<(String, bool)>,
    repeatable: bool,
}

/// Known directives and the rules for using each one.
#[derive(Debug, Clone)]
pub(crate) struct DirectiveCatalog {
    rules: HashMap<String, DirectiveRules>,
}

impl DirectiveCatalog {
    /// Catalog seeded with the built-in directives.
    pub(crate) fn with_builtins() -> Result<Self> {
        let mut catalog = Self {
            rules: HashMap::new(),
        };

        let builtins = async_graphql::parser::parse_schema(BUILTIN_DIRECTIVES).map_err(|e| {
            SchemaError::Syntax {
                document: Document::Directives,
                message: e.to_string(),
            }
        })?;

        for definition in builtins.definitions {
            if let async_graphql::parser::types::TypeSystemDefinition::Directive(directive) =
                definition
            {
                catalog.define(&directive.node)?;
            }
        }

        Ok(catalog)
    }

    /// Register a directive definition.
    pub(crate) fn define(&mut self, definition: &DirectiveDefinition) -> Result<()> {
        let name = definition.name.node.to_string();
        if self.rules.contains_key(&name) {
            return Err(SchemaError::DuplicateDirective { name });
        }

        let arguments = definition
            .arguments
            .iter()
            .map(|argument| {
                let argument = &argument.node;
                let required = !argument.ty.node.nullable && argument.default_value.is_none();
                (argument.name.node.to_string(), required)
            })
            .collect();

        self.rules.insert(
            name,
            DirectiveRules {
                locations: definition.locations.iter().map(|l| l.node).collect(),
                arguments,
                repeatable: definition.is_repeatable,
            },
        );
        Ok(())
    }

    /// Check every usage in `directives` against its definition: the name
    /// must be known, the location allowed, the arguments declared and
    /// complete, and a non-repeatable directive used at most once.
    pub(crate) fn check(
        &self,
        directives: &[Positioned<ConstDirective>],
        location: DirectiveLocation,
        target: &str,
    ) -> Result<()> {
        let mut seen: Vec<&str> = Vec::with_capacity(directives.len());

        for directive in directives {
            let name = directive.node.name.node.as_str();
            let rules = self
                .rules
                .get(name)
                .ok_or_else(|| SchemaError::UnknownDirective {
                    name: name.to_string(),
                    target: target.to_string(),
                })?;

            if !rules.locations.contains(&location) {
                return Err(SchemaError::MisplacedDirective {
                    name: name.to_string(),
                    target: target.to_string(),
                    location: location_name(location),
                });
            }

            if !rules.repeatable && seen.contains(&name) {
                return Err(SchemaError::RepeatedDirective {
                    name: name.to_string(),
                    target: target.to_string(),
                });
            }
            seen.push(name);

            for (argument, _) in &directive.node.arguments {
                let argument = argument.node.as_str();
                if !rules.arguments.iter().any(|(declared, _)| declared == argument) {
                    return Err(SchemaError::UnknownDirectiveArgument {
                        name: name.to_string(),
                        argument: argument.to_string(),
                        target: target.to_string(),
                    });
                }
            }

            let missing = rules.arguments.iter().find(|(declared, required)| {
                *required
                    && !directive
                        .node
                        .arguments
                        .iter()
                        .any(|(given, _)| given.node.as_str() == declared)
            });
            if let Some((argument, _)) = missing {
                return Err(SchemaError::MissingDirectiveArgument {
                    name: name.to_string(),
                    argument: argument.clone(),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Whether a directive with this name is known.
    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}

/// Deprecation reason from a `@deprecated` usage, if any.
pub(crate) fn deprecation(directives: &[Positioned<ConstDirective>]) -> Option<String> {
    directives
        .iter()
        .find(|d| d.node.name.node.as_str() == "deprecated")
        .map(|d| {
            d.node
                .arguments
                .iter()
                .find(|(name, _)| name.node.as_str() == "reason")
                .and_then(|(_, value)| match &value.node {
                    async_graphql::Value::String(reason) => Some(reason.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| "No longer supported".to_string())
        })
}

/// SDL spelling of a location (`FieldDefinition` -> `FIELD_DEFINITION`).
fn location_name(location: DirectiveLocation) -> String {
    let camel = format!("{location:?}");
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, ch) in camel.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use async_graphql::parser::types::{TypeKind, TypeSystemDefinition};

    fn catalog_with_mongodb() -> DirectiveCatalog {
        let mut catalog = DirectiveCatalog::with_builtins().unwrap();
        let doc = async_graphql::parser::parse_schema(MONGODB_DIRECTIVES).unwrap();
        for definition in doc.definitions {
            if let TypeSystemDefinition::Directive(d) = definition {
                catalog.define(&d.node).unwrap();
            }
        }
        catalog
    }

    fn object_directives(sdl: &str) -> Vec<Positioned<ConstDirective>> {
        let doc = async_graphql::parser::parse_schema(sdl).unwrap();
        doc.definitions
            .into_iter()
            .find_map(|d| match d {
                TypeSystemDefinition::Type(t) if matches!(t.node.kind, TypeKind::Object(_)) => {
                    Some(t.node.directives)
                }
                _ => None,
            })
            .expect("object type")
    }

    #[test]
    fn test_mongodb_directives_parse() {
        let catalog = catalog_with_mongodb();
        for name in ["union", "abstractEntity", "entity", "column", "id", "link", "embedded", "map"] {
            assert!(catalog.contains(name), "missing @{name}");
        }
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let mut catalog = catalog_with_mongodb();
        let doc = async_graphql::parser::parse_schema("directive @id on FIELD_DEFINITION").unwrap();
        let TypeSystemDefinition::Directive(d) = &doc.definitions[0] else {
            panic!("expected directive");
        };
        assert_eq!(
            catalog.define(&d.node),
            Err(SchemaError::DuplicateDirective {
                name: "id".to_string()
            })
        );
    }

    #[test]
    fn test_usage_on_allowed_location() {
        let catalog = catalog_with_mongodb();
        let directives = object_directives("type User @entity { id: ID }");
        assert!(catalog.check(&directives, DirectiveLocation::Object, "User").is_ok());
    }

    #[test]
    fn test_usage_on_wrong_location() {
        let catalog = catalog_with_mongodb();
        let directives = object_directives("type User @id { id: ID }");
        let err = catalog
            .check(&directives, DirectiveLocation::Object, "User")
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MisplacedDirective {
                name: "id".to_string(),
                target: "User".to_string(),
                location: "OBJECT".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_usage() {
        let catalog = catalog_with_mongodb();
        let directives = object_directives("type User @cached { id: ID }");
        assert!(matches!(
            catalog.check(&directives, DirectiveLocation::Object, "User"),
            Err(SchemaError::UnknownDirective { .. })
        ));
    }

    fn field_directives(sdl: &str) -> Vec<Positioned<ConstDirective>> {
        let doc = async_graphql::parser::parse_schema(sdl).unwrap();
        doc.definitions
            .into_iter()
            .find_map(|d| match d {
                TypeSystemDefinition::Type(t) => match t.node.kind {
                    TypeKind::Object(object) => {
                        object.fields.into_iter().next().map(|f| f.node.directives)
                    }
                    _ => None,
                },
                _ => None,
            })
            .expect("object field")
    }

    fn check_field(sdl: &str) -> Result<()> {
        catalog_with_mongodb().check(
            &field_directives(sdl),
            DirectiveLocation::FieldDefinition,
            "Query.a",
        )
    }

    #[test]
    fn test_repeated_directive() {
        assert_eq!(
            check_field("type Query { a: Int @id @id }"),
            Err(SchemaError::RepeatedDirective {
                name: "id".to_string(),
                target: "Query.a".to_string(),
            })
        );
    }

    #[test]
    fn test_repeatable_directive_may_repeat() {
        let mut catalog = catalog_with_mongodb();
        let doc = async_graphql::parser::parse_schema(
            "directive @tag(name: String!) repeatable on FIELD_DEFINITION",
        )
        .unwrap();
        let TypeSystemDefinition::Directive(d) = &doc.definitions[0] else {
            panic!("expected directive");
        };
        catalog.define(&d.node).unwrap();

        let directives = field_directives(r#"type Query { a: Int @tag(name: "x") @tag(name: "y") }"#);
        assert!(catalog
            .check(&directives, DirectiveLocation::FieldDefinition, "Query.a")
            .is_ok());
    }

    #[test]
    fn test_undeclared_argument() {
        assert_eq!(
            check_field("type Query { a: Int @column(bogus: 1) }"),
            Err(SchemaError::UnknownDirectiveArgument {
                name: "column".to_string(),
                argument: "bogus".to_string(),
                target: "Query.a".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_required_argument() {
        assert_eq!(
            check_field("type Query { a: Int @map }"),
            Err(SchemaError::MissingDirectiveArgument {
                name: "map".to_string(),
                argument: "path".to_string(),
                target: "Query.a".to_string(),
            })
        );
        assert!(check_field(r#"type Query { a: Int @map(path: "x.y") }"#).is_ok());
    }

    #[test]
    fn test_optional_arguments_may_be_omitted() {
        assert!(check_field("type Query { a: Int @column @link }").is_ok());
    }

    #[test]
    fn test_location_name() {
        assert_eq!(
            location_name(DirectiveLocation::FieldDefinition),
            "FIELD_DEFINITION"
        );
        assert_eq!(location_name(DirectiveLocation::Object), "OBJECT");
    }
}

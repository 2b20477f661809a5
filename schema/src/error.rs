//! Error types for schema compilation.

use thiserror::Error;

/// Result type alias for schema compilation.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Which of the two input documents an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    /// The directive-definition document.
    Directives,
    /// The application's schema document.
    Schema,
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directives => f.write_str("directives"),
            Self::Schema => f.write_str("schema"),
        }
    }
}

/// Every way `compile_schema` can reject its inputs.
///
/// All variants are startup-fatal: a server never starts with a schema that
/// produced one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// One of the documents is not valid SDL.
    #[error("syntax error in {document} document: {message}")]
    Syntax {
        /// Document that failed to parse
        document: Document,
        /// Parser message, including position
        message: String,
    },

    /// The same directive is defined twice.
    #[error("directive @{name} is defined more than once")]
    DuplicateDirective {
        /// Directive name
        name: String,
    },

    /// A directive is used without being defined.
    #[error("unknown directive @{name} used on {target}")]
    UnknownDirective {
        /// Directive name
        name: String,
        /// Schema coordinate of the usage
        target: String,
    },

    /// A directive is used at a location its definition does not allow.
    #[error("directive @{name} may not be used on {target} ({location})")]
    MisplacedDirective {
        /// Directive name
        name: String,
        /// Schema coordinate of the usage
        target: String,
        /// Location kind of the usage
        location: String,
    },

    /// A non-repeatable directive is used more than once on one target.
    #[error("directive @{name} may only be used once on {target}")]
    RepeatedDirective {
        /// Directive name
        name: String,
        /// Schema coordinate of the usage
        target: String,
    },

    /// A directive usage passes an argument its definition does not declare.
    #[error("directive @{name} on {target} has no argument {argument:?}")]
    UnknownDirectiveArgument {
        /// Directive name
        name: String,
        /// Argument name
        argument: String,
        /// Schema coordinate of the usage
        target: String,
    },

    /// A directive usage omits a non-null argument without a default.
    #[error("directive @{name} on {target} requires argument {argument:?}")]
    MissingDirectiveArgument {
        /// Directive name
        name: String,
        /// Argument name
        argument: String,
        /// Schema coordinate of the usage
        target: String,
    },

    /// The same type is defined twice.
    #[error("type {name} is defined more than once")]
    DuplicateType {
        /// Type name
        name: String,
    },

    /// A type is referenced or extended but never defined.
    #[error("unknown type {name} referenced by {referenced_by}")]
    UnknownType {
        /// Missing type name
        name: String,
        /// Schema coordinate of the reference
        referenced_by: String,
    },

    /// `extend` was applied with a different kind than the base type.
    #[error("type {name} cannot be extended as a different kind")]
    ExtensionMismatch {
        /// Type name
        name: String,
    },

    /// No query root type could be determined.
    #[error("schema has no query root type")]
    MissingQueryRoot,

    /// The resolver map names a type that the schema does not define.
    #[error("{type_name}.{field_name} defined in resolvers, but {type_name} is not defined in schema")]
    ResolverTypeMissing {
        /// Type named by the resolver map
        type_name: String,
        /// Field named by the resolver map
        field_name: String,
    },

    /// The resolver map names a field the schema type does not have.
    #[error("{type_name}.{field_name} defined in resolvers, but not in schema")]
    ResolverFieldMissing {
        /// Type named by the resolver map
        type_name: String,
        /// Field named by the resolver map
        field_name: String,
    },

    /// The executable schema builder rejected the merged definitions.
    #[error("schema build failed: {0}")]
    Build(String),
}

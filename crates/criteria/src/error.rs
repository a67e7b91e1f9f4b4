//! Error types for the criteria crate.
//!
//! Every failure is raised synchronously by the call that introduced the bad
//! data. Nothing here is deferred to translation time.

use thiserror::Error;

use crate::criteria::CriteriaKind;
use crate::op::FilterOperator;
use crate::relation::RelationType;

/// A filter value does not match its operator's contract.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The value shape is wrong for the operator.
    #[error("operator '{operator}' expects {expected}, got {actual}")]
    InvalidValue {
        operator: FilterOperator,
        expected: &'static str,
        actual: &'static str,
    },

    /// NaN and infinities have no plain form.
    #[error("operator '{operator}' does not accept NaN or infinite numbers")]
    NonFiniteNumber { operator: FilterOperator },

    /// The operator name is outside the closed operator set.
    #[error("unhandled filter operator: {0}")]
    UnhandledOperator(String),

    /// Invalid regular expression pattern.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// A schema definition is internally inconsistent.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema '{source_name}': identifier field '{field}' is not declared in fields")]
    IdentifierNotInFields { source_name: String, field: String },

    #[error("schema '{source_name}': field '{field}' is declared more than once")]
    DuplicateField { source_name: String, field: String },

    #[error("schema '{source_name}': relation '{alias}' is declared more than once")]
    DuplicateRelation { source_name: String, alias: String },

    #[error(
        "schema '{source_name}': relation '{alias}' references local field '{field}', which is not declared in fields"
    )]
    RelationFieldNotInFields {
        source_name: String,
        alias: String,
        field: String,
    },

    #[error(
        "schema '{source_name}': relation '{alias}' of type {relation_type} must use the {expected} shape"
    )]
    RelationShapeMismatch {
        source_name: String,
        alias: String,
        relation_type: RelationType,
        expected: &'static str,
    },
}

/// A criteria builder call is invalid for the node it was made on.
#[derive(Debug, Error)]
pub enum CriteriaError {
    #[error("relation '{alias}' is not declared on schema '{source_name}'")]
    UnknownRelation { alias: String, source_name: String },

    #[error("field '{field}' is not declared on schema '{source_name}'")]
    UnknownField { field: String, source_name: String },

    #[error("filters must be initialized with `where_` before adding more conditions")]
    FilterNotInitialized,

    #[error("cannot attach a {kind} node as a join")]
    NotAJoin { kind: CriteriaKind },

    #[error("expected a root node, got {kind}")]
    NotARoot { kind: CriteriaKind },

    #[error("{kind} node for '{source_name}' can only be visited through its join attachment")]
    DetachedJoin {
        kind: CriteriaKind,
        source_name: String,
    },

    #[error("relation '{alias}' targets '{expected}', but the joined node is bound to '{actual}'")]
    JoinTargetMismatch {
        alias: String,
        expected: String,
        actual: String,
    },

    #[error("relation '{alias}': joined node was created by a different factory")]
    ForeignFactory { alias: String },

    #[error("relation '{relation}': alias '{alias}' is already used in this criteria tree")]
    DuplicateAlias { alias: String, relation: String },

    #[error("a node alias cannot be empty")]
    EmptyAlias,

    #[error("only root nodes can be reset")]
    ResetOnJoin,
}

/// A cursor is malformed, or cursors in one query cannot be combined.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("a cursor needs one or two keys, got {0}")]
    KeyCount(usize),

    #[error("cursor field '{0}' appears more than once")]
    DuplicateField(String),

    #[error("cursor key '{0}' has no value")]
    MissingValue(String),

    #[error("cursor key '{field}' must be a finite primitive value, got {actual}")]
    InvalidValue { field: String, actual: &'static str },

    #[error("cursors in one query must share the same operator")]
    ConflictingOperators,

    #[error("cursors in one query may contribute at most two keys, got {0}")]
    TooManyKeys(usize),
}

/// Any error raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Malformed plain value (structure, not semantics).
    #[error("malformed plain value: {0}")]
    Plain(#[from] serde_json::Error),
}

/// Result type for criteria operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for SQL translation.

use criteria::FilterOperator;
use thiserror::Error;

/// Errors raised while translating criteria into SQL.
#[derive(Debug, Error)]
pub enum SqlError {
    /// A criteria error surfaced during traversal (plan conflicts, detached joins).
    #[error(transparent)]
    Criteria(#[from] criteria::Error),

    /// The filter value has no SQL rendering for its operator.
    #[error("cannot render {operator} on '{field}': unsupported value shape")]
    UnsupportedValue {
        operator: FilterOperator,
        field: String,
    },
}

/// Result type for SQL translation.
pub type Result<T> = std::result::Result<T, SqlError>;

//! Filter and logical operators.
//!
//! The [`FilterOperator`] enum is the closed vocabulary of conditions a
//! [`Filter`](crate::Filter) can express. Every operator maps to exactly one
//! [`ValueShape`], the contract its value must satisfy at construction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Comparison operator for a filter.
///
/// Operators are grouped by the value shape they accept:
/// - **Text**: `Like`, `NotLike`, `ILike`, `NotILike`, `Contains`, `NotContains`,
///   `StartsWith`, `EndsWith`, `MatchesRegex`
/// - **Scalar**: `Equals`, `NotEquals`, `GreaterThan`, `GreaterThanOrEquals`,
///   `LessThan`, `LessThanOrEquals`
/// - **Membership**: `In`, `NotIn`
/// - **Null check**: `IsNull`, `IsNotNull`
/// - **Range**: `Between`, `NotBetween`
/// - **Collections**: the `Set*` and `Array*` families
/// - **JSON documents**: the `Json*` family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Like,
    NotLike,
    ILike,
    NotILike,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    MatchesRegex,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
    SetContains,
    SetNotContains,
    SetContainsAny,
    SetContainsAll,
    JsonContains,
    JsonNotContains,
    JsonContainsAny,
    JsonContainsAll,
    JsonPathValueEquals,
    JsonPathValueNotEquals,
    ArrayContainsElement,
    ArrayNotContainsElement,
    ArrayContainsAllElements,
    ArrayContainsAnyElement,
    ArrayEquals,
    ArrayEqualsStrict,
}

impl FilterOperator {
    /// Every operator, in declaration order.
    pub const ALL: [FilterOperator; 37] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::Like,
        FilterOperator::NotLike,
        FilterOperator::ILike,
        FilterOperator::NotILike,
        FilterOperator::Contains,
        FilterOperator::NotContains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::MatchesRegex,
        FilterOperator::GreaterThan,
        FilterOperator::GreaterThanOrEquals,
        FilterOperator::LessThan,
        FilterOperator::LessThanOrEquals,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::Between,
        FilterOperator::NotBetween,
        FilterOperator::SetContains,
        FilterOperator::SetNotContains,
        FilterOperator::SetContainsAny,
        FilterOperator::SetContainsAll,
        FilterOperator::JsonContains,
        FilterOperator::JsonNotContains,
        FilterOperator::JsonContainsAny,
        FilterOperator::JsonContainsAll,
        FilterOperator::JsonPathValueEquals,
        FilterOperator::JsonPathValueNotEquals,
        FilterOperator::ArrayContainsElement,
        FilterOperator::ArrayNotContainsElement,
        FilterOperator::ArrayContainsAllElements,
        FilterOperator::ArrayContainsAnyElement,
        FilterOperator::ArrayEquals,
        FilterOperator::ArrayEqualsStrict,
    ];

    /// Returns the value shape this operator requires.
    pub fn shape(self) -> ValueShape {
        use FilterOperator::*;
        match self {
            Like | NotLike | ILike | NotILike | Contains | NotContains | StartsWith | EndsWith
            | MatchesRegex => ValueShape::Text,
            Equals | NotEquals | GreaterThan | GreaterThanOrEquals | LessThan
            | LessThanOrEquals => ValueShape::Scalar,
            In | NotIn => ValueShape::Membership,
            IsNull | IsNotNull => ValueShape::NullCheck,
            Between | NotBetween => ValueShape::Range,
            SetContains | SetNotContains | ArrayContainsElement | ArrayNotContainsElement => {
                ValueShape::Element
            }
            SetContainsAny | SetContainsAll | ArrayContainsAllElements
            | ArrayContainsAnyElement | ArrayEquals | ArrayEqualsStrict => ValueShape::Elements,
            JsonContains | JsonNotContains => ValueShape::JsonDocument,
            JsonContainsAny | JsonContainsAll => ValueShape::JsonElements,
            JsonPathValueEquals | JsonPathValueNotEquals => ValueShape::JsonPathValue,
        }
    }

    /// Returns the canonical name of this operator.
    pub fn as_str(self) -> &'static str {
        use FilterOperator::*;
        match self {
            Equals => "EQUALS",
            NotEquals => "NOT_EQUALS",
            Like => "LIKE",
            NotLike => "NOT_LIKE",
            ILike => "ILIKE",
            NotILike => "NOT_ILIKE",
            Contains => "CONTAINS",
            NotContains => "NOT_CONTAINS",
            StartsWith => "STARTS_WITH",
            EndsWith => "ENDS_WITH",
            MatchesRegex => "MATCHES_REGEX",
            GreaterThan => "GREATER_THAN",
            GreaterThanOrEquals => "GREATER_THAN_OR_EQUALS",
            LessThan => "LESS_THAN",
            LessThanOrEquals => "LESS_THAN_OR_EQUALS",
            In => "IN",
            NotIn => "NOT_IN",
            IsNull => "IS_NULL",
            IsNotNull => "IS_NOT_NULL",
            Between => "BETWEEN",
            NotBetween => "NOT_BETWEEN",
            SetContains => "SET_CONTAINS",
            SetNotContains => "SET_NOT_CONTAINS",
            SetContainsAny => "SET_CONTAINS_ANY",
            SetContainsAll => "SET_CONTAINS_ALL",
            JsonContains => "JSON_CONTAINS",
            JsonNotContains => "JSON_NOT_CONTAINS",
            JsonContainsAny => "JSON_CONTAINS_ANY",
            JsonContainsAll => "JSON_CONTAINS_ALL",
            JsonPathValueEquals => "JSON_PATH_VALUE_EQUALS",
            JsonPathValueNotEquals => "JSON_PATH_VALUE_NOT_EQUALS",
            ArrayContainsElement => "ARRAY_CONTAINS_ELEMENT",
            ArrayNotContainsElement => "ARRAY_NOT_CONTAINS_ELEMENT",
            ArrayContainsAllElements => "ARRAY_CONTAINS_ALL_ELEMENTS",
            ArrayContainsAnyElement => "ARRAY_CONTAINS_ANY_ELEMENT",
            ArrayEquals => "ARRAY_EQUALS",
            ArrayEqualsStrict => "ARRAY_EQUALS_STRICT",
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| FilterError::UnhandledOperator(s.to_string()))
    }
}

impl TryFrom<String> for FilterOperator {
    type Error = FilterError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FilterOperator> for &'static str {
    fn from(op: FilterOperator) -> Self {
        op.as_str()
    }
}

/// The value contract an operator imposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// A text value.
    Text,
    /// Any primitive, including null.
    Scalar,
    /// A list of non-null primitives.
    Membership,
    /// A two-element list of non-null primitives.
    Range,
    /// Absent or null.
    NullCheck,
    /// A non-null primitive, or a single-key map from path to one.
    Element,
    /// A list of non-null primitives, or a single-key map from path to one.
    Elements,
    /// A non-empty map from path to JSON-compatible values.
    JsonDocument,
    /// A non-empty map from path to lists of JSON-compatible values.
    JsonElements,
    /// A non-empty map from path to primitives.
    JsonPathValue,
}

impl ValueShape {
    /// Human-readable description used in validation errors.
    pub fn describe(self) -> &'static str {
        match self {
            ValueShape::Text => "a text value",
            ValueShape::Scalar => "a primitive value (text, number, boolean, timestamp or null)",
            ValueShape::Membership => "a list of non-null primitives",
            ValueShape::Range => "a two-element list of non-null primitives",
            ValueShape::NullCheck => "no value or null",
            ValueShape::Element => {
                "a non-null primitive, or a single-key map from path to a non-null primitive"
            }
            ValueShape::Elements => {
                "a list of non-null primitives, or a single-key map from path to such a list"
            }
            ValueShape::JsonDocument => "a non-empty map from path to JSON-compatible values",
            ValueShape::JsonElements => {
                "a non-empty map from path to lists of JSON-compatible values"
            }
            ValueShape::JsonPathValue => "a non-empty map from path to primitive values",
        }
    }
}

/// Logical combinator of a [`FilterGroup`](crate::FilterGroup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Returns the canonical name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for op in FilterOperator::ALL {
            assert_eq!(op.as_str().parse::<FilterOperator>().unwrap(), op);
        }
    }

    #[test]
    fn unknown_name_is_unhandled() {
        let err = "SOUNDS_LIKE".parse::<FilterOperator>().unwrap_err();
        assert!(matches!(err, FilterError::UnhandledOperator(ref name) if name == "SOUNDS_LIKE"));
    }

    #[test]
    fn shapes_by_family() {
        assert_eq!(FilterOperator::Like.shape(), ValueShape::Text);
        assert_eq!(FilterOperator::Equals.shape(), ValueShape::Scalar);
        assert_eq!(FilterOperator::NotIn.shape(), ValueShape::Membership);
        assert_eq!(FilterOperator::Between.shape(), ValueShape::Range);
        assert_eq!(FilterOperator::IsNull.shape(), ValueShape::NullCheck);
        assert_eq!(FilterOperator::SetContains.shape(), ValueShape::Element);
        assert_eq!(FilterOperator::ArrayEquals.shape(), ValueShape::Elements);
        assert_eq!(FilterOperator::JsonContains.shape(), ValueShape::JsonDocument);
        assert_eq!(FilterOperator::JsonContainsAll.shape(), ValueShape::JsonElements);
        assert_eq!(
            FilterOperator::JsonPathValueEquals.shape(),
            ValueShape::JsonPathValue
        );
    }

    #[test]
    fn operator_serializes_as_name() {
        let json = serde_json::to_string(&FilterOperator::GreaterThanOrEquals).unwrap();
        assert_eq!(json, r#""GREATER_THAN_OR_EQUALS""#);

        let back: FilterOperator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FilterOperator::GreaterThanOrEquals);
        assert!(serde_json::from_str::<FilterOperator>(r#""NOPE""#).is_err());
    }

    #[test]
    fn logical_display() {
        assert_eq!(LogicalOperator::And.to_string(), "AND");
        assert_eq!(LogicalOperator::Or.to_string(), "OR");
    }
}

//! Single filter conditions.
//!
//! A [`Filter`] is one `(field, operator, value)` condition. Construction is
//! the only validation point: once built, a filter is known to carry a value
//! whose shape matches its operator's contract.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};
use crate::op::{FilterOperator, ValueShape};
use crate::plain::{self, PlainFilter};
use crate::value::Value;

/// A single, validated filter condition.
///
/// # Example
///
/// ```
/// use criteria::{Filter, FilterOperator, Value};
///
/// let filter = Filter::new("status", FilterOperator::In, vec!["draft", "review"]).unwrap();
/// assert_eq!(filter.field(), "status");
///
/// // Range operators need exactly two bounds.
/// assert!(Filter::new("age", FilterOperator::Between, vec![18]).is_err());
///
/// // Null checks take no value at all.
/// let missing = Filter::absent("deleted_at", FilterOperator::IsNull).unwrap();
/// assert!(missing.value().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlainFilter", into = "PlainFilter")]
pub struct Filter {
    field: String,
    operator: FilterOperator,
    value: Option<Value>,
}

impl Filter {
    /// Creates a filter with a present value.
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Result<Self> {
        Filter::from_parts(field, operator, Some(value.into()))
    }

    /// Creates a filter without a value (null-check operators).
    pub fn absent(field: impl Into<String>, operator: FilterOperator) -> Result<Self> {
        Filter::from_parts(field, operator, None)
    }

    /// Creates a filter from an optional value, validating its shape.
    pub fn from_parts(
        field: impl Into<String>,
        operator: FilterOperator,
        value: Option<Value>,
    ) -> Result<Self> {
        validate(operator, value.as_ref())?;
        Ok(Filter {
            field: field.into(),
            operator,
            value,
        })
    }

    /// The field this condition applies to.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The comparison operator.
    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    /// The comparison value; `None` when absent.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns the plain (JSON) form of this filter.
    pub fn to_plain(&self) -> serde_json::Value {
        plain::filter_to_json(self)
    }

    /// Rebuilds a filter from its plain form, re-running validation.
    pub fn from_plain(value: serde_json::Value) -> Result<Self> {
        let plain: PlainFilter = serde_json::from_value(value)?;
        plain.into_filter()
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {}", self.field, self.operator, value),
            None => write!(f, "{} {}", self.field, self.operator),
        }
    }
}

fn validate(operator: FilterOperator, value: Option<&Value>) -> std::result::Result<(), FilterError> {
    let shape = operator.shape();
    let valid = match shape {
        ValueShape::Text => matches!(value, Some(Value::Text(_))),
        ValueShape::Scalar => value.is_some_and(Value::is_primitive),
        ValueShape::Membership => value.is_some_and(is_primitive_list),
        ValueShape::Range => {
            value.is_some_and(|v| is_primitive_list(v) && v.as_list().is_some_and(|l| l.len() == 2))
        }
        ValueShape::NullCheck => value.map_or(true, Value::is_null),
        ValueShape::Element => value.is_some_and(|v| {
            v.is_non_null_primitive() || single_path(v, Value::is_non_null_primitive)
        }),
        ValueShape::Elements => {
            value.is_some_and(|v| is_primitive_list(v) || single_path(v, is_primitive_list))
        }
        ValueShape::JsonDocument => value.is_some_and(|v| every_path(v, Value::is_json)),
        ValueShape::JsonElements => value.is_some_and(|v| {
            every_path(v, |item| {
                matches!(item, Value::List(items) if items.iter().all(Value::is_json))
            })
        }),
        ValueShape::JsonPathValue => value.is_some_and(|v| every_path(v, Value::is_primitive)),
    };

    if !valid {
        return Err(FilterError::InvalidValue {
            operator,
            expected: shape.describe(),
            actual: value.map_or("nothing", Value::kind),
        });
    }

    if value.is_some_and(|v| !v.is_finite()) {
        return Err(FilterError::NonFiniteNumber { operator });
    }

    if operator == FilterOperator::MatchesRegex {
        if let Some(Value::Text(pattern)) = value {
            Regex::new(pattern)?;
        }
    }

    Ok(())
}

fn is_primitive_list(value: &Value) -> bool {
    matches!(value, Value::List(items) if items.iter().all(Value::is_non_null_primitive))
}

// Nested-document form: exactly one `path -> value` entry.
fn single_path(value: &Value, accepts: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Map(map) if map.len() == 1 => map.values().all(accepts),
        _ => false,
    }
}

fn every_path(value: &Value, accepts: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Map(map) if !map.is_empty() => map.values().all(accepts),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::value::Timestamp;

    fn rejects(operator: FilterOperator, value: Option<Value>) -> bool {
        matches!(
            Filter::from_parts("f", operator, value),
            Err(Error::Filter(FilterError::InvalidValue { .. }))
        )
    }

    #[test]
    fn text_operators_need_text() {
        assert!(Filter::new("name", FilterOperator::Like, "%a%").is_ok());
        assert!(Filter::new("name", FilterOperator::StartsWith, "a").is_ok());
        assert!(rejects(FilterOperator::Contains, Some(Value::from(1))));
        assert!(rejects(FilterOperator::EndsWith, Some(Value::Null)));
        assert!(rejects(FilterOperator::ILike, None));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for value in [
            Value::from(f64::INFINITY),
            Value::from(f64::NAN),
            Value::from(vec![1.0, f64::NEG_INFINITY]),
            Value::path("scores", vec![f64::NAN]),
        ] {
            let operator = if value.is_primitive() {
                FilterOperator::Equals
            } else if value.as_list().is_some() {
                FilterOperator::In
            } else {
                FilterOperator::ArrayContainsAnyElement
            };
            assert!(matches!(
                Filter::from_parts("f", operator, Some(value)),
                Err(Error::Filter(FilterError::NonFiniteNumber { .. }))
            ));
        }
        assert!(Filter::new("f", FilterOperator::Equals, 1.5).is_ok());
    }

    #[test]
    fn scalar_operators_accept_any_primitive() {
        assert!(Filter::new("a", FilterOperator::Equals, 1).is_ok());
        assert!(Filter::new("a", FilterOperator::Equals, Value::Null).is_ok());
        assert!(Filter::new("a", FilterOperator::GreaterThan, Timestamp(5)).is_ok());
        assert!(Filter::new("a", FilterOperator::NotEquals, true).is_ok());
        assert!(rejects(FilterOperator::LessThan, Some(Value::from(vec![1]))));
        assert!(rejects(FilterOperator::Equals, None));
    }

    #[test]
    fn membership_rejects_nulls_and_nesting() {
        assert!(Filter::new("a", FilterOperator::In, vec![1, 2, 3]).is_ok());
        assert!(Filter::new("a", FilterOperator::NotIn, Vec::<i64>::new()).is_ok());
        assert!(rejects(
            FilterOperator::In,
            Some(Value::from(vec![Value::from(1), Value::Null]))
        ));
        assert!(rejects(FilterOperator::In, Some(Value::from(1))));
    }

    #[test]
    fn range_needs_two_bounds() {
        assert!(Filter::new("a", FilterOperator::Between, [1, 5]).is_ok());
        assert!(rejects(FilterOperator::Between, Some(Value::from(vec![1]))));
        assert!(rejects(FilterOperator::NotBetween, Some(Value::from(vec![1, 2, 3]))));
        assert!(rejects(
            FilterOperator::Between,
            Some(Value::from(vec![Value::Null, Value::from(2)]))
        ));
    }

    #[test]
    fn null_checks_take_nothing_or_null() {
        assert!(Filter::absent("a", FilterOperator::IsNull).is_ok());
        assert!(Filter::new("a", FilterOperator::IsNotNull, Value::Null).is_ok());
        assert!(rejects(FilterOperator::IsNull, Some(Value::from(false))));
    }

    #[test]
    fn element_operators_accept_direct_or_single_path() {
        assert!(Filter::new("tags", FilterOperator::SetContains, "red").is_ok());
        assert!(Filter::new("doc", FilterOperator::ArrayContainsElement, Value::path("a.b", 1)).is_ok());

        let mut two_keys = std::collections::BTreeMap::new();
        two_keys.insert("a".to_string(), Value::from(1));
        two_keys.insert("b".to_string(), Value::from(2));
        assert!(rejects(FilterOperator::SetContains, Some(Value::Map(two_keys))));
        assert!(rejects(FilterOperator::SetNotContains, Some(Value::path("a", vec![1]))));
        assert!(rejects(FilterOperator::SetContains, Some(Value::Null)));
    }

    #[test]
    fn elements_operators_accept_lists() {
        assert!(Filter::new("tags", FilterOperator::SetContainsAny, vec!["a", "b"]).is_ok());
        assert!(Filter::new("doc", FilterOperator::ArrayEquals, Value::path("x", vec![1, 2])).is_ok());
        assert!(rejects(FilterOperator::ArrayEqualsStrict, Some(Value::from("a"))));
        assert!(rejects(FilterOperator::SetContainsAll, Some(Value::path("x", 1))));
    }

    #[test]
    fn json_operators_need_path_maps() {
        let doc = Value::path("profile", Value::path("theme", "dark"));
        assert!(Filter::new("data", FilterOperator::JsonContains, doc).is_ok());
        assert!(Filter::new("data", FilterOperator::JsonContainsAny, Value::path("tags", vec!["a"])).is_ok());
        assert!(Filter::new("data", FilterOperator::JsonPathValueEquals, Value::path("age", 3)).is_ok());

        assert!(rejects(FilterOperator::JsonContains, Some(Value::from("x"))));
        assert!(rejects(
            FilterOperator::JsonContains,
            Some(Value::Map(Default::default()))
        ));
        assert!(rejects(
            FilterOperator::JsonContains,
            Some(Value::path("at", Timestamp(1)))
        ));
        assert!(rejects(FilterOperator::JsonContainsAll, Some(Value::path("tags", "a"))));
        assert!(rejects(
            FilterOperator::JsonPathValueNotEquals,
            Some(Value::path("a", vec![1]))
        ));
    }

    #[test]
    fn regex_must_compile() {
        assert!(Filter::new("name", FilterOperator::MatchesRegex, r"^a\d+$").is_ok());
        let err = Filter::new("name", FilterOperator::MatchesRegex, "(unclosed").unwrap_err();
        assert!(matches!(err, Error::Filter(FilterError::InvalidRegex(_))));
    }

    #[test]
    fn error_names_operator_and_shape() {
        let err = Filter::new("a", FilterOperator::Between, 3).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("BETWEEN"));
        assert!(message.contains("two-element list"));
    }

    #[test]
    fn display() {
        let filter = Filter::new("age", FilterOperator::GreaterThan, 18).unwrap();
        assert_eq!(filter.to_string(), "age GREATER_THAN 18");
        let filter = Filter::absent("deleted_at", FilterOperator::IsNull).unwrap();
        assert_eq!(filter.to_string(), "deleted_at IS_NULL");
    }
}

//! Plain (JSON) form of filters and filter groups.
//!
//! The plain form is a lossless, serde-friendly mirror of the normalized
//! tree:
//!
//! ```text
//! filter := { "field": str, "operator": OPERATOR, "value"?: value }
//! group  := { "logical_operator": "AND" | "OR", "items": [filter | group] }
//! ```
//!
//! A missing `value` key means the value is absent; `"value": null` is an
//! explicit null. Rebuilding from the plain form goes through the regular
//! constructors, so validation and normalization run again.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::group::{FilterGroup, FilterItem};
use crate::op::{FilterOperator, LogicalOperator};
use crate::value::{Number, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlainFilter {
    field: String,
    operator: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlainGroup {
    logical_operator: LogicalOperator,
    items: Vec<PlainItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum PlainItem {
    Filter(PlainFilter),
    Group(PlainGroup),
}

// A present key always yields `Some`, even for `null`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl PlainFilter {
    pub(crate) fn into_filter(self) -> Result<Filter> {
        let operator: FilterOperator = self.operator.parse()?;
        Filter::from_parts(self.field, operator, self.value)
    }
}

impl PlainGroup {
    pub(crate) fn into_group(self) -> Result<FilterGroup> {
        let items = self
            .items
            .into_iter()
            .map(PlainItem::into_item)
            .collect::<Result<Vec<_>>>()?;
        Ok(FilterGroup::new(self.logical_operator, items))
    }
}

impl PlainItem {
    fn into_item(self) -> Result<FilterItem> {
        match self {
            PlainItem::Filter(filter) => filter.into_filter().map(FilterItem::Filter),
            PlainItem::Group(group) => group.into_group().map(FilterItem::Group),
        }
    }
}

impl From<Filter> for PlainFilter {
    fn from(filter: Filter) -> Self {
        PlainFilter {
            field: filter.field().to_string(),
            operator: filter.operator().as_str().to_string(),
            value: filter.value().cloned(),
        }
    }
}

impl From<FilterGroup> for PlainGroup {
    fn from(group: FilterGroup) -> Self {
        PlainGroup {
            logical_operator: group.logical_operator(),
            items: group.items().iter().cloned().map(PlainItem::from).collect(),
        }
    }
}

impl From<FilterItem> for PlainItem {
    fn from(item: FilterItem) -> Self {
        match item {
            FilterItem::Filter(filter) => PlainItem::Filter(filter.into()),
            FilterItem::Group(group) => PlainItem::Group(group.into()),
        }
    }
}

impl TryFrom<PlainFilter> for Filter {
    type Error = Error;

    fn try_from(plain: PlainFilter) -> Result<Self> {
        plain.into_filter()
    }
}

impl TryFrom<PlainGroup> for FilterGroup {
    type Error = Error;

    fn try_from(plain: PlainGroup) -> Result<Self> {
        plain.into_group()
    }
}

pub(crate) fn filter_to_json(filter: &Filter) -> serde_json::Value {
    let mut out = json!({
        "field": filter.field(),
        "operator": filter.operator().as_str(),
    });
    if let (Some(value), Some(object)) = (filter.value(), out.as_object_mut()) {
        object.insert("value".to_string(), value_to_json(value));
    }
    out
}

pub(crate) fn group_to_json(group: &FilterGroup) -> serde_json::Value {
    let items: Vec<serde_json::Value> = group
        .items()
        .iter()
        .map(|item| match item {
            FilterItem::Filter(filter) => filter_to_json(filter),
            FilterItem::Group(group) => group_to_json(group),
        })
        .collect();
    json!({
        "logical_operator": group.logical_operator().as_str(),
        "items": items,
    })
}

/// Converts a value to JSON, matching its serde representation.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(Number::I64(n)) => json!(n),
        Value::Number(Number::U64(n)) => json!(n),
        Value::Number(Number::F64(n)) => serde_json::Number::from_f64(*n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Timestamp(ts) => json!({ "$timestamp": ts.as_millis() }),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), value_to_json(item)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::value::Timestamp;

    #[test]
    fn absent_and_null_values_stay_distinct() {
        let absent = Filter::absent("a", FilterOperator::IsNull).unwrap();
        let null = Filter::new("a", FilterOperator::IsNull, Value::Null).unwrap();

        assert_eq!(absent.to_plain(), json!({"field": "a", "operator": "IS_NULL"}));
        assert_eq!(
            null.to_plain(),
            json!({"field": "a", "operator": "IS_NULL", "value": null})
        );

        assert_eq!(Filter::from_plain(absent.to_plain()).unwrap(), absent);
        assert_eq!(Filter::from_plain(null.to_plain()).unwrap(), null);
    }

    #[test]
    fn serde_and_plain_agree() {
        let filter = Filter::new("at", FilterOperator::GreaterThan, Timestamp(10)).unwrap();
        assert_eq!(serde_json::to_value(&filter).unwrap(), filter.to_plain());
    }

    #[test]
    fn unknown_operator_is_reported_as_unhandled() {
        let err = Filter::from_plain(json!({"field": "a", "operator": "FUZZY", "value": 1}))
            .unwrap_err();
        assert!(matches!(err, Error::Filter(FilterError::UnhandledOperator(_))));
    }

    #[test]
    fn invalid_shape_is_rejected_on_rebuild() {
        let err = Filter::from_plain(json!({"field": "a", "operator": "IN", "value": 1}))
            .unwrap_err();
        assert!(matches!(err, Error::Filter(FilterError::InvalidValue { .. })));
    }

    #[test]
    fn malformed_structure_is_a_plain_error() {
        let err = FilterGroup::from_plain(json!({"logical_operator": "XOR", "items": []}))
            .unwrap_err();
        assert!(matches!(err, Error::Plain(_)));
    }
}

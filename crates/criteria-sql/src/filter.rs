//! PostgreSQL renderings of filter operators.
//!
//! Every value is bound as a parameter. Nested-document values (`{path: v}`)
//! address a `jsonb` column: the path is split on `.` and bound as a `text[]`
//! for the `#>` operator, and JSON operands are bound as text and cast with
//! `::jsonb`.

use std::collections::BTreeMap;

use criteria::{value_to_json, Filter, FilterOperator, Value};

use crate::error::{Result, SqlError};
use crate::query::SqlQuery;

/// Renders `filter` on the node aliased `alias`, binding values into `query`.
pub(crate) fn render(filter: &Filter, alias: &str, query: &mut SqlQuery) -> Result<String> {
    use FilterOperator::*;

    let column = format!("{alias}.{}", filter.field());
    let operator = filter.operator();
    let unsupported = || SqlError::UnsupportedValue {
        operator,
        field: filter.field().to_string(),
    };
    let value = filter.value();

    let sql = match (operator, value) {
        (Equals, Some(Value::Null)) | (IsNull, _) => format!("{column} IS NULL"),
        (NotEquals, Some(Value::Null)) | (IsNotNull, _) => format!("{column} IS NOT NULL"),
        (Equals, Some(v)) => compare(&column, "=", v, query),
        (NotEquals, Some(v)) => compare(&column, "<>", v, query),
        (GreaterThan, Some(v)) => compare(&column, ">", v, query),
        (GreaterThanOrEquals, Some(v)) => compare(&column, ">=", v, query),
        (LessThan, Some(v)) => compare(&column, "<", v, query),
        (LessThanOrEquals, Some(v)) => compare(&column, "<=", v, query),

        (Like, Some(v)) => compare(&column, "LIKE", v, query),
        (NotLike, Some(v)) => compare(&column, "NOT LIKE", v, query),
        (ILike, Some(v)) => compare(&column, "ILIKE", v, query),
        (NotILike, Some(v)) => compare(&column, "NOT ILIKE", v, query),
        (MatchesRegex, Some(v)) => compare(&column, "~", v, query),
        (Contains | NotContains | StartsWith | EndsWith, Some(Value::Text(text))) => {
            let escaped = escape_like(text);
            let (keyword, pattern) = match operator {
                Contains => ("LIKE", format!("%{escaped}%")),
                NotContains => ("NOT LIKE", format!("%{escaped}%")),
                StartsWith => ("LIKE", format!("{escaped}%")),
                _ => ("LIKE", format!("%{escaped}")),
            };
            format!("{column} {keyword} {}", query.bind(pattern))
        }

        (In, Some(Value::List(items))) => membership(&column, "IN", "FALSE", items, query),
        (NotIn, Some(Value::List(items))) => membership(&column, "NOT IN", "TRUE", items, query),
        (Between | NotBetween, Some(Value::List(bounds))) if bounds.len() == 2 => {
            let keyword = if operator == Between { "BETWEEN" } else { "NOT BETWEEN" };
            let low = query.bind(bounds[0].clone());
            let high = query.bind(bounds[1].clone());
            format!("{column} {keyword} {low} AND {high}")
        }

        (SetContains | ArrayContainsElement, Some(Value::Map(map))) => {
            let (target, element) = single_path(&column, map, query).ok_or_else(unsupported)?;
            format!("{target} @> {}", jsonb(element, query))
        }
        (SetNotContains | ArrayNotContainsElement, Some(Value::Map(map))) => {
            let (target, element) = single_path(&column, map, query).ok_or_else(unsupported)?;
            format!("NOT ({target} @> {})", jsonb(element, query))
        }
        (SetContains | ArrayContainsElement, Some(v)) => {
            format!("{} = ANY({column})", query.bind(v.clone()))
        }
        (SetNotContains | ArrayNotContainsElement, Some(v)) => {
            format!("NOT ({} = ANY({column}))", query.bind(v.clone()))
        }

        (
            SetContainsAny | SetContainsAll | ArrayContainsAllElements | ArrayContainsAnyElement
            | ArrayEquals | ArrayEqualsStrict,
            Some(Value::Map(map)),
        ) => {
            let (target, elements) = single_path(&column, map, query).ok_or_else(unsupported)?;
            let items = elements.as_list().ok_or_else(unsupported)?;
            json_elements(operator, &target, items, query)
        }
        (
            SetContainsAny | SetContainsAll | ArrayContainsAllElements | ArrayContainsAnyElement
            | ArrayEquals | ArrayEqualsStrict,
            Some(Value::List(items)),
        ) => array_elements(operator, &column, items, query),

        (JsonContains | JsonNotContains, Some(Value::Map(map))) => {
            let negate = operator == JsonNotContains;
            every_path(&column, map, query, |target, value, query| {
                let contains = format!("{target} @> {}", jsonb(value, query));
                if negate {
                    format!("NOT ({contains})")
                } else {
                    contains
                }
            })
        }
        (JsonContainsAny | JsonContainsAll, Some(Value::Map(map))) => {
            let all = operator == JsonContainsAll;
            every_path(&column, map, query, |target, value, query| {
                let items = value.as_list().unwrap_or_default();
                if all {
                    format!("{target} @> {}", jsonb(value, query))
                } else {
                    any_of(items, query, |item, query| {
                        format!("{target} @> {}", jsonb(item, query))
                    })
                }
            })
        }
        (JsonPathValueEquals | JsonPathValueNotEquals, Some(Value::Map(map))) => {
            let symbol = if operator == JsonPathValueEquals { "=" } else { "<>" };
            every_path(&column, map, query, |target, value, query| {
                format!("{target} {symbol} {}", jsonb(value, query))
            })
        }

        _ => return Err(unsupported()),
    };
    Ok(sql)
}

fn compare(column: &str, symbol: &str, value: &Value, query: &mut SqlQuery) -> String {
    format!("{column} {symbol} {}", query.bind(value.clone()))
}

fn membership(
    column: &str,
    keyword: &str,
    when_empty: &str,
    items: &[Value],
    query: &mut SqlQuery,
) -> String {
    if items.is_empty() {
        return when_empty.to_string();
    }
    let placeholders: Vec<String> = items.iter().map(|item| query.bind(item.clone())).collect();
    format!("{column} {keyword} ({})", placeholders.join(", "))
}

fn array_elements(
    operator: FilterOperator,
    column: &str,
    items: &[Value],
    query: &mut SqlQuery,
) -> String {
    use FilterOperator::*;

    if matches!(operator, SetContainsAny | ArrayContainsAnyElement) && items.is_empty() {
        return "FALSE".to_string();
    }
    let array = query.bind(items.to_vec());
    match operator {
        SetContainsAny | ArrayContainsAnyElement => format!("{column} && {array}"),
        ArrayEquals => format!("({column} @> {array} AND {column} <@ {array})"),
        ArrayEqualsStrict => format!("{column} = {array}"),
        _ => format!("{column} @> {array}"),
    }
}

fn json_elements(
    operator: FilterOperator,
    target: &str,
    items: &[Value],
    query: &mut SqlQuery,
) -> String {
    use FilterOperator::*;

    let document = Value::List(items.to_vec());
    match operator {
        SetContainsAny | ArrayContainsAnyElement => any_of(items, query, |item, query| {
            format!("{target} @> {}", jsonb(item, query))
        }),
        ArrayEquals => {
            let array = jsonb(&document, query);
            format!("({target} @> {array} AND {target} <@ {array})")
        }
        ArrayEqualsStrict => format!("{target} = {}", jsonb(&document, query)),
        _ => format!("{target} @> {}", jsonb(&document, query)),
    }
}

fn any_of(
    items: &[Value],
    query: &mut SqlQuery,
    mut render: impl FnMut(&Value, &mut SqlQuery) -> String,
) -> String {
    if items.is_empty() {
        return "FALSE".to_string();
    }
    let parts: Vec<String> = items.iter().map(|item| render(item, query)).collect();
    format!("({})", parts.join(" OR "))
}

// `(column #> $n)` with the dotted path bound as text[].
fn path_target(column: &str, path: &str, query: &mut SqlQuery) -> String {
    let segments: Vec<Value> = path.split('.').map(Value::from).collect();
    format!("({column} #> {})", query.bind(segments))
}

fn single_path<'a>(
    column: &str,
    map: &'a BTreeMap<String, Value>,
    query: &mut SqlQuery,
) -> Option<(String, &'a Value)> {
    let (path, value) = map.iter().next()?;
    Some((path_target(column, path, query), value))
}

fn every_path(
    column: &str,
    map: &BTreeMap<String, Value>,
    query: &mut SqlQuery,
    mut render: impl FnMut(&str, &Value, &mut SqlQuery) -> String,
) -> String {
    let parts: Vec<String> = map
        .iter()
        .map(|(path, value)| {
            let target = path_target(column, path, query);
            render(&target, value, query)
        })
        .collect();
    if parts.len() == 1 {
        parts.concat()
    } else {
        format!("({})", parts.join(" AND "))
    }
}

fn jsonb(value: &Value, query: &mut SqlQuery) -> String {
    format!("{}::jsonb", query.bind(value_to_json(value).to_string()))
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sql(operator: FilterOperator, value: impl Into<Value>) -> (String, Vec<Value>) {
        let filter = Filter::new("f", operator, value).unwrap();
        let mut query = SqlQuery::new();
        let sql = render(&filter, "t", &mut query).unwrap();
        (sql, query.params().to_vec())
    }

    fn path(path: &str, value: impl Into<Value>) -> Value {
        Value::path(path, value)
    }

    fn segments(parts: &[&str]) -> Value {
        Value::from(parts.to_vec())
    }

    #[test]
    fn scalar_comparisons() {
        assert_eq!(sql(FilterOperator::Equals, 1).0, "t.f = $1");
        assert_eq!(sql(FilterOperator::NotEquals, "a").0, "t.f <> $1");
        assert_eq!(sql(FilterOperator::GreaterThanOrEquals, 3).0, "t.f >= $1");
        assert_eq!(sql(FilterOperator::LessThan, 3).0, "t.f < $1");
    }

    #[test]
    fn null_equality_becomes_null_check() {
        let (text, params) = sql(FilterOperator::Equals, Value::Null);
        assert_eq!(text, "t.f IS NULL");
        assert!(params.is_empty());
        assert_eq!(sql(FilterOperator::NotEquals, Value::Null).0, "t.f IS NOT NULL");

        let filter = Filter::absent("f", FilterOperator::IsNotNull).unwrap();
        let mut query = SqlQuery::new();
        assert_eq!(render(&filter, "t", &mut query).unwrap(), "t.f IS NOT NULL");
    }

    #[test]
    fn text_patterns_escape_wildcards() {
        let (text, params) = sql(FilterOperator::Contains, "50%_off");
        assert_eq!(text, "t.f LIKE $1");
        assert_eq!(params, vec![Value::from("%50\\%\\_off%")]);

        assert_eq!(sql(FilterOperator::StartsWith, "ab").1, vec![Value::from("ab%")]);
        assert_eq!(sql(FilterOperator::EndsWith, "ab").1, vec![Value::from("%ab")]);
        assert_eq!(sql(FilterOperator::NotContains, "x").0, "t.f NOT LIKE $1");
        assert_eq!(sql(FilterOperator::ILike, "A%").0, "t.f ILIKE $1");
        assert_eq!(sql(FilterOperator::MatchesRegex, "^a+$").0, "t.f ~ $1");
    }

    #[test]
    fn membership_and_ranges() {
        let (text, params) = sql(FilterOperator::In, vec![1, 2, 3]);
        assert_eq!(text, "t.f IN ($1, $2, $3)");
        assert_eq!(params.len(), 3);
        assert_eq!(sql(FilterOperator::In, Vec::<i64>::new()).0, "FALSE");
        assert_eq!(sql(FilterOperator::NotIn, Vec::<i64>::new()).0, "TRUE");
        assert_eq!(sql(FilterOperator::NotBetween, vec![1, 9]).0, "t.f NOT BETWEEN $1 AND $2");
    }

    #[test]
    fn array_columns() {
        assert_eq!(sql(FilterOperator::ArrayContainsElement, "x").0, "$1 = ANY(t.f)");
        assert_eq!(sql(FilterOperator::SetNotContains, "x").0, "NOT ($1 = ANY(t.f))");
        assert_eq!(sql(FilterOperator::SetContainsAll, vec!["a", "b"]).0, "t.f @> $1");
        assert_eq!(sql(FilterOperator::ArrayContainsAnyElement, vec!["a"]).0, "t.f && $1");
        assert_eq!(
            sql(FilterOperator::ArrayEquals, vec![1, 2]).0,
            "(t.f @> $1 AND t.f <@ $1)"
        );
        assert_eq!(sql(FilterOperator::ArrayEqualsStrict, vec![1, 2]).0, "t.f = $1");
        assert_eq!(sql(FilterOperator::SetContainsAny, Vec::<i64>::new()).0, "FALSE");
    }

    #[test]
    fn nested_array_paths_use_jsonb() {
        let (text, params) = sql(FilterOperator::ArrayContainsElement, path("meta.tags", "rust"));
        assert_eq!(text, "(t.f #> $1) @> $2::jsonb");
        assert_eq!(params, vec![segments(&["meta", "tags"]), Value::from("\"rust\"")]);

        let (text, params) = sql(FilterOperator::SetContainsAny, path("tags", vec!["a", "b"]));
        assert_eq!(text, "((t.f #> $1) @> $2::jsonb OR (t.f #> $1) @> $3::jsonb)");
        assert_eq!(params.len(), 3);

        let (text, _) = sql(FilterOperator::ArrayContainsAllElements, path("tags", vec![1, 2]));
        assert_eq!(text, "(t.f #> $1) @> $2::jsonb");
    }

    #[test]
    fn json_documents() {
        let mut doc = BTreeMap::new();
        doc.insert("a.b".to_string(), Value::from(1));
        doc.insert("c".to_string(), Value::from(vec!["x"]));
        let (text, params) = sql(FilterOperator::JsonContains, doc);
        assert_eq!(text, "((t.f #> $1) @> $2::jsonb AND (t.f #> $3) @> $4::jsonb)");
        assert_eq!(params[1], Value::from("1"));
        assert_eq!(params[3], Value::from(json!(["x"]).to_string()));

        let (text, _) = sql(FilterOperator::JsonNotContains, path("a", true));
        assert_eq!(text, "NOT ((t.f #> $1) @> $2::jsonb)");

        let (text, _) = sql(FilterOperator::JsonContainsAny, path("a", vec![1, 2]));
        assert_eq!(text, "((t.f #> $1) @> $2::jsonb OR (t.f #> $1) @> $3::jsonb)");

        let (text, params) = sql(FilterOperator::JsonContainsAll, path("a", vec![1, 2]));
        assert_eq!(text, "(t.f #> $1) @> $2::jsonb");
        assert_eq!(params[1], Value::from("[1,2]"));

        let (text, _) = sql(FilterOperator::JsonPathValueNotEquals, path("status", "done"));
        assert_eq!(text, "(t.f #> $1) <> $2::jsonb");
    }

    #[test]
    fn every_operator_renders() {
        for operator in FilterOperator::ALL {
            let value: Option<Value> = match operator.shape() {
                criteria::ValueShape::Text => Some("x".into()),
                criteria::ValueShape::Scalar => Some(1.into()),
                criteria::ValueShape::Membership | criteria::ValueShape::Range => {
                    Some(vec![1, 2].into())
                }
                criteria::ValueShape::NullCheck => None,
                criteria::ValueShape::Element => Some("x".into()),
                criteria::ValueShape::Elements => Some(vec!["x"].into()),
                criteria::ValueShape::JsonDocument | criteria::ValueShape::JsonPathValue => {
                    Some(path("a", 1))
                }
                criteria::ValueShape::JsonElements => Some(path("a", vec![1])),
            };
            let filter = Filter::from_parts("f", operator, value).unwrap();
            let mut query = SqlQuery::new();
            assert!(render(&filter, "t", &mut query).is_ok(), "{operator} failed");
        }
    }
}

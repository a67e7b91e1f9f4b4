//! Seek (keyset) pagination cursors.
//!
//! A [`Cursor`] holds the ordering-key values of the last row a caller has
//! seen and means "continue past this row". It is not a literal filter: with
//! keys `(f1, v1), (f2, v2)` and [`CursorOperator::GreaterThan`] it denotes
//!
//! ```text
//! (f1 > v1) OR (f1 = v1 AND f2 > v2)
//! ```
//!
//! and requires `f1, f2` to lead the query's ordering in the cursor's
//! direction.

use serde::{Deserialize, Serialize};

use crate::error::{CursorError, Result};
use crate::ordering::Direction;
use crate::value::Value;

/// Seek direction of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CursorOperator {
    GreaterThan,
    LessThan,
}

impl CursorOperator {
    /// The strict comparison used on the last key of each seek branch.
    pub fn comparison(self) -> Comparison {
        match self {
            CursorOperator::GreaterThan => Comparison::Greater,
            CursorOperator::LessThan => Comparison::Less,
        }
    }
}

/// Unvalidated cursor input: a field and its (possibly missing) value.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorKey {
    pub field: String,
    pub value: Option<Value>,
}

impl CursorKey {
    /// A key with a present value; `Value::Null` is allowed.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        CursorKey {
            field: field.into(),
            value: Some(value.into()),
        }
    }

    /// A key whose value is missing. Always rejected by [`Cursor::new`].
    pub fn missing(field: impl Into<String>) -> Self {
        CursorKey {
            field: field.into(),
            value: None,
        }
    }
}

/// A validated cursor key.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorField {
    field: String,
    value: Value,
}

impl CursorField {
    /// The field this key orders on.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The value of the last row seen; may be null.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Validated seek-pagination state.
///
/// # Example
///
/// ```
/// use criteria::{Cursor, CursorKey, CursorOperator, Direction};
///
/// let cursor = Cursor::new(
///     vec![CursorKey::new("created_at", "2023-01-01"), CursorKey::new("id", 123)],
///     CursorOperator::GreaterThan,
///     Direction::Asc,
/// )
/// .unwrap();
///
/// // (created_at > ..) OR (created_at = .. AND id > ..)
/// assert_eq!(cursor.seek_terms("p").len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    fields: Vec<CursorField>,
    operator: CursorOperator,
    direction: Direction,
    sequence_id: u64,
}

impl Cursor {
    /// Validates and builds a cursor.
    ///
    /// Fails when there are not one or two keys, when both keys name the
    /// same field, or when a key has no value.
    pub fn new(keys: Vec<CursorKey>, operator: CursorOperator, direction: Direction) -> Result<Self> {
        if keys.is_empty() || keys.len() > 2 {
            return Err(CursorError::KeyCount(keys.len()).into());
        }
        if let [first, second] = keys.as_slice() {
            if first.field == second.field {
                return Err(CursorError::DuplicateField(first.field.clone()).into());
            }
        }

        let fields = keys
            .into_iter()
            .map(|key| match key.value {
                None => Err(CursorError::MissingValue(key.field)),
                Some(value) if !value.is_primitive() => Err(CursorError::InvalidValue {
                    field: key.field,
                    actual: value.kind(),
                }),
                Some(value) if !value.is_finite() => Err(CursorError::InvalidValue {
                    field: key.field,
                    actual: "non-finite number",
                }),
                Some(value) => Ok(CursorField {
                    field: key.field,
                    value,
                }),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Cursor {
            fields,
            operator,
            direction,
            sequence_id: 0,
        })
    }

    pub(crate) fn stamped(mut self, sequence_id: u64) -> Self {
        self.sequence_id = sequence_id;
        self
    }

    /// The cursor keys, in significance order.
    pub fn fields(&self) -> &[CursorField] {
        &self.fields
    }

    /// Whether rows after or before the cursor row are wanted.
    pub fn operator(&self) -> CursorOperator {
        self.operator
    }

    /// Direction of the leading orders this cursor implies.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Stamp assigned when the cursor was set on a criteria node; 0 before.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    /// The ordering prefix this cursor requires, in significance order.
    pub fn leading_orders(&self) -> impl Iterator<Item = (&str, Direction)> + '_ {
        self.fields
            .iter()
            .map(move |key| (key.field.as_str(), self.direction))
    }

    /// The seek condition in disjunctive normal form, qualified by `alias`.
    ///
    /// The outer list is OR-ed, each inner list is AND-ed. Terms assume
    /// `NULLS LAST`.
    pub fn seek_terms(&self, alias: &str) -> Vec<Vec<SeekTerm>> {
        let keys: Vec<SeekKey<'_>> = self
            .fields
            .iter()
            .map(|key| SeekKey {
                alias,
                key,
                direction: self.direction,
                nulls_first: false,
            })
            .collect();
        expand(&keys, self.operator)
    }
}

/// Comparison inside a seek term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    Greater,
    Less,
}

impl Comparison {
    /// The conventional operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Equal => "=",
            Comparison::Greater => ">",
            Comparison::Less => "<",
        }
    }
}

/// One `alias.field <cmp> value` term of a seek condition.
///
/// `direction` and `nulls_first` describe how the key is ordered, which a
/// translator needs when `value` is null.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekTerm {
    pub alias: String,
    pub field: String,
    pub comparison: Comparison,
    pub value: Value,
    pub direction: Direction,
    pub nulls_first: bool,
}

impl SeekTerm {
    /// Whether null rows come before non-null rows in the direction this
    /// term seeks.
    ///
    /// A strict term past a null key matches every non-null row when this is
    /// `true`, and no row at all otherwise.
    pub fn nulls_precede(&self) -> bool {
        let forward = matches!(
            (self.comparison, self.direction),
            (Comparison::Greater, Direction::Asc) | (Comparison::Less, Direction::Desc)
        );
        forward == self.nulls_first
    }
}

impl std::fmt::Display for SeekTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} {} {}",
            self.alias,
            self.field,
            self.comparison.symbol(),
            self.value
        )
    }
}

/// A cursor key with the alias and ordering it is sought under.
pub(crate) struct SeekKey<'a> {
    pub alias: &'a str,
    pub key: &'a CursorField,
    pub direction: Direction,
    pub nulls_first: bool,
}

// Lexicographic seek: branch i holds equality on keys[..i] and a strict
// comparison on keys[i].
pub(crate) fn expand(keys: &[SeekKey<'_>], operator: CursorOperator) -> Vec<Vec<SeekTerm>> {
    (0..keys.len())
        .map(|branch| {
            keys[..=branch]
                .iter()
                .enumerate()
                .map(|(i, seek)| SeekTerm {
                    alias: seek.alias.to_string(),
                    field: seek.key.field.clone(),
                    comparison: if i == branch {
                        operator.comparison()
                    } else {
                        Comparison::Equal
                    },
                    value: seek.key.value.clone(),
                    direction: seek.direction,
                    nulls_first: seek.nulls_first,
                })
                .collect()
        })
        .collect()
}

//! Query-wide consolidation of ordering rules and cursors.
//!
//! Orders and cursors can be declared on any node of a criteria tree. A
//! translator that emits one flat query needs them merged back into a single
//! list, in declaration order. [`OrderPlan`] and [`SeekPlan`] do that merge so
//! every back-end applies the same rules:
//!
//! - Cursor-implied orders come first, cursor by cursor in sequence order.
//! - Explicit orders follow, sorted by sequence id, minus any `(alias, field)`
//!   a cursor already covers.
//! - All cursors fold into one seek condition over at most two keys.

use std::collections::HashSet;

use tracing::debug;

use crate::criteria::Criteria;
use crate::cursor::{self, Cursor, CursorOperator, SeekKey, SeekTerm};
use crate::error::{CursorError, Result};
use crate::ordering::{Direction, Order};

/// One entry of the consolidated ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub alias: String,
    pub field: String,
    pub direction: Direction,
    pub nulls_first: bool,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nulls = if self.nulls_first { "FIRST" } else { "LAST" };
        write!(
            f,
            "{}.{} {} NULLS {}",
            self.alias, self.field, self.direction, nulls
        )
    }
}

/// The final ordering of a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderPlan {
    keys: Vec<SortKey>,
}

impl OrderPlan {
    /// Walks `root` and every attached join, and merges their ordering.
    pub fn collect(root: &Criteria) -> Self {
        let nodes = nodes(root);
        let orders = explicit_orders(&nodes);

        let mut keys = Vec::new();
        let mut covered: HashSet<(&str, &str)> = HashSet::new();
        for (alias, cursor) in cursors(&nodes) {
            for (field, direction) in cursor.leading_orders() {
                if !covered.insert((alias, field)) {
                    continue;
                }
                keys.push(SortKey {
                    alias: alias.to_string(),
                    field: field.to_string(),
                    direction,
                    nulls_first: nulls_first(&orders, alias, field),
                });
            }
        }

        for (alias, order) in &orders {
            if covered.contains(&(*alias, order.field())) {
                continue;
            }
            keys.push(SortKey {
                alias: alias.to_string(),
                field: order.field().to_string(),
                direction: order.direction(),
                nulls_first: order.nulls_first(),
            });
        }

        debug!(keys = keys.len(), "consolidated ordering");
        OrderPlan { keys }
    }

    /// Sort keys, most significant first.
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Returns `true` when nothing in the tree orders the query.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The merged seek condition of every cursor in a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekPlan {
    operator: CursorOperator,
    terms: Vec<Vec<SeekTerm>>,
}

impl SeekPlan {
    /// Merges every cursor under `root`. Returns `None` when no node has one.
    ///
    /// Fails when cursors disagree on the operator, or when they contribute
    /// more than two keys in total.
    pub fn collect(root: &Criteria) -> Result<Option<Self>> {
        let nodes = nodes(root);
        let cursors = cursors(&nodes);

        let Some((_, first)) = cursors.first() else {
            return Ok(None);
        };
        let operator = first.operator();
        if cursors.iter().any(|(_, cursor)| cursor.operator() != operator) {
            return Err(CursorError::ConflictingOperators.into());
        }

        let orders = explicit_orders(&nodes);
        let keys: Vec<SeekKey<'_>> = cursors
            .iter()
            .flat_map(|&(alias, cursor)| {
                let orders = &orders;
                cursor.fields().iter().map(move |key| SeekKey {
                    alias,
                    key,
                    direction: cursor.direction(),
                    nulls_first: nulls_first(orders, alias, key.field()),
                })
            })
            .collect();
        if keys.len() > 2 {
            return Err(CursorError::TooManyKeys(keys.len()).into());
        }

        let terms = cursor::expand(&keys, operator);
        debug!(cursors = cursors.len(), keys = keys.len(), "merged seek condition");
        Ok(Some(SeekPlan { operator, terms }))
    }

    /// The operator shared by every merged cursor.
    pub fn operator(&self) -> CursorOperator {
        self.operator
    }

    /// Disjunctive normal form: OR of AND-ed terms.
    pub fn terms(&self) -> &[Vec<SeekTerm>] {
        &self.terms
    }
}

// Root first, then joins depth-first in attachment order.
fn nodes(root: &Criteria) -> Vec<&Criteria> {
    fn walk<'a>(node: &'a Criteria, out: &mut Vec<&'a Criteria>) {
        out.push(node);
        for join in node.joins() {
            walk(join.criteria(), out);
        }
    }

    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

fn explicit_orders<'a>(nodes: &[&'a Criteria]) -> Vec<(&'a str, &'a Order)> {
    let mut orders: Vec<(&str, &Order)> = nodes
        .iter()
        .copied()
        .flat_map(|node| node.orders().iter().map(move |order| (node.alias(), order)))
        .collect();
    orders.sort_by_key(|(_, order)| order.sequence_id());
    orders
}

// An explicit order on a cursor key still decides its null placement.
fn nulls_first(orders: &[(&str, &Order)], alias: &str, field: &str) -> bool {
    orders
        .iter()
        .find(|(a, order)| *a == alias && order.field() == field)
        .is_some_and(|(_, order)| order.nulls_first())
}

fn cursors<'a>(nodes: &[&'a Criteria]) -> Vec<(&'a str, &'a Cursor)> {
    let mut cursors: Vec<(&str, &Cursor)> = nodes
        .iter()
        .copied()
        .filter_map(|node| node.cursor().map(|cursor| (node.alias(), cursor)))
        .collect();
    cursors.sort_by_key(|(_, cursor)| cursor.sequence_id());
    cursors
}

//! Boolean trees of filters.
//!
//! A [`FilterGroup`] joins [`FilterItem`]s (filters or nested groups) with one
//! [`LogicalOperator`]. Groups are immutable and always normalized: every
//! constructor and combinator runs the same normalization pass.
//!
//! # Normalization
//!
//! Applied bottom-up:
//!
//! 1. Child groups are normalized first; filters are left untouched.
//! 2. Empty child groups are dropped.
//! 3. A child group with the parent's operator is spliced into the parent.
//! 4. A group left with exactly one child group is replaced by that child.
//! 5. A group left with exactly one filter is kept as a one-item group.
//!
//! ```text
//! AND(AND(f1, f2), AND(f3, AND(f4)))  →  AND(f1, f2, f3, f4)
//! AND(OR(a, b))                       →  OR(a, b)
//! OR(AND(a))                          →  AND(a)
//! ```
//!
//! Normalizing an already-normalized tree yields the same tree.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::filter::Filter;
use crate::op::LogicalOperator;
use crate::plain::{self, PlainGroup};
use crate::translator::Translator;

/// One entry of a [`FilterGroup`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterItem {
    /// A single condition.
    Filter(Filter),
    /// A nested group.
    Group(FilterGroup),
}

impl FilterItem {
    /// Dispatches to the translator's filter or group visit.
    pub fn accept<T: Translator>(
        &self,
        translator: &mut T,
        alias: &str,
        context: &mut T::Context,
    ) -> std::result::Result<T::Condition, T::Error> {
        match self {
            FilterItem::Filter(filter) => translator.visit_filter(filter, alias, context),
            FilterItem::Group(group) => group.accept(translator, alias, context),
        }
    }

    fn as_group(&self) -> Option<&FilterGroup> {
        match self {
            FilterItem::Group(group) => Some(group),
            FilterItem::Filter(_) => None,
        }
    }
}

impl From<Filter> for FilterItem {
    fn from(filter: Filter) -> Self {
        FilterItem::Filter(filter)
    }
}

impl From<FilterGroup> for FilterItem {
    fn from(group: FilterGroup) -> Self {
        FilterItem::Group(group)
    }
}

impl std::fmt::Display for FilterItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterItem::Filter(filter) => write!(f, "{filter}"),
            FilterItem::Group(group) => write!(f, "{group}"),
        }
    }
}

/// A normalized boolean combination of filters.
///
/// # Example
///
/// ```
/// use criteria::{Filter, FilterGroup, FilterOperator, LogicalOperator};
///
/// let a = Filter::new("a", FilterOperator::Equals, 1).unwrap();
/// let b = Filter::new("b", FilterOperator::Equals, 2).unwrap();
/// let c = Filter::new("c", FilterOperator::Equals, 3).unwrap();
///
/// let group = FilterGroup::and(vec![a.clone().into()])
///     .add_or(b)
///     .add_and(c);
///
/// // OR(AND(a), AND(b, c))
/// assert_eq!(group.logical_operator(), LogicalOperator::Or);
/// assert_eq!(group.items().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlainGroup", into = "PlainGroup")]
pub struct FilterGroup {
    logical_operator: LogicalOperator,
    items: Vec<FilterItem>,
}

impl FilterGroup {
    /// Creates a normalized group.
    pub fn new(logical_operator: LogicalOperator, items: Vec<FilterItem>) -> Self {
        normalize(logical_operator, items)
    }

    /// Creates a normalized AND group.
    pub fn and(items: Vec<FilterItem>) -> Self {
        FilterGroup::new(LogicalOperator::And, items)
    }

    /// Creates a normalized OR group.
    pub fn or(items: Vec<FilterItem>) -> Self {
        FilterGroup::new(LogicalOperator::Or, items)
    }

    /// Creates an empty AND group.
    pub fn empty() -> Self {
        FilterGroup {
            logical_operator: LogicalOperator::And,
            items: Vec::new(),
        }
    }

    /// The operator joining this group's items.
    pub fn logical_operator(&self) -> LogicalOperator {
        self.logical_operator
    }

    /// The group's items, in declaration order.
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    /// Returns `true` if the group has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the total number of filters in the tree.
    pub fn filter_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                FilterItem::Filter(_) => 1,
                FilterItem::Group(group) => group.filter_count(),
            })
            .sum()
    }

    /// Returns a new group with `filter` AND-ed onto this one.
    ///
    /// - An empty group becomes `AND(filter)`.
    /// - An AND group gains `filter` as its last item.
    /// - An OR group folds `filter` into its last AND branch. A bare filter
    ///   `x` in last position becomes the branch `AND(x, filter)`.
    pub fn add_and(&self, filter: Filter) -> FilterGroup {
        if self.is_empty() {
            return FilterGroup::and(vec![filter.into()]);
        }

        let mut items = self.items.clone();
        match self.logical_operator {
            LogicalOperator::And => items.push(filter.into()),
            LogicalOperator::Or => {
                let branch = match items.pop() {
                    Some(FilterItem::Group(last)) if last.logical_operator == LogicalOperator::And => {
                        let mut branch = last.items;
                        branch.push(filter.into());
                        branch
                    }
                    Some(last) => vec![last, filter.into()],
                    None => vec![filter.into()],
                };
                items.push(FilterItem::Group(raw(LogicalOperator::And, branch)));
            }
        }
        normalize(self.logical_operator, items)
    }

    /// Returns a new group with `filter` OR-ed onto this one.
    ///
    /// The result is always an OR of AND branches: the current state becomes
    /// one branch (or keeps its branches, if already an OR) and `filter`
    /// starts a fresh AND branch.
    pub fn add_or(&self, filter: Filter) -> FilterGroup {
        let mut branches: Vec<FilterItem> = match self.logical_operator {
            _ if self.is_empty() => Vec::new(),
            LogicalOperator::And => vec![FilterItem::Group(self.clone())],
            LogicalOperator::Or => self
                .items
                .iter()
                .map(|item| match item {
                    FilterItem::Filter(filter) => FilterItem::Group(raw(
                        LogicalOperator::And,
                        vec![FilterItem::Filter(filter.clone())],
                    )),
                    FilterItem::Group(group) => FilterItem::Group(group.clone()),
                })
                .collect(),
        };
        branches.push(FilterItem::Group(raw(
            LogicalOperator::And,
            vec![filter.into()],
        )));
        normalize(LogicalOperator::Or, branches)
    }

    /// Dispatches to the translator's AND or OR group visit.
    pub fn accept<T: Translator>(
        &self,
        translator: &mut T,
        alias: &str,
        context: &mut T::Context,
    ) -> std::result::Result<T::Condition, T::Error> {
        match self.logical_operator {
            LogicalOperator::And => translator.visit_and_group(self, alias, context),
            LogicalOperator::Or => translator.visit_or_group(self, alias, context),
        }
    }

    /// Returns the plain (JSON) form of this group.
    pub fn to_plain(&self) -> serde_json::Value {
        plain::group_to_json(self)
    }

    /// Rebuilds a group from its plain form, re-running validation and
    /// normalization.
    pub fn from_plain(value: serde_json::Value) -> Result<Self> {
        let plain: PlainGroup = serde_json::from_value(value)?;
        plain.into_group()
    }
}

impl Default for FilterGroup {
    fn default() -> Self {
        FilterGroup::empty()
    }
}

impl std::fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.logical_operator)?;
            }
            write!(f, "{item}")?;
        }
        write!(f, ")")
    }
}

// Builds a group without normalizing; callers normalize the enclosing tree.
fn raw(logical_operator: LogicalOperator, items: Vec<FilterItem>) -> FilterGroup {
    FilterGroup {
        logical_operator,
        items,
    }
}

fn normalize(logical_operator: LogicalOperator, items: Vec<FilterItem>) -> FilterGroup {
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        match item {
            FilterItem::Filter(filter) => out.push(FilterItem::Filter(filter)),
            FilterItem::Group(child) => {
                let child = normalize(child.logical_operator, child.items);
                if child.items.is_empty() {
                    continue;
                }
                if child.logical_operator == logical_operator {
                    out.extend(child.items);
                } else {
                    out.push(FilterItem::Group(child));
                }
            }
        }
    }

    if out.len() == 1 && out[0].as_group().is_some() {
        if let Some(FilterItem::Group(only)) = out.pop() {
            trace!(from = %logical_operator, to = %only.logical_operator, "collapsed single-child group");
            return only;
        }
    }

    raw(logical_operator, out)
}

//! The [`Translator`] implementation.

use criteria::{
    Comparison, Criteria, Filter, FilterGroup, JoinLink, JoinParameters, LogicalOperator,
    OrderPlan, SeekPlan, SelectionPolicy, Translator, Value,
};
use tracing::{debug, trace};

use crate::error::{Result, SqlError};
use crate::filter;
use crate::query::SqlQuery;

/// Translates criteria trees into parameterised PostgreSQL.
///
/// The root visit drives the whole traversal: selection, joins (depth-first),
/// the root filter tree, the merged seek condition, the consolidated ordering,
/// then pagination. Filters of a join node go into that join's `ON` clause.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlTranslator;

impl SqlTranslator {
    /// Creates a translator; it keeps no state between queries.
    pub fn new() -> Self {
        SqlTranslator
    }

    /// Translates `root` into a fresh [`SqlQuery`].
    pub fn to_query(&mut self, root: &Criteria) -> Result<SqlQuery> {
        let mut query = SqlQuery::new();
        self.translate(root, &mut query)?;
        Ok(query)
    }

    fn select(&self, criteria: &Criteria, with_select: bool, query: &mut SqlQuery) {
        let alias = criteria.alias();
        match criteria.selection_policy(with_select) {
            SelectionPolicy::None => {}
            SelectionPolicy::Identifier(field) => query.push_select(format!("{alias}.{field}")),
            SelectionPolicy::All => {
                for field in criteria.schema().fields() {
                    query.push_select(format!("{alias}.{field}"));
                }
            }
            SelectionPolicy::Fields(fields) => {
                for field in fields {
                    query.push_select(format!("{alias}.{field}"));
                }
            }
        }
    }

    fn conditions(&mut self, criteria: &Criteria, query: &mut SqlQuery) -> Result<Option<String>> {
        criteria
            .filters()
            .map(|group| group.accept(self, criteria.alias(), query))
            .transpose()
    }

    fn join(
        &mut self,
        keyword: &str,
        criteria: &Criteria,
        parameters: &JoinParameters,
        query: &mut SqlQuery,
    ) -> Result<()> {
        trace!(
            relation = %parameters.relation_alias,
            target = %parameters.child_source_name,
            keyword,
            "translating join"
        );
        self.select(criteria, parameters.with_select, query);

        let parent = &parameters.parent_alias;
        let child = &parameters.child_alias;
        let source = &parameters.child_source_name;
        let mut on = match &parameters.link {
            JoinLink::Direct {
                local_field,
                relation_field,
            } => format!("{parent}.{local_field} = {child}.{relation_field}"),
            JoinLink::Pivot {
                pivot_source_name,
                local,
                relation,
            } => {
                let pivot = format!("{child}_pivot");
                query.push_join(format!(
                    "{keyword} JOIN {pivot_source_name} AS {pivot} ON {parent}.{} = {pivot}.{}",
                    local.reference, local.pivot_field
                ));
                format!(
                    "{pivot}.{} = {child}.{}",
                    relation.pivot_field, relation.reference
                )
            }
        };

        // Bind this join's filters before descending; placeholders follow text order.
        if let Some(condition) = self.conditions(criteria, query)? {
            on.push_str(" AND ");
            on.push_str(&condition);
        }
        query.push_join(format!("{keyword} JOIN {source} AS {child} ON {on}"));

        for attachment in criteria.joins() {
            attachment.accept(self, query)?;
        }
        Ok(())
    }

    fn group(
        &mut self,
        group: &FilterGroup,
        alias: &str,
        query: &mut SqlQuery,
    ) -> Result<String> {
        if group.is_empty() {
            return Ok(match group.logical_operator() {
                LogicalOperator::And => "TRUE".to_string(),
                LogicalOperator::Or => "FALSE".to_string(),
            });
        }
        let parts = group
            .items()
            .iter()
            .map(|item| item.accept(self, alias, query))
            .collect::<Result<Vec<_>>>()?;
        let separator = format!(" {} ", group.logical_operator());
        Ok(format!("({})", parts.join(&separator)))
    }
}

impl Translator for SqlTranslator {
    type Context = SqlQuery;
    type Condition = String;
    type Error = SqlError;

    fn visit_root(&mut self, criteria: &Criteria, query: &mut SqlQuery) -> Result<()> {
        debug!(source = %criteria.source_name(), joins = criteria.joins().len(), "translating criteria");

        // Plan errors surface before anything is written to the query.
        let seek = SeekPlan::collect(criteria)?;
        let orders = OrderPlan::collect(criteria);

        self.select(criteria, true, query);
        query.set_from(criteria.source_name(), criteria.alias());

        for attachment in criteria.joins() {
            attachment.accept(self, query)?;
        }

        if let Some(condition) = self.conditions(criteria, query)? {
            query.push_where(condition);
        }

        if let Some(seek) = seek {
            let branches: Vec<String> = seek
                .terms()
                .iter()
                .map(|branch| {
                    let terms: Vec<String> = branch
                        .iter()
                        .map(|term| {
                            let column = format!("{}.{}", term.alias, term.field);
                            match (term.comparison, &term.value) {
                                (Comparison::Equal, Value::Null) => format!("{column} IS NULL"),
                                // Past a null key: the non-null rows if nulls sort
                                // before them, nothing otherwise.
                                (_, Value::Null) if term.nulls_precede() => {
                                    format!("{column} IS NOT NULL")
                                }
                                (_, Value::Null) => "FALSE".to_string(),
                                (comparison, value) => format!(
                                    "{column} {} {}",
                                    comparison.symbol(),
                                    query.bind(value.clone())
                                ),
                            }
                        })
                        .collect();
                    format!("({})", terms.join(" AND "))
                })
                .collect();
            query.push_where(format!("({})", branches.join(" OR ")));
        }

        for key in orders.keys() {
            let nulls = if key.nulls_first { "FIRST" } else { "LAST" };
            query.push_order(format!(
                "{}.{} {} NULLS {nulls}",
                key.alias, key.field, key.direction
            ));
        }

        query.set_limit(criteria.take());
        query.set_offset(criteria.skip());
        Ok(())
    }

    fn visit_inner_join(
        &mut self,
        criteria: &Criteria,
        parameters: &JoinParameters,
        query: &mut SqlQuery,
    ) -> Result<()> {
        self.join("INNER", criteria, parameters, query)
    }

    fn visit_left_join(
        &mut self,
        criteria: &Criteria,
        parameters: &JoinParameters,
        query: &mut SqlQuery,
    ) -> Result<()> {
        self.join("LEFT", criteria, parameters, query)
    }

    fn visit_outer_join(
        &mut self,
        criteria: &Criteria,
        parameters: &JoinParameters,
        query: &mut SqlQuery,
    ) -> Result<()> {
        self.join("FULL OUTER", criteria, parameters, query)
    }

    fn visit_filter(&mut self, filter: &Filter, alias: &str, query: &mut SqlQuery) -> Result<String> {
        filter::render(filter, alias, query)
    }

    fn visit_and_group(
        &mut self,
        group: &FilterGroup,
        alias: &str,
        query: &mut SqlQuery,
    ) -> Result<String> {
        self.group(group, alias, query)
    }

    fn visit_or_group(
        &mut self,
        group: &FilterGroup,
        alias: &str,
        query: &mut SqlQuery,
    ) -> Result<String> {
        self.group(group, alias, query)
    }
}

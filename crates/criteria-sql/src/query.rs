//! The SQL statement under construction.

use criteria::{value_to_json, Value};

/// A parameterised `SELECT` built up by [`SqlTranslator`](crate::SqlTranslator).
///
/// Clauses are collected in visit order. Placeholders are numbered as values
/// are bound, which matches their textual order in [`to_sql`](Self::to_sql).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlQuery {
    select: Vec<String>,
    from: String,
    joins: Vec<String>,
    wheres: Vec<String>,
    order_by: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    params: Vec<Value>,
}

impl SqlQuery {
    /// An empty statement.
    pub fn new() -> Self {
        SqlQuery::default()
    }

    /// Binds a parameter and returns its placeholder (`$1`, `$2`, ...).
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.params.push(value.into());
        format!("${}", self.params.len())
    }

    pub(crate) fn set_from(&mut self, source_name: &str, alias: &str) {
        self.from = format!("{source_name} AS {alias}");
    }

    pub(crate) fn push_select(&mut self, column: String) {
        self.select.push(column);
    }

    pub(crate) fn push_join(&mut self, join: String) {
        self.joins.push(join);
    }

    pub(crate) fn push_where(&mut self, condition: String) {
        self.wheres.push(condition);
    }

    pub(crate) fn push_order(&mut self, order: String) {
        self.order_by.push(order);
    }

    pub(crate) fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    pub(crate) fn set_offset(&mut self, offset: Option<usize>) {
        self.offset = offset;
    }

    /// Selected columns, alias-qualified.
    pub fn select(&self) -> &[String] {
        &self.select
    }

    /// The `FROM` target, `source AS alias`.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Rendered `JOIN` clauses, in visit order.
    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    /// `WHERE` conditions; joined with `AND` when rendered.
    pub fn wheres(&self) -> &[String] {
        &self.wheres
    }

    /// `ORDER BY` entries, most significant first.
    pub fn order_by(&self) -> &[String] {
        &self.order_by
    }

    /// The `LIMIT`, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The `OFFSET`, if any.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Bound values, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Bound values as JSON, for drivers that take JSON parameters.
    pub fn params_json(&self) -> Vec<serde_json::Value> {
        self.params.iter().map(value_to_json).collect()
    }

    /// Renders the statement on one line.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.select.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.from);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }
}

impl std::fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_follow_bind_order() {
        let mut query = SqlQuery::new();
        assert_eq!(query.bind(1), "$1");
        assert_eq!(query.bind("x"), "$2");
        assert_eq!(query.params(), &[Value::from(1), Value::from("x")]);
        assert_eq!(query.params_json(), vec![serde_json::json!(1), serde_json::json!("x")]);
    }

    #[test]
    fn renders_clauses_in_statement_order() {
        let mut query = SqlQuery::new();
        query.set_from("posts", "p");
        query.push_select("p.id".into());
        query.push_join("INNER JOIN users AS u ON p.user_id = u.id".into());
        let placeholder = query.bind(5);
        query.push_where(format!("(p.id > {placeholder})"));
        query.push_order("p.id ASC NULLS LAST".into());
        query.set_limit(Some(10));
        query.set_offset(Some(20));

        assert_eq!(
            query.to_sql(),
            "SELECT p.id FROM posts AS p INNER JOIN users AS u ON p.user_id = u.id \
             WHERE (p.id > $1) ORDER BY p.id ASC NULLS LAST LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn empty_select_renders_star() {
        let mut query = SqlQuery::new();
        query.set_from("posts", "p");
        assert_eq!(query.to_sql(), "SELECT * FROM posts AS p");
    }
}

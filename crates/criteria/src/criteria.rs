//! Criteria nodes: the composite query specification.
//!
//! A [`Criteria`] is bound to one [`Schema`] and collects filters, ordering
//! rules, selection, pagination bounds, an optional cursor, and relationship
//! attachments (child nodes joined under a schema-declared relation).
//!
//! Nodes are created by a [`CriteriaFactory`], which owns the
//! [`SequenceCounter`] shared by every node it creates:
//!
//! ```
//! use criteria::{CriteriaFactory, Direction, FilterOperator, Schema, SchemaDefinition};
//!
//! let users = Schema::new(SchemaDefinition {
//!     source_name: "users".into(),
//!     alias: "u".into(),
//!     fields: vec!["id".into(), "email".into(), "created_at".into()],
//!     identifier_field: "id".into(),
//!     relations: vec![],
//!     metadata: Default::default(),
//! })
//! .unwrap();
//!
//! let factory = CriteriaFactory::new();
//! let criteria = factory
//!     .root(users)
//!     .where_("email", FilterOperator::EndsWith, "@example.com")
//!     .unwrap()
//!     .order_by("created_at", Direction::Desc, false)
//!     .unwrap()
//!     .set_take(20);
//!
//! assert_eq!(criteria.orders()[0].sequence_id(), 1);
//! assert_eq!(criteria.take(), Some(20));
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{CriteriaError, Error, Result};
use crate::filter::Filter;
use crate::group::FilterGroup;
use crate::op::FilterOperator;
use crate::ordering::{Direction, Order, SequenceCounter};
use crate::relation::JoinParameters;
use crate::schema::Schema;
use crate::translator::Translator;
use crate::value::Value;

/// The kind of a criteria node; selects the translator visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriteriaKind {
    Root,
    InnerJoin,
    LeftJoin,
    OuterJoin,
}

impl CriteriaKind {
    /// Returns `true` for the three join kinds.
    pub fn is_join(self) -> bool {
        !matches!(self, CriteriaKind::Root)
    }

    /// The lowercase name used in messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            CriteriaKind::Root => "root",
            CriteriaKind::InnerJoin => "inner join",
            CriteriaKind::LeftJoin => "left join",
            CriteriaKind::OuterJoin => "outer join",
        }
    }
}

impl std::fmt::Display for CriteriaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which fields a node selects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every declared field.
    #[default]
    All,
    /// An explicit subset; always contains the identifier field.
    Fields(Vec<String>),
}

/// What a translator should select for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy<'a> {
    /// Every declared field.
    All,
    /// Only the identifier field.
    Identifier(&'a str),
    /// An explicit subset, identifier included.
    Fields(&'a [String]),
    /// Nothing; the join only constrains the parent.
    None,
}

// `where_` moves the builder from `Empty` to `Initialized`; the combinators
// are only legal afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
enum FilterState {
    #[default]
    Empty,
    Initialized(FilterGroup),
}

/// Creates criteria nodes that share one sequence counter.
#[derive(Debug, Clone, Default)]
pub struct CriteriaFactory {
    sequence: Arc<SequenceCounter>,
}

impl CriteriaFactory {
    /// Creates a factory with a fresh counter (first id is 1).
    pub fn new() -> Self {
        CriteriaFactory::default()
    }

    /// The counter shared by every node this factory creates.
    pub fn sequence(&self) -> &Arc<SequenceCounter> {
        &self.sequence
    }

    /// Creates a root node bound to `schema`.
    pub fn root(&self, schema: impl Into<Arc<Schema>>) -> Criteria {
        self.create(CriteriaKind::Root, schema.into())
    }

    /// Creates an inner-join node, to be attached with [`Criteria::join`].
    pub fn inner_join(&self, schema: impl Into<Arc<Schema>>) -> Criteria {
        self.create(CriteriaKind::InnerJoin, schema.into())
    }

    /// Creates a left-join node, to be attached with [`Criteria::join`].
    pub fn left_join(&self, schema: impl Into<Arc<Schema>>) -> Criteria {
        self.create(CriteriaKind::LeftJoin, schema.into())
    }

    /// Creates a full outer-join node, to be attached with [`Criteria::join`].
    pub fn outer_join(&self, schema: impl Into<Arc<Schema>>) -> Criteria {
        self.create(CriteriaKind::OuterJoin, schema.into())
    }

    fn create(&self, kind: CriteriaKind, schema: Arc<Schema>) -> Criteria {
        Criteria {
            kind,
            alias: schema.alias().to_string(),
            schema,
            filters: FilterState::Empty,
            orders: Vec::new(),
            selection: Selection::All,
            take: None,
            skip: None,
            cursor: None,
            joins: Vec::new(),
            sequence: Arc::clone(&self.sequence),
        }
    }
}

/// A child node joined under a resolved relation.
#[derive(Debug, Clone)]
pub struct JoinAttachment {
    parameters: JoinParameters,
    criteria: Criteria,
}

impl JoinAttachment {
    /// The resolved relation this child is joined under.
    pub fn parameters(&self) -> &JoinParameters {
        &self.parameters
    }

    /// The joined child node.
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Dispatches to the translator visit matching the child's join kind.
    pub fn accept<T: Translator>(
        &self,
        translator: &mut T,
        context: &mut T::Context,
    ) -> std::result::Result<(), T::Error> {
        dispatch(&self.criteria, Some(&self.parameters), translator, context)
    }
}

/// A query specification bound to one schema.
#[derive(Debug, Clone)]
pub struct Criteria {
    kind: CriteriaKind,
    schema: Arc<Schema>,
    alias: String,
    filters: FilterState,
    orders: Vec<Order>,
    selection: Selection,
    take: Option<usize>,
    skip: Option<usize>,
    cursor: Option<Cursor>,
    joins: Vec<JoinAttachment>,
    sequence: Arc<SequenceCounter>,
}

impl Criteria {
    // ========================================================================
    // Filters
    // ========================================================================

    /// Starts (or restarts) the filter tree as `AND(filter)`.
    pub fn where_(
        mut self,
        field: &str,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let filter = self.filter(field, operator, Some(value.into()))?;
        self.filters = FilterState::Initialized(FilterGroup::and(vec![filter.into()]));
        Ok(self)
    }

    /// Starts (or restarts) the filter tree with a value-less condition.
    pub fn where_absent(mut self, field: &str, operator: FilterOperator) -> Result<Self> {
        let filter = self.filter(field, operator, None)?;
        self.filters = FilterState::Initialized(FilterGroup::and(vec![filter.into()]));
        Ok(self)
    }

    /// Replaces the filter tree with a prebuilt group.
    ///
    /// Every field in the group must be declared on the schema. An empty group
    /// leaves the node without filters.
    pub fn where_group(mut self, group: FilterGroup) -> Result<Self> {
        self.check_group_fields(&group)?;
        self.filters = if group.is_empty() {
            FilterState::Empty
        } else {
            FilterState::Initialized(group)
        };
        Ok(self)
    }

    /// AND-s a condition onto the filter tree.
    pub fn and_where(
        self,
        field: &str,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.combine(field, operator, Some(value.into()), FilterGroup::add_and)
    }

    /// OR-s a condition onto the filter tree.
    pub fn or_where(
        self,
        field: &str,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.combine(field, operator, Some(value.into()), FilterGroup::add_or)
    }

    /// AND-s a value-less condition onto the filter tree.
    pub fn and_where_absent(self, field: &str, operator: FilterOperator) -> Result<Self> {
        self.combine(field, operator, None, FilterGroup::add_and)
    }

    /// OR-s a value-less condition onto the filter tree.
    pub fn or_where_absent(self, field: &str, operator: FilterOperator) -> Result<Self> {
        self.combine(field, operator, None, FilterGroup::add_or)
    }

    fn combine(
        mut self,
        field: &str,
        operator: FilterOperator,
        value: Option<Value>,
        add: fn(&FilterGroup, Filter) -> FilterGroup,
    ) -> Result<Self> {
        let FilterState::Initialized(group) = &self.filters else {
            return Err(CriteriaError::FilterNotInitialized.into());
        };
        let filter = self.filter(field, operator, value)?;
        self.filters = FilterState::Initialized(add(group, filter));
        Ok(self)
    }

    fn filter(&self, field: &str, operator: FilterOperator, value: Option<Value>) -> Result<Filter> {
        self.check_field(field)?;
        Filter::from_parts(field, operator, value)
    }

    fn check_group_fields(&self, group: &FilterGroup) -> Result<()> {
        for item in group.items() {
            match item {
                crate::group::FilterItem::Filter(filter) => self.check_field(filter.field())?,
                crate::group::FilterItem::Group(nested) => self.check_group_fields(nested)?,
            }
        }
        Ok(())
    }

    // ========================================================================
    // Joins
    // ========================================================================

    /// Attaches `child` under the relation declared as `relation_alias`.
    ///
    /// The alias must be declared on this node's schema, `child` must be a
    /// join node from the same factory, and its schema must be the relation's
    /// target. No node of `child`'s subtree may reuse an alias already taken
    /// in this tree; self-relations and repeated targets need
    /// [`with_alias`](Self::with_alias). Joining an alias twice replaces the
    /// earlier attachment in place.
    pub fn join(mut self, relation_alias: &str, child: Criteria, with_select: bool) -> Result<Self> {
        if !child.kind.is_join() {
            return Err(CriteriaError::NotAJoin { kind: child.kind }.into());
        }

        let relation = self.schema.relation(relation_alias).ok_or_else(|| {
            CriteriaError::UnknownRelation {
                alias: relation_alias.to_string(),
                source_name: self.schema.source_name().to_string(),
            }
        })?;

        if relation.target_source_name() != child.schema.source_name() {
            return Err(CriteriaError::JoinTargetMismatch {
                alias: relation_alias.to_string(),
                expected: relation.target_source_name().to_string(),
                actual: child.schema.source_name().to_string(),
            }
            .into());
        }

        if !Arc::ptr_eq(&self.sequence, &child.sequence) {
            return Err(CriteriaError::ForeignFactory {
                alias: relation_alias.to_string(),
            }
            .into());
        }

        // Every node of one tree needs its own alias to qualify its fields.
        let collision = {
            let mut taken = vec![self.alias.as_str()];
            for existing in &self.joins {
                if existing.parameters.relation_alias != relation_alias {
                    existing.criteria.collect_aliases(&mut taken);
                }
            }
            let mut incoming = Vec::new();
            child.collect_aliases(&mut incoming);
            incoming
                .into_iter()
                .find(|alias| taken.contains(alias))
                .map(str::to_string)
        };
        if let Some(alias) = collision {
            return Err(CriteriaError::DuplicateAlias {
                alias,
                relation: relation_alias.to_string(),
            }
            .into());
        }

        let parameters = JoinParameters::resolve(
            &self.schema,
            &self.alias,
            relation,
            &child.schema,
            &child.alias,
            with_select,
        );
        debug!(
            parent = %self.schema.source_name(),
            relation = %relation_alias,
            kind = %child.kind,
            pivot = parameters.is_pivot(),
            "resolved join"
        );

        let attachment = JoinAttachment {
            parameters,
            criteria: child,
        };
        match self
            .joins
            .iter_mut()
            .find(|existing| existing.parameters.relation_alias == relation_alias)
        {
            Some(existing) => *existing = attachment,
            None => self.joins.push(attachment),
        }
        Ok(self)
    }

    /// Qualifies this node's fields with `alias` instead of the schema alias.
    ///
    /// Already attached joins are re-pointed at the new alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Result<Self> {
        let alias = alias.into();
        if alias.is_empty() {
            return Err(CriteriaError::EmptyAlias.into());
        }
        for attachment in &self.joins {
            let mut nested = Vec::new();
            attachment.criteria.collect_aliases(&mut nested);
            if nested.contains(&alias.as_str()) {
                return Err(CriteriaError::DuplicateAlias {
                    alias,
                    relation: attachment.parameters.relation_alias.clone(),
                }
                .into());
            }
        }
        for attachment in &mut self.joins {
            attachment.parameters.parent_alias = alias.clone();
        }
        self.alias = alias;
        Ok(self)
    }

    fn collect_aliases<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.alias);
        for attachment in &self.joins {
            attachment.criteria.collect_aliases(out);
        }
    }

    // ========================================================================
    // Ordering, cursor, pagination
    // ========================================================================

    /// Adds an ordering rule stamped with the next sequence id.
    pub fn order_by(mut self, field: &str, direction: Direction, nulls_first: bool) -> Result<Self> {
        self.check_field(field)?;
        let order = Order::new(field, direction, nulls_first, self.sequence.next_id());
        self.orders.push(order);
        Ok(self)
    }

    /// Sets the seek cursor; its fields must be declared on the schema.
    pub fn set_cursor(mut self, cursor: Cursor) -> Result<Self> {
        for key in cursor.fields() {
            self.check_field(key.field())?;
        }
        self.cursor = Some(cursor.stamped(self.sequence.next_id()));
        Ok(self)
    }

    /// Sets the maximum number of rows.
    pub fn set_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    /// Sets the number of rows to skip.
    pub fn set_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Selects an explicit subset of fields. The identifier is always kept;
    /// an empty list selects the identifier only.
    pub fn set_select<I, S>(mut self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identifier = self.schema.identifier_field().to_string();
        let mut selected = vec![identifier];
        for field in fields {
            let field = field.into();
            self.check_field(&field)?;
            if !selected.contains(&field) {
                selected.push(field);
            }
        }
        self.selection = Selection::Fields(selected);
        Ok(self)
    }

    /// Returns to selecting every declared field.
    pub fn reset_select(mut self) -> Self {
        self.selection = Selection::All;
        self
    }

    // ========================================================================
    // Reset
    // ========================================================================

    /// Discards everything but the schema binding and alias. Root nodes only.
    pub fn reset(mut self) -> Result<Self> {
        if self.kind.is_join() {
            return Err(CriteriaError::ResetOnJoin.into());
        }
        self.filters = FilterState::Empty;
        self.orders.clear();
        self.selection = Selection::All;
        self.take = None;
        self.skip = None;
        self.cursor = None;
        self.joins.clear();
        Ok(self)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// The node kind; decides which translator visit runs.
    pub fn kind(&self) -> CriteriaKind {
        self.kind
    }

    /// The schema this node is bound to.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The alias qualifying this node's fields: the schema alias unless set
    /// with [`with_alias`](Self::with_alias).
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The schema's source name.
    pub fn source_name(&self) -> &str {
        self.schema.source_name()
    }

    /// The filter tree, once initialized.
    pub fn filters(&self) -> Option<&FilterGroup> {
        match &self.filters {
            FilterState::Empty => None,
            FilterState::Initialized(group) => Some(group),
        }
    }

    /// Ordering rules declared on this node, in declaration order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// The raw selection; see [`selection_policy`](Self::selection_policy).
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The selection a translator should apply for this node.
    ///
    /// `with_select` is the join's flag; pass `true` for the root.
    pub fn selection_policy(&self, with_select: bool) -> SelectionPolicy<'_> {
        match &self.selection {
            _ if !with_select => SelectionPolicy::None,
            Selection::All => SelectionPolicy::All,
            Selection::Fields(fields) if fields.len() == 1 => {
                SelectionPolicy::Identifier(self.schema.identifier_field())
            }
            Selection::Fields(fields) => SelectionPolicy::Fields(fields),
        }
    }

    /// Maximum number of rows, if set.
    pub fn take(&self) -> Option<usize> {
        self.take
    }

    /// Number of rows to skip, if set.
    pub fn skip(&self) -> Option<usize> {
        self.skip
    }

    /// The seek cursor, if set.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Relationship attachments, in attachment order.
    pub fn joins(&self) -> &[JoinAttachment] {
        &self.joins
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Dispatches to the translator visit for this node.
    ///
    /// Join nodes carry no parameters of their own and must be visited through
    /// their [`JoinAttachment`].
    pub fn accept<T: Translator>(
        &self,
        translator: &mut T,
        context: &mut T::Context,
    ) -> std::result::Result<(), T::Error> {
        dispatch(self, None, translator, context)
    }

    fn check_field(&self, field: &str) -> Result<()> {
        if self.schema.has_field(field) {
            Ok(())
        } else {
            Err(CriteriaError::UnknownField {
                field: field.to_string(),
                source_name: self.schema.source_name().to_string(),
            }
            .into())
        }
    }
}

fn dispatch<T: Translator>(
    criteria: &Criteria,
    parameters: Option<&JoinParameters>,
    translator: &mut T,
    context: &mut T::Context,
) -> std::result::Result<(), T::Error> {
    match (criteria.kind, parameters) {
        (CriteriaKind::Root, _) => translator.visit_root(criteria, context),
        (CriteriaKind::InnerJoin, Some(parameters)) => {
            translator.visit_inner_join(criteria, parameters, context)
        }
        (CriteriaKind::LeftJoin, Some(parameters)) => {
            translator.visit_left_join(criteria, parameters, context)
        }
        (CriteriaKind::OuterJoin, Some(parameters)) => {
            translator.visit_outer_join(criteria, parameters, context)
        }
        (kind, None) => Err(Error::from(CriteriaError::DetachedJoin {
            kind,
            source_name: criteria.source_name().to_string(),
        })
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{CursorKey, CursorOperator};
    use crate::op::LogicalOperator;
    use crate::relation::{JoinLink, RelationType};
    use crate::schema::{RelationDefinition, SchemaDefinition};
    use crate::relation::PivotField;
    use std::collections::BTreeMap;

    fn posts() -> Schema {
        Schema::new(SchemaDefinition {
            source_name: "posts".into(),
            alias: "p".into(),
            fields: vec!["id".into(), "title".into(), "user_id".into(), "created_at".into()],
            identifier_field: "id".into(),
            relations: vec![
                RelationDefinition {
                    relation_alias: "author".into(),
                    relation_type: RelationType::ManyToOne,
                    target_source_name: "users".into(),
                    local_field: "user_id".into(),
                    relation_field: "id".into(),
                    pivot_source_name: None,
                    metadata: BTreeMap::new(),
                },
                RelationDefinition {
                    relation_alias: "tags".into(),
                    relation_type: RelationType::ManyToMany,
                    target_source_name: "tags".into(),
                    local_field: PivotField::new("post_id", "id").into(),
                    relation_field: PivotField::new("tag_id", "id").into(),
                    pivot_source_name: Some("post_tags".into()),
                    metadata: BTreeMap::new(),
                },
            ],
            metadata: BTreeMap::new(),
        })
        .unwrap()
    }

    fn simple(source: &str, alias: &str) -> Schema {
        Schema::new(SchemaDefinition {
            source_name: source.into(),
            alias: alias.into(),
            fields: vec!["id".into(), "name".into()],
            identifier_field: "id".into(),
            relations: vec![],
            metadata: BTreeMap::new(),
        })
        .unwrap()
    }

    #[test]
    fn combinators_need_initial_where() {
        let factory = CriteriaFactory::new();
        let err = factory
            .root(posts())
            .and_where("title", FilterOperator::Equals, "x")
            .unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::FilterNotInitialized)));

        let err = factory
            .root(posts())
            .or_where("title", FilterOperator::Equals, "x")
            .unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::FilterNotInitialized)));
    }

    #[test]
    fn where_and_or_build_normalized_tree() {
        let criteria = CriteriaFactory::new()
            .root(posts())
            .where_("title", FilterOperator::Equals, "a")
            .unwrap()
            .or_where("title", FilterOperator::Equals, "b")
            .unwrap()
            .and_where("user_id", FilterOperator::Equals, 1)
            .unwrap();

        let group = criteria.filters().unwrap();
        assert_eq!(group.logical_operator(), LogicalOperator::Or);
        assert_eq!(group.items().len(), 2);
        assert_eq!(group.filter_count(), 3);
    }

    #[test]
    fn where_restarts_the_tree() {
        let criteria = CriteriaFactory::new()
            .root(posts())
            .where_("title", FilterOperator::Equals, "a")
            .unwrap()
            .and_where("user_id", FilterOperator::Equals, 1)
            .unwrap()
            .where_("id", FilterOperator::GreaterThan, 5)
            .unwrap();
        assert_eq!(criteria.filters().unwrap().filter_count(), 1);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let factory = CriteriaFactory::new();
        let err = factory
            .root(posts())
            .where_("body", FilterOperator::Equals, "x")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Criteria(CriteriaError::UnknownField { ref field, .. }) if field == "body"
        ));
        assert!(factory.root(posts()).order_by("body", Direction::Asc, false).is_err());
        assert!(factory.root(posts()).set_select(["body"]).is_err());

        let group = FilterGroup::and(vec![Filter::new("body", FilterOperator::Equals, 1).unwrap().into()]);
        assert!(factory.root(posts()).where_group(group).is_err());
    }

    #[test]
    fn filter_shape_errors_surface_at_the_call() {
        let err = CriteriaFactory::new()
            .root(posts())
            .where_("id", FilterOperator::Between, 1)
            .unwrap_err();
        assert!(matches!(err, Error::Filter(_)));
    }

    #[test]
    fn orders_are_stamped_from_the_factory_counter() {
        let factory = CriteriaFactory::new();
        let root = factory
            .root(posts())
            .order_by("created_at", Direction::Desc, false)
            .unwrap();
        let author = factory
            .inner_join(simple("users", "u"))
            .order_by("name", Direction::Asc, true)
            .unwrap();
        let root = root.order_by("id", Direction::Asc, false).unwrap();

        assert_eq!(root.orders()[0].sequence_id(), 1);
        assert_eq!(author.orders()[0].sequence_id(), 2);
        assert_eq!(root.orders()[1].sequence_id(), 3);
    }

    #[test]
    fn join_resolves_direct_relation() {
        let factory = CriteriaFactory::new();
        let root = factory
            .root(posts())
            .join("author", factory.left_join(simple("users", "u")), true)
            .unwrap();

        let join = &root.joins()[0];
        let params = join.parameters();
        assert_eq!(params.parent_alias, "p");
        assert_eq!(params.parent_identifier, "id");
        assert_eq!(params.child_alias, "u");
        assert_eq!(params.relation_type, RelationType::ManyToOne);
        assert_eq!(
            params.link,
            JoinLink::Direct {
                local_field: "user_id".into(),
                relation_field: "id".into()
            }
        );
        assert_eq!(join.criteria().kind(), CriteriaKind::LeftJoin);
    }

    #[test]
    fn join_resolves_pivot_relation() {
        let factory = CriteriaFactory::new();
        let root = factory
            .root(posts())
            .join("tags", factory.inner_join(simple("tags", "t")), false)
            .unwrap();
        let params = root.joins()[0].parameters();
        assert!(params.is_pivot());
        assert!(!params.with_select);
        assert!(matches!(
            &params.link,
            JoinLink::Pivot { pivot_source_name, .. } if pivot_source_name == "post_tags"
        ));
    }

    #[test]
    fn join_under_undeclared_alias_names_it() {
        let factory = CriteriaFactory::new();
        let err = factory
            .root(posts())
            .join("comments", factory.inner_join(simple("comments", "c")), true)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Criteria(CriteriaError::UnknownRelation { ref alias, ref source_name })
                if alias == "comments" && source_name == "posts"
        ));
        assert!(err.to_string().contains("comments"));
    }

    #[test]
    fn join_rejects_wrong_target_kind_and_factory() {
        let factory = CriteriaFactory::new();
        let err = factory
            .root(posts())
            .join("author", factory.inner_join(simple("accounts", "a")), true)
            .unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::JoinTargetMismatch { .. })));

        let err = factory
            .root(posts())
            .join("author", factory.root(simple("users", "u")), true)
            .unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::NotAJoin { .. })));

        let other = CriteriaFactory::new();
        let err = factory
            .root(posts())
            .join("author", other.inner_join(simple("users", "u")), true)
            .unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::ForeignFactory { .. })));
    }

    #[test]
    fn rejoining_an_alias_replaces_in_place() {
        let factory = CriteriaFactory::new();
        let root = factory
            .root(posts())
            .join("author", factory.inner_join(simple("users", "u")), true)
            .unwrap()
            .join("tags", factory.inner_join(simple("tags", "t")), true)
            .unwrap()
            .join("author", factory.left_join(simple("users", "u")), false)
            .unwrap();
        assert_eq!(root.joins().len(), 2);
        assert_eq!(root.joins()[0].criteria().kind(), CriteriaKind::LeftJoin);
        assert_eq!(root.joins()[1].parameters().relation_alias, "tags");
    }

    fn people() -> Schema {
        Schema::new(SchemaDefinition {
            source_name: "people".into(),
            alias: "pe".into(),
            fields: vec!["id".into(), "manager_id".into(), "name".into()],
            identifier_field: "id".into(),
            relations: vec![RelationDefinition {
                relation_alias: "manager".into(),
                relation_type: RelationType::ManyToOne,
                target_source_name: "people".into(),
                local_field: "manager_id".into(),
                relation_field: "id".into(),
                pivot_source_name: None,
                metadata: BTreeMap::new(),
            }],
            metadata: BTreeMap::new(),
        })
        .unwrap()
    }

    #[test]
    fn self_join_needs_a_distinct_alias() {
        let factory = CriteriaFactory::new();
        let err = factory
            .root(people())
            .join("manager", factory.inner_join(people()), false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Criteria(CriteriaError::DuplicateAlias { ref alias, ref relation })
                if alias == "pe" && relation == "manager"
        ));

        let manager = factory
            .inner_join(people())
            .with_alias("mgr")
            .unwrap()
            .order_by("name", Direction::Desc, false)
            .unwrap();
        let root = factory
            .root(people())
            .order_by("name", Direction::Asc, false)
            .unwrap()
            .join("manager", manager, false)
            .unwrap();

        let params = root.joins()[0].parameters();
        assert_eq!(params.parent_alias, "pe");
        assert_eq!(params.child_alias, "mgr");
        assert_eq!(root.joins()[0].criteria().alias(), "mgr");
        assert_eq!(root.alias(), "pe");
    }

    #[test]
    fn two_relations_to_one_target_need_distinct_aliases() {
        let mut definition = SchemaDefinition {
            source_name: "posts".into(),
            alias: "p".into(),
            fields: vec!["id".into(), "user_id".into(), "editor_id".into()],
            identifier_field: "id".into(),
            relations: Vec::new(),
            metadata: BTreeMap::new(),
        };
        for (alias, local) in [("author", "user_id"), ("editor", "editor_id")] {
            definition.relations.push(RelationDefinition {
                relation_alias: alias.into(),
                relation_type: RelationType::ManyToOne,
                target_source_name: "users".into(),
                local_field: local.into(),
                relation_field: "id".into(),
                pivot_source_name: None,
                metadata: BTreeMap::new(),
            });
        }
        let posts = Arc::new(Schema::new(definition).unwrap());
        let factory = CriteriaFactory::new();

        let root = factory
            .root(Arc::clone(&posts))
            .join("author", factory.inner_join(simple("users", "u")), true)
            .unwrap();
        let err = root
            .clone()
            .join("editor", factory.inner_join(simple("users", "u")), true)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Criteria(CriteriaError::DuplicateAlias { ref relation, .. }) if relation == "editor"
        ));

        let root = root
            .join(
                "editor",
                factory.left_join(simple("users", "u")).with_alias("ed").unwrap(),
                true,
            )
            .unwrap();
        let aliases: Vec<_> = root
            .joins()
            .iter()
            .map(|join| join.parameters().child_alias.as_str())
            .collect();
        assert_eq!(aliases, vec!["u", "ed"]);
    }

    #[test]
    fn nested_aliases_count_as_taken() {
        let factory = CriteriaFactory::new();
        let nested = factory
            .inner_join(people())
            .with_alias("mgr")
            .unwrap()
            .join(
                "manager",
                factory.inner_join(people()).with_alias("pe").unwrap(),
                false,
            )
            .unwrap();
        let err = factory
            .root(people())
            .join("manager", nested, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Criteria(CriteriaError::DuplicateAlias { ref alias, .. }) if alias == "pe"
        ));
    }

    #[test]
    fn realiasing_repoints_attached_joins() {
        let factory = CriteriaFactory::new();
        let node = factory
            .inner_join(people())
            .join(
                "manager",
                factory.inner_join(people()).with_alias("skip").unwrap(),
                false,
            )
            .unwrap()
            .with_alias("mgr")
            .unwrap();
        assert_eq!(node.joins()[0].parameters().parent_alias, "mgr");

        let err = node.with_alias("skip").unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::DuplicateAlias { .. })));
        let err = factory.root(people()).with_alias("").unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::EmptyAlias)));
    }

    #[test]
    fn selection_policies() {
        let factory = CriteriaFactory::new();
        let all = factory.root(posts());
        assert_eq!(all.selection_policy(true), SelectionPolicy::All);
        assert_eq!(all.selection_policy(false), SelectionPolicy::None);

        let subset = factory.root(posts()).set_select(["title", "title"]).unwrap();
        assert_eq!(
            subset.selection(),
            &Selection::Fields(vec!["id".into(), "title".into()])
        );

        let identifier = factory.root(posts()).set_select(Vec::<String>::new()).unwrap();
        assert_eq!(identifier.selection_policy(true), SelectionPolicy::Identifier("id"));

        let back = identifier.reset_select();
        assert_eq!(back.selection(), &Selection::All);
    }

    #[test]
    fn cursor_fields_must_exist_and_get_stamped() {
        let factory = CriteriaFactory::new();
        let cursor = Cursor::new(
            vec![CursorKey::new("created_at", 1), CursorKey::new("id", 2)],
            CursorOperator::GreaterThan,
            Direction::Asc,
        )
        .unwrap();
        let root = factory.root(posts()).set_cursor(cursor).unwrap();
        assert_eq!(root.cursor().unwrap().sequence_id(), 1);

        let bad = Cursor::new(
            vec![CursorKey::new("published_at", 1)],
            CursorOperator::GreaterThan,
            Direction::Asc,
        )
        .unwrap();
        assert!(factory.root(posts()).set_cursor(bad).is_err());
    }

    #[test]
    fn reset_keeps_only_the_schema() {
        let factory = CriteriaFactory::new();
        let root = factory
            .root(posts())
            .where_("title", FilterOperator::Contains, "rust")
            .unwrap()
            .order_by("id", Direction::Asc, false)
            .unwrap()
            .join("author", factory.inner_join(simple("users", "u")), true)
            .unwrap()
            .set_select(["title"])
            .unwrap()
            .set_take(10)
            .set_skip(5)
            .reset()
            .unwrap();

        assert!(root.filters().is_none());
        assert!(root.orders().is_empty());
        assert!(root.joins().is_empty());
        assert_eq!(root.selection(), &Selection::All);
        assert_eq!(root.take(), None);
        assert_eq!(root.skip(), None);
        assert_eq!(root.source_name(), "posts");

        let err = factory.inner_join(simple("users", "u")).reset().unwrap_err();
        assert!(matches!(err, Error::Criteria(CriteriaError::ResetOnJoin)));
    }
}

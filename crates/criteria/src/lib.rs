//! Criteria - data-source-agnostic query specifications.
//!
//! Criteria lets callers describe *what* to fetch (filters, relationships,
//! ordering, pagination, selection) against declared entity schemas, without
//! committing to a query language. A back-end implements [`Translator`] to turn
//! the specification into its own query form.
//!
//! - Filters validate their value against the operator at construction
//! - Filter groups are normalized on every construction and mutation
//! - Schemas declare fields and relations; joins resolve against them
//! - Orders and cursors carry a global sequence id for deterministic merging
//!
//! # Quick Start
//!
//! ```rust
//! use criteria::{CriteriaFactory, Direction, FilterOperator, LogicalOperator, Schema};
//!
//! let posts = Schema::from_json(r#"{
//!     "source_name": "posts",
//!     "alias": "p",
//!     "fields": ["id", "title", "user_id", "created_at"],
//!     "identifier_field": "id",
//!     "relations": [{
//!         "relation_alias": "author",
//!         "relation_type": "many_to_one",
//!         "target_source_name": "users",
//!         "local_field": "user_id",
//!         "relation_field": "id"
//!     }]
//! }"#).unwrap();
//! let users = Schema::from_json(r#"{
//!     "source_name": "users",
//!     "alias": "u",
//!     "fields": ["id", "email"],
//!     "identifier_field": "id"
//! }"#).unwrap();
//!
//! let factory = CriteriaFactory::new();
//! let author = factory
//!     .inner_join(users)
//!     .where_("email", FilterOperator::EndsWith, "@example.com")
//!     .unwrap();
//!
//! let criteria = factory
//!     .root(posts)
//!     .where_("title", FilterOperator::Contains, "rust")
//!     .unwrap()
//!     .or_where("title", FilterOperator::Contains, "cargo")
//!     .unwrap()
//!     .join("author", author, true)
//!     .unwrap()
//!     .order_by("created_at", Direction::Desc, false)
//!     .unwrap()
//!     .set_take(20);
//!
//! let filters = criteria.filters().unwrap();
//! assert_eq!(filters.logical_operator(), LogicalOperator::Or);
//! assert_eq!(criteria.joins().len(), 1);
//! ```
//!
//! # Filter Normalization
//!
//! Every [`FilterGroup`] is kept in a canonical shape:
//!
//! ```text
//! add_and(c) on AND(a, b)          => AND(a, b, c)
//! add_or(b)  on AND(a)             => OR(AND(a), AND(b))
//! add_and(c) on OR(AND(a), AND(b)) => OR(AND(a), AND(b, c))
//! ```
//!
//! Empty groups vanish and nested groups with the parent's operator are
//! flattened. A group whose only item is another group collapses into it,
//! while a group whose only item is a filter stays a one-item group:
//!
//! ```text
//! AND(OR(a, b)) => OR(a, b)
//! OR(AND(a))    => AND(a)
//! OR(a)         => OR(a)
//! ```
//!
//! # Seek Pagination
//!
//! A [`Cursor`] with keys `(created_at, id)` and `GREATER_THAN` denotes
//!
//! ```text
//! (created_at > v1) OR (created_at = v1 AND id > v2)
//! ```
//!
//! [`SeekPlan`] and [`OrderPlan`] merge the cursors and orders of a whole tree
//! for translators that emit one flat query.
//! Each node qualifies its fields with its own alias, so a self-join or two
//! joins to one source need [`Criteria::with_alias`] on the joined node.

mod criteria;
mod cursor;
mod error;
mod filter;
mod group;
mod op;
mod ordering;
mod plain;
mod plan;
mod relation;
mod schema;
mod translator;
mod value;

// Re-export public API
pub use criteria::{Criteria, CriteriaFactory, CriteriaKind, JoinAttachment, Selection, SelectionPolicy};
pub use cursor::{Comparison, Cursor, CursorField, CursorKey, CursorOperator, SeekTerm};
pub use error::{CriteriaError, CursorError, Error, FilterError, Result, SchemaError};
pub use filter::Filter;
pub use group::{FilterGroup, FilterItem};
pub use op::{FilterOperator, LogicalOperator, ValueShape};
pub use ordering::{Direction, Order, SequenceCounter};
pub use plain::value_to_json;
pub use plan::{OrderPlan, SeekPlan, SortKey};
pub use relation::{DirectRelation, JoinLink, JoinParameters, PivotField, PivotRelation, Relation, RelationType};
pub use schema::{FieldReference, RelationDefinition, Schema, SchemaDefinition};
pub use translator::Translator;
pub use value::{Number, Timestamp, Value};

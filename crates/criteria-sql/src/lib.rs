//! Reference PostgreSQL translator for `criteria`.
//!
//! [`SqlTranslator`] walks a criteria tree through the [`criteria::Translator`]
//! protocol and builds a [`SqlQuery`]: one parameterised `SELECT` with `$n`
//! placeholders and the bound values alongside. It does not talk to a
//! database.
//!
//! ```rust
//! use criteria::{CriteriaFactory, Direction, FilterOperator, Schema};
//! use criteria_sql::SqlTranslator;
//!
//! let users = Schema::from_json(r#"{
//!     "source_name": "users",
//!     "alias": "u",
//!     "fields": ["id", "email"],
//!     "identifier_field": "id"
//! }"#).unwrap();
//!
//! let criteria = CriteriaFactory::new()
//!     .root(users)
//!     .where_("email", FilterOperator::EndsWith, "@example.com")
//!     .unwrap()
//!     .order_by("id", Direction::Asc, false)
//!     .unwrap()
//!     .set_take(10);
//!
//! let query = SqlTranslator::new().to_query(&criteria).unwrap();
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT u.id, u.email FROM users AS u WHERE (u.email LIKE $1) \
//!      ORDER BY u.id ASC NULLS LAST LIMIT 10"
//! );
//! ```

mod error;
mod filter;
mod query;
mod translator;

pub use error::{Result, SqlError};
pub use query::SqlQuery;
pub use translator::SqlTranslator;

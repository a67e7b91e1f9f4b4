//! Relationship descriptors and resolved join parameters.
//!
//! A [`Relation`] is declared on a [`Schema`](crate::Schema) and comes in two
//! shapes: [`DirectRelation`] links a local field to a field of the target
//! source; [`PivotRelation`] goes through an intermediate (pivot) source and
//! is the only shape allowed for `many_to_many`.
//!
//! When a child node is joined under a relation alias, the relation is
//! resolved into [`JoinParameters`]: everything a translator needs to build
//! the join condition without looking at either schema again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationType {
    /// The snake_case name used in schema definitions.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::OneToOne => "one_to_one",
            RelationType::OneToMany => "one_to_many",
            RelationType::ManyToOne => "many_to_one",
            RelationType::ManyToMany => "many_to_many",
        }
    }

    /// Returns `true` if this relation type requires the pivot shape.
    pub fn uses_pivot(self) -> bool {
        matches!(self, RelationType::ManyToMany)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One side of a pivot relation: a pivot column and the field it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PivotField {
    pub pivot_field: String,
    pub reference: String,
}

impl PivotField {
    /// Pairs a pivot column with the field it references.
    pub fn new(pivot_field: impl Into<String>, reference: impl Into<String>) -> Self {
        PivotField {
            pivot_field: pivot_field.into(),
            reference: reference.into(),
        }
    }
}

/// A relation joined directly on one field of each side.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectRelation {
    pub relation_alias: String,
    pub relation_type: RelationType,
    pub target_source_name: String,
    pub local_field: String,
    pub relation_field: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A many-to-many relation mediated by a pivot source.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRelation {
    pub relation_alias: String,
    pub target_source_name: String,
    pub pivot_source_name: String,
    pub local_field: PivotField,
    pub relation_field: PivotField,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A validated relation descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    Direct(DirectRelation),
    Pivot(PivotRelation),
}

impl Relation {
    /// The name the relation is joined under.
    pub fn alias(&self) -> &str {
        match self {
            Relation::Direct(direct) => &direct.relation_alias,
            Relation::Pivot(pivot) => &pivot.relation_alias,
        }
    }

    /// Cardinality; always `ManyToMany` for pivot relations.
    pub fn relation_type(&self) -> RelationType {
        match self {
            Relation::Direct(direct) => direct.relation_type,
            Relation::Pivot(_) => RelationType::ManyToMany,
        }
    }

    /// Source name of the joined entity.
    pub fn target_source_name(&self) -> &str {
        match self {
            Relation::Direct(direct) => &direct.target_source_name,
            Relation::Pivot(pivot) => &pivot.target_source_name,
        }
    }

    /// The owner-side field the relation hangs off.
    pub fn local_reference(&self) -> &str {
        match self {
            Relation::Direct(direct) => &direct.local_field,
            Relation::Pivot(pivot) => &pivot.local_field.reference,
        }
    }

    /// Opaque metadata declared with the relation.
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        match self {
            Relation::Direct(direct) => &direct.metadata,
            Relation::Pivot(pivot) => &pivot.metadata,
        }
    }
}

/// How the parent and child sources are linked.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinLink {
    /// `parent.local_field = child.relation_field`
    Direct {
        local_field: String,
        relation_field: String,
    },
    /// `parent.local.reference = pivot.local.pivot_field` then
    /// `pivot.relation.pivot_field = child.relation.reference`
    Pivot {
        pivot_source_name: String,
        local: PivotField,
        relation: PivotField,
    },
}

/// Fully resolved parameters of a relationship attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinParameters {
    pub relation_alias: String,
    pub relation_type: RelationType,
    pub parent_source_name: String,
    pub parent_alias: String,
    pub parent_identifier: String,
    pub child_source_name: String,
    pub child_alias: String,
    pub child_identifier: String,
    pub link: JoinLink,
    pub with_select: bool,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl JoinParameters {
    /// Resolves `relation` between two nodes qualified by the given aliases.
    pub(crate) fn resolve(
        parent: &Schema,
        parent_alias: &str,
        relation: &Relation,
        child: &Schema,
        child_alias: &str,
        with_select: bool,
    ) -> Self {
        let link = match relation {
            Relation::Direct(direct) => JoinLink::Direct {
                local_field: direct.local_field.clone(),
                relation_field: direct.relation_field.clone(),
            },
            Relation::Pivot(pivot) => JoinLink::Pivot {
                pivot_source_name: pivot.pivot_source_name.clone(),
                local: pivot.local_field.clone(),
                relation: pivot.relation_field.clone(),
            },
        };

        JoinParameters {
            relation_alias: relation.alias().to_string(),
            relation_type: relation.relation_type(),
            parent_source_name: parent.source_name().to_string(),
            parent_alias: parent_alias.to_string(),
            parent_identifier: parent.identifier_field().to_string(),
            child_source_name: child.source_name().to_string(),
            child_alias: child_alias.to_string(),
            child_identifier: child.identifier_field().to_string(),
            link,
            with_select,
            metadata: relation.metadata().clone(),
        }
    }

    /// Returns `true` for pivot (many-to-many) joins.
    pub fn is_pivot(&self) -> bool {
        matches!(self.link, JoinLink::Pivot { .. })
    }
}

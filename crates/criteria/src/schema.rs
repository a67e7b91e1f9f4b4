//! Entity schemas.
//!
//! A [`Schema`] describes one data source: its name and alias, the fields it
//! exposes, which of them identifies a row, and the relations it declares.
//! Schemas are validated once, at construction, and are immutable after.
//!
//! The raw form, [`SchemaDefinition`], is what a config loader hands over. It
//! deserializes from JSON or YAML:
//!
//! ```yaml
//! source_name: posts
//! alias: p
//! fields: [id, title, user_id]
//! identifier_field: id
//! relations:
//!   - relation_alias: author
//!     relation_type: many_to_one
//!     target_source_name: users
//!     local_field: user_id
//!     relation_field: id
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result, SchemaError};
use crate::relation::{DirectRelation, PivotField, PivotRelation, Relation, RelationType};

/// A field reference in a raw relation: a plain field name, or a pivot pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldReference {
    Field(String),
    Pivot(PivotField),
}

impl From<&str> for FieldReference {
    fn from(field: &str) -> Self {
        FieldReference::Field(field.to_string())
    }
}

impl From<PivotField> for FieldReference {
    fn from(pivot: PivotField) -> Self {
        FieldReference::Pivot(pivot)
    }
}

/// Raw, unvalidated relation declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub relation_alias: String,
    pub relation_type: RelationType,
    pub target_source_name: String,
    pub local_field: FieldReference,
    pub relation_field: FieldReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_source_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Raw, unvalidated schema declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub source_name: String,
    pub alias: String,
    pub fields: Vec<String>,
    pub identifier_field: String,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A validated, immutable entity schema.
///
/// # Example
///
/// ```
/// use criteria::{Schema, SchemaDefinition};
///
/// let schema = Schema::new(SchemaDefinition {
///     source_name: "users".into(),
///     alias: "u".into(),
///     fields: vec!["id".into(), "email".into()],
///     identifier_field: "id".into(),
///     relations: vec![],
///     metadata: Default::default(),
/// })
/// .unwrap();
/// assert!(schema.has_field("email"));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "SchemaDefinition")]
pub struct Schema {
    source_name: String,
    alias: String,
    fields: Vec<String>,
    identifier_field: String,
    relations: Vec<Relation>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl Schema {
    /// Validates a definition and builds the schema.
    pub fn new(definition: SchemaDefinition) -> Result<Self> {
        let SchemaDefinition {
            source_name,
            alias,
            fields,
            identifier_field,
            relations,
            metadata,
        } = definition;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(SchemaError::DuplicateField {
                    source_name,
                    field: field.clone(),
                }
                .into());
            }
        }

        if !seen.contains(identifier_field.as_str()) {
            return Err(SchemaError::IdentifierNotInFields {
                source_name,
                field: identifier_field,
            }
            .into());
        }

        let mut aliases = HashSet::new();
        let mut resolved = Vec::with_capacity(relations.len());
        for definition in relations {
            if !aliases.insert(definition.relation_alias.clone()) {
                return Err(SchemaError::DuplicateRelation {
                    source_name,
                    alias: definition.relation_alias,
                }
                .into());
            }
            let relation = resolve_relation(&source_name, definition)?;
            if !seen.contains(relation.local_reference()) {
                return Err(SchemaError::RelationFieldNotInFields {
                    source_name,
                    alias: relation.alias().to_string(),
                    field: relation.local_reference().to_string(),
                }
                .into());
            }
            resolved.push(relation);
        }

        debug!(
            source = %source_name,
            fields = fields.len(),
            relations = resolved.len(),
            "schema validated"
        );

        Ok(Schema {
            source_name,
            alias,
            fields,
            identifier_field,
            relations: resolved,
            metadata,
        })
    }

    /// Parses and validates a JSON schema definition.
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: SchemaDefinition = serde_json::from_str(json)?;
        Schema::new(definition)
    }

    /// The underlying source (table, collection, ...) name.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// The default alias qualifying this schema's fields.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The field that identifies one row.
    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }

    /// Declared relations, in declaration order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Opaque metadata declared with the schema.
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Returns `true` if `field` is declared on this schema.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Looks up a declared relation by alias.
    pub fn relation(&self, alias: &str) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.alias() == alias)
    }
}

impl TryFrom<SchemaDefinition> for Schema {
    type Error = Error;

    fn try_from(definition: SchemaDefinition) -> Result<Self> {
        Schema::new(definition)
    }
}

fn resolve_relation(source_name: &str, definition: RelationDefinition) -> Result<Relation> {
    let RelationDefinition {
        relation_alias,
        relation_type,
        target_source_name,
        local_field,
        relation_field,
        pivot_source_name,
        metadata,
    } = definition;

    let mismatch = |alias: String| SchemaError::RelationShapeMismatch {
        source_name: source_name.to_string(),
        alias,
        relation_type,
        expected: if relation_type.uses_pivot() {
            "pivot"
        } else {
            "direct"
        },
    };

    let relation = match (relation_type.uses_pivot(), local_field, relation_field, pivot_source_name) {
        (
            true,
            FieldReference::Pivot(local_field),
            FieldReference::Pivot(relation_field),
            Some(pivot_source_name),
        ) => Relation::Pivot(PivotRelation {
            relation_alias,
            target_source_name,
            pivot_source_name,
            local_field,
            relation_field,
            metadata,
        }),
        (false, FieldReference::Field(local_field), FieldReference::Field(relation_field), None) => {
            Relation::Direct(DirectRelation {
                relation_alias,
                relation_type,
                target_source_name,
                local_field,
                relation_field,
                metadata,
            })
        }
        _ => return Err(mismatch(relation_alias).into()),
    };

    Ok(relation)
}

//! Canonical schema vocabulary for imported datasets
//!
//! Embulk's guess pass names column types in its own vocabulary; the
//! destination store records them in the canonical one. Only `long` and
//! `timestamp` differ, every other name passes through.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Canonical field types
///
/// Unknown external names are carried verbatim in `Other` rather than
/// rejected, so a newer tool vocabulary does not break imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Integer,
    Double,
    String,
    Datetime,
    Json,
    #[serde(untagged)]
    Other(String),
}

impl FieldType {
    /// Map an Embulk type name to the canonical vocabulary
    pub fn from_embulk(name: &str) -> Self {
        match name {
            "boolean" => FieldType::Boolean,
            "long" | "integer" => FieldType::Integer,
            "double" => FieldType::Double,
            "string" => FieldType::String,
            "timestamp" | "datetime" => FieldType::Datetime,
            "json" => FieldType::Json,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Canonical name of this type
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Datetime => "datetime",
            FieldType::Json => "json",
            FieldType::Other(name) => name,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named field in an inferred schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered schema inferred for one imported dataset
///
/// Field order matters (it mirrors the source column order); names must be
/// unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDef>,
}

impl Schema {
    /// Build a schema from ordered fields, rejecting duplicate names
    pub fn new(fields: Vec<FieldDef>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate field name in inferred schema: {}",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in source column order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

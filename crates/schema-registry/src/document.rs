//! Schema coordinates and parsed schema documents.

use crate::error::{Error, Result};
use apache_avro::Schema;

/// Identifies one schema document in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaCoordinate {
    /// Registry group id
    pub group: String,
    /// Artifact id within the group
    pub artifact_id: String,
}

impl SchemaCoordinate {
    pub fn new(group: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// The value-schema coordinate of a topic: `<topic>-value`.
    ///
    /// This is the artifact id Apicurio's Avro converter registers.
    pub fn topic_value(group: impl Into<String>, topic: &str) -> Self {
        Self::new(group, format!("{topic}-value"))
    }
}

impl std::fmt::Display for SchemaCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group, self.artifact_id)
    }
}

/// A parsed Avro schema together with the body it was parsed from.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    coordinate: SchemaCoordinate,
    raw: String,
    schema: Schema,
}

impl SchemaDocument {
    /// Parse a registry response body as an Avro schema.
    pub fn parse(coordinate: SchemaCoordinate, raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let schema = Schema::parse_str(&raw).map_err(|e| Error::SchemaParse(e.to_string()))?;
        Ok(Self {
            coordinate,
            raw,
            schema,
        })
    }

    pub fn coordinate(&self) -> &SchemaCoordinate {
        &self.coordinate
    }

    /// The schema body exactly as the registry returned it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

//! Dublin Core descriptive-metadata document
//!
//! The repository's normalized metadata representation, written as
//! `dublin_core.xml` inside each deposit unit.

use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// One `<dcvalue>` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcValue {
    #[serde(rename = "@element")]
    pub element: String,
    #[serde(rename = "@qualifier")]
    pub qualifier: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl DcValue {
    pub fn new(
        element: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            element: element.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }
}

/// A `<dublin_core>` document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "dublin_core")]
pub struct DublinCore {
    /// Optional metadata schema name (auxiliary streams set this,
    /// e.g. `schema="ou"` for the OU-specific document)
    #[serde(rename = "@schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(rename = "dcvalue", default)]
    pub values: Vec<DcValue>,
}

impl DublinCore {
    /// Empty document for the default schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty document for a named auxiliary schema
    pub fn with_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            values: Vec::new(),
        }
    }

    /// Append a value
    pub fn push(&mut self, element: &str, qualifier: &str, value: impl Into<String>) {
        self.values.push(DcValue::new(element, qualifier, value));
    }

    /// Values for an element/qualifier pair, in document order
    pub fn values_for(&self, element: &str, qualifier: &str) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| v.element == element && v.qualifier == qualifier)
            .map(|v| v.value.as_str())
            .collect()
    }

    /// Serialize with XML declaration
    pub fn to_xml(&self) -> Result<String, IngestError> {
        let body = to_string(self)
            .map_err(|e| IngestError::Config(format!("Dublin Core serialization failed: {}", e)))?;
        Ok(format!(r#"<?xml version="1.0" encoding="UTF-8"?>{}"#, body))
    }
}

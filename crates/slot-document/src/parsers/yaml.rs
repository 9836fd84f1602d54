//! YAML part document parser
//!
//! Deserialises straight into `serde_json::Value` so both formats share one
//! part-document reader.

use crate::error::DocumentError;
use crate::model::PartDocument;
use crate::parsers::DocumentParser;
use serde_json::Value;

/// YAML document parser
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl DocumentParser for YamlParser {
    fn parse(&self, content: &str) -> Result<PartDocument, DocumentError> {
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| DocumentError::syntax("<yaml>", e.to_string()))?;
        PartDocument::from_value(&value)
    }

    fn extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

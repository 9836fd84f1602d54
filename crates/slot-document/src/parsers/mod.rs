//! Document parsers for different text formats
//!
//! Every parser produces the same [`PartDocument`] so the graph builder
//! never needs to know which format a source was written in:
//! - JSON via serde_json
//! - YAML via serde_yaml

use crate::error::DocumentError;
use crate::model::PartDocument;
use std::path::Path;

mod json;
mod yaml;

pub use json::JsonParser;
pub use yaml::YamlParser;

/// Parser trait for converting document text into a [`PartDocument`]
///
/// Implement this trait to add support for new document formats.
pub trait DocumentParser: Send + Sync + 'static {
    /// Parse content string into a part document
    ///
    /// # Errors
    /// Returns error if the text is not valid for the format or does not
    /// have the part-document shape.
    fn parse(&self, content: &str) -> Result<PartDocument, DocumentError>;

    /// Supported file extensions (without dot)
    fn extensions(&self) -> &[&str];

    /// Check if this parser can handle the given source identifier
    fn can_parse(&self, source_id: &str) -> bool {
        Path::new(source_id)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    /// Parser priority (higher = tried first when multiple parsers match)
    fn priority(&self) -> i32 {
        0
    }
}

/// Parser registration for dynamic parser management
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parser_count", &self.parsers.len())
            .field("extensions", &self.all_extensions())
            .finish()
    }
}

impl ParserRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Register a parser
    pub fn register<P: DocumentParser>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
        self.parsers
            .sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    /// Find parser for a source identifier
    #[must_use]
    pub fn find_for_source(&self, source_id: &str) -> Option<&dyn DocumentParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(source_id))
            .map(|p| &**p)
    }

    /// Parse content, choosing the parser from the source identifier
    ///
    /// # Errors
    /// Returns [`DocumentError::NoParser`] if no parser claims the source,
    /// otherwise whatever the chosen parser reports.
    pub fn parse(&self, source_id: &str, content: &str) -> Result<PartDocument, DocumentError> {
        let parser = self
            .find_for_source(source_id)
            .ok_or_else(|| DocumentError::NoParser(source_id.to_string()))?;
        tracing::debug!(source_id, "parsing part document");
        parser.parse(content).map_err(|err| match err {
            DocumentError::Syntax { message, .. } => DocumentError::syntax(source_id, message),
            other => other,
        })
    }

    /// Get all registered extensions
    #[must_use]
    pub fn all_extensions(&self) -> Vec<&str> {
        self.parsers
            .iter()
            .flat_map(|p| p.extensions())
            .copied()
            .collect()
    }
}

/// Create default parser registry with built-in parsers
#[inline]
#[must_use]
pub fn default_parsers() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(JsonParser);
    registry.register(YamlParser);
    registry
}

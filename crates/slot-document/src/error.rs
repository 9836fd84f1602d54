//! Error types for document parsing
//!
//! Parse failures are opaque to the kernel: they surface unchanged from
//! `SlotGraphBuilder::add_source`.

/// Errors raised while turning document text into a [`crate::PartDocument`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    /// Text could not be parsed by the format's grammar
    #[error("syntax error in {source_id}: {message}")]
    Syntax {
        /// Document identifier
        source_id: String,
        /// Parser message
        message: String,
    },

    /// Document root is not a mapping of part names
    #[error("document root must be a mapping of part names, got {found}")]
    NotAMapping {
        /// JSON kind found at the root
        found: &'static str,
    },

    /// A part entry is not an object
    #[error("part '{part}' is not an object")]
    PartNotObject {
        /// Offending part name
        part: String,
    },

    /// A known field has the wrong shape
    #[error("part '{part}': field '{field}' {problem}")]
    InvalidField {
        /// Part name
        part: String,
        /// Field name
        field: &'static str,
        /// What is wrong with it
        problem: &'static str,
    },

    /// No registered parser handles the source
    #[error("no parser registered for source: '{0}'")]
    NoParser(String),
}

impl DocumentError {
    /// Create syntax error for a source
    pub fn syntax(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Name of the JSON kind of a value, for error messages
    #[must_use]
    pub fn kind_of(value: &serde_json::Value) -> &'static str {
        match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "bool",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = DocumentError::syntax("engine.json", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "syntax error in engine.json: expected value at line 1"
        );
    }

    #[test]
    fn invalid_field_display() {
        let err = DocumentError::InvalidField {
            part: "engine_a".into(),
            field: "slots",
            problem: "must be an array",
        };
        assert_eq!(err.to_string(), "part 'engine_a': field 'slots' must be an array");
    }
}

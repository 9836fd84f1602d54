//! JSON part document parser
//!
//! Uses serde_json with `preserve_order` so part and option order survive.

use crate::error::DocumentError;
use crate::model::PartDocument;
use crate::parsers::DocumentParser;
use serde_json::Value;

/// JSON document parser
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl DocumentParser for JsonParser {
    fn parse(&self, content: &str) -> Result<PartDocument, DocumentError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| DocumentError::syntax("<json>", e.to_string()))?;
        PartDocument::from_value(&value)
    }

    fn extensions(&self) -> &[&str] {
        &["json", "jbeam"]
    }

    fn priority(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_part_with_slots() {
        let doc = JsonParser
            .parse(
                r#"{
                    "camso_engine": {
                        "slotType": "Camso_Engine",
                        "slots": [
                            ["type", "default", "description"],
                            ["Camso_Intake", "camso_intake_na", "Intake"]
                        ]
                    }
                }"#,
            )
            .unwrap();

        let part = doc.get("camso_engine").unwrap();
        assert_eq!(part.slot_type, "Camso_Engine");
        assert_eq!(part.slots.len(), 1);
        assert_eq!(part.slots[0].default, "camso_intake_na");
    }

    #[test]
    fn invalid_json_is_syntax_error() {
        let err = JsonParser.parse("{not json").unwrap_err();
        assert!(matches!(err, DocumentError::Syntax { .. }));
    }

    #[test]
    fn handles_jbeam_extension() {
        assert!(JsonParser.can_parse("camso_engine.jbeam"));
    }
}

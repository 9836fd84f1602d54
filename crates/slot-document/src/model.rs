//! Part document data model
//!
//! Mirrors the shape produced by the external document parser. Part order
//! and option key order are preserved because slot-array output order is
//! meaningful downstream.

use crate::error::DocumentError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque slot / part options (e.g. `{"coreSlot": true}`)
pub type Options = IndexMap<String, Value>;

/// Header row that may open a slot array
pub const SLOT_HEADER: [&str; 3] = ["type", "default", "description"];

/// One `[slot_type, default, description, options?]` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Slot type this row declares
    pub slot_type: String,
    /// Default part filling the slot (empty = intentionally empty)
    pub default: String,
    /// Human-readable description
    pub description: String,
    /// Optional per-slot options
    pub options: Option<Options>,
}

impl SlotEntry {
    /// Create a row without options
    pub fn new(
        slot_type: impl Into<String>,
        default: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            slot_type: slot_type.into(),
            default: default.into(),
            description: description.into(),
            options: None,
        }
    }

    /// Attach options to the row
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Whether the row leaves the slot empty
    #[inline]
    #[must_use]
    pub fn is_empty_slot(&self) -> bool {
        self.default.is_empty()
    }
}

/// Data for one part: the slot it fills and the slots it declares
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartData {
    /// Slot type this part fills
    pub slot_type: String,
    /// Declared child slots in document order
    pub slots: Vec<SlotEntry>,
    /// Opaque part options
    pub options: Options,
    /// Raw renderings of rows that could not be read as slot entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub malformed_rows: Vec<String>,
}

impl PartData {
    /// Create part data for a slot type
    pub fn new(slot_type: impl Into<String>) -> Self {
        Self {
            slot_type: slot_type.into(),
            ..Self::default()
        }
    }

    /// Append a slot row
    #[must_use]
    pub fn with_slot(mut self, entry: SlotEntry) -> Self {
        self.slots.push(entry);
        self
    }

    fn from_value(part: &str, value: &Value) -> Result<Self, DocumentError> {
        let Value::Object(map) = value else {
            return Err(DocumentError::PartNotObject {
                part: part.to_string(),
            });
        };

        let slot_type = match map.get("slotType").or_else(|| map.get("slot_type")) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(DocumentError::InvalidField {
                    part: part.to_string(),
                    field: "slotType",
                    problem: "must be a string",
                })
            }
        };

        let options = match map.get("options") {
            None | Some(Value::Null) => Options::new(),
            Some(Value::Object(opts)) => opts.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Some(_) => {
                return Err(DocumentError::InvalidField {
                    part: part.to_string(),
                    field: "options",
                    problem: "must be an object",
                })
            }
        };

        let mut data = Self {
            slot_type,
            options,
            ..Self::default()
        };

        match map.get("slots") {
            None | Some(Value::Null) => {}
            Some(Value::Array(rows)) => {
                for row in rows {
                    match parse_row(row) {
                        RowParse::Entry(entry) => data.slots.push(entry),
                        RowParse::Header => {}
                        RowParse::Malformed => data.malformed_rows.push(row.to_string()),
                    }
                }
            }
            Some(_) => {
                return Err(DocumentError::InvalidField {
                    part: part.to_string(),
                    field: "slots",
                    problem: "must be an array",
                })
            }
        }

        Ok(data)
    }
}

enum RowParse {
    Entry(SlotEntry),
    Header,
    Malformed,
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_row(row: &Value) -> RowParse {
    let Value::Array(cells) = row else {
        return RowParse::Malformed;
    };
    if cells.len() < 2 {
        return RowParse::Malformed;
    }
    let Some(Value::String(slot_type)) = cells.first() else {
        return RowParse::Malformed;
    };
    if slot_type == SLOT_HEADER[0] {
        return RowParse::Header;
    }
    let Some(default) = cell_text(&cells[1]) else {
        return RowParse::Malformed;
    };
    let description = cells.get(2).and_then(cell_text).unwrap_or_default();
    let options = match cells.get(3) {
        Some(Value::Object(opts)) => Some(opts.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        _ => None,
    };

    RowParse::Entry(SlotEntry {
        slot_type: slot_type.clone(),
        default,
        description,
        options,
    })
}

/// Ordered mapping of part name → part data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartDocument {
    parts: IndexMap<String, PartData>,
}

impl PartDocument {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from an already-parsed JSON value
    ///
    /// # Errors
    /// Returns error if the root is not an object or a part is malformed.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let Value::Object(map) = value else {
            return Err(DocumentError::NotAMapping {
                found: DocumentError::kind_of(value),
            });
        };

        let mut parts = IndexMap::with_capacity(map.len());
        for (name, part) in map {
            parts.insert(name.clone(), PartData::from_value(name, part)?);
        }
        Ok(Self { parts })
    }

    /// Add or replace a part
    pub fn insert(&mut self, name: impl Into<String>, data: PartData) {
        self.parts.insert(name.into(), data);
    }

    /// Builder-style insert
    #[must_use]
    pub fn with_part(mut self, name: impl Into<String>, data: PartData) -> Self {
        self.insert(name, data);
        self
    }

    /// Look up a part by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PartData> {
        self.parts.get(name)
    }

    /// Iterate parts in document order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PartData)> {
        self.parts.iter()
    }

    /// Number of parts
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the document has no parts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl IntoIterator for PartDocument {
    type Item = (String, PartData);
    type IntoIter = indexmap::map::IntoIter<String, PartData>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_parts_in_document_order() {
        let value = json!({
            "engine_b": {"slotType": "engine"},
            "engine_a": {"slotType": "engine"},
        });
        let doc = PartDocument::from_value(&value).unwrap();
        let names: Vec<_> = doc.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["engine_b", "engine_a"]);
    }

    #[test]
    fn skips_header_and_records_malformed_rows() {
        let value = json!({
            "engine": {
                "slotType": "engine",
                "slots": [
                    ["type", "default", "description"],
                    ["intake", "intake_a", "Intake", {"coreSlot": true}],
                    ["short"],
                    {"modifier": 1}
                ]
            }
        });
        let doc = PartDocument::from_value(&value).unwrap();
        let part = doc.get("engine").unwrap();

        assert_eq!(part.slots.len(), 1);
        assert_eq!(part.slots[0].slot_type, "intake");
        assert_eq!(
            part.slots[0].options.as_ref().unwrap().get("coreSlot"),
            Some(&json!(true))
        );
        assert_eq!(part.malformed_rows.len(), 2);
    }

    #[test]
    fn null_default_is_empty_slot() {
        let value = json!({"p": {"slotType": "x", "slots": [["nitrous", null, "Nitrous"]]}});
        let doc = PartDocument::from_value(&value).unwrap();
        assert!(doc.get("p").unwrap().slots[0].is_empty_slot());
    }

    #[test]
    fn rejects_non_object_root() {
        let err = PartDocument::from_value(&json!([1, 2])).unwrap_err();
        assert_eq!(err, DocumentError::NotAMapping { found: "array" });
    }

    #[test]
    fn rejects_non_array_slots() {
        let err = PartDocument::from_value(&json!({"p": {"slots": "nope"}})).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidField { field: "slots", .. }));
    }
}

//! Slot Document Model
//!
//! The boundary between raw part documents and the slot graph kernel.
//!
//! # Overview
//!
//! A part document is a mapping of part names to part data:
//!
//! ```text
//! part_name → { slotType, slots: [[type, default, description, options?], ...], options }
//! ```
//!
//! This crate provides:
//! - **PartDocument**: ordered part mapping consumed by the graph builder
//! - **SlotEntry**: one row of a part's slot array
//! - **DocumentParser**: pluggable text → `PartDocument` parsing (JSON, YAML)
//!
//! # Example
//!
//! ```rust
//! use slot_document::{DocumentParser, JsonParser};
//!
//! let doc = JsonParser
//!     .parse(r#"{"engine": {"slotType": "engine", "slots": [["intake", "intake_a", "Intake"]]}}"#)
//!     .unwrap();
//!
//! assert_eq!(doc.len(), 1);
//! assert_eq!(doc.get("engine").unwrap().slots[0].default, "intake_a");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod model;
pub mod parsers;

// Re-exports
pub use error::DocumentError;
pub use model::{Options, PartData, PartDocument, SlotEntry, SLOT_HEADER};
pub use parsers::{default_parsers, DocumentParser, JsonParser, ParserRegistry, YamlParser};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

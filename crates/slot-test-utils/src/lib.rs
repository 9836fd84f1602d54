//! Testing utilities for the slot graph workspace
//!
//! Shared fixtures (donor part documents) and tracing setup.

#![allow(missing_docs)]

use serde_json::json;
use slot_document::{Options, PartData, PartDocument, SlotEntry};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-writer `fmt` subscriber, once per process
///
/// Honours `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A document paired with its source id, ready for `add_document`
pub type Fixture = (PartDocument, &'static str);

pub fn part(slot_type: &str, slots: &[(&str, &str)]) -> PartData {
    slots.iter().fold(PartData::new(slot_type), |p, (t, d)| {
        p.with_slot(SlotEntry::new(*t, *d, *t))
    })
}

pub fn core_slot() -> Options {
    Options::from_iter([("coreSlot".to_string(), json!(true))])
}

/// `Root → Nitro → SubA` in one document
pub fn nitro_tree() -> Vec<Fixture> {
    vec![(
        PartDocument::new()
            .with_part("root", part("Root", &[("Nitro", "nitro_kit")]))
            .with_part("nitro_kit", part("Nitro", &[("SubA", "sub_a")]))
            .with_part("sub_a", part("SubA", &[])),
        "root.json",
    )]
}

/// `Root → Struct → Mesh`, with `Struct` defined in an extraction-only
/// structure document
pub fn structure_tree() -> Vec<Fixture> {
    vec![
        (
            PartDocument::new().with_part("root", part("Root", &[("Struct", "struct_ab12")])),
            "root.json",
        ),
        (
            PartDocument::new()
                .with_part("struct_ab12", part("Struct", &[("Mesh", "mesh_part")]))
                .with_part("mesh_part", part("Mesh", &[])),
            "camso_engine_structure.json",
        ),
    ]
}

/// `Root → Struct → [Bolt, Mesh → Tex]`, everything below `Root` defined in
/// an extraction-only structure document
pub fn absorbing_tree() -> Vec<Fixture> {
    vec![
        (
            PartDocument::new().with_part("root", part("Root", &[("Struct", "struct_ab12")])),
            "root.json",
        ),
        (
            PartDocument::new()
                .with_part(
                    "struct_ab12",
                    part("Struct", &[("Bolt", "bolt_part"), ("Mesh", "mesh_part")]),
                )
                .with_part("bolt_part", part("Bolt", &[]))
                .with_part("mesh_part", part("Mesh", &[("Tex", "tex_part")]))
                .with_part("tex_part", part("Tex", &[])),
            "camso_engine_structure.json",
        ),
    ]
}

/// Donor engine tree using the built-in `Camso_*` naming
///
/// ```text
/// Camso_Engine (camso_engine_ec8ba)
/// ├── Camso_Intake
/// ├── Camso_engine_structure_ec8ba   (structure document)
/// │   └── Camso_engine_mesh
/// ├── Camso_Nitrous                   (empty)
/// ├── Camso_Transmission
/// │   └── Camso_TransferCase
/// └── Camso_Badge                     (unresolved)
/// ```
pub fn donor_engine() -> Vec<Fixture> {
    vec![
        (
            PartDocument::new()
                .with_part(
                    "camso_engine_ec8ba",
                    part(
                        "Camso_Engine",
                        &[
                            ("Camso_Intake", "camso_intake_ec8ba"),
                            ("Camso_engine_structure_ec8ba", "camso_engine_structure_ec8ba"),
                            ("Camso_Nitrous", ""),
                            ("Camso_Transmission", "camso_transmission_ec8ba"),
                            ("Camso_Badge", "camso_badge_chrome"),
                        ],
                    ),
                )
                .with_part("camso_intake_ec8ba", part("Camso_Intake", &[])),
            "vehicles/camso/camso_engine.jbeam",
        ),
        (
            PartDocument::new()
                .with_part(
                    "camso_engine_structure_ec8ba",
                    part("Camso_engine_structure", &[("Camso_engine_mesh", "camso_engine_mesh")]),
                )
                .with_part("camso_engine_mesh", part("Camso_engine_mesh", &[])),
            "vehicles/camso/camso_engine_structure.jbeam",
        ),
        (
            PartDocument::new()
                .with_part(
                    "camso_transmission_ec8ba",
                    part(
                        "Camso_Transmission",
                        &[("Camso_TransferCase", "camso_transfercase_ec8ba")],
                    ),
                )
                .with_part("camso_transfercase_ec8ba", part("Camso_TransferCase", &[])),
            "vehicles/camso/camso_transmission.jbeam",
        ),
    ]
}

/// Donor engine document as raw JSON text, header row included
pub const DONOR_ENGINE_JSON: &str = r#"{
    "camso_engine_ec8ba": {
        "slotType": "Camso_Engine",
        "slots": [
            ["type", "default", "description"],
            ["Camso_Intake", "camso_intake_ec8ba", "Intake", {"coreSlot": true}],
            ["Camso_Nitrous", "", "Nitrous"]
        ]
    },
    "camso_intake_ec8ba": {
        "slotType": "Camso_Intake",
        "slots": []
    }
}"#;

/// Every part name in a fixture set
pub fn part_names(fixtures: &[Fixture]) -> Vec<String> {
    fixtures
        .iter()
        .flat_map(|(doc, _)| doc.iter().map(|(name, _)| name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_document::DocumentParser;

    #[test]
    fn donor_engine_parts_are_unique() {
        let names = part_names(&donor_engine());
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }

    #[test]
    fn raw_donor_parses() {
        let doc = slot_document::JsonParser.parse(DONOR_ENGINE_JSON).unwrap();
        let engine = doc.get("camso_engine_ec8ba").unwrap();
        assert_eq!(engine.slots.len(), 2);
        assert_eq!(engine.slots[0].options, Some(core_slot()));
    }
}

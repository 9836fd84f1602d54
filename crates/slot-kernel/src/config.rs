//! Adaptation configuration
//!
//! Declarative per-slot policy: explicit lists, pattern rules, replacement
//! rules and required slots. Loaded from in-memory TOML, YAML or JSON; the
//! kernel performs no file I/O.

use crate::error::ConfigError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use slot_document::Options;

/// Replacement for an extraction-only slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementConfig {
    /// Slot type that takes the removed slot's place
    pub replacement_type: String,
    /// Default part for a synthesised replacement
    pub default: Option<String>,
    /// Description for the replacement slot
    pub description: Option<String>,
    /// Options for the replacement slot
    pub options: Option<Options>,
    /// Discovery role naming the replacement's default part
    pub role: Option<String>,
}

/// Pattern rule classifying matching slots as ADAPT
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptRuleConfig {
    /// Case-insensitive regular expression over the slot type
    pub pattern: String,
    /// Discovery role naming the new slot type
    pub slot_role: Option<String>,
    /// Discovery role naming the new default part
    pub part_role: Option<String>,
    /// Stem used for `{namespace}_{stem}` when discovery has no answer
    pub fallback_suffix: Option<String>,
}

/// Slot the target requires even if the donor lacks it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredSlotConfig {
    /// Discovery role naming the slot type
    pub role: String,
    /// Discovery role naming the default part
    pub default_role: Option<String>,
    /// Stem used for `{namespace}_{stem}` when discovery has no answer
    pub fallback_suffix: String,
    /// Description of the injected slot
    pub description: String,
    /// Options of the injected slot
    pub options: Options,
}

/// Complete adaptation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Slot types removed together with their subtree
    pub prune_slots: Vec<String>,
    /// Slot types adapted regardless of pattern rules
    pub force_adapt_slots: Vec<String>,
    /// Slot types kept unchanged regardless of pattern rules
    pub preserve_slots: Vec<String>,
    /// Slot types whose default part is remapped
    pub remap_default_slots: Vec<String>,
    /// Slot types removed individually from output
    pub remove_slots: Vec<String>,
    /// Slot types kept for bookkeeping only
    pub internal_slots: Vec<String>,
    /// Replacement rules keyed by base slot type
    pub replace_slots: IndexMap<String, ReplacementConfig>,
    /// ADAPT pattern rules, first match wins
    pub adapt_rules: Vec<AdaptRuleConfig>,
    /// PRESERVE patterns
    pub preserve_patterns: Vec<String>,
    /// Patterns over source ids marking extraction-only documents
    pub extraction_markers: Vec<String>,
    /// Slots injected when absent
    pub required_slots: Vec<RequiredSlotConfig>,
    /// Options merged into matching slots
    pub slot_options: IndexMap<String, Options>,
    /// Descriptions set on matching slots
    pub slot_descriptions: IndexMap<String, String>,
    /// Mark adapted slots with `coreSlot: true`
    pub mark_core_slots: bool,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            prune_slots: Vec::new(),
            force_adapt_slots: Vec::new(),
            preserve_slots: Vec::new(),
            remap_default_slots: Vec::new(),
            remove_slots: Vec::new(),
            internal_slots: Vec::new(),
            replace_slots: IndexMap::new(),
            adapt_rules: Vec::new(),
            preserve_patterns: Vec::new(),
            extraction_markers: Vec::new(),
            required_slots: Vec::new(),
            slot_options: IndexMap::new(),
            slot_descriptions: IndexMap::new(),
            mark_core_slots: true,
        }
    }
}

fn core_slot() -> Options {
    Options::from_iter([("coreSlot".to_string(), json!(true))])
}

/// Rule discovering `{stem}_slot` and `{stem}_part`
fn adapt_rule(pattern: &str, stem: &str) -> AdaptRuleConfig {
    AdaptRuleConfig {
        pattern: pattern.to_string(),
        slot_role: Some(format!("{stem}_slot")),
        part_role: Some(format!("{stem}_part")),
        fallback_suffix: Some(stem.to_string()),
    }
}

static BUILTIN: Lazy<AdaptationConfig> = Lazy::new(|| AdaptationConfig {
    replace_slots: IndexMap::from_iter([(
        "Camso_engine_structure".to_string(),
        ReplacementConfig {
            replacement_type: "Camso_engine_mesh".to_string(),
            default: None,
            description: Some("Engine Mesh".to_string()),
            options: Some(core_slot()),
            role: None,
        },
    )]),
    adapt_rules: vec![
        adapt_rule("^Camso_Engine$", "engine"),
        adapt_rule("^Camso_Transmission$", "transmission"),
        adapt_rule("^Camso_TransferCase$", "transfer_case"),
    ],
    preserve_patterns: [
        "^Camso_Intake.*",
        "^Camso_EngineManagement.*",
        "^Camso_EngineInternals.*",
        "^Camso_Turbo.*",
        "^Camso_Supercharger.*",
        "^Camso_BalancingMass.*",
        "^Camso_RevLimiter.*",
        "^Camso_Nitrous.*",
        "^Camso_differential.*",
        "^Camso_driveshaft.*",
        "^Camso_engine_mesh.*",
        "^Camso_engine_structure.*",
        "^Camso_exhaust.*",
        "^camso_tuning.*",
    ]
    .iter()
    .map(|p| (*p).to_string())
    .collect(),
    extraction_markers: vec!["engine_structure".to_string()],
    required_slots: vec![RequiredSlotConfig {
        role: "mount_slot".to_string(),
        default_role: Some("mount_part".to_string()),
        fallback_suffix: "enginemounts".to_string(),
        description: "Engine Mounts".to_string(),
        options: core_slot(),
    }],
    ..AdaptationConfig::default()
});

impl AdaptationConfig {
    /// Built-in engine adaptation tables
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Toml`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// Parse from YAML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Yaml`] on malformed input.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Convert from an already-parsed JSON value
    ///
    /// # Errors
    /// Returns [`ConfigError::Json`] if the value has the wrong shape.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Add a slot type to the prune list
    #[must_use]
    pub fn prune(mut self, slot_type: impl Into<String>) -> Self {
        self.prune_slots.push(slot_type.into());
        self
    }

    /// Add a slot type to the force-adapt list
    #[must_use]
    pub fn force_adapt(mut self, slot_type: impl Into<String>) -> Self {
        self.force_adapt_slots.push(slot_type.into());
        self
    }

    /// Add a slot type to the remove list
    #[must_use]
    pub fn remove(mut self, slot_type: impl Into<String>) -> Self {
        self.remove_slots.push(slot_type.into());
        self
    }

    /// Add a replacement rule
    #[must_use]
    pub fn replace(mut self, slot_type: impl Into<String>, replacement: ReplacementConfig) -> Self {
        self.replace_slots.insert(slot_type.into(), replacement);
        self
    }

    /// Add an extraction marker pattern
    #[must_use]
    pub fn extraction_marker(mut self, pattern: impl Into<String>) -> Self {
        self.extraction_markers.push(pattern.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_empty_but_marks_core_slots() {
        let config = AdaptationConfig::default();
        assert!(config.adapt_rules.is_empty());
        assert!(config.preserve_patterns.is_empty());
        assert!(config.mark_core_slots);
    }

    #[test]
    fn builtin_tables() {
        let config = AdaptationConfig::builtin();
        assert_eq!(config.adapt_rules.len(), 3);
        assert_eq!(config.adapt_rules[0].slot_role.as_deref(), Some("engine_slot"));
        assert_eq!(config.adapt_rules[0].part_role.as_deref(), Some("engine_part"));
        assert_eq!(config.adapt_rules[2].part_role.as_deref(), Some("transfer_case_part"));
        assert_eq!(
            config.replace_slots["Camso_engine_structure"].replacement_type,
            "Camso_engine_mesh"
        );
        assert_eq!(config.required_slots[0].fallback_suffix, "enginemounts");
    }

    #[test]
    fn loads_toml() {
        let config = AdaptationConfig::from_toml_str(
            r#"
            prune_slots = ["Nitro"]
            mark_core_slots = false

            [[adapt_rules]]
            pattern = "^Engine$"
            slot_role = "engine_slot"

            [replace_slots.Struct]
            replacement_type = "Mesh"
            "#,
        )
        .unwrap();

        assert_eq!(config.prune_slots, vec!["Nitro"]);
        assert!(!config.mark_core_slots);
        assert_eq!(config.adapt_rules[0].pattern, "^Engine$");
        assert_eq!(config.replace_slots["Struct"].replacement_type, "Mesh");
    }

    #[test]
    fn loads_yaml_and_json() {
        let yaml = AdaptationConfig::from_yaml_str("remove_slots: [Camso_Badge]\n").unwrap();
        assert_eq!(yaml.remove_slots, vec!["Camso_Badge"]);

        let json = AdaptationConfig::from_json_value(serde_json::json!({
            "slot_options": {"Camso_Engine": {"coreSlot": true}}
        }))
        .unwrap();
        assert_eq!(json.slot_options["Camso_Engine"]["coreSlot"], serde_json::json!(true));
    }

    #[test]
    fn malformed_input_is_reported() {
        assert!(matches!(
            AdaptationConfig::from_toml_str("prune_slots = 3"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            AdaptationConfig::from_json_value(serde_json::json!([1])),
            Err(ConfigError::Json(_))
        ));
    }
}

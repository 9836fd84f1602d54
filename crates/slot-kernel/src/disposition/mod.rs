//! Disposition classifier
//!
//! Pure mapping from a node (and compiled configuration) to a
//! [`Disposition`], an optional [`ReplacementSpec`] and an [`AssetRole`].
//!
//! Resolution order, first match wins:
//! 1. prune list → PRUNE
//! 2. force-adapt list → ADAPT
//! 3. preserve list → PRESERVE
//! 4. remap-default list → REMAP_DEFAULT
//! 5. internal list → PRESERVE (role INTERNAL)
//! 6. replacement key → PRESERVE + replacement
//! 7. ADAPT patterns → ADAPT
//! 8. PRESERVE patterns → PRESERVE
//! 9. default → PRESERVE
//!
//! List entries and replacement keys compare suffix-agnostically and
//! case-insensitively against the node's original slot type.

use crate::config::{AdaptRuleConfig, AdaptationConfig, ReplacementConfig, RequiredSlotConfig};
use crate::error::ConfigError;
use crate::graph::SlotNode;
use crate::suffix::{matches_base, strip_suffix};
use crate::types::{AssetRole, Disposition};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use slot_document::Options;
use std::fmt;

/// Replacement recorded for a slot that should be replaced in output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementSpec {
    /// Configured key the node matched
    pub source_type: String,
    /// Slot type that takes its place
    pub replacement_type: String,
    /// Configured default part
    pub default: Option<String>,
    /// Configured description
    pub description: Option<String>,
    /// Configured options
    pub options: Options,
    /// Discovery role naming the default part
    pub role: Option<String>,
}

impl ReplacementSpec {
    fn from_config(key: &str, config: &ReplacementConfig) -> Self {
        Self {
            source_type: key.to_string(),
            replacement_type: config.replacement_type.clone(),
            default: config.default.clone(),
            description: config.description.clone(),
            options: config.options.clone().unwrap_or_default(),
            role: config.role.clone(),
        }
    }
}

/// Which rule produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "index", rename_all = "snake_case")]
pub enum MatchedRule {
    /// Explicit prune list
    PruneList,
    /// Explicit force-adapt list
    ForceAdaptList,
    /// Explicit preserve list
    PreserveList,
    /// Explicit remap-default list
    RemapDefaultList,
    /// Explicit internal list
    InternalList,
    /// Replacement rule key
    Replacement,
    /// ADAPT pattern at this index
    AdaptPattern(usize),
    /// PRESERVE pattern at this index
    PreservePattern(usize),
    /// No rule matched
    Default,
}

impl MatchedRule {
    /// Whether the decision came from configuration rather than the default
    #[must_use]
    pub fn is_configured(self) -> bool {
        !matches!(self, MatchedRule::Default)
    }
}

impl fmt::Display for MatchedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedRule::PruneList => f.write_str("prune list"),
            MatchedRule::ForceAdaptList => f.write_str("force-adapt list"),
            MatchedRule::PreserveList => f.write_str("preserve list"),
            MatchedRule::RemapDefaultList => f.write_str("remap-default list"),
            MatchedRule::InternalList => f.write_str("internal list"),
            MatchedRule::Replacement => f.write_str("replacement rule"),
            MatchedRule::AdaptPattern(i) => write!(f, "adapt pattern #{i}"),
            MatchedRule::PreservePattern(i) => write!(f, "preserve pattern #{i}"),
            MatchedRule::Default => f.write_str("default"),
        }
    }
}

/// Result of classifying one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Disposition
    pub disposition: Disposition,
    /// Replacement, when a replacement key matched
    pub replacement: Option<ReplacementSpec>,
    /// Rule that decided
    pub matched: MatchedRule,
}

/// Compiled ADAPT pattern rule
#[derive(Debug, Clone)]
pub struct AdaptRule {
    pattern: Regex,
    /// Discovery role naming the new slot type
    pub slot_role: Option<String>,
    /// Discovery role naming the new default part
    pub part_role: Option<String>,
    /// Stem for the namespace fallback
    pub fallback_suffix: Option<String>,
}

impl AdaptRule {
    /// Source pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Compiled classifier input
#[derive(Debug, Clone)]
pub struct DispositionRules {
    prune: Vec<String>,
    force_adapt: Vec<String>,
    preserve: Vec<String>,
    remap_default: Vec<String>,
    remove: Vec<String>,
    internal: Vec<String>,
    replacements: Vec<ReplacementSpec>,
    adapt_rules: Vec<AdaptRule>,
    preserve_patterns: Vec<Regex>,
    extraction_markers: Vec<Regex>,
    required: Vec<RequiredSlotConfig>,
    slot_options: IndexMap<String, Options>,
    slot_descriptions: IndexMap<String, String>,
    mark_core_slots: bool,
}

impl Default for DispositionRules {
    fn default() -> Self {
        Self {
            prune: Vec::new(),
            force_adapt: Vec::new(),
            preserve: Vec::new(),
            remap_default: Vec::new(),
            remove: Vec::new(),
            internal: Vec::new(),
            replacements: Vec::new(),
            adapt_rules: Vec::new(),
            preserve_patterns: Vec::new(),
            extraction_markers: Vec::new(),
            required: Vec::new(),
            slot_options: IndexMap::new(),
            slot_descriptions: IndexMap::new(),
            mark_core_slots: true,
        }
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn listed(list: &[String], slot_type: &str) -> bool {
    list.iter().any(|entry| matches_base(slot_type, entry))
}

impl DispositionRules {
    /// Compile configuration into classifier rules
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidPattern`] for the first pattern that
    /// is not a valid regular expression.
    pub fn compile(config: &AdaptationConfig) -> Result<Self, ConfigError> {
        let adapt_rules = config
            .adapt_rules
            .iter()
            .map(|rule: &AdaptRuleConfig| {
                Ok(AdaptRule {
                    pattern: compile_pattern(&rule.pattern)?,
                    slot_role: rule.slot_role.clone(),
                    part_role: rule.part_role.clone(),
                    fallback_suffix: rule.fallback_suffix.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            prune: config.prune_slots.clone(),
            force_adapt: config.force_adapt_slots.clone(),
            preserve: config.preserve_slots.clone(),
            remap_default: config.remap_default_slots.clone(),
            remove: config.remove_slots.clone(),
            internal: config.internal_slots.clone(),
            replacements: config
                .replace_slots
                .iter()
                .map(|(key, r)| ReplacementSpec::from_config(key, r))
                .collect(),
            adapt_rules,
            preserve_patterns: config
                .preserve_patterns
                .iter()
                .map(|p| compile_pattern(p))
                .collect::<Result<_, _>>()?,
            extraction_markers: config
                .extraction_markers
                .iter()
                .map(|p| compile_pattern(p))
                .collect::<Result<_, _>>()?,
            required: config.required_slots.clone(),
            slot_options: config.slot_options.clone(),
            slot_descriptions: config.slot_descriptions.clone(),
            mark_core_slots: config.mark_core_slots,
        })
    }

    /// Classify a node by its original slot type
    #[must_use]
    pub fn classify(&self, node: &SlotNode) -> Classification {
        let slot_type = node.original_slot_type.as_str();
        let plain = |disposition, matched| Classification {
            disposition,
            replacement: None,
            matched,
        };

        if listed(&self.prune, slot_type) {
            return plain(Disposition::Prune, MatchedRule::PruneList);
        }
        if listed(&self.force_adapt, slot_type) {
            return plain(Disposition::Adapt, MatchedRule::ForceAdaptList);
        }
        if listed(&self.preserve, slot_type) {
            return plain(Disposition::Preserve, MatchedRule::PreserveList);
        }
        if listed(&self.remap_default, slot_type) {
            return plain(Disposition::RemapDefault, MatchedRule::RemapDefaultList);
        }
        if listed(&self.internal, slot_type) {
            return plain(Disposition::Preserve, MatchedRule::InternalList);
        }
        if let Some(spec) = self.replacement_for(slot_type) {
            return Classification {
                disposition: Disposition::Preserve,
                replacement: Some(spec.clone()),
                matched: MatchedRule::Replacement,
            };
        }
        if let Some(i) = self
            .adapt_rules
            .iter()
            .position(|r| pattern_matches(&r.pattern, slot_type))
        {
            return plain(Disposition::Adapt, MatchedRule::AdaptPattern(i));
        }
        if let Some(i) = self
            .preserve_patterns
            .iter()
            .position(|p| pattern_matches(p, slot_type))
        {
            return plain(Disposition::Preserve, MatchedRule::PreservePattern(i));
        }
        plain(Disposition::Preserve, MatchedRule::Default)
    }

    /// Derive the asset role for a node given its disposition
    #[must_use]
    pub fn asset_role(&self, node: &SlotNode, disposition: Disposition) -> AssetRole {
        let extraction_only = node.source_file.as_ref().is_some_and(|src| {
            self.extraction_markers
                .iter()
                .any(|m| m.is_match(src.as_str()))
        });
        if extraction_only {
            AssetRole::Source
        } else if matches!(disposition, Disposition::Adapt | Disposition::Inject) {
            AssetRole::Target
        } else if listed(&self.internal, &node.original_slot_type) {
            AssetRole::Internal
        } else {
            AssetRole::Preserve
        }
    }

    /// Replacement rule for a slot type, suffix-agnostic
    #[must_use]
    pub fn replacement_for(&self, slot_type: &str) -> Option<&ReplacementSpec> {
        self.replacements
            .iter()
            .find(|r| matches_base(slot_type, &r.source_type))
    }

    /// Whether the slot type is on the remove list
    #[must_use]
    pub fn is_removed(&self, slot_type: &str) -> bool {
        listed(&self.remove, slot_type)
    }

    /// Compiled ADAPT rule by index
    #[must_use]
    pub fn adapt_rule(&self, index: usize) -> Option<&AdaptRule> {
        self.adapt_rules.get(index)
    }

    /// Configured options for a slot type
    #[must_use]
    pub fn options_for(&self, slot_type: &str) -> Option<&Options> {
        self.slot_options
            .iter()
            .find(|(key, _)| matches_base(slot_type, key))
            .map(|(_, opts)| opts)
    }

    /// Configured description for a slot type
    #[must_use]
    pub fn description_for(&self, slot_type: &str) -> Option<&str> {
        self.slot_descriptions
            .iter()
            .find(|(key, _)| matches_base(slot_type, key))
            .map(|(_, d)| d.as_str())
    }

    /// Required slots
    #[must_use]
    pub fn required_slots(&self) -> &[RequiredSlotConfig] {
        &self.required
    }

    /// Whether adapted slots receive `coreSlot: true`
    #[must_use]
    pub fn mark_core_slots(&self) -> bool {
        self.mark_core_slots
    }
}

fn pattern_matches(pattern: &Regex, slot_type: &str) -> bool {
    pattern.is_match(slot_type) || pattern.is_match(strip_suffix(slot_type))
}

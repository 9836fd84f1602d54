//! Slot graph builder
//!
//! Registers part documents into a pending index, then walks breadth-first
//! from a root part, creating one node per slot row and resolving each
//! row's default across every registered document.

use crate::construction::BuildWarning;
use crate::error::DocumentResolutionError;
use crate::graph::{CatalogEntry, SlotGraph, SlotNode};
use crate::suffix::matches_base;
use crate::types::{NodeId, SourceId};
use indexmap::IndexMap;
use slot_document::{default_parsers, DocumentError, ParserRegistry, PartData, PartDocument};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct PendingPart {
    source: SourceId,
    data: PartData,
}

/// Builder for [`SlotGraph`]s
///
/// Usage:
/// ```rust
/// use slot_document::{PartData, PartDocument, SlotEntry};
/// use slot_kernel::construction::SlotGraphBuilder;
///
/// let doc = PartDocument::new()
///     .with_part("car", PartData::new("main").with_slot(SlotEntry::new("engine", "v8", "Engine")))
///     .with_part("v8", PartData::new("engine"));
///
/// let mut builder = SlotGraphBuilder::new();
/// builder.add_document(doc, "car.json");
/// let graph = builder.build("car").unwrap();
///
/// assert_eq!(graph.len(), 2);
/// assert!(graph.warnings().is_empty());
/// ```
#[derive(Debug)]
pub struct SlotGraphBuilder {
    parsers: ParserRegistry,
    documents: Vec<SourceId>,
    parts: IndexMap<String, PendingPart>,
    warnings: Vec<BuildWarning>,
}

impl Default for SlotGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotGraphBuilder {
    /// Create a builder with the default JSON / YAML parsers
    #[must_use]
    pub fn new() -> Self {
        Self::with_parsers(default_parsers())
    }

    /// Create a builder with a custom parser registry
    #[must_use]
    pub fn with_parsers(parsers: ParserRegistry) -> Self {
        Self {
            parsers,
            documents: Vec::new(),
            parts: IndexMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Number of registered documents
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of distinct parts indexed
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Warnings collected while registering documents
    #[must_use]
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Register every part of an already-parsed document
    ///
    /// Returns the number of parts added. A part name that is already
    /// indexed keeps its first definition.
    pub fn add_document(&mut self, document: PartDocument, source: impl Into<SourceId>) -> usize {
        let source = source.into();
        let mut added = 0;

        for (name, data) in document {
            if let Some(existing) = self.parts.get(&name) {
                warn!(part = %name, kept = %existing.source, ignored = %source, "duplicate part");
                self.warnings.push(BuildWarning::DuplicatePart {
                    part: name,
                    kept: existing.source.clone(),
                    ignored: source.clone(),
                });
                continue;
            }

            for row in &data.malformed_rows {
                warn!(part = %name, source = %source, row = %row, "malformed slot row");
                self.warnings.push(BuildWarning::MalformedSlotRow {
                    part: name.clone(),
                    document: source.clone(),
                    row: row.clone(),
                });
            }

            self.parts.insert(
                name,
                PendingPart {
                    source: source.clone(),
                    data,
                },
            );
            added += 1;
        }

        info!(source = %source, parts = added, "document registered");
        self.documents.push(source);
        added
    }

    /// Parse `content` with the registered parsers and register the result
    ///
    /// # Errors
    /// Surfaces the parser's [`DocumentError`] unchanged.
    pub fn add_source(
        &mut self,
        source: impl Into<SourceId>,
        content: &str,
    ) -> Result<usize, DocumentError> {
        let source = source.into();
        let document = self.parsers.parse(source.as_str(), content)?;
        Ok(self.add_document(document, source))
    }

    /// Build the slot tree rooted at `root_part`
    ///
    /// # Errors
    /// Fails if no documents are registered or the root part cannot be
    /// resolved. Unresolved non-root defaults are warnings on the graph.
    pub fn build(&self, root_part: &str) -> Result<SlotGraph, DocumentResolutionError> {
        if self.documents.is_empty() {
            return Err(DocumentResolutionError::NoDocuments);
        }

        let (root_name, root) = self
            .parts
            .get_key_value(root_part)
            .or_else(|| self.parts.iter().find(|(name, _)| matches_base(name, root_part)))
            .ok_or_else(|| DocumentResolutionError::RootNotFound {
                part: root_part.to_string(),
                indexed: self.parts.len(),
            })?;

        let root_slot_type = if root.data.slot_type.is_empty() {
            root_name.clone()
        } else {
            root.data.slot_type.clone()
        };
        let mut root_node = SlotNode::new(
            NodeId(0),
            root_slot_type,
            root_name.clone(),
            String::new(),
            root.data.options.clone(),
            Some(root.source.clone()),
        );
        root_node.resolved_part = Some(root_name.clone());

        let mut graph = SlotGraph::with_root(root_node);
        graph.set_catalog(self.catalog());
        for warning in &self.warnings {
            graph.push_warning(warning.clone());
        }

        let mut queue = VecDeque::from([(graph.root_id(), root_name.clone(), vec![root_name.clone()])]);

        while let Some((parent_id, part_name, path)) = queue.pop_front() {
            let Some(part) = self.parts.get(&part_name) else {
                continue;
            };

            for entry in &part.data.slots {
                let resolved = if entry.default.is_empty() {
                    None
                } else {
                    self.resolve(&entry.default, &entry.slot_type)
                };

                let source = resolved
                    .map_or_else(|| part.source.clone(), |(_, p)| p.source.clone());
                let mut node = SlotNode::new(
                    NodeId(0),
                    entry.slot_type.clone(),
                    entry.default.clone(),
                    entry.description.clone(),
                    entry.options.clone().unwrap_or_default(),
                    Some(source),
                );
                node.resolved_part = resolved.map(|(name, _)| name.clone());

                let id = graph.insert(node);
                graph.link(id, parent_id, None);

                match resolved {
                    None if entry.default.is_empty() => {}
                    None => {
                        warn!(node = %id, slot_type = %entry.slot_type, default = %entry.default, "unresolved default");
                        graph.push_warning(BuildWarning::UnresolvedDefault {
                            node: id,
                            slot_type: entry.slot_type.clone(),
                            default_part: entry.default.clone(),
                        });
                    }
                    Some((name, _)) if path.contains(name) => {
                        warn!(node = %id, part = %name, "recursive part, not expanded");
                        graph.push_warning(BuildWarning::RecursivePart {
                            node: id,
                            part: name.clone(),
                        });
                    }
                    Some((name, _)) => {
                        debug!(node = %id, slot_type = %entry.slot_type, part = %name, "expanding slot");
                        let mut next = path.clone();
                        next.push(name.clone());
                        queue.push_back((id, name.clone(), next));
                    }
                }
            }
        }

        info!(
            graph = %graph.id(),
            root = %root_name,
            nodes = graph.len(),
            warnings = graph.warnings().len(),
            "slot graph built"
        );
        Ok(graph)
    }

    /// Exact name, then suffix-agnostic name, then declared slot type
    fn resolve(&self, default: &str, slot_type: &str) -> Option<(&String, &PendingPart)> {
        self.parts
            .get_key_value(default)
            .or_else(|| self.parts.iter().find(|(name, _)| matches_base(name, default)))
            .or_else(|| {
                let found = self
                    .parts
                    .iter()
                    .find(|(_, p)| !p.data.slot_type.is_empty() && matches_base(&p.data.slot_type, slot_type));
                if let Some((name, p)) = found {
                    debug!(
                        default,
                        slot_type,
                        part = %name,
                        source = %p.source,
                        "default bound by declared slot type"
                    );
                }
                found
            })
    }

    fn catalog(&self) -> IndexMap<String, CatalogEntry> {
        self.parts
            .iter()
            .map(|(name, p)| {
                (
                    name.clone(),
                    CatalogEntry {
                        name: name.clone(),
                        source: p.source.clone(),
                        slot_type: p.data.slot_type.clone(),
                    },
                )
            })
            .collect()
    }
}

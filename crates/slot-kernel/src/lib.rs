//! Slot Kernel (slot-kernel)
//!
//! Slot dependency graph with a four-phase adaptation pipeline:
//! 1. **Construction**: build the donor tree from part documents
//! 2. **Planning**: classify every slot and compute an ordered plan
//! 3. **Execution**: apply the plan under the lifecycle state machine
//! 4. **Validation**: check the result before anything is exported
//!
//! Output generators (slot arrays, manifest) read the executed graph.
//!
//! # Quick Start
//!
//! ```rust
//! use slot_kernel::prelude::*;
//! use slot_document::{PartData, PartDocument, SlotEntry};
//!
//! let mut builder = SlotGraphBuilder::new();
//! builder.add_document(
//!     PartDocument::new().with_part(
//!         "camso_engine_ec8ba",
//!         PartData::new("Camso_Engine").with_slot(SlotEntry::new("Camso_Intake", "", "Intake")),
//!     ),
//!     "camso_engine.jbeam",
//! );
//!
//! let discovery = DiscoveryData::new().with("engine_slot", "vehicleX_engine");
//! let run = adapt(&builder, "camso_engine_ec8ba", &AdaptationConfig::builtin(), "vx", &discovery)?;
//!
//! assert_eq!(run.graph.root().slot_type, "vehicleX_engine");
//! assert!(run.report.valid);
//! # Ok::<(), slot_kernel::KernelError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod config;
pub mod error;
pub mod graph;
pub mod provenance;
pub mod state_machine;
pub mod suffix;
pub mod transform;
pub mod types;

// Pipeline phases
pub mod construction;
pub mod disposition;
pub mod executor;
pub mod planner;
pub mod validation;

// Consumers
pub mod output;
pub mod pipeline;

// Re-exports
pub use error::*;
pub use types::*;

/// Commonly used types in one import
pub mod prelude {
    pub use crate::config::{AdaptationConfig, AdaptRuleConfig, ReplacementConfig, RequiredSlotConfig};
    pub use crate::construction::{BuildWarning, SlotGraphBuilder};
    pub use crate::disposition::{Classification, DispositionRules, MatchedRule, ReplacementSpec};
    pub use crate::error::{
        DocumentResolutionError, ExecutionError, InvalidStateTransitionError, KernelError,
        ValidationFailure,
    };
    pub use crate::executor::{apply, execute_all, seal, ExecutionSummary};
    pub use crate::graph::{SlotGraph, SlotNode};
    pub use crate::output::{slot_rows, slot_rows_for_part, Manifest, ManifestWalker, SlotRow};
    pub use crate::pipeline::{adapt, Adaptation};
    pub use crate::planner::{plan, DiscoveryData, Plan, PlanSummary};
    pub use crate::transform::{Derivation, TransformOp, TransformValue, Transformation};
    pub use crate::types::{AssetRole, Disposition, GraphId, NodeId, SlotState, SourceId};
    pub use crate::validation::{validate, FindingKind, Severity, ValidationReport};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

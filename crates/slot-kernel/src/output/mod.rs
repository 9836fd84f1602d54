//! Output generators
//!
//! Read-only views over an executed graph: slot arrays for regenerated
//! part documents and the export manifest.

pub mod manifest;
pub mod slots;

pub use manifest::{
    CopyPlan, DocumentCopy, ExcludedDocument, Manifest, ManifestEntry, ManifestStatistics,
    ManifestWalker,
};
pub use slots::{slot_rows, slot_rows_for_part, with_header, SlotRow};

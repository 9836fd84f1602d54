//! Hash-chained provenance log
//!
//! Every applied transformation is appended with the hash of its
//! predecessor, so any later edit to the record sequence is detectable.

use crate::error::ProvenanceError;
use crate::transform::{TransformOp, Transformation};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One applied transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Plan position of the transformation
    pub seq: u64,
    /// Node it was applied to
    pub node: NodeId,
    /// Operation applied
    pub operation: TransformOp,
    /// Recorded reason
    pub reason: String,
    /// Hash of the previous entry (zero for the first)
    pub prev_hash: [u8; 32],
    /// Hash of this entry
    pub hash: [u8; 32],
}

impl ProvenanceEntry {
    /// Hex rendering of the entry hash
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Append-only provenance log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvenanceLog {
    entries: Vec<ProvenanceEntry>,
}

impl ProvenanceLog {
    /// Create empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an applied transformation; returns the new chain head
    pub fn append(&mut self, transformation: &Transformation) -> [u8; 32] {
        let prev_hash = self.entries.last().map_or([0u8; 32], |e| e.hash);
        let mut entry = ProvenanceEntry {
            seq: transformation.seq,
            node: transformation.target,
            operation: transformation.operation,
            reason: transformation.reason.clone(),
            prev_hash,
            hash: [0u8; 32],
        };
        entry.hash = compute_hash(&entry);
        let head = entry.hash;
        self.entries.push(entry);
        head
    }

    /// All entries in application order
    #[must_use]
    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been applied yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex hash of the last entry
    #[must_use]
    pub fn head_hex(&self) -> Option<String> {
        self.entries.last().map(ProvenanceEntry::hash_hex)
    }

    /// Re-compute the chain
    ///
    /// # Errors
    /// Returns the index of the first entry whose link or hash is wrong.
    pub fn verify_integrity(&self) -> Result<(), ProvenanceError> {
        let mut prev = [0u8; 32];
        for (index, e) in self.entries.iter().enumerate() {
            if e.prev_hash != prev || e.hash != compute_hash(e) {
                return Err(ProvenanceError::IntegrityViolation { index });
            }
            prev = e.hash;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> &mut Vec<ProvenanceEntry> {
        &mut self.entries
    }
}

fn compute_hash(entry: &ProvenanceEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.seq.to_le_bytes());
    hasher.update(entry.node.0.to_le_bytes());
    hasher.update(entry.operation.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(entry.reason.as_bytes());
    hasher.update([0]);
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Derivation;

    fn record(seq: u64) -> Transformation {
        Transformation::new(seq, TransformOp::Retain, NodeId(0), Derivation::Policy, "preserve")
    }

    #[test]
    fn chain_links_entries() {
        let mut log = ProvenanceLog::new();
        log.append(&record(0));
        log.append(&record(1));

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].prev_hash, log.entries()[0].hash);
        assert!(log.verify_integrity().is_ok());
        assert_eq!(log.head_hex().unwrap().len(), 64);
    }

    #[test]
    fn tampering_is_detected() {
        let mut log = ProvenanceLog::new();
        log.append(&record(0));
        log.append(&record(1));
        log.entries_mut()[0].reason = "edited".into();

        assert_eq!(
            log.verify_integrity(),
            Err(ProvenanceError::IntegrityViolation { index: 0 })
        );
    }
}

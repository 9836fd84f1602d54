//! Error taxonomy for the slot kernel
//!
//! - [`DocumentResolutionError`]: builder-level, fatal
//! - [`ExecutionError`]: executor-level, always aborts
//! - [`ValidationFailure`]: only when the caller opts into `raise_on_error`
//! - [`ConfigError`]: configuration loading and rule compilation
//!
//! Non-fatal builder findings are [`crate::construction::BuildWarning`]s and
//! are stored on the graph rather than raised.

use crate::transform::TransformOp;
use crate::types::{NodeId, SlotState};
use crate::validation::ValidationReport;
use slot_document::DocumentError;
use std::fmt;

/// Umbrella error for pipeline convenience functions
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A source document could not be parsed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// The root part could not be resolved
    #[error("resolution error: {0}")]
    Resolution(#[from] DocumentResolutionError),

    /// Configuration could not be loaded or compiled
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Planner / executor contract violation
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Validation reported errors and the caller asked to raise
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),
}

impl KernelError {
    /// Whether the error signals bad input rather than an internal bug
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            KernelError::Document(_) | KernelError::Resolution(_) | KernelError::Config(_)
        )
    }

    /// Whether the error signals a planner / executor desynchronisation
    #[must_use]
    pub fn is_internal_fault(&self) -> bool {
        matches!(self, KernelError::Execution(_))
    }
}

/// Root part or a required cross-document reference cannot be found
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentResolutionError {
    /// No document has been registered with the builder
    #[error("no documents registered")]
    NoDocuments,

    /// Root part is not defined by any registered document
    #[error("root part '{part}' not found in {indexed} indexed parts")]
    RootNotFound {
        /// Requested root part
        part: String,
        /// Number of parts searched
        indexed: usize,
    },
}

/// Raw state-machine violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// `to` is not reachable from `from`
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: SlotState,
        /// Requested state
        to: SlotState,
    },
}

/// Why a transition was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// The state table forbids the transition
    Illegal(StateMachineError),
    /// The record (or a later one) was already applied to the node
    AlreadyApplied {
        /// Last sequence number in the node's history
        last_seq: u64,
    },
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionCause::Illegal(e) => write!(f, "{e}"),
            TransitionCause::AlreadyApplied { last_seq } => {
                write!(f, "already applied (node history ends at seq {last_seq})")
            }
        }
    }
}

/// Executor attempted an operation illegal for a node's current state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {operation} (seq {seq}) to {node} '{slot_type}' in state {from}: {cause}")]
pub struct InvalidStateTransitionError {
    /// Target node
    pub node: NodeId,
    /// Target node's slot type at the time
    pub slot_type: String,
    /// State the node was in
    pub from: SlotState,
    /// Operation attempted
    pub operation: TransformOp,
    /// Plan position of the record
    pub seq: u64,
    /// Rejection cause
    pub cause: TransitionCause,
}

impl InvalidStateTransitionError {
    /// Whether the rejection was the double-apply guard
    #[must_use]
    pub fn is_double_apply(&self) -> bool {
        matches!(self.cause, TransitionCause::AlreadyApplied { .. })
    }
}

/// Executor-level failures; always abort `execute_all`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// Lifecycle guard rejected the record
    #[error(transparent)]
    InvalidStateTransition(#[from] InvalidStateTransitionError),

    /// Record targets a node that does not exist
    #[error("transformation seq {seq} targets unknown node {node}")]
    NodeNotFound {
        /// Missing node
        node: NodeId,
        /// Plan position of the record
        seq: u64,
    },

    /// Injection was planned against a different id than the graph allocates
    #[error("injection desync: graph would allocate {expected}, plan reserved {actual}")]
    InjectionDesync {
        /// Id the graph allocates next
        expected: NodeId,
        /// Id reserved by the planner
        actual: NodeId,
    },

    /// Record lacks the snapshot its operation needs
    #[error("transformation seq {seq} ({operation}) is missing its {expected} value")]
    MalformedRecord {
        /// Plan position of the record
        seq: u64,
        /// Operation
        operation: TransformOp,
        /// Expected `after` kind
        expected: &'static str,
    },
}

/// Hash chain verification failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProvenanceError {
    /// Entry at `index` does not match its recomputed hash or link
    #[error("provenance chain broken at entry {index}")]
    IntegrityViolation {
        /// First bad entry
        index: usize,
    },
}

/// Configuration loading or rule compilation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// TOML deserialisation failed
    #[error("invalid TOML configuration: {0}")]
    Toml(String),

    /// YAML deserialisation failed
    #[error("invalid YAML configuration: {0}")]
    Yaml(String),

    /// JSON deserialisation failed
    #[error("invalid JSON configuration: {0}")]
    Json(String),

    /// A pattern rule is not a valid regular expression
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Offending pattern
        pattern: String,
        /// Regex compiler message
        message: String,
    },
}

/// Validation produced errors and the caller asked for them to be raised
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} error(s), {} warning(s){}", .report.errors.len(), .report.warnings.len(), first_error(.report))]
pub struct ValidationFailure {
    /// The full report
    pub report: Box<ValidationReport>,
}

fn first_error(report: &ValidationReport) -> String {
    report
        .errors
        .first()
        .map(|f| format!("; first: {f}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_display() {
        let err = InvalidStateTransitionError {
            node: NodeId(4),
            slot_type: "Camso_Engine".into(),
            from: SlotState::Transformed,
            operation: TransformOp::Retain,
            seq: 9,
            cause: TransitionCause::AlreadyApplied { last_seq: 9 },
        };
        assert!(err.is_double_apply());
        assert_eq!(
            err.to_string(),
            "cannot apply RETAIN (seq 9) to #4 'Camso_Engine' in state TRANSFORMED: \
             already applied (node history ends at seq 9)"
        );
    }

    #[test]
    fn kernel_error_classification() {
        let input: KernelError = DocumentResolutionError::NoDocuments.into();
        assert!(input.is_input_error());
        assert!(!input.is_internal_fault());

        let fault: KernelError = ExecutionError::InjectionDesync {
            expected: NodeId(3),
            actual: NodeId(5),
        }
        .into();
        assert!(fault.is_internal_fault());
    }
}

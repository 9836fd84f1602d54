//! Node lifecycle state machine
//!
//! ```text
//! ORIGINAL → PLANNED → TRANSFORMED → VALIDATED
//!     ↘         ↘         ↓ ↺
//!       ───────── PRUNED (terminal)
//! ```

use crate::error::StateMachineError;
use crate::types::SlotState;

/// Validates a state transition.
///
/// # Errors
/// Returns [`StateMachineError::IllegalTransition`] if `to` is not reachable
/// from `from` in one step.
pub fn validate_transition(from: SlotState, to: SlotState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: SlotState) -> Vec<SlotState> {
    use SlotState::{Original, Planned, Pruned, Transformed, Validated};
    match from {
        Original => vec![Planned, Pruned],
        Planned => vec![Transformed, Pruned],
        Transformed => vec![Transformed, Validated, Pruned],
        Validated | Pruned => vec![],
    }
}

/// Whether no further transition is possible
#[must_use]
pub fn is_terminal(state: SlotState) -> bool {
    allowed_transitions(state).is_empty()
}

fn allowed(from: SlotState, to: SlotState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        assert!(validate_transition(SlotState::Original, SlotState::Planned).is_ok());
        assert!(validate_transition(SlotState::Planned, SlotState::Transformed).is_ok());
        assert!(validate_transition(SlotState::Transformed, SlotState::Transformed).is_ok());
        assert!(validate_transition(SlotState::Transformed, SlotState::Validated).is_ok());
    }

    #[test]
    fn validated_cannot_be_pruned() {
        let err = validate_transition(SlotState::Validated, SlotState::Pruned).unwrap_err();
        assert_eq!(
            err,
            StateMachineError::IllegalTransition {
                from: SlotState::Validated,
                to: SlotState::Pruned
            }
        );
    }

    #[test]
    fn planning_cannot_be_skipped() {
        assert!(validate_transition(SlotState::Original, SlotState::Transformed).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(is_terminal(SlotState::Validated));
        assert!(is_terminal(SlotState::Pruned));
        assert!(!is_terminal(SlotState::Transformed));
    }
}

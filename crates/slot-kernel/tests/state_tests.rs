use slot_kernel::state_machine::{allowed_transitions, is_terminal, validate_transition};
use slot_kernel::transform::TransformOp;
use slot_kernel::types::SlotState;
use proptest::prelude::*;

fn any_state() -> impl Strategy<Value = SlotState> {
    prop_oneof![
        Just(SlotState::Original),
        Just(SlotState::Planned),
        Just(SlotState::Transformed),
        Just(SlotState::Validated),
        Just(SlotState::Pruned),
    ]
}

#[test]
fn test_original_transitions() {
    assert!(validate_transition(SlotState::Original, SlotState::Planned).is_ok());
    assert!(validate_transition(SlotState::Original, SlotState::Pruned).is_ok());

    // Invalid
    assert!(validate_transition(SlotState::Original, SlotState::Transformed).is_err());
    assert!(validate_transition(SlotState::Original, SlotState::Validated).is_err());
}

#[test]
fn test_transformed_may_repeat() {
    assert!(validate_transition(SlotState::Transformed, SlotState::Transformed).is_ok());
    assert!(validate_transition(SlotState::Transformed, SlotState::Validated).is_ok());
    assert!(validate_transition(SlotState::Transformed, SlotState::Planned).is_err());
}

#[test]
fn test_terminal_states() {
    assert!(is_terminal(SlotState::Validated));
    assert!(is_terminal(SlotState::Pruned));
    assert!(!is_terminal(SlotState::Transformed));

    // Validated cannot be pruned afterwards
    assert!(validate_transition(SlotState::Validated, SlotState::Pruned).is_err());
}

#[test]
fn test_every_operation_lands_in_a_reachable_state() {
    for op in TransformOp::ALL {
        let target = op.resulting_state();
        let reachable = SlotState::ALL
            .iter()
            .any(|from| allowed_transitions(*from).contains(&target));
        assert!(reachable, "{op} drives nodes into unreachable {target}");
    }
}

proptest! {
    #[test]
    fn prop_all_transitions_are_subset_of_allowed(from in any_state(), to in any_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_pruned_reachable_from_every_live_state(from in any_state()) {
        let reachable = validate_transition(from, SlotState::Pruned).is_ok();
        let live = !matches!(from, SlotState::Validated | SlotState::Pruned);
        prop_assert_eq!(reachable, live);
    }
}

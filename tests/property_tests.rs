//! Property-based tests for the capture lifecycle.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated states and event sequences.

use camshot::core::{
    CaptureEvent, CaptureState, CaptureStateMachine, StateHistory, StateTransition,
    TransitionTable,
};
use chrono::Utc;
use proptest::prelude::*;

prop_compose! {
    fn arbitrary_state()(index in 0..CaptureState::ALL.len()) -> CaptureState {
        CaptureState::ALL[index]
    }
}

prop_compose! {
    fn arbitrary_event()(index in 0..CaptureEvent::ALL.len()) -> CaptureEvent {
        CaptureEvent::ALL[index]
    }
}

proptest! {
    #[test]
    fn legal_pairs_land_on_table_target(state in arbitrary_state(), event in arbitrary_event()) {
        let table = TransitionTable::capture();
        let mut machine = CaptureStateMachine::with_initial(state);

        match table.lookup(state, event) {
            Some(expected) => {
                prop_assert_eq!(machine.transition(event), Ok(expected));
                prop_assert_eq!(machine.current_state(), expected);
            }
            None => {
                let err = machine.transition(event).unwrap_err();
                prop_assert_eq!(err.state, state);
                prop_assert_eq!(err.event, event);
                prop_assert_eq!(machine.current_state(), state);
                prop_assert!(machine.history().is_empty());
            }
        }
    }

    #[test]
    fn terminal_iff_completed_or_error(state in arbitrary_state()) {
        let machine = CaptureStateMachine::with_initial(state);
        prop_assert_eq!(
            machine.is_terminal(),
            matches!(state, CaptureState::Completed | CaptureState::Error)
        );
    }

    #[test]
    fn can_handle_agrees_with_transition(state in arbitrary_state(), event in arbitrary_event()) {
        let mut machine = CaptureStateMachine::with_initial(state);
        let expected = machine.can_handle(event);
        prop_assert_eq!(machine.transition(event).is_ok(), expected);
    }

    #[test]
    fn random_sequences_only_follow_table_edges(
        events in prop::collection::vec(arbitrary_event(), 0..40)
    ) {
        let table = TransitionTable::capture();
        let mut machine = CaptureStateMachine::new();
        let mut applied = 0;

        for event in events {
            let before = machine.current_state();
            match machine.transition(event) {
                Ok(after) => {
                    prop_assert_eq!(table.lookup(before, event), Some(after));
                    applied += 1;
                }
                Err(_) => prop_assert_eq!(machine.current_state(), before),
            }
        }

        prop_assert_eq!(machine.history().transitions().len(), applied);
    }

    #[test]
    fn history_path_is_connected(
        events in prop::collection::vec(arbitrary_event(), 0..40)
    ) {
        let mut machine = CaptureStateMachine::new();
        for event in events {
            let _ = machine.transition(event);
        }

        let transitions = machine.history().transitions();
        for pair in transitions.windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
        }
        if let Some(last) = transitions.last() {
            prop_assert_eq!(last.to, machine.current_state());
        }
    }

    #[test]
    fn attempt_counts_retries(retries in 0usize..5) {
        let mut machine = CaptureStateMachine::new();

        for _ in 0..retries {
            machine.transition(CaptureEvent::StartConnect).unwrap();
            machine.transition(CaptureEvent::ConnectFailure).unwrap();
            machine.transition(CaptureEvent::Retry).unwrap();
        }

        prop_assert_eq!(machine.attempt(), retries + 1);
        prop_assert!(machine.can_handle(CaptureEvent::StartConnect));
    }

    #[test]
    fn history_record_is_pure(from in arbitrary_state(), event in arbitrary_event(), to in arbitrary_state()) {
        let history = StateHistory::new();

        let new_history = history.record(StateTransition {
            from,
            event,
            to,
            timestamp: Utc::now(),
            attempt: 1,
        });

        prop_assert!(history.is_empty());
        prop_assert_eq!(new_history.transitions().len(), 1);
        prop_assert_eq!(new_history.get_path(), vec![&from, &to]);
    }

    #[test]
    fn state_roundtrip_serialization(state in arbitrary_state()) {
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: CaptureState = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(state, deserialized);
    }

    #[test]
    fn history_roundtrip_serialization(
        events in prop::collection::vec(arbitrary_event(), 0..20)
    ) {
        let mut machine = CaptureStateMachine::new();
        for event in events {
            let _ = machine.transition(event);
        }

        let json = serde_json::to_string(machine.history()).unwrap();
        let deserialized: StateHistory = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(&deserialized, machine.history());
    }
}

//! The capture lifecycle state machine.

use super::error::InvalidTransition;
use super::history::{StateHistory, StateTransition};
use super::state::{CaptureEvent, CaptureState};
use super::table::TransitionTable;
use chrono::Utc;

/// Tracks the lifecycle state of one capture attempt.
///
/// The machine only moves along edges of its [`TransitionTable`]; any other
/// event is rejected and leaves the machine untouched. It is not meant to
/// be shared between threads while mutating: drive one machine per camera.
///
/// # Example
///
/// ```rust
/// use camshot::core::{CaptureEvent, CaptureState, CaptureStateMachine};
///
/// let mut machine = CaptureStateMachine::new();
/// machine.transition(CaptureEvent::StartConnect).unwrap();
/// machine.transition(CaptureEvent::ConnectFailure).unwrap();
/// assert!(machine.is_terminal());
///
/// assert!(machine.transition(CaptureEvent::StartCapture).is_err());
/// assert_eq!(machine.current_state(), CaptureState::Error);
/// ```
#[derive(Clone, Debug)]
pub struct CaptureStateMachine {
    current: CaptureState,
    table: &'static TransitionTable,
    history: StateHistory,
    attempt: usize,
}

impl Default for CaptureStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureStateMachine {
    /// Create a machine in `Disconnected` using the shared capture table.
    pub fn new() -> Self {
        Self::with_initial(CaptureState::Disconnected)
    }

    /// Create a machine starting from an arbitrary state.
    pub fn with_initial(initial: CaptureState) -> Self {
        Self {
            current: initial,
            table: TransitionTable::capture(),
            history: StateHistory::new(),
            attempt: 1,
        }
    }

    /// Apply `event` to the current state.
    ///
    /// Returns the new state, or [`InvalidTransition`] if the table has no
    /// edge for `(current, event)`. A rejected event changes nothing.
    pub fn transition(&mut self, event: CaptureEvent) -> Result<CaptureState, InvalidTransition> {
        let next = self
            .table
            .lookup(self.current, event)
            .ok_or(InvalidTransition {
                state: self.current,
                event,
            })?;

        if event == CaptureEvent::Retry {
            self.attempt += 1;
        }

        self.history = self.history.record(StateTransition {
            from: self.current,
            event,
            to: next,
            timestamp: Utc::now(),
            attempt: self.attempt,
        });
        self.current = next;
        Ok(next)
    }

    /// True exactly in `Completed` or `Error`.
    pub fn is_terminal(&self) -> bool {
        self.current.is_final()
    }

    pub fn current_state(&self) -> CaptureState {
        self.current
    }

    /// Check whether `event` is legal right now without applying it.
    pub fn can_handle(&self, event: CaptureEvent) -> bool {
        self.table.lookup(self.current, event).is_some()
    }

    /// Current attempt number, starting at 1 and bumped by each `Retry`.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn table(&self) -> &'static TransitionTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(events: &[CaptureEvent]) -> CaptureStateMachine {
        let mut machine = CaptureStateMachine::new();
        for event in events {
            machine.transition(*event).unwrap();
        }
        machine
    }

    #[test]
    fn starts_disconnected_and_not_terminal() {
        let machine = CaptureStateMachine::new();
        assert_eq!(machine.current_state(), CaptureState::Disconnected);
        assert!(!machine.is_terminal());
        assert!(machine.history().is_empty());
        assert_eq!(machine.attempt(), 1);
    }

    #[test]
    fn successful_path_reaches_completed() {
        let machine = drive(&[
            CaptureEvent::StartConnect,
            CaptureEvent::ConnectSuccess,
            CaptureEvent::StartAuth,
            CaptureEvent::AuthSuccess,
            CaptureEvent::StartCapture,
            CaptureEvent::CaptureSuccess,
        ]);

        assert_eq!(machine.current_state(), CaptureState::Completed);
        assert!(machine.is_terminal());
        assert_eq!(machine.history().transitions().len(), 6);
    }

    #[test]
    fn rejected_event_leaves_machine_untouched() {
        let mut machine = drive(&[CaptureEvent::StartConnect]);
        let before = machine.history().clone();

        let err = machine.transition(CaptureEvent::StartCapture).unwrap_err();

        assert_eq!(
            err,
            InvalidTransition {
                state: CaptureState::Connecting,
                event: CaptureEvent::StartCapture,
            }
        );
        assert_eq!(machine.current_state(), CaptureState::Connecting);
        assert_eq!(machine.history(), &before);
    }

    #[test]
    fn error_message_names_state_and_event() {
        let mut machine = CaptureStateMachine::new();
        let err = machine.transition(CaptureEvent::Reset).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot handle event 'Reset' in state 'Disconnected'"
        );
    }

    #[test]
    fn retry_recovers_and_bumps_attempt() {
        let machine = drive(&[
            CaptureEvent::StartConnect,
            CaptureEvent::ConnectFailure,
            CaptureEvent::Retry,
            CaptureEvent::StartConnect,
            CaptureEvent::ConnectSuccess,
        ]);

        assert_eq!(machine.current_state(), CaptureState::Connected);
        assert!(!machine.is_terminal());
        assert_eq!(machine.attempt(), 2);

        let attempts: Vec<_> = machine
            .history()
            .transitions()
            .iter()
            .map(|t| t.attempt)
            .collect();
        assert_eq!(attempts, vec![1, 1, 2, 2, 2]);
    }

    #[test]
    fn error_is_terminal_until_retry() {
        let mut machine = drive(&[CaptureEvent::StartConnect, CaptureEvent::ConnectFailure]);
        assert!(machine.is_terminal());

        machine.transition(CaptureEvent::Retry).unwrap();
        assert_eq!(machine.current_state(), CaptureState::Retrying);
        assert!(!machine.is_terminal());
    }

    #[test]
    fn can_handle_does_not_mutate() {
        let machine = CaptureStateMachine::new();
        assert!(machine.can_handle(CaptureEvent::StartConnect));
        assert!(!machine.can_handle(CaptureEvent::Retry));
        assert_eq!(machine.current_state(), CaptureState::Disconnected);
    }

    #[test]
    fn with_initial_starts_elsewhere() {
        let mut machine = CaptureStateMachine::with_initial(CaptureState::Completed);
        assert!(machine.is_terminal());
        assert_eq!(
            machine.transition(CaptureEvent::Reset),
            Ok(CaptureState::Disconnected)
        );
    }
}

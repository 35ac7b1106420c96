//! Transition history of a capture attempt.
//!
//! Provides immutable tracking of the state trajectory a machine has
//! walked, including which event caused each move.

use super::state::{CaptureEvent, CaptureState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single applied transition.
///
/// # Example
///
/// ```rust
/// use camshot::core::{CaptureEvent, CaptureState, StateTransition};
/// use chrono::Utc;
///
/// let step = StateTransition {
///     from: CaptureState::Disconnected,
///     event: CaptureEvent::StartConnect,
///     to: CaptureState::Connecting,
///     timestamp: Utc::now(),
///     attempt: 1,
/// };
/// assert_eq!(step.to, CaptureState::Connecting);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CaptureState,
    /// Event that caused the move
    pub event: CaptureEvent,
    pub to: CaptureState,
    /// Wall-clock time the move was applied
    pub timestamp: DateTime<Utc>,
    /// Connection attempt the transition belongs to (1-based)
    pub attempt: usize,
}

/// Ordered history of applied transitions.
///
/// History is immutable - `record` returns a new history with the
/// transition appended.
///
/// # Example
///
/// ```rust
/// use camshot::core::{CaptureEvent, CaptureState, StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let history = StateHistory::new().record(StateTransition {
///     from: CaptureState::Disconnected,
///     event: CaptureEvent::StartConnect,
///     to: CaptureState::Connecting,
///     timestamp: Utc::now(),
///     attempt: 1,
/// });
///
/// assert_eq!(
///     history.get_path(),
///     vec![&CaptureState::Disconnected, &CaptureState::Connecting]
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `transition`, producing a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transition: StateTransition) -> Self {
        Self {
            transitions: self
                .transitions
                .iter()
                .cloned()
                .chain(std::iter::once(transition))
                .collect(),
        }
    }

    /// States visited: the starting state, then each target in order.
    pub fn get_path(&self) -> Vec<&CaptureState> {
        self.transitions
            .first()
            .map(|t| &t.from)
            .into_iter()
            .chain(self.transitions.iter().map(|t| &t.to))
            .collect()
    }

    /// Events applied, in order.
    pub fn events(&self) -> Vec<CaptureEvent> {
        self.transitions.iter().map(|t| t.event).collect()
    }

    /// Time between the first and last transition.
    ///
    /// Returns `None` if nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        let first = self.transitions.first()?;
        let last = self.transitions.last()?;
        (last.timestamp - first.timestamp).to_std().ok()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(from: CaptureState, event: CaptureEvent, to: CaptureState) -> StateTransition {
        StateTransition {
            from,
            event,
            to,
            timestamp: Utc::now(),
            attempt: 1,
        }
    }

    #[test]
    fn empty_history_has_no_path() {
        let history = StateHistory::default();
        assert!(history.get_path().is_empty());
        assert_eq!(history.duration(), None);
    }

    #[test]
    fn record_leaves_original_untouched() {
        let empty = StateHistory::new();

        let recorded = empty.record(step(
            CaptureState::Disconnected,
            CaptureEvent::StartConnect,
            CaptureState::Connecting,
        ));

        assert!(empty.is_empty());
        assert_eq!(recorded.transitions().len(), 1);
    }

    #[test]
    fn get_path_and_events_follow_recording_order() {
        let history = StateHistory::new()
            .record(step(
                CaptureState::Disconnected,
                CaptureEvent::StartConnect,
                CaptureState::Connecting,
            ))
            .record(step(
                CaptureState::Connecting,
                CaptureEvent::ConnectFailure,
                CaptureState::Error,
            ));

        assert_eq!(
            history.get_path(),
            vec![
                &CaptureState::Disconnected,
                &CaptureState::Connecting,
                &CaptureState::Error
            ]
        );
        assert_eq!(
            history.events(),
            vec![CaptureEvent::StartConnect, CaptureEvent::ConnectFailure]
        );
    }

    #[test]
    fn duration_spans_first_to_last() {
        let history = StateHistory::new().record(step(
            CaptureState::Disconnected,
            CaptureEvent::StartConnect,
            CaptureState::Connecting,
        ));

        std::thread::sleep(Duration::from_millis(10));

        let history = history.record(step(
            CaptureState::Connecting,
            CaptureEvent::ConnectSuccess,
            CaptureState::Connected,
        ));

        assert!(history.duration().unwrap() >= Duration::from_millis(10));
    }

    #[test]
    fn history_round_trips_through_json() {
        let history = StateHistory::new().record(step(
            CaptureState::Error,
            CaptureEvent::Retry,
            CaptureState::Retrying,
        ));

        let encoded = serde_json::to_string(&history).unwrap();
        let decoded: StateHistory = serde_json::from_str(&encoded).unwrap();

        assert_eq!(history, decoded);
    }
}

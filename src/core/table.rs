//! The fixed table of legal lifecycle transitions.

use super::state::CaptureEvent as E;
use super::state::CaptureState as S;
use super::state::{CaptureEvent, CaptureState};

/// One legal edge: `(from, event) -> to`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Edge {
    pub from: CaptureState,
    pub event: CaptureEvent,
    pub to: CaptureState,
}

const fn edge(from: CaptureState, event: CaptureEvent, to: CaptureState) -> Edge {
    Edge { from, event, to }
}

static CAPTURE_EDGES: [Edge; 16] = [
    edge(S::Disconnected, E::StartConnect, S::Connecting),
    edge(S::Connecting, E::ConnectSuccess, S::Connected),
    edge(S::Connecting, E::ConnectFailure, S::Error),
    edge(S::Connected, E::StartAuth, S::Authenticating),
    edge(S::Connected, E::Reset, S::Disconnected),
    edge(S::Authenticating, E::AuthSuccess, S::Authenticated),
    edge(S::Authenticating, E::AuthFailure, S::Error),
    edge(S::Authenticated, E::StartCapture, S::Capturing),
    edge(S::Authenticated, E::Reset, S::Disconnected),
    edge(S::Capturing, E::CaptureSuccess, S::Completed),
    edge(S::Capturing, E::CaptureFailure, S::Error),
    edge(S::Completed, E::Reset, S::Disconnected),
    edge(S::Error, E::Retry, S::Retrying),
    edge(S::Error, E::Reset, S::Disconnected),
    edge(S::Retrying, E::StartConnect, S::Connecting),
    edge(S::Retrying, E::Reset, S::Disconnected),
];

static CAPTURE_TABLE: TransitionTable = TransitionTable {
    edges: &CAPTURE_EDGES,
};

/// Immutable mapping from `(state, event)` to the next state.
///
/// Any pair not listed is illegal. Nothing is inferred or defaulted, so
/// every reachable lifecycle path can be read straight off [`edges`].
///
/// [`edges`]: TransitionTable::edges
#[derive(Debug)]
pub struct TransitionTable {
    edges: &'static [Edge],
}

impl TransitionTable {
    /// The shared capture lifecycle table.
    pub fn capture() -> &'static TransitionTable {
        &CAPTURE_TABLE
    }

    /// Look up the target of `event` from `state`.
    pub fn lookup(&self, state: CaptureState, event: CaptureEvent) -> Option<CaptureState> {
        self.edges
            .iter()
            .find(|e| e.from == state && e.event == event)
            .map(|e| e.to)
    }

    /// Events with a legal transition out of `state`.
    pub fn events_from(&self, state: CaptureState) -> Vec<CaptureEvent> {
        self.edges
            .iter()
            .filter(|e| e.from == state)
            .map(|e| e.event)
            .collect()
    }

    pub fn edges(&self) -> &[Edge] {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_no_duplicate_pairs() {
        let table = TransitionTable::capture();
        let pairs: HashSet<_> = table.edges().iter().map(|e| (e.from, e.event)).collect();
        assert_eq!(pairs.len(), table.edges().len());
    }

    #[test]
    fn disconnected_only_accepts_start_connect() {
        let events = TransitionTable::capture().events_from(CaptureState::Disconnected);
        assert_eq!(events, vec![CaptureEvent::StartConnect]);
    }

    #[test]
    fn capturing_cannot_be_reset() {
        let table = TransitionTable::capture();
        assert_eq!(table.lookup(CaptureState::Capturing, CaptureEvent::Reset), None);
        assert_eq!(
            table.lookup(CaptureState::Capturing, CaptureEvent::CaptureSuccess),
            Some(CaptureState::Completed)
        );
    }

    #[test]
    fn reset_sources_match_lifecycle() {
        let sources: HashSet<_> = TransitionTable::capture()
            .edges()
            .iter()
            .filter(|e| e.event == CaptureEvent::Reset)
            .map(|e| e.from)
            .collect();

        let expected: HashSet<_> = [
            CaptureState::Connected,
            CaptureState::Authenticated,
            CaptureState::Completed,
            CaptureState::Error,
            CaptureState::Retrying,
        ]
        .into_iter()
        .collect();

        assert_eq!(sources, expected);
    }

    #[test]
    fn shared_table_is_a_single_instance() {
        assert!(std::ptr::eq(
            TransitionTable::capture(),
            TransitionTable::capture()
        ));
    }
}

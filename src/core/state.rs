//! Capture lifecycle states and the events that move between them.
//!
//! Both enums are plain values: inspecting them never has side effects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a capture attempt in its lifecycle.
///
/// # Example
///
/// ```rust
/// use camshot::core::CaptureState;
///
/// assert!(CaptureState::Completed.is_final());
/// assert!(CaptureState::Error.is_error());
/// assert!(!CaptureState::Retrying.is_final());
/// assert_eq!(CaptureState::Authenticating.name(), "Authenticating");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Disconnected,
    Connecting,
    Connected,
    Authenticating,
    Authenticated,
    Capturing,
    Completed,
    Error,
    Retrying,
}

impl CaptureState {
    /// Every state, in lifecycle order.
    pub const ALL: [CaptureState; 9] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Authenticating,
        Self::Authenticated,
        Self::Capturing,
        Self::Completed,
        Self::Error,
        Self::Retrying,
    ];

    /// Get the state's name for display/logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Authenticating => "Authenticating",
            Self::Authenticated => "Authenticated",
            Self::Capturing => "Capturing",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::Retrying => "Retrying",
        }
    }

    /// Check if this is a terminal state.
    ///
    /// Terminal states only move on through an explicit `Reset` or `Retry`.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Check if this is the error state.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that happened during a capture attempt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureEvent {
    StartConnect,
    ConnectSuccess,
    ConnectFailure,
    StartAuth,
    AuthSuccess,
    AuthFailure,
    StartCapture,
    CaptureSuccess,
    CaptureFailure,
    Retry,
    Reset,
}

impl CaptureEvent {
    /// Every event.
    pub const ALL: [CaptureEvent; 11] = [
        Self::StartConnect,
        Self::ConnectSuccess,
        Self::ConnectFailure,
        Self::StartAuth,
        Self::AuthSuccess,
        Self::AuthFailure,
        Self::StartCapture,
        Self::CaptureSuccess,
        Self::CaptureFailure,
        Self::Retry,
        Self::Reset,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::StartConnect => "StartConnect",
            Self::ConnectSuccess => "ConnectSuccess",
            Self::ConnectFailure => "ConnectFailure",
            Self::StartAuth => "StartAuth",
            Self::AuthSuccess => "AuthSuccess",
            Self::AuthFailure => "AuthFailure",
            Self::StartCapture => "StartCapture",
            Self::CaptureSuccess => "CaptureSuccess",
            Self::CaptureFailure => "CaptureFailure",
            Self::Retry => "Retry",
            Self::Reset => "Reset",
        }
    }

    /// True for the three `*Failure` events.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailure | Self::AuthFailure | Self::CaptureFailure
        )
    }
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_name_returns_correct_value() {
        assert_eq!(CaptureState::Disconnected.name(), "Disconnected");
        assert_eq!(CaptureState::Capturing.name(), "Capturing");
        assert_eq!(CaptureState::Retrying.name(), "Retrying");
        assert_eq!(CaptureState::Error.to_string(), "Error");
    }

    #[test]
    fn is_final_identifies_terminal_states() {
        let finals: Vec<_> = CaptureState::ALL
            .iter()
            .filter(|s| s.is_final())
            .collect();

        assert_eq!(finals, vec![&CaptureState::Completed, &CaptureState::Error]);
    }

    #[test]
    fn is_error_identifies_error_state() {
        assert!(CaptureState::Error.is_error());
        assert!(!CaptureState::Completed.is_error());
        assert!(!CaptureState::Retrying.is_error());
    }

    #[test]
    fn failure_events_are_flagged() {
        let failures: Vec<_> = CaptureEvent::ALL
            .iter()
            .filter(|e| e.is_failure())
            .copied()
            .collect();

        assert_eq!(
            failures,
            vec![
                CaptureEvent::ConnectFailure,
                CaptureEvent::AuthFailure,
                CaptureEvent::CaptureFailure
            ]
        );
    }

    #[test]
    fn state_serializes_as_snake_case() {
        let json = serde_json::to_string(&CaptureState::Authenticating).unwrap();
        assert_eq!(json, "\"authenticating\"");

        let event: CaptureEvent = serde_json::from_str("\"capture_success\"").unwrap();
        assert_eq!(event, CaptureEvent::CaptureSuccess);
    }
}

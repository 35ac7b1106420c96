//! Protocol-violation error raised by the state machine.

use super::state::{CaptureEvent, CaptureState};
use thiserror::Error;

/// An event was submitted that has no legal transition from the current
/// state. Always a defect in the driving code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid transition: cannot handle event '{event}' in state '{state}'")]
pub struct InvalidTransition {
    pub state: CaptureState,
    pub event: CaptureEvent,
}

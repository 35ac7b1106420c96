//! Capture lifecycle state machine.
//!
//! This module contains the pure core of the crate:
//! - `CaptureState` / `CaptureEvent` values
//! - the fixed `TransitionTable`
//! - `CaptureStateMachine`, which applies events against the table
//! - immutable transition history
//!
//! Nothing here performs I/O.

mod error;
mod history;
mod machine;
mod state;
mod table;

pub use error::InvalidTransition;
pub use history::{StateHistory, StateTransition};
pub use machine::CaptureStateMachine;
pub use state::{CaptureEvent, CaptureState};
pub use table::{Edge, TransitionTable};

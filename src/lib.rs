//! Camshot: single-frame capture from a network camera
//!
//! A capture attempt walks an explicit lifecycle, from `Disconnected`
//! through connect, authenticate and capture to `Completed` or `Error`.
//! The lifecycle lives in a pure state machine with a fixed transition
//! table; the orchestrator is the imperative shell that calls the camera,
//! stores the frame and reports a structured [`CaptureResult`].
//!
//! # Core Concepts
//!
//! - **State machine**: [`CaptureStateMachine`] only moves along legal edges
//! - **Provider**: a [`provider::ConnectionProvider`] owns the camera session
//! - **Persistence**: a [`persistence::Persistence`] validates and writes frames
//! - **Telemetry**: every transition and timing goes through [`telemetry::Telemetry`]
//!
//! # Example
//!
//! ```rust
//! use camshot::{CaptureEvent, CaptureState, CaptureStateMachine};
//!
//! let mut machine = CaptureStateMachine::new();
//! for event in [
//!     CaptureEvent::StartConnect,
//!     CaptureEvent::ConnectSuccess,
//!     CaptureEvent::StartAuth,
//!     CaptureEvent::AuthSuccess,
//!     CaptureEvent::StartCapture,
//!     CaptureEvent::CaptureSuccess,
//! ] {
//!     machine.transition(event).unwrap();
//! }
//!
//! assert_eq!(machine.current_state(), CaptureState::Completed);
//! assert_eq!(machine.history().get_path().len(), 7);
//! ```

pub mod config;
pub mod core;
pub mod orchestrator;
pub mod persistence;
pub mod provider;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, CameraConfig};
pub use crate::core::{CaptureEvent, CaptureState, CaptureStateMachine, InvalidTransition};
pub use orchestrator::{CaptureOrchestrator, CaptureResult, FailureStage};

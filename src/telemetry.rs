//! Structured logging for capture attempts.
//!
//! The orchestrator never logs directly. It reports [`TelemetryEvent`]s to
//! a [`Telemetry`] implementation handed to it at construction, so tests
//! can observe exactly what was reported without a global subscriber.
//! [`TracingTelemetry`] forwards events to `tracing`.

use crate::config::LoggingConfig;
use crate::core::{CaptureEvent, CaptureState};
use crate::orchestrator::FailureStage;
use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Something worth reporting during a capture attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum TelemetryEvent {
    AttemptStarted {
        camera_id: String,
        attempt: usize,
    },
    Transition {
        from: CaptureState,
        event: CaptureEvent,
        to: CaptureState,
    },
    /// An external call finished after `elapsed`.
    Timing {
        operation: &'static str,
        elapsed: Duration,
    },
    StageFailed {
        stage: FailureStage,
        message: String,
    },
    AttemptFinished {
        success: bool,
        final_state: CaptureState,
        elapsed: Duration,
    },
    RetryScheduled {
        attempt: usize,
        delay: Duration,
    },
}

/// Sink for [`TelemetryEvent`]s.
pub trait Telemetry {
    fn record(&self, event: TelemetryEvent);
}

/// Run `f`, then report how long it took under `operation`.
pub fn timed<T, F>(telemetry: &dyn Telemetry, operation: &'static str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let started = Instant::now();
    let output = f();
    telemetry.record(TelemetryEvent::Timing {
        operation,
        elapsed: started.elapsed(),
    });
    output
}

/// Forwards events to `tracing`, tagged with the camera id.
#[derive(Clone, Debug)]
pub struct TracingTelemetry {
    camera_id: String,
}

impl TracingTelemetry {
    pub fn new(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
        }
    }
}

impl Telemetry for TracingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        let camera_id = self.camera_id.as_str();
        match event {
            TelemetryEvent::AttemptStarted { attempt, .. } => {
                tracing::info!(camera_id, attempt, "Starting capture attempt");
            }
            TelemetryEvent::Transition { from, event, to } => {
                tracing::debug!(
                    camera_id,
                    from = from.name(),
                    event = event.name(),
                    to = to.name(),
                    "State transition"
                );
            }
            TelemetryEvent::Timing { operation, elapsed } => {
                tracing::info!(
                    camera_id,
                    operation,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Performance"
                );
            }
            TelemetryEvent::StageFailed { stage, message } => {
                tracing::error!(camera_id, stage = stage.name(), %message, "Capture stage failed");
            }
            TelemetryEvent::AttemptFinished {
                success,
                final_state,
                elapsed,
            } => {
                let elapsed_ms = elapsed.as_millis() as u64;
                if success {
                    tracing::info!(camera_id, %final_state, elapsed_ms, "Capture succeeded");
                } else {
                    tracing::warn!(camera_id, %final_state, elapsed_ms, "Capture failed");
                }
            }
            TelemetryEvent::RetryScheduled { attempt, delay } => {
                tracing::info!(
                    camera_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying capture"
                );
            }
        }
    }
}

/// Keeps every event in memory; handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: RefCell<Vec<TelemetryEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.borrow().clone()
    }

    /// Names of the timed operations, in order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Timing { operation, .. } => Some(*operation),
                _ => None,
            })
            .collect()
    }

    pub fn transitions(&self) -> Vec<(CaptureState, CaptureEvent, CaptureState)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Transition { from, event, to } => Some((*from, *event, *to)),
                _ => None,
            })
            .collect()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] std::io::Error),

    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}

/// Install the global `tracing` subscriber for the binary.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to
/// stderr and, when configured, are appended to a file as well.
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), TelemetryError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()));

    let file_layer = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_reports_operation_and_passes_output_through() {
        let telemetry = MemoryTelemetry::new();

        let value = timed(&telemetry, "connect", || {
            std::thread::sleep(Duration::from_millis(5));
            42
        });

        assert_eq!(value, 42);
        match telemetry.events().as_slice() {
            [TelemetryEvent::Timing { operation, elapsed }] => {
                assert_eq!(*operation, "connect");
                assert!(*elapsed >= Duration::from_millis(5));
            }
            other => panic!("Expected one timing event, got {:?}", other),
        }
    }

    #[test]
    fn memory_telemetry_filters_by_kind() {
        let telemetry = MemoryTelemetry::new();
        telemetry.record(TelemetryEvent::Transition {
            from: CaptureState::Disconnected,
            event: CaptureEvent::StartConnect,
            to: CaptureState::Connecting,
        });
        timed(&telemetry, "disconnect", || ());

        assert_eq!(telemetry.operations(), vec!["disconnect"]);
        assert_eq!(
            telemetry.transitions(),
            vec![(
                CaptureState::Disconnected,
                CaptureEvent::StartConnect,
                CaptureState::Connecting
            )]
        );
    }

    #[test]
    fn tracing_telemetry_accepts_every_event() {
        let telemetry = TracingTelemetry::new("cam1");
        telemetry.record(TelemetryEvent::StageFailed {
            stage: FailureStage::Capture,
            message: "empty frame".to_string(),
        });
        telemetry.record(TelemetryEvent::AttemptFinished {
            success: false,
            final_state: CaptureState::Error,
            elapsed: Duration::from_millis(12),
        });
    }
}

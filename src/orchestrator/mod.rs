//! Drives one capture attempt through the lifecycle state machine.
//!
//! The orchestrator is the imperative shell around the pure core: it calls
//! the connection provider and the persistence layer, turns each outcome
//! into a [`CaptureEvent`], and applies it to its [`CaptureStateMachine`].
//!
//! Transport, capture and storage failures end up in the returned
//! [`CaptureResult`]. Only an [`InvalidTransition`] escapes `run`, and that
//! always means the driving sequence itself is wrong.

mod guard;
mod result;
pub mod retry;

pub use guard::ConnectionGuard;
pub use result::{CaptureResult, FailureStage, ImageInfo};
pub use retry::{run_with_retries, RetryPolicy};

use crate::config::CameraConfig;
use crate::core::{CaptureEvent, CaptureState, CaptureStateMachine, InvalidTransition};
use crate::persistence::{Persistence, SavedImage};
use crate::provider::{AuthStatus, ConnectionProvider, FrameError};
use crate::telemetry::{timed, Telemetry, TelemetryEvent};
use std::time::Instant;

enum Outcome {
    Saved(SavedImage),
    Failed { stage: FailureStage, message: String },
}

/// Applies events to the machine and reports each move.
struct Driver<'a> {
    machine: &'a mut CaptureStateMachine,
    telemetry: &'a dyn Telemetry,
}

impl Driver<'_> {
    fn emit(&mut self, event: CaptureEvent) -> Result<CaptureState, InvalidTransition> {
        let from = self.machine.current_state();
        let to = self.machine.transition(event)?;
        self.telemetry.record(TelemetryEvent::Transition { from, event, to });
        Ok(to)
    }

    /// Emit a failure event and describe what went wrong.
    fn fail(
        &mut self,
        event: Option<CaptureEvent>,
        stage: FailureStage,
        message: String,
    ) -> Result<Outcome, InvalidTransition> {
        if let Some(event) = event {
            self.emit(event)?;
        }
        self.telemetry.record(TelemetryEvent::StageFailed {
            stage,
            message: message.clone(),
        });
        Ok(Outcome::Failed { stage, message })
    }
}

/// Sequences connect, authenticate, capture and save for one camera.
///
/// # Example
///
/// ```rust,no_run
/// use camshot::config::CameraConfig;
/// use camshot::orchestrator::CaptureOrchestrator;
/// use camshot::persistence::ImageStore;
/// use camshot::provider::RtspProvider;
/// use camshot::telemetry::TracingTelemetry;
/// use camshot::config::ImageFormat;
///
/// let config = CameraConfig::new("192.168.1.64", "front-door");
/// let mut orchestrator = CaptureOrchestrator::new(
///     config.clone(),
///     RtspProvider::new(config),
///     ImageStore::new("output", ImageFormat::Jpg),
///     TracingTelemetry::new("front-door"),
/// );
///
/// let result = orchestrator.run().expect("lifecycle sequencing is fixed");
/// println!("success: {}", result.success);
/// ```
pub struct CaptureOrchestrator<P, S, T> {
    config: CameraConfig,
    provider: P,
    persistence: S,
    telemetry: T,
    machine: CaptureStateMachine,
}

impl<P, S, T> CaptureOrchestrator<P, S, T>
where
    P: ConnectionProvider,
    S: Persistence,
    T: Telemetry,
{
    pub fn new(config: CameraConfig, provider: P, persistence: S, telemetry: T) -> Self {
        Self {
            config,
            provider,
            persistence,
            telemetry,
            machine: CaptureStateMachine::new(),
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn machine(&self) -> &CaptureStateMachine {
        &self.machine
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn persistence(&self) -> &S {
        &self.persistence
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    /// Move an errored machine to `Retrying` so `run` can start again.
    pub fn retry(&mut self) -> Result<CaptureState, InvalidTransition> {
        self.driver().emit(CaptureEvent::Retry)
    }

    /// Return the machine to `Disconnected`.
    pub fn reset(&mut self) -> Result<CaptureState, InvalidTransition> {
        self.driver().emit(CaptureEvent::Reset)
    }

    fn driver(&mut self) -> Driver<'_> {
        Driver {
            machine: &mut self.machine,
            telemetry: &self.telemetry,
        }
    }

    /// Run one capture attempt from `Disconnected` or `Retrying`.
    ///
    /// The provider is disconnected before this returns, whatever the
    /// outcome.
    pub fn run(&mut self) -> Result<CaptureResult, InvalidTransition> {
        let started = Instant::now();
        let Self {
            config,
            provider,
            persistence,
            telemetry,
            machine,
        } = self;
        let telemetry: &dyn Telemetry = &*telemetry;
        let camera_id = config.camera_id.as_str();

        telemetry.record(TelemetryEvent::AttemptStarted {
            camera_id: camera_id.to_string(),
            attempt: machine.attempt(),
        });

        let outcome = {
            let mut session = ConnectionGuard::new(provider, telemetry);
            let mut driver = Driver {
                machine: &mut *machine,
                telemetry,
            };
            drive(&mut driver, &mut session, persistence, camera_id)?
        };

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let final_state = machine.current_state();
        let attempts = machine.attempt();

        let result = match outcome {
            Outcome::Saved(saved) => CaptureResult::succeeded(
                camera_id,
                saved.into(),
                final_state,
                attempts,
                elapsed_ms,
            ),
            Outcome::Failed { stage, message } => CaptureResult::failed(
                camera_id,
                stage,
                message,
                final_state,
                attempts,
                elapsed_ms,
            ),
        };

        telemetry.record(TelemetryEvent::AttemptFinished {
            success: result.success,
            final_state,
            elapsed,
        });

        Ok(result)
    }
}

fn drive<P, S>(
    driver: &mut Driver<'_>,
    session: &mut ConnectionGuard<'_, P>,
    persistence: &mut S,
    camera_id: &str,
) -> Result<Outcome, InvalidTransition>
where
    P: ConnectionProvider,
    S: Persistence,
{
    let telemetry = driver.telemetry;

    driver.emit(CaptureEvent::StartConnect)?;
    let ready = match timed(telemetry, "connect", || session.connect()) {
        Ok(ready) => {
            driver.emit(CaptureEvent::ConnectSuccess)?;
            ready
        }
        Err(e) => {
            return driver.fail(
                Some(CaptureEvent::ConnectFailure),
                FailureStage::Connection,
                format!("Connection failed: {}", e),
            );
        }
    };

    // Any challenge was answered during connect; only its verdict is
    // applied here.
    driver.emit(CaptureEvent::StartAuth)?;
    if ready.auth == AuthStatus::Rejected {
        return driver.fail(
            Some(CaptureEvent::AuthFailure),
            FailureStage::Authentication,
            "Authentication failed: camera requires credentials that were not accepted"
                .to_string(),
        );
    }
    driver.emit(CaptureEvent::AuthSuccess)?;

    driver.emit(CaptureEvent::StartCapture)?;
    let frame = match timed(telemetry, "capture_frame", || session.capture_frame()) {
        Ok(frame) if !frame.is_empty() => frame,
        Ok(_) => {
            return driver.fail(
                Some(CaptureEvent::CaptureFailure),
                FailureStage::Capture,
                format!("Capture failed: {}", FrameError::EmptyFrame),
            );
        }
        // The stream itself refused the credentials: the machine can only
        // fail from Capturing, but the cause is authentication.
        Err(e @ FrameError::Unauthorized) => {
            return driver.fail(
                Some(CaptureEvent::CaptureFailure),
                FailureStage::Authentication,
                format!("Authentication failed: {}", e),
            );
        }
        Err(e) => {
            return driver.fail(
                Some(CaptureEvent::CaptureFailure),
                FailureStage::Capture,
                format!("Capture failed: {}", e),
            );
        }
    };
    driver.emit(CaptureEvent::CaptureSuccess)?;

    // The machine is Completed from here on; storage problems are reported
    // against the persistence stage only.
    if !timed(telemetry, "validate", || persistence.validate(&frame)) {
        return driver.fail(
            None,
            FailureStage::Persistence,
            format!(
                "Persistence failed: captured frame ({} bytes) is not a valid image",
                frame.len()
            ),
        );
    }

    match timed(telemetry, "save", || persistence.save(&frame, camera_id)) {
        Ok(saved) => Ok(Outcome::Saved(saved)),
        Err(e) => driver.fail(
            None,
            FailureStage::Persistence,
            format!("Persistence failed: {}", e),
        ),
    }
}

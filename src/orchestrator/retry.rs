//! Caller-driven retries.
//!
//! The orchestrator never loops on its own. This wrapper re-drives the
//! same machine through `Error -> Retrying -> Connecting` for failures that
//! might be transient, up to the configured number of retries.

use super::{CaptureOrchestrator, CaptureResult};
use crate::config::AppConfig;
use crate::core::InvalidTransition;
use crate::persistence::Persistence;
use crate::provider::ConnectionProvider;
use crate::telemetry::{Telemetry, TelemetryEvent};
use std::thread;
use std::time::Duration;

/// How many times to retry and how long to wait in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.camera.retry_count, config.retry_delay())
    }
}

/// Run attempts until one succeeds, fails for a non-transient reason, or
/// the retry budget is spent. Returns the last attempt's result.
pub fn run_with_retries<P, S, T>(
    orchestrator: &mut CaptureOrchestrator<P, S, T>,
    policy: &RetryPolicy,
) -> Result<CaptureResult, InvalidTransition>
where
    P: ConnectionProvider,
    S: Persistence,
    T: Telemetry,
{
    let mut result = orchestrator.run()?;
    let mut retries = 0;

    while result.is_retryable() && retries < policy.max_retries {
        retries += 1;
        orchestrator.retry()?;
        orchestrator.telemetry().record(TelemetryEvent::RetryScheduled {
            attempt: orchestrator.machine().attempt(),
            delay: policy.delay,
        });

        if !policy.delay.is_zero() {
            thread::sleep(policy.delay);
        }
        result = orchestrator.run()?;
    }

    Ok(result)
}

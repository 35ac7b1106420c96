//! Outcome record of a capture attempt.

use crate::core::CaptureState;
use crate::persistence::SavedImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Stage at which an attempt gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Connection,
    Authentication,
    Capture,
    /// A frame was captured but could not be validated or stored.
    Persistence,
}

impl FailureStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Capture => "capture",
            Self::Persistence => "persistence",
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection | Self::Capture)
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata about a stored image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub timestamp: DateTime<Utc>,
    pub file_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Image format, e.g. "JPEG"
    pub format: String,
    pub width: u32,
    pub height: u32,
}

impl From<SavedImage> for ImageInfo {
    fn from(saved: SavedImage) -> Self {
        Self {
            timestamp: saved.timestamp,
            file_path: saved.path,
            size: saved.size,
            format: saved.format.name().to_string(),
            width: saved.width,
            height: saved.height,
        }
    }
}

/// Structured summary of one capture attempt. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub attempt_id: Uuid,
    pub camera_id: String,
    pub success: bool,
    pub image_info: Option<ImageInfo>,
    pub error_message: Option<String>,
    pub failure_stage: Option<FailureStage>,
    pub final_state: CaptureState,
    /// Connection attempts made, including retries
    pub attempts: usize,
    pub execution_time_ms: f64,
}

impl CaptureResult {
    pub(crate) fn succeeded(
        camera_id: &str,
        image: ImageInfo,
        final_state: CaptureState,
        attempts: usize,
        execution_time_ms: f64,
    ) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            camera_id: camera_id.to_string(),
            success: true,
            image_info: Some(image),
            error_message: None,
            failure_stage: None,
            final_state,
            attempts,
            execution_time_ms,
        }
    }

    pub(crate) fn failed(
        camera_id: &str,
        stage: FailureStage,
        message: String,
        final_state: CaptureState,
        attempts: usize,
        execution_time_ms: f64,
    ) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            camera_id: camera_id.to_string(),
            success: false,
            image_info: None,
            error_message: Some(message),
            failure_stage: Some(stage),
            final_state,
            attempts,
            execution_time_ms,
        }
    }

    /// True when the failure is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !self.success && self.failure_stage.is_some_and(|stage| stage.is_transient())
    }
}

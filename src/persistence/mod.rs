//! Frame validation and storage.

mod image_store;

pub use image_store::ImageStore;

use crate::config::ImageFormat;
use crate::provider::FrameBuffer;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Where and how a frame was written.
#[derive(Clone, Debug, PartialEq)]
pub struct SavedImage {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub timestamp: DateTime<Utc>,
}

/// Errors that can occur while writing a frame
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Frame is not a decodable image: {0}")]
    InvalidFrame(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Validates frames and writes them to storage.
pub trait Persistence {
    /// Check that `frame` holds a usable image.
    fn validate(&self, frame: &FrameBuffer) -> bool;

    /// Store `frame`. `destination_hint` names the source (the camera id)
    /// and is folded into the stored name.
    fn save(
        &mut self,
        frame: &FrameBuffer,
        destination_hint: &str,
    ) -> Result<SavedImage, SaveError>;
}

//! Camera transport capability.
//!
//! A [`ConnectionProvider`] owns the network session to the camera. The
//! orchestrator only sees outcomes: a [`Ready`] session or a
//! [`ConnectError`], a [`FrameBuffer`] or a [`FrameError`].

mod auth;
mod rtsp;

pub use auth::Challenge;

pub use rtsp::{RtspProvider, RtspResponse};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the camera handled authentication during `connect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// The camera did not ask for credentials.
    NotRequired,
    /// The camera challenged and accepted the configured credentials.
    Accepted,
    /// The challenge could not be answered during connect; the decoder
    /// presents the credentials from the stream URL instead.
    Deferred,
    /// The camera explicitly refused access.
    Rejected,
}

/// A live session returned by a successful connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ready {
    pub auth: AuthStatus,
    /// Server banner or a description of the endpoint, if any.
    pub server: Option<String>,
}

impl Ready {
    pub fn new(auth: AuthStatus) -> Self {
        Self { auth, server: None }
    }
}

/// Raw encoded bytes of a single frame as produced by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for FrameBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// Transport failures while opening a session
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Camera unreachable at {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Connection to {address} timed out")]
    Timeout { address: String },

    #[error("Stream unavailable: {0}")]
    Protocol(String),

    #[error("Connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while pulling a frame from an open session
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Not connected to the stream")]
    NotConnected,

    #[error("Stream returned an empty frame")]
    EmptyFrame,

    #[error("Camera rejected the stream credentials")]
    Unauthorized,

    #[error("Frame read timed out after {0}s")]
    Timeout(u64),

    #[error("Decoder failed: {0}")]
    Decoder(String),

    #[error("Frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens and closes the camera session and hands out frames.
pub trait ConnectionProvider {
    /// Open the session, verifying the camera is alive.
    fn connect(&mut self) -> Result<Ready, ConnectError>;

    /// Grab one frame from the open session.
    fn capture_frame(&mut self) -> Result<FrameBuffer, FrameError>;

    /// Release the session. Must be idempotent and never fail.
    fn disconnect(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_buffer_reports_emptiness() {
        assert!(FrameBuffer::default().is_empty());

        let frame = FrameBuffer::from(vec![0xff, 0xd8, 0xff]);
        assert!(!frame.is_empty());
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.as_bytes()[0], 0xff);
    }

    #[test]
    fn errors_render_readable_messages() {
        let err = ConnectError::Timeout {
            address: "10.0.0.1:554".to_string(),
        };
        assert_eq!(err.to_string(), "Connection to 10.0.0.1:554 timed out");
        assert_eq!(FrameError::Timeout(10).to_string(), "Frame read timed out after 10s");
    }
}

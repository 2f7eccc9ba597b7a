//! PONG Detection Trait
//!
//! Provides a trait for detecting PONG responses in the inbound frame stream.
//! Detected PONGs feed the liveness tracker and are never handed to the
//! application.

use crate::frame::Frame;

/// Trait for detecting PONG responses in the frame stream
///
/// # Example
///
/// ```rust,ignore
/// use livesocket::{Frame, PongDetector};
///
/// struct JsonTypePong;
///
/// impl PongDetector for JsonTypePong {
///     fn is_pong(&self, frame: &Frame) -> bool {
///         frame.as_text().map_or(false, |t| t.contains("\"type\":\"pong\""))
///     }
/// }
/// ```
pub trait PongDetector: Send + Sync {
    /// Returns true if the frame is a PONG and must be swallowed
    fn is_pong(&self, frame: &Frame) -> bool;
}

/// Exact payload PONG detector
///
/// A frame matches only when its byte length equals the configured payload
/// length and every byte is equal. Prefixes and near misses are application
/// frames. Frame kind is ignored: a binary frame carrying the pong bytes is a
/// pong too.
#[derive(Debug, Clone)]
pub struct ExactPongDetector {
    payload: Vec<u8>,
}

impl ExactPongDetector {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl PongDetector for ExactPongDetector {
    #[inline]
    fn is_pong(&self, frame: &Frame) -> bool {
        let bytes = frame.as_bytes();
        bytes.len() == self.payload.len() && bytes == self.payload.as_slice()
    }
}

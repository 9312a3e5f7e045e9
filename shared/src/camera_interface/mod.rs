//! Camera collaborator interface.
//!
//! The rig never talks to camera hardware directly. Anything that can hand
//! back the most recent frame implements [`Camera`]; the tracker resolves one
//! by name at construction and passes its frames to the vision service.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors reported by a camera implementation.
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    /// The capture call itself failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The device is gone or not yet opened
    #[error("Camera disconnected: {0}")]
    Disconnected(String),
}

/// One captured image as delivered by the camera.
///
/// The payload is opaque to this workspace: it is only forwarded to the
/// vision service, which knows how to decode it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoding of `data`, e.g. `"image/jpeg"`
    pub mime_type: String,
    /// Encoded image bytes
    pub data: Bytes,
    /// Monotonic frame counter assigned by the camera
    pub sequence: u64,
}

impl Frame {
    /// Frame with no payload, useful for cameras backed by a simulator.
    pub fn empty(width: u32, height: u32, sequence: u64) -> Self {
        Self {
            width,
            height,
            mime_type: String::new(),
            data: Bytes::new(),
            sequence,
        }
    }
}

/// Source of camera frames.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Resource name this camera was registered under.
    fn name(&self) -> &str;

    /// Capture (or dequeue) the next frame.
    async fn get_image(&self) -> Result<Frame, CameraError>;
}

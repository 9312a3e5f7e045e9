//! Vision service collaborator interface.

use async_trait::async_trait;
use thiserror::Error;

use crate::camera_interface::Frame;
use crate::detection::Detection;

/// Errors reported by a vision service.
#[derive(Debug, Clone, Error)]
pub enum VisionError {
    /// The detector backend rejected or failed the request
    #[error("Vision backend error: {0}")]
    Backend(String),

    /// The frame could not be decoded by the detector
    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(String),
}

/// Object detector that turns a frame into labelled detections.
///
/// Implementations report coordinates normalized to the frame, see
/// [`crate::detection`].
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Resource name this service was registered under.
    fn name(&self) -> &str;

    /// Run detection on `frame`.
    async fn get_detections(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;
}

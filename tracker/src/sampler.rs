//! Detection sampling: one actionable target per tick.
//!
//! Each sample grabs a frame from the camera (after flushing frames buffered
//! while the rig was moving), runs the vision service on it and reduces the
//! result to at most one [`Detection`]:
//!
//! 1. keep detections whose label equals the configured label exactly
//! 2. drop those below the confidence threshold
//! 3. pick the highest confidence, then the largest box area, then the
//!    earliest in the detector's output order

use std::sync::Arc;
use std::time::Duration;

use shared::{Camera, Detection, VisionService};
use thiserror::Error;
use tracing::{debug, warn};

/// Frames discarded before the one that is actually run through detection.
///
/// Cameras queue a few frames internally; after the rig moves those show
/// the old pose.
pub const DEFAULT_STALE_FRAMES: usize = 3;

/// Default bound on each camera or vision call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Transient failures while sampling. The tracking loop treats both as
/// "nothing detected this tick".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("Camera {camera} unavailable: {reason}")]
    CameraUnavailable { camera: String, reason: String },

    #[error("Vision service {vision} unavailable: {reason}")]
    VisionUnavailable { vision: String, reason: String },
}

/// Select the best detection for `label` at or above `confidence_level`.
///
/// Ties on confidence go to the larger box; ties on both keep the earlier
/// detection.
pub fn select_best<'a>(
    detections: &'a [Detection],
    label: &str,
    confidence_level: f64,
) -> Option<&'a Detection> {
    let mut best: Option<&Detection> = None;

    for detection in detections {
        if detection.label != label || detection.confidence < confidence_level {
            continue;
        }
        if let Err(e) = detection.validate() {
            warn!("Ignoring malformed {} detection: {}", detection.label, e);
            continue;
        }

        best = match best {
            None => Some(detection),
            Some(current) => {
                let better = detection.confidence > current.confidence
                    || (detection.confidence == current.confidence
                        && detection.area() > current.area());
                if better {
                    Some(detection)
                } else {
                    Some(current)
                }
            }
        };
    }

    best
}

/// Turns camera frames into at most one actionable detection.
pub struct DetectionSampler {
    camera: Arc<dyn Camera>,
    vision: Arc<dyn VisionService>,
    object_label: String,
    confidence_level: f64,
    stale_frames: usize,
    timeout: Duration,
}

impl DetectionSampler {
    pub fn new(
        camera: Arc<dyn Camera>,
        vision: Arc<dyn VisionService>,
        object_label: impl Into<String>,
        confidence_level: f64,
    ) -> Self {
        Self {
            camera,
            vision,
            object_label: object_label.into(),
            confidence_level,
            stale_frames: DEFAULT_STALE_FRAMES,
            timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Number of frames flushed before each sample.
    pub fn with_stale_frames(mut self, stale_frames: usize) -> Self {
        self.stale_frames = stale_frames;
        self
    }

    /// Bound on each camera and vision call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn object_label(&self) -> &str {
        &self.object_label
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    fn camera_error(&self, reason: impl ToString) -> SampleError {
        SampleError::CameraUnavailable {
            camera: self.camera.name().to_string(),
            reason: reason.to_string(),
        }
    }

    fn vision_error(&self, reason: impl ToString) -> SampleError {
        SampleError::VisionUnavailable {
            vision: self.vision.name().to_string(),
            reason: reason.to_string(),
        }
    }

    async fn grab_frame(&self) -> Result<shared::Frame, SampleError> {
        match tokio::time::timeout(self.timeout, self.camera.get_image()).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(e)) => Err(self.camera_error(e)),
            Err(_) => Err(self.camera_error(format!("no frame within {:?}", self.timeout))),
        }
    }

    /// Sample the current best detection.
    ///
    /// Returns `Ok(None)` when nothing matches the label and threshold.
    pub async fn sample(&self) -> Result<Option<Detection>, SampleError> {
        for _ in 0..self.stale_frames {
            self.grab_frame().await?;
        }
        let frame = self.grab_frame().await?;

        let detections =
            match tokio::time::timeout(self.timeout, self.vision.get_detections(&frame)).await {
                Ok(Ok(detections)) => detections,
                Ok(Err(e)) => return Err(self.vision_error(e)),
                Err(_) => {
                    return Err(self.vision_error(format!("no answer within {:?}", self.timeout)))
                }
            };

        let best = select_best(&detections, &self.object_label, self.confidence_level).cloned();
        match &best {
            Some(d) => debug!(
                "Frame {}: {} at {:.2} confidence out of {} detections",
                frame.sequence,
                d.label,
                d.confidence,
                detections.len()
            ),
            None => debug!(
                "Frame {}: no {} found in {} detections",
                frame.sequence,
                self.object_label,
                detections.len()
            ),
        }
        Ok(best)
    }
}

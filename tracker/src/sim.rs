//! Simulated camera and vision services.
//!
//! [`SimulatedCamera`] produces empty numbered frames. [`StaticVision`]
//! answers every frame with a scripted detection list. [`SimulatedScene`]
//! closes the loop for the `track_sim` binary: it reads the simulated pan
//! and tilt servo angles and reports where a moving target appears in the
//! camera's field of view.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use hardware::sim::SimulatedServo;
use shared::{BoundingBox, Camera, CameraError, Detection, Frame, VisionError, VisionService};
use tokio::time::Instant;

/// Resolution of simulated frames.
pub const FRAME_SIZE: (u32, u32) = (640, 480);

/// Camera that hands out empty frames with increasing sequence numbers.
pub struct SimulatedCamera {
    name: String,
    sequence: AtomicU64,
    disconnected: AtomicBool,
    frame_delay: Mutex<Duration>,
}

impl SimulatedCamera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: AtomicU64::new(0),
            disconnected: AtomicBool::new(false),
            frame_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Frames handed out so far.
    pub fn frames_served(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    /// Time each capture takes, like a camera running at a low frame rate.
    pub fn set_frame_delay(&self, delay: Duration) {
        *self.frame_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }
}

#[async_trait]
impl Camera for SimulatedCamera {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_image(&self) -> Result<Frame, CameraError> {
        let delay = *self.frame_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(CameraError::Disconnected(format!("{} unplugged", self.name)));
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::empty(FRAME_SIZE.0, FRAME_SIZE.1, sequence))
    }
}

struct Script {
    detections: Vec<Detection>,
    failing: bool,
    calls: usize,
}

/// Vision service returning a scripted detection list.
pub struct StaticVision {
    name: String,
    script: Mutex<Script>,
}

impl StaticVision {
    pub fn new(name: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(Script {
                detections,
                failing: false,
                calls: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the detections returned from now on.
    pub fn set_detections(&self, detections: Vec<Detection>) {
        self.lock().detections = detections;
    }

    /// Fail every call until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Number of `get_detections` calls, failed ones included.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }
}

#[async_trait]
impl VisionService for StaticVision {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_detections(&self, _frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let mut script = self.lock();
        script.calls += 1;
        if script.failing {
            return Err(VisionError::Backend("injected fault".to_string()));
        }
        Ok(script.detections.clone())
    }
}

/// Parameters of the simulated scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneParams {
    /// Label reported for the target
    pub label: String,
    /// Horizontal field of view in degrees
    pub fov_h_deg: f64,
    /// Vertical field of view in degrees
    pub fov_v_deg: f64,
    /// Target position at rest, as (pan, tilt) in degrees
    pub target_home_deg: (f64, f64),
    /// Half-width of the target's horizontal sweep in degrees
    pub sweep_deg: f64,
    /// Peak target speed in degrees per second; zero holds it still
    pub target_speed_dps: f64,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            label: "Person".to_string(),
            fov_h_deg: 60.0,
            fov_v_deg: 45.0,
            target_home_deg: (110.0, 80.0),
            sweep_deg: 20.0,
            target_speed_dps: 10.0,
        }
    }
}

/// Vision service over a simulated world seen through the pan/tilt servos.
///
/// Alongside the target every frame also carries a dog and a faint person,
/// which the tracker is expected to ignore.
pub struct SimulatedScene {
    name: String,
    pan: Arc<SimulatedServo>,
    tilt: Arc<SimulatedServo>,
    params: SceneParams,
    epoch: Instant,
}

impl SimulatedScene {
    pub fn new(
        name: impl Into<String>,
        pan: Arc<SimulatedServo>,
        tilt: Arc<SimulatedServo>,
        params: SceneParams,
    ) -> Self {
        Self {
            name: name.into(),
            pan,
            tilt,
            params,
            epoch: Instant::now(),
        }
    }

    /// Target position at the current instant, as (pan, tilt) in degrees.
    pub fn target_deg(&self) -> (f64, f64) {
        let (home_pan, home_tilt) = self.params.target_home_deg;
        if self.params.sweep_deg <= 0.0 || self.params.target_speed_dps <= 0.0 {
            return (home_pan, home_tilt);
        }
        // Sinusoidal sweep whose peak angular speed is target_speed_dps.
        let omega = self.params.target_speed_dps / self.params.sweep_deg;
        let t = self.epoch.elapsed().as_secs_f64();
        (home_pan + self.params.sweep_deg * (omega * t % TAU).sin(), home_tilt)
    }

    /// Target centroid in normalized frame coordinates.
    ///
    /// Pointing the camera past the target moves it toward the far side of
    /// the frame, so negative pan power brings a right-of-center target back.
    pub fn target_in_frame(&self) -> (f64, f64) {
        let (target_pan, target_tilt) = self.target_deg();
        let x = 0.5 + (self.pan.angle_deg() - target_pan) / self.params.fov_h_deg;
        let y = 0.5 + (self.tilt.angle_deg() - target_tilt) / self.params.fov_v_deg;
        (x, y)
    }

    fn visible(cx: f64, cy: f64, width: f64, height: f64) -> Option<BoundingBox> {
        BoundingBox::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
        .ok()
    }
}

#[async_trait]
impl VisionService for SimulatedScene {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_detections(&self, _frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let mut detections = vec![
            Detection {
                label: "Dog".to_string(),
                confidence: 0.97,
                bbox: BoundingBox::centered(0.15, 0.8, 0.2, 0.15),
            },
            Detection {
                label: self.params.label.clone(),
                confidence: 0.3,
                bbox: BoundingBox::centered(0.85, 0.2, 0.1, 0.2),
            },
        ];

        let (x, y) = self.target_in_frame();
        if let Some(bbox) = Self::visible(x, y, 0.12, 0.3) {
            detections.push(Detection {
                label: self.params.label.clone(),
                confidence: 0.88,
                bbox,
            });
        }
        Ok(detections)
    }
}

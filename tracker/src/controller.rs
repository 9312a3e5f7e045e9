//! Tracking controller: Idle/Running lifecycle around the control loop.
//!
//! # States
//!
//! ```text
//!            start()                stop()
//!   Idle ─────────────▶ Running ─────────────▶ Idle
//!    ▲  (spawns loop)      │  (cancels loop, joins it, stops base)
//!    └─────────────────────┘
//! ```
//!
//! Both transitions are idempotent. A single mutex guards the state and the
//! handle of the running loop, so a racing pair of `start()` calls spawns
//! exactly one loop and `stop()` observes whatever loop is current.
//!
//! # Loop
//!
//! Every tick the loop samples a detection and drives the base:
//!
//! - no detection (or a camera/vision failure): `base.stop()`
//! - detection inside the deadband: zero power
//! - otherwise: the proportional correction from [`crate::control`]
//!
//! Base failures are logged and counted; they never end the loop. Stopping
//! interrupts the tick sleep and any camera or vision read in progress; a
//! base command already sent runs to completion, so stop latency is bounded
//! by that one command.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hardware::MovementBase;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::control::{correction, ControlParams};
use crate::error::TrackerResult;
use crate::sampler::DetectionSampler;

/// Lifecycle state of a tracking controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum TrackerState {
    /// No loop running; the base has been stopped
    Idle,
    /// Control loop active
    Running,
}

/// Counters accumulated across every run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    /// Ticks executed
    pub ticks: u64,
    /// Ticks that found an actionable detection
    pub detections: u64,
    /// Ticks where the camera or vision service failed
    pub vision_failures: u64,
    /// Base commands that failed
    pub command_failures: u64,
}

#[derive(Default)]
struct LoopCounters {
    ticks: AtomicU64,
    detections: AtomicU64,
    vision_failures: AtomicU64,
    command_failures: AtomicU64,
}

impl LoopCounters {
    fn snapshot(&self) -> TrackerStats {
        TrackerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            vision_failures: self.vision_failures.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
        }
    }
}

struct ActiveLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Lifecycle {
    state: TrackerState,
    active: Option<ActiveLoop>,
}

/// The control loop body, owned by the spawned task.
struct TrackingLoop {
    name: String,
    base: Arc<dyn MovementBase>,
    sampler: Arc<DetectionSampler>,
    params: ControlParams,
    counters: Arc<LoopCounters>,
    cancel: CancellationToken,
}

impl TrackingLoop {
    async fn run(self) {
        info!("{}: tracking loop started", self.name);

        let mut interval = tokio::time::interval(self.params.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            if self.cancel.is_cancelled() {
                break;
            }
            self.tick().await;
        }

        info!("{}: tracking loop exited", self.name);
    }

    async fn tick(&self) {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        // Camera and vision reads are abandoned on stop; only base commands
        // run to completion.
        let sampled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            sampled = self.sampler.sample() => sampled,
        };
        let detection = match sampled {
            Ok(detection) => detection,
            Err(e) => {
                self.counters.vision_failures.fetch_add(1, Ordering::Relaxed);
                warn!("{}: {}", self.name, e);
                None
            }
        };

        if self.cancel.is_cancelled() {
            return;
        }

        let result = match detection {
            None => {
                debug!(
                    "{}: no {} found, holding position",
                    self.name,
                    self.sampler.object_label()
                );
                self.base.stop().await
            }
            Some(detection) => {
                self.counters.detections.fetch_add(1, Ordering::Relaxed);
                let c = correction(&detection, &self.params);
                debug!(
                    "{}: error=({:+.3}, {:+.3}) pan={:+.3} tilt={:+.3}{}",
                    self.name,
                    c.error_x,
                    c.error_y,
                    c.pan.power(),
                    c.tilt.power(),
                    if c.is_centered() { " (centered)" } else { "" }
                );
                let (linear, angular) = c.power_vectors();
                self.base.set_power(linear, angular).await
            }
        };

        if let Err(e) = result {
            self.counters.command_failures.fetch_add(1, Ordering::Relaxed);
            warn!("{}: base command failed, skipping tick: {}", self.name, e);
        }
    }
}

/// Drives a base to keep the sampled detection centered in frame.
pub struct TrackingController {
    name: String,
    base: Arc<dyn MovementBase>,
    sampler: Arc<DetectionSampler>,
    params: ControlParams,
    counters: Arc<LoopCounters>,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
}

impl TrackingController {
    /// Build an idle controller. [`from_config`](Self::from_config) builds one
    /// from configuration and honours `auto_start`.
    pub fn new(
        name: impl Into<String>,
        base: Arc<dyn MovementBase>,
        sampler: DetectionSampler,
        params: ControlParams,
    ) -> Self {
        Self {
            name: name.into(),
            base,
            sampler: Arc::new(sampler),
            params,
            counters: Arc::new(LoopCounters::default()),
            lifecycle: tokio::sync::Mutex::new(Lifecycle {
                state: TrackerState::Idle,
                active: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> TrackerState {
        self.lifecycle.lock().await.state
    }

    /// Loop counters since construction.
    pub fn stats(&self) -> TrackerStats {
        self.counters.snapshot()
    }

    /// Enter Running, spawning the control loop unless one is already active.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> TrackerResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(active) = &lifecycle.active {
            if !active.task.is_finished() {
                debug!("{}: start requested while already running", self.name);
                return Ok(());
            }
            warn!("{}: previous loop ended unexpectedly, restarting", self.name);
        }

        let cancel = CancellationToken::new();
        let worker = TrackingLoop {
            name: self.name.clone(),
            base: self.base.clone(),
            sampler: self.sampler.clone(),
            params: self.params.clone(),
            counters: self.counters.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        lifecycle.active = Some(ActiveLoop { cancel, task });
        lifecycle.state = TrackerState::Running;
        info!(
            "{}: tracking {} (confidence >= {:.2})",
            self.name,
            self.sampler.object_label(),
            self.sampler.confidence_level()
        );
        Ok(())
    }

    /// Enter Idle: cancel and join the loop, then stop the base.
    ///
    /// The base is stopped even when the controller was already idle. A base
    /// failure is returned to the caller; the controller is Idle regardless.
    pub async fn stop(&self) -> TrackerResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(active) = lifecycle.active.take() {
            active.cancel.cancel();
            if let Err(e) = active.task.await {
                error!("{}: tracking loop ended abnormally: {}", self.name, e);
            }
            info!("{}: tracking stopped", self.name);
        }
        lifecycle.state = TrackerState::Idle;

        self.base.stop().await?;
        Ok(())
    }

    /// Release the controller; equivalent to [`stop`](Self::stop).
    pub async fn close(&self) -> TrackerResult<()> {
        self.stop().await
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        if let Some(active) = self.lifecycle.get_mut().active.take() {
            active.cancel.cancel();
            active.task.abort();
        }
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::{SimulatedCamera, StaticVision};
    use hardware::sim::SimulatedServo;
    use hardware::BaseEmulator;
    use shared::{BoundingBox, Detection};
    use std::time::Duration;

    fn controller(detections: Vec<Detection>) -> (TrackingController, Arc<SimulatedServo>) {
        let pan = Arc::new(SimulatedServo::new("pan"));
        let tilt = Arc::new(SimulatedServo::new("tilt"));
        let base = Arc::new(BaseEmulator::new("rig", pan.clone(), tilt));
        let sampler = DetectionSampler::new(
            Arc::new(SimulatedCamera::new("cam")),
            Arc::new(StaticVision::new("detector", detections)),
            "Person",
            0.55,
        );
        (
            TrackingController::new("tracker", base, sampler, ControlParams::default()),
            pan,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_is_idle() {
        let (controller, pan) = controller(vec![]);
        assert_eq!(controller.state().await, TrackerState::Idle);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(controller.stats(), TrackerStats::default());
        assert!(pan.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop() {
        let detection =
            Detection::new("Person", 0.9, BoundingBox::centered(0.8, 0.5, 0.1, 0.2)).unwrap();
        let (controller, pan) = controller(vec![detection]);

        controller.start().await.unwrap();
        assert_eq!(controller.state().await, TrackerState::Running);
        tokio::time::sleep(Duration::from_millis(250)).await;

        controller.stop().await.unwrap();
        assert_eq!(controller.state().await, TrackerState::Idle);

        let stats = controller.stats();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.detections, 3);
        assert!(pan.commands()[0] < 0.0);
        assert_eq!(pan.last_power(), Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_still_stops_base() {
        let (controller, pan) = controller(vec![]);
        controller.stop().await.unwrap();
        controller.stop().await.unwrap();
        assert_eq!(controller.state().await, TrackerState::Idle);
        assert_eq!(pan.commands(), vec![0.0, 0.0]);
    }
}

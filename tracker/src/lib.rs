//! Object tracking service for the pan-tilt camera rig.
//!
//! A [`TrackingController`] samples detections from a camera and vision
//! service, computes a proportional correction and drives a
//! [`MovementBase`](hardware::MovementBase) so the chosen target stays
//! centered in frame.
//!
//! - [`sampler`] - frame capture and best-detection selection
//! - [`control`] - the proportional control law and its tunables
//! - [`controller`] - Idle/Running lifecycle and the control loop
//! - [`command`] - the `start`/`stop` command surface
//! - [`dependencies`] - named-resource resolution and construction from config
//! - [`sim`] - simulated camera, vision and scene
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hardware::sim::SimulatedServo;
//! use hardware::BaseEmulator;
//! use shared::TrackerConfig;
//! use tracker::sim::{SimulatedCamera, StaticVision};
//! use tracker::{CommandDispatcher, ControlParams, Dependencies, TrackingController};
//!
//! # async fn run() -> Result<(), tracker::TrackerError> {
//! let pan = Arc::new(SimulatedServo::new("pan"));
//! let tilt = Arc::new(SimulatedServo::new("tilt"));
//! let deps = Dependencies::new()
//!     .with_base(Arc::new(BaseEmulator::new("rig", pan, tilt)))
//!     .with_camera(Arc::new(SimulatedCamera::new("cam")))
//!     .with_vision(Arc::new(StaticVision::new("detector", vec![])));
//!
//! let config = TrackerConfig::new("rig", "cam", "detector");
//! let controller =
//!     TrackingController::from_config("tracker", &config, &deps, ControlParams::default())
//!         .await?;
//!
//! let dispatcher = CommandDispatcher::new(Arc::new(controller));
//! dispatcher.do_command(&serde_json::json!({"start": {}})).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod control;
pub mod controller;
pub mod dependencies;
pub mod error;
pub mod sampler;

#[cfg(feature = "sim")]
pub mod sim;

pub use command::{Command, CommandDispatcher};
pub use control::{correction, ControlParams, Correction};
pub use controller::{TrackerState, TrackerStats, TrackingController};
pub use dependencies::{base_from_config, Dependencies};
pub use error::{ComponentKind, TrackerError, TrackerResult};
pub use sampler::{select_best, DetectionSampler, SampleError};

//! Shared components for the pan-tilt camera rig.
//!
//! This crate holds the pieces every other crate in the workspace agrees on:
//!
//! - [`vector`] - the `Vector3` power vector used by the base capability
//! - [`detection`] - normalized bounding boxes and labelled detections
//! - [`camera_interface`] - the [`Camera`](camera_interface::Camera) collaborator and its frames
//! - [`vision`] - the [`VisionService`](vision::VisionService) collaborator
//! - [`config`] - attribute parsing for the `base-control` and `tracker` models

pub mod camera_interface;
pub mod config;
pub mod detection;
pub mod vector;
pub mod vision;

pub use camera_interface::{Camera, CameraError, Frame};
pub use config::{BaseControlConfig, ConfigError, TrackerConfig};
pub use detection::{BoundingBox, Detection, DetectionError};
pub use vector::Vector3;
pub use vision::{VisionError, VisionService};

//! Hardware layer of the pan-tilt camera rig.
//!
//! This crate turns two independent servos into a directional-movement base.
//!
//! - [`servo`] - the [`ServoDriver`](servo::ServoDriver) seam and the
//!   per-axis [`AxisActuator`](servo::AxisActuator)
//! - [`base`] - the [`MovementBase`](base::MovementBase) capability and the
//!   [`BaseEmulator`](base::BaseEmulator) that implements it over pan/tilt
//! - [`sim`] - a simulated servo for tests and the simulator binary
//!
//! # Features
//!
//! - `sim` (default) - simulated servo driver

pub mod base;
pub mod servo;

#[cfg(feature = "sim")]
pub mod sim;

pub use base::{BaseEmulator, BaseError, BaseMethod, BaseState, MovementBase};
pub use servo::{Axis, AxisActuator, AxisCommand, ServoCommandError, ServoDriver};

//! Servo axes of the pan-tilt rig.
//!
//! # Overview
//!
//! The rig is two hobby servos on a bracket: one rotates the camera
//! horizontally (pan), the other vertically (tilt). Each servo is reached
//! through a [`ServoDriver`], which is whatever actually speaks to the
//! hardware: a PWM board, a GPIO pin, a remote robot API. This module does
//! not care which.
//!
//! An [`AxisActuator`] binds one driver to one [`Axis`] and is the only thing
//! allowed to command it. It:
//!
//! - rejects power outside `[-1, 1]` before anything reaches the driver
//! - bounds every driver call with a timeout so a hung servo cannot wedge
//!   the caller
//! - logs each command at trace level with the axis name
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hardware::servo::{Axis, AxisActuator, AxisCommand};
//! use hardware::sim::SimulatedServo;
//!
//! # tokio_test::block_on(async {
//! let servo = Arc::new(SimulatedServo::new("pan-servo"));
//! let pan = AxisActuator::new(Axis::Pan, servo.clone());
//!
//! pan.send(AxisCommand::new(Axis::Pan, 0.5)?).await?;
//! assert_eq!(servo.last_power(), Some(0.5));
//! # Ok::<(), hardware::servo::ServoCommandError>(())
//! # }).unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::trace;

/// Default bound on a single driver call.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Axis of the pan-tilt bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    /// Horizontal rotation
    Pan,
    /// Vertical rotation
    Tilt,
}

/// Errors from commanding a servo.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServoCommandError {
    /// Power was NaN or outside `[-1, 1]`.
    #[error("Power {power} for {axis} axis outside [-1, 1]")]
    PowerOutOfRange { axis: Axis, power: f64 },

    /// A command addressed to one axis was sent to the other axis' actuator.
    #[error("Command for {command} axis sent to {actuator} actuator")]
    WrongAxis { actuator: Axis, command: Axis },

    /// The driver reported a failure.
    #[error("Servo {servo} rejected command: {reason}")]
    Rejected { servo: String, reason: String },

    /// The driver did not answer in time.
    #[error("Servo {servo} did not respond within {timeout:?}")]
    Timeout { servo: String, timeout: Duration },
}

/// Result type for servo operations.
pub type ServoResult<T> = Result<T, ServoCommandError>;

/// A single bounded power command for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCommand {
    axis: Axis,
    power: f64,
}

impl AxisCommand {
    /// Validate a caller-supplied power.
    pub fn new(axis: Axis, power: f64) -> ServoResult<Self> {
        if !power.is_finite() || !(-1.0..=1.0).contains(&power) {
            return Err(ServoCommandError::PowerOutOfRange { axis, power });
        }
        Ok(Self { axis, power })
    }

    /// Build a command from an internally computed power, clamping it into range.
    ///
    /// NaN maps to zero.
    pub fn clamped(axis: Axis, power: f64) -> Self {
        let power = if power.is_nan() {
            0.0
        } else {
            power.clamp(-1.0, 1.0)
        };
        Self { axis, power }
    }

    /// Zero power on `axis`.
    pub fn halt(axis: Axis) -> Self {
        Self { axis, power: 0.0 }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn power(&self) -> f64 {
        self.power
    }
}

/// Low-level servo driver.
///
/// Implemented by whatever owns the physical servo. Power is a signed
/// fraction of full speed in `[-1, 1]`; the actuator guarantees that range.
#[async_trait]
pub trait ServoDriver: Send + Sync {
    /// Resource name of the servo.
    fn name(&self) -> &str;

    /// Drive the servo at `power`.
    async fn set_power(&self, power: f64) -> ServoResult<()>;
}

/// One axis of the rig bound to its servo driver.
pub struct AxisActuator {
    axis: Axis,
    driver: Arc<dyn ServoDriver>,
    timeout: Duration,
}

impl AxisActuator {
    /// Bind `driver` to `axis` with the default command timeout.
    pub fn new(axis: Axis, driver: Arc<dyn ServoDriver>) -> Self {
        Self {
            axis,
            driver,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Override the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Name of the underlying servo.
    pub fn servo_name(&self) -> &str {
        self.driver.name()
    }

    /// Issue `command` to the servo.
    ///
    /// # Errors
    ///
    /// [`ServoCommandError::WrongAxis`] if the command targets the other axis,
    /// [`ServoCommandError::Timeout`] if the driver does not answer within the
    /// timeout, or whatever the driver itself reports.
    pub async fn send(&self, command: AxisCommand) -> ServoResult<()> {
        if command.axis != self.axis {
            return Err(ServoCommandError::WrongAxis {
                actuator: self.axis,
                command: command.axis,
            });
        }

        trace!(
            "{} axis ({}) <- power {:.3}",
            self.axis,
            self.driver.name(),
            command.power
        );

        match tokio::time::timeout(self.timeout, self.driver.set_power(command.power)).await {
            Ok(result) => result,
            Err(_) => Err(ServoCommandError::Timeout {
                servo: self.driver.name().to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

impl std::fmt::Debug for AxisActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisActuator")
            .field("axis", &self.axis)
            .field("servo", &self.driver.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::SimulatedServo;
    use strum::IntoEnumIterator;

    #[test]
    fn test_axis_display() {
        let names: Vec<String> = Axis::iter().map(|a| a.to_string()).collect();
        assert_eq!(names, vec!["pan", "tilt"]);
    }

    #[test]
    fn test_command_range() {
        assert!(AxisCommand::new(Axis::Pan, 1.0).is_ok());
        assert!(AxisCommand::new(Axis::Pan, -1.0).is_ok());
        assert!(matches!(
            AxisCommand::new(Axis::Tilt, 1.01),
            Err(ServoCommandError::PowerOutOfRange {
                axis: Axis::Tilt,
                ..
            })
        ));
        assert!(AxisCommand::new(Axis::Tilt, f64::NAN).is_err());
    }

    #[test]
    fn test_clamped_command() {
        assert_eq!(AxisCommand::clamped(Axis::Pan, 3.0).power(), 1.0);
        assert_eq!(AxisCommand::clamped(Axis::Pan, -3.0).power(), -1.0);
        assert_eq!(AxisCommand::clamped(Axis::Pan, f64::NAN).power(), 0.0);
        assert_eq!(AxisCommand::clamped(Axis::Pan, 0.25).power(), 0.25);
    }

    #[tokio::test]
    async fn test_send_reaches_driver() {
        let servo = Arc::new(SimulatedServo::new("tilt-servo"));
        let tilt = AxisActuator::new(Axis::Tilt, servo.clone());

        tilt.send(AxisCommand::new(Axis::Tilt, -0.4).unwrap())
            .await
            .unwrap();
        assert_eq!(servo.commands(), vec![-0.4]);
    }

    #[tokio::test]
    async fn test_wrong_axis_is_rejected() {
        let servo = Arc::new(SimulatedServo::new("tilt-servo"));
        let tilt = AxisActuator::new(Axis::Tilt, servo.clone());

        let err = tilt.send(AxisCommand::halt(Axis::Pan)).await.unwrap_err();
        assert_eq!(
            err,
            ServoCommandError::WrongAxis {
                actuator: Axis::Tilt,
                command: Axis::Pan
            }
        );
        assert!(servo.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_driver_times_out() {
        let servo = Arc::new(SimulatedServo::new("pan-servo"));
        servo.set_response_delay(Duration::from_secs(60));
        let pan = AxisActuator::new(Axis::Pan, servo).with_timeout(Duration::from_millis(50));

        let err = pan.send(AxisCommand::halt(Axis::Pan)).await.unwrap_err();
        assert!(matches!(err, ServoCommandError::Timeout { .. }));
    }
}

//! Proportional control law for centering a detection.
//!
//! The error on each axis is the offset of the detection centroid from the
//! frame center, in normalized units, so it lies in `[-0.5, 0.5]`:
//!
//! ```text
//! error_x = centroid.x - 0.5      (positive: target right of center)
//! error_y = centroid.y - 0.5      (positive: target below center)
//! ```
//!
//! Power is `-gain * error` per axis, clamped to `[-1, 1]`. The negative
//! sign matches the rig's mounting: the camera rides on the servos facing
//! out, so a target right of center needs negative pan power to come back
//! to the middle. With the default gain of 2.0 a target on the frame edge
//! maps to full power.
//!
//! When both errors are inside the deadband the target counts as centered
//! and the correction is zero on both axes.

use std::time::Duration;

use hardware::{Axis, AxisCommand};
use shared::config::ConfigError;
use shared::{Detection, Vector3};

use crate::sampler::DEFAULT_IO_TIMEOUT;

/// Default proportional gain on both axes.
pub const DEFAULT_GAIN: f64 = 2.0;

/// Default half-width of the centered region, in normalized frame units.
pub const DEFAULT_DEADBAND: f64 = 0.05;

/// Default control loop period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Tunables of the tracking loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlParams {
    /// Proportional gain on horizontal error
    pub gain_pan: f64,
    /// Proportional gain on vertical error
    pub gain_tilt: f64,
    /// Errors below this on both axes count as centered
    pub deadband: f64,
    /// Loop period
    pub tick_interval: Duration,
    /// Bound on each camera and vision call, and on servo commands of bases
    /// built with [`base_from_config`](crate::base_from_config)
    pub io_timeout: Duration,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            gain_pan: DEFAULT_GAIN,
            gain_tilt: DEFAULT_GAIN,
            deadband: DEFAULT_DEADBAND,
            tick_interval: DEFAULT_TICK_INTERVAL,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

impl ControlParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, gain) in [("gain_pan", self.gain_pan), ("gain_tilt", self.gain_tilt)] {
            if !gain.is_finite() || gain <= 0.0 {
                return Err(ConfigError::InvalidAttribute {
                    name,
                    reason: format!("{gain} must be finite and positive"),
                });
            }
        }
        if !(0.0..0.5).contains(&self.deadband) {
            return Err(ConfigError::InvalidAttribute {
                name: "deadband",
                reason: format!("{} is outside [0, 0.5)", self.deadband),
            });
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidAttribute {
                name: "tick_interval",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.io_timeout.is_zero() {
            return Err(ConfigError::InvalidAttribute {
                name: "io_timeout",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-tick output of the control law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub error_x: f64,
    pub error_y: f64,
    pub pan: AxisCommand,
    pub tilt: AxisCommand,
}

impl Correction {
    /// True when the target sits inside the deadband.
    pub fn is_centered(&self) -> bool {
        self.pan.power() == 0.0 && self.tilt.power() == 0.0
    }

    /// Base power vectors: tilt on `linear.y`, pan on `angular.z`.
    pub fn power_vectors(&self) -> (Vector3, Vector3) {
        (
            Vector3::with_y(self.tilt.power()),
            Vector3::with_z(self.pan.power()),
        )
    }
}

/// Compute the corrective power that moves `detection` toward frame center.
pub fn correction(detection: &Detection, params: &ControlParams) -> Correction {
    let (cx, cy) = detection.centroid();
    let error_x = cx - 0.5;
    let error_y = cy - 0.5;

    if error_x.abs() < params.deadband && error_y.abs() < params.deadband {
        return Correction {
            error_x,
            error_y,
            pan: AxisCommand::halt(Axis::Pan),
            tilt: AxisCommand::halt(Axis::Tilt),
        };
    }

    Correction {
        error_x,
        error_y,
        pan: AxisCommand::clamped(Axis::Pan, -params.gain_pan * error_x),
        tilt: AxisCommand::clamped(Axis::Tilt, -params.gain_tilt * error_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shared::BoundingBox;

    fn at(cx: f64, cy: f64) -> Detection {
        Detection::new("Person", 0.9, BoundingBox::centered(cx, cy, 0.1, 0.1)).unwrap()
    }

    #[test]
    fn test_centered_target_gives_zero_power() {
        let c = correction(&at(0.5, 0.5), &ControlParams::default());
        assert!(c.is_centered());
        assert_eq!(c.power_vectors(), (Vector3::ZERO, Vector3::ZERO));
    }

    #[test]
    fn test_inside_deadband_gives_zero_power() {
        let c = correction(&at(0.53, 0.47), &ControlParams::default());
        assert!(c.is_centered());
    }

    #[test]
    fn test_one_axis_outside_deadband_drives_both_axes() {
        let c = correction(&at(0.7, 0.52), &ControlParams::default());
        assert!(!c.is_centered());
        assert_relative_eq!(c.pan.power(), -0.4, epsilon = 1e-9);
        assert_relative_eq!(c.tilt.power(), -0.04, epsilon = 1e-9);
    }

    #[test]
    fn test_right_of_center_drives_negative_pan() {
        let c = correction(&at(0.9, 0.5), &ControlParams::default());
        assert_relative_eq!(c.error_x, 0.4, epsilon = 1e-9);
        assert!(c.pan.power() < 0.0);
        assert!(c.pan.power().abs() <= 1.0);
        assert!(c.tilt.power().abs() < 1e-12);

        let (linear, angular) = c.power_vectors();
        assert!(linear.y.abs() < 1e-12);
        assert_relative_eq!(angular.z, -0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_below_center_drives_negative_tilt() {
        let c = correction(&at(0.5, 0.8), &ControlParams::default());
        assert!(c.tilt.power() < 0.0);
        assert!(c.pan.power().abs() < 1e-12);
    }

    #[test]
    fn test_power_is_clamped() {
        let params = ControlParams {
            gain_pan: 10.0,
            gain_tilt: 10.0,
            ..Default::default()
        };
        let c = correction(&at(0.95, 0.05), &params);
        assert_eq!(c.pan.power(), -1.0);
        assert_eq!(c.tilt.power(), 1.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(ControlParams::default().validate().is_ok());
        let bad_gain = ControlParams {
            gain_tilt: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_gain.validate(),
            Err(ConfigError::InvalidAttribute {
                name: "gain_tilt",
                ..
            })
        ));
        let bad_tick = ControlParams {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(bad_tick.validate().is_err());
    }
}

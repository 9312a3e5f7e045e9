//! Pan-tilt rig presented as a directional-movement base.
//!
//! # Overview
//!
//! A mobile base takes a linear and an angular power vector. The
//! [`BaseEmulator`] maps that onto the two servos of the rig:
//!
//! | input        | axis |
//! |--------------|------|
//! | `linear.y`   | tilt |
//! | `angular.z`  | pan  |
//! | `linear.x`   | pan, only when `angular.z` is zero |
//!
//! The emulator implements only `set_power`, `stop` and `is_moving` from the
//! base capability. Everything else is listed in [`BaseMethod`] and answers
//! [`BaseError::NotImplemented`].
//!
//! # Moving state
//!
//! `is_moving` is true iff the last successful command left at least one
//! axis at non-zero power. The state is only written after both axis
//! commands have completed, so a reader never sees a half-applied command;
//! if either axis fails the previous state is kept and the error returned.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hardware::base::{BaseEmulator, MovementBase};
//! use hardware::sim::SimulatedServo;
//! use shared::Vector3;
//!
//! # tokio_test::block_on(async {
//! let base = BaseEmulator::new(
//!     "rig",
//!     Arc::new(SimulatedServo::new("pan")),
//!     Arc::new(SimulatedServo::new("tilt")),
//! );
//!
//! base.set_power(Vector3::with_y(0.3), Vector3::with_z(-0.2)).await?;
//! assert!(base.is_moving().await?);
//!
//! base.stop().await?;
//! assert!(!base.is_moving().await?);
//! # Ok::<(), hardware::base::BaseError>(())
//! # }).unwrap();
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::Vector3;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::servo::{Axis, AxisActuator, AxisCommand, ServoCommandError, ServoDriver};

/// Methods of the directional-movement base capability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BaseMethod {
    MoveStraight,
    Spin,
    SetPower,
    SetVelocity,
    Stop,
    IsMoving,
    GetProperties,
    GetGeometries,
    DoCommand,
}

impl BaseMethod {
    /// Methods the pan-tilt emulator actually implements.
    pub const SUPPORTED: [BaseMethod; 3] =
        [BaseMethod::SetPower, BaseMethod::Stop, BaseMethod::IsMoving];

    pub fn is_supported(self) -> bool {
        Self::SUPPORTED.contains(&self)
    }
}

/// Which power component fed an axis, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PowerComponent {
    #[strum(serialize = "linear.x")]
    LinearX,
    #[strum(serialize = "linear.y")]
    LinearY,
    #[strum(serialize = "angular.z")]
    AngularZ,
}

/// Errors from the base capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BaseError {
    /// Caller asked for power outside `[-1, 1]`; nothing was sent.
    #[error("Invalid power {value} for {component}: must be within [-1, 1]")]
    InvalidPower {
        component: PowerComponent,
        value: f64,
    },

    /// An axis command failed; moving state is unchanged.
    #[error("{axis} axis unavailable: {source}")]
    ComponentUnavailable {
        axis: Axis,
        #[source]
        source: ServoCommandError,
    },

    /// The method is outside the supported subset.
    #[error("`{0}` is not implemented")]
    NotImplemented(BaseMethod),
}

/// Result type for base operations.
pub type BaseResult<T> = Result<T, BaseError>;

/// Cached moving state of the base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseState {
    pub is_moving: bool,
    pub last_pan_power: f64,
    pub last_tilt_power: f64,
}

/// Static properties of a base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseProperties {
    pub width_meters: f64,
    pub turning_radius_meters: f64,
    pub wheel_circumference_meters: f64,
}

/// A named piece of base geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub label: String,
    pub center: Vector3,
}

/// Directional-movement base capability.
///
/// Only `set_power`, `stop` and `is_moving` are required; every other method
/// defaults to [`BaseError::NotImplemented`].
#[async_trait]
pub trait MovementBase: Send + Sync {
    /// Resource name of the base.
    fn name(&self) -> &str;

    async fn set_power(&self, linear: Vector3, angular: Vector3) -> BaseResult<()>;

    async fn stop(&self) -> BaseResult<()>;

    async fn is_moving(&self) -> BaseResult<bool>;

    async fn move_straight(&self, _distance_mm: i64, _mm_per_sec: f64) -> BaseResult<()> {
        unsupported(self.name(), BaseMethod::MoveStraight)
    }

    async fn spin(&self, _angle_deg: f64, _deg_per_sec: f64) -> BaseResult<()> {
        unsupported(self.name(), BaseMethod::Spin)
    }

    async fn set_velocity(&self, _linear: Vector3, _angular: Vector3) -> BaseResult<()> {
        unsupported(self.name(), BaseMethod::SetVelocity)
    }

    async fn get_properties(&self) -> BaseResult<BaseProperties> {
        unsupported(self.name(), BaseMethod::GetProperties)
    }

    async fn get_geometries(&self) -> BaseResult<Vec<Geometry>> {
        unsupported(self.name(), BaseMethod::GetGeometries)
    }

    async fn do_command(&self, _command: Value) -> BaseResult<Value> {
        unsupported(self.name(), BaseMethod::DoCommand)
    }
}

fn unsupported<T>(base: &str, method: BaseMethod) -> BaseResult<T> {
    error!("{base}: `{method}` is not implemented");
    Err(BaseError::NotImplemented(method))
}

fn checked(component: PowerComponent, value: f64) -> BaseResult<f64> {
    if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
        return Err(BaseError::InvalidPower { component, value });
    }
    Ok(value)
}

/// Pan/tilt servos behind the directional-movement base capability.
pub struct BaseEmulator {
    name: String,
    pan: AxisActuator,
    tilt: AxisActuator,
    /// Serializes commands so state updates follow command order.
    command_lock: tokio::sync::Mutex<()>,
    state: Mutex<BaseState>,
}

impl BaseEmulator {
    /// Build an emulator over two servo drivers.
    pub fn new(
        name: impl Into<String>,
        pan: Arc<dyn ServoDriver>,
        tilt: Arc<dyn ServoDriver>,
    ) -> Self {
        Self::assemble(
            name.into(),
            AxisActuator::new(Axis::Pan, pan),
            AxisActuator::new(Axis::Tilt, tilt),
        )
    }

    /// Build an emulator from pre-configured actuators.
    ///
    /// # Errors
    ///
    /// [`BaseError::ComponentUnavailable`] wrapping
    /// [`ServoCommandError::WrongAxis`] if an actuator is bound to the wrong
    /// axis.
    pub fn from_actuators(
        name: impl Into<String>,
        pan: AxisActuator,
        tilt: AxisActuator,
    ) -> BaseResult<Self> {
        for (expected, actuator) in [(Axis::Pan, &pan), (Axis::Tilt, &tilt)] {
            if actuator.axis() != expected {
                return Err(BaseError::ComponentUnavailable {
                    axis: expected,
                    source: ServoCommandError::WrongAxis {
                        actuator: actuator.axis(),
                        command: expected,
                    },
                });
            }
        }
        Ok(Self::assemble(name.into(), pan, tilt))
    }

    fn assemble(name: String, pan: AxisActuator, tilt: AxisActuator) -> Self {
        info!(
            "Base {} emulated over pan={} tilt={}",
            name,
            pan.servo_name(),
            tilt.servo_name()
        );
        Self {
            name,
            pan,
            tilt,
            command_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(BaseState::default()),
        }
    }

    /// Set the same per-command timeout on both axes.
    pub fn with_command_timeout(self, timeout: Duration) -> Self {
        let Self {
            name,
            pan,
            tilt,
            command_lock,
            state,
        } = self;
        Self {
            name,
            pan: pan.with_timeout(timeout),
            tilt: tilt.with_timeout(timeout),
            command_lock,
            state,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cached state.
    pub fn state(&self) -> BaseState {
        *self.lock_state()
    }

    /// Resolve the pan and tilt commands for a power request.
    fn resolve(linear: Vector3, angular: Vector3) -> BaseResult<(AxisCommand, AxisCommand)> {
        let tilt = checked(PowerComponent::LinearY, linear.y)?;
        let turn = checked(PowerComponent::AngularZ, angular.z)?;
        let strafe = checked(PowerComponent::LinearX, linear.x)?;
        let pan = if turn != 0.0 { turn } else { strafe };

        Ok((
            AxisCommand::clamped(Axis::Pan, pan),
            AxisCommand::clamped(Axis::Tilt, tilt),
        ))
    }

    /// Send both commands, then publish the new state if both succeeded.
    async fn apply(&self, pan: AxisCommand, tilt: AxisCommand) -> BaseResult<()> {
        let _guard = self.command_lock.lock().await;

        let (pan_result, tilt_result) = tokio::join!(self.pan.send(pan), self.tilt.send(tilt));
        pan_result.map_err(|source| BaseError::ComponentUnavailable {
            axis: Axis::Pan,
            source,
        })?;
        tilt_result.map_err(|source| BaseError::ComponentUnavailable {
            axis: Axis::Tilt,
            source,
        })?;

        let mut state = self.lock_state();
        state.last_pan_power = pan.power();
        state.last_tilt_power = tilt.power();
        state.is_moving = pan.power() != 0.0 || tilt.power() != 0.0;
        Ok(())
    }
}

#[async_trait]
impl MovementBase for BaseEmulator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn set_power(&self, linear: Vector3, angular: Vector3) -> BaseResult<()> {
        let (pan, tilt) = Self::resolve(linear, angular)?;
        debug!(
            "{}: set_power pan={:.3} tilt={:.3}",
            self.name,
            pan.power(),
            tilt.power()
        );
        self.apply(pan, tilt).await
    }

    async fn stop(&self) -> BaseResult<()> {
        debug!("{}: stop", self.name);
        self.apply(AxisCommand::halt(Axis::Pan), AxisCommand::halt(Axis::Tilt))
            .await
    }

    async fn is_moving(&self) -> BaseResult<bool> {
        Ok(self.lock_state().is_moving)
    }
}

impl std::fmt::Debug for BaseEmulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseEmulator")
            .field("name", &self.name)
            .field("pan", &self.pan)
            .field("tilt", &self.tilt)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::SimulatedServo;
    use strum::IntoEnumIterator;

    struct Rig {
        pan: Arc<SimulatedServo>,
        tilt: Arc<SimulatedServo>,
        base: BaseEmulator,
    }

    fn rig() -> Rig {
        let pan = Arc::new(SimulatedServo::new("pan-servo"));
        let tilt = Arc::new(SimulatedServo::new("tilt-servo"));
        let base = BaseEmulator::new("rig", pan.clone(), tilt.clone());
        Rig { pan, tilt, base }
    }

    #[tokio::test]
    async fn test_set_power_maps_axes() {
        let rig = rig();
        rig.base
            .set_power(Vector3::with_y(0.4), Vector3::with_z(-0.7))
            .await
            .unwrap();

        assert_eq!(rig.pan.last_power(), Some(-0.7));
        assert_eq!(rig.tilt.last_power(), Some(0.4));
        assert_eq!(
            rig.base.state(),
            BaseState {
                is_moving: true,
                last_pan_power: -0.7,
                last_tilt_power: 0.4,
            }
        );
    }

    #[tokio::test]
    async fn test_linear_x_pans_when_angular_is_zero() {
        let rig = rig();
        rig.base
            .set_power(Vector3::with_x(0.3), Vector3::ZERO)
            .await
            .unwrap();
        assert_eq!(rig.pan.last_power(), Some(0.3));

        rig.base
            .set_power(Vector3::with_x(0.3), Vector3::with_z(0.9))
            .await
            .unwrap();
        assert_eq!(rig.pan.last_power(), Some(0.9));
    }

    #[tokio::test]
    async fn test_moving_until_stop_for_any_valid_power() {
        for p in [-1.0, -0.5, 0.01, 0.5, 1.0] {
            let rig = rig();
            rig.base
                .set_power(Vector3::with_y(p), Vector3::with_z(p))
                .await
                .unwrap();
            assert!(rig.base.is_moving().await.unwrap(), "power {p}");
            assert!(rig.base.is_moving().await.unwrap(), "power {p} (second read)");

            rig.base.stop().await.unwrap();
            assert!(!rig.base.is_moving().await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_zero_power_is_not_moving() {
        let rig = rig();
        rig.base
            .set_power(Vector3::ZERO, Vector3::ZERO)
            .await
            .unwrap();
        assert!(!rig.base.is_moving().await.unwrap());
        assert_eq!(rig.pan.command_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_reissues_zero() {
        let rig = rig();
        rig.base
            .set_power(Vector3::with_y(0.5), Vector3::ZERO)
            .await
            .unwrap();

        rig.base.stop().await.unwrap();
        let first = rig.base.state();
        rig.base.stop().await.unwrap();
        let second = rig.base.state();

        assert_eq!(first, second);
        assert_eq!(second, BaseState::default());
        assert_eq!(rig.pan.commands(), vec![0.0, 0.0, 0.0]);
        assert_eq!(rig.tilt.commands(), vec![0.5, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_invalid_power_leaves_state() {
        let rig = rig();
        rig.base
            .set_power(Vector3::with_y(0.2), Vector3::ZERO)
            .await
            .unwrap();
        let before = rig.base.state();

        let err = rig
            .base
            .set_power(Vector3::with_y(1.5), Vector3::ZERO)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BaseError::InvalidPower {
                component: PowerComponent::LinearY,
                value: 1.5
            }
        );

        let err = rig
            .base
            .set_power(Vector3::ZERO, Vector3::with_z(-1.01))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BaseError::InvalidPower {
                component: PowerComponent::AngularZ,
                ..
            }
        ));

        assert_eq!(rig.base.state(), before);
        assert_eq!(rig.tilt.command_count(), 1);
    }

    #[tokio::test]
    async fn test_servo_failure_leaves_state() {
        let rig = rig();
        rig.tilt.fail_next(1);

        let err = rig
            .base
            .set_power(Vector3::with_y(0.5), Vector3::with_z(0.5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BaseError::ComponentUnavailable {
                axis: Axis::Tilt,
                ..
            }
        ));
        assert_eq!(rig.base.state(), BaseState::default());
        assert!(!rig.base.is_moving().await.unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_methods() {
        let rig = rig();
        let base = &rig.base;

        assert_eq!(
            base.move_straight(100, 10.0).await,
            Err(BaseError::NotImplemented(BaseMethod::MoveStraight))
        );
        assert_eq!(
            base.spin(90.0, 10.0).await,
            Err(BaseError::NotImplemented(BaseMethod::Spin))
        );
        assert_eq!(
            base.set_velocity(Vector3::ZERO, Vector3::ZERO).await,
            Err(BaseError::NotImplemented(BaseMethod::SetVelocity))
        );
        assert_eq!(
            base.get_properties().await,
            Err(BaseError::NotImplemented(BaseMethod::GetProperties))
        );
        assert_eq!(
            base.get_geometries().await,
            Err(BaseError::NotImplemented(BaseMethod::GetGeometries))
        );
        assert_eq!(
            base.do_command(serde_json::json!({"start": []})).await,
            Err(BaseError::NotImplemented(BaseMethod::DoCommand))
        );
        assert!(rig.pan.commands().is_empty());
    }

    #[tokio::test]
    async fn test_from_actuators_checks_axes() {
        let pan = Arc::new(SimulatedServo::new("pan-servo"));
        let tilt = Arc::new(SimulatedServo::new("tilt-servo"));

        let swapped = BaseEmulator::from_actuators(
            "rig",
            AxisActuator::new(Axis::Tilt, tilt.clone()),
            AxisActuator::new(Axis::Pan, pan.clone()),
        );
        assert!(matches!(
            swapped,
            Err(BaseError::ComponentUnavailable {
                axis: Axis::Pan,
                source: ServoCommandError::WrongAxis {
                    actuator: Axis::Tilt,
                    command: Axis::Pan,
                },
            })
        ));

        let base = BaseEmulator::from_actuators(
            "rig",
            AxisActuator::new(Axis::Pan, pan.clone()),
            AxisActuator::new(Axis::Tilt, tilt),
        )
        .unwrap();
        base.set_power(Vector3::ZERO, Vector3::with_z(0.2))
            .await
            .unwrap();
        assert_eq!(pan.last_power(), Some(0.2));
    }

    #[test]
    fn test_supported_subset() {
        let supported: Vec<BaseMethod> = BaseMethod::iter().filter(|m| m.is_supported()).collect();
        assert_eq!(supported, BaseMethod::SUPPORTED.to_vec());
        assert_eq!(BaseMethod::GetGeometries.to_string(), "get_geometries");
    }
}

//! Three-component vector used for base power commands.

use serde::{Deserialize, Serialize};

/// A 3D vector of unitless power fractions.
///
/// The base capability takes one vector for linear power and one for angular
/// power. Only a subset of components is meaningful to the pan-tilt rig.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vector3 {
    /// The zero vector.
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a vector from its components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Vector with only the x component set.
    pub fn with_x(x: f64) -> Self {
        Self { x, ..Self::ZERO }
    }

    /// Vector with only the y component set.
    pub fn with_y(y: f64) -> Self {
        Self { y, ..Self::ZERO }
    }

    /// Vector with only the z component set.
    pub fn with_z(z: f64) -> Self {
        Self { z, ..Self::ZERO }
    }

    /// True when every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

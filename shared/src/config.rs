//! Attribute parsing for the `base-control` and `tracker` models.
//!
//! Both models are configured from a JSON attribute object. Parsing validates
//! required attributes up front and reports the names of the resources the
//! component depends on, so the caller can resolve them before construction.
//!
//! ```
//! use serde_json::json;
//! use shared::config::TrackerConfig;
//!
//! let config = TrackerConfig::from_attributes(&json!({
//!     "base_name": "rig",
//!     "camera_name": "cam",
//!     "vision_name": "detector",
//! }))?;
//! assert_eq!(config.object_label, "Person");
//! assert_eq!(config.dependencies(), vec!["rig", "detector", "cam"]);
//! # Ok::<(), shared::config::ConfigError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default minimum detection confidence.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.55;

/// Default label the tracker follows.
pub const DEFAULT_OBJECT_LABEL: &str = "Person";

/// Configuration errors, all fatal to component construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Attributes must be a JSON object")]
    NotAnObject,

    #[error("Missing required {0} attribute.")]
    MissingAttribute(&'static str),

    #[error("Invalid {name} attribute: {reason}")]
    InvalidAttribute { name: &'static str, reason: String },

    #[error("Malformed attributes: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// A required resource name: absent, null or blank is missing, any other
/// non-string is invalid.
fn require(value: Option<Value>, name: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(Value::String(v)) if !v.trim().is_empty() => Ok(v),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            Err(ConfigError::MissingAttribute(name))
        }
        Some(other) => Err(ConfigError::InvalidAttribute {
            name,
            reason: format!("expected a resource name string, got {other}"),
        }),
    }
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

fn default_object_label() -> String {
    DEFAULT_OBJECT_LABEL.to_string()
}

#[derive(Deserialize)]
struct RawBaseControl {
    pan: Option<Value>,
    tilt: Option<Value>,
}

/// Configuration of the `base-control` model: the two servos it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseControlConfig {
    /// Servo resource driving the horizontal axis
    pub pan: String,
    /// Servo resource driving the vertical axis
    pub tilt: String,
}

impl BaseControlConfig {
    /// Model triple this config belongs to.
    pub const MODEL: &'static str = "hipsterbrown:pan-tilt-camera:base-control";

    /// Parse and validate the attribute object.
    pub fn from_attributes(attributes: &Value) -> Result<Self, ConfigError> {
        if !attributes.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        let raw: RawBaseControl = serde_json::from_value(attributes.clone())?;
        let pan = require(raw.pan, "pan")?;
        let tilt = require(raw.tilt, "tilt")?;
        if pan == tilt {
            return Err(ConfigError::InvalidAttribute {
                name: "tilt",
                reason: format!("pan and tilt must be different servos, both are {pan:?}"),
            });
        }
        Ok(Self { pan, tilt })
    }

    /// Implicit dependencies, in resolution order.
    pub fn dependencies(&self) -> Vec<&str> {
        vec![self.pan.as_str(), self.tilt.as_str()]
    }
}

#[derive(Deserialize)]
struct RawTracker {
    base_name: Option<Value>,
    camera_name: Option<Value>,
    vision_name: Option<Value>,
    #[serde(default)]
    auto_start: bool,
    #[serde(default = "default_confidence_level")]
    confidence_level: f64,
    #[serde(default = "default_object_label")]
    object_label: String,
}

/// Configuration of the `tracker` service.
///
/// Immutable once parsed; a reconfiguration builds a new tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base resource the tracker drives
    pub base_name: String,
    /// Camera whose frames are fed to the vision service
    pub camera_name: String,
    /// Vision service producing detections
    pub vision_name: String,
    /// Start the tracking loop as soon as the tracker is built
    pub auto_start: bool,
    /// Minimum confidence for a detection to be actionable
    pub confidence_level: f64,
    /// Detection label to follow (exact, case-sensitive match)
    pub object_label: String,
}

impl TrackerConfig {
    /// Model triple this config belongs to.
    pub const MODEL: &'static str = "hipsterbrown:pan-tilt-camera:tracker";

    /// Config with the given references and every optional attribute defaulted.
    pub fn new(
        base_name: impl Into<String>,
        camera_name: impl Into<String>,
        vision_name: impl Into<String>,
    ) -> Self {
        Self {
            base_name: base_name.into(),
            camera_name: camera_name.into(),
            vision_name: vision_name.into(),
            auto_start: false,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            object_label: DEFAULT_OBJECT_LABEL.to_string(),
        }
    }

    /// Parse and validate the attribute object.
    pub fn from_attributes(attributes: &Value) -> Result<Self, ConfigError> {
        if !attributes.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        let raw: RawTracker = serde_json::from_value(attributes.clone())?;
        let config = Self {
            base_name: require(raw.base_name, "base_name")?,
            camera_name: require(raw.camera_name, "camera_name")?,
            vision_name: require(raw.vision_name, "vision_name")?,
            auto_start: raw.auto_start,
            confidence_level: raw.confidence_level,
            object_label: raw.object_label,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON attribute file from disk.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_attributes(&value)
    }

    /// Check the optional attributes' ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_level) {
            return Err(ConfigError::InvalidAttribute {
                name: "confidence_level",
                reason: format!("{} is outside [0, 1]", self.confidence_level),
            });
        }
        if self.object_label.is_empty() {
            return Err(ConfigError::InvalidAttribute {
                name: "object_label",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Implicit dependencies: base, vision, camera.
    pub fn dependencies(&self) -> Vec<&str> {
        vec![
            self.base_name.as_str(),
            self.vision_name.as_str(),
            self.camera_name.as_str(),
        ]
    }
}

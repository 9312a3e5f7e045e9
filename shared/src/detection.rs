//! Labelled object detections in normalized frame coordinates.
//!
//! A vision service reports each detection as a label, a confidence score and
//! an axis-aligned bounding box. Coordinates are normalized to `[0, 1]` with
//! the origin in the top-left corner of the frame, so `(0.5, 0.5)` is always
//! the frame center regardless of sensor resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a detection or bounding box is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("Bounding box coordinate {name}={value} outside [0, 1]")]
    CoordinateOutOfRange { name: &'static str, value: f64 },

    #[error("Bounding box is inverted: {min_name}={min} > {max_name}={max}")]
    Inverted {
        min_name: &'static str,
        min: f64,
        max_name: &'static str,
        max: f64,
    },

    #[error("Confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// Normalized axis-aligned rectangle `(x_min, y_min, x_max, y_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Create a bounding box, checking range and ordering of the corners.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self, DetectionError> {
        let bbox = Self {
            x_min,
            y_min,
            x_max,
            y_max,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Box of the given size centered on `(cx, cy)`.
    ///
    /// Convenience for tests and simulators; the result is not clipped.
    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x_min: cx - width / 2.0,
            y_min: cy - height / 2.0,
            x_max: cx + width / 2.0,
            y_max: cy + height / 2.0,
        }
    }

    /// Check that every corner lies in `[0, 1]` and min <= max on both axes.
    pub fn validate(&self) -> Result<(), DetectionError> {
        for (name, value) in [
            ("x_min", self.x_min),
            ("y_min", self.y_min),
            ("x_max", self.x_max),
            ("y_max", self.y_max),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectionError::CoordinateOutOfRange { name, value });
            }
        }
        if self.x_min > self.x_max {
            return Err(DetectionError::Inverted {
                min_name: "x_min",
                min: self.x_min,
                max_name: "x_max",
                max: self.x_max,
            });
        }
        if self.y_min > self.y_max {
            return Err(DetectionError::Inverted {
                min_name: "y_min",
                min: self.y_min,
                max_name: "y_max",
                max: self.y_max,
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Fraction of the frame covered by the box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center of the box as `(x, y)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }
}

/// A single labelled detection reported by a vision service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class name, e.g. `"Person"`
    pub label: String,
    /// Detector confidence in `[0, 1]`
    pub confidence: f64,
    /// Location in normalized frame coordinates
    pub bbox: BoundingBox,
}

impl Detection {
    /// Create a detection, validating confidence and box.
    pub fn new(
        label: impl Into<String>,
        confidence: f64,
        bbox: BoundingBox,
    ) -> Result<Self, DetectionError> {
        let detection = Self {
            label: label.into(),
            confidence,
            bbox,
        };
        detection.validate()?;
        Ok(detection)
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectionError::ConfidenceOutOfRange(self.confidence));
        }
        self.bbox.validate()
    }

    pub fn area(&self) -> f64 {
        self.bbox.area()
    }

    pub fn centroid(&self) -> (f64, f64) {
        self.bbox.centroid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centroid_and_area() {
        let bbox = BoundingBox::new(0.2, 0.4, 0.6, 0.5).unwrap();
        let (cx, cy) = bbox.centroid();
        assert_relative_eq!(cx, 0.4, epsilon = 1e-12);
        assert_relative_eq!(cy, 0.45, epsilon = 1e-12);
        assert_relative_eq!(bbox.area(), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_centered_box() {
        let bbox = BoundingBox::centered(0.5, 0.5, 0.2, 0.1);
        assert!(bbox.validate().is_ok());
        assert_relative_eq!(bbox.x_min, 0.4, epsilon = 1e-12);
        assert_relative_eq!(bbox.y_max, 0.55, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_out_of_range_coordinate() {
        let err = BoundingBox::new(-0.1, 0.0, 0.5, 0.5).unwrap_err();
        assert!(matches!(
            err,
            DetectionError::CoordinateOutOfRange { name: "x_min", .. }
        ));
    }

    #[test]
    fn test_rejects_inverted_box() {
        let err = BoundingBox::new(0.0, 0.6, 0.5, 0.5).unwrap_err();
        assert!(matches!(err, DetectionError::Inverted { min_name: "y_min", .. }));
    }

    #[test]
    fn test_rejects_bad_confidence() {
        let bbox = BoundingBox::new(0.0, 0.0, 0.1, 0.1).unwrap();
        assert_eq!(
            Detection::new("Person", 1.5, bbox).unwrap_err(),
            DetectionError::ConfidenceOutOfRange(1.5)
        );
    }
}

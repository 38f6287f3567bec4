// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Prediction results for PersonLab inference.

use crate::pose::{Pose, Resolution};

/// Inference speed metrics in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct Speed {
    /// Time spent on preprocessing.
    pub preprocess: Option<f64>,
    /// Time spent on model inference.
    pub inference: Option<f64>,
    /// Time spent decoding poses from the network outputs.
    pub decode: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    ///
    /// # Arguments
    ///
    /// * `preprocess` - Time in milliseconds.
    /// * `inference` - Time in milliseconds.
    /// * `decode` - Time in milliseconds.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, decode: f64) -> Self {
        Self {
            preprocess: Some(preprocess),
            inference: Some(inference),
            decode: Some(decode),
        }
    }

    /// Sum of preprocess, inference, and decode times in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess.unwrap_or(0.0) + self.inference.unwrap_or(0.0) + self.decode.unwrap_or(0.0)
    }
}

/// Poses detected in one image.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Detected poses in acceptance order, in source image coordinates.
    pub poses: Vec<Pose>,
    /// Source image resolution.
    pub orig_shape: Resolution,
    /// Timing information.
    pub speed: Speed,
}

impl Prediction {
    /// Number of detected poses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Check if no pose was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// One line summary, e.g. `2 persons, 14.2ms`.
    #[must_use]
    pub fn verbose(&self) -> String {
        let count = self.len();
        let noun = if count == 1 { "person" } else { "persons" };
        let timing = self
            .speed
            .inference
            .map_or_else(String::new, |ms| format!(", {ms:.1}ms"));
        if count == 0 {
            format!("(no detections){timing}")
        } else {
            format!("{count} {noun}{timing}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_total() {
        let speed = Speed::new(1.5, 10.0, 0.5);
        assert!((speed.total() - 12.0).abs() < 1e-9);

        let partial = Speed {
            inference: Some(3.0),
            ..Speed::default()
        };
        assert!((partial.total() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_verbose() {
        let resolution = Resolution::new(10, 10);
        let mut prediction = Prediction {
            poses: Vec::new(),
            orig_shape: resolution,
            speed: Speed::new(0.0, 4.2, 0.0),
        };
        assert!(prediction.is_empty());
        assert_eq!(prediction.verbose(), "(no detections), 4.2ms");

        prediction.poses.push(Pose::new(resolution));
        assert_eq!(prediction.verbose(), "1 person, 4.2ms");

        prediction.poses.push(Pose::new(resolution));
        prediction.speed = Speed::default();
        assert_eq!(prediction.verbose(), "2 persons");
    }
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decoder configuration.
//!
//! This module defines the [`DecoderConfig`] struct, which carries the fixed constants of a
//! PersonLab model (input resolution, output stride) together with the thresholds that control
//! multi-person decoding and non-maximum suppression.

use crate::error::{PoseError, Result};
use crate::pose::Resolution;

/// Configuration for PersonLab pose decoding.
///
/// It uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use personlab::DecoderConfig;
///
/// let config = DecoderConfig::new()
///     .with_nms_radius(25.0)
///     .with_keypoint_score_threshold(0.2)
///     .with_input_image_size(353, 481);
/// assert_eq!(config.output_stride, 16);
/// ```
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Working resolution the network runs at. Decoded poses are expressed in this space
    /// until they are rescaled.
    pub input_image_size: Resolution,
    /// Downsampling factor between the working resolution and the output tensors.
    pub output_stride: usize,
    /// Two detections of the same joint closer than this many pixels belong to the same person.
    pub nms_radius: f32,
    /// Minimum heatmap score for a local maximum to become a root candidate.
    pub keypoint_score_threshold: f32,
    /// Poses whose instance score is not above this value are discarded.
    pub pose_score_threshold: f32,
    /// Radius, in heatmap cells, of the window a root candidate must be maximal in.
    pub keypoint_local_maximum_radius: usize,
    /// Radius, in heatmap cells, searched around a displacement prediction for the best
    /// heatmap response. `0` uses the predicted cell as is.
    pub refine_radius: usize,
    /// Maximum number of poses returned per image.
    pub max_poses: usize,
    /// Number of intra-op threads for ONNX Runtime.
    /// Setting this to `0` allows ONNX Runtime to choose the optimal number.
    pub num_threads: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            input_image_size: Resolution::new(241, 289),
            output_stride: 16,
            nms_radius: 20.0,
            keypoint_score_threshold: 0.1,
            pose_score_threshold: 0.15,
            keypoint_local_maximum_radius: 1,
            refine_radius: 1,
            max_poses: 20,
            num_threads: 0,
        }
    }
}

impl DecoderConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working input resolution of the network.
    #[must_use]
    pub const fn with_input_image_size(mut self, height: usize, width: usize) -> Self {
        self.input_image_size = Resolution::new(height, width);
        self
    }

    /// Set the output stride of the network.
    #[must_use]
    pub const fn with_output_stride(mut self, stride: usize) -> Self {
        self.output_stride = stride;
        self
    }

    /// Set the non-maximum suppression radius in pixels.
    #[must_use]
    pub const fn with_nms_radius(mut self, radius: f32) -> Self {
        self.nms_radius = radius;
        self
    }

    /// Set the minimum heatmap score of root candidates.
    #[must_use]
    pub const fn with_keypoint_score_threshold(mut self, threshold: f32) -> Self {
        self.keypoint_score_threshold = threshold;
        self
    }

    /// Set the minimum instance score of returned poses.
    #[must_use]
    pub const fn with_pose_score_threshold(mut self, threshold: f32) -> Self {
        self.pose_score_threshold = threshold;
        self
    }

    /// Set the local maximum window radius used when scanning for root candidates.
    #[must_use]
    pub const fn with_local_maximum_radius(mut self, radius: usize) -> Self {
        self.keypoint_local_maximum_radius = radius;
        self
    }

    /// Set the search radius used to refine displacement predictions.
    #[must_use]
    pub const fn with_refine_radius(mut self, radius: usize) -> Self {
        self.refine_radius = radius;
        self
    }

    /// Set the maximum number of poses to return.
    #[must_use]
    pub const fn with_max_poses(mut self, max: usize) -> Self {
        self.max_poses = max;
        self
    }

    /// Set the number of threads for inference.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Checks that the configuration can be used for decoding.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for a zero stride or input size, or for a negative or
    /// non-finite radius.
    pub fn validate(&self) -> Result<()> {
        if self.output_stride == 0 {
            return Err(PoseError::ConfigError(
                "output stride must be positive".to_string(),
            ));
        }
        if self.input_image_size.height == 0 || self.input_image_size.width == 0 {
            return Err(PoseError::ConfigError(format!(
                "input image size must be positive, got {}",
                self.input_image_size
            )));
        }
        if !self.nms_radius.is_finite() || self.nms_radius < 0.0 {
            return Err(PoseError::ConfigError(format!(
                "nms radius must be a non-negative number, got {}",
                self.nms_radius
            )));
        }
        Ok(())
    }
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose decoding library.

use std::fmt;

/// Result type alias for pose decoding operations.
pub type Result<T> = std::result::Result<T, PoseError>;

/// Main error type for the pose decoding library.
#[derive(Debug)]
pub enum PoseError {
    /// A flat buffer does not hold exactly `product(shape)` scalars.
    ShapeMismatch {
        /// Declared tensor shape.
        shape: Vec<usize>,
        /// Number of scalars actually supplied.
        len: usize,
    },
    /// A tensor has the wrong rank or channel layout for the decoder.
    TensorShape(String),
    /// Error loading the ONNX model.
    ModelLoadError(String),
    /// Error during model inference.
    InferenceError(String),
    /// Error processing images.
    ImageError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl fmt::Display for PoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { shape, len } => {
                let expected: usize = shape.iter().product();
                write!(
                    f,
                    "Shape mismatch: shape {shape:?} needs {expected} elements, buffer has {len}"
                )
            }
            Self::TensorShape(msg) => write!(f, "Tensor shape error: {msg}"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for PoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PoseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for PoseError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

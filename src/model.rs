// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! PersonLab model loading and inference.
//!
//! This module provides the [`PersonLabModel`] struct, which wraps an ONNX Runtime session and
//! turns images into decoded poses.

use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;

use crate::config::DecoderConfig;
use crate::decoder::decode_poses;
use crate::error::{PoseError, Result};
use crate::pose::{Pose, Resolution};
use crate::preprocessing::preprocess_image;
use crate::results::{Prediction, Speed};
use crate::tensor::TensorView;
use crate::warn;

/// Names of the four PersonLab outputs in the ONNX graph.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputNames {
    heatmap: String,
    offsets: String,
    displacements_fwd: String,
    displacements_bwd: String,
}

impl OutputNames {
    /// Matches graph outputs by name, falling back to declaration order.
    fn resolve(names: &[String]) -> Result<Self> {
        let find = |needle: &str| {
            names
                .iter()
                .find(|name| name.to_lowercase().contains(needle))
                .cloned()
        };

        if let (Some(heatmap), Some(offsets), Some(displacements_fwd), Some(displacements_bwd)) =
            (find("heatmap"), find("offset"), find("fwd"), find("bwd"))
        {
            return Ok(Self {
                heatmap,
                offsets,
                displacements_fwd,
                displacements_bwd,
            });
        }

        match names {
            [heatmap, offsets, displacements_fwd, displacements_bwd, ..] => {
                warn!(
                    "Could not identify PersonLab outputs by name {names:?}, using declaration order"
                );
                Ok(Self {
                    heatmap: heatmap.clone(),
                    offsets: offsets.clone(),
                    displacements_fwd: displacements_fwd.clone(),
                    displacements_bwd: displacements_bwd.clone(),
                })
            }
            _ => Err(PoseError::ModelLoadError(format!(
                "PersonLab models have 4 outputs, found {}: {names:?}",
                names.len()
            ))),
        }
    }
}

/// Working resolution from the model's declared `[N, H, W, 3]` input shape.
///
/// Dynamic (non-positive) height or width falls back to `configured`. A fixed size that differs
/// from `configured` wins, with a warning.
fn resolve_input_size(dims: Option<&[i64]>, configured: Resolution) -> Result<Resolution> {
    let Some(dims) = dims else {
        return Ok(configured);
    };
    let &[_, height, width, channels] = dims else {
        return Err(PoseError::ModelLoadError(format!(
            "PersonLab models take a [N, H, W, 3] image, input shape is {dims:?}"
        )));
    };
    if channels > 0 && channels != 3 {
        return Err(PoseError::ModelLoadError(format!(
            "PersonLab models take a [N, H, W, 3] image, input shape is {dims:?}"
        )));
    }
    if height <= 0 || width <= 0 {
        return Ok(configured);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let fixed = Resolution::new(height as usize, width as usize);
    if fixed != configured {
        warn!("Model input is fixed at {fixed}, using it instead of the configured {configured}");
    }
    Ok(fixed)
}

/// An owned output tensor copied out of the session.
#[derive(Debug, Clone)]
struct OutputTensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl OutputTensor {
    /// Borrow as a `[H, W, C]` view, dropping a leading batch dimension of 1.
    fn view(&self) -> Result<TensorView<'_>> {
        Ok(TensorView::new(&self.data, &self.shape)?.squeeze_batch())
    }
}

/// Raw network outputs for one image.
#[derive(Debug, Clone)]
struct RawOutputs {
    heatmap: OutputTensor,
    offsets: OutputTensor,
    displacements_fwd: OutputTensor,
    displacements_bwd: OutputTensor,
}

impl RawOutputs {
    /// Decodes poses and maps them from the working resolution onto `orig_shape`.
    fn decode(&self, config: &DecoderConfig, orig_shape: Resolution) -> Result<Vec<Pose>> {
        let mut poses = decode_poses(
            self.heatmap.view()?,
            self.offsets.view()?,
            self.displacements_fwd.view()?,
            self.displacements_bwd.view()?,
            config,
        )?;
        for pose in &mut poses {
            pose.rescale(orig_shape);
        }
        Ok(poses)
    }
}

/// PersonLab model for multi-person pose estimation.
///
/// # Example
///
/// ```no_run
/// use personlab::PersonLabModel;
///
/// let mut model = PersonLabModel::load("personlab.onnx")?;
/// let image = image::open("people.jpg")?;
/// let prediction = model.predict(&image)?;
/// for pose in &prediction.poses {
///     println!("{pose}");
/// }
/// # Ok::<(), personlab::PoseError>(())
/// ```
pub struct PersonLabModel {
    /// ONNX Runtime session.
    session: Session,
    /// Input tensor name.
    input_name: String,
    /// Output tensor names.
    output_names: OutputNames,
    /// Decoder configuration.
    config: DecoderConfig,
    /// Whether model has been warmed up.
    warmed_up: bool,
}

impl PersonLabModel {
    /// Load a PersonLab model from an ONNX file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file doesn't exist or can't be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, DecoderConfig::default())
    }

    /// Load a PersonLab model with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the ONNX model file.
    /// * `config` - Decoder configuration. A model with a fixed input shape overrides
    ///   `input_image_size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the model file doesn't exist or can't be
    /// loaded, the input is not a 3-channel NHWC image, or the graph does not expose the four
    /// PersonLab outputs.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();

        if !path.exists() {
            return Err(PoseError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(config.num_threads)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| PoseError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "image".to_string());

        let input_dims: Option<Vec<i64>> = session
            .inputs
            .first()
            .and_then(|i| i.input_type.tensor_shape())
            .map(|shape| shape.iter().copied().collect());
        let input_image_size =
            resolve_input_size(input_dims.as_deref(), config.input_image_size)?;
        let config = DecoderConfig {
            input_image_size,
            ..config
        };

        let names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let output_names = OutputNames::resolve(&names)?;

        Ok(Self {
            session,
            input_name,
            output_names,
            config,
            warmed_up: false,
        })
    }

    /// Warm up the model by running inference with a dummy input.
    ///
    /// Warmup is automatically called on first predict.
    ///
    /// # Errors
    ///
    /// Returns an error if the dummy inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }

        let size = self.config.input_image_size;
        let dummy_input = Array4::<f32>::zeros((1, size.height, size.width, 3));
        let _ = self.run_inference(&dummy_input)?;

        self.warmed_up = true;
        Ok(())
    }

    /// Detect all poses in an image.
    ///
    /// Poses are returned in acceptance order and expressed in the coordinates of `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the outputs have unexpected shapes.
    pub fn predict(&mut self, image: &DynamicImage) -> Result<Prediction> {
        self.warmup()?;

        let start_preprocess = Instant::now();
        let preprocessed = preprocess_image(image, self.config.input_image_size);
        let preprocess_time = start_preprocess.elapsed().as_secs_f64() * 1000.0;

        let start_inference = Instant::now();
        let outputs = self.run_inference(&preprocessed.tensor)?;
        let inference_time = start_inference.elapsed().as_secs_f64() * 1000.0;

        let start_decode = Instant::now();
        let poses = outputs.decode(&self.config, preprocessed.orig_shape)?;
        let decode_time = start_decode.elapsed().as_secs_f64() * 1000.0;

        Ok(Prediction {
            poses,
            orig_shape: preprocessed.orig_shape,
            speed: Speed::new(preprocess_time, inference_time, decode_time),
        })
    }

    /// Open an image file and detect all poses in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or inference fails.
    pub fn predict_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Prediction> {
        let image = image::open(path.as_ref())?;
        self.predict(&image)
    }

    /// Run the ONNX model inference.
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<RawOutputs> {
        let input_contiguous = input.as_standard_layout();

        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| PoseError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![&self.input_name => input_tensor];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| PoseError::InferenceError(format!("Inference failed: {e}")))?;

        let extract = |name: &str| -> Result<OutputTensor> {
            let output = outputs
                .get(name)
                .ok_or_else(|| PoseError::InferenceError(format!("Output '{name}' not found")))?;
            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| PoseError::InferenceError(format!("Failed to extract '{name}': {e}")))?;
            Ok(OutputTensor {
                data: data.to_vec(),
                shape: shape.iter().map(|&d| d as usize).collect(),
            })
        };

        Ok(RawOutputs {
            heatmap: extract(&self.output_names.heatmap)?,
            offsets: extract(&self.output_names.offsets)?,
            displacements_fwd: extract(&self.output_names.displacements_fwd)?,
            displacements_bwd: extract(&self.output_names.displacements_bwd)?,
        })
    }

    /// Get the decoder configuration.
    #[must_use]
    pub const fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Get the network's working resolution.
    #[must_use]
    pub const fn input_size(&self) -> Resolution {
        self.config.input_image_size
    }
}

impl std::fmt::Debug for PersonLabModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonLabModel")
            .field("input_name", &self.input_name)
            .field("output_names", &self.output_names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # PersonLab
//!
//! Multi-person pose estimation with [PersonLab](https://arxiv.org/abs/1803.08225) models
//! exported to ONNX.
//!
//! The core of the crate is a greedy decoder that turns the four network outputs (keypoint
//! heatmaps, short-range offsets and forward/backward mid-range displacements) into
//! non-overlapping 17-joint skeletons. Around it sit an ONNX Runtime wrapper, skeleton
//! drawing, and a small CLI.
//!
//! ## Features
//!
//! - **Decoder only** - [`decode_poses`] works on any `f32` buffers, no runtime needed
//! - **ONNX Runtime** - [`PersonLabModel`] handles preprocessing, inference and rescaling
//! - **Parallel scan** - root candidates are collected across joint channels with `rayon`
//! - **Annotation** - skeletons drawn with `imageproc` (feature `annotate`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use personlab::{DecoderConfig, PersonLabModel};
//!
//! let config = DecoderConfig::new().with_pose_score_threshold(0.2);
//! let mut model = PersonLabModel::load_with_config("personlab.onnx", config)?;
//! let prediction = model.predict_path("people.jpg")?;
//!
//! for pose in &prediction.poses {
//!     println!("score {:.3}", pose.score());
//!     print!("{pose}");
//! }
//! # Ok::<(), personlab::PoseError>(())
//! ```
//!
//! ## Decoding raw tensors
//!
//! ```rust
//! use personlab::{DecoderConfig, KeypointIndex, TensorView, decode_poses};
//!
//! let (h, w) = (16, 19);
//! let mut heatmap = vec![0.0_f32; h * w * 17];
//! heatmap[(5 * w + 5) * 17 + KeypointIndex::Nose.index()] = 0.9;
//! let offsets = vec![0.0_f32; h * w * 34];
//! let displacements = vec![0.0_f32; h * w * 32];
//!
//! let config = DecoderConfig::new().with_pose_score_threshold(0.0);
//! let poses = decode_poses(
//!     TensorView::new(&heatmap, &[h, w, 17])?,
//!     TensorView::new(&offsets, &[h, w, 34])?,
//!     TensorView::new(&displacements, &[h, w, 32])?,
//!     TensorView::new(&displacements, &[h, w, 32])?,
//!     &config,
//! )?;
//!
//! let nose = poses[0].get_keypoint(KeypointIndex::Nose).unwrap();
//! assert_eq!((nose.y, nose.x), (80.0, 80.0));
//! # Ok::<(), personlab::PoseError>(())
//! ```

// Modules
#[cfg(feature = "annotate")]
pub mod annotate;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod graph;
pub mod keypoint;
pub mod model;
pub mod pose;
pub mod preprocessing;
pub mod results;
pub mod tensor;
pub mod visualizer;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use decoder::{PoseDecoder, decode_poses};
pub use error::{PoseError, Result};
pub use graph::Direction;
pub use keypoint::{Keypoint, KeypointIndex};
pub use model::PersonLabModel;
pub use pose::{Pose, Resolution};
pub use results::{Prediction, Speed};
pub use tensor::TensorView;

#[cfg(feature = "annotate")]
pub use annotate::{DrawStyle, annotate_poses};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

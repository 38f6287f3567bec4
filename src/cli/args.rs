// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

use crate::visualizer::Color;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    personlab predict personlab.onnx --image people.jpg
    personlab predict personlab.onnx -i people.jpg --save --color '#ff0000' --line-width 3
    personlab predict personlab.onnx -i people.jpg --profiling --verbose false
    personlab predict personlab.onnx -i people.jpg --nms-radius 25 --pose-conf 0.3"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect and draw human poses in an image
    Predict(PredictArgs),
}

/// Arguments for the predict command.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Path to the PersonLab ONNX model
    pub model: String,

    /// Image to run pose estimation on
    #[arg(short, long)]
    pub image: Option<String>,

    /// Run the model 10 times and report per-run timings
    #[arg(short, long, default_value_t = false)]
    pub profiling: bool,

    /// Save the annotated image to runs/pose/predict
    #[arg(long, default_value_t = false)]
    pub save: bool,

    /// Same-joint detections closer than this many pixels belong to one person
    #[arg(long, default_value_t = 20.0)]
    pub nms_radius: f32,

    /// Minimum heatmap score of a root keypoint
    #[arg(long, default_value_t = 0.1)]
    pub conf: f32,

    /// Minimum instance score of a pose
    #[arg(long, default_value_t = 0.15)]
    pub pose_conf: f32,

    /// Maximum number of poses per image
    #[arg(long, default_value_t = 20)]
    pub max_poses: usize,

    /// Number of intra-op inference threads (0 lets ONNX Runtime decide)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Skeleton color as #rrggbb (default: palette per body part)
    #[arg(long)]
    pub color: Option<Color>,

    /// Skeleton line width in pixels
    #[arg(long, default_value_t = 2)]
    pub line_width: u32,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

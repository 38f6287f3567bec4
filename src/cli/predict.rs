// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

#[cfg(feature = "annotate")]
use std::fs;
#[cfg(feature = "annotate")]
use std::path::Path;

#[cfg(feature = "annotate")]
use crate::annotate::{DrawStyle, annotate_poses, find_next_run_dir};

use crate::cli::args::PredictArgs;
use crate::pose::Pose;
use crate::results::{Prediction, Speed};
use crate::{DecoderConfig, PersonLabModel, VERSION};
use crate::{error, info, section, verbose, warn};
#[cfg(feature = "annotate")]
use crate::success;

/// Number of inference runs with `--profiling`.
const PROFILING_RUNS: usize = 10;

/// Run PersonLab pose estimation on one image.
pub fn run_prediction(args: &PredictArgs) {
    let Some(image_path) = args.image.as_deref() else {
        error!("'--image' argument is missing. Pass the image to run pose estimation on.");
        process::exit(1);
    };

    let config = DecoderConfig::new()
        .with_nms_radius(args.nms_radius)
        .with_keypoint_score_threshold(args.conf)
        .with_pose_score_threshold(args.pose_conf)
        .with_max_poses(args.max_poses)
        .with_threads(args.threads);

    let mut model = match PersonLabModel::load_with_config(&args.model, config) {
        Ok(m) => m,
        Err(e) => {
            error!("Error loading model: {e}");
            process::exit(1);
        }
    };

    let image = match image::open(image_path) {
        Ok(img) => img,
        Err(e) => {
            error!("Failed to open image '{image_path}': {e}");
            process::exit(1);
        }
    };

    println!("PersonLab {VERSION} 🚀 Rust ONNX CPU");
    let input_size = model.input_size();
    verbose!(
        "{} summary: imgsz=({}, {}), output stride {}",
        args.model,
        input_size.height,
        input_size.width,
        model.config().output_stride
    );

    let runs = if args.profiling { PROFILING_RUNS } else { 1 };
    if args.profiling {
        section!("Profiling {runs} runs");
    }

    let mut speeds = Vec::with_capacity(runs);
    let mut last: Option<Prediction> = None;
    for run in 1..=runs {
        let prediction = match model.predict(&image) {
            Ok(p) => p,
            Err(e) => {
                error!("Inference failed: {e}");
                process::exit(1);
            }
        };
        if args.profiling {
            info!("run {run}/{runs}: {}", format_speed(&prediction.speed));
        }
        speeds.push(prediction.speed.clone());
        last = Some(prediction);
    }
    let Some(prediction) = last else {
        return;
    };

    verbose!(
        "image 1/1 {image_path}: {}x{} {}",
        input_size.height,
        input_size.width,
        prediction.verbose()
    );
    for (i, pose) in prediction.poses.iter().enumerate() {
        info!("{}", format_pose_summary(i, pose));
        if args.verbose {
            print!("{pose}");
        }
    }

    let mean = mean_speed(&speeds);
    verbose!(
        "Speed: {} per image at shape (1, {}, {}, 3)",
        format_speed(&mean),
        input_size.height,
        input_size.width
    );

    #[cfg(feature = "annotate")]
    if args.save {
        let mut style = DrawStyle::default().with_line_width(args.line_width);
        if let Some(color) = args.color {
            style = style.with_color(color);
        }
        let annotated = annotate_poses(&image, &prediction.poses, &style);

        let dir = find_next_run_dir("runs/pose", "predict");
        if let Err(e) = fs::create_dir_all(&dir) {
            error!("Failed to create save directory {}: {e}", dir.display());
            process::exit(1);
        }
        let file_name = Path::new(image_path)
            .file_name()
            .map_or_else(|| "image.jpg".into(), std::ffi::OsStr::to_os_string);
        let out_path = dir.join(file_name);
        match annotated.save(&out_path) {
            Ok(()) => success!("Results saved to {}", out_path.display()),
            Err(e) => error!("Failed to save {}: {e}", out_path.display()),
        }
    }

    #[cfg(not(feature = "annotate"))]
    if args.save {
        warn!(
            "--save requires the 'annotate' feature. Compile with --features annotate to enable saving."
        );
    }

    if prediction.is_empty() {
        warn!("No poses found. Try lowering --conf or --pose-conf.");
    }
}

/// Format one pose as e.g. `pose 0: score 0.412, 17 keypoints`.
fn format_pose_summary(index: usize, pose: &Pose) -> String {
    format!(
        "pose {index}: score {:.3}, {} keypoints",
        pose.score(),
        pose.len()
    )
}

fn format_speed(speed: &Speed) -> String {
    format!(
        "{:.1}ms preprocess, {:.1}ms inference, {:.1}ms decode",
        speed.preprocess.unwrap_or(0.0),
        speed.inference.unwrap_or(0.0),
        speed.decode.unwrap_or(0.0)
    )
}

/// Average timings over several runs.
#[allow(clippy::cast_precision_loss)]
fn mean_speed(speeds: &[Speed]) -> Speed {
    let n = speeds.len().max(1) as f64;
    let sum = |f: fn(&Speed) -> Option<f64>| speeds.iter().filter_map(f).sum::<f64>() / n;
    Speed::new(
        sum(|s| s.preprocess),
        sum(|s| s.inference),
        sum(|s| s.decode),
    )
}

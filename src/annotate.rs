// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton drawing and output directory helpers.

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::graph::EDGES;
use crate::pose::Pose;
use crate::visualizer::Color;
use crate::visualizer::skeleton::{KPT_COLOR_INDICES, LIMB_COLOR_INDICES};

/// How poses are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    /// Single color for every limb and keypoint. `None` uses the pose palette per body part.
    pub color: Option<Color>,
    /// Limb thickness in pixels.
    pub line_width: u32,
    /// Keypoint marker radius in pixels. `0` draws no markers.
    pub keypoint_radius: i32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            color: None,
            line_width: 2,
            keypoint_radius: 3,
        }
    }
}

impl DrawStyle {
    #[must_use]
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub const fn with_line_width(mut self, width: u32) -> Self {
        self.line_width = width;
        self
    }

    #[must_use]
    pub const fn with_keypoint_radius(mut self, radius: i32) -> Self {
        self.keypoint_radius = radius;
        self
    }
}

/// Find the next available run directory (e.g. `runs/pose/predict`, `runs/pose/predict2`, ...).
#[must_use]
pub fn find_next_run_dir<P: AsRef<Path>>(base: P, prefix: &str) -> PathBuf {
    let base_path = base.as_ref();

    let first = base_path.join(prefix);
    if !first.exists() {
        return first;
    }

    (2..)
        .map(|i| base_path.join(format!("{prefix}{i}")))
        .find(|numbered| !numbered.exists())
        .unwrap_or(first)
}

/// Draw every pose onto a copy of `image`.
///
/// Limbs are drawn for each skeleton edge whose two joints are present, then a filled marker
/// is drawn at each present keypoint. Poses must already be expressed in the image's
/// resolution.
#[must_use]
pub fn annotate_poses(image: &DynamicImage, poses: &[Pose], style: &DrawStyle) -> DynamicImage {
    let mut img = image.to_rgb8();

    for pose in poses {
        for (edge, &(from, to)) in EDGES.iter().enumerate() {
            let (Some(a), Some(b)) = (pose.get_keypoint(from), pose.get_keypoint(to)) else {
                continue;
            };
            let color = style
                .color
                .unwrap_or_else(|| Color::from_pose_index(LIMB_COLOR_INDICES[edge]));
            draw_thick_line(&mut img, (a.x, a.y), (b.x, b.y), style.line_width, color);
        }

        if style.keypoint_radius > 0 {
            for keypoint in pose.keypoints() {
                let color = style.color.unwrap_or_else(|| {
                    Color::from_pose_index(KPT_COLOR_INDICES[keypoint.index.index()])
                });
                #[allow(clippy::cast_possible_truncation)]
                let center = (keypoint.x.round() as i32, keypoint.y.round() as i32);
                draw_filled_circle_mut(&mut img, center, style.keypoint_radius, color.to_rgb());
            }
        }
    }

    DynamicImage::ImageRgb8(img)
}

/// Draw `width` parallel one pixel segments centered on `start -> end`.
#[allow(clippy::cast_precision_loss)]
fn draw_thick_line(img: &mut RgbImage, start: (f32, f32), end: (f32, f32), width: u32, color: Color) {
    let pixel = color.to_rgb();
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = dx.hypot(dy);

    if width <= 1 || length < f32::EPSILON {
        draw_line_segment_mut(img, start, end, pixel);
        return;
    }

    let (nx, ny) = (-dy / length, dx / length);
    let half = (width - 1) as f32 / 2.0;
    for i in 0..width {
        let o = i as f32 - half;
        draw_line_segment_mut(
            img,
            (start.0 + nx * o, start.1 + ny * o),
            (end.0 + nx * o, end.1 + ny * o),
            pixel,
        );
    }
}

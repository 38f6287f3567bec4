// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Greedy multi-person pose decoding.
//!
//! Decoding works on four network outputs, all sharing the same `[H, W]` grid:
//!
//! - heatmap `[H, W, 17]`: per-cell confidence of each joint type,
//! - short-range offsets `[H, W, 34]`: sub-cell `(dy, dx)` refinement per joint type,
//! - forward and backward mid-range displacements `[H, W, 32]`: per skeleton edge, the vector
//!   from one joint to its neighbor.
//!
//! Local maxima of the heatmap become root candidates, visited in order of decreasing score. A
//! candidate already covered by an accepted pose is skipped. Every other candidate seeds a new
//! pose that is grown breadth-first along the keypoint graph: each neighbor is predicted by
//! following the displacement field and then snapped to the strongest heatmap response near
//! the prediction.

use std::collections::VecDeque;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::DecoderConfig;
use crate::error::{PoseError, Result};
use crate::graph::{self, Direction, NUM_EDGES};
use crate::keypoint::{Keypoint, KeypointIndex};
use crate::pose::Pose;
use crate::tensor::TensorView;
use crate::warn;

/// A heatmap local maximum, remembered with its cell for deterministic ordering.
#[derive(Debug, Clone, Copy)]
struct RootCandidate {
    cell: (usize, usize),
    keypoint: Keypoint,
}

/// Decodes poses from one frame of PersonLab outputs.
///
/// # Example
///
/// ```rust
/// use personlab::{DecoderConfig, PoseDecoder, TensorView};
///
/// let (h, w) = (8, 8);
/// let mut heatmap = vec![0.0_f32; h * w * 17];
/// heatmap[(3 * w + 3) * 17] = 0.9; // nose at cell (3, 3)
/// let offsets = vec![0.0_f32; h * w * 34];
/// let displacements = vec![0.0_f32; h * w * 32];
///
/// let config = DecoderConfig::new().with_pose_score_threshold(0.0);
/// let decoder = PoseDecoder::new(
///     TensorView::new(&heatmap, &[h, w, 17])?,
///     TensorView::new(&offsets, &[h, w, 34])?,
///     TensorView::new(&displacements, &[h, w, 32])?,
///     TensorView::new(&displacements, &[h, w, 32])?,
///     &config,
/// )?;
/// let poses = decoder.decode();
/// assert_eq!(poses.len(), 1);
/// # Ok::<(), personlab::PoseError>(())
/// ```
#[derive(Debug)]
pub struct PoseDecoder<'a> {
    heatmap: TensorView<'a>,
    offsets: TensorView<'a>,
    displacements_fwd: TensorView<'a>,
    displacements_bwd: TensorView<'a>,
    config: &'a DecoderConfig,
    height: usize,
    width: usize,
}

impl<'a> PoseDecoder<'a> {
    /// Creates a decoder over the four network outputs.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if `config` is invalid and [`PoseError::TensorShape`]
    /// if a tensor is not `[H, W, C]` with the expected channel count, or if the tensors do
    /// not share the same grid.
    pub fn new(
        heatmap: TensorView<'a>,
        offsets: TensorView<'a>,
        displacements_fwd: TensorView<'a>,
        displacements_bwd: TensorView<'a>,
        config: &'a DecoderConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (height, width) = grid_of("heatmap", &heatmap, KeypointIndex::COUNT)?;
        for (name, tensor, channels) in [
            ("offsets", &offsets, 2 * KeypointIndex::COUNT),
            ("forward displacements", &displacements_fwd, 2 * NUM_EDGES),
            ("backward displacements", &displacements_bwd, 2 * NUM_EDGES),
        ] {
            let grid = grid_of(name, tensor, channels)?;
            if grid != (height, width) {
                return Err(PoseError::TensorShape(format!(
                    "{name} grid {grid:?} does not match heatmap grid {:?}",
                    (height, width)
                )));
            }
        }

        Ok(Self {
            heatmap,
            offsets,
            displacements_fwd,
            displacements_bwd,
            config,
            height,
            width,
        })
    }

    /// Runs the greedy decoding and returns the accepted poses in acceptance order.
    ///
    /// Every returned pose has all 17 joints and is expressed in the configured input
    /// resolution; use [`Pose::rescale`] to map it onto the source image.
    #[must_use]
    pub fn decode(&self) -> Vec<Pose> {
        let nms_radius = self.config.nms_radius;
        let mut poses: Vec<Pose> = Vec::new();

        for candidate in self.sorted_root_candidates() {
            if poses.len() >= self.config.max_poses {
                break;
            }

            let root = candidate.keypoint;
            if root.is_within_radius_of_corresponding_point(&poses, nms_radius) {
                continue;
            }

            let mut pose = self.grow_pose(root);
            if !pose.is_complete() {
                warn!(
                    "Discarding pose rooted at {} with only {} of {} joints",
                    root.index,
                    pose.len(),
                    KeypointIndex::COUNT
                );
                continue;
            }

            let score = self.pose_score(&pose, &poses);
            if score > self.config.pose_score_threshold {
                pose.set_score(score);
                poses.push(pose);
            }
        }

        poses
    }

    /// Returns every root candidate keypoint, sorted by descending score.
    ///
    /// Candidates with equal scores are ordered by heatmap row, column, then joint type.
    #[must_use]
    pub fn root_candidates(&self) -> Vec<Keypoint> {
        self.sorted_root_candidates()
            .into_iter()
            .map(|candidate| candidate.keypoint)
            .collect()
    }

    fn sorted_root_candidates(&self) -> Vec<RootCandidate> {
        #[cfg(feature = "parallel")]
        let mut candidates: Vec<RootCandidate> = KeypointIndex::ALL
            .as_slice()
            .par_iter()
            .flat_map_iter(|&joint| self.scan_channel(joint))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let mut candidates: Vec<RootCandidate> = KeypointIndex::ALL
            .iter()
            .flat_map(|&joint| self.scan_channel(joint))
            .collect();

        candidates.sort_by(|a, b| {
            b.keypoint
                .score
                .total_cmp(&a.keypoint.score)
                .then_with(|| a.cell.cmp(&b.cell))
                .then_with(|| a.keypoint.index.cmp(&b.keypoint.index))
        });
        candidates
    }

    /// Collects the local maxima of one heatmap channel that pass the score threshold.
    fn scan_channel(&self, joint: KeypointIndex) -> Vec<RootCandidate> {
        let channel = joint.index();
        let threshold = self.config.keypoint_score_threshold;
        let mut candidates = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let score = self.heatmap.at(&[y, x, channel]);
                // written so that NaN scores are rejected
                if !(score >= threshold) || !self.is_local_maximum(y, x, channel, score) {
                    continue;
                }
                candidates.push(RootCandidate {
                    cell: (y, x),
                    keypoint: Keypoint::from_heatmap(
                        y,
                        x,
                        joint,
                        score,
                        &self.offsets,
                        self.config.output_stride,
                    ),
                });
            }
        }

        candidates
    }

    fn is_local_maximum(&self, y: usize, x: usize, channel: usize, score: f32) -> bool {
        let radius = self.config.keypoint_local_maximum_radius;
        let y_end = (y + radius).min(self.height - 1);
        let x_end = (x + radius).min(self.width - 1);

        for window_y in y.saturating_sub(radius)..=y_end {
            for window_x in x.saturating_sub(radius)..=x_end {
                if self.heatmap.at(&[window_y, window_x, channel]) > score {
                    return false;
                }
            }
        }
        true
    }

    /// Grows a pose outward from `root` with a breadth-first walk over the keypoint graph.
    fn grow_pose(&self, root: Keypoint) -> Pose {
        let mut pose = Pose::new(self.config.input_image_size);
        let mut visited = [false; KeypointIndex::COUNT];
        let mut queue = VecDeque::with_capacity(KeypointIndex::COUNT);

        visited[root.index.index()] = true;
        pose.add(root);
        queue.push_back(root);

        while let Some(current) = queue.pop_front() {
            for &(next, direction) in graph::next_keypoints(current.index) {
                if std::mem::replace(&mut visited[next.index()], true) {
                    continue;
                }
                if let Some(keypoint) = self.follow_displacement(&current, next, direction) {
                    pose.add(keypoint);
                    queue.push_back(keypoint);
                }
            }
        }

        pose
    }

    /// Predicts the `target` joint from `source` and refines the prediction on the heatmap.
    fn follow_displacement(
        &self,
        source: &Keypoint,
        target: KeypointIndex,
        direction: Direction,
    ) -> Option<Keypoint> {
        let displacements = match direction {
            Direction::Fwd => &self.displacements_fwd,
            Direction::Bwd => &self.displacements_bwd,
        };
        let channel_y = graph::displacement_index(source.index, target)?;
        let channel_x = channel_y + NUM_EDGES;

        let (source_y, source_x) = self.cell_of(source.y, source.x);
        let dy = displacements.at(&[source_y, source_x, channel_y]);
        let dx = displacements.at(&[source_y, source_x, channel_x]);

        let (predicted_y, predicted_x) = self.cell_of(source.y + dy, source.x + dx);
        let (y, x) = self.refine(predicted_y, predicted_x, target);
        let score = self.heatmap.at(&[y, x, target.index()]);

        Some(Keypoint::from_heatmap(
            y,
            x,
            target,
            score,
            &self.offsets,
            self.config.output_stride,
        ))
    }

    /// Returns the cell within `refine_radius` of `(y, x)` with the strongest response for
    /// `joint`. The predicted cell wins ties.
    fn refine(&self, y: usize, x: usize, joint: KeypointIndex) -> (usize, usize) {
        let radius = self.config.refine_radius;
        let channel = joint.index();
        let mut best = (y, x);
        let mut best_score = self.heatmap.at(&[y, x, channel]);

        let y_end = (y + radius).min(self.height - 1);
        let x_end = (x + radius).min(self.width - 1);
        for window_y in y.saturating_sub(radius)..=y_end {
            for window_x in x.saturating_sub(radius)..=x_end {
                let score = self.heatmap.at(&[window_y, window_x, channel]);
                if score > best_score {
                    best = (window_y, window_x);
                    best_score = score;
                }
            }
        }

        best
    }

    /// Maps image coordinates to the nearest heatmap cell, clamped to the grid.
    fn cell_of(&self, y: f32, x: f32) -> (usize, usize) {
        (
            self.unstrided(y, self.height),
            self.unstrided(x, self.width),
        )
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn unstrided(&self, coord: f32, size: usize) -> usize {
        let max = size.saturating_sub(1) as f32;
        // NaN casts to 0
        (coord / self.config.output_stride as f32)
            .round()
            .clamp(0.0, max) as usize
    }

    /// Mean score over all joints, counting only keypoints not already claimed by an accepted
    /// pose.
    fn pose_score(&self, pose: &Pose, accepted: &[Pose]) -> f32 {
        let total: f32 = pose
            .keypoints()
            .filter(|kp| !kp.is_within_radius_of_corresponding_point(accepted, self.config.nms_radius))
            .map(|kp| kp.score)
            .sum();
        total / KeypointIndex::COUNT as f32
    }
}

fn grid_of(name: &str, tensor: &TensorView<'_>, channels: usize) -> Result<(usize, usize)> {
    match *tensor.shape() {
        [h, w, c] if c == channels => Ok((h, w)),
        _ => Err(PoseError::TensorShape(format!(
            "{name} must have shape [H, W, {channels}], got {:?}",
            tensor.shape()
        ))),
    }
}

/// Convenience wrapper: builds a [`PoseDecoder`] and runs it.
///
/// # Errors
///
/// Returns the same errors as [`PoseDecoder::new`].
pub fn decode_poses(
    heatmap: TensorView<'_>,
    offsets: TensorView<'_>,
    displacements_fwd: TensorView<'_>,
    displacements_bwd: TensorView<'_>,
    config: &DecoderConfig,
) -> Result<Vec<Pose>> {
    let decoder = PoseDecoder::new(heatmap, offsets, displacements_fwd, displacements_bwd, config)?;
    Ok(decoder.decode())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Zero-filled outputs for an `h x w` grid.
    struct Outputs {
        h: usize,
        w: usize,
        heatmap: Vec<f32>,
        offsets: Vec<f32>,
        fwd: Vec<f32>,
        bwd: Vec<f32>,
    }

    impl Outputs {
        fn new(h: usize, w: usize) -> Self {
            Self {
                h,
                w,
                heatmap: vec![0.0_f32; h * w * 17],
                offsets: vec![0.0_f32; h * w * 34],
                fwd: vec![0.0_f32; h * w * 32],
                bwd: vec![0.0_f32; h * w * 32],
            }
        }

        fn heat(&mut self, y: usize, x: usize, joint: KeypointIndex, score: f32) {
            self.heatmap[(y * self.w + x) * 17 + joint.index()] = score;
        }

        fn offset(&mut self, y: usize, x: usize, channel: usize, value: f32) {
            self.offsets[(y * self.w + x) * 34 + channel] = value;
        }

        fn fwd(&mut self, y: usize, x: usize, edge: usize, dy: f32, dx: f32) {
            let base = (y * self.w + x) * 32;
            self.fwd[base + edge] = dy;
            self.fwd[base + edge + 16] = dx;
        }

        fn bwd(&mut self, y: usize, x: usize, edge: usize, dy: f32, dx: f32) {
            let base = (y * self.w + x) * 32;
            self.bwd[base + edge] = dy;
            self.bwd[base + edge + 16] = dx;
        }

        fn decoder<'a>(&'a self, config: &'a DecoderConfig) -> PoseDecoder<'a> {
            let (h, w) = (self.h, self.w);
            PoseDecoder::new(
                TensorView::new(&self.heatmap, &[h, w, 17]).unwrap(),
                TensorView::new(&self.offsets, &[h, w, 34]).unwrap(),
                TensorView::new(&self.fwd, &[h, w, 32]).unwrap(),
                TensorView::new(&self.bwd, &[h, w, 32]).unwrap(),
                config,
            )
            .unwrap()
        }
    }

    fn permissive() -> DecoderConfig {
        DecoderConfig::new().with_pose_score_threshold(0.0)
    }

    #[test]
    fn test_single_nose_activation() {
        let mut outputs = Outputs::new(10, 10);
        outputs.heat(5, 5, KeypointIndex::Nose, 0.9);
        let config = permissive();

        let poses = outputs.decoder(&config).decode();
        assert_eq!(poses.len(), 1);

        let pose = &poses[0];
        assert!(pose.is_complete());
        assert_eq!(pose.resolution(), config.input_image_size);
        let nose = pose.get_keypoint(KeypointIndex::Nose).unwrap();
        assert!((nose.y - 80.0).abs() < f32::EPSILON);
        assert!((nose.x - 80.0).abs() < f32::EPSILON);
        assert!((nose.score - 0.9).abs() < f32::EPSILON);
        assert!((pose.score() - 0.9 / 17.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_roots_are_suppressed() {
        let mut outputs = Outputs::new(10, 10);
        outputs.heat(5, 5, KeypointIndex::Nose, 0.9);
        outputs.heat(5, 6, KeypointIndex::Nose, 0.9);
        // shift the second activation back onto the first one
        outputs.offset(5, 6, KeypointIndex::Nose.index() + 17, -16.0);
        let config = permissive();
        let decoder = outputs.decoder(&config);

        let roots = decoder.root_candidates();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0], roots[1]);

        let poses = decoder.decode();
        assert_eq!(poses.len(), 1);
    }

    #[test]
    fn test_separate_people() {
        let mut outputs = Outputs::new(12, 12);
        outputs.heat(2, 2, KeypointIndex::Nose, 0.8);
        outputs.heat(9, 9, KeypointIndex::Nose, 0.95);
        let config = permissive();

        let poses = outputs.decoder(&config).decode();
        assert_eq!(poses.len(), 2);
        // highest scoring root first
        let first = poses[0].get_keypoint(KeypointIndex::Nose).unwrap();
        assert!((first.y - 144.0).abs() < f32::EPSILON);
        let second = poses[1].get_keypoint(KeypointIndex::Nose).unwrap();
        assert!((second.y - 32.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pose_score_threshold() {
        let mut outputs = Outputs::new(10, 10);
        outputs.heat(5, 5, KeypointIndex::Nose, 0.9);
        // 0.9 / 17 is below the default threshold
        let config = DecoderConfig::default();
        assert!(outputs.decoder(&config).decode().is_empty());
    }

    #[test]
    fn test_max_poses() {
        let mut outputs = Outputs::new(12, 12);
        outputs.heat(2, 2, KeypointIndex::Nose, 0.8);
        outputs.heat(9, 9, KeypointIndex::Nose, 0.95);
        let config = permissive().with_max_poses(1);
        assert_eq!(outputs.decoder(&config).decode().len(), 1);
    }

    #[test]
    fn test_follows_forward_displacement_and_refines() {
        let mut outputs = Outputs::new(10, 10);
        outputs.heat(2, 2, KeypointIndex::Nose, 0.9);
        // nose -> left eye points at cell (4, 3); the left eye peaks one cell to the right
        outputs.fwd(2, 2, 0, 32.0, 16.0);
        outputs.heat(4, 4, KeypointIndex::LeftEye, 0.6);
        outputs.offset(4, 4, KeypointIndex::LeftEye.index(), 1.5);

        let config = permissive();
        let poses = outputs.decoder(&config).decode();
        assert_eq!(poses.len(), 1);
        let eye = poses[0].get_keypoint(KeypointIndex::LeftEye).unwrap();
        assert!((eye.y - 65.5).abs() < f32::EPSILON);
        assert!((eye.x - 64.0).abs() < f32::EPSILON);
        assert!((eye.score - 0.6).abs() < f32::EPSILON);

        // the ear hangs off the refined eye, with zero displacement
        let ear = poses[0].get_keypoint(KeypointIndex::LeftEar).unwrap();
        assert!((ear.y - 64.0).abs() < f32::EPSILON);
        assert!((ear.x - 64.0).abs() < f32::EPSILON);

        // without refinement the raw prediction is used
        let config = permissive().with_refine_radius(0);
        let poses = outputs.decoder(&config).decode();
        let eye = poses[0].get_keypoint(KeypointIndex::LeftEye).unwrap();
        assert!((eye.y - 64.0).abs() < f32::EPSILON);
        assert!((eye.x - 48.0).abs() < f32::EPSILON);
        assert!(eye.score.abs() < f32::EPSILON);
    }

    #[test]
    fn test_follows_backward_displacement_from_extremity() {
        let mut outputs = Outputs::new(10, 10);
        outputs.heat(6, 6, KeypointIndex::LeftEar, 0.9);
        // left ear -> left eye is edge 1, read from the backward tensor
        outputs.bwd(6, 6, 1, -48.0, -64.0);
        outputs.fwd(6, 6, 1, 32.0, 0.0);
        let config = permissive().with_refine_radius(0);

        let poses = outputs.decoder(&config).decode();
        assert_eq!(poses.len(), 1);
        let eye = poses[0].get_keypoint(KeypointIndex::LeftEye).unwrap();
        assert!((eye.y - 48.0).abs() < f32::EPSILON);
        assert!((eye.x - 32.0).abs() < f32::EPSILON);

        // the nose is one more backward step from the eye, with zero displacement
        let nose = poses[0].get_keypoint(KeypointIndex::Nose).unwrap();
        assert!((nose.y - 48.0).abs() < f32::EPSILON);
        assert!((nose.x - 32.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_refine_keeps_predicted_cell_on_tie() {
        let mut outputs = Outputs::new(10, 10);
        outputs.heat(2, 2, KeypointIndex::Nose, 0.9);
        outputs.fwd(2, 2, 0, 32.0, 32.0); // lands on cell (4, 4)
        outputs.heat(4, 4, KeypointIndex::LeftEye, 0.5);
        outputs.heat(4, 3, KeypointIndex::LeftEye, 0.5);
        outputs.heat(3, 5, KeypointIndex::LeftEye, 0.5);
        let config = permissive();

        let poses = outputs.decoder(&config).decode();
        let eye = poses[0].get_keypoint(KeypointIndex::LeftEye).unwrap();
        assert!((eye.y - 64.0).abs() < f32::EPSILON);
        assert!((eye.x - 64.0).abs() < f32::EPSILON);

        // a strictly stronger neighbor still wins
        outputs.heat(3, 5, KeypointIndex::LeftEye, 0.6);
        let poses = outputs.decoder(&config).decode();
        let eye = poses[0].get_keypoint(KeypointIndex::LeftEye).unwrap();
        assert!((eye.y - 48.0).abs() < f32::EPSILON);
        assert!((eye.x - 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_displacement_is_clamped_to_grid() {
        let mut outputs = Outputs::new(6, 6);
        outputs.heat(1, 1, KeypointIndex::Nose, 0.9);
        outputs.fwd(1, 1, 4, -500.0, 900.0); // nose -> left shoulder, far off the grid
        let config = permissive().with_refine_radius(0);

        let poses = outputs.decoder(&config).decode();
        let shoulder = poses[0].get_keypoint(KeypointIndex::LeftShoulder).unwrap();
        assert!(shoulder.y.abs() < f32::EPSILON);
        assert!((shoulder.x - 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_local_maximum_window() {
        let mut outputs = Outputs::new(8, 8);
        outputs.heat(3, 3, KeypointIndex::LeftWrist, 0.5);
        outputs.heat(3, 4, KeypointIndex::LeftWrist, 0.4);
        outputs.heat(6, 6, KeypointIndex::LeftWrist, 0.05); // below threshold

        let config = permissive();
        let roots = outputs.decoder(&config).root_candidates();
        assert_eq!(roots.len(), 1);
        assert!((roots[0].score - 0.5).abs() < f32::EPSILON);

        let config = permissive().with_local_maximum_radius(0);
        let roots = outputs.decoder(&config).root_candidates();
        assert_eq!(roots.len(), 2);
        assert!(roots[0].score > roots[1].score);
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let (h, w) = (4, 4);
        let heatmap = vec![0.0_f32; h * w * 17];
        let offsets = vec![0.0_f32; h * w * 17];
        let disp = vec![0.0_f32; h * w * 32];
        let config = DecoderConfig::default();

        let err = PoseDecoder::new(
            TensorView::new(&heatmap, &[h, w, 17]).unwrap(),
            TensorView::new(&offsets, &[h, w, 17]).unwrap(),
            TensorView::new(&disp, &[h, w, 32]).unwrap(),
            TensorView::new(&disp, &[h, w, 32]).unwrap(),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, PoseError::TensorShape(_)));
    }

    #[test]
    fn test_rejects_mismatched_grid() {
        let heatmap = vec![0.0_f32; 4 * 4 * 17];
        let offsets = vec![0.0_f32; 4 * 5 * 34];
        let disp = vec![0.0_f32; 4 * 4 * 32];
        let config = DecoderConfig::default();

        let result = decode_poses(
            TensorView::new(&heatmap, &[4, 4, 17]).unwrap(),
            TensorView::new(&offsets, &[4, 5, 34]).unwrap(),
            TensorView::new(&disp, &[4, 4, 32]).unwrap(),
            TensorView::new(&disp, &[4, 4, 32]).unwrap(),
            &config,
        );
        assert!(matches!(result, Err(PoseError::TensorShape(_))));
    }

    #[test]
    fn test_empty_heatmap_yields_no_poses() {
        let outputs = Outputs::new(5, 5);
        let config = permissive();
        assert!(outputs.decoder(&config).decode().is_empty());
    }
}

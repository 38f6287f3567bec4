// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Joint types and single keypoint detections.

use std::fmt;

use crate::pose::Pose;
use crate::tensor::TensorView;

/// The 17 COCO body joints, in the channel order used by the network outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointIndex {
    /// Number of joint types.
    pub const COUNT: usize = 17;

    /// All joint types in channel order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// Returns the joint type stored in heatmap channel `index`.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Returns the channel index of this joint type.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for KeypointIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single detected joint.
///
/// `y` and `x` are pixel coordinates in the coordinate space of the pose that owns the keypoint
/// (the network's working resolution until the pose is rescaled).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub y: f32,
    pub x: f32,
    pub index: KeypointIndex,
    /// Heatmap confidence in `[0, 1]`.
    pub score: f32,
}

impl Keypoint {
    #[must_use]
    pub const fn new(y: f32, x: f32, index: KeypointIndex, score: f32) -> Self {
        Self { y, x, index, score }
    }

    /// Builds a keypoint from the heatmap cell `(heatmap_y, heatmap_x)`.
    ///
    /// The coarse cell position is scaled by `output_stride` and refined with the short-range
    /// offsets, which store y-offsets in channels `0..17` and x-offsets in channels `17..34`.
    ///
    /// # Panics
    ///
    /// Panics if the cell lies outside `offsets`.
    #[must_use]
    #[track_caller]
    pub fn from_heatmap(
        heatmap_y: usize,
        heatmap_x: usize,
        index: KeypointIndex,
        score: f32,
        offsets: &TensorView<'_>,
        output_stride: usize,
    ) -> Self {
        let channel = index.index();
        let y = (heatmap_y * output_stride) as f32
            + offsets.at(&[heatmap_y, heatmap_x, channel]);
        let x = (heatmap_x * output_stride) as f32
            + offsets.at(&[heatmap_y, heatmap_x, channel + KeypointIndex::COUNT]);
        Self::new(y, x, index, score)
    }

    /// Squared Euclidean distance to `other` in `(y, x)` space.
    #[must_use]
    pub fn squared_distance_to(&self, other: &Self) -> f32 {
        let dy = other.y - self.y;
        let dx = other.x - self.x;
        dy * dy + dx * dx
    }

    /// Returns a copy with `y` and `x` multiplied by the given factors.
    #[must_use]
    pub fn rescaled(&self, scale_y: f32, scale_x: f32) -> Self {
        Self::new(self.y * scale_y, self.x * scale_x, self.index, self.score)
    }

    /// Checks whether any pose already holds a keypoint of the same joint type within `radius`.
    ///
    /// Poses that lack this joint type never match.
    #[must_use]
    pub fn is_within_radius_of_corresponding_point(&self, poses: &[Pose], radius: f32) -> bool {
        let squared_radius = radius * radius;
        poses.iter().any(|pose| {
            pose.get_keypoint(self.index)
                .is_some_and(|other| self.squared_distance_to(other) <= squared_radius)
        })
    }
}

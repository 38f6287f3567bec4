// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Multi-keypoint pose of a single person.

use std::fmt;

use crate::keypoint::{Keypoint, KeypointIndex};

/// Image resolution as `(height, width)` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub height: usize,
    pub width: usize,
}

impl Resolution {
    #[must_use]
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

impl From<(usize, usize)> for Resolution {
    fn from((height, width): (usize, usize)) -> Self {
        Self::new(height, width)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// One person: up to one keypoint per joint type.
///
/// Slots are indexed by [`KeypointIndex`], so a pose can never hold two keypoints of the same
/// joint type. Coordinates are expressed in `resolution`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    keypoints: [Option<Keypoint>; KeypointIndex::COUNT],
    resolution: Resolution,
    score: f32,
}

impl Pose {
    /// Creates an empty pose in the given coordinate space.
    #[must_use]
    pub const fn new(resolution: Resolution) -> Self {
        Self {
            keypoints: [None; KeypointIndex::COUNT],
            resolution,
            score: 0.0,
        }
    }

    /// Stores `keypoint` in the slot for its joint type, replacing any previous occupant.
    pub fn add(&mut self, keypoint: Keypoint) {
        self.keypoints[keypoint.index.index()] = Some(keypoint);
    }

    #[must_use]
    pub fn get_keypoint(&self, index: KeypointIndex) -> Option<&Keypoint> {
        self.keypoints[index.index()].as_ref()
    }

    /// Iterates over the keypoints that are present, in joint order.
    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> + '_ {
        self.keypoints.iter().flatten()
    }

    /// Number of filled slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.iter().all(Option::is_none)
    }

    /// Returns `true` if every joint type has a keypoint.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.keypoints.iter().all(Option::is_some)
    }

    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Instance score assigned by the decoder.
    #[must_use]
    pub const fn score(&self) -> f32 {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: f32) {
        self.score = score;
    }

    /// Maps all keypoints from the current resolution to `new_resolution`.
    pub fn rescale(&mut self, new_resolution: Resolution) {
        let scale_y = new_resolution.height as f32 / self.resolution.height as f32;
        let scale_x = new_resolution.width as f32 / self.resolution.width as f32;
        for keypoint in self.keypoints.iter_mut().flatten() {
            *keypoint = keypoint.rescaled(scale_y, scale_x);
        }
        self.resolution = new_resolution;
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (joint, slot) in KeypointIndex::ALL.iter().zip(&self.keypoints) {
            match slot {
                Some(kp) => writeln!(f, "{joint} - {:.3} | {:.1} - {:.1}", kp.score, kp.y, kp.x)?,
                None => writeln!(f, "{joint} - absent")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_pose(resolution: Resolution) -> Pose {
        let mut pose = Pose::new(resolution);
        for (i, joint) in KeypointIndex::ALL.iter().enumerate() {
            pose.add(Keypoint::new(i as f32 * 3.0, 7.0 + i as f32, *joint, 0.5));
        }
        pose
    }

    #[test]
    fn test_add_and_get() {
        let mut pose = Pose::new(Resolution::new(100, 100));
        assert!(pose.is_empty());
        assert!(pose.get_keypoint(KeypointIndex::Nose).is_none());

        pose.add(Keypoint::new(1.0, 2.0, KeypointIndex::Nose, 0.9));
        pose.add(Keypoint::new(5.0, 6.0, KeypointIndex::Nose, 0.4));
        assert_eq!(pose.len(), 1);
        let nose = pose.get_keypoint(KeypointIndex::Nose).unwrap();
        assert!((nose.y - 5.0).abs() < f32::EPSILON);
        assert!(!pose.is_complete());
    }

    #[test]
    fn test_rescale_round_trip() {
        let original = full_pose(Resolution::new(100, 100));
        let mut pose = original.clone();

        pose.rescale(Resolution::new(200, 200));
        assert_eq!(pose.resolution(), Resolution::new(200, 200));
        let elbow = pose.get_keypoint(KeypointIndex::LeftElbow).unwrap();
        assert!((elbow.y - 42.0).abs() < 1e-4);
        assert!((elbow.x - 28.0).abs() < 1e-4);

        pose.rescale(Resolution::new(100, 100));
        for (a, b) in pose.keypoints().zip(original.keypoints()) {
            assert!((a.y - b.y).abs() < 1e-4);
            assert!((a.x - b.x).abs() < 1e-4);
        }
    }

    #[test]
    fn test_rescale_axes_independently() {
        let mut pose = Pose::new(Resolution::new(100, 200));
        pose.add(Keypoint::new(10.0, 10.0, KeypointIndex::LeftHip, 0.8));
        pose.rescale(Resolution::new(50, 800));

        let hip = pose.get_keypoint(KeypointIndex::LeftHip).unwrap();
        assert!((hip.y - 5.0).abs() < 1e-4);
        assert!((hip.x - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_display_marks_absent_joints() {
        let mut pose = Pose::new(Resolution::new(10, 10));
        pose.add(Keypoint::new(1.0, 2.0, KeypointIndex::Nose, 0.9));
        let text = pose.to_string();
        assert_eq!(text.lines().count(), 17);
        assert!(text.starts_with("nose - 0.900 | 1.0 - 2.0"));
        assert!(text.contains("right_ankle - absent"));
    }
}

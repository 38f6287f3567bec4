// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Fixed keypoint graph used to grow a pose from its root joint.
//!
//! The skeleton is a tree of 16 undirected edges over the 17 joints. Walking it away from the
//! torso (nose, shoulders, hips) toward the extremities reads the *forward* mid-range
//! displacements; walking back toward the torso reads the *backward* ones. Both directions of an
//! edge share the same displacement channel index.

use crate::keypoint::KeypointIndex;

/// Which mid-range displacement tensor an edge is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Away from the torso.
    Fwd,
    /// Toward the torso.
    Bwd,
}

impl Direction {
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Fwd => Self::Bwd,
            Self::Bwd => Self::Fwd,
        }
    }
}

/// Number of skeleton edges, and of `(dy, dx)` channel pairs in each displacement tensor.
pub const NUM_EDGES: usize = 16;

/// Skeleton edges, indexed by displacement channel.
pub const EDGES: [(KeypointIndex, KeypointIndex); NUM_EDGES] = {
    use KeypointIndex::*;
    [
        (Nose, LeftEye),
        (LeftEye, LeftEar),
        (Nose, RightEye),
        (RightEye, RightEar),
        (Nose, LeftShoulder),
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (LeftShoulder, LeftHip),
        (LeftHip, LeftKnee),
        (LeftKnee, LeftAnkle),
        (Nose, RightShoulder),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (RightShoulder, RightHip),
        (RightHip, RightKnee),
        (RightKnee, RightAnkle),
    ]
};

/// Returns the joints reachable from `keypoint` in one step, with the direction of each step.
#[must_use]
pub const fn next_keypoints(keypoint: KeypointIndex) -> &'static [(KeypointIndex, Direction)] {
    use Direction::{Bwd, Fwd};
    use KeypointIndex::*;

    match keypoint {
        Nose => &[
            (LeftEye, Fwd),
            (RightEye, Fwd),
            (LeftShoulder, Fwd),
            (RightShoulder, Fwd),
        ],
        LeftEye => &[(Nose, Bwd), (LeftEar, Fwd)],
        RightEye => &[(Nose, Bwd), (RightEar, Fwd)],
        LeftEar => &[(LeftEye, Bwd)],
        RightEar => &[(RightEye, Bwd)],
        LeftShoulder => &[(LeftHip, Fwd), (LeftElbow, Fwd), (Nose, Bwd)],
        RightShoulder => &[(RightHip, Fwd), (RightElbow, Fwd), (Nose, Bwd)],
        LeftElbow => &[(LeftWrist, Fwd), (LeftShoulder, Bwd)],
        RightElbow => &[(RightWrist, Fwd), (RightShoulder, Bwd)],
        LeftWrist => &[(LeftElbow, Bwd)],
        RightWrist => &[(RightElbow, Bwd)],
        LeftHip => &[(LeftKnee, Fwd), (LeftShoulder, Bwd)],
        RightHip => &[(RightKnee, Fwd), (RightShoulder, Bwd)],
        LeftKnee => &[(LeftAnkle, Fwd), (LeftHip, Bwd)],
        RightKnee => &[(RightAnkle, Fwd), (RightHip, Bwd)],
        LeftAnkle => &[(LeftKnee, Bwd)],
        RightAnkle => &[(RightKnee, Bwd)],
    }
}

/// Returns the displacement channel of the edge between `a` and `b`, in either order.
#[must_use]
pub fn displacement_index(a: KeypointIndex, b: KeypointIndex) -> Option<usize> {
    EDGES
        .iter()
        .position(|&(from, to)| (from == a && to == b) || (from == b && to == a))
}

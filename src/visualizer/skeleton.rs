// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Default skeleton coloring. Limbs follow [`crate::graph::EDGES`] order.

use crate::graph::NUM_EDGES;
use crate::keypoint::KeypointIndex;

/// Limb color indices mapping to `POSE_COLORS`, one per displacement edge.
/// Mapping: face=green, arms=blue, torso=pink, legs=orange
pub const LIMB_COLOR_INDICES: [usize; NUM_EDGES] = [
    16, 16, 16, 16, // nose, eyes, ears
    16, 9, 9, // nose to left shoulder, left arm
    7, 0, 0, // left torso side, left leg
    16, 9, 9, // nose to right shoulder, right arm
    7, 0, 0, // right torso side, right leg
];

/// Keypoint color indices mapping to `POSE_COLORS`
/// Mapping: face=green, arms=blue, legs=orange
pub const KPT_COLOR_INDICES: [usize; KeypointIndex::COUNT] =
    [16, 16, 16, 16, 16, 9, 9, 9, 9, 9, 9, 0, 0, 0, 0, 0, 0];

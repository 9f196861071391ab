use crate::config::LegConfig;
use crate::geometry::EPSILON;
use crate::pose::{LandmarkIndex, Pose};

use super::crossover::{LimbPair, LimbPairTracker};

/// 脚専用の交差補正と膝の最小間隔
pub struct LegStabilizer {
    tracker: LimbPairTracker,
    knee_min_distance: f32,
}

impl LegStabilizer {
    pub fn new(config: &LegConfig, visibility_threshold: f32) -> Self {
        Self {
            tracker: LimbPairTracker::new(
                LimbPair::Legs,
                config.velocity_window,
                config.correction_blend,
                visibility_threshold,
            ),
            knee_min_distance: config.knee_min_distance,
        }
    }

    pub fn apply(&mut self, pose: &mut Pose) {
        if !pose.is_complete() {
            return;
        }
        self.tracker.apply(pose);
        if enforce_knee_separation(pose, self.knee_min_distance) {
            tracing::debug!(min = self.knee_min_distance, "knees pushed apart");
        }
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

/// 両膝の距離が `min_distance` 未満ならX方向に半分ずつ押し広げる
///
/// 結果の距離はちょうど `min_distance` になる。押し広げた場合 true。
pub fn enforce_knee_separation(pose: &mut Pose, min_distance: f32) -> bool {
    if !pose.is_complete() {
        return false;
    }

    let left = pose.xy(LandmarkIndex::LeftKnee);
    let right = pose.xy(LandmarkIndex::RightKnee);
    let d = left - right;
    if d.norm() >= min_distance {
        return false;
    }

    let target_dx = (min_distance * min_distance - d.y * d.y).max(0.0).sqrt();
    let deficit = target_dx - d.x.abs();
    if deficit <= 0.0 {
        return false;
    }

    // 被写体の左膝は画像上で右側（X大）
    let sign = if d.x.abs() < EPSILON { 1.0 } else { d.x.signum() };
    pose[LandmarkIndex::LeftKnee].x += sign * deficit / 2.0;
    pose[LandmarkIndex::RightKnee].x -= sign * deficit / 2.0;
    true
}

use crate::config::{OutOfFrameConfig, StabilityConfig};
use crate::pose::{LandmarkIndex, Pose};

use super::out_of_frame::is_out_of_frame;

/// 安定判定に使う体幹の点
const KEY_POINTS: [LandmarkIndex; 5] = [
    LandmarkIndex::Nose,
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
];

#[derive(Debug, Clone, PartialEq)]
pub enum StabilityOutcome {
    /// 体幹が十分見えている。安定ポーズを更新済み
    Stable,
    /// 体幹が見えていないが、使える安定ポーズも無い
    Unstable,
    /// 安定ポーズへ寄せたポーズ。以降のステージはスキップする
    Fallback(Pose),
}

/// 体幹の可視性による安定判定と、直近の安定ポーズへのフォールバック
pub struct StabilityGuard {
    config: StabilityConfig,
    visibility_threshold: f32,
    out_of_frame: OutOfFrameConfig,
    last_stable: Option<Pose>,
    last_stable_ms: u64,
    stabilizing: bool,
}

impl StabilityGuard {
    pub fn new(config: StabilityConfig, visibility_threshold: f32, out_of_frame: OutOfFrameConfig) -> Self {
        Self {
            config,
            visibility_threshold,
            out_of_frame,
            last_stable: None,
            last_stable_ms: 0,
            stabilizing: false,
        }
    }

    pub fn check(&mut self, pose: &Pose, timestamp_ms: u64) -> StabilityOutcome {
        if !pose.is_complete() {
            return StabilityOutcome::Unstable;
        }

        let visible = KEY_POINTS
            .iter()
            .filter(|&&idx| pose[idx].is_visible(self.visibility_threshold))
            .count();

        if visible >= self.config.min_visible_key_points {
            self.stabilizing = false;
            self.store(pose, timestamp_ms);
            return StabilityOutcome::Stable;
        }

        self.stabilizing = true;
        let age = timestamp_ms.saturating_sub(self.last_stable_ms);
        match &self.last_stable {
            Some(stable) if age < self.config.timeout_ms => {
                tracing::debug!(visible, age, "key points lost, blending toward stable pose");
                StabilityOutcome::Fallback(self.blend(pose, stable))
            }
            _ => StabilityOutcome::Unstable,
        }
    }

    /// 点ごとに安定ポーズを更新する。フレーム外の点は前回の値を保持
    fn store(&mut self, pose: &Pose, timestamp_ms: u64) {
        match &mut self.last_stable {
            Some(stable) if stable.len() == pose.len() => {
                for (kept, lm) in stable.landmarks.iter_mut().zip(pose.landmarks.iter()) {
                    if !is_out_of_frame(lm, &self.out_of_frame) {
                        *kept = *lm;
                    }
                }
            }
            _ => self.last_stable = Some(pose.clone()),
        }
        self.last_stable_ms = timestamp_ms;
    }

    fn blend(&self, pose: &Pose, stable: &Pose) -> Pose {
        let mut result = pose.clone();
        for (out, target) in result.landmarks.iter_mut().zip(stable.landmarks.iter()) {
            let factor = if out.is_visible(self.visibility_threshold) {
                self.config.visible_blend
            } else {
                self.config.low_visibility_blend
            };
            *out = out.lerp(target, factor);
        }
        result
    }

    pub fn last_stable(&self) -> Option<&Pose> {
        self.last_stable.as_ref()
    }

    pub fn is_stabilizing(&self) -> bool {
        self.stabilizing
    }

    pub fn reset(&mut self) {
        self.last_stable = None;
        self.last_stable_ms = 0;
        self.stabilizing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::test_support::standing_pose;

    fn guard() -> StabilityGuard {
        StabilityGuard::new(StabilityConfig::default(), 0.5, OutOfFrameConfig::default())
    }

    fn occluded(mut pose: Pose) -> Pose {
        for idx in [LandmarkIndex::Nose, LandmarkIndex::LeftHip, LandmarkIndex::RightHip] {
            pose[idx].visibility = 0.1;
        }
        pose
    }

    #[test]
    fn test_visible_pose_is_stable() {
        let mut g = guard();
        assert_eq!(g.check(&standing_pose(), 0), StabilityOutcome::Stable);
        assert!(!g.is_stabilizing());
        assert!(g.last_stable().is_some());
    }

    #[test]
    fn test_no_stable_pose_is_unstable() {
        let mut g = guard();
        assert_eq!(g.check(&occluded(standing_pose()), 0), StabilityOutcome::Unstable);
        assert!(g.is_stabilizing());
    }

    #[test]
    fn test_fallback_between_raw_and_stable() {
        let mut g = guard();
        let stable = standing_pose();
        g.check(&stable, 0);

        let mut raw = occluded(standing_pose());
        for lm in raw.landmarks.iter_mut() {
            lm.x += 0.1;
        }
        let out = match g.check(&raw, 100) {
            StabilityOutcome::Fallback(p) => p,
            other => panic!("expected fallback, got {:?}", other),
        };
        for i in 0..LandmarkIndex::COUNT {
            let (lo, hi) = (stable.landmarks[i].x, raw.landmarks[i].x);
            let x = out.landmarks[i].x;
            assert!(x > lo && x < hi, "point {} x={} not in ({}, {})", i, x, lo, hi);
        }
        // 低visibilityの鼻は可視の肩より強く安定ポーズへ寄る
        let nose_shift = raw[LandmarkIndex::Nose].x - out[LandmarkIndex::Nose].x;
        let shoulder_shift = raw[LandmarkIndex::LeftShoulder].x - out[LandmarkIndex::LeftShoulder].x;
        assert!((nose_shift - 0.08).abs() < 1e-5);
        assert!((shoulder_shift - 0.03).abs() < 1e-5);
    }

    #[test]
    fn test_stable_pose_expires() {
        let mut g = guard();
        g.check(&standing_pose(), 0);
        assert_eq!(g.check(&occluded(standing_pose()), 600), StabilityOutcome::Unstable);
    }

    #[test]
    fn test_out_of_frame_points_keep_previous_stable_value() {
        let mut g = guard();
        g.check(&standing_pose(), 0);

        let mut next = standing_pose();
        next[LandmarkIndex::LeftWrist].x = 0.99;
        next[LandmarkIndex::RightWrist].presence = 0.1;
        next[LandmarkIndex::RightWrist].x = 0.2;
        next[LandmarkIndex::LeftElbow].x = 0.7;
        g.check(&next, 33);

        let stable = g.last_stable().unwrap();
        assert_eq!(stable[LandmarkIndex::LeftWrist].x, 0.67);
        assert_eq!(stable[LandmarkIndex::RightWrist].x, 0.33);
        assert_eq!(stable[LandmarkIndex::LeftElbow].x, 0.7);
    }

    #[test]
    fn test_reset_clears_stable_pose() {
        let mut g = guard();
        g.check(&standing_pose(), 0);
        g.reset();
        assert!(g.last_stable().is_none());
        assert_eq!(g.check(&occluded(standing_pose()), 10), StabilityOutcome::Unstable);
    }
}

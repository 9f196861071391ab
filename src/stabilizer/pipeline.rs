use crate::config::StabilizerConfig;
use crate::geometry::wrap_degrees;
use crate::pose::{Pose, PoseFrame};

use super::constraints;
use super::crossover::{LimbPair, LimbPairTracker};
use super::legs::LegStabilizer;
use super::orientation::{self, OrientationTracker};
use super::out_of_frame;
use super::prediction::MissingPointPredictor;
use super::proportion::{ArmRaiseDetector, ProportionAdjuster};
use super::smooth::TemporalSmoother;
use super::stability::{StabilityGuard, StabilityOutcome};

/// 1人分のランドマーク安定化パイプライン
///
/// 各フレームに対して以下を固定順で適用する:
/// レートゲート → 腕上げ判定 → 安定判定 → 腕の交差補正 → フレーム外処理 →
/// 欠損予測 → 解剖学的拘束 → 脚の安定化 → 向きの計測と安定化 →
/// 時間平滑化 → 比率補正
///
/// 状態は人物トラックの開始時に作り、トラックが消えた時だけ [`reset`](Self::reset) する。
pub struct LandmarkStabilizer {
    config: StabilizerConfig,
    last_admitted_ms: Option<u64>,
    arm_raise: ArmRaiseDetector,
    stability: StabilityGuard,
    arms: LimbPairTracker,
    prediction: MissingPointPredictor,
    legs: LegStabilizer,
    orientation: OrientationTracker,
    smoother: TemporalSmoother,
    proportion: ProportionAdjuster,
    last_output: Option<Pose>,
}

impl LandmarkStabilizer {
    pub fn new() -> Self {
        Self::from_config(StabilizerConfig::default())
    }

    pub fn from_config(config: StabilizerConfig) -> Self {
        let threshold = config.visibility_threshold;
        Self {
            last_admitted_ms: None,
            arm_raise: ArmRaiseDetector::new(config.arm_raise.threshold),
            stability: StabilityGuard::new(
                config.stability.clone(),
                threshold,
                config.out_of_frame.clone(),
            ),
            arms: LimbPairTracker::new(
                LimbPair::Arms,
                config.crossover.velocity_window,
                config.crossover.correction_blend,
                threshold,
            ),
            prediction: MissingPointPredictor::new(config.prediction.clone()),
            legs: LegStabilizer::new(&config.legs, threshold),
            orientation: OrientationTracker::new(config.orientation.clone(), threshold),
            smoother: TemporalSmoother::from_config(&config.smoothing),
            proportion: ProportionAdjuster::new(config.proportion.clone()),
            last_output: None,
            config,
        }
    }

    /// 1フレーム分を処理して補正後のポーズを返す
    ///
    /// 33点ちょうどでないフレームと、レートゲートで弾かれたフレームは
    /// 状態を変えずにそのまま返す。
    pub fn process(&mut self, frame: &PoseFrame) -> Pose {
        if !frame.pose.is_complete() {
            tracing::debug!(len = frame.pose.len(), "incomplete pose, passing through");
            return frame.pose.clone();
        }

        let ts = frame.timestamp_ms;
        if self.config.min_frame_interval_ms > 0 {
            if let Some(last) = self.last_admitted_ms {
                if ts.saturating_sub(last) < self.config.min_frame_interval_ms {
                    return frame.pose.clone();
                }
            }
        }
        self.last_admitted_ms = Some(ts);

        let raising_arms = self.arm_raise.update(&frame.pose);

        if let StabilityOutcome::Fallback(pose) = self.stability.check(&frame.pose, ts) {
            self.last_output = Some(pose.clone());
            return pose;
        }

        let mut pose = frame.pose.clone();
        self.arms.apply(&mut pose);
        out_of_frame::apply(&mut pose, self.stability.last_stable(), &self.config.out_of_frame);
        self.prediction.apply(&mut pose);
        constraints::relax(&mut pose, self.last_output.as_ref(), &self.config.constraints);
        self.legs.apply(&mut pose);

        if let Some(measured) = self.orientation.measure(&pose) {
            let target = self.orientation.update(measured, ts);
            orientation::stabilize(&mut pose, wrap_degrees(target - measured));
        }

        let mut pose = self.smoother.apply(&pose);
        self.proportion.apply(&mut pose, raising_arms);

        self.last_output = Some(pose.clone());
        pose
    }

    /// 体幹が見えず安定ポーズへフォールバックしている（またはすべき）状態か
    pub fn is_stabilizing(&self) -> bool {
        self.stability.is_stabilizing()
    }

    pub fn is_raising_arms(&self) -> bool {
        self.arm_raise.is_raising()
    }

    /// 現在追従中の体の向き（度）
    pub fn orientation(&self) -> Option<f32> {
        self.orientation.angle()
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.last_admitted_ms = None;
        self.arm_raise.reset();
        self.stability.reset();
        self.arms.reset();
        self.prediction.reset();
        self.legs.reset();
        self.orientation.reset();
        self.smoother.reset();
        self.last_output = None;
    }
}

impl Default for LandmarkStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::test_support::standing_pose;
    use crate::pose::{Landmark, LandmarkIndex};

    fn max_delta(a: &Pose, b: &Pose) -> f32 {
        a.landmarks
            .iter()
            .zip(b.landmarks.iter())
            .map(|(p, q)| (p.xy() - q.xy()).norm())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_incomplete_pose_passes_through() {
        let mut stabilizer = LandmarkStabilizer::new();
        let short = Pose::new(vec![Landmark::new(0.3, 0.3, 0.0); 20]);
        let out = stabilizer.process(&PoseFrame::new(short.clone(), 0));
        assert_eq!(out, short);
        assert!(stabilizer.last_output.is_none());
        assert!(stabilizer.last_admitted_ms.is_none());
    }

    #[test]
    fn test_oversized_pose_after_full_window_passes_through() {
        let mut stabilizer = LandmarkStabilizer::new();
        for k in 0..5u64 {
            stabilizer.process(&PoseFrame::new(standing_pose(), k * 33));
        }
        let mut long = standing_pose();
        long.landmarks.push(Landmark::new(0.5, 0.5, 0.0));
        let out = stabilizer.process(&PoseFrame::new(long.clone(), 5 * 33));
        assert_eq!(out, long);
        assert_eq!(stabilizer.last_admitted_ms, Some(4 * 33));

        let next = stabilizer.process(&PoseFrame::new(standing_pose(), 6 * 33));
        assert_eq!(next.len(), LandmarkIndex::COUNT);
    }

    #[test]
    fn test_rate_gate_skips_without_state_change() {
        let config = StabilizerConfig {
            min_frame_interval_ms: 50,
            ..Default::default()
        };
        let mut stabilizer = LandmarkStabilizer::from_config(config);
        stabilizer.process(&PoseFrame::new(standing_pose(), 0));

        let mut early = standing_pose();
        early[LandmarkIndex::Nose].x = 0.9;
        let out = stabilizer.process(&PoseFrame::new(early.clone(), 20));
        assert_eq!(out, early);
        assert_eq!(stabilizer.last_admitted_ms, Some(0));

        stabilizer.process(&PoseFrame::new(standing_pose(), 60));
        assert_eq!(stabilizer.last_admitted_ms, Some(60));
    }

    #[test]
    fn test_constant_input_converges() {
        let mut stabilizer = LandmarkStabilizer::new();
        let input = standing_pose();
        let mut outputs = Vec::new();
        for k in 0..40u64 {
            outputs.push(stabilizer.process(&PoseFrame::new(input.clone(), k * 33)));
        }
        for out in &outputs {
            assert!(max_delta(out, &input) < 0.01, "output drifted from input");
        }
        let early = max_delta(&outputs[6], &outputs[5]);
        let late = max_delta(&outputs[39], &outputs[38]);
        assert!(late < 1e-4, "late change {}", late);
        assert!(late <= early + 1e-6, "change grew: {} -> {}", early, late);
    }

    #[test]
    fn test_fallback_between_raw_and_stable() {
        let mut stabilizer = LandmarkStabilizer::new();
        let stable = standing_pose();
        for k in 0..3u64 {
            stabilizer.process(&PoseFrame::new(stable.clone(), k * 33));
        }
        assert!(!stabilizer.is_stabilizing());

        let mut raw = standing_pose();
        for lm in raw.landmarks.iter_mut() {
            lm.x += 0.05;
        }
        for idx in [LandmarkIndex::Nose, LandmarkIndex::LeftHip, LandmarkIndex::RightHip] {
            raw[idx].visibility = 0.0;
        }
        let out = stabilizer.process(&PoseFrame::new(raw.clone(), 100));
        assert!(stabilizer.is_stabilizing());
        for i in 0..LandmarkIndex::COUNT {
            let x = out.landmarks[i].x;
            assert!(
                x > stable.landmarks[i].x && x < raw.landmarks[i].x,
                "point {} not strictly between",
                i
            );
        }
    }

    #[test]
    fn test_stale_stable_pose_continues_pipeline() {
        let mut stabilizer = LandmarkStabilizer::new();
        stabilizer.process(&PoseFrame::new(standing_pose(), 0));
        let mut raw = standing_pose();
        for idx in [LandmarkIndex::Nose, LandmarkIndex::LeftHip, LandmarkIndex::RightHip] {
            raw[idx].visibility = 0.0;
        }
        stabilizer.process(&PoseFrame::new(raw, 2000));
        assert!(stabilizer.is_stabilizing());
        assert!(stabilizer.orientation().is_some());
    }

    #[test]
    fn test_raising_arms_flag() {
        let mut stabilizer = LandmarkStabilizer::new();
        let mut pose = standing_pose();
        stabilizer.process(&PoseFrame::new(pose.clone(), 0));
        assert!(!stabilizer.is_raising_arms());
        pose[LandmarkIndex::LeftWrist].y -= 0.05;
        pose[LandmarkIndex::RightWrist].y -= 0.05;
        stabilizer.process(&PoseFrame::new(pose, 33));
        assert!(stabilizer.is_raising_arms());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut stabilizer = LandmarkStabilizer::new();
        stabilizer.process(&PoseFrame::new(standing_pose(), 0));
        assert!(stabilizer.orientation().is_some());
        stabilizer.reset();
        assert!(stabilizer.orientation().is_none());
        assert!(stabilizer.last_output.is_none());
        assert!(!stabilizer.is_stabilizing());
    }

    #[test]
    fn test_config_accessor() {
        let config = StabilizerConfig {
            visibility_threshold: 0.7,
            ..Default::default()
        };
        let stabilizer = LandmarkStabilizer::from_config(config);
        assert!((stabilizer.config().visibility_threshold - 0.7).abs() < 1e-6);
    }
}

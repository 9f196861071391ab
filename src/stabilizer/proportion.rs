use crate::config::ProportionConfig;
use crate::geometry::EPSILON;
use crate::pose::{LandmarkIndex, Pose};

/// 両手首が前フレームより上がっているかの判定
pub struct ArmRaiseDetector {
    threshold: f32,
    previous: Option<(f32, f32)>,
    raising: bool,
}

impl ArmRaiseDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            previous: None,
            raising: false,
        }
    }

    pub fn update(&mut self, pose: &Pose) -> bool {
        if !pose.is_complete() {
            return self.raising;
        }
        let left = pose[LandmarkIndex::LeftWrist].y;
        let right = pose[LandmarkIndex::RightWrist].y;
        // yは下向きが正なので、上昇は y の減少
        self.raising = match self.previous {
            Some((prev_left, prev_right)) => {
                prev_left - left > self.threshold && prev_right - right > self.threshold
            }
            None => false,
        };
        self.previous = Some((left, right));
        self.raising
    }

    pub fn is_raising(&self) -> bool {
        self.raising
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.raising = false;
    }
}

/// 頭〜足首の長さに対する肩の高さを一定比率へ少しずつ寄せる
pub struct ProportionAdjuster {
    config: ProportionConfig,
}

impl ProportionAdjuster {
    pub fn new(config: ProportionConfig) -> Self {
        Self { config }
    }

    /// 上半身（肩〜手の点）を縦方向に補正し、その量を返す
    pub fn apply(&self, pose: &mut Pose, raising_arms: bool) -> f32 {
        if !pose.is_complete() {
            return 0.0;
        }
        let nose = pose.xy(LandmarkIndex::Nose);
        let (ankles, shoulders) = match (
            pose.midpoint(LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle),
            pose.midpoint(LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder),
        ) {
            (Some(a), Some(s)) => (a, s),
            _ => return 0.0,
        };
        if (ankles - nose).norm() < EPSILON {
            return 0.0;
        }

        let expected = nose.y + self.config.shoulder_height_ratio * (ankles.y - nose.y);
        let mut shift = (expected - shoulders.y) * self.config.correction_rate;
        if raising_arms {
            shift *= self.config.raising_arms_factor;
        }

        for &idx in LandmarkIndex::UPPER_BODY.iter() {
            pose[idx].y += shift;
        }
        shift
    }
}

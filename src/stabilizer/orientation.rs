use crate::config::OrientationConfig;
use crate::geometry::{rotate_about, rotation_components, wrap_degrees, Vec2, EPSILON};
use crate::pose::{LandmarkIndex, Pose};

/// 体の向き（左右ペアの方向角、度）の推定と慣性付き追従
///
/// 腰ペアを基準（チェーンレベル0）とし、腰が見えない時だけ肩ペア
/// （レベル1）を加える。各ペアの左→右方向を min(visibility) × 重要度 ×
/// chain_decay^level で重み付けした単位ベクトル平均を角度にする。
pub struct OrientationTracker {
    config: OrientationConfig,
    visibility_threshold: f32,
    angle: Option<f32>,
    last_update_ms: Option<u64>,
}

impl OrientationTracker {
    pub fn new(config: OrientationConfig, visibility_threshold: f32) -> Self {
        Self {
            config,
            visibility_threshold,
            angle: None,
            last_update_ms: None,
        }
    }

    /// 現在のポーズから向きを計測する。方向が定まらなければNone
    pub fn measure(&self, pose: &Pose) -> Option<f32> {
        if !pose.is_complete() {
            return None;
        }

        let hips_visible = pose[LandmarkIndex::LeftHip].is_visible(self.visibility_threshold)
            && pose[LandmarkIndex::RightHip].is_visible(self.visibility_threshold);

        let mut pairs = vec![(LandmarkIndex::LeftHip, LandmarkIndex::RightHip, self.config.hip_weight, 0)];
        if !hips_visible {
            pairs.push((
                LandmarkIndex::LeftShoulder,
                LandmarkIndex::RightShoulder,
                self.config.shoulder_weight,
                1,
            ));
        }

        let mut sum = Vec2::zeros();
        let mut total = 0.0;
        for (left, right, importance, level) in pairs {
            let dir = pose.xy(left) - pose.xy(right);
            let len = dir.norm();
            if len < EPSILON {
                continue;
            }
            let confidence = pose[left].visibility.min(pose[right].visibility);
            let weight = confidence * importance * self.config.chain_decay.powi(level);
            sum += dir / len * weight;
            total += weight;
        }

        if total < EPSILON || sum.norm() < EPSILON {
            return None;
        }
        Some(sum.y.atan2(sum.x).to_degrees())
    }

    /// 計測値で向きを更新し、追従後の目標角度を返す
    ///
    /// 変化量は `1 - inertia` 倍に抑え、`extreme_delta_degrees` を超える急変は
    /// さらに `max_rotation_per_second × dt` で制限する。
    pub fn update(&mut self, measured: f32, timestamp_ms: u64) -> f32 {
        let dt_ms = match self.last_update_ms {
            Some(last) if timestamp_ms > last => timestamp_ms - last,
            _ => self.config.frame_interval_ms,
        };
        self.last_update_ms = Some(timestamp_ms);

        let previous = match self.angle {
            Some(previous) => previous,
            None => {
                self.angle = Some(measured);
                return measured;
            }
        };

        let delta = wrap_degrees(measured - previous);
        let mut step = delta * (1.0 - self.config.inertia);
        if delta.abs() > self.config.extreme_delta_degrees {
            let cap = self.config.max_rotation_per_second * dt_ms as f32 / 1000.0;
            step = step.clamp(-cap, cap);
            tracing::debug!(delta, step, "orientation jump capped");
        }

        let angle = wrap_degrees(previous + step);
        self.angle = Some(angle);
        angle
    }

    pub fn angle(&self) -> Option<f32> {
        self.angle
    }

    pub fn reset(&mut self) {
        self.angle = None;
        self.last_update_ms = None;
    }
}

/// 腰の中点を中心に全点を `rotation_degrees` だけ剛体回転する
pub fn stabilize(pose: &mut Pose, rotation_degrees: f32) {
    if !pose.is_complete() || rotation_degrees.abs() < EPSILON {
        return;
    }
    let pivot = match pose.midpoint(LandmarkIndex::LeftHip, LandmarkIndex::RightHip) {
        Some(pivot) => pivot,
        None => return,
    };
    let rotation = rotation_components(rotation_degrees);
    for lm in pose.landmarks.iter_mut() {
        lm.set_xy(rotate_about(lm.xy(), pivot, rotation));
    }
}

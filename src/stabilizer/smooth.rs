use std::collections::VecDeque;

use crate::config::SmoothingConfig;
use crate::pose::Pose;

/// 直近Nフレームの線形加重平均による時間方向の平滑化
///
/// 重みは古い順に 1, 2, ..., n。最新フレームからのオフセットとして平均を
/// 取るため、一定入力はそのまま再現される。
/// ウィンドウが埋まるまでは入力をそのまま返す。
pub struct TemporalSmoother {
    window: usize,
    history: VecDeque<Pose>,
}

impl TemporalSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            history: VecDeque::with_capacity(window),
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.window)
    }

    pub fn apply(&mut self, pose: &Pose) -> Pose {
        if !pose.is_complete() {
            return pose.clone();
        }
        // 点数が変わったら過去フレームとは対応が取れない
        if self.history.iter().any(|frame| frame.len() != pose.len()) {
            self.history.clear();
        }

        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(pose.clone());

        if self.history.len() < self.window {
            return pose.clone();
        }

        let total_weight: f32 = (1..=self.history.len()).map(|w| w as f32).sum();
        let mut result = pose.clone();

        for (i, newest) in pose.landmarks.iter().enumerate() {
            let mut dx = 0.0;
            let mut dy = 0.0;
            let mut dz = 0.0;
            let mut dv = 0.0;
            for (k, frame) in self.history.iter().enumerate() {
                let w = (k + 1) as f32;
                let lm = &frame.landmarks[i];
                dx += w * (lm.x - newest.x);
                dy += w * (lm.y - newest.y);
                dz += w * (lm.z - newest.z);
                dv += w * (lm.visibility - newest.visibility);
            }
            let out = &mut result.landmarks[i];
            out.x = newest.x + dx / total_weight;
            out.y = newest.y + dy / total_weight;
            out.z = newest.z + dz / total_weight;
            out.visibility = newest.visibility + dv / total_weight;
        }

        result
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

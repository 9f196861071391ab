use std::collections::VecDeque;

use crate::config::PredictionConfig;
use crate::geometry::{clamp_norm, mean, Vec2};
use crate::pose::{LandmarkIndex, Pose};

/// まとめて欠損判定・予測する点のグループ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointGroup {
    LeftWrist,
    RightWrist,
    LeftAnkle,
    RightAnkle,
    Face,
}

impl PointGroup {
    pub fn points(self) -> &'static [LandmarkIndex] {
        match self {
            PointGroup::LeftWrist => &[LandmarkIndex::LeftWrist],
            PointGroup::RightWrist => &[LandmarkIndex::RightWrist],
            PointGroup::LeftAnkle => &[LandmarkIndex::LeftAnkle],
            PointGroup::RightAnkle => &[LandmarkIndex::RightAnkle],
            PointGroup::Face => &LandmarkIndex::FACE,
        }
    }
}

struct GroupTrack {
    group: PointGroup,
    /// 最後の有効位置、欠損中は最後の予測位置
    positions: Option<Vec<Vec2>>,
    /// グループ重心の1フレームあたりの移動量
    velocities: VecDeque<Vec2>,
    missing: u32,
}

impl GroupTrack {
    fn new(group: PointGroup) -> Self {
        Self {
            group,
            positions: None,
            velocities: VecDeque::new(),
            missing: 0,
        }
    }

    fn observe(&mut self, pose: &Pose, window: usize) {
        let current: Vec<Vec2> = self.group.points().iter().map(|&i| pose.xy(i)).collect();
        if self.missing == 0 {
            if let Some(prev) = &self.positions {
                if let (Some(now), Some(before)) = (mean(current.iter().copied()), mean(prev.iter().copied())) {
                    if self.velocities.len() == window {
                        self.velocities.pop_front();
                    }
                    self.velocities.push_back(now - before);
                }
            }
        }
        self.positions = Some(current);
        self.missing = 0;
    }

    fn predict(&mut self, pose: &mut Pose, config: &PredictionConfig) -> bool {
        self.missing = self.missing.saturating_add(1);
        if self.missing > config.max_missing_frames {
            return false;
        }

        let falloff = config.decay.powi(self.missing as i32);
        let confidence = config.base_confidence * falloff;
        if confidence < config.min_confidence {
            return false;
        }

        let velocity = match mean(self.velocities.iter().copied()) {
            Some(v) => clamp_norm(v, config.max_velocity) * falloff,
            None => return false,
        };
        let positions = match &mut self.positions {
            Some(positions) => positions,
            None => return false,
        };

        for (p, &idx) in positions.iter_mut().zip(self.group.points()) {
            *p += velocity;
            pose.set_xy(idx, *p);
            pose[idx].visibility = confidence;
        }
        true
    }

    fn reset(&mut self) {
        self.positions = None;
        self.velocities.clear();
        self.missing = 0;
    }
}

/// 末端（手首・足首）と顔の欠損を直前の速度から外挿して埋める
///
/// 欠損フレームごとに移動量と信頼度を `decay` で減衰させ、
/// `max_missing_frames` を超えるか信頼度が `min_confidence` を下回ったら諦める。
pub struct MissingPointPredictor {
    config: PredictionConfig,
    tracks: Vec<GroupTrack>,
}

impl MissingPointPredictor {
    pub fn new(config: PredictionConfig) -> Self {
        let mut groups = vec![
            PointGroup::LeftWrist,
            PointGroup::RightWrist,
            PointGroup::LeftAnkle,
            PointGroup::RightAnkle,
        ];
        if config.predict_face {
            groups.push(PointGroup::Face);
        }
        Self {
            tracks: groups.into_iter().map(GroupTrack::new).collect(),
            config,
        }
    }

    pub fn apply(&mut self, pose: &mut Pose) {
        if !pose.is_complete() {
            return;
        }

        let window = self.config.velocity_window.max(1);
        for track in self.tracks.iter_mut() {
            let points = track.group.points();
            let visibility =
                points.iter().map(|&i| pose[i].visibility).sum::<f32>() / points.len() as f32;

            if visibility >= self.config.confidence_floor {
                track.observe(pose, window);
            } else if track.predict(pose, &self.config) {
                tracing::debug!(group = ?track.group, missing = track.missing, "predicted missing points");
            }
        }
    }

    /// 現在欠損が続いているフレーム数
    pub fn missing_frames(&self, group: PointGroup) -> Option<u32> {
        self.tracks.iter().find(|t| t.group == group).map(|t| t.missing)
    }

    pub fn reset(&mut self) {
        for track in self.tracks.iter_mut() {
            track.reset();
        }
    }
}

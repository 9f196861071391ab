use std::collections::VecDeque;

use crate::geometry::{mean, segments_intersect, Vec2};
use crate::pose::{LandmarkIndex, Pose};

/// 付け根→中間→末端 の3点
type Chain = [Vec2; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimbPair {
    Arms,
    Legs,
}

impl LimbPair {
    /// (左チェーン, 右チェーン)
    pub fn chains(self) -> ([LandmarkIndex; 3], [LandmarkIndex; 3]) {
        use LandmarkIndex::*;
        match self {
            LimbPair::Arms => (
                [LeftShoulder, LeftElbow, LeftWrist],
                [RightShoulder, RightElbow, RightWrist],
            ),
            LimbPair::Legs => (
                [LeftHip, LeftKnee, LeftAnkle],
                [RightHip, RightKnee, RightAnkle],
            ),
        }
    }
}

/// 左右の手足が交差した時のラベル入れ替わりを、直前の速度から補正する
///
/// 交差していない間は最後の有効チェーンと速度履歴を更新する。
/// 交差中は速度から各チェーンの位置を予測し、現在の左の末端側（肘・手首、
/// 膝・足首）が右の予測に近ければ、左右の末端側を入れ替え方向へ補間する。
/// 付け根（肩・腰）は動かさない。
pub struct LimbPairTracker {
    pair: LimbPair,
    velocity_window: usize,
    correction_blend: f32,
    visibility_threshold: f32,
    last_valid: Option<(Chain, Chain)>,
    velocities: VecDeque<(Chain, Chain)>,
}

impl LimbPairTracker {
    pub fn new(pair: LimbPair, velocity_window: usize, correction_blend: f32, visibility_threshold: f32) -> Self {
        let velocity_window = velocity_window.max(1);
        Self {
            pair,
            velocity_window,
            correction_blend,
            visibility_threshold,
            last_valid: None,
            velocities: VecDeque::with_capacity(velocity_window),
        }
    }

    /// 補正を行った場合 true
    pub fn apply(&mut self, pose: &mut Pose) -> bool {
        if !pose.is_complete() {
            return false;
        }

        let (left_idx, right_idx) = self.pair.chains();
        let left = left_idx.map(|i| pose.xy(i));
        let right = right_idx.map(|i| pose.xy(i));

        if chains_cross(&left, &right) {
            return self.correct(pose, &left, &right);
        }

        let all_visible = left_idx
            .iter()
            .chain(right_idx.iter())
            .all(|&i| pose[i].is_visible(self.visibility_threshold));
        if all_visible {
            if let Some((last_left, last_right)) = &self.last_valid {
                if self.velocities.len() == self.velocity_window {
                    self.velocities.pop_front();
                }
                self.velocities
                    .push_back((sub_chain(&left, last_left), sub_chain(&right, last_right)));
            }
            self.last_valid = Some((left, right));
        }
        false
    }

    fn correct(&self, pose: &mut Pose, left: &Chain, right: &Chain) -> bool {
        let (last_left, last_right) = match &self.last_valid {
            Some(last) if !self.velocities.is_empty() => last,
            _ => return false,
        };

        let (vel_left, vel_right) = self.mean_velocity();
        let predicted_left = add_chain(last_left, &vel_left);
        let predicted_right = add_chain(last_right, &vel_right);

        let to_own: f32 = (1..3).map(|k| (left[k] - predicted_left[k]).norm()).sum();
        let to_other: f32 = (1..3).map(|k| (left[k] - predicted_right[k]).norm()).sum();
        if to_other >= to_own {
            return false;
        }

        let (left_idx, right_idx) = self.pair.chains();
        // 深度・信頼度も一緒に入れ替える
        for k in 1..3 {
            let l = pose[left_idx[k]];
            let r = pose[right_idx[k]];
            pose[left_idx[k]] = l.lerp(&r, self.correction_blend);
            pose[right_idx[k]] = r.lerp(&l, self.correction_blend);
        }
        tracing::debug!(pair = ?self.pair, to_own, to_other, "limb labels swapped");
        true
    }

    fn mean_velocity(&self) -> (Chain, Chain) {
        let mut left = [Vec2::zeros(); 3];
        let mut right = [Vec2::zeros(); 3];
        for k in 0..3 {
            left[k] = mean(self.velocities.iter().map(|(l, _)| l[k])).unwrap_or_else(Vec2::zeros);
            right[k] = mean(self.velocities.iter().map(|(_, r)| r[k])).unwrap_or_else(Vec2::zeros);
        }
        (left, right)
    }

    pub fn reset(&mut self) {
        self.last_valid = None;
        self.velocities.clear();
    }
}

fn chains_cross(left: &Chain, right: &Chain) -> bool {
    (0..2).any(|i| (0..2).any(|j| segments_intersect(left[i], left[i + 1], right[j], right[j + 1])))
}

fn sub_chain(a: &Chain, b: &Chain) -> Chain {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add_chain(a: &Chain, b: &Chain) -> Chain {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::test_support::{approx_eq, standing_pose};

    fn arms_frame(k: f32) -> Pose {
        let mut pose = standing_pose();
        pose.set_xy(LandmarkIndex::LeftShoulder, Vec2::new(0.6, 0.3));
        pose.set_xy(LandmarkIndex::RightShoulder, Vec2::new(0.4, 0.3));
        pose.set_xy(LandmarkIndex::LeftElbow, Vec2::new(0.65, 0.45));
        pose.set_xy(LandmarkIndex::RightElbow, Vec2::new(0.35, 0.45));
        pose.set_xy(LandmarkIndex::LeftWrist, Vec2::new(0.60 - 0.03 * k, 0.6));
        pose.set_xy(LandmarkIndex::RightWrist, Vec2::new(0.40 + 0.03 * k, 0.6));
        pose
    }

    fn swap_distal(pose: &mut Pose) {
        use LandmarkIndex::*;
        for (l, r) in [(LeftElbow, RightElbow), (LeftWrist, RightWrist)] {
            let tmp = pose[l];
            pose[l] = pose[r];
            pose[r] = tmp;
        }
    }

    #[test]
    fn test_uncrossed_limbs_untouched() {
        let mut tracker = LimbPairTracker::new(LimbPair::Arms, 3, 0.7, 0.5);
        for k in 0..4 {
            let mut pose = arms_frame(k as f32);
            let before = pose.clone();
            assert!(!tracker.apply(&mut pose));
            assert_eq!(pose, before);
        }
        assert_eq!(tracker.velocities.len(), 3);
    }

    #[test]
    fn test_swapped_labels_follow_velocity() {
        let mut tracker = LimbPairTracker::new(LimbPair::Arms, 3, 0.7, 0.5);
        for k in 0..3 {
            tracker.apply(&mut arms_frame(k as f32));
        }

        let mut pose = arms_frame(3.0);
        pose[LandmarkIndex::LeftElbow].z = -0.1;
        pose[LandmarkIndex::LeftElbow].visibility = 0.9;
        pose[LandmarkIndex::RightElbow].z = 0.2;
        pose[LandmarkIndex::RightElbow].visibility = 0.6;
        swap_distal(&mut pose);
        assert!(tracker.apply(&mut pose));

        let left_elbow = pose[LandmarkIndex::LeftElbow].x;
        assert!(approx_eq(left_elbow, 0.56, 1e-5), "got {}", left_elbow);
        assert!((left_elbow - 0.65).abs() < (left_elbow - 0.35).abs());
        let right_elbow = pose[LandmarkIndex::RightElbow].x;
        assert!(approx_eq(right_elbow, 0.44, 1e-5), "got {}", right_elbow);
        // 深度とvisibilityも実際の左腕の値へ寄る
        let left = pose[LandmarkIndex::LeftElbow];
        assert!(approx_eq(left.z, -0.01, 1e-5), "got {}", left.z);
        assert!(approx_eq(left.visibility, 0.81, 1e-5), "got {}", left.visibility);
        let right = pose[LandmarkIndex::RightElbow];
        assert!(approx_eq(right.z, 0.11, 1e-5), "got {}", right.z);
        assert!(approx_eq(right.visibility, 0.69, 1e-5), "got {}", right.visibility);
        // 付け根は動かさない
        assert_eq!(pose[LandmarkIndex::LeftShoulder].x, 0.6);
        assert_eq!(pose[LandmarkIndex::RightShoulder].x, 0.4);
    }

    #[test]
    fn test_crossing_without_history_is_noop() {
        let mut tracker = LimbPairTracker::new(LimbPair::Arms, 3, 0.7, 0.5);
        let mut pose = arms_frame(0.0);
        swap_distal(&mut pose);
        let before = pose.clone();
        assert!(!tracker.apply(&mut pose));
        assert_eq!(pose, before);
    }

    #[test]
    fn test_invisible_points_do_not_update_history() {
        let mut tracker = LimbPairTracker::new(LimbPair::Arms, 3, 0.7, 0.5);
        let mut pose = arms_frame(0.0);
        pose[LandmarkIndex::RightWrist].visibility = 0.2;
        tracker.apply(&mut pose);
        assert!(tracker.last_valid.is_none());
    }

    #[test]
    fn test_leg_chains() {
        let (left, right) = LimbPair::Legs.chains();
        assert_eq!(left[2], LandmarkIndex::LeftAnkle);
        assert_eq!(right[0], LandmarkIndex::RightHip);
    }
}

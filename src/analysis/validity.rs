use crate::config::ValidityConfig;
use crate::geometry::EPSILON;
use crate::pose::{LandmarkIndex, Pose};

use super::joint_angle::{joint_angle, Joint};

/// 肩幅/身長比と肘・膝の角度が人体として妥当な範囲にあるか
pub fn is_pose_valid(pose: &Pose, config: &ValidityConfig) -> bool {
    if !pose.is_complete() {
        return false;
    }

    let shoulder_width =
        (pose.xy(LandmarkIndex::LeftShoulder) - pose.xy(LandmarkIndex::RightShoulder)).norm();
    let height = match pose.midpoint(LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle) {
        Some(ankles) => (ankles - pose.xy(LandmarkIndex::Nose)).norm(),
        None => return false,
    };
    if height < EPSILON {
        return false;
    }

    let ratio = shoulder_width / height;
    if ratio < config.min_shoulder_ratio || ratio > config.max_shoulder_ratio {
        return false;
    }

    let in_range = |joint: Joint, [min, max]: [f32; 2]| {
        joint_angle(pose, joint).map_or(false, |angle| angle >= min && angle <= max)
    };
    in_range(Joint::LeftElbow, config.elbow_angle_range)
        && in_range(Joint::RightElbow, config.elbow_angle_range)
        && in_range(Joint::LeftKnee, config.knee_angle_range)
        && in_range(Joint::RightKnee, config.knee_angle_range)
}

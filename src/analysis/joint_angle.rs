use serde::Serialize;
use std::collections::BTreeMap;

use crate::geometry::angle_degrees;
use crate::pose::{LandmarkIndex, Pose};

/// 角度を計測する関節
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    LeftElbow,
    RightElbow,
    LeftKnee,
    RightKnee,
    LeftHip,
    RightHip,
    LeftShoulder,
    RightShoulder,
}

impl Joint {
    pub const ALL: [Joint; 8] = [
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftShoulder,
        Joint::RightShoulder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
        }
    }

    /// (端点, 頂点, 端点)
    pub fn landmarks(self) -> (LandmarkIndex, LandmarkIndex, LandmarkIndex) {
        use LandmarkIndex::*;
        match self {
            Joint::LeftElbow => (LeftShoulder, LeftElbow, LeftWrist),
            Joint::RightElbow => (RightShoulder, RightElbow, RightWrist),
            Joint::LeftKnee => (LeftHip, LeftKnee, LeftAnkle),
            Joint::RightKnee => (RightHip, RightKnee, RightAnkle),
            Joint::LeftHip => (LeftShoulder, LeftHip, LeftKnee),
            Joint::RightHip => (RightShoulder, RightHip, RightKnee),
            Joint::LeftShoulder => (LeftElbow, LeftShoulder, LeftHip),
            Joint::RightShoulder => (RightElbow, RightShoulder, RightHip),
        }
    }
}

pub fn joint_angle(pose: &Pose, joint: Joint) -> Option<f32> {
    if !pose.is_complete() {
        return None;
    }
    let (a, b, c) = joint.landmarks();
    Some(angle_degrees(pose.xy(a), pose.xy(b), pose.xy(c)))
}

/// 全関節の角度。33点ちょうどでないポーズでは空
pub fn analyze_all_joints(pose: &Pose) -> BTreeMap<Joint, f32> {
    Joint::ALL
        .iter()
        .filter_map(|&joint| joint_angle(pose, joint).map(|angle| (joint, angle)))
        .collect()
}

use serde::Deserialize;

use super::landmark::{Pose, RawLandmark};

/// パイプラインへの入力単位
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    pub pose: Pose,
    /// 単調増加するタイムスタンプ（ミリ秒）
    pub timestamp_ms: u64,
    /// 推論にかかった時間（ミリ秒）
    pub inference_ms: Option<f32>,
}

impl PoseFrame {
    pub fn new(pose: Pose, timestamp_ms: u64) -> Self {
        Self {
            pose,
            timestamp_ms,
            inference_ms: None,
        }
    }

    pub fn with_inference_ms(mut self, inference_ms: f32) -> Self {
        self.inference_ms = Some(inference_ms);
        self
    }
}

/// JSON Lines 1行分のフレーム
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub inference_ms: Option<f32>,
    /// 追跡中の人物スロット
    #[serde(default)]
    pub person: u32,
    pub landmarks: Vec<RawLandmark>,
}

impl From<RawFrame> for PoseFrame {
    fn from(raw: RawFrame) -> Self {
        PoseFrame {
            pose: Pose::from_raw(raw.landmarks),
            timestamp_ms: raw.timestamp_ms,
            inference_ms: raw.inference_ms,
        }
    }
}

use crate::config::OutOfFrameConfig;
use crate::pose::{Landmark, Pose};

/// presenceが低い、またはXが画像の左右端にかかっている点はフレーム外
pub fn is_out_of_frame(landmark: &Landmark, config: &OutOfFrameConfig) -> bool {
    landmark.presence < config.presence_threshold
        || landmark.x < config.border_margin
        || landmark.x > 1.0 - config.border_margin
}

/// フレーム外の点のXだけを安定ポーズのXへ寄せる。Y/Zはそのまま
pub fn apply(pose: &mut Pose, stable: Option<&Pose>, config: &OutOfFrameConfig) {
    let stable = match stable {
        Some(stable) if pose.is_complete() && stable.len() == pose.len() => stable,
        _ => return,
    };

    for (lm, anchor) in pose.landmarks.iter_mut().zip(stable.landmarks.iter()) {
        if is_out_of_frame(lm, config) {
            lm.x += (anchor.x - lm.x) * config.horizontal_decay;
        }
    }
}

use crate::config::ConstraintConfig;
use crate::geometry::Vec2;
use crate::pose::{LandmarkIndex, Pose};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flexibility {
    Head,
    Shoulder,
}

/// 点とその位置を決めるアンカー（重み付き）
struct Link {
    point: LandmarkIndex,
    anchors: &'static [(LandmarkIndex, f32)],
    flexibility: Flexibility,
}

const LINKS: [Link; 3] = [
    // 首（両肩の中点）
    Link {
        point: LandmarkIndex::Nose,
        anchors: &[(LandmarkIndex::LeftShoulder, 0.5), (LandmarkIndex::RightShoulder, 0.5)],
        flexibility: Flexibility::Head,
    },
    Link {
        point: LandmarkIndex::LeftShoulder,
        anchors: &[(LandmarkIndex::RightShoulder, 0.5), (LandmarkIndex::LeftHip, 0.5)],
        flexibility: Flexibility::Shoulder,
    },
    Link {
        point: LandmarkIndex::RightShoulder,
        anchors: &[(LandmarkIndex::LeftShoulder, 0.5), (LandmarkIndex::RightHip, 0.5)],
        flexibility: Flexibility::Shoulder,
    },
];

fn anchor_position(pose: &Pose, anchors: &[(LandmarkIndex, f32)]) -> Vec2 {
    let total: f32 = anchors.iter().map(|(_, w)| w).sum();
    let sum = anchors
        .iter()
        .fold(Vec2::zeros(), |acc, &(idx, w)| acc + pose.xy(idx) * w);
    if total > 0.0 {
        sum / total
    } else {
        sum
    }
}

/// 頭・肩を、前フレームでのアンカーからの相対位置へ緩く引き戻す
///
/// 移動量は `(期待位置 - 現在位置) * (1 - flexibility)`。クランプはしない。
/// 全リンクの目標は補正前のポーズから計算する。
pub fn relax(pose: &mut Pose, reference: Option<&Pose>, config: &ConstraintConfig) {
    let reference = match reference {
        Some(reference) if pose.is_complete() && reference.is_complete() => reference,
        _ => return,
    };

    let targets: Vec<(LandmarkIndex, Vec2)> = LINKS
        .iter()
        .map(|link| {
            let flexibility = match link.flexibility {
                Flexibility::Head => config.head_flexibility,
                Flexibility::Shoulder => config.shoulder_flexibility,
            };
            let offset = reference.xy(link.point) - anchor_position(reference, link.anchors);
            let expected = anchor_position(pose, link.anchors) + offset;
            let current = pose.xy(link.point);
            (link.point, current + (expected - current) * (1.0 - flexibility))
        })
        .collect();

    for (idx, p) in targets {
        pose.set_xy(idx, p);
    }
}

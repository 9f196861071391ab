use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use crate::geometry::{vec2, Vec2};

/// MediaPipe Pose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub const ALL: [LandmarkIndex; Self::COUNT] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye,
            RightEyeOuter, LeftEar, RightEar, MouthLeft, MouthRight,
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            LeftPinky, RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb,
            LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ]
    };

    /// 顔の点（鼻・目・耳・口）
    pub const FACE: [LandmarkIndex; 11] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye,
            RightEyeOuter, LeftEar, RightEar, MouthLeft, MouthRight,
        ]
    };

    /// 上半身グループ（肩〜手の点）
    pub const UPPER_BODY: [LandmarkIndex; 12] = {
        use LandmarkIndex::*;
        [
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            LeftPinky, RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 単一ランドマーク
///
/// visibility / presence は常に定義済み。欠損値の補完は取り込み時
/// （[`RawLandmark`] からの変換）でのみ行う。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0、下向きが正)
    pub y: f32,
    /// 相対深度
    pub z: f32,
    /// この点が該当関節である信頼度
    pub visibility: f32,
    /// この点がフレーム内にある信頼度
    pub presence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: 1.0,
            presence: 1.0,
        }
    }

    pub fn with_confidence(mut self, visibility: f32, presence: f32) -> Self {
        self.visibility = visibility;
        self.presence = presence;
        self
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility > threshold
    }

    pub fn xy(&self) -> Vec2 {
        vec2(self.x, self.y)
    }

    pub fn set_xy(&mut self, p: Vec2) {
        self.x = p.x;
        self.y = p.y;
    }

    /// 全フィールドの線形補間
    pub fn lerp(&self, other: &Landmark, t: f32) -> Landmark {
        Landmark {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
            visibility: self.visibility + (other.visibility - self.visibility) * t,
            presence: self.presence + (other.presence - self.presence) * t,
        }
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
            presence: 0.0,
        }
    }
}

/// 検出モデルから受け取る生のランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawLandmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub visibility: Option<f32>,
    #[serde(default)]
    pub presence: Option<f32>,
}

impl From<RawLandmark> for Landmark {
    /// 欠損した信頼度は「完全に存在する」(1.0) とみなす
    fn from(raw: RawLandmark) -> Self {
        Landmark {
            x: raw.x,
            y: raw.y,
            z: raw.z,
            visibility: raw.visibility.unwrap_or(1.0).clamp(0.0, 1.0),
            presence: raw.presence.unwrap_or(1.0).clamp(0.0, 1.0),
        }
    }
}

/// 1人分・1時刻の骨格
///
/// 正常な入力は33点。点数が違うPoseも表現できるが、各ステージは
/// [`Pose::is_complete`] を確認してから固定インデックスでアクセスする。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose {
    pub landmarks: Vec<Landmark>,
}

impl Pose {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn from_raw<I: IntoIterator<Item = RawLandmark>>(raw: I) -> Self {
        Self::new(raw.into_iter().map(Landmark::from).collect())
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// ちょうど33点か。多すぎても少なすぎても不完全扱い
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() == LandmarkIndex::COUNT
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(index as usize)
    }

    pub fn xy(&self, index: LandmarkIndex) -> Vec2 {
        self[index].xy()
    }

    pub fn set_xy(&mut self, index: LandmarkIndex, p: Vec2) {
        self[index].set_xy(p);
    }

    /// 2点の中点。どちらかが無ければNone
    pub fn midpoint(&self, a: LandmarkIndex, b: LandmarkIndex) -> Option<Vec2> {
        let a = self.get(a)?;
        let b = self.get(b)?;
        Some((a.xy() + b.xy()) / 2.0)
    }

    /// 全点の平均visibility
    pub fn average_visibility(&self) -> f32 {
        if self.landmarks.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.landmarks.iter().map(|l| l.visibility).sum();
        sum / self.landmarks.len() as f32
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            landmarks: vec![Landmark::default(); LandmarkIndex::COUNT],
        }
    }
}

impl Index<LandmarkIndex> for Pose {
    type Output = Landmark;

    fn index(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }
}

impl IndexMut<LandmarkIndex> for Pose {
    fn index_mut(&mut self, index: LandmarkIndex) -> &mut Landmark {
        &mut self.landmarks[index as usize]
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stabilizer: StabilizerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// ファイルが無い・壊れている場合はデフォルト値で続行する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("{} not found, using default config", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}

/// 安定化パイプラインの全チューニング値
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// 処理する最小フレーム間隔（ミリ秒）。0でゲート無効
    pub min_frame_interval_ms: u64,
    /// キーポイントを「見えている」とみなすvisibility閾値
    pub visibility_threshold: f32,
    pub stability: StabilityConfig,
    pub arm_raise: ArmRaiseConfig,
    pub crossover: CrossoverConfig,
    pub out_of_frame: OutOfFrameConfig,
    pub prediction: PredictionConfig,
    pub constraints: ConstraintConfig,
    pub legs: LegConfig,
    pub orientation: OrientationConfig,
    pub smoothing: SmoothingConfig,
    pub proportion: ProportionConfig,
    pub validity: ValidityConfig,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            min_frame_interval_ms: 0,
            visibility_threshold: 0.5,
            stability: StabilityConfig::default(),
            arm_raise: ArmRaiseConfig::default(),
            crossover: CrossoverConfig::default(),
            out_of_frame: OutOfFrameConfig::default(),
            prediction: PredictionConfig::default(),
            constraints: ConstraintConfig::default(),
            legs: LegConfig::default(),
            orientation: OrientationConfig::default(),
            smoothing: SmoothingConfig::default(),
            proportion: ProportionConfig::default(),
            validity: ValidityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// 頭・両肩・両腰のうち、安定とみなす最小可視数
    pub min_visible_key_points: usize,
    /// 安定ポーズを保持する時間（ミリ秒）
    pub timeout_ms: u64,
    /// 低visibility点を安定ポーズへ寄せる割合
    pub low_visibility_blend: f32,
    /// 可視点を安定ポーズへ寄せる割合
    pub visible_blend: f32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            min_visible_key_points: 4,
            timeout_ms: 500,
            low_visibility_blend: 0.8,
            visible_blend: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArmRaiseConfig {
    /// 両手首がこの量以上上昇したら腕上げ中と判定（正規化座標）
    pub threshold: f32,
}

impl Default for ArmRaiseConfig {
    fn default() -> Self {
        Self { threshold: 0.01 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    /// 速度履歴の長さ（フレーム）
    pub velocity_window: usize,
    /// 入れ替え補正時の補間係数
    pub correction_blend: f32,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            velocity_window: 3,
            correction_blend: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutOfFrameConfig {
    pub presence_threshold: f32,
    /// 画像端とみなすX方向のマージン
    pub border_margin: f32,
    /// フレーム外の点のXを安定ポーズへ寄せる割合
    pub horizontal_decay: f32,
}

impl Default for OutOfFrameConfig {
    fn default() -> Self {
        Self {
            presence_threshold: 0.5,
            border_margin: 0.02,
            horizontal_decay: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// グループ平均visibilityがこれ未満なら欠損扱い
    pub confidence_floor: f32,
    pub velocity_window: usize,
    pub max_missing_frames: u32,
    /// 欠損1フレームごとの減衰率
    pub decay: f32,
    pub base_confidence: f32,
    pub min_confidence: f32,
    /// 1フレームあたりの最大移動量（正規化座標）
    pub max_velocity: f32,
    /// 顔の点（0〜10）をまとめて予測するか
    pub predict_face: bool,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            velocity_window: 3,
            max_missing_frames: 10,
            decay: 0.8,
            base_confidence: 0.5,
            min_confidence: 0.05,
            max_velocity: 0.05,
            predict_face: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    /// 1.0で拘束なし、0.0で前フレームの相対位置に固定
    pub head_flexibility: f32,
    pub shoulder_flexibility: f32,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            head_flexibility: 0.85,
            shoulder_flexibility: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LegConfig {
    /// 両膝の最小距離（正規化座標）
    pub knee_min_distance: f32,
    pub velocity_window: usize,
    pub correction_blend: f32,
}

impl Default for LegConfig {
    fn default() -> Self {
        Self {
            knee_min_distance: 0.05,
            velocity_window: 3,
            correction_blend: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// 腰ペアの重要度
    pub hip_weight: f32,
    /// 肩ペアの重要度（腰が見えない時のみ使用）
    pub shoulder_weight: f32,
    /// 体幹から末端へ向かう影響チェーンの減衰率
    pub chain_decay: f32,
    /// 前フレームの向きを保持する割合
    pub inertia: f32,
    /// この角度を超える変化は誤検出の可能性が高いとみなす
    pub extreme_delta_degrees: f32,
    /// 急変時の最大回転速度（度/秒）
    pub max_rotation_per_second: f32,
    /// タイムスタンプ差が取れない時のフレーム間隔
    pub frame_interval_ms: u64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            hip_weight: 1.0,
            shoulder_weight: 0.6,
            chain_decay: 0.8,
            inertia: 0.8,
            extreme_delta_degrees: 45.0,
            max_rotation_per_second: 90.0,
            frame_interval_ms: 33,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProportionConfig {
    /// 頭→足首中点の距離に対する、頭→肩の比率
    pub shoulder_height_ratio: f32,
    pub correction_rate: f32,
    /// 腕上げ中の補正量倍率
    pub raising_arms_factor: f32,
}

impl Default for ProportionConfig {
    fn default() -> Self {
        Self {
            shoulder_height_ratio: 0.14,
            correction_rate: 0.1,
            raising_arms_factor: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidityConfig {
    pub min_shoulder_ratio: f32,
    pub max_shoulder_ratio: f32,
    /// 肘角度の許容範囲 [min, max]（度）
    pub elbow_angle_range: [f32; 2],
    /// 膝角度の許容範囲 [min, max]（度）
    pub knee_angle_range: [f32; 2],
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            min_shoulder_ratio: 0.2,
            max_shoulder_ratio: 0.3,
            elbow_angle_range: [15.0, 180.0],
            knee_angle_range: [20.0, 180.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Nフレームに1回サンプリング
    #[serde(default = "default_sample_every")]
    pub sample_every: u32,
    /// Nサンプルごとにスナップショットを出力
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: usize,
    /// 各リストの最大保持数
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_metrics_visibility")]
    pub visibility_threshold: f32,
    /// ジッタ計算を両フレームで見えている点に限定する
    #[serde(default = "default_visible_only")]
    pub visible_only: bool,
    /// スナップショット記録の保存先（未指定なら保存しない）
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_sample_every() -> u32 { 1 }
fn default_snapshot_every() -> usize { 100 }
fn default_max_samples() -> usize { 1000 }
fn default_metrics_visibility() -> f32 { 0.5 }
fn default_visible_only() -> bool { true }

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sample_every: default_sample_every(),
            snapshot_every: default_snapshot_every(),
            max_samples: default_max_samples(),
            visibility_threshold: default_metrics_visibility(),
            visible_only: default_visible_only(),
            output_dir: None,
        }
    }
}

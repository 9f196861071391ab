use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::MetricsConfig;
use crate::pose::Pose;

use super::export;

/// 一定サンプル数ごとの品質指標の平均
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub samples: u64,
    pub avg_inference_ms: f32,
    pub avg_jitter: f32,
    pub avg_confidence: f32,
}

impl MetricsSnapshot {
    pub fn to_map(&self) -> BTreeMap<&'static str, f32> {
        BTreeMap::from([
            ("avg_inference_ms", self.avg_inference_ms),
            ("avg_jitter", self.avg_jitter),
            ("avg_confidence", self.avg_confidence),
        ])
    }

    /// `key: value` 形式の人間向けテキスト
    pub fn to_record(&self, at: &DateTime<Local>) -> String {
        format!(
            "Quality metrics snapshot\n\
             timestamp: {}\n\
             samples: {}\n\
             avg_inference_ms: {:.3}\n\
             avg_jitter: {:.6}\n\
             avg_confidence: {:.3}\n",
            at.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.samples,
            self.avg_inference_ms,
            self.avg_jitter,
            self.avg_confidence,
        )
    }
}

/// 推論時間・ジッタ・平均visibilityの記録
///
/// 各リストは `max_samples` で打ち切る。`snapshot_every` サンプルごとに
/// スナップショットをログへ出し、`output_dir` があればファイルにも書く。
pub struct QualityMetricsLogger {
    config: MetricsConfig,
    frames: u64,
    samples: u64,
    previous: Option<Pose>,
    inference_ms: VecDeque<f32>,
    jitter: VecDeque<f32>,
    confidence: VecDeque<f32>,
}

impl QualityMetricsLogger {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            frames: 0,
            samples: 0,
            previous: None,
            inference_ms: VecDeque::new(),
            jitter: VecDeque::new(),
            confidence: VecDeque::new(),
        }
    }

    /// 1フレーム分を記録する。スナップショットを出した場合はそれを返す
    pub fn record(&mut self, pose: &Pose, inference_ms: Option<f32>) -> Option<MetricsSnapshot> {
        let snapshot = self.sample(pose, inference_ms)?;
        persist(self.config.output_dir.as_deref(), &snapshot);
        Some(snapshot)
    }

    /// 記録とスナップショット作成だけを行う。ファイルには書かない
    pub fn sample(&mut self, pose: &Pose, inference_ms: Option<f32>) -> Option<MetricsSnapshot> {
        let sample_every = u64::from(self.config.sample_every.max(1));
        self.frames += 1;
        if (self.frames - 1) % sample_every != 0 {
            return None;
        }

        let max = self.config.max_samples.max(1);
        if let Some(jitter) = self.jitter_from_previous(pose) {
            push_bounded(&mut self.jitter, jitter, max);
        }
        push_bounded(&mut self.confidence, pose.average_visibility(), max);
        if let Some(ms) = inference_ms {
            push_bounded(&mut self.inference_ms, ms, max);
        }
        self.previous = Some(pose.clone());
        self.samples += 1;

        let every = self.config.snapshot_every as u64;
        if every == 0 || self.samples % every != 0 {
            return None;
        }

        let snapshot = self.snapshot();
        tracing::info!(
            samples = snapshot.samples,
            avg_inference_ms = snapshot.avg_inference_ms,
            avg_jitter = snapshot.avg_jitter,
            avg_confidence = snapshot.avg_confidence,
            "quality metrics"
        );
        Some(snapshot)
    }

    /// 前回サンプルとの対応点の平均移動量
    fn jitter_from_previous(&self, pose: &Pose) -> Option<f32> {
        let previous = self.previous.as_ref()?;
        if previous.len() != pose.len() {
            return None;
        }
        let threshold = self.config.visibility_threshold;
        let (sum, count) = previous
            .landmarks
            .iter()
            .zip(pose.landmarks.iter())
            .filter(|(a, b)| !self.config.visible_only || (a.is_visible(threshold) && b.is_visible(threshold)))
            .fold((0.0f32, 0usize), |(sum, count), (a, b)| {
                (sum + (a.xy() - b.xy()).norm(), count + 1)
            });
        if count == 0 {
            None
        } else {
            Some(sum / count as f32)
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples: self.samples,
            avg_inference_ms: average(&self.inference_ms),
            avg_jitter: average(&self.jitter),
            avg_confidence: average(&self.confidence),
        }
    }

    pub fn averages(&self) -> BTreeMap<&'static str, f32> {
        self.snapshot().to_map()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.config.output_dir.as_deref()
    }

    pub fn reset(&mut self) {
        self.frames = 0;
        self.samples = 0;
        self.previous = None;
        self.inference_ms.clear();
        self.jitter.clear();
        self.confidence.clear();
    }
}

/// スナップショットを書き出す。失敗はログに残して捨てる
fn persist(dir: Option<&Path>, snapshot: &MetricsSnapshot) {
    if let Some(dir) = dir {
        if let Err(e) = export::write_snapshot(dir, snapshot, &Local::now()) {
            tracing::warn!("{:#}", e);
        }
    }
}

fn push_bounded(values: &mut VecDeque<f32>, value: f32, max: usize) {
    if values.len() == max {
        values.pop_front();
    }
    values.push_back(value);
}

fn average(values: &VecDeque<f32>) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// プロセス内で共有するロガーのハンドル
///
/// スナップショットのファイル出力はロックを外してから行う。
#[derive(Clone)]
pub struct SharedQualityLogger {
    inner: Arc<Mutex<QualityMetricsLogger>>,
    output_dir: Option<PathBuf>,
}

impl SharedQualityLogger {
    pub fn new(config: MetricsConfig) -> Self {
        let output_dir = config.output_dir.clone();
        Self {
            inner: Arc::new(Mutex::new(QualityMetricsLogger::new(config))),
            output_dir,
        }
    }

    pub fn record(&self, pose: &Pose, inference_ms: Option<f32>) -> Option<MetricsSnapshot> {
        let snapshot = self.inner.lock().sample(pose, inference_ms)?;
        persist(self.output_dir.as_deref(), &snapshot);
        Some(snapshot)
    }

    pub fn averages(&self) -> BTreeMap<&'static str, f32> {
        self.inner.lock().averages()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }
}

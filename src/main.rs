use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use anthropometry_analyzer::analysis::{analyze_all_joints, is_pose_valid, Joint};
use anthropometry_analyzer::config::Config;
use anthropometry_analyzer::metrics::SharedQualityLogger;
use anthropometry_analyzer::pose::{Pose, PoseFrame, RawFrame};
use anthropometry_analyzer::stabilizer::LandmarkStabilizer;

#[derive(Parser, Debug)]
#[command(name = "anthropometry-analyzer", version = env!("GIT_VERSION"))]
#[command(about = "Stabilize recorded pose landmark streams (JSON Lines)")]
struct Args {
    /// 1行1フレームのJSON Lines
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// 出力先（省略時は標準出力）
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// 関節角度を出力に含める
    #[arg(long)]
    angles: bool,
    /// ポーズの妥当性判定を出力に含める
    #[arg(long)]
    validate: bool,
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    timestamp_ms: u64,
    person: u32,
    landmarks: &'a Pose,
    stabilizing: bool,
    raising_arms: bool,
    orientation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    angles: Option<BTreeMap<Joint, f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid: Option<bool>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let config = Config::load_or_default(&args.config);
    tracing::info!("anthropometry-analyzer {}", env!("GIT_VERSION"));

    let input = File::open(&args.input)
        .with_context(|| format!("Failed to open input: {}", args.input.display()))?;
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let metrics = SharedQualityLogger::new(config.metrics.clone());
    let mut stabilizers: HashMap<u32, LandmarkStabilizer> = HashMap::new();
    let mut frames = 0u64;
    let mut skipped = 0u64;

    for (line_no, line) in BufReader::new(input).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawFrame = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("line {}: skipped malformed frame: {}", line_no + 1, e);
                skipped += 1;
                continue;
            }
        };

        let person = raw.person;
        let frame = PoseFrame::from(raw);
        let stabilizer = stabilizers.entry(person).or_insert_with(|| {
            tracing::debug!(person, "new person track");
            LandmarkStabilizer::from_config(config.stabilizer.clone())
        });
        let pose = stabilizer.process(&frame);
        metrics.record(&pose, frame.inference_ms);

        let record = OutputRecord {
            timestamp_ms: frame.timestamp_ms,
            person,
            landmarks: &pose,
            stabilizing: stabilizer.is_stabilizing(),
            raising_arms: stabilizer.is_raising_arms(),
            orientation: stabilizer.orientation(),
            angles: args.angles.then(|| analyze_all_joints(&pose)),
            valid: args
                .validate
                .then(|| is_pose_valid(&pose, &stabilizer.config().validity)),
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        frames += 1;
    }
    writer.flush()?;

    tracing::info!(
        frames,
        skipped,
        persons = stabilizers.len(),
        "done"
    );
    for (key, value) in metrics.averages() {
        tracing::info!("{}: {:.4}", key, value);
    }
    Ok(())
}

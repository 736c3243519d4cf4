//! `spine-report`: replay recorded detector output through the analysis
//! engine and print the report as JSON.
//!
//! Spine input is a box tensor file, `{"shape": [1, 5, 8400], "data": [...]}`.
//! Posture input is either a pose tensor file of the same form or a map of
//! landmark names to `[x, y]`.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ndarray::{ArrayD, IxDyn};
use serde::Deserialize;
use tracing::{Level, info};

use spineai_rs::analysis::Keypoint;
use spineai_rs::{
    AnalysisConfig, AnalysisKind, AnalysisPipeline, DetectionSource, InputImage, KeypointMap,
    ModelOutput,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration overriding the default thresholds
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze vertebra detections from an X-ray
    Spine {
        /// Box tensor file
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
    },
    /// Analyze body keypoints from a side-profile photo
    Posture {
        /// Pose tensor or keypoint map file
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Deserialize)]
struct TensorFile {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl TensorFile {
    fn into_array(self) -> Result<ArrayD<f32>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data)
            .context("tensor data does not match its shape")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PostureInput {
    Tensor(TensorFile),
    Keypoints(BTreeMap<String, [f32; 2]>),
}

/// Detector stand-in that hands back output recorded earlier.
struct ReplaySource {
    output: ModelOutput,
}

impl DetectionSource for ReplaySource {
    type Error = Infallible;

    fn detect(&self, _image: &InputImage, _kind: AnalysisKind) -> Result<ModelOutput, Infallible> {
        Ok(self.output.clone())
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn load_output(command: &Command) -> Result<(AnalysisKind, ModelOutput)> {
    match command {
        Command::Spine { input } => {
            let tensor: TensorFile = read_json(input)?;
            Ok((AnalysisKind::Spine, ModelOutput::BoxTensor(tensor.into_array()?)))
        }
        Command::Posture { input } => {
            let output = match read_json::<PostureInput>(input)? {
                PostureInput::Tensor(tensor) => ModelOutput::PoseTensor(tensor.into_array()?),
                PostureInput::Keypoints(points) => ModelOutput::Keypoints(KeypointMap::from_named(
                    points.into_iter().map(|(name, [x, y])| (name, Keypoint::new(x, y))),
                )),
            };
            Ok((AnalysisKind::Posture, output))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            AnalysisConfig::from_json_str(&text).context("Invalid configuration")?
        }
        None => AnalysisConfig::default(),
    };

    let (kind, output) = load_output(&args.command)?;
    info!(?kind, "analyzing recorded output");

    let source = Arc::new(ReplaySource { output });
    let (width, height) = source.input_size();
    let pipeline = AnalysisPipeline::new(source, config);
    let analysis = pipeline
        .analyze(InputImage::zeros(width, height), kind)
        .context("Analysis failed")?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

//! AnalysisPipeline for combining inference with geometric analysis.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::analysis::{
    Analysis, KeypointMap, PostureGeometryAnalyzer, Report, RiskClassifier, SpineGeometryAnalyzer,
};
use crate::config::AnalysisConfig;
use crate::detection::{BoxDecoder, NonMaxSuppressor, PoseDecoder};
use crate::error::{AnalysisError, Result};

use super::{AnalysisKind, DetectionSource, InputImage, ModelOutput};

const WORKER_NAME: &str = "spine-inference";

/// Runs a shared detector and turns its output into a [`Report`].
///
/// The detector handle is built once by the host and injected as an `Arc`;
/// the pipeline itself is cheap to share by reference across request
/// handlers.
pub struct AnalysisPipeline<D: DetectionSource + 'static> {
    source: Arc<D>,
    config: AnalysisConfig,
    decoder: BoxDecoder,
    pose_decoder: PoseDecoder,
    nms: NonMaxSuppressor,
    spine: SpineGeometryAnalyzer,
    posture: PostureGeometryAnalyzer,
}

impl<D: DetectionSource + 'static> AnalysisPipeline<D> {
    /// Create a new pipeline around a shared detector.
    pub fn new(source: Arc<D>, config: AnalysisConfig) -> Self {
        let risk = RiskClassifier::new(config.risk.clone());
        Self {
            source,
            decoder: BoxDecoder::new(&config.decoder),
            pose_decoder: PoseDecoder::new(&config.decoder),
            nms: NonMaxSuppressor::new(&config.nms),
            spine: SpineGeometryAnalyzer::new(config.spine.clone(), risk.clone()),
            posture: PostureGeometryAnalyzer::new(config.posture.clone(), risk),
            config,
        }
    }

    /// Create a new pipeline with default thresholds and timeout.
    pub fn with_default_config(source: Arc<D>) -> Self {
        Self::new(source, AnalysisConfig::default())
    }

    /// Get a reference to the shared detector.
    pub fn source(&self) -> &Arc<D> {
        &self.source
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run inference on `image` and analyze the result.
    ///
    /// Inference is bounded by the configured timeout. When it expires the
    /// worker is left to finish on its own and its output is discarded.
    ///
    /// # Detached workers
    ///
    /// A timed-out worker cannot be stopped and keeps its thread until the
    /// detector returns. A detector that hangs therefore leaks one thread per
    /// timed-out call; hosts should bound the request rate or concurrency in
    /// front of the pipeline.
    pub fn analyze(&self, image: InputImage, kind: AnalysisKind) -> Result<Analysis<Report>> {
        let (width, height) = self.source.input_size();
        let expected = (3, height, width);
        if image.shape() != expected {
            return Err(AnalysisError::InvalidInput {
                expected,
                got: image.shape(),
            });
        }

        let output = match self.config.inference_timeout() {
            Some(timeout) => self.detect_with_timeout(image, kind, timeout)?,
            None => self
                .source
                .detect(&image, kind)
                .map_err(|e| AnalysisError::Inference(Box::new(e)))?,
        };
        debug!(?kind, output = output.describe(), "inference finished");

        self.analyze_output(kind, output)
    }

    /// Analyze detector output that was produced elsewhere.
    pub fn analyze_output(&self, kind: AnalysisKind, output: ModelOutput) -> Result<Analysis<Report>> {
        match (kind, output) {
            (AnalysisKind::Spine, ModelOutput::BoxTensor(tensor)) => {
                let raw = self.decoder.decode(tensor.view())?;
                let boxes = self.nms.suppress_raw(&raw);
                Ok(self.spine.analyze(&boxes).map(Report::Spine))
            }
            (AnalysisKind::Posture, ModelOutput::Keypoints(keypoints)) => {
                Ok(self.posture.analyze(&keypoints).map(Report::Posture))
            }
            (AnalysisKind::Posture, ModelOutput::PoseTensor(tensor)) => {
                let keypoints = self.pose_decoder.decode(tensor.view())?.unwrap_or_else(|| {
                    debug!("no person above the pose threshold");
                    KeypointMap::new()
                });
                Ok(self.posture.analyze(&keypoints).map(Report::Posture))
            }
            (kind, output) => Err(AnalysisError::malformed(format!(
                "{kind:?} analysis cannot use a {}",
                output.describe()
            ))),
        }
    }

    fn detect_with_timeout(
        &self,
        image: InputImage,
        kind: AnalysisKind,
        timeout: Duration,
    ) -> Result<ModelOutput> {
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);

        thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                // The receiver is gone once the caller timed out.
                let _ = tx.send(source.detect(&image, kind));
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result.map_err(|e| AnalysisError::Inference(Box::new(e))),
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "inference timed out, worker left detached");
                Err(AnalysisError::InferenceTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(AnalysisError::InferenceAborted),
        }
    }
}

//! Error type shared by decoding, inference and configuration loading.

use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

/// Failures that leave no usable report.
///
/// Geometric edge cases (short vertebra sequences, missing landmarks,
/// zero-area boxes) are not errors; they produce
/// [`Analysis::LowConfidence`](crate::Analysis::LowConfidence) reports or are
/// clamped away.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Detector tensor shape or size does not match the expected layout.
    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    /// Input image does not satisfy the detector input contract.
    #[error("invalid input image: expected {expected:?} (C, H, W), got {got:?}")]
    InvalidInput {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },

    /// The detector did not answer within the configured bound.
    #[error("inference did not finish within {0:?}")]
    InferenceTimeout(Duration),

    /// The inference worker exited without sending a result.
    #[error("inference worker terminated without a result")]
    InferenceAborted,

    /// The detector itself reported a failure.
    #[error("inference failed: {0}")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to spawn inference worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedModelOutput(msg.into())
    }
}

//! Detection post-processing and geometric analysis for spine X-rays and
//! posture photos.
//!
//! The crate turns raw detector output into structured reports:
//!
//! - [`detection`]: tensor decoding, boxes and non-maximum suppression.
//! - [`analysis`]: spine curvature/findings, posture deviation and the shared
//!   risk policy.
//! - [`integration`]: the seam for inference runtimes and the end-to-end
//!   [`AnalysisPipeline`].

pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod integration;

pub use analysis::{
    Analysis, FindingCounts, KeypointMap, Landmark, LowConfidenceReason, PostureReport, Report,
    RiskTier, SpineReport,
};
pub use config::AnalysisConfig;
pub use detection::{BoundingBox, BoxDecoder, NonMaxSuppressor, RawDetection};
pub use error::{AnalysisError, Result};
pub use integration::{AnalysisKind, AnalysisPipeline, DetectionSource, InputImage, ModelOutput};

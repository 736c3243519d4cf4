//! Integration module for connecting inference backends with the analysis
//! engine.
//!
//! This module provides the [`DetectionSource`] trait that runtimes implement
//! and the [`AnalysisPipeline`] that drives them end to end.

mod pipeline;
mod source;

pub use pipeline::AnalysisPipeline;
pub use source::{AnalysisKind, DetectionSource, InputImage, ModelOutput};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel};

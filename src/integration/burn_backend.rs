//! Burn inference backend.
//!
//! `BurnDetector` runs a model built with the Burn framework as a
//! [`DetectionSource`]. The model returns its raw `[1, A, N]` head output;
//! decoding and NMS stay in the engine.
//!
//! # Example
//!
//! ```ignore
//! use spineai_rs::integration::{BurnDetector, BurnModel};
//! use burn::backend::NdArray;
//!
//! struct VertebraYolo { /* ... */ }
//!
//! impl BurnModel<NdArray> for VertebraYolo {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> burn::tensor::Tensor<NdArray, 3> {
//!         // Run inference
//!     }
//! }
//!
//! let detector = Arc::new(BurnDetector::new(VertebraYolo::load("spine.bin"), Default::default()));
//! let pipeline = AnalysisPipeline::with_default_config(detector);
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

use super::{AnalysisKind, DetectionSource, InputImage, ModelOutput};

#[derive(Debug, Clone, Error)]
pub enum BurnDetectorError {
    #[error("invalid input dimensions: expected {expected:?}, got {got:?}")]
    InvalidInputDimensions {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },
    #[error("postprocessing error: {0}")]
    Postprocessing(String),
}

/// Trait for Burn-based detection models.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Forward pass on `[batch, channels, height, width]`, returning the raw
    /// planar head output `[batch, attributes, anchors]`.
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 3>;

    /// Expected input size `(channels, height, width)`.
    fn input_size(&self) -> (usize, usize, usize) {
        (3, 640, 640)
    }
}

/// Burn model exposed as a [`DetectionSource`].
///
/// Spine requests yield a box tensor and posture requests a pose tensor,
/// so a host usually keeps one detector per model.
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    /// Create a new Burn detector with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Get a reference to the underlying model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Copy a planar image into a `[1, C, H, W]` tensor.
    pub fn preprocess(&self, image: &InputImage) -> Result<Tensor<B, 4>, BurnDetectorError> {
        let expected = self.model.input_size();
        if image.shape() != expected {
            return Err(BurnDetectorError::InvalidInputDimensions {
                expected,
                got: image.shape(),
            });
        }

        let (channels, height, width) = expected;
        let data: Vec<f32> = image.pixels().iter().copied().collect();
        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([1, channels, height, width]))
    }

    fn postprocess(&self, output: Tensor<B, 3>) -> Result<ArrayD<f32>, BurnDetectorError> {
        let dims = output.dims();
        let values = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| BurnDetectorError::Postprocessing(format!("{e:?}")))?;
        ArrayD::from_shape_vec(IxDyn(&dims), values)
            .map_err(|e| BurnDetectorError::Postprocessing(e.to_string()))
    }
}

impl<B: Backend, M: BurnModel<B>> DetectionSource for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn input_size(&self) -> (usize, usize) {
        let (_, height, width) = self.model.input_size();
        (width, height)
    }

    fn detect(&self, image: &InputImage, kind: AnalysisKind) -> Result<ModelOutput, Self::Error> {
        let input = self.preprocess(image)?;
        let tensor = self.postprocess(self.model.forward(input))?;
        Ok(match kind {
            AnalysisKind::Spine => ModelOutput::BoxTensor(tensor),
            AnalysisKind::Posture => ModelOutput::PoseTensor(tensor),
        })
    }
}

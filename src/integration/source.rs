//! The seam between inference runtimes and the analysis engine.

use ndarray::{Array3, ArrayD, ArrayView3};

use crate::analysis::KeypointMap;
use crate::error::{AnalysisError, Result};

const CHANNELS: usize = 3;

/// Which analysis a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    /// Vertebra boxes from an X-ray.
    Spine,
    /// Body keypoints from a side-profile photo.
    Posture,
}

/// Planar RGB image, `f32` in `[0, 1]`, shape `(3, H, W)`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputImage {
    pixels: Array3<f32>,
}

impl InputImage {
    /// Wrap planar data laid out channel by channel.
    pub fn from_planar(data: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        let got = data.len();
        let pixels = Array3::from_shape_vec((CHANNELS, height, width), data).map_err(|_| {
            AnalysisError::InvalidInput {
                expected: (CHANNELS, height, width),
                got: (got / (height * width).max(1), height, width),
            }
        })?;
        Ok(Self { pixels })
    }

    /// Convert interleaved 8-bit RGB (`HWC`) into the planar float layout.
    pub fn from_rgb8(rgb: &[u8], width: usize, height: usize) -> Result<Self> {
        let hwc = ArrayView3::from_shape((height, width, CHANNELS), rgb).map_err(|_| {
            AnalysisError::InvalidInput {
                expected: (CHANNELS, height, width),
                got: (rgb.len() / (height * width).max(1), height, width),
            }
        })?;
        let pixels = hwc
            .permuted_axes([2, 0, 1])
            .mapv(|v| f32::from(v) / 255.0);
        Ok(Self {
            pixels: pixels.as_standard_layout().into_owned(),
        })
    }

    /// Black image of the given size.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            pixels: Array3::zeros((CHANNELS, height, width)),
        }
    }

    /// `(C, H, W)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.pixels.dim()
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.pixels.dim().2
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.pixels.dim().1
    }

    /// Get a reference to the planar pixel data.
    pub fn pixels(&self) -> &Array3<f32> {
        &self.pixels
    }

    /// Consume the image and return its pixel data.
    pub fn into_pixels(self) -> Array3<f32> {
        self.pixels
    }
}

/// Raw output of one detector call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Box tensor `[5+, N]` or `[1, 5+, N]`, planar.
    BoxTensor(ArrayD<f32>),
    /// Pose tensor `[56+, N]` or `[1, 56+, N]`, planar.
    PoseTensor(ArrayD<f32>),
    /// Keypoints already decoded by the runtime.
    Keypoints(KeypointMap),
}

impl ModelOutput {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            ModelOutput::BoxTensor(_) => "box tensor",
            ModelOutput::PoseTensor(_) => "pose tensor",
            ModelOutput::Keypoints(_) => "keypoints",
        }
    }
}

/// Trait for inference backends.
///
/// The engine only sees this trait; the model handle is constructed by the
/// host and shared with [`AnalysisPipeline`](super::AnalysisPipeline)
/// through an `Arc`, so implementations take `&self` and must be
/// thread-safe.
///
/// # Example
///
/// ```ignore
/// use spineai_rs::{AnalysisKind, DetectionSource, InputImage, ModelOutput};
///
/// struct MyDetector { /* model handle */ }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&self, image: &InputImage, kind: AnalysisKind) -> Result<ModelOutput, Self::Error> {
///         // Run inference and return the raw tensor
///         todo!()
///     }
/// }
/// ```
pub trait DetectionSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Model input size as `(width, height)`.
    fn input_size(&self) -> (usize, usize) {
        (640, 640)
    }

    fn detect(&self, image: &InputImage, kind: AnalysisKind) -> Result<ModelOutput, Self::Error>;
}

//! Box decoding for single-class, anchor-free detectors.
//!
//! The detector emits a planar tensor `[attribute][anchor]` where the first
//! five attributes are `cx, cy, w, h, score` in model input pixels. Extra
//! trailing attributes (class scores, keypoints) are ignored here.

use ndarray::{ArrayView1, ArrayView2, ArrayViewD, Axis, Ix2};
use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::detection::RawDetection;
use crate::error::{AnalysisError, Result};

const CX: usize = 0;
const CY: usize = 1;
const W: usize = 2;
const H: usize = 3;
pub(crate) const SCORE: usize = 4;
const MIN_ATTRIBUTES: usize = 5;

/// A shape-checked `[attribute][anchor]` view over detector output.
#[derive(Debug, Clone)]
pub struct TensorView<'a> {
    view: ArrayView2<'a, f32>,
}

impl<'a> TensorView<'a> {
    /// Accept `[A, N]` or `[1, A, N]` tensors.
    pub fn from_dyn(tensor: ArrayViewD<'a, f32>) -> Result<Self> {
        let view = match tensor.ndim() {
            2 => tensor,
            3 => {
                let batch = tensor.shape()[0];
                if batch != 1 {
                    return Err(AnalysisError::malformed(format!(
                        "expected batch size 1, got {batch}"
                    )));
                }
                tensor.index_axis_move(Axis(0), 0)
            }
            n => {
                return Err(AnalysisError::malformed(format!(
                    "expected a rank 2 or 3 tensor, got rank {n} with shape {:?}",
                    tensor.shape()
                )));
            }
        };
        let view = view
            .into_dimensionality::<Ix2>()
            .map_err(|e| AnalysisError::malformed(e.to_string()))?;
        Ok(Self { view })
    }

    /// Wrap a flat planar buffer of `num_attributes * num_anchors` values.
    pub fn from_flat(data: &'a [f32], num_attributes: usize, num_anchors: usize) -> Result<Self> {
        let expected = num_attributes.checked_mul(num_anchors).ok_or_else(|| {
            AnalysisError::malformed(format!(
                "tensor dimensions {num_attributes}x{num_anchors} overflow"
            ))
        })?;
        if data.len() != expected {
            return Err(AnalysisError::malformed(format!(
                "buffer holds {} values, expected {num_attributes}x{num_anchors} = {expected}",
                data.len()
            )));
        }
        let view = ArrayView2::from_shape((num_attributes, num_anchors), data)
            .map_err(|e| AnalysisError::malformed(e.to_string()))?;
        Ok(Self { view })
    }

    #[inline]
    pub fn num_attributes(&self) -> usize {
        self.view.nrows()
    }

    #[inline]
    pub fn num_anchors(&self) -> usize {
        self.view.ncols()
    }

    #[inline]
    pub(crate) fn channel(&self, attribute: usize) -> ArrayView1<'_, f32> {
        self.view.row(attribute)
    }

    #[inline]
    pub(crate) fn get(&self, attribute: usize, anchor: usize) -> f32 {
        self.view[[attribute, anchor]]
    }

    /// Fail unless the tensor carries at least `min` attributes and, when
    /// given, exactly `anchors` anchors.
    pub(crate) fn require(&self, min: usize, anchors: Option<usize>) -> Result<()> {
        if self.num_attributes() < min {
            return Err(AnalysisError::malformed(format!(
                "expected at least {min} attributes, got {}",
                self.num_attributes()
            )));
        }
        match anchors {
            Some(expected) if self.num_anchors() != expected => Err(AnalysisError::malformed(
                format!("expected {expected} anchors, got {}", self.num_anchors()),
            )),
            _ => Ok(()),
        }
    }
}

/// Decodes box tensors into [`RawDetection`]s above a confidence threshold.
#[derive(Debug, Clone)]
pub struct BoxDecoder {
    confidence_threshold: f32,
    expected_anchors: Option<usize>,
}

impl Default for BoxDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl BoxDecoder {
    /// Create a new decoder from the confidence threshold and anchor count.
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            expected_anchors: config.expected_anchors,
        }
    }

    /// Set the confidence threshold for accepting anchors.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the anchor count the tensor must have (`None` accepts any).
    pub fn with_expected_anchors(mut self, anchors: Option<usize>) -> Self {
        self.expected_anchors = anchors;
        self
    }

    /// Decode an `[A, N]` or `[1, A, N]` tensor.
    pub fn decode(&self, tensor: ArrayViewD<'_, f32>) -> Result<Vec<RawDetection>> {
        self.decode_view(&TensorView::from_dyn(tensor)?)
    }

    /// Decode a flat planar buffer.
    pub fn decode_flat(
        &self,
        data: &[f32],
        num_attributes: usize,
        num_anchors: usize,
    ) -> Result<Vec<RawDetection>> {
        self.decode_view(&TensorView::from_flat(data, num_attributes, num_anchors)?)
    }

    pub fn decode_view(&self, tensor: &TensorView<'_>) -> Result<Vec<RawDetection>> {
        tensor.require(MIN_ATTRIBUTES, self.expected_anchors)?;

        let scores = tensor.channel(SCORE);
        let mut detections = Vec::new();

        for (anchor, &score) in scores.iter().enumerate() {
            if score.is_nan() || score <= self.confidence_threshold {
                continue;
            }

            let cx = tensor.get(CX, anchor);
            let cy = tensor.get(CY, anchor);
            let w = tensor.get(W, anchor);
            let h = tensor.get(H, anchor);

            if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
                trace!(anchor, "skipping anchor with non-finite geometry");
                continue;
            }

            detections.push(RawDetection::new(cx, cy, w, h, score.min(1.0)));
        }

        debug!(
            anchors = tensor.num_anchors(),
            accepted = detections.len(),
            "decoded box tensor"
        );
        Ok(detections)
    }
}

//! Keypoint decoding for single-person YOLO-pose style tensors.
//!
//! Layout per anchor: `cx, cy, w, h, score` followed by `(x, y, visibility)`
//! for each of the 17 COCO landmarks, all planar `[attribute][anchor]`.

use ndarray::ArrayViewD;
use tracing::{debug, trace};

use crate::analysis::{Keypoint, KeypointMap, Landmark};
use crate::config::DecoderConfig;
use crate::detection::TensorView;
use crate::detection::decoder::SCORE;
use crate::error::Result;

const KEYPOINTS_START: usize = 5;
const VALUES_PER_KEYPOINT: usize = 3;
const POSE_ATTRIBUTES: usize = KEYPOINTS_START + VALUES_PER_KEYPOINT * Landmark::ALL.len();

/// Extracts the best-scoring person from a pose tensor.
#[derive(Debug, Clone)]
pub struct PoseDecoder {
    confidence_threshold: f32,
    expected_anchors: Option<usize>,
}

impl Default for PoseDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl PoseDecoder {
    /// Create a new decoder from the person threshold and anchor count.
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            confidence_threshold: config.pose_confidence_threshold,
            expected_anchors: config.expected_anchors,
        }
    }

    /// Override the expected anchor count; `None` accepts any.
    pub fn with_expected_anchors(mut self, anchors: Option<usize>) -> Self {
        self.expected_anchors = anchors;
        self
    }

    /// Decode a rank 2 or batch-of-one rank 3 tensor.
    pub fn decode(&self, tensor: ArrayViewD<'_, f32>) -> Result<Option<KeypointMap>> {
        self.decode_view(&TensorView::from_dyn(tensor)?)
    }

    /// Keypoints of the highest-scoring anchor, or `None` when no anchor
    /// passes the person threshold.
    pub fn decode_view(&self, tensor: &TensorView<'_>) -> Result<Option<KeypointMap>> {
        tensor.require(POSE_ATTRIBUTES, self.expected_anchors)?;

        let best = tensor
            .channel(SCORE)
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| !s.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b));

        let Some((anchor, score)) = best else {
            return Ok(None);
        };
        if score <= self.confidence_threshold {
            debug!(score, "no person above pose threshold");
            return Ok(None);
        }

        // Non-finite coordinates are left out so they read as missing.
        let keypoints = Landmark::ALL
            .into_iter()
            .filter_map(|landmark| {
                let base = KEYPOINTS_START + landmark.coco_index() * VALUES_PER_KEYPOINT;
                let (x, y) = (tensor.get(base, anchor), tensor.get(base + 1, anchor));
                if !x.is_finite() || !y.is_finite() {
                    trace!(%landmark, "dropping non-finite keypoint");
                    return None;
                }
                let kp = Keypoint::new(x, y).with_confidence(tensor.get(base + 2, anchor));
                Some((landmark, kp))
            })
            .collect::<KeypointMap>();

        debug!(anchor, score, "decoded pose");
        Ok(Some(keypoints))
    }
}

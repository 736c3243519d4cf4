//! Greedy non-maximum suppression.

use tracing::debug;

use crate::config::NmsConfig;
use crate::detection::{BoundingBox, RawDetection};

/// Collapses overlapping detections of the same structure into the
/// highest-scoring one.
#[derive(Debug, Clone)]
pub struct NonMaxSuppressor {
    iou_threshold: f32,
}

impl Default for NonMaxSuppressor {
    fn default() -> Self {
        Self::new(&NmsConfig::default())
    }
}

impl NonMaxSuppressor {
    /// Create a new suppressor from the configured IoU threshold.
    pub fn new(config: &NmsConfig) -> Self {
        Self {
            iou_threshold: config.iou_threshold,
        }
    }

    /// Set the IoU above which the lower-scoring box is dropped.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Get the IoU threshold.
    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    /// Suppress raw detections, returning survivors as boxes.
    pub fn suppress_raw(&self, detections: &[RawDetection]) -> Vec<BoundingBox> {
        self.suppress(detections.iter().map(RawDetection::to_box).collect())
    }

    /// Keep the best box of every cluster whose pairwise IoU exceeds the
    /// threshold. Survivors are ordered by descending score.
    pub fn suppress(&self, mut candidates: Vec<BoundingBox>) -> Vec<BoundingBox> {
        let total = candidates.len();
        candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));

        let mut kept = Vec::new();
        let mut pool = candidates.into_iter();

        // `pool` is consumed front to back; survivors of each round are
        // collected into `remaining` for the next one.
        while let Some(best) = pool.next() {
            let remaining: Vec<BoundingBox> = pool
                .filter(|b| best.iou(b) <= self.iou_threshold)
                .collect();
            kept.push(best);
            pool = remaining.into_iter();
        }

        debug!(
            candidates = total,
            kept = kept.len(),
            iou_threshold = self.iou_threshold,
            "non-maximum suppression"
        );
        kept
    }
}

//! Spine geometry: curvature proxy and per-vertebra findings.
//!
//! The curvature value is the spread between the steepest and shallowest
//! local tangent along the smoothed vertebra centre line. It grows with
//! curvature but is not the two-line clinical Cobb angle.

use nalgebra::Point2;
use tracing::debug;

use crate::analysis::{
    Analysis, FindingCounts, FindingKind, ImageView, LowConfidenceReason, RiskClassifier,
    SpineMeasurements, SpineReport,
};
use crate::config::SpineConfig;
use crate::detection::BoundingBox;

/// Replaces a vertical delta of exactly zero in the tangent computation.
const MIN_VERTICAL_DELTA: f32 = 0.001;
const SMOOTHING_WINDOW: usize = 3;
const TRIM: usize = 2;

const INSUFFICIENT_VERTEBRAE: &str =
    "Too few vertebrae detected for a reliable assessment. Retake the X-ray or use posture analysis for body photos.";

/// Vertebra boxes ordered top to bottom by vertical centre.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertebraSequence {
    boxes: Vec<BoundingBox>,
}

impl VertebraSequence {
    /// Sort `boxes` by centre y. The sort is stable, so an already sorted
    /// input is returned unchanged.
    pub fn from_boxes(mut boxes: Vec<BoundingBox>) -> Self {
        boxes.sort_by(|a, b| a.center().y.total_cmp(&b.center().y));
        Self { boxes }
    }

    /// Boxes ordered top to bottom.
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Box centres, top to bottom.
    pub fn centers(&self) -> Vec<Point2<f32>> {
        self.boxes.iter().map(BoundingBox::center).collect()
    }

    /// Box heights, top to bottom.
    pub fn heights(&self) -> Vec<f32> {
        self.boxes.iter().map(BoundingBox::height).collect()
    }

    /// Mean box height, 0 for an empty sequence.
    pub fn mean_height(&self) -> f32 {
        mean(self.boxes.iter().map(BoundingBox::height))
    }
}

/// Turns vertebra boxes into a [`SpineReport`].
#[derive(Debug, Clone, Default)]
pub struct SpineGeometryAnalyzer {
    config: SpineConfig,
    risk: RiskClassifier,
}

impl SpineGeometryAnalyzer {
    /// Create a new analyzer with the given thresholds and risk policy.
    pub fn new(config: SpineConfig, risk: RiskClassifier) -> Self {
        Self { config, risk }
    }

    /// Analyze boxes in any order; they are sorted top to bottom first.
    pub fn analyze(&self, boxes: &[BoundingBox]) -> Analysis<SpineReport> {
        self.analyze_sequence(&VertebraSequence::from_boxes(boxes.to_vec()))
    }

    /// Analyze an already sorted sequence.
    pub fn analyze_sequence(&self, seq: &VertebraSequence) -> Analysis<SpineReport> {
        let measurements = SpineMeasurements {
            vertebra_count: seq.len(),
            avg_vertebra_height: seq.mean_height(),
        };
        let image_view = self.classify_view(seq.boxes());

        if seq.len() < self.config.min_vertebrae {
            debug!(
                detected = seq.len(),
                required = self.config.min_vertebrae,
                "too few vertebrae for curvature"
            );
            let findings = FindingCounts::default();
            let risk_tier = self.risk.classify(0.0, 0);
            let report = SpineReport {
                cobb_angle_degrees: 0.0,
                is_scoliosis_likely: false,
                findings,
                risk_tier,
                image_view,
                measurements,
                health: self.risk.spine_health(&findings, risk_tier),
                recommendations: vec![INSUFFICIENT_VERTEBRAE.to_string()],
            };
            return Analysis::LowConfidence {
                report,
                reason: LowConfidenceReason::InsufficientVertebrae {
                    detected: seq.len(),
                    required: self.config.min_vertebrae,
                },
            };
        }

        let cobb = cobb_angle(&seq.centers());
        let findings = self.detect_findings(seq);
        let risk_tier = self.risk.classify(cobb, findings.total());
        let health = self.risk.spine_health(&findings, risk_tier);
        let recommendations = self.risk.spine_recommendations(cobb, &findings, &health);

        debug!(
            vertebrae = seq.len(),
            cobb,
            findings = findings.total(),
            ?risk_tier,
            "spine analyzed"
        );

        Analysis::Complete {
            report: SpineReport {
                cobb_angle_degrees: cobb,
                is_scoliosis_likely: self.risk.is_scoliosis_likely(cobb),
                findings,
                risk_tier,
                image_view,
                measurements,
                health,
                recommendations,
            },
        }
    }

    /// Evaluate sliding, fracture and herniation independently per vertebra.
    pub fn detect_findings(&self, seq: &VertebraSequence) -> FindingCounts {
        let boxes = seq.boxes();
        let n = boxes.len();
        let mut findings = FindingCounts::default();
        if n == 0 {
            return findings;
        }

        let centers = seq.centers();
        let heights = seq.heights();
        let avg_height = seq.mean_height();
        let fracture_ratio = 1.0 - self.config.fracture_height_loss;

        for (i, bone) in boxes.iter().enumerate() {
            let interior = i > 0 && i < n - 1;
            let h = heights[i];

            if interior {
                let expected_x = (centers[i - 1].x + centers[i + 1].x) / 2.0;
                if (centers[i].x - expected_x).abs() > bone.width() * self.config.sliding_tolerance
                {
                    findings.record(FindingKind::Sliding);
                }
            }

            let expected_h = if interior {
                (heights[i - 1] + heights[i + 1]) / 2.0
            } else {
                avg_height
            };
            if h < expected_h * fracture_ratio {
                findings.record(FindingKind::Fracture);
            }

            if i < n - 1 {
                let next = &boxes[i + 1];
                let gap = next.y1() - bone.y2();
                let ref_h = (h + heights[i + 1]) / 2.0;
                if gap > 0.0 && gap < ref_h * self.config.herniation_gap_ratio {
                    findings.record(FindingKind::Herniation);
                }
            }
        }

        findings
    }

    /// AP views show vertebrae wider than tall.
    pub fn classify_view(&self, boxes: &[BoundingBox]) -> ImageView {
        let ratios: Vec<f32> = boxes
            .iter()
            .filter(|b| b.height() > 0.0)
            .map(|b| b.width() / b.height())
            .collect();
        if ratios.is_empty() {
            return ImageView::Unknown;
        }
        if mean(ratios.iter().copied()) > self.config.ap_aspect_ratio {
            ImageView::AnteriorPosterior
        } else {
            ImageView::Lateral
        }
    }
}

/// Spread between the largest and smallest local tangent angle (degrees)
/// along the smoothed centre line.
pub fn cobb_angle(centers: &[Point2<f32>]) -> f32 {
    let smooth = smooth_points(centers);
    let n = smooth.len();

    let range = if TRIM < n.saturating_sub(TRIM) {
        TRIM..n - TRIM
    } else {
        // Too short to trim: every point with two neighbours.
        1..n.saturating_sub(1)
    };

    let mut min_angle = f32::INFINITY;
    let mut max_angle = f32::NEG_INFINITY;
    for i in range {
        let prev = smooth[i - 1];
        let next = smooth[i + 1];
        let dx = next.x - prev.x;
        let mut dy = next.y - prev.y;
        if dy == 0.0 {
            dy = MIN_VERTICAL_DELTA;
        }
        let angle = dx.atan2(dy).to_degrees();
        min_angle = min_angle.min(angle);
        max_angle = max_angle.max(angle);
    }

    if max_angle < min_angle {
        0.0
    } else {
        max_angle - min_angle
    }
}

/// Centred moving average; the first and last points average two values.
fn smooth_points(points: &[Point2<f32>]) -> Vec<Point2<f32>> {
    let n = points.len();
    if n < SMOOTHING_WINDOW {
        return points.to_vec();
    }
    (0..n)
        .map(|i| {
            let window = &points[i.saturating_sub(1)..(i + 2).min(n)];
            let k = window.len() as f32;
            let (sx, sy) = window
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
            Point2::new(sx / k, sy / k)
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0f32, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f32 }
}

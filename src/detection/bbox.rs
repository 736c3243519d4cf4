use nalgebra::Point2;
use ndarray::Array2;
use serde::Serialize;

/// Detection as read from the model, in model input pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawDetection {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

impl RawDetection {
    #[inline]
    pub fn new(center_x: f32, center_y: f32, width: f32, height: f32, score: f32) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
            score,
        }
    }

    #[inline]
    pub fn to_box(&self) -> BoundingBox {
        BoundingBox::from_center(
            self.center_x,
            self.center_y,
            self.width,
            self.height,
            self.score,
        )
    }
}

/// Axis-aligned box in TLBR form with a confidence score.
///
/// Constructors keep `x1 <= x2`, `y1 <= y2` and `score` in `[0, 1]`:
/// negative extents collapse to zero and scores are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoundingBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl BoundingBox {
    /// Create a box from corner coordinates (x1, y1, x2, y2).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            x1,
            y1,
            x2: x2.max(x1),
            y2: y2.max(y1),
            score: clamp_score(score),
        }
    }

    /// Create a box from center and extent (cx, cy, w, h).
    #[inline]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32, score: f32) -> Self {
        let w = width.max(0.0);
        let h = height.max(0.0);
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            score: clamp_score(score),
        }
    }

    /// Left edge.
    #[inline]
    pub fn x1(&self) -> f32 {
        self.x1
    }

    /// Top edge.
    #[inline]
    pub fn y1(&self) -> f32 {
        self.y1
    }

    /// Right edge.
    #[inline]
    pub fn x2(&self) -> f32 {
        self.x2
    }

    /// Bottom edge.
    #[inline]
    pub fn y2(&self) -> f32 {
        self.y2
    }

    /// Detection confidence in `[0, 1]`.
    #[inline]
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Box width, never negative.
    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height, never negative.
    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Box centre.
    #[inline]
    pub fn center(&self) -> Point2<f32> {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Box area.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Convert back to center/extent form.
    pub fn to_raw(&self) -> RawDetection {
        let c = self.center();
        RawDetection::new(c.x, c.y, self.width(), self.height(), self.score)
    }

    /// Intersection over Union with another box.
    ///
    /// Disjoint boxes give 0. Boxes whose union has no area (both degenerate)
    /// also give 0 rather than NaN.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

impl From<RawDetection> for BoundingBox {
    fn from(raw: RawDetection) -> Self {
        raw.to_box()
    }
}

#[inline]
fn clamp_score(score: f32) -> f32 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

/// Pairwise IoU matrix of shape (M, N).
pub fn iou_matrix(boxes_a: &[BoundingBox], boxes_b: &[BoundingBox]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}

//! Report value types returned to callers.
//!
//! Everything here serializes straight to JSON for an HTTP response or a
//! display layer.

use serde::Serialize;

use crate::analysis::Landmark;

/// Coarse severity tier shared by every analysis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    Fracture,
    Herniation,
    Sliding,
}

/// Per-kind finding counts. Every kind is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FindingCounts {
    pub fracture: u32,
    pub herniation: u32,
    pub sliding: u32,
}

impl FindingCounts {
    /// Count for one finding kind.
    pub fn get(&self, kind: FindingKind) -> u32 {
        match kind {
            FindingKind::Fracture => self.fracture,
            FindingKind::Herniation => self.herniation,
            FindingKind::Sliding => self.sliding,
        }
    }

    /// Add one finding of `kind`.
    pub fn record(&mut self, kind: FindingKind) {
        match kind {
            FindingKind::Fracture => self.fracture += 1,
            FindingKind::Herniation => self.herniation += 1,
            FindingKind::Sliding => self.sliding += 1,
        }
    }

    /// Sum over all kinds.
    pub fn total(&self) -> u32 {
        self.fracture + self.herniation + self.sliding
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// X-ray projection inferred from vertebra aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageView {
    #[serde(rename = "AP")]
    AnteriorPosterior,
    #[serde(rename = "LATERAL")]
    Lateral,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Normal,
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpineHealth {
    pub severity: Severity,
    /// 0 to 100, higher is healthier.
    pub score: u8,
    pub consult_doctor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpineMeasurements {
    pub vertebra_count: usize,
    pub avg_vertebra_height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpineReport {
    pub cobb_angle_degrees: f32,
    pub is_scoliosis_likely: bool,
    pub findings: FindingCounts,
    pub risk_tier: RiskTier,
    pub image_view: ImageView,
    pub measurements: SpineMeasurements,
    pub health: SpineHealth,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeadPosture {
    Normal,
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackPosture {
    Normal,
    Kyphotic,
}

/// Side the subject faces in a profile photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// Sign that makes deviations comparable for both orientations.
    pub fn multiplier(self) -> f32 {
        match self {
            Facing::Right => 1.0,
            Facing::Left => -1.0,
        }
    }
}

/// Angles from screen-vertical, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostureAngles {
    pub neck_degrees: f32,
    pub torso_degrees: f32,
}

/// Severity of each posture finding and the overall call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostureHealth {
    /// MODERATE for a forward head, MILD for a backward head.
    pub head_severity: Severity,
    /// MODERATE when kyphotic.
    pub back_severity: Severity,
    pub severity: Severity,
    pub consult_doctor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostureReport {
    pub head_posture_status: HeadPosture,
    pub back_posture_status: BackPosture,
    pub head_deviation_cm: f32,
    pub back_deviation_cm: f32,
    pub recommendation: String,
    pub facing: Facing,
    pub score: u8,
    pub angles: PostureAngles,
    pub health: PostureHealth,
    pub recommendations: Vec<String>,
}

impl PostureReport {
    /// True when neither head nor back shows a finding.
    pub fn is_normal(&self) -> bool {
        self.head_posture_status == HeadPosture::Normal
            && self.back_posture_status == BackPosture::Normal
    }
}

/// Either kind of report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Spine(SpineReport),
    Posture(PostureReport),
}

impl Report {
    /// The spine report, if this is one.
    pub fn as_spine(&self) -> Option<&SpineReport> {
        match self {
            Report::Spine(r) => Some(r),
            Report::Posture(_) => None,
        }
    }

    /// The posture report, if this is one.
    pub fn as_posture(&self) -> Option<&PostureReport> {
        match self {
            Report::Posture(r) => Some(r),
            Report::Spine(_) => None,
        }
    }
}

/// Why a report carries no real signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LowConfidenceReason {
    /// Too few vertebra boxes to measure curvature.
    InsufficientVertebrae { detected: usize, required: usize },
    /// Required landmarks are absent or at the origin sentinel.
    MissingLandmarks { missing: Vec<Landmark> },
}

/// A report together with whether its input was good enough to trust.
///
/// Low-confidence reports are still well formed so callers can always
/// render something.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis<R> {
    Complete {
        report: R,
    },
    LowConfidence {
        report: R,
        reason: LowConfidenceReason,
    },
}

impl<R> Analysis<R> {
    /// Get a reference to the report, whatever the confidence.
    pub fn report(&self) -> &R {
        match self {
            Analysis::Complete { report } | Analysis::LowConfidence { report, .. } => report,
        }
    }

    /// Consume the result and return the report.
    pub fn into_report(self) -> R {
        match self {
            Analysis::Complete { report } | Analysis::LowConfidence { report, .. } => report,
        }
    }

    pub fn is_low_confidence(&self) -> bool {
        matches!(self, Analysis::LowConfidence { .. })
    }

    /// Why the report is low-confidence, if it is.
    pub fn reason(&self) -> Option<&LowConfidenceReason> {
        match self {
            Analysis::Complete { .. } => None,
            Analysis::LowConfidence { reason, .. } => Some(reason),
        }
    }

    /// Transform the report, keeping the confidence status.
    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> Analysis<U> {
        match self {
            Analysis::Complete { report } => Analysis::Complete { report: f(report) },
            Analysis::LowConfidence { report, reason } => Analysis::LowConfidence {
                report: f(report),
                reason,
            },
        }
    }
}

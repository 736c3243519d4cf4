//! Geometric analysis of vertebra boxes and body keypoints.

mod keypoint;
mod posture;
mod report;
mod risk;
mod spine;

pub use keypoint::{Keypoint, KeypointMap, Landmark, UnknownLandmark};
pub use posture::{PostureGeometryAnalyzer, REQUIRED_LANDMARKS};
pub use report::{
    Analysis, BackPosture, Facing, FindingCounts, FindingKind, HeadPosture, ImageView,
    LowConfidenceReason, PostureAngles, PostureHealth, PostureReport, Report, RiskTier, Severity,
    SpineHealth, SpineMeasurements, SpineReport,
};
pub use risk::RiskClassifier;
pub use spine::{SpineGeometryAnalyzer, VertebraSequence, cobb_angle};

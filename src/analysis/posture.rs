//! Side-profile posture analysis from body keypoints.
//!
//! All deviations are normalised by torso length so the result does not
//! depend on how far the subject stands from the camera.

use nalgebra::{Point2, Vector2};
use tracing::{debug, warn};

use crate::analysis::{
    Analysis, BackPosture, Facing, HeadPosture, KeypointMap, Landmark, LowConfidenceReason,
    PostureAngles, PostureReport, RiskClassifier,
};
use crate::config::PostureConfig;

/// Landmarks the posture measurements read.
pub const REQUIRED_LANDMARKS: [Landmark; 7] = [
    Landmark::Nose,
    Landmark::LeftEar,
    Landmark::RightEar,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftHip,
    Landmark::RightHip,
];

const ANGLE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct PostureGeometryAnalyzer {
    config: PostureConfig,
    risk: RiskClassifier,
}

impl PostureGeometryAnalyzer {
    /// Create a new analyzer with the given thresholds and risk policy.
    pub fn new(config: PostureConfig, risk: RiskClassifier) -> Self {
        Self { config, risk }
    }

    /// Measure head and back alignment.
    ///
    /// The report is always computed. It is flagged low-confidence when any
    /// required landmark is missing, since the origin sentinel then takes
    /// part in the averages.
    pub fn analyze(&self, keypoints: &KeypointMap) -> Analysis<PostureReport> {
        let report = self.measure(keypoints);

        let missing = keypoints.missing(&REQUIRED_LANDMARKS);
        if missing.is_empty() {
            debug!(
                head = ?report.head_posture_status,
                back = ?report.back_posture_status,
                "posture analyzed"
            );
            Analysis::Complete { report }
        } else {
            warn!(?missing, "posture landmarks missing");
            Analysis::LowConfidence {
                report,
                reason: LowConfidenceReason::MissingLandmarks { missing },
            }
        }
    }

    fn measure(&self, kp: &KeypointMap) -> PostureReport {
        let c = &self.config;

        let nose = kp.get(Landmark::Nose).position;
        let ear = midpoint(kp, Landmark::LeftEar, Landmark::RightEar);
        let shoulder = midpoint(kp, Landmark::LeftShoulder, Landmark::RightShoulder);
        let hip = midpoint(kp, Landmark::LeftHip, Landmark::RightHip);

        let facing = if nose.x > shoulder.x {
            Facing::Right
        } else {
            Facing::Left
        };
        let direction = facing.multiplier();

        let mut torso = (hip.y - shoulder.y).abs();
        if torso == 0.0 {
            torso = 1.0;
        }

        let head_diff = (ear.x - shoulder.x) * direction;
        let head = if head_diff > torso * c.forward_head_ratio {
            HeadPosture::Forward
        } else if head_diff < -(torso * c.backward_head_ratio) {
            HeadPosture::Backward
        } else {
            HeadPosture::Normal
        };

        let shoulder_diff = (shoulder.x - hip.x) * direction;
        let back = if shoulder_diff > torso * c.kyphosis_ratio {
            BackPosture::Kyphotic
        } else {
            BackPosture::Normal
        };

        PostureReport {
            head_posture_status: head,
            back_posture_status: back,
            head_deviation_cm: head_diff / torso * c.display_scale,
            back_deviation_cm: shoulder_diff / torso * c.display_scale,
            recommendation: self.risk.posture_verdict(head, back).to_string(),
            facing,
            score: self.risk.posture_score(head, back),
            angles: PostureAngles {
                neck_degrees: angle_from_vertical(ear - shoulder),
                torso_degrees: angle_from_vertical(shoulder - hip),
            },
            health: self.risk.posture_health(head, back),
            recommendations: self.risk.posture_recommendations(head, back),
        }
    }
}

fn midpoint(kp: &KeypointMap, left: Landmark, right: Landmark) -> Point2<f32> {
    nalgebra::center(&kp.get(left).position, &kp.get(right).position)
}

/// Angle between `v` and screen-up (image y grows downwards).
fn angle_from_vertical(v: Vector2<f32>) -> f32 {
    let up = Vector2::new(0.0, -1.0);
    let cos = v.dot(&up) / (v.norm() * up.norm() + ANGLE_EPSILON);
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Severity;
    use crate::analysis::risk::{CONSULT_A_DOCTOR, HEALTHY_POSTURE};

    /// Side profile facing right: nose ahead of the shoulders.
    fn profile(ear_x: f32, shoulder_x: f32, hip_x: f32) -> KeypointMap {
        KeypointMap::new()
            .with(Landmark::Nose, ear_x + 30.0, 95.0)
            .with(Landmark::LeftEar, ear_x, 100.0)
            .with(Landmark::RightEar, ear_x, 100.0)
            .with(Landmark::LeftShoulder, shoulder_x, 200.0)
            .with(Landmark::RightShoulder, shoulder_x, 200.0)
            .with(Landmark::LeftHip, hip_x, 400.0)
            .with(Landmark::RightHip, hip_x, 400.0)
    }

    #[test]
    fn test_upright_subject_is_normal() {
        let analyzer = PostureGeometryAnalyzer::default();
        let result = analyzer.analyze(&profile(300.0, 300.0, 300.0));

        assert!(!result.is_low_confidence());
        let r = result.report();
        assert_eq!(r.head_posture_status, HeadPosture::Normal);
        assert_eq!(r.back_posture_status, BackPosture::Normal);
        assert!(r.head_deviation_cm.abs() < 1e-4);
        assert!(r.back_deviation_cm.abs() < 1e-4);
        assert_eq!(r.recommendation, HEALTHY_POSTURE);
        assert_eq!(r.score, 100);
        assert_eq!(r.health.severity, Severity::Normal);
        assert!(!r.health.consult_doctor);
        assert!(r.angles.neck_degrees.abs() < 1e-2);
        assert!(r.angles.torso_degrees.abs() < 1e-2);
    }

    #[test]
    fn test_forward_head() {
        let analyzer = PostureGeometryAnalyzer::default();
        // torso 200; head 40 ahead > 0.15 * 200 = 30.
        let r = analyzer.analyze(&profile(340.0, 300.0, 300.0)).into_report();
        assert_eq!(r.facing, Facing::Right);
        assert_eq!(r.head_posture_status, HeadPosture::Forward);
        assert!((r.head_deviation_cm - 10.0).abs() < 1e-4);
        assert_eq!(r.recommendation, CONSULT_A_DOCTOR);
        assert_eq!(r.health.head_severity, Severity::Moderate);
        assert!(r.health.consult_doctor);
    }

    #[test]
    fn test_asymmetric_head_thresholds() {
        let analyzer = PostureGeometryAnalyzer::default();
        // 25 ahead: below the forward limit of 30.
        let r = analyzer.analyze(&profile(325.0, 300.0, 300.0)).into_report();
        assert_eq!(r.head_posture_status, HeadPosture::Normal);

        // 25 behind: beyond the backward limit of 20.
        let mut kp = profile(275.0, 300.0, 300.0);
        kp.insert(Landmark::Nose, crate::analysis::Keypoint::new(320.0, 95.0));
        let r = analyzer.analyze(&kp).into_report();
        assert_eq!(r.head_posture_status, HeadPosture::Backward);
        assert!((r.head_deviation_cm + 6.25).abs() < 1e-4);
        assert_eq!(r.health.head_severity, Severity::Mild);
        assert_eq!(r.health.back_severity, Severity::Normal);
    }

    #[test]
    fn test_kyphosis_and_facing_left() {
        let analyzer = PostureGeometryAnalyzer::default();
        // Facing left: nose behind the shoulders in x, shoulders 30 ahead
        // (towards -x) of hips; 30 > 0.12 * 200 = 24.
        let kp = KeypointMap::new()
            .with(Landmark::Nose, 240.0, 95.0)
            .with(Landmark::LeftEar, 270.0, 100.0)
            .with(Landmark::RightEar, 270.0, 100.0)
            .with(Landmark::LeftShoulder, 270.0, 200.0)
            .with(Landmark::RightShoulder, 270.0, 200.0)
            .with(Landmark::LeftHip, 300.0, 400.0)
            .with(Landmark::RightHip, 300.0, 400.0);
        let r = analyzer.analyze(&kp).into_report();

        assert_eq!(r.facing, Facing::Left);
        assert_eq!(r.back_posture_status, BackPosture::Kyphotic);
        assert_eq!(r.head_posture_status, HeadPosture::Normal);
        assert!((r.back_deviation_cm - 7.5).abs() < 1e-4);
        assert_eq!(r.score, 70);
    }

    #[test]
    fn test_zero_torso_is_floored() {
        let analyzer = PostureGeometryAnalyzer::default();
        let kp = KeypointMap::new()
            .with(Landmark::Nose, 12.0, 5.0)
            .with(Landmark::LeftEar, 11.0, 5.0)
            .with(Landmark::RightEar, 11.0, 5.0)
            .with(Landmark::LeftShoulder, 10.0, 10.0)
            .with(Landmark::RightShoulder, 10.0, 10.0)
            .with(Landmark::LeftHip, 10.0, 10.0)
            .with(Landmark::RightHip, 10.0, 10.0);
        let r = analyzer.analyze(&kp).into_report();
        assert!(r.head_deviation_cm.is_finite());
        assert!((r.head_deviation_cm - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_map_is_low_confidence() {
        let analyzer = PostureGeometryAnalyzer::default();
        let result = analyzer.analyze(&KeypointMap::new());

        match result.reason() {
            Some(LowConfidenceReason::MissingLandmarks { missing }) => {
                assert_eq!(missing.as_slice(), REQUIRED_LANDMARKS.as_slice());
            }
            other => panic!("unexpected reason {other:?}"),
        }
        let r = result.report();
        assert_eq!(r.head_posture_status, HeadPosture::Normal);
        assert!(r.head_deviation_cm.is_finite());
        assert!(r.angles.neck_degrees.is_finite());
    }

    #[test]
    fn test_single_missing_landmark_is_reported() {
        let analyzer = PostureGeometryAnalyzer::default();
        let mut kp = profile(300.0, 300.0, 300.0);
        kp.insert(Landmark::RightHip, crate::analysis::Keypoint::sentinel());
        let result = analyzer.analyze(&kp);
        assert_eq!(
            result.reason(),
            Some(&LowConfidenceReason::MissingLandmarks {
                missing: vec![Landmark::RightHip]
            })
        );
    }

    #[test]
    fn test_non_finite_landmark_is_missing_and_report_stays_finite() {
        let analyzer = PostureGeometryAnalyzer::default();
        let mut kp = profile(300.0, 300.0, 300.0);
        kp.insert(
            Landmark::LeftEar,
            crate::analysis::Keypoint::new(f32::NAN, 100.0),
        );
        let result = analyzer.analyze(&kp);

        assert_eq!(
            result.reason(),
            Some(&LowConfidenceReason::MissingLandmarks {
                missing: vec![Landmark::LeftEar]
            })
        );
        let r = result.report();
        assert!(r.head_deviation_cm.is_finite());
        assert!(r.back_deviation_cm.is_finite());
        assert!(r.angles.neck_degrees.is_finite());
        assert!(r.angles.torso_degrees.is_finite());
    }
}

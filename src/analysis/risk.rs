//! Risk tiers and recommendation text shared by spine and posture reports.

use crate::analysis::{
    BackPosture, FindingCounts, HeadPosture, PostureHealth, RiskTier, Severity, SpineHealth,
};
use crate::config::RiskConfig;

const FRACTURE_WEIGHT: u32 = 30;
const HERNIATION_WEIGHT: u32 = 20;
const SLIDING_WEIGHT: u32 = 25;

const HEAD_PENALTY: u8 = 25;
const BACK_PENALTY: u8 = 30;

pub(crate) const CONSULT_A_DOCTOR: &str = "CONSULT A DOCTOR";
pub(crate) const HEALTHY_POSTURE: &str = "HEALTHY POSTURE";

/// Maps measurements to a [`RiskTier`] and patient-facing advice.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    config: RiskConfig,
}

impl RiskClassifier {
    /// Create a new classifier with the given thresholds.
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the thresholds.
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// HIGH beats MEDIUM beats LOW; every boundary is exclusive.
    pub fn classify(&self, cobb_angle: f32, total_findings: u32) -> RiskTier {
        let c = &self.config;
        if cobb_angle > c.high_angle || total_findings > c.high_findings {
            RiskTier::High
        } else if cobb_angle > c.medium_angle || total_findings > c.medium_findings {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    /// True when the curve exceeds the scoliosis angle.
    pub fn is_scoliosis_likely(&self, cobb_angle: f32) -> bool {
        cobb_angle > self.config.scoliosis_angle
    }

    /// Weighted finding severity. A doctor is advised from MODERATE upwards
    /// or whenever the tier is HIGH.
    pub fn spine_health(&self, findings: &FindingCounts, tier: RiskTier) -> SpineHealth {
        let weighted = findings.fracture * FRACTURE_WEIGHT
            + findings.herniation * HERNIATION_WEIGHT
            + findings.sliding * SLIDING_WEIGHT;

        let (severity, score) = match weighted {
            0 => (Severity::Normal, 100),
            1..30 => (Severity::Mild, 85),
            30..60 => (Severity::Moderate, 60),
            _ => (Severity::Severe, 30),
        };

        SpineHealth {
            severity,
            score,
            consult_doctor: severity >= Severity::Moderate || tier == RiskTier::High,
        }
    }

    /// Advice lines for a spine report, closing with a follow-up line.
    pub fn spine_recommendations(
        &self,
        cobb_angle: f32,
        findings: &FindingCounts,
        health: &SpineHealth,
    ) -> Vec<String> {
        let mut lines = Vec::new();

        if findings.fracture > 0 {
            lines.push(format!(
                "{} vertebra(e) show compression fracture signs.",
                findings.fracture
            ));
            lines.push("Consider bone density testing and strengthening exercises.".to_string());
        }
        if findings.herniation > 0 {
            lines.push(format!(
                "{} possible disc herniation(s) detected.",
                findings.herniation
            ));
            lines.push("Physical therapy and core strengthening may help.".to_string());
        }
        if findings.sliding > 0 {
            lines.push(format!(
                "{} vertebra(e) show alignment issues (listhesis).",
                findings.sliding
            ));
            lines.push("Posture correction and stabilization exercises recommended.".to_string());
        }
        if self.is_scoliosis_likely(cobb_angle) {
            lines.push(format!(
                "Cobb angle: {cobb_angle:.1} degrees - scoliosis likely."
            ));
            if cobb_angle > self.config.severe_scoliosis_angle {
                lines.push(
                    "Moderate to severe scoliosis - bracing or surgery may be needed.".to_string(),
                );
            }
        }

        if health.consult_doctor {
            lines.push(
                "Consult a spine specialist for detailed evaluation and treatment plan."
                    .to_string(),
            );
        } else {
            lines.push("Continue regular checkups and maintain healthy spine habits.".to_string());
        }
        lines
    }

    /// One-line verdict for a posture photo.
    pub fn posture_verdict(&self, head: HeadPosture, back: BackPosture) -> &'static str {
        if head != HeadPosture::Normal || back != BackPosture::Normal {
            CONSULT_A_DOCTOR
        } else {
            HEALTHY_POSTURE
        }
    }

    /// 100 minus 25 for a head finding and 30 for a back finding.
    pub fn posture_score(&self, head: HeadPosture, back: BackPosture) -> u8 {
        let mut score = 100u8;
        if head != HeadPosture::Normal {
            score -= HEAD_PENALTY;
        }
        if back != BackPosture::Normal {
            score -= BACK_PENALTY;
        }
        score
    }

    /// Advice lines for a posture report.
    pub fn posture_recommendations(&self, head: HeadPosture, back: BackPosture) -> Vec<String> {
        let mut lines = Vec::new();

        match head {
            HeadPosture::Forward => {
                lines.push(
                    "Forward head posture detected. Consider neck strengthening exercises."
                        .to_string(),
                );
                lines.push("Adjust screen height to eye level.".to_string());
            }
            HeadPosture::Backward | HeadPosture::Normal => {}
        }
        if back == BackPosture::Kyphotic {
            lines.push(
                "Slouching detected. Focus on back strengthening and stretching.".to_string(),
            );
            lines.push("Practice proper sitting posture with back support.".to_string());
        }

        if head == HeadPosture::Normal && back == BackPosture::Normal {
            lines.push("Healthy posture detected. Keep maintaining good posture habits!".to_string());
        } else {
            lines.push("Consult a physical therapist for personalized treatment.".to_string());
        }
        lines
    }

    /// Per-finding severities. Any finding makes the overall call MODERATE
    /// and advises a doctor.
    pub fn posture_health(&self, head: HeadPosture, back: BackPosture) -> PostureHealth {
        let head_severity = match head {
            HeadPosture::Normal => Severity::Normal,
            HeadPosture::Forward => Severity::Moderate,
            HeadPosture::Backward => Severity::Mild,
        };
        let back_severity = match back {
            BackPosture::Normal => Severity::Normal,
            BackPosture::Kyphotic => Severity::Moderate,
        };
        let any_issue = head != HeadPosture::Normal || back != BackPosture::Normal;

        PostureHealth {
            head_severity,
            back_severity,
            severity: if any_issue {
                Severity::Moderate
            } else {
                Severity::Normal
            },
            consult_doctor: any_issue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_fixtures() {
        let risk = RiskClassifier::default();
        assert_eq!(risk.classify(26.0, 0), RiskTier::High);
        assert_eq!(risk.classify(11.0, 0), RiskTier::Medium);
        assert_eq!(risk.classify(5.0, 0), RiskTier::Low);
        assert_eq!(risk.classify(0.0, 3), RiskTier::High);
        assert_eq!(risk.classify(0.0, 1), RiskTier::Medium);
    }

    #[test]
    fn test_classify_boundaries_are_exclusive() {
        let risk = RiskClassifier::default();
        assert_eq!(risk.classify(25.0, 0), RiskTier::Medium);
        assert_eq!(risk.classify(10.0, 0), RiskTier::Low);
        assert_eq!(risk.classify(0.0, 2), RiskTier::Medium);
        assert!(!risk.is_scoliosis_likely(10.0));
        assert!(risk.is_scoliosis_likely(10.01));
    }

    #[test]
    fn test_spine_health_weights() {
        let risk = RiskClassifier::default();
        let none = FindingCounts::default();
        let h = risk.spine_health(&none, RiskTier::Low);
        assert_eq!((h.severity, h.score, h.consult_doctor), (Severity::Normal, 100, false));

        let herniation = FindingCounts {
            herniation: 1,
            ..Default::default()
        };
        let h = risk.spine_health(&herniation, RiskTier::Medium);
        assert_eq!((h.severity, h.consult_doctor), (Severity::Mild, false));

        let fracture = FindingCounts {
            fracture: 1,
            ..Default::default()
        };
        let h = risk.spine_health(&fracture, RiskTier::Medium);
        assert_eq!((h.severity, h.consult_doctor), (Severity::Moderate, true));

        let many = FindingCounts {
            fracture: 1,
            herniation: 1,
            sliding: 1,
        };
        assert_eq!(risk.spine_health(&many, RiskTier::High).severity, Severity::Severe);

        // A steep curve alone still sends the patient to a doctor.
        assert!(risk.spine_health(&none, RiskTier::High).consult_doctor);
    }

    #[test]
    fn test_spine_recommendations() {
        let risk = RiskClassifier::default();
        let findings = FindingCounts {
            sliding: 2,
            ..Default::default()
        };
        let health = risk.spine_health(&findings, RiskTier::Medium);
        let lines = risk.spine_recommendations(22.0, &findings, &health);

        assert!(lines[0].starts_with("2 vertebra(e) show alignment issues"));
        assert!(lines.iter().any(|l| l.contains("22.0 degrees")));
        assert!(lines.iter().any(|l| l.contains("bracing or surgery")));
        assert!(lines.last().unwrap().starts_with("Consult a spine specialist"));
    }

    #[test]
    fn test_posture_policy() {
        let risk = RiskClassifier::default();
        assert_eq!(
            risk.posture_verdict(HeadPosture::Normal, BackPosture::Normal),
            HEALTHY_POSTURE
        );
        assert_eq!(
            risk.posture_verdict(HeadPosture::Backward, BackPosture::Normal),
            CONSULT_A_DOCTOR
        );
        assert_eq!(risk.posture_score(HeadPosture::Forward, BackPosture::Kyphotic), 45);
        assert_eq!(risk.posture_score(HeadPosture::Normal, BackPosture::Normal), 100);

        let lines = risk.posture_recommendations(HeadPosture::Forward, BackPosture::Kyphotic);
        assert_eq!(lines.len(), 5);
        assert!(lines.last().unwrap().contains("physical therapist"));

        let healthy = risk.posture_recommendations(HeadPosture::Normal, BackPosture::Normal);
        assert_eq!(healthy.len(), 1);

        // A backward head only gets the closing therapist line.
        let backward = risk.posture_recommendations(HeadPosture::Backward, BackPosture::Normal);
        assert_eq!(backward.len(), 1);
        assert!(backward[0].contains("physical therapist"));
    }

    #[test]
    fn test_posture_health() {
        let risk = RiskClassifier::default();

        let h = risk.posture_health(HeadPosture::Normal, BackPosture::Normal);
        assert_eq!(
            (h.head_severity, h.back_severity, h.severity, h.consult_doctor),
            (Severity::Normal, Severity::Normal, Severity::Normal, false)
        );

        let h = risk.posture_health(HeadPosture::Forward, BackPosture::Normal);
        assert_eq!((h.head_severity, h.severity), (Severity::Moderate, Severity::Moderate));
        assert!(h.consult_doctor);

        let h = risk.posture_health(HeadPosture::Backward, BackPosture::Normal);
        assert_eq!((h.head_severity, h.severity), (Severity::Mild, Severity::Moderate));
        assert!(h.consult_doctor);

        let h = risk.posture_health(HeadPosture::Normal, BackPosture::Kyphotic);
        assert_eq!(
            (h.head_severity, h.back_severity, h.consult_doctor),
            (Severity::Normal, Severity::Moderate, true)
        );
    }
}

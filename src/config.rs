//! Engine configuration.
//!
//! Every threshold can be overridden by the host. Missing JSON fields fall
//! back to the defaults below.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Top-level configuration for the whole engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub decoder: DecoderConfig,
    pub nms: NmsConfig,
    pub spine: SpineConfig,
    pub posture: PostureConfig,
    pub risk: RiskConfig,
    /// Upper bound for one detector call, in milliseconds. `None` runs the
    /// detector inline without a bound.
    pub inference_timeout_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            nms: NmsConfig::default(),
            spine: SpineConfig::default(),
            posture: PostureConfig::default(),
            risk: RiskConfig::default(),
            inference_timeout_ms: Some(30_000),
        }
    }
}

impl AnalysisConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Inference bound as a `Duration`, if any.
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration for tensor decoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Minimum box confidence, exclusive.
    pub confidence_threshold: f32,
    /// Anchor count the detector must produce. `None` accepts any count.
    pub expected_anchors: Option<usize>,
    /// Minimum person confidence for pose tensors, exclusive.
    pub pose_confidence_threshold: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            expected_anchors: Some(8400),
            pose_confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NmsConfig {
    pub iou_threshold: f32,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self { iou_threshold: 0.45 }
    }
}

/// Thresholds for vertebra geometry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpineConfig {
    /// Shortest sequence that yields a measured report.
    pub min_vertebrae: usize,
    /// Horizontal offset tolerance as a fraction of box width.
    pub sliding_tolerance: f32,
    /// Height loss fraction that marks a compression fracture.
    pub fracture_height_loss: f32,
    /// Inter-vertebra gap limit as a fraction of the mean pair height.
    pub herniation_gap_ratio: f32,
    /// Mean width/height ratio above which the view is anterior-posterior.
    pub ap_aspect_ratio: f32,
}

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            min_vertebrae: 5,
            sliding_tolerance: 0.30,
            fracture_height_loss: 0.30,
            herniation_gap_ratio: 0.09,
            ap_aspect_ratio: 1.35,
        }
    }
}

/// Thresholds for posture deviation, as fractions of torso length.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    pub forward_head_ratio: f32,
    pub backward_head_ratio: f32,
    pub kyphosis_ratio: f32,
    /// Maps torso-relative deviation to display centimetres.
    pub display_scale: f32,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            forward_head_ratio: 0.15,
            backward_head_ratio: 0.10,
            kyphosis_ratio: 0.12,
            display_scale: 50.0,
        }
    }
}

/// Risk tier boundaries. All comparisons are strict.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub scoliosis_angle: f32,
    pub medium_angle: f32,
    pub high_angle: f32,
    pub severe_scoliosis_angle: f32,
    pub medium_findings: u32,
    pub high_findings: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            scoliosis_angle: 10.0,
            medium_angle: 10.0,
            high_angle: 25.0,
            severe_scoliosis_angle: 20.0,
            medium_findings: 0,
            high_findings: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "nms": { "iou_threshold": 0.6 }, "inference_timeout_ms": null }"#,
        )
        .unwrap();

        assert_eq!(config.nms.iou_threshold, 0.6);
        assert_eq!(config.decoder.confidence_threshold, 0.25);
        assert_eq!(config.spine.min_vertebrae, 5);
        assert!(config.inference_timeout().is_none());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = AnalysisConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, crate::AnalysisError::Config(_)));
    }
}

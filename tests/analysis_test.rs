use std::convert::Infallible;
use std::sync::Arc;

use ndarray::{Array2, ArrayD};
use spineai_rs::analysis::{
    BackPosture, HeadPosture, ImageView, PostureGeometryAnalyzer, SpineGeometryAnalyzer,
};
use spineai_rs::{
    AnalysisConfig, AnalysisKind, AnalysisPipeline, BoundingBox, BoxDecoder, DetectionSource,
    InputImage, Landmark, ModelOutput, NonMaxSuppressor, RiskTier,
};

fn vertebra(cx: f32, cy: f32) -> BoundingBox {
    BoundingBox::from_center(cx, cy, 40.0, 30.0, 0.9)
}

/// Planar `[5, N]` tensor from `(cx, cy, w, h, score)` rows.
fn box_tensor(anchors: &[[f32; 5]]) -> Vec<f32> {
    let n = anchors.len();
    let mut data = vec![0.0; 5 * n];
    for (i, a) in anchors.iter().enumerate() {
        for (attr, v) in a.iter().enumerate() {
            data[attr * n + i] = *v;
        }
    }
    data
}

struct ReplaySource {
    output: ModelOutput,
}

impl DetectionSource for ReplaySource {
    type Error = Infallible;

    fn input_size(&self) -> (usize, usize) {
        (16, 16)
    }

    fn detect(&self, _image: &InputImage, _kind: AnalysisKind) -> Result<ModelOutput, Infallible> {
        Ok(self.output.clone())
    }
}

#[test]
fn test_vertical_spine_is_healthy() {
    let analyzer = SpineGeometryAnalyzer::default();
    let boxes: Vec<_> = (0..7).map(|i| vertebra(100.0, 50.0 + i as f32 * 40.0)).collect();

    let result = analyzer.analyze(&boxes);
    assert!(!result.is_low_confidence());

    let report = result.report();
    assert!(report.cobb_angle_degrees.abs() < 1e-3);
    assert!(report.findings.is_empty());
    assert_eq!(report.risk_tier, RiskTier::Low);
    assert!(!report.is_scoliosis_likely);
    assert_eq!(report.image_view, ImageView::Lateral);
    assert!(!report.health.consult_doctor);
    assert!((report.measurements.avg_vertebra_height - 30.0).abs() < 1e-4);
}

#[test]
fn test_curved_spine_is_scoliotic() {
    let analyzer = SpineGeometryAnalyzer::default();
    let xs = [100.0, 100.0, 100.0, 100.0, 100.0, 110.0, 120.0, 130.0, 140.0];
    let boxes: Vec<_> = xs
        .iter()
        .enumerate()
        .map(|(i, &x)| vertebra(x, 50.0 + i as f32 * 40.0))
        .collect();

    let report = analyzer.analyze(&boxes).into_report();

    // Steepest smoothed tangent runs 20 across per 80 down; the top is vertical.
    let expected = 20.0f32.atan2(80.0).to_degrees();
    assert!((report.cobb_angle_degrees - expected).abs() < 1e-3);
    assert!(report.is_scoliosis_likely);
    assert!(report.findings.is_empty());
    assert_eq!(report.risk_tier, RiskTier::Medium);
    assert!(
        report
            .recommendations
            .iter()
            .any(|l| l.contains("scoliosis likely"))
    );
}

#[test]
fn test_decode_suppress_analyze() {
    let decoder = BoxDecoder::default().with_expected_anchors(None);
    let nms = NonMaxSuppressor::default();

    let mut rows = Vec::new();
    for i in 0..7 {
        let cy = 50.0 + i as f32 * 40.0;
        rows.push([100.0, cy, 40.0, 30.0, 0.9]);
        // Shifted duplicate of the same vertebra
        rows.push([102.0, cy, 40.0, 30.0, 0.6]);
    }
    // Background noise below the confidence threshold
    rows.push([300.0, 300.0, 40.0, 30.0, 0.1]);
    rows.push([10.0, 10.0, 40.0, 30.0, 0.25]);
    let data = box_tensor(&rows);

    let raw = decoder.decode_flat(&data, 5, rows.len()).unwrap();
    assert_eq!(raw.len(), 14);

    let kept = nms.suppress_raw(&raw);
    assert_eq!(kept.len(), 7);
    assert!(kept.iter().all(|b| (b.center().x - 100.0).abs() < 1e-4));

    let report = SpineGeometryAnalyzer::default().analyze(&kept).into_report();
    assert!(report.cobb_angle_degrees.abs() < 1e-3);
    assert_eq!(report.risk_tier, RiskTier::Low);
}

#[test]
fn test_posture_forward_head_and_kyphosis() {
    let analyzer = PostureGeometryAnalyzer::default();
    let kp = spineai_rs::KeypointMap::new()
        .with(Landmark::Nose, 380.0, 95.0)
        .with(Landmark::LeftEar, 350.0, 100.0)
        .with(Landmark::RightEar, 350.0, 100.0)
        .with(Landmark::LeftShoulder, 330.0, 200.0)
        .with(Landmark::RightShoulder, 330.0, 200.0)
        .with(Landmark::LeftHip, 300.0, 400.0)
        .with(Landmark::RightHip, 300.0, 400.0);

    let report = analyzer.analyze(&kp).into_report();

    // torso 200: head 20 ahead is under 30, shoulders 30 ahead exceed 24.
    assert_eq!(report.head_posture_status, HeadPosture::Normal);
    assert_eq!(report.back_posture_status, BackPosture::Kyphotic);
    assert!((report.back_deviation_cm - 7.5).abs() < 1e-4);
    assert!((report.head_deviation_cm - 5.0).abs() < 1e-4);
    assert_eq!(report.recommendation, "CONSULT A DOCTOR");
}

#[test]
fn test_pipeline_with_pose_tensor() {
    // Two anchors; the second is the confident person.
    let mut t = Array2::<f32>::zeros((56, 2));
    t[[4, 0]] = 0.3;
    t[[4, 1]] = 0.8;
    let place = |t: &mut Array2<f32>, l: Landmark, x: f32, y: f32| {
        let row = 5 + 3 * l.coco_index();
        t[[row, 1]] = x;
        t[[row + 1, 1]] = y;
        t[[row + 2, 1]] = 0.9;
    };
    place(&mut t, Landmark::Nose, 390.0, 95.0);
    place(&mut t, Landmark::LeftEar, 360.0, 100.0);
    place(&mut t, Landmark::RightEar, 360.0, 100.0);
    place(&mut t, Landmark::LeftShoulder, 300.0, 200.0);
    place(&mut t, Landmark::RightShoulder, 300.0, 200.0);
    place(&mut t, Landmark::LeftHip, 300.0, 400.0);
    place(&mut t, Landmark::RightHip, 300.0, 400.0);
    let tensor: ArrayD<f32> = t.insert_axis(ndarray::Axis(0)).into_dyn();

    let mut config = AnalysisConfig::default();
    config.decoder.expected_anchors = None;
    let source = Arc::new(ReplaySource {
        output: ModelOutput::PoseTensor(tensor),
    });
    let pipeline = AnalysisPipeline::new(source, config);

    let result = pipeline
        .analyze(InputImage::zeros(16, 16), AnalysisKind::Posture)
        .unwrap();
    assert!(!result.is_low_confidence());

    let report = result.report().as_posture().unwrap();
    assert_eq!(report.head_posture_status, HeadPosture::Forward);
    assert_eq!(report.back_posture_status, BackPosture::Normal);
    assert!((report.head_deviation_cm - 15.0).abs() < 1e-3);
}

#[test]
fn test_report_json_shape() {
    let mut config = AnalysisConfig::from_json_str(r#"{ "decoder": { "expected_anchors": null } }"#)
        .unwrap();
    config.inference_timeout_ms = None;
    let rows: Vec<_> = (0..3)
        .map(|i| [100.0, 50.0 + i as f32 * 40.0, 40.0, 30.0, 0.9])
        .collect();
    let data = box_tensor(&rows);
    let tensor = ArrayD::from_shape_vec(vec![1, 5, 3], data).unwrap();

    let source = Arc::new(ReplaySource {
        output: ModelOutput::BoxTensor(tensor),
    });
    let pipeline = AnalysisPipeline::new(source, config);
    let result = pipeline
        .analyze(InputImage::zeros(16, 16), AnalysisKind::Spine)
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "low_confidence");
    assert_eq!(json["reason"]["kind"], "insufficient_vertebrae");
    assert_eq!(json["reason"]["detected"], 3);
    assert_eq!(json["report"]["kind"], "spine");
    assert_eq!(json["report"]["risk_tier"], "LOW");
    assert_eq!(json["report"]["cobb_angle_degrees"], 0.0);
    assert_eq!(json["report"]["findings"]["fracture"], 0);
}

//! End-to-end training and detection scenarios

use ndarray::array;
use pft_algorithms::classification::{KmeansParams, PixelLabel};
use pft_algorithms::pipeline::{DetectionParams, TrainedModel, Trainer, TrainingParams};
use pft_core::{ClassLabel, Error, FeatureCube, Mask, Sample};

const TARGET: [f64; 2] = [1.0, 0.0];
const NON_TARGET: [f64; 2] = [0.0, 1.0];

/// Uniform sample with a small checkerboard jitter on every channel
fn jittered(id: &str, rows: usize, cols: usize, center: &[f64], jitter: f64) -> Sample {
    let channels = center.len();
    let mut data = Vec::with_capacity(rows * cols * channels);
    for r in 0..rows {
        for c in 0..cols {
            for (ch, &v) in center.iter().enumerate() {
                let sign = if (r + c + ch) % 2 == 0 { 1.0 } else { -1.0 };
                data.push(v + sign * jitter);
            }
        }
    }
    let features = FeatureCube::from_vec(data, rows, cols, channels).unwrap();
    Sample::new(id, features, Mask::filled(rows, cols, true))
}

fn training_set() -> Vec<Sample> {
    vec![
        jittered("t1", 4, 4, &TARGET, 0.01).with_label(ClassLabel::Target),
        jittered("n1", 4, 4, &NON_TARGET, 0.01).with_label(ClassLabel::NonTarget),
        jittered("t2", 4, 4, &TARGET, 0.01).with_label(ClassLabel::Target),
        jittered("n2", 4, 4, &NON_TARGET, 0.01).with_label(ClassLabel::NonTarget),
    ]
}

fn params(k: usize) -> TrainingParams {
    TrainingParams {
        kmeans: KmeansParams {
            k,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn trained() -> TrainedModel {
    Trainer::new(params(2)).train(&training_set()).unwrap().0
}

#[test]
fn two_clusters_select_target_cluster() {
    let model = trained();
    let classifier = model.classifier();

    let PixelLabel::Cluster(target) = classifier.label_vector(array![1.0, 0.0].view()) else {
        panic!("target vector labeled as outlier");
    };
    let PixelLabel::Cluster(other) = classifier.label_vector(array![0.0, 1.0].view()) else {
        panic!("non-target vector labeled as outlier");
    };
    assert_ne!(target, other);

    let template = model.template();
    assert_eq!(template.clusters(), &[target]);
    assert_eq!(template.contrast(), 1.0);
    assert_eq!(template.proportion(target), Some(1.0));
    assert_eq!(template.proportion(other), Some(0.0));
    assert!((template.global_target_fraction() - 0.5).abs() < 1e-12);
}

#[test]
fn target_sample_is_detected() {
    let model = trained();
    let sample = jittered("query", 10, 10, &TARGET, 0.0);
    let detection = model.detect(&sample, &DetectionParams::default()).unwrap();

    assert_eq!(detection.sample, "query");
    assert_eq!(detection.regions.len(), 1);
    assert_eq!(detection.regions[0].coverage, 1.0);
    assert!(detection.regions[0].positive);
    assert!(detection.is_positive());
    assert_eq!(detection.positive_mask.count_true(), 100);
    // 4-pixel band around a 10x10 region touching the border
    assert_eq!(detection.contour.count_true(), 100 - 4);
    assert!(!detection.contour[(4, 4)]);
    assert!(detection.contour[(0, 0)]);
}

#[test]
fn non_target_sample_is_rejected() {
    let model = trained();
    let sample = jittered("query", 10, 10, &NON_TARGET, 0.0);
    let detection = model.detect(&sample, &DetectionParams::default()).unwrap();

    assert_eq!(detection.regions.len(), 1);
    assert_eq!(detection.regions[0].coverage, 0.0);
    assert!(!detection.is_positive());
    assert!(!detection.contour.any());
}

#[test]
fn far_pixels_are_outliers() {
    let model = trained();
    let label = model.classifier().label_vector(array![10.0, 10.0].view());
    assert_eq!(label, PixelLabel::Outlier);
}

#[test]
fn empty_foreground_yields_empty_detection() {
    let model = trained();
    let mut sample = jittered("empty", 6, 6, &TARGET, 0.0);
    sample.mask = Mask::filled(6, 6, false);

    let detection = model.detect(&sample, &DetectionParams::default()).unwrap();
    assert!(detection.regions.is_empty());
    assert!(!detection.positive_mask.any());
    assert!(!detection.contour.any());
    assert!(detection.labeling.data().iter().all(|l| l.is_outlier()));
}

#[test]
fn batch_detection_skips_malformed_samples() {
    let model = trained();
    let mut with_nan = jittered("nan", 5, 5, &TARGET, 0.0);
    with_nan.features.set_pixel(2, 2, &[f64::NAN, 0.0]).unwrap();

    let samples = vec![
        jittered("good", 5, 5, &TARGET, 0.0),
        jittered("wide", 5, 5, &[1.0, 0.0, 0.0], 0.0),
        with_nan.clone(),
    ];
    let batch = model.detect_batch(&samples, &DetectionParams::default()).unwrap();
    assert_eq!(batch.detections.len(), 1);
    assert_eq!(batch.detections[0].0, 0);
    assert_eq!(batch.detections[0].1.sample, "good");
    let skipped: Vec<&str> = batch.skipped.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(skipped, vec!["wide", "nan"]);

    // masking the bad pixel makes the sample usable
    let err = model.detect(&with_nan, &DetectionParams::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidFeature { row: 2, col: 2, channel: 0, .. }));
    let repaired = with_nan.mask_non_finite();
    let detection = model.detect(&repaired, &DetectionParams::default()).unwrap();
    assert_eq!(detection.regions[0].pixel_count, 24);
}

#[test]
fn batch_detection_keeps_input_positions_for_shared_ids() {
    let model = trained();
    let samples = vec![
        jittered("same", 6, 6, &NON_TARGET, 0.0),
        jittered("bad", 6, 6, &[1.0, 0.0, 0.0], 0.0),
        jittered("same", 6, 6, &TARGET, 0.0),
    ];
    let batch = model.detect_batch(&samples, &DetectionParams::default()).unwrap();

    let positions: Vec<usize> = batch.detections.iter().map(|(i, _)| *i).collect();
    assert_eq!(positions, vec![0, 2]);
    assert!(!batch.detections[0].1.is_positive());
    assert!(batch.detections[1].1.is_positive());
    assert_eq!(batch.skipped[0].id, "bad");
}

#[test]
fn odd_width_first_sample_does_not_set_dimensionality() {
    let mut samples = vec![jittered("wide", 4, 4, &[1.0, 0.0, 0.0], 0.01).with_label(ClassLabel::Target)];
    samples.extend(training_set());

    let (model, report) = Trainer::new(params(2)).train(&samples).unwrap();
    assert_eq!(model.dim(), 2);
    assert_eq!(report.target_samples, 2);
    assert_eq!(report.non_target_samples, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, "wide");
    assert_eq!(model.template().contrast(), 1.0);
}

/// Save the trained model, apply `edit` to its JSON and load it back
fn load_edited(edit: impl FnOnce(&mut serde_json::Value)) -> Result<TrainedModel, Error> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    trained().save_json(&path).unwrap();

    let mut value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    edit(&mut value);
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
    TrainedModel::load_json(&path)
}

#[test]
fn edited_model_tables_are_rejected() {
    assert!(load_edited(|_| {}).is_ok());

    let short = serde_json::json!({ "v": 1, "dim": [1], "data": [1.0] });

    let err = load_edited(|m| m["normalizer"]["scale"] = short.clone()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = load_edited(|m| m["statistics"]["thresholds"] = short.clone()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = load_edited(|m| m["statistics"]["counts"] = serde_json::json!([1])).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = load_edited(|m| m["template"]["proportions"] = serde_json::json!([0.5])).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn zero_clusters_is_configuration_error() {
    let err = Trainer::new(params(0)).train(&training_set()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn too_few_vectors_is_configuration_error() {
    let err = Trainer::new(params(100)).train(&training_set()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn full_batch_training_selects_same_template() {
    let mut p = params(2);
    p.mini_batch = false;
    let (model, report) = Trainer::new(p).train(&training_set()).unwrap();
    assert!(report.converged);
    assert_eq!(report.vectors, 64);
    assert_eq!(model.template().len(), 1);
    assert_eq!(model.template().contrast(), 1.0);
}

#[test]
fn model_json_round_trip() {
    let model = trained();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    model.save_json(&path).unwrap();

    let loaded = TrainedModel::load_json(&path).unwrap();
    assert_eq!(loaded.template().clusters(), model.template().clusters());
    assert_eq!(loaded.params(), model.params());

    let sample = jittered("query", 8, 8, &TARGET, 0.005);
    let params = DetectionParams::default();
    let a = model.detect(&sample, &params).unwrap();
    let b = loaded.detect(&sample, &params).unwrap();
    assert_eq!(a.labeling, b.labeling);
    assert_eq!(a.regions, b.regions);
    assert_eq!(a.contour, b.contour);
}

#[test]
fn detection_params_fill_defaults_from_json() {
    let params: DetectionParams =
        serde_json::from_str(r#"{ "region": { "decision_threshold": 0.5 } }"#).unwrap();
    assert_eq!(params.region.decision_threshold, 0.5);
    assert_eq!(params.contour.thickness, 4);
    assert!(params.region.cleanup.is_none());
}

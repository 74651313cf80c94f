//! Training: labeled samples to a frozen [`TrainedModel`]
//!
//! Every stage consumes one sample's foreground at a time; the full pixel
//! population is only concatenated when full-batch K-means is requested.

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use pft_core::{ClassLabel, Error, Result, Sample};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classification::{
    validate_retention, Classifier, ClusterAccumulator, ClusterCounts, Codebook, FitSummary, Kmeans,
    KmeansParams, MiniBatchKmeans, Normalizer, NormalizerAccumulator, TemplateBuilder, VectorQuantizer,
    DEFAULT_RETENTION_FRACTION,
};

use super::model::TrainedModel;

/// Parameters for [`Trainer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub kmeans: KmeansParams,
    /// Fraction of clusters retained as template candidates, in (0, 1]
    pub retention_fraction: f64,
    /// Use streaming mini-batch K-means instead of full-batch Lloyd
    pub mini_batch: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            kmeans: KmeansParams::default(),
            retention_fraction: DEFAULT_RETENTION_FRACTION,
            mini_batch: true,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<()> {
        self.kmeans.validate()?;
        validate_retention(self.retention_fraction)
    }
}

/// A sample left out of training or detection, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSample {
    pub id: String,
    pub reason: String,
}

/// Diagnostics of one training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    pub target_samples: usize,
    pub non_target_samples: usize,
    pub skipped: Vec<SkippedSample>,
    /// Foreground vectors used for fitting
    pub vectors: u64,
    pub iterations: usize,
    pub converged: bool,
    pub degenerate_features: Vec<usize>,
    pub degenerate_clusters: Vec<usize>,
    /// Training pixels rejected by their cluster's outlier test
    pub outliers: u64,
}

/// Builds a [`TrainedModel`] from labeled samples
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    params: TrainingParams,
}

impl Trainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Train on `samples`.
    ///
    /// The feature dimensionality is the channel count shared by most labeled
    /// samples. Samples that are malformed, unlabeled, of another width or
    /// carry non-finite foreground values are skipped and listed in the report.
    pub fn train(&self, samples: &[Sample]) -> Result<(TrainedModel, TrainingReport)> {
        let params = &self.params;
        params.validate()?;

        let dim = majority_channels(samples)
            .ok_or_else(|| Error::Configuration("no labeled training samples".into()))?;

        let mut report = TrainingReport::default();
        let mut usable: Vec<(&Sample, ClassLabel)> = Vec::with_capacity(samples.len());
        for sample in samples {
            match sample.validate_labeled(dim) {
                Ok(class) => {
                    match class {
                        ClassLabel::Target => report.target_samples += 1,
                        ClassLabel::NonTarget => report.non_target_samples += 1,
                    }
                    usable.push((sample, class));
                }
                Err(e) if e.is_sample_local() => {
                    warn!(sample = %sample.id, error = %e, "skipping training sample");
                    report.skipped.push(SkippedSample {
                        id: sample.id.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if report.target_samples == 0 || report.non_target_samples == 0 {
            return Err(Error::Configuration(format!(
                "training needs both classes (usable: {} target, {} non-target)",
                report.target_samples, report.non_target_samples
            )));
        }

        // Normalizer
        let mut moments = NormalizerAccumulator::new(dim);
        for (sample, _) in &usable {
            let raw = sample.features.select(&sample.mask)?;
            moments.update(raw.view())?;
        }
        report.vectors = moments.count();
        params.kmeans.validate_for(report.vectors as usize)?;
        let normalizer = moments.finish()?;
        report.degenerate_features = normalizer.degenerate_features().to_vec();
        debug!(vectors = report.vectors, dim, "normalizer fitted");

        // Quantizer
        let (codebook, summary) = self.quantize(&usable, &normalizer)?;
        report.iterations = summary.iterations;
        report.converged = summary.converged;
        debug!(
            k = codebook.k(),
            iterations = summary.iterations,
            converged = summary.converged,
            "codebook fitted"
        );

        // Cluster statistics
        let mut clusters = ClusterAccumulator::new(codebook.k(), dim);
        for (sample, _) in &usable {
            let data = normalized_foreground(sample, &normalizer)?;
            let assignment = codebook.predict_batch(data.view());
            clusters.update(data.view(), &assignment)?;
        }
        let statistics = clusters.finish(&codebook);
        report.degenerate_clusters = statistics.degenerate_clusters().to_vec();

        // Template
        let classifier = Classifier::new(&normalizer, &codebook, &statistics);
        let mut counts = ClusterCounts::new(codebook.k());
        for (sample, class) in &usable {
            let data = normalized_foreground(sample, &normalizer)?;
            let labels = classifier.label_normalized_batch(data.view());
            report.outliers += labels.iter().filter(|l| l.is_outlier()).count() as u64;
            counts.record_all(*class, labels)?;
        }
        let template = TemplateBuilder::new(params.retention_fraction)?.build(&counts);

        info!(
            samples = usable.len(),
            skipped = report.skipped.len(),
            vectors = report.vectors,
            k = codebook.k(),
            template = template.len(),
            contrast = template.contrast(),
            "training complete"
        );

        let model = TrainedModel::new(normalizer, codebook, statistics, template, params.clone())?;
        Ok((model, report))
    }

    fn quantize(&self, usable: &[(&Sample, ClassLabel)], normalizer: &Normalizer) -> Result<(Codebook, FitSummary)> {
        let kmeans = self.params.kmeans.clone();
        let with_pixels = move || {
            usable
                .iter()
                .filter(|(s, _)| s.foreground_count() > 0)
                .map(move |(s, _)| normalized_foreground(s, normalizer))
        };

        if self.params.mini_batch {
            return MiniBatchKmeans::new(kmeans).fit_stream(with_pixels);
        }

        let parts = with_pixels().collect::<Result<Vec<Array2<f64>>>>()?;
        let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|p| p.view()).collect();
        let data = concatenate(Axis(0), &views)?;
        let fit = Kmeans::new(kmeans).fit(data.view())?;
        Ok((fit.codebook, fit.summary))
    }
}

/// Channel count shared by most labeled samples; ties go to the count seen first
fn majority_channels(samples: &[Sample]) -> Option<usize> {
    let mut tally: Vec<(usize, usize)> = Vec::new();
    for sample in samples.iter().filter(|s| s.label.is_some()) {
        let channels = sample.channels();
        match tally.iter_mut().find(|(c, _)| *c == channels) {
            Some((_, n)) => *n += 1,
            None => tally.push((channels, 1)),
        }
    }
    tally.into_iter().rev().max_by_key(|&(_, n)| n).map(|(c, _)| c)
}

fn normalized_foreground(sample: &Sample, normalizer: &Normalizer) -> Result<Array2<f64>> {
    let raw = sample.features.select(&sample.mask)?;
    normalizer.transform_batch(raw.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pft_core::{FeatureCube, Mask};

    fn labeled(id: &str, value: &[f64], class: ClassLabel) -> Sample {
        Sample::new(id, FeatureCube::uniform(4, 4, value), Mask::filled(4, 4, true)).with_label(class)
    }

    fn small_params(k: usize) -> TrainingParams {
        TrainingParams {
            kmeans: KmeansParams {
                k,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_params() {
        let params = TrainingParams::default();
        assert_eq!(params.kmeans.k, 512);
        assert_eq!(params.retention_fraction, 0.85);
        assert!(params.mini_batch);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_retention() {
        let params = TrainingParams {
            retention_fraction: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_requires_both_classes() {
        let samples = vec![labeled("a", &[1.0, 0.0], ClassLabel::Target)];
        let err = Trainer::new(small_params(1)).train(&samples).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_no_samples() {
        let err = Trainer::new(small_params(1)).train(&[]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_majority_channels() {
        let samples = vec![
            labeled("wide", &[1.0, 1.0, 1.0], ClassLabel::Target),
            Sample::new("unlabeled", FeatureCube::uniform(2, 2, &[1.0, 1.0, 1.0]), Mask::filled(2, 2, true)),
            labeled("t", &[1.0, 0.0], ClassLabel::Target),
            labeled("n", &[0.0, 1.0], ClassLabel::NonTarget),
        ];
        assert_eq!(majority_channels(&samples), Some(2));
        // tie: first seen wins
        assert_eq!(majority_channels(&samples[..3]), Some(3));
        assert_eq!(majority_channels(&samples[1..2]), None);
    }

    #[test]
    fn test_skips_unlabeled_and_misshaped() {
        let samples = vec![
            labeled("t", &[1.0, 0.0], ClassLabel::Target),
            labeled("n", &[0.0, 1.0], ClassLabel::NonTarget),
            Sample::new("unlabeled", FeatureCube::uniform(4, 4, &[1.0, 1.0]), Mask::filled(4, 4, true)),
            labeled("wide", &[1.0, 1.0, 1.0], ClassLabel::Target),
        ];
        let (model, report) = Trainer::new(small_params(2)).train(&samples).unwrap();
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].id, "unlabeled");
        assert_eq!(report.target_samples, 1);
        assert_eq!(report.vectors, 32);
        assert_eq!(model.codebook().k(), 2);
    }

    #[test]
    fn test_full_batch_matches_mini_batch_on_separated_data() {
        let samples = vec![
            labeled("t", &[5.0, 5.0], ClassLabel::Target),
            labeled("n", &[-5.0, -5.0], ClassLabel::NonTarget),
        ];
        let mut params = small_params(2);
        let (mini, _) = Trainer::new(params.clone()).train(&samples).unwrap();
        params.mini_batch = false;
        let (full, _) = Trainer::new(params).train(&samples).unwrap();

        assert_eq!(mini.template().len(), 1);
        assert_eq!(full.template().len(), 1);
        assert_eq!(mini.template().contrast(), 1.0);
        assert_eq!(full.template().contrast(), 1.0);
    }
}

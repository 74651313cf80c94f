//! The frozen result of training

use std::path::Path;

use pft_core::io::{read_json, write_json};
use pft_core::{Error, Result, Sample};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classification::{Classifier, ClusterStatistics, Codebook, Normalizer, PixelLabeling, Template};
use crate::maybe_rayon::*;

use super::detect::{detect, Detection, DetectionParams};
use super::train::{SkippedSample, TrainingParams};

/// Normalizer, codebook, cluster statistics and template bundled together.
///
/// Immutable once built; share it by reference across threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    normalizer: Normalizer,
    codebook: Codebook,
    statistics: ClusterStatistics,
    template: Template,
    params: TrainingParams,
}

/// Detections of a batch of samples plus the samples that could not be processed
#[derive(Debug, Clone)]
pub struct BatchDetection {
    /// Detections tagged with the position of their sample in the input slice
    pub detections: Vec<(usize, Detection)>,
    pub skipped: Vec<SkippedSample>,
}

impl TrainedModel {
    /// Bundle trained components, checking that their shapes agree
    pub fn new(
        normalizer: Normalizer,
        codebook: Codebook,
        statistics: ClusterStatistics,
        template: Template,
        params: TrainingParams,
    ) -> Result<Self> {
        let model = Self {
            normalizer,
            codebook,
            statistics,
            template,
            params,
        };
        model.check_consistency()?;
        Ok(model)
    }

    fn check_consistency(&self) -> Result<()> {
        self.normalizer.check_shape()?;
        self.statistics.check_shape()?;
        self.template.check_shape()?;

        let k = self.codebook.k();
        let dim = self.normalizer.dim();
        if k == 0 {
            return Err(Error::Configuration("model has an empty codebook".into()));
        }
        if self.statistics.k() != k || self.template.k() != k {
            return Err(Error::Configuration(format!(
                "cluster counts disagree: codebook {k}, statistics {}, template {}",
                self.statistics.k(),
                self.template.k()
            )));
        }
        if self.codebook.dim() != dim || self.statistics.mean(0).len() != dim {
            return Err(Error::Configuration(format!(
                "feature dimensions disagree: normalizer {dim}, codebook {}, statistics {}",
                self.codebook.dim(),
                self.statistics.mean(0).len()
            )));
        }
        Ok(())
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    pub fn statistics(&self) -> &ClusterStatistics {
        &self.statistics
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Number of feature channels expected in samples
    pub fn dim(&self) -> usize {
        self.normalizer.dim()
    }

    pub fn classifier(&self) -> Classifier<'_> {
        Classifier::new(&self.normalizer, &self.codebook, &self.statistics)
    }

    /// Label every pixel of a sample
    pub fn classify(&self, sample: &Sample) -> Result<PixelLabeling> {
        self.classifier().classify(sample)
    }

    /// Classify, vote and contour one sample
    pub fn detect(&self, sample: &Sample, params: &DetectionParams) -> Result<Detection> {
        detect(self, sample, params)
    }

    /// Detect on independent samples in parallel.
    ///
    /// Malformed samples are skipped and reported; any other failure aborts the
    /// batch. Sample ids need not be unique; pair results with inputs by index.
    pub fn detect_batch(&self, samples: &[Sample], params: &DetectionParams) -> Result<BatchDetection> {
        params.validate()?;
        let results: Vec<Result<Detection>> = samples.par_iter().map(|s| self.detect(s, params)).collect();

        let mut batch = BatchDetection {
            detections: Vec::with_capacity(samples.len()),
            skipped: Vec::new(),
        };
        for (index, (sample, result)) in samples.iter().zip(results).enumerate() {
            match result {
                Ok(detection) => batch.detections.push((index, detection)),
                Err(e) if e.is_sample_local() => {
                    warn!(sample = %sample.id, error = %e, "skipping sample");
                    batch.skipped.push(SkippedSample {
                        id: sample.id.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(batch)
    }

    /// Write the model as pretty-printed JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(self, path)
    }

    /// Read a model written by [`TrainedModel::save_json`]
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model: TrainedModel = read_json(path)?;
        model.check_consistency()?;
        Ok(model)
    }
}

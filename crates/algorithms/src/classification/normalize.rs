//! Per-feature z-score standardization
//!
//! `x' = (x - μ) / σ` with μ and σ the population mean and standard deviation
//! of every feature over the training pixels. Fitting is streaming: batches are
//! merged with Chan's parallel moment formula, so memory stays proportional to
//! the feature count.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use pft_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Denominator substituted for features with zero training variance
pub const DEGENERATE_STD: f64 = 1e-8;

/// Fitted standardization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    mean: Array1<f64>,
    /// Per-feature denominator (σ, or [`DEGENERATE_STD`] for degenerate features)
    scale: Array1<f64>,
    /// Features whose σ was replaced by [`DEGENERATE_STD`]
    degenerate_features: Vec<usize>,
    /// Number of training vectors the parameters were fit on
    n_samples: u64,
}

impl Normalizer {
    /// Fit on a single `n x d` matrix.
    pub fn fit(data: ArrayView2<'_, f64>) -> Result<Self> {
        let mut acc = NormalizerAccumulator::new(data.ncols());
        acc.update(data)?;
        acc.finish()
    }

    /// Feature dimensionality
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    /// Check that mean and scale cover the same features and that no scale is
    /// zero or non-finite
    pub fn check_shape(&self) -> Result<()> {
        if self.scale.len() != self.mean.len() {
            return Err(Error::Configuration(format!(
                "normalizer has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if let Some(i) = self.scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(Error::Configuration(format!("normalizer scale of feature {i} is {}", self.scale[i])));
        }
        Ok(())
    }

    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }

    pub fn degenerate_features(&self) -> &[usize] {
        &self.degenerate_features
    }

    pub fn n_samples(&self) -> u64 {
        self.n_samples
    }

    /// Standardize one vector.
    ///
    /// # Panics
    /// If `vector.len() != self.dim()`. Sample validation guarantees this for
    /// pipeline callers.
    pub fn transform(&self, vector: ArrayView1<'_, f64>) -> Array1<f64> {
        (&vector - &self.mean) / &self.scale
    }

    /// Standardize every row of an `n x d` matrix
    pub fn transform_batch(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.dim() {
            return Err(Error::InvalidParameter {
                name: "data",
                value: format!("{} columns", data.ncols()),
                reason: format!("normalizer was fit on {} features", self.dim()),
            });
        }
        Ok((&data - &self.mean) / &self.scale)
    }
}

/// Streaming accumulator of per-feature moments.
#[derive(Debug, Clone)]
pub struct NormalizerAccumulator {
    count: u64,
    mean: Array1<f64>,
    m2: Array1<f64>,
}

impl NormalizerAccumulator {
    pub fn new(dim: usize) -> Self {
        Self {
            count: 0,
            mean: Array1::zeros(dim),
            m2: Array1::zeros(dim),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Merge one batch of vectors (rows) into the running moments
    pub fn update(&mut self, batch: ArrayView2<'_, f64>) -> Result<()> {
        if batch.ncols() != self.mean.len() {
            return Err(Error::InvalidParameter {
                name: "batch",
                value: format!("{} columns", batch.ncols()),
                reason: format!("accumulator expects {} features", self.mean.len()),
            });
        }
        let n_b = batch.nrows() as u64;
        if n_b == 0 {
            return Ok(());
        }

        let mean_b = batch.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(batch.ncols()));
        let centered = &batch - &mean_b;
        let m2_b = centered.mapv(|v| v * v).sum_axis(Axis(0));

        let n_a = self.count as f64;
        let n_bf = n_b as f64;
        let n = n_a + n_bf;
        let delta = &mean_b - &self.mean;

        self.mean = &self.mean + &(&delta * (n_bf / n));
        self.m2 = &self.m2 + &m2_b + &(delta.mapv(|d| d * d) * (n_a * n_bf / n));
        self.count += n_b;
        Ok(())
    }

    /// Freeze into a [`Normalizer`]
    pub fn finish(self) -> Result<Normalizer> {
        if self.count == 0 {
            return Err(Error::Configuration(
                "cannot fit normalizer on zero vectors".into(),
            ));
        }

        let n = self.count as f64;
        let mut degenerate_features = Vec::new();
        let scale: Array1<f64> = self
            .m2
            .iter()
            .enumerate()
            .map(|(i, &m2)| {
                let std = (m2 / n).max(0.0).sqrt();
                if std < DEGENERATE_STD {
                    degenerate_features.push(i);
                    DEGENERATE_STD
                } else {
                    std
                }
            })
            .collect();

        if !degenerate_features.is_empty() {
            warn!(
                features = ?degenerate_features,
                "zero-variance features; substituting {DEGENERATE_STD:e} as denominator"
            );
        }

        Ok(Normalizer {
            mean: self.mean,
            scale,
            degenerate_features,
            n_samples: self.count,
        })
    }
}

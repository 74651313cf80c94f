//! K-means clustering of pixel feature vectors
//!
//! Full-batch Lloyd iterations: assign every vector to its nearest centroid,
//! move each centroid to the mean of its members, repeat until the largest
//! centroid shift drops below tolerance.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::maybe_rayon::*;
use pft_core::{Error, Result};

use super::codebook::{nearest_centroid, squared_distance, Codebook, FitSummary, QuantizerFit, VectorQuantizer};

/// Parameters for K-means clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmeansParams {
    /// Number of clusters (default: 512)
    pub k: usize,
    /// Maximum Lloyd iterations / mini-batch epochs (default: 100)
    pub max_iterations: usize,
    /// Stop when no centroid moves farther than this (default: 1e-4)
    pub tolerance: f64,
    /// Seed for centroid initialization
    pub seed: u64,
    /// Mini-batch size; `None` uses `10 * k`. Ignored by full-batch [`Kmeans`].
    pub batch_size: Option<usize>,
}

impl Default for KmeansParams {
    fn default() -> Self {
        Self {
            k: 512,
            max_iterations: 100,
            tolerance: 1e-4,
            seed: 2023214566,
            batch_size: None,
        }
    }
}

impl KmeansParams {
    /// Check parameters that do not depend on the data
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::Configuration("number of clusters must be > 0".into()));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                value: "0".into(),
                reason: "at least one iteration is required".into(),
            });
        }
        if !(self.tolerance >= 0.0) || !self.tolerance.is_finite() {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                value: self.tolerance.to_string(),
                reason: "tolerance must be finite and non-negative".into(),
            });
        }
        if self.batch_size == Some(0) {
            return Err(Error::InvalidParameter {
                name: "batch_size",
                value: "0".into(),
                reason: "batch size must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// [`KmeansParams::validate`] plus the requirement of at least `k` training vectors
    pub fn validate_for(&self, n_vectors: usize) -> Result<()> {
        self.validate()?;
        if n_vectors < self.k {
            return Err(Error::Configuration(format!(
                "not enough training vectors ({n_vectors}) for {} clusters",
                self.k
            )));
        }
        Ok(())
    }

    /// Effective mini-batch size
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(10 * self.k)
    }
}

/// Full-batch (Lloyd) K-means quantizer
#[derive(Debug, Clone, Default)]
pub struct Kmeans {
    params: KmeansParams,
}

impl Kmeans {
    pub fn new(params: KmeansParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KmeansParams {
        &self.params
    }
}

impl VectorQuantizer for Kmeans {
    fn k(&self) -> usize {
        self.params.k
    }

    fn fit(&self, data: ArrayView2<'_, f64>) -> Result<QuantizerFit> {
        let params = &self.params;
        params.validate_for(data.nrows())?;

        let k = params.k;
        let d = data.ncols();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut centroids = kmeans_plus_plus(data, k, &mut rng);
        let mut labels = vec![0usize; data.nrows()];
        let mut summary = FitSummary {
            iterations: 0,
            converged: false,
        };

        for iter in 0..params.max_iterations {
            summary.iterations = iter + 1;

            // Assignment step
            let current = centroids.view();
            labels.par_iter_mut().enumerate().for_each(|(i, label)| {
                *label = nearest_centroid(current, data.row(i)).0;
            });

            // Update step
            let mut sums = Array2::<f64>::zeros((k, d));
            let mut counts = vec![0usize; k];
            for (i, &label) in labels.iter().enumerate() {
                let mut row = sums.row_mut(label);
                row += &data.row(i);
                counts[label] += 1;
            }

            let mut max_shift = 0.0_f64;
            for (c, &count) in counts.iter().enumerate() {
                if count == 0 {
                    continue; // empty cluster keeps its centroid
                }
                let mut row = sums.row_mut(c);
                row /= count as f64;
                max_shift = max_shift.max(squared_distance(row.view(), centroids.row(c)).sqrt());
                centroids.row_mut(c).assign(&row);
            }

            debug!(iteration = iter + 1, max_shift, "k-means iteration");
            if max_shift <= params.tolerance {
                summary.converged = true;
                break;
            }
        }

        let codebook = Codebook::new(centroids)?;
        let assignment = codebook.predict_batch(data);
        Ok(QuantizerFit {
            codebook,
            assignment,
            summary,
        })
    }
}

/// Seeded k-means++ initialization.
///
/// The first centroid is drawn uniformly; each following one with probability
/// proportional to its squared distance from the closest centroid chosen so far.
/// When every remaining vector coincides with a centroid, draws fall back to uniform.
pub(crate) fn kmeans_plus_plus(data: ArrayView2<'_, f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::<f64>::zeros((k, data.ncols()));

    let first = rng.random_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));
    let mut closest: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| squared_distance(data.row(i), data.row(first)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = None;
            let mut last_positive = 0;
            for (i, &dist) in closest.iter().enumerate() {
                if dist <= 0.0 {
                    continue;
                }
                last_positive = i;
                target -= dist;
                if target < 0.0 {
                    chosen = Some(i);
                    break;
                }
            }
            chosen.unwrap_or(last_positive)
        } else {
            rng.random_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        let centroid = centroids.row(c);
        closest.par_iter_mut().enumerate().for_each(|(i, best)| {
            let dist = squared_distance(data.row(i), centroid);
            if dist < *best {
                *best = dist;
            }
        });
    }

    centroids
}

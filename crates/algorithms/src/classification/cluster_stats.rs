//! Per-cluster statistics and the 3-sigma novelty gate
//!
//! For each cluster: member mean, member (population) standard deviation per
//! feature, and `threshold = sqrt(3 * Σ std²)`. A vector assigned to a cluster
//! whose distance to that cluster's mean exceeds the threshold is an outlier.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use pft_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::codebook::{squared_distance, Codebook};

/// Multiplier inside the threshold square root
pub const SIGMA_FACTOR: f64 = 3.0;

/// Frozen statistics of every cluster, indexed by cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatistics {
    means: Array2<f64>,
    stds: Array2<f64>,
    thresholds: Array1<f64>,
    counts: Vec<u64>,
    /// Clusters that received no training vectors
    degenerate: Vec<usize>,
}

impl ClusterStatistics {
    /// Statistics of `data` rows grouped by `assignment`
    pub fn compute(codebook: &Codebook, data: ArrayView2<'_, f64>, assignment: &[usize]) -> Result<Self> {
        let mut acc = ClusterAccumulator::new(codebook.k(), codebook.dim());
        acc.update(data, assignment)?;
        Ok(acc.finish(codebook))
    }

    /// Build from explicit means and standard deviations (`K x d` each).
    ///
    /// Every cluster is treated as populated.
    pub fn from_parts(means: Array2<f64>, stds: Array2<f64>) -> Result<Self> {
        if means.dim() != stds.dim() {
            let (er, ec) = means.dim();
            let (ar, ac) = stds.dim();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        let thresholds = stds.outer_iter().map(threshold_for).collect();
        let k = means.nrows();
        Ok(Self {
            means,
            stds,
            thresholds,
            counts: vec![1; k],
            degenerate: Vec::new(),
        })
    }

    pub fn k(&self) -> usize {
        self.means.nrows()
    }

    /// Check that every per-cluster table has `k` entries of the same width.
    ///
    /// Guards statistics deserialized from a model file.
    pub fn check_shape(&self) -> Result<()> {
        let k = self.k();
        if self.stds.dim() != self.means.dim() || self.thresholds.len() != k || self.counts.len() != k {
            return Err(Error::Configuration(format!(
                "cluster statistics disagree: means {:?}, stds {:?}, {} thresholds, {} counts",
                self.means.dim(),
                self.stds.dim(),
                self.thresholds.len(),
                self.counts.len()
            )));
        }
        if let Some(&bad) = self.degenerate.iter().find(|&&c| c >= k) {
            return Err(Error::Configuration(format!("degenerate cluster {bad} out of range 0..{k}")));
        }
        Ok(())
    }

    pub fn mean(&self, cluster: usize) -> ArrayView1<'_, f64> {
        self.means.row(cluster)
    }

    pub fn std(&self, cluster: usize) -> ArrayView1<'_, f64> {
        self.stds.row(cluster)
    }

    pub fn threshold(&self, cluster: usize) -> f64 {
        self.thresholds[cluster]
    }

    /// Training vectors assigned to `cluster`
    pub fn count(&self, cluster: usize) -> u64 {
        self.counts[cluster]
    }

    pub fn degenerate_clusters(&self) -> &[usize] {
        &self.degenerate
    }

    /// Distance from `vector` to the mean of `cluster`
    pub fn distance(&self, cluster: usize, vector: ArrayView1<'_, f64>) -> f64 {
        squared_distance(self.means.row(cluster), vector).sqrt()
    }

    /// Whether `vector`, assigned to `cluster`, lies beyond the cluster's threshold
    pub fn is_outlier(&self, cluster: usize, vector: ArrayView1<'_, f64>) -> bool {
        self.distance(cluster, vector) > self.thresholds[cluster]
    }
}

fn threshold_for(std: ArrayView1<'_, f64>) -> f64 {
    (SIGMA_FACTOR * std.iter().map(|s| s * s).sum::<f64>()).sqrt()
}

/// Streaming per-cluster moments (Welford update per vector).
#[derive(Debug, Clone)]
pub struct ClusterAccumulator {
    counts: Vec<u64>,
    means: Array2<f64>,
    m2: Array2<f64>,
}

impl ClusterAccumulator {
    pub fn new(k: usize, dim: usize) -> Self {
        Self {
            counts: vec![0; k],
            means: Array2::zeros((k, dim)),
            m2: Array2::zeros((k, dim)),
        }
    }

    /// Add a batch of vectors with their cluster ids
    pub fn update(&mut self, data: ArrayView2<'_, f64>, assignment: &[usize]) -> Result<()> {
        if data.nrows() != assignment.len() {
            return Err(Error::InvalidParameter {
                name: "assignment",
                value: assignment.len().to_string(),
                reason: format!("expected one cluster id per vector ({})", data.nrows()),
            });
        }
        if data.ncols() != self.means.ncols() {
            return Err(Error::InvalidParameter {
                name: "data",
                value: format!("{} columns", data.ncols()),
                reason: format!("expected {} features", self.means.ncols()),
            });
        }
        let k = self.counts.len();
        if let Some(&bad) = assignment.iter().find(|&&c| c >= k) {
            return Err(Error::InvalidParameter {
                name: "assignment",
                value: bad.to_string(),
                reason: format!("cluster id out of range 0..{k}"),
            });
        }

        for (row, &cluster) in data.outer_iter().zip(assignment) {
            self.counts[cluster] += 1;
            let n = self.counts[cluster] as f64;
            let mut mean = self.means.row_mut(cluster);
            let mut m2 = self.m2.row_mut(cluster);
            for ((mu, s), &x) in mean.iter_mut().zip(m2.iter_mut()).zip(row.iter()) {
                let delta = x - *mu;
                *mu += delta / n;
                *s += delta * (x - *mu);
            }
        }
        Ok(())
    }

    /// Freeze into [`ClusterStatistics`]. Empty clusters fall back to the
    /// codebook centroid with zero spread.
    pub fn finish(self, codebook: &Codebook) -> ClusterStatistics {
        let ClusterAccumulator { counts, mut means, m2 } = self;
        let mut stds = Array2::<f64>::zeros(means.dim());
        let mut degenerate = Vec::new();

        for (cluster, &count) in counts.iter().enumerate() {
            if count == 0 {
                degenerate.push(cluster);
                means.row_mut(cluster).assign(&codebook.centroid(cluster));
                continue;
            }
            let n = count as f64;
            stds.row_mut(cluster)
                .assign(&m2.row(cluster).mapv(|s| (s / n).max(0.0).sqrt()));
        }

        if !degenerate.is_empty() {
            warn!(
                count = degenerate.len(),
                clusters = ?degenerate,
                "clusters without training members"
            );
        }

        let thresholds = stds.outer_iter().map(threshold_for).collect();
        ClusterStatistics {
            means,
            stds,
            thresholds,
            counts,
            degenerate,
        }
    }
}

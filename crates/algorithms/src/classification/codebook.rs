//! Frozen centroid set and the vector quantizer capability
//!
//! Any clustering algorithm that yields K centroids and assigns by nearest
//! centroid (ties to the lowest id) can back the pipeline.

use ndarray::{Array2, ArrayView1, ArrayView2};
use pft_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;

/// K centroids in normalized feature space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Codebook {
    centroids: Array2<f64>,
}

impl Codebook {
    /// Wrap a `K x d` centroid matrix
    pub fn new(centroids: Array2<f64>) -> Result<Self> {
        let (k, d) = centroids.dim();
        if k == 0 || d == 0 {
            return Err(Error::Configuration(format!(
                "codebook needs at least one centroid and one feature, got {k}x{d}"
            )));
        }
        if centroids.iter().any(|v| !v.is_finite()) {
            return Err(Error::Other("codebook contains non-finite centroid values".into()));
        }
        Ok(Self { centroids })
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Feature dimensionality
    pub fn dim(&self) -> usize {
        self.centroids.ncols()
    }

    pub fn centroids(&self) -> ArrayView2<'_, f64> {
        self.centroids.view()
    }

    pub fn centroid(&self, cluster: usize) -> ArrayView1<'_, f64> {
        self.centroids.row(cluster)
    }

    /// Nearest centroid id and its squared distance
    pub fn nearest(&self, vector: ArrayView1<'_, f64>) -> (usize, f64) {
        nearest_centroid(self.centroids.view(), vector)
    }

    /// Id of the nearest centroid by Euclidean distance, lowest id on ties
    pub fn predict(&self, vector: ArrayView1<'_, f64>) -> usize {
        self.nearest(vector).0
    }

    /// Predict every row of an `n x d` matrix
    pub fn predict_batch(&self, data: ArrayView2<'_, f64>) -> Vec<usize> {
        (0..data.nrows())
            .into_par_iter()
            .map(|i| self.predict(data.row(i)))
            .collect()
    }
}

/// Convergence information of a quantizer fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Lloyd iterations or mini-batch epochs actually run
    pub iterations: usize,
    /// Whether the centroid shift fell below tolerance before the iteration cap
    pub converged: bool,
}

/// Result of fitting a quantizer on an in-memory matrix
#[derive(Debug, Clone)]
pub struct QuantizerFit {
    pub codebook: Codebook,
    /// Cluster id of every input row, computed against the final centroids
    pub assignment: Vec<usize>,
    pub summary: FitSummary,
}

/// Partitions normalized vectors into a fixed number of clusters.
pub trait VectorQuantizer {
    /// Number of clusters produced
    fn k(&self) -> usize;

    /// Fit on `n x d` normalized vectors
    fn fit(&self, data: ArrayView2<'_, f64>) -> Result<QuantizerFit>;
}

pub(crate) fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub(crate) fn nearest_centroid(
    centroids: ArrayView2<'_, f64>,
    vector: ArrayView1<'_, f64>,
) -> (usize, f64) {
    let mut best_k = 0;
    let mut best_dist = f64::INFINITY;
    for (k, centroid) in centroids.outer_iter().enumerate() {
        let dist = squared_distance(centroid, vector);
        // strict comparison keeps the lowest id on ties
        if dist < best_dist {
            best_dist = dist;
            best_k = k;
        }
    }
    (best_k, best_dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_predict_nearest() {
        let cb = Codebook::new(array![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]]).unwrap();
        assert_eq!(cb.predict(array![1.0, 1.0].view()), 0);
        assert_eq!(cb.predict(array![9.0, -1.0].view()), 1);
        assert_eq!(cb.predict(array![-1.0, 7.0].view()), 2);
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let cb = Codebook::new(array![[1.0], [-1.0], [1.0]]).unwrap();
        // equidistant from all three
        assert_eq!(cb.predict(array![0.0].view()), 0);
        // exactly on clusters 0 and 2
        assert_eq!(cb.predict(array![1.0].view()), 0);
    }

    #[test]
    fn test_predict_batch_matches_predict() {
        let cb = Codebook::new(array![[0.0], [5.0]]).unwrap();
        let data = array![[0.4], [4.9], [2.5], [-3.0]];
        let labels = cb.predict_batch(data.view());
        assert_eq!(labels, vec![0, 1, 0, 0]);
    }

    #[test]
    fn test_rejects_empty_or_non_finite() {
        assert!(Codebook::new(Array2::zeros((0, 3))).is_err());
        assert!(Codebook::new(array![[f64::NAN]]).is_err());
    }
}

//! Outlier-aware nearest-centroid pixel classification

use ndarray::{Array2, ArrayView1, ArrayView2};
use pft_core::{Grid, Mask, Result, Sample};
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;

use super::cluster_stats::ClusterStatistics;
use super::codebook::Codebook;
use super::normalize::Normalizer;
use super::template::Template;

/// Per-pixel classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelLabel {
    /// Nearest cluster, within its 3-sigma threshold
    Cluster(usize),
    /// Background pixel, or farther from its nearest cluster than the threshold
    Outlier,
}

impl PixelLabel {
    pub fn cluster(&self) -> Option<usize> {
        match self {
            PixelLabel::Cluster(k) => Some(*k),
            PixelLabel::Outlier => None,
        }
    }

    pub fn is_outlier(&self) -> bool {
        matches!(self, PixelLabel::Outlier)
    }
}

/// Labels of every pixel of a sample
pub type PixelLabeling = Grid<PixelLabel>;

/// Borrowed view of the trained components needed to label pixels.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    normalizer: &'a Normalizer,
    codebook: &'a Codebook,
    statistics: &'a ClusterStatistics,
}

impl<'a> Classifier<'a> {
    pub fn new(
        normalizer: &'a Normalizer,
        codebook: &'a Codebook,
        statistics: &'a ClusterStatistics,
    ) -> Self {
        Self {
            normalizer,
            codebook,
            statistics,
        }
    }

    /// Feature dimensionality expected from samples
    pub fn dim(&self) -> usize {
        self.normalizer.dim()
    }

    /// Label an already normalized vector
    pub fn label_normalized(&self, vector: ArrayView1<'_, f64>) -> PixelLabel {
        let cluster = self.codebook.predict(vector);
        if self.statistics.is_outlier(cluster, vector) {
            PixelLabel::Outlier
        } else {
            PixelLabel::Cluster(cluster)
        }
    }

    /// Label a raw measurement vector
    pub fn label_vector(&self, vector: ArrayView1<'_, f64>) -> PixelLabel {
        let normalized = self.normalizer.transform(vector);
        self.label_normalized(normalized.view())
    }

    /// Label every row of an `n x d` matrix of normalized vectors
    pub fn label_normalized_batch(&self, data: ArrayView2<'_, f64>) -> Vec<PixelLabel> {
        (0..data.nrows())
            .into_par_iter()
            .map(|i| self.label_normalized(data.row(i)))
            .collect()
    }

    /// Normalized vectors of the sample's foreground pixels, row-major order
    pub fn normalized_foreground(&self, sample: &Sample) -> Result<Array2<f64>> {
        sample.validate(self.dim())?;
        let raw = sample.features.select(&sample.mask)?;
        self.normalizer.transform_batch(raw.view())
    }

    /// Classify every pixel of a sample; background pixels are [`PixelLabel::Outlier`].
    pub fn classify(&self, sample: &Sample) -> Result<PixelLabeling> {
        sample.validate(self.dim())?;
        let (rows, cols) = sample.shape();

        let labels: Vec<PixelLabel> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_labels = vec![PixelLabel::Outlier; cols];
                for (col, out) in row_labels.iter_mut().enumerate() {
                    if sample.mask[(row, col)] {
                        *out = self.label_vector(sample.features.pixel(row, col));
                    }
                }
                row_labels
            })
            .collect();

        Grid::from_vec(labels, rows, cols)
    }
}

/// Pixels whose label is a template cluster
pub fn matched_mask(labeling: &PixelLabeling, template: &Template) -> Mask {
    labeling.map(|label| template.matches(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pft_core::FeatureCube;

    fn fixture() -> (Normalizer, Codebook, ClusterStatistics) {
        // identity normalization in 1-D
        let normalizer = Normalizer::fit(array![[-1.0], [1.0]].view()).unwrap();
        let codebook = Codebook::new(array![[-1.0], [1.0]]).unwrap();
        let stats = ClusterStatistics::from_parts(array![[-1.0], [1.0]], array![[0.1], [0.1]]).unwrap();
        (normalizer, codebook, stats)
    }

    #[test]
    fn test_label_vector() {
        let (n, c, s) = fixture();
        let classifier = Classifier::new(&n, &c, &s);
        assert_eq!(classifier.label_vector(array![-1.05].view()), PixelLabel::Cluster(0));
        assert_eq!(classifier.label_vector(array![0.95].view()), PixelLabel::Cluster(1));
        // nearest is cluster 1 but far beyond sqrt(3) * 0.1
        assert_eq!(classifier.label_vector(array![3.0].view()), PixelLabel::Outlier);
    }

    #[test]
    fn test_classify_sample_background_is_outlier() {
        let (n, c, s) = fixture();
        let classifier = Classifier::new(&n, &c, &s);

        let mut features = FeatureCube::uniform(2, 2, &[1.0]);
        features.set_pixel(0, 0, &[-1.0]).unwrap();
        let mut mask = Mask::filled(2, 2, true);
        mask.set(1, 1, false).unwrap();
        let sample = Sample::new("t", features, mask);

        let labeling = classifier.classify(&sample).unwrap();
        assert_eq!(labeling[(0, 0)], PixelLabel::Cluster(0));
        assert_eq!(labeling[(0, 1)], PixelLabel::Cluster(1));
        assert_eq!(labeling[(1, 1)], PixelLabel::Outlier);
    }

    #[test]
    fn test_classify_rejects_wrong_channels() {
        let (n, c, s) = fixture();
        let classifier = Classifier::new(&n, &c, &s);
        let sample = Sample::new("bad", FeatureCube::uniform(2, 2, &[1.0, 2.0]), Mask::filled(2, 2, true));
        assert!(classifier.classify(&sample).is_err());
    }

    #[test]
    fn test_normalized_foreground_batch_agrees() {
        let (n, c, s) = fixture();
        let classifier = Classifier::new(&n, &c, &s);
        let sample = Sample::new("t", FeatureCube::uniform(3, 1, &[0.98]), Mask::filled(3, 1, true));
        let data = classifier.normalized_foreground(&sample).unwrap();
        let labels = classifier.label_normalized_batch(data.view());
        assert_eq!(labels, vec![PixelLabel::Cluster(1); 3]);
    }
}

//! Template-based pixel classification
//!
//! Training and inference components, leaf-first:
//! - **Normalizer**: per-feature z-score standardization
//! - **K-means / Mini-batch K-means**: vector quantization into K clusters
//! - **ClusterStatistics**: per-cluster mean, spread and 3-sigma outlier threshold
//! - **TemplateBuilder**: selection of the clusters most indicative of the target class
//! - **Classifier**: outlier-aware nearest-centroid labeling of sample pixels

mod classifier;
mod cluster_stats;
mod codebook;
mod kmeans;
mod minibatch;
mod normalize;
mod template;

pub use classifier::{matched_mask, Classifier, PixelLabel, PixelLabeling};
pub use cluster_stats::{ClusterAccumulator, ClusterStatistics, SIGMA_FACTOR};
pub use codebook::{Codebook, FitSummary, QuantizerFit, VectorQuantizer};
pub use kmeans::{Kmeans, KmeansParams};
pub use minibatch::MiniBatchKmeans;
pub use normalize::{Normalizer, NormalizerAccumulator, DEGENERATE_STD};
pub use template::{ClusterCounts, Template, TemplateBuilder, DEFAULT_RETENTION_FRACTION};
pub(crate) use template::validate_retention;

//! # PFT Algorithms
//!
//! Polarization feature template classification: learn a compact template of
//! target-indicative clusters from labeled samples, then detect target regions
//! in unseen samples.
//!
//! ## Algorithm Categories
//!
//! - **classification**: Normalizer, K-means / mini-batch K-means, cluster
//!   statistics, template selection, outlier-aware pixel classifier
//! - **morphology**: Binary erosion, dilation, closing, area filters
//! - **region**: Connected components and region coverage decisions
//! - **contour**: Fixed-width boundary bands around positive regions
//! - **pipeline**: Training and end-to-end detection

pub mod classification;
pub mod contour;
pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod pipeline;
pub mod region;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        matched_mask, Classifier, ClusterStatistics, Codebook, Kmeans, KmeansParams, MiniBatchKmeans,
        Normalizer, PixelLabel, PixelLabeling, Template, TemplateBuilder, VectorQuantizer,
    };
    pub use crate::contour::{contour_band, generate_contour, ContourGenerator, ContourParams};
    pub use crate::morphology::{closing, dilate, erode, StructuringElement};
    pub use crate::pipeline::{
        Detection, DetectionParams, TrainedModel, Trainer, TrainingParams, TrainingReport,
    };
    pub use crate::region::{decide_regions, RegionDecision, RegionDecisionMaker, RegionParams};
    pub use pft_core::prelude::*;
}

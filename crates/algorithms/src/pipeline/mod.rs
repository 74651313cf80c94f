//! End-to-end training and detection
//!
//! `TrainedModel = Trainer::train(samples)`, then per sample
//! `Detection = contour(regions(classify(sample)))`.

mod detect;
mod model;
mod train;

pub use detect::{detect, Detection, DetectionParams};
pub use model::{BatchDetection, TrainedModel};
pub use train::{SkippedSample, Trainer, TrainingParams, TrainingReport};

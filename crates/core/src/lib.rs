//! # PFT Core
//!
//! Core types, traits and I/O for polarization feature template classification.
//!
//! This crate provides:
//! - `Grid<T>` / `Mask`: per-pixel grids (labels, masks)
//! - `FeatureCube`: multi-channel per-pixel measurements
//! - `Sample`: one measurement image with its foreground mask and optional class label
//! - Algorithm trait for a consistent API
//! - JSON I/O for samples and models

pub mod error;
pub mod grid;
pub mod io;
pub mod sample;

pub use error::{Error, Result};
pub use grid::{Connectivity, FeatureCube, Grid, Mask};
pub use sample::{ClassLabel, Sample};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::{Connectivity, FeatureCube, Grid, Mask};
    pub use crate::sample::{ClassLabel, Sample};
    pub use crate::Algorithm;
}

/// Core trait for the image-level stages of the pipeline.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

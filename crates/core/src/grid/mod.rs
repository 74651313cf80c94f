//! Grid data structures shared by every pipeline stage

mod cube;
mod grid;
mod neighborhood;

pub use cube::FeatureCube;
pub use grid::{Grid, Mask};
pub use neighborhood::{Connectivity, Neighborhood};

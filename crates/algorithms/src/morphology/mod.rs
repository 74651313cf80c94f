//! Binary mathematical morphology
//!
//! Operations on boolean masks:
//! - **Erosion**: shrinks set regions, outside-grid pixels are background
//! - **Dilation**: grows set regions
//! - **Closing**: dilation then erosion on a padded grid (merges nearby objects)
//! - **Area filters**: drop small objects, fill small enclosed holes

mod area;
mod closing;
mod dilate;
mod element;
mod erode;

pub use area::{remove_small_holes, remove_small_objects};
pub use closing::{closing, Closing, ClosingParams};
pub use dilate::{dilate, Dilate, DilateParams};
pub use element::StructuringElement;
pub use erode::{erode, Erode, ErodeParams};

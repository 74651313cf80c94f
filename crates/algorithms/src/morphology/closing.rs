//! Binary closing (dilation followed by erosion)
//!
//! Bridges gaps narrower than the structuring element and fills small
//! indentations, merging nearby objects.

use ndarray::{s, Array2};
use pft_core::{Algorithm, Error, Grid, Mask, Result};

use super::dilate::dilate;
use super::element::StructuringElement;
use super::erode::erode;

/// Parameters for binary closing
#[derive(Debug, Clone, Default)]
pub struct ClosingParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Closing algorithm
#[derive(Debug, Clone, Default)]
pub struct Closing;

impl Algorithm for Closing {
    type Input = Mask;
    type Output = Mask;
    type Params = ClosingParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Closing"
    }

    fn description(&self) -> &'static str {
        "Binary closing (dilation then erosion) to merge nearby objects"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        closing(&input, &params.element)
    }
}

/// Perform binary closing on a mask
///
/// The mask is padded by the element radius before dilating so the erosion
/// that follows does not eat objects touching the grid border; the result is
/// always a superset of the input.
pub fn closing(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    element.validate()?;
    let pad = element.radius();
    let (rows, cols) = mask.shape();

    let mut padded = Array2::from_elem((rows + 2 * pad, cols + 2 * pad), false);
    padded
        .slice_mut(s![pad..pad + rows, pad..pad + cols])
        .assign(&mask.view());

    let dilated = dilate(&Grid::from_array(padded), element)?;
    let closed = erode(&dilated, element)?;

    Ok(Grid::from_array(
        closed.view().slice(s![pad..pad + rows, pad..pad + cols]).to_owned(),
    ))
}

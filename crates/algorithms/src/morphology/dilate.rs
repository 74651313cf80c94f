//! Binary dilation
//!
//! A pixel is set if any cell of the structuring element centered on it is
//! set. Cells outside the grid contribute nothing.

use crate::maybe_rayon::*;
use pft_core::{Algorithm, Error, Grid, Mask, Result};

use super::element::StructuringElement;

/// Parameters for binary dilation
#[derive(Debug, Clone, Default)]
pub struct DilateParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Dilation algorithm
#[derive(Debug, Clone, Default)]
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Mask;
    type Output = Mask;
    type Params = DilateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dilate"
    }

    fn description(&self) -> &'static str {
        "Binary dilation (pixel set where the structuring element touches the mask)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, &params.element)
    }
}

/// Dilate a mask with the given structuring element
pub fn dilate(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                // symmetric elements: probing (-dr, -dc) equals probing (dr, dc)
                *out = offsets
                    .iter()
                    .any(|&(dr, dc)| mask.get_offset(row, col, dr, dc).unwrap_or(false));
            }
            row_data
        })
        .collect();

    Grid::from_vec(data, rows, cols)
}

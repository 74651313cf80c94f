//! Binary erosion
//!
//! A pixel survives only if every cell of the structuring element centered on
//! it is set. Cells outside the grid count as unset, so objects touching the
//! border erode from the border too.

use crate::maybe_rayon::*;
use pft_core::{Algorithm, Error, Grid, Mask, Result};

use super::element::StructuringElement;

/// Parameters for binary erosion
#[derive(Debug, Clone, Default)]
pub struct ErodeParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Erosion algorithm
#[derive(Debug, Clone, Default)]
pub struct Erode;

impl Algorithm for Erode {
    type Input = Mask;
    type Output = Mask;
    type Params = ErodeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Erode"
    }

    fn description(&self) -> &'static str {
        "Binary erosion (pixel kept only where the structuring element fits)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erode(&input, &params.element)
    }
}

/// Erode a mask with the given structuring element
pub fn erode(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if !mask[(row, col)] {
                    continue;
                }
                *out = offsets
                    .iter()
                    .all(|&(dr, dc)| mask.get_offset(row, col, dr, dc).unwrap_or(false));
            }
            row_data
        })
        .collect();

    Grid::from_vec(data, rows, cols)
}

//! Fixed-width contour bands around positive regions
//!
//! The positive-region mask is merged with a closing, cleaned of small objects
//! and holes, then peeled layer by layer: each 3x3 erosion step contributes the
//! pixels it removes, and the union of the first `thickness` layers is the band.

use pft_core::{Algorithm, Connectivity, Error, Mask, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::morphology::{closing, erode, remove_small_holes, remove_small_objects, StructuringElement};

/// Parameters for contour generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    /// Element used to merge nearby positive regions
    pub merge_element: StructuringElement,
    /// Objects (8-connected) smaller than this are dropped after merging
    pub min_object_area: usize,
    /// Enclosed holes (4-connected) smaller than this are filled after merging
    pub max_hole_area: usize,
    /// Band width in pixels
    pub thickness: usize,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            merge_element: StructuringElement::Square(3),
            min_object_area: 50,
            max_hole_area: 500,
            thickness: 4,
        }
    }
}

impl ContourParams {
    pub fn validate(&self) -> Result<()> {
        self.merge_element.validate()?;
        if self.thickness == 0 {
            return Err(Error::InvalidParameter {
                name: "thickness",
                value: "0".into(),
                reason: "contour band must be at least one pixel wide".into(),
            });
        }
        Ok(())
    }
}

/// Boundary band of `mask`, `thickness` pixels deep.
///
/// Pixels outside the grid count as background, so regions touching the
/// border get a band along the border as well.
pub fn contour_band(mask: &Mask, thickness: usize) -> Result<Mask> {
    let step = StructuringElement::Square(1);
    let mut band = mask.like(false);
    let mut current = mask.clone();

    for _ in 0..thickness {
        if !current.any() {
            break;
        }
        let eroded = erode(&current, &step)?;
        band = band.union(&current.difference(&eroded)?)?;
        current = eroded;
    }

    Ok(band)
}

/// Refine the positive-region mask and extract its contour band.
pub fn generate_contour(positive: &Mask, params: &ContourParams) -> Result<Mask> {
    params.validate()?;

    if !positive.any() {
        return Ok(positive.like(false));
    }

    let merged = closing(positive, &params.merge_element)?;
    let objects = remove_small_objects(&merged, params.min_object_area, Connectivity::Eight);
    let refined = remove_small_holes(&objects, params.max_hole_area, Connectivity::Four);
    let band = contour_band(&refined, params.thickness)?;

    debug!(
        input = positive.count_true(),
        refined = refined.count_true(),
        band = band.count_true(),
        "contour generated"
    );

    Ok(band)
}

/// Contour stage as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct ContourGenerator;

impl Algorithm for ContourGenerator {
    type Input = Mask;
    type Output = Mask;
    type Params = ContourParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Contour"
    }

    fn description(&self) -> &'static str {
        "Merge, clean and peel positive regions into a fixed-width boundary band"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        generate_contour(&input, &params)
    }
}

//! Structuring element definitions for binary morphology
//!
//! A structuring element is the footprint probed around every pixel during
//! erosion and dilation.

use pft_core::grid::Neighborhood;
use pft_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Shape of a structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuringElement {
    /// Square footprint of given radius (side = 2*radius + 1)
    Square(usize),
    /// Plus-shaped footprint of given radius
    Cross(usize),
    /// Disk footprint of given radius
    Disk(usize),
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::Square(1)
    }
}

impl StructuringElement {
    pub fn validate(&self) -> Result<()> {
        if self.radius() == 0 {
            return Err(Error::InvalidParameter {
                name: "radius",
                value: "0".to_string(),
                reason: "structuring element radius must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn radius(&self) -> usize {
        match self {
            StructuringElement::Square(r)
            | StructuringElement::Cross(r)
            | StructuringElement::Disk(r) => *r,
        }
    }

    /// (dr, dc) offsets of every active cell, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        match self {
            StructuringElement::Square(r) => Neighborhood::Square(*r).offsets(),
            StructuringElement::Disk(r) => Neighborhood::Circle(*r).offsets(),
            StructuringElement::Cross(r) => {
                let r = *r as isize;
                (-r..=r)
                    .map(|d| (d, 0))
                    .chain((-r..=r).filter(|&d| d != 0).map(|d| (0, d)))
                    .collect()
            }
        }
    }
}

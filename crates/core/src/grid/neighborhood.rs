//! Neighborhood patterns for pixel adjacency and structuring elements

use serde::{Deserialize, Serialize};

/// Defines a neighborhood pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// 3x3 neighborhood (8 neighbors + center)
    Queen3x3,
    /// 3x3 without corners (4 neighbors + center)
    Rook3x3,
    /// Square neighborhood of given radius
    Square(usize),
    /// Circular neighborhood of given radius (in cells)
    Circle(usize),
}

impl Neighborhood {
    /// Get the radius of the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Queen3x3 | Neighborhood::Rook3x3 => 1,
            Neighborhood::Square(r) | Neighborhood::Circle(r) => *r,
        }
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Queen3x3 => dr.abs() <= 1 && dc.abs() <= 1,
            Neighborhood::Rook3x3 => dr.abs() + dc.abs() <= 1,
            Neighborhood::Square(r) => {
                let r = *r as isize;
                dr.abs() <= r && dc.abs() <= r
            }
            Neighborhood::Circle(r) => {
                let r = *r as isize;
                dr * dr + dc * dc <= r * r
            }
        }
    }

    /// Relative positions in this neighborhood, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::new();

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }

    /// Get offsets excluding the center cell
    pub fn offsets_no_center(&self) -> Vec<(isize, isize)> {
        self.offsets()
            .into_iter()
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .collect()
    }
}

/// Pixel adjacency used when labeling connected components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge-sharing neighbors only
    Four,
    /// Edge- and corner-sharing neighbors
    #[default]
    Eight,
}

impl Connectivity {
    pub fn neighborhood(&self) -> Neighborhood {
        match self {
            Connectivity::Four => Neighborhood::Rook3x3,
            Connectivity::Eight => Neighborhood::Queen3x3,
        }
    }

    /// Neighbor offsets, center excluded
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        self.neighborhood().offsets_no_center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_offsets() {
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
        assert!(!Connectivity::Four.offsets().contains(&(1, 1)));
        assert!(Connectivity::Eight.offsets().contains(&(-1, 1)));
    }

    #[test]
    fn test_circle_excludes_corners() {
        let offsets = Neighborhood::Circle(2).offsets();
        assert!(offsets.contains(&(2, 0)));
        assert!(!offsets.contains(&(2, 2)));
        assert_eq!(offsets.len(), 13);
    }

    #[test]
    fn test_square_size() {
        assert_eq!(Neighborhood::Square(3).offsets().len(), 49);
        assert_eq!(Neighborhood::Square(1).offsets_no_center().len(), 8);
    }
}

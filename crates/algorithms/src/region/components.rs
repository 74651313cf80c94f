//! Connected-component labeling of binary masks

use pft_core::{Connectivity, Grid, Mask};
use serde::{Deserialize, Serialize};

/// Inclusive pixel bounding box of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BoundingBox {
    fn at(row: usize, col: usize) -> Self {
        Self {
            min_row: row,
            min_col: col,
            max_row: row,
            max_col: col,
        }
    }

    fn extend(&mut self, row: usize, col: usize) {
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }
}

/// One connected component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Label in [1, count]; 0 is reserved for unset pixels
    pub label: u32,
    pub area: usize,
    pub bbox: BoundingBox,
    /// Whether any pixel lies on the outer row or column of the grid
    pub touches_border: bool,
}

/// Result of [`label_components`]
#[derive(Debug, Clone)]
pub struct ComponentLabels {
    /// Per-pixel component label, 0 for unset pixels
    pub labels: Grid<u32>,
    /// Components ordered by label (first pixel in row-major scan order)
    pub components: Vec<Component>,
}

impl ComponentLabels {
    pub fn count(&self) -> usize {
        self.components.len()
    }

    pub fn component(&self, label: u32) -> Option<&Component> {
        (label as usize)
            .checked_sub(1)
            .and_then(|i| self.components.get(i))
    }

    /// Mask of the pixels of one component
    pub fn component_mask(&self, label: u32) -> Mask {
        self.labels.map(|l| l == label && label != 0)
    }
}

/// Label the connected components of the set pixels of `mask`.
pub fn label_components(mask: &Mask, connectivity: Connectivity) -> ComponentLabels {
    let (rows, cols) = mask.shape();
    let offsets = connectivity.offsets();
    let mut labels: Grid<u32> = mask.like(0);
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for r in 0..rows {
        for c in 0..cols {
            if !mask[(r, c)] || labels[(r, c)] != 0 {
                continue;
            }

            let label = components.len() as u32 + 1;
            let mut component = Component {
                label,
                area: 0,
                bbox: BoundingBox::at(r, c),
                touches_border: false,
            };

            labels[(r, c)] = label;
            stack.push((r, c));

            while let Some((cr, cc)) = stack.pop() {
                component.area += 1;
                component.bbox.extend(cr, cc);
                if cr == 0 || cc == 0 || cr + 1 == rows || cc + 1 == cols {
                    component.touches_border = true;
                }

                for &(dr, dc) in &offsets {
                    let nr = cr as isize + dr;
                    let nc = cc as isize + dc;
                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if mask[(nr, nc)] && labels[(nr, nc)] == 0 {
                        labels[(nr, nc)] = label;
                        stack.push((nr, nc));
                    }
                }
            }

            components.push(component);
        }
    }

    ComponentLabels { labels, components }
}

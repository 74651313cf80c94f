//! Main Grid type

use std::ops::{Index, IndexMut};

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

/// A 2D grid of per-pixel values.
///
/// `Grid<T>` stores one value of type `T` per pixel in row-major order.
/// Masks, pixel labelings and region label images are all grids.
///
/// # Example
///
/// ```ignore
/// use pft_core::Grid;
///
/// let mut mask: Grid<bool> = Grid::filled(100, 100, false);
/// mask.set(10, 20, true)?;
/// assert_eq!(mask.count_true(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    /// Values stored in row-major order (row, col)
    data: Array2<T>,
}

/// Boolean foreground / selection mask
pub type Mask = Grid<bool>;

impl<T: Copy> Grid<T> {
    /// Create a new grid filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
        }
    }

    /// Create a grid from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        let array = Array2::from_shape_vec((rows, cols), data)?;
        Ok(Self { data: array })
    }

    /// Create a grid from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self { data }
    }

    /// Create a grid with the same dimensions, filled with a value
    pub fn like<U: Copy>(&self, fill_value: U) -> Grid<U> {
        Grid {
            data: Array2::from_elem(self.data.dim(), fill_value),
        }
    }

    /// Apply `f` to every cell, producing a grid of the same shape
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: Fn(T) -> U,
    {
        Grid {
            data: self.data.mapv(f),
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Value at a signed offset from (row, col), `None` when outside the grid
    pub fn get_offset(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<T> {
        let nr = row.checked_add_signed(dr)?;
        let nc = col.checked_add_signed(dc)?;
        self.data.get((nr, nc)).copied()
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Consume the grid and return the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    /// Iterate over `((row, col), value)` in row-major order
    pub fn indexed_iter(&self) -> impl Iterator<Item = ((usize, usize), T)> + '_ {
        self.data.indexed_iter().map(|(idx, v)| (idx, *v))
    }

    /// Error unless `other` has the same shape as `self`
    pub fn ensure_same_shape<U>(&self, other: &Grid<U>) -> Result<()> {
        let (er, ec) = self.data.dim();
        let (ar, ac) = other.data.dim();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, idx: (usize, usize)) -> &T {
        &self.data[idx]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, idx: (usize, usize)) -> &mut T {
        &mut self.data[idx]
    }
}

impl Grid<bool> {
    /// Number of `true` cells
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Whether any cell is set
    pub fn any(&self) -> bool {
        self.data.iter().any(|&v| v)
    }

    /// Cell-wise `self | other`
    pub fn union(&self, other: &Mask) -> Result<Mask> {
        self.ensure_same_shape(other)?;
        Ok(Grid::from_array(ndarray::Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| a || b)))
    }

    /// Cell-wise `self & !other`
    pub fn difference(&self, other: &Mask) -> Result<Mask> {
        self.ensure_same_shape(other)?;
        Ok(Grid::from_array(ndarray::Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| a && !b)))
    }

    /// Cell-wise negation
    pub fn invert(&self) -> Mask {
        self.map(|v| !v)
    }
}

//! Multi-channel per-pixel measurements

use crate::error::{Error, Result};
use ndarray::{Array2, Array3, ArrayView1, ArrayView3};
use serde::{Deserialize, Serialize};

use super::Mask;

/// A `rows x cols x channels` block of measurements, one feature vector per pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCube {
    data: Array3<f64>,
}

impl FeatureCube {
    /// Wrap an existing `(rows, cols, channels)` array
    pub fn from_array(data: Array3<f64>) -> Self {
        Self { data }
    }

    /// Build a cube from pixel-major data (`channels` values per pixel, row-major pixels)
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize, channels: usize) -> Result<Self> {
        if channels == 0 || data.len() != rows * cols * channels {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            data: Array3::from_shape_vec((rows, cols, channels), data)?,
        })
    }

    /// A cube where every pixel carries the same vector
    pub fn uniform(rows: usize, cols: usize, vector: &[f64]) -> Self {
        let channels = vector.len();
        let data = Array3::from_shape_fn((rows, cols, channels), |(_, _, k)| vector[k]);
        Self { data }
    }

    pub fn rows(&self) -> usize {
        self.data.dim().0
    }

    pub fn cols(&self) -> usize {
        self.data.dim().1
    }

    /// Feature dimensionality
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// Spatial dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Feature vector of one pixel
    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f64> {
        self.data.slice(ndarray::s![row, col, ..])
    }

    /// Overwrite the feature vector of one pixel
    pub fn set_pixel(&mut self, row: usize, col: usize, vector: &[f64]) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        if vector.len() != self.channels() {
            return Err(Error::InvalidParameter {
                name: "vector",
                value: vector.len().to_string(),
                reason: format!("expected {} channels", self.channels()),
            });
        }
        for (k, &v) in vector.iter().enumerate() {
            self.data[(row, col, k)] = v;
        }
        Ok(())
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// Gather the vectors of every pixel selected by `mask` into an `n x channels` matrix,
    /// in row-major pixel order.
    pub fn select(&self, mask: &Mask) -> Result<Array2<f64>> {
        if mask.shape() != self.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = mask.shape();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        let channels = self.channels();
        let n = mask.count_true();
        let mut out = Vec::with_capacity(n * channels);
        for ((row, col), selected) in mask.indexed_iter() {
            if selected {
                out.extend(self.pixel(row, col).iter().copied());
            }
        }
        Ok(Array2::from_shape_vec((n, channels), out)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_follows_mask_order() {
        let mut cube = FeatureCube::uniform(2, 2, &[0.0, 0.0]);
        cube.set_pixel(0, 1, &[1.0, 2.0]).unwrap();
        cube.set_pixel(1, 0, &[3.0, 4.0]).unwrap();
        let mut mask = Mask::filled(2, 2, false);
        mask.set(1, 0, true).unwrap();
        mask.set(0, 1, true).unwrap();

        let selected = cube.select(&mask).unwrap();
        assert_eq!(selected.dim(), (2, 2));
        assert_eq!(selected.row(0).to_vec(), vec![1.0, 2.0]);
        assert_eq!(selected.row(1).to_vec(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_from_vec_validates_length() {
        assert!(FeatureCube::from_vec(vec![0.0; 7], 2, 2, 2).is_err());
        assert!(FeatureCube::from_vec(vec![], 2, 2, 0).is_err());
        let cube = FeatureCube::from_vec((0..8).map(f64::from).collect(), 2, 2, 2).unwrap();
        assert_eq!(cube.pixel(1, 1).to_vec(), vec![6.0, 7.0]);
    }

    #[test]
    fn test_set_pixel_checks_channels() {
        let mut cube = FeatureCube::uniform(1, 1, &[0.0; 3]);
        assert!(cube.set_pixel(0, 0, &[1.0]).is_err());
        assert!(cube.set_pixel(1, 0, &[1.0; 3]).is_err());
    }
}

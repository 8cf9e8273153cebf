//! Cell-center coordinate grids
//!
//! Regular grids arrive as 1-D latitude and longitude vectors and are expanded
//! into 2-D matrices here. Curvilinear or rotated grids already carry 2-D
//! coordinates and pass through unchanged.

use crate::errors::{RemapError, Result};
use ndarray::{Array2, ArrayD, ArrayView1, Ix1, Ix2};

/// Paired 2-D latitude and longitude matrices of identical shape, in degrees
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateGrid {
    pub lat: Array2<f64>,
    pub lon: Array2<f64>,
}

impl CoordinateGrid {
    /// Create a grid from 2-D matrices, checking that both share one shape
    pub fn new(lat: Array2<f64>, lon: Array2<f64>) -> Result<Self> {
        if lat.shape() != lon.shape() {
            return Err(RemapError::ShapeMismatch {
                expected: lat.shape().to_vec(),
                found: lon.shape().to_vec(),
            });
        }
        Ok(Self { lat, lon })
    }

    /// Build the outer-product grid of two coordinate vectors
    pub fn from_vectors(lat: ArrayView1<f64>, lon: ArrayView1<f64>) -> Self {
        let (lat, lon) = expand_coordinates(lat, lon);
        Self { lat, lon }
    }

    /// Accept coordinates of either rank as read from a dataset.
    ///
    /// Two 1-D vectors are expanded, two 2-D matrices are passed through; any
    /// other combination is a shape mismatch.
    pub fn from_dyn(lat: ArrayD<f64>, lon: ArrayD<f64>) -> Result<Self> {
        match (lat.ndim(), lon.ndim()) {
            (1, 1) => {
                let lat = lat.into_dimensionality::<Ix1>()?;
                let lon = lon.into_dimensionality::<Ix1>()?;
                Ok(Self::from_vectors(lat.view(), lon.view()))
            }
            (2, 2) => Self::new(
                lat.into_dimensionality::<Ix2>()?,
                lon.into_dimensionality::<Ix2>()?,
            ),
            _ => Err(RemapError::ShapeMismatch {
                expected: lat.shape().to_vec(),
                found: lon.shape().to_vec(),
            }),
        }
    }

    /// `(rows, cols)` of the grid
    pub fn shape(&self) -> (usize, usize) {
        self.lat.dim()
    }
}

/// Expands 1-D coordinate vectors into 2-D matrices.
///
/// Axis 0 of the result runs along `lon` and axis 1 along `lat`, so that
/// `lat2d[[i, j]] == lat[j]` and `lon2d[[i, j]] == lon[i]`.
pub fn expand_coordinates(
    lat: ArrayView1<f64>,
    lon: ArrayView1<f64>,
) -> (Array2<f64>, Array2<f64>) {
    let shape = (lon.len(), lat.len());
    let lat2d = Array2::from_shape_fn(shape, |(_, j)| lat[j]);
    let lon2d = Array2::from_shape_fn(shape, |(i, _)| lon[i]);
    (lat2d, lon2d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, IxDyn};

    #[test]
    fn test_expand_axis_convention() {
        let lat = array![10.0, 20.0, 30.0];
        let lon = array![100.0, 110.0];
        let (lat2d, lon2d) = expand_coordinates(lat.view(), lon.view());

        assert_eq!(lat2d.dim(), (2, 3));
        assert_eq!(lon2d.dim(), (2, 3));
        assert_eq!(lat2d[[1, 2]], 30.0);
        assert_eq!(lon2d[[1, 2]], 110.0);
        assert_eq!(lon2d[[0, 2]], 100.0);
    }

    #[test]
    fn test_two_dimensional_passthrough() {
        let lat = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let lon = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let grid = CoordinateGrid::from_dyn(lat, lon).unwrap();
        assert_eq!(grid.lat, array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(grid.lon, array![[5.0, 6.0], [7.0, 8.0]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = CoordinateGrid::new(Array2::zeros((3, 3)), Array2::zeros((3, 4))).unwrap_err();
        assert!(matches!(err, RemapError::ShapeMismatch { .. }));

        let lat = ArrayD::zeros(IxDyn(&[3]));
        let lon = ArrayD::zeros(IxDyn(&[3, 3]));
        assert!(CoordinateGrid::from_dyn(lat, lon).is_err());
    }
}

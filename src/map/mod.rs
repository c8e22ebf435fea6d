pub mod store;

use std::fmt;

use ndarray::{Array, Array3, ArrayView, Dimension};

use crate::grid::GridSpec;

/// Marker for voxels (or query points) with no contributing samples.
pub const NO_DATA: f64 = f64::NAN;

/// Marker for voxels whose measured scatter collapsed to exactly zero:
/// either a single contributing star, or all replicates binning to the
/// same value. Zero measured scatter is not zero true uncertainty.
pub const UNDEFINED_SPREAD: f64 = f64::INFINITY;

pub fn is_no_data(v: f64) -> bool {
    v.is_nan()
}

pub fn is_undefined_spread(v: f64) -> bool {
    v == UNDEFINED_SPREAD
}

/// A built reddening/extinction map: the grid it was binned on plus four
/// voxel channels, each shaped `(b.bins, l.bins, r.bins)`.
///
/// Mean channels hold values >= 0 or [`NO_DATA`]; std channels hold
/// values > 0, [`NO_DATA`], or [`UNDEFINED_SPREAD`]. Immutable once
/// built; concurrent lookups need no locking.
pub struct VoxelMap {
    pub grid: GridSpec,
    pub mean_reddening: Array3<f64>,
    pub mean_extinction: Array3<f64>,
    pub std_reddening: Array3<f64>,
    pub std_extinction: Array3<f64>,
}

/// The four map channels at one query point.
#[derive(Debug, Clone, Copy)]
pub struct MapSample {
    pub reddening: f64,
    pub extinction: f64,
    pub reddening_err: f64,
    pub extinction_err: f64,
}

impl MapSample {
    fn no_data() -> MapSample {
        MapSample {
            reddening: NO_DATA,
            extinction: NO_DATA,
            reddening_err: NO_DATA,
            extinction_err: NO_DATA,
        }
    }
}

/// The four map channels for a batch query, each shaped like the input
/// coordinate arrays.
#[derive(Debug, Clone)]
pub struct LookupResult<D: Dimension> {
    pub reddening: Array<f64, D>,
    pub extinction: Array<f64, D>,
    pub reddening_err: Array<f64, D>,
    pub extinction_err: Array<f64, D>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The b, l, r coordinate arrays do not share one shape.
    ShapeMismatch,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::ShapeMismatch => {
                write!(f, "query coordinate arrays have mismatched shapes")
            }
        }
    }
}

impl std::error::Error for LookupError {}

impl fmt::Debug for VoxelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoxelMap")
            .field("shape", &self.grid.shape())
            .field("b", &(self.grid.b.lim0, self.grid.b.lim1))
            .field("l", &(self.grid.l.lim0, self.grid.l.lim1))
            .field("r", &(self.grid.r.lim0, self.grid.r.lim1))
            .finish()
    }
}

impl VoxelMap {
    /// Map channels at a single coordinate. Coordinates outside the
    /// grid's coverage return [`NO_DATA`] in every channel.
    pub fn lookup_one(&self, b: f64, l: f64, r: f64) -> MapSample {
        match self.grid.voxel(b, l, r) {
            Some(idx) => MapSample {
                reddening: self.mean_reddening[idx],
                extinction: self.mean_extinction[idx],
                reddening_err: self.std_reddening[idx],
                extinction_err: self.std_extinction[idx],
            },
            None => MapSample::no_data(),
        }
    }

    /// Vectorized lookup over coordinate arrays of any rank (rank-0
    /// included); outputs share the input shape.
    ///
    /// Off-map points yield [`NO_DATA`] per element rather than failing
    /// the batch, since batch queries commonly include off-map points.
    pub fn lookup<D: Dimension>(
        &self,
        b: ArrayView<'_, f64, D>,
        l: ArrayView<'_, f64, D>,
        r: ArrayView<'_, f64, D>,
    ) -> Result<LookupResult<D>, LookupError> {
        if b.shape() != l.shape() || b.shape() != r.shape() {
            return Err(LookupError::ShapeMismatch);
        }

        let n = b.len();
        let mut reddening = Vec::with_capacity(n);
        let mut extinction = Vec::with_capacity(n);
        let mut reddening_err = Vec::with_capacity(n);
        let mut extinction_err = Vec::with_capacity(n);

        for ((&bv, &lv), &rv) in b.iter().zip(l.iter()).zip(r.iter()) {
            let s = self.lookup_one(bv, lv, rv);
            reddening.push(s.reddening);
            extinction.push(s.extinction);
            reddening_err.push(s.reddening_err);
            extinction_err.push(s.extinction_err);
        }

        let dim = b.raw_dim();
        // Infallible: each output vector holds exactly one value per input element.
        Ok(LookupResult {
            reddening: Array::from_shape_vec(dim.clone(), reddening)
                .expect("output length matches query shape"),
            extinction: Array::from_shape_vec(dim.clone(), extinction)
                .expect("output length matches query shape"),
            reddening_err: Array::from_shape_vec(dim.clone(), reddening_err)
                .expect("output length matches query shape"),
            extinction_err: Array::from_shape_vec(dim, extinction_err)
                .expect("output length matches query shape"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AxisSpec;
    use ndarray::{Array1, arr0, arr1};

    fn test_map() -> VoxelMap {
        let grid = GridSpec::new(
            AxisSpec { lim0: -90.0, lim1: 90.0, bins: 2 },
            AxisSpec { lim0: 0.0, lim1: 360.0, bins: 2 },
            AxisSpec { lim0: 0.0, lim1: 2.0, bins: 2 },
        )
        .unwrap();

        let shape = grid.shape();
        let mut mean_reddening = Array3::from_elem(shape, NO_DATA);
        let mut mean_extinction = Array3::from_elem(shape, NO_DATA);
        let mut std_reddening = Array3::from_elem(shape, NO_DATA);
        let mut std_extinction = Array3::from_elem(shape, NO_DATA);

        // One populated voxel: b in [0, 90), l in [0, 180), r in [0, 1).
        mean_reddening[[1, 0, 0]] = 0.6;
        mean_extinction[[1, 0, 0]] = 1.1;
        std_reddening[[1, 0, 0]] = 0.1;
        std_extinction[[1, 0, 0]] = UNDEFINED_SPREAD;

        VoxelMap {
            grid,
            mean_reddening,
            mean_extinction,
            std_reddening,
            std_extinction,
        }
    }

    #[test]
    fn lookup_one_hits_populated_voxel() {
        let map = test_map();
        let s = map.lookup_one(45.0, 90.0, 0.5);
        assert_eq!(s.reddening, 0.6);
        assert_eq!(s.extinction, 1.1);
        assert_eq!(s.reddening_err, 0.1);
        assert!(is_undefined_spread(s.extinction_err));
    }

    #[test]
    fn lookup_one_off_map_is_no_data() {
        let map = test_map();
        let s = map.lookup_one(45.0, 90.0, 5.0);
        assert!(is_no_data(s.reddening));
        assert!(is_no_data(s.extinction));
        assert!(is_no_data(s.reddening_err));
        assert!(is_no_data(s.extinction_err));
    }

    #[test]
    fn batch_lookup_preserves_shape_and_marks_off_map_points() {
        let map = test_map();
        let b = arr1(&[45.0, 45.0, 95.0]);
        let l = arr1(&[90.0, 90.0, 90.0]);
        let r = arr1(&[0.5, 5.0, 0.5]);

        let out = map.lookup(b.view(), l.view(), r.view()).unwrap();
        assert_eq!(out.reddening.shape(), &[3]);
        assert_eq!(out.reddening[0], 0.6);
        assert!(is_no_data(out.reddening[1])); // off-map distance
        assert!(is_no_data(out.reddening[2])); // off-map latitude
        assert_eq!(out.extinction[0], 1.1);
        assert!(is_undefined_spread(out.extinction_err[0]));
    }

    #[test]
    fn rank_zero_lookup_matches_scalar() {
        let map = test_map();
        let (b, l, r) = (arr0(45.0), arr0(90.0), arr0(0.5));
        let out = map.lookup(b.view(), l.view(), r.view()).unwrap();
        let s = map.lookup_one(45.0, 90.0, 0.5);
        assert_eq!(out.reddening[()], s.reddening);
        assert_eq!(out.extinction[()], s.extinction);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let map = test_map();
        let b: Array1<f64> = arr1(&[0.0, 1.0]);
        let l: Array1<f64> = arr1(&[0.0]);
        let r: Array1<f64> = arr1(&[0.5, 0.5]);
        let err = map.lookup(b.view(), l.view(), r.view()).unwrap_err();
        assert_eq!(err, LookupError::ShapeMismatch);
    }

    #[test]
    fn empty_voxel_reads_as_no_data() {
        let map = test_map();
        let s = map.lookup_one(-45.0, 270.0, 1.5);
        assert!(is_no_data(s.reddening));
    }
}

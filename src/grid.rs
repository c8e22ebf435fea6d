use std::fmt;

/// One axis of the (b, l, r) discretization: lower limit, upper limit,
/// and number of bins. Bin width is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub lim0: f64,
    pub lim1: f64,
    pub bins: usize,
}

/// A malformed axis description, fatal at grid construction or map load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    ZeroBins { axis: &'static str },
    InvertedLimits { axis: &'static str },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::ZeroBins { axis } => {
                write!(f, "axis {axis}: bin count must be positive")
            }
            GridError::InvertedLimits { axis } => {
                write!(f, "axis {axis}: upper limit must exceed lower limit")
            }
        }
    }
}

impl std::error::Error for GridError {}

impl AxisSpec {
    /// Width of one bin: `(lim1 - lim0) / bins`.
    pub fn width(&self) -> f64 {
        (self.lim1 - self.lim0) / self.bins as f64
    }

    /// Unclamped bin index `floor((x - lim0) / width)`.
    ///
    /// Coordinates outside `[lim0, lim1)` produce an out-of-range index;
    /// callers that need bounds handling use [`AxisSpec::bin`] instead.
    pub fn raw_bin(&self, x: f64) -> f64 {
        ((x - self.lim0) / self.width()).floor()
    }

    /// Bounded bin index for `x`, or `None` if `x` lies outside
    /// `[lim0, lim1]` (NaN included).
    ///
    /// A coordinate exactly on the upper limit clamps into the last bin,
    /// so the final limit belongs to the map rather than falling off it.
    /// Both map construction and lookup resolve coordinates through this
    /// function, keeping the boundary rule identical on both paths.
    pub fn bin(&self, x: f64) -> Option<usize> {
        if !(self.lim0..=self.lim1).contains(&x) {
            return None;
        }
        let raw = self.raw_bin(x);
        // raw can land on `bins` for x == lim1 (or one ulp below it);
        // the range check above already guarantees x belongs to the axis.
        Some((raw as usize).min(self.bins - 1))
    }

    fn validate(&self, axis: &'static str) -> Result<(), GridError> {
        if self.bins == 0 {
            return Err(GridError::ZeroBins { axis });
        }
        if !(self.lim1 > self.lim0) {
            return Err(GridError::InvertedLimits { axis });
        }
        Ok(())
    }
}

/// Immutable description of the 3-axis discretization.
///
/// Axis order is fixed as (b, l, r) — galactic latitude, galactic
/// longitude, distance — and must match between the builder that bins
/// samples and the lookup that resolves queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub b: AxisSpec,
    pub l: AxisSpec,
    pub r: AxisSpec,
}

impl GridSpec {
    pub fn new(b: AxisSpec, l: AxisSpec, r: AxisSpec) -> Result<GridSpec, GridError> {
        b.validate("b")?;
        l.validate("l")?;
        r.validate("r")?;
        Ok(GridSpec { b, l, r })
    }

    /// Voxel array shape, `(b.bins, l.bins, r.bins)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.b.bins, self.l.bins, self.r.bins)
    }

    /// Voxel index for a coordinate triple, or `None` if any coordinate
    /// falls outside its axis.
    pub fn voxel(&self, b: f64, l: f64, r: f64) -> Option<(usize, usize, usize)> {
        Some((self.b.bin(b)?, self.l.bin(l)?, self.r.bin(r)?))
    }
}

use ndarray::Array3;

use crate::grid::GridSpec;

/// Parallel coordinate/value columns for one batch of samples.
///
/// Transient: one set exists per replicate round and is dropped once the
/// accumulator has consumed it, so the combined sample set is never
/// materialized in full.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    pub b: Vec<f64>,
    pub l: Vec<f64>,
    pub r: Vec<f64>,
    pub value: Vec<f64>,
}

impl SampleSet {
    pub fn with_capacity(n: usize) -> SampleSet {
        SampleSet {
            b: Vec::with_capacity(n),
            l: Vec::with_capacity(n),
            r: Vec::with_capacity(n),
            value: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, b: f64, l: f64, r: f64, value: f64) {
        self.b.push(b);
        self.l.push(l);
        self.r.push(r);
        self.value.push(value);
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Streaming per-voxel reduction over one value channel.
///
/// Keeps running count, sum, and sum of squares per voxel, so aggregation
/// cost is independent of how the sample set is materialized or
/// partitioned; partial accumulators over disjoint sample chunks can be
/// combined with [`VoxelAccumulator::merge`].
pub struct VoxelAccumulator {
    grid: GridSpec,
    count: Array3<u64>,
    sum: Array3<f64>,
    sum_sq: Array3<f64>,
}

impl VoxelAccumulator {
    pub fn new(grid: &GridSpec) -> VoxelAccumulator {
        let shape = grid.shape();
        VoxelAccumulator {
            grid: *grid,
            count: Array3::zeros(shape),
            sum: Array3::zeros(shape),
            sum_sq: Array3::zeros(shape),
        }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Bin one sample. Samples outside the grid are silently discarded,
    /// matching build-time filtering semantics.
    pub fn add(&mut self, b: f64, l: f64, r: f64, value: f64) {
        if let Some(idx) = self.grid.voxel(b, l, r) {
            self.count[idx] += 1;
            self.sum[idx] += value;
            self.sum_sq[idx] += value * value;
        }
    }

    pub fn add_set(&mut self, set: &SampleSet) {
        for i in 0..set.len() {
            self.add(set.b[i], set.l[i], set.r[i], set.value[i]);
        }
    }

    /// Fold another accumulator over the same grid into this one.
    ///
    /// The reduction is associative, so partitioning samples across
    /// accumulators and merging matches a single pass up to
    /// floating-point rounding in the per-voxel sums.
    pub fn merge(&mut self, other: &VoxelAccumulator) {
        assert_eq!(
            self.grid, other.grid,
            "cannot merge accumulators over different grids"
        );
        self.count += &other.count;
        self.sum += &other.sum;
        self.sum_sq += &other.sum_sq;
    }

    /// Finalize into `(mean, std)` voxel arrays, applying the sentinel
    /// policies of the final map:
    ///
    /// - voxels with no samples hold NaN in both arrays;
    /// - negative means clamp to zero (reddening and extinction are
    ///   physically non-negative; negative means come from noise in
    ///   voxels whose true value is near zero);
    /// - an exactly-zero standard deviation becomes infinity, since zero
    ///   measured scatter cannot be read as zero true uncertainty.
    ///
    /// Std is the population standard deviation (divisor `n`).
    pub fn finalize(self) -> (Array3<f64>, Array3<f64>) {
        let shape = self.grid.shape();
        let mut mean = Array3::from_elem(shape, f64::NAN);
        let mut std = Array3::from_elem(shape, f64::NAN);

        for (idx, &n) in self.count.indexed_iter() {
            if n == 0 {
                continue;
            }
            let nf = n as f64;
            let m = self.sum[idx] / nf;
            let var = (self.sum_sq[idx] / nf - m * m).max(0.0);
            let s = var.sqrt();
            std[idx] = if s == 0.0 { f64::INFINITY } else { s };
            mean[idx] = if m < 0.0 { 0.0 } else { m };
        }

        (mean, std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AxisSpec;

    fn whole_sky_grid() -> GridSpec {
        GridSpec::new(
            AxisSpec { lim0: -90.0, lim1: 90.0, bins: 1 },
            AxisSpec { lim0: 0.0, lim1: 360.0, bins: 1 },
            AxisSpec { lim0: 0.0, lim1: 2.0, bins: 1 },
        )
        .unwrap()
    }

    #[test]
    fn two_sample_mean_and_std() {
        let grid = whole_sky_grid();
        let mut acc = VoxelAccumulator::new(&grid);
        acc.add(0.0, 0.0, 1.0, 0.5);
        acc.add(0.0, 0.0, 1.0, 0.7);

        let (mean, std) = acc.finalize();
        assert!((mean[[0, 0, 0]] - 0.6).abs() < 1e-12);
        assert!((std[[0, 0, 0]] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_voxel_is_nan() {
        let grid = whole_sky_grid();
        let acc = VoxelAccumulator::new(&grid);
        let (mean, std) = acc.finalize();
        assert!(mean[[0, 0, 0]].is_nan());
        assert!(std[[0, 0, 0]].is_nan());
    }

    #[test]
    fn single_sample_has_undefined_spread() {
        let grid = whole_sky_grid();
        let mut acc = VoxelAccumulator::new(&grid);
        acc.add(10.0, 120.0, 0.5, 0.3);

        let (mean, std) = acc.finalize();
        assert_eq!(mean[[0, 0, 0]], 0.3);
        assert_eq!(std[[0, 0, 0]], f64::INFINITY);
    }

    #[test]
    fn identical_samples_have_undefined_spread() {
        let grid = whole_sky_grid();
        let mut acc = VoxelAccumulator::new(&grid);
        for _ in 0..5 {
            acc.add(0.0, 0.0, 1.0, 0.25);
        }
        let (_, std) = acc.finalize();
        assert_eq!(std[[0, 0, 0]], f64::INFINITY);
    }

    #[test]
    fn negative_mean_clamps_to_zero() {
        let grid = whole_sky_grid();
        let mut acc = VoxelAccumulator::new(&grid);
        acc.add(0.0, 0.0, 1.0, -0.2);
        acc.add(0.0, 0.0, 1.0, -0.1);

        let (mean, std) = acc.finalize();
        assert_eq!(mean[[0, 0, 0]], 0.0);
        // Std comes from the raw samples, not the clamped mean.
        assert!((std[[0, 0, 0]] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn out_of_grid_samples_are_discarded() {
        let grid = whole_sky_grid();
        let mut acc = VoxelAccumulator::new(&grid);
        acc.add(0.0, 0.0, 5.0, 1.0); // distance beyond the grid
        let (mean, _) = acc.finalize();
        assert!(mean[[0, 0, 0]].is_nan());
    }

    #[test]
    fn merge_matches_single_pass() {
        let grid = GridSpec::new(
            AxisSpec { lim0: -90.0, lim1: 90.0, bins: 4 },
            AxisSpec { lim0: 0.0, lim1: 360.0, bins: 4 },
            AxisSpec { lim0: 0.0, lim1: 2.0, bins: 4 },
        )
        .unwrap();

        let samples: Vec<(f64, f64, f64, f64)> = (0..40)
            .map(|i| {
                let t = i as f64 / 40.0;
                (-80.0 + 160.0 * t, 350.0 * t, 0.1 + 1.8 * t, 0.2 + t)
            })
            .collect();

        let mut whole = VoxelAccumulator::new(&grid);
        for &(b, l, r, v) in &samples {
            whole.add(b, l, r, v);
        }

        let mut first = VoxelAccumulator::new(&grid);
        let mut second = VoxelAccumulator::new(&grid);
        for &(b, l, r, v) in &samples[..17] {
            first.add(b, l, r, v);
        }
        for &(b, l, r, v) in &samples[17..] {
            second.add(b, l, r, v);
        }
        first.merge(&second);

        let (mean_a, std_a) = whole.finalize();
        let (mean_b, std_b) = first.finalize();
        // Partitioning reorders the per-voxel sums, so values agree only
        // up to rounding; exact equality still covers the inf marker.
        for (a, b) in mean_a.iter().zip(mean_b.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-12);
        }
        for (a, b) in std_a.iter().zip(std_b.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn add_set_matches_add() {
        let grid = whole_sky_grid();
        let mut set = SampleSet::with_capacity(2);
        set.push(0.0, 0.0, 1.0, 0.5);
        set.push(0.0, 0.0, 1.0, 0.7);

        let mut acc = VoxelAccumulator::new(&grid);
        acc.add_set(&set);
        let (mean, _) = acc.finalize();
        assert!((mean[[0, 0, 0]] - 0.6).abs() < 1e-12);
    }
}

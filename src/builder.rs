use std::fmt;

use crate::aggregate::{SampleSet, VoxelAccumulator};
use crate::catalog::StarRecord;
use crate::grid::GridSpec;
use crate::map::VoxelMap;
use crate::resample::Resampler;

/// Policy for replicate distances that land outside the map's distance
/// range after perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfRangeReplicates {
    /// Drop the replicate from the round (reference behavior: the sample
    /// simply never bins).
    Discard,
    /// Clamp the distance into the nearest edge bin.
    ClampToEdge,
}

/// Configuration for a map build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Number of Monte-Carlo replicate rounds per star; around 100 gives
    /// smooth statistics, 10 is enough for coarse grids.
    pub niters: usize,
    /// Stars with `err/value >= rel_err_limit` for reddening or
    /// extinction are discarded before binning.
    pub rel_err_limit: f64,
    /// Extra distance slack beyond the grid's upper distance limit when
    /// filtering the catalog: a star whose nominal distance sits just
    /// past the map can still scatter inside it.
    pub dist_margin: f64,
    /// Clip negative perturbed reddening/extinction replicates to zero.
    pub clip_negative: bool,
    /// What to do with replicate distances perturbed off the grid.
    pub oor_replicates: OutOfRangeReplicates,
    /// RNG seed; a fixed seed makes the build deterministic.
    pub seed: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            niters: 10,
            rel_err_limit: 0.5,
            dist_margin: 0.5,
            clip_negative: false,
            oor_replicates: OutOfRangeReplicates::Discard,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// The catalog is empty after relative-error and distance filtering.
    InsufficientData,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InsufficientData => {
                write!(f, "no catalog stars survive filtering")
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Build a voxel map from a star catalog.
///
/// The catalog is filtered by relative error and distance, then the
/// unperturbed samples plus `niters` resampled replicate rounds are
/// streamed into one accumulator per channel (reddening, extinction).
/// Distance bounds come from the grid's r axis; only `b` and `l` stay
/// fixed across replicates, while distance, reddening, and extinction
/// are each perturbed within their measured errors.
pub fn build_map(
    catalog: &[StarRecord],
    grid: &GridSpec,
    config: &BuildConfig,
) -> Result<VoxelMap, BuildError> {
    let r_max = grid.r.lim1 + config.dist_margin;
    let filtered: Vec<StarRecord> = catalog
        .iter()
        .copied()
        .filter(|s| {
            s.e_err / s.e < config.rel_err_limit && s.a_err / s.a < config.rel_err_limit
        })
        .filter(|s| s.dist >= grid.r.lim0 && s.dist <= r_max)
        .collect();

    if filtered.is_empty() {
        return Err(BuildError::InsufficientData);
    }

    let mut reddening = VoxelAccumulator::new(grid);
    let mut extinction = VoxelAccumulator::new(grid);

    // Round zero: the catalog values as measured.
    for s in &filtered {
        reddening.add(s.b, s.l, s.dist, s.e);
        extinction.add(s.b, s.l, s.dist, s.a);
    }

    let mut resampler = match config.seed {
        Some(seed) => Resampler::from_seed(seed),
        None => Resampler::from_os_rng(),
    };

    for _ in 0..config.niters {
        let (red_set, ext_set) = replicate_round(&filtered, grid, config, &mut resampler);
        reddening.add_set(&red_set);
        extinction.add_set(&ext_set);
    }

    let (mean_reddening, std_reddening) = reddening.finalize();
    let (mean_extinction, std_extinction) = extinction.finalize();

    Ok(VoxelMap {
        grid: *grid,
        mean_reddening,
        mean_extinction,
        std_reddening,
        std_extinction,
    })
}

/// One Monte-Carlo round: a perturbed replicate of every filtered star,
/// split into a reddening sample set and an extinction sample set.
fn replicate_round(
    stars: &[StarRecord],
    grid: &GridSpec,
    config: &BuildConfig,
    resampler: &mut Resampler,
) -> (SampleSet, SampleSet) {
    let mut red = SampleSet::with_capacity(stars.len());
    let mut ext = SampleSet::with_capacity(stars.len());

    for s in stars {
        let dist = resampler.perturb(s.dist, s.dist_err);
        let e = resampler.perturb_non_negative(s.e, s.e_err, config.clip_negative);
        let a = resampler.perturb_non_negative(s.a, s.a_err, config.clip_negative);

        let dist = if dist < grid.r.lim0 || dist > grid.r.lim1 {
            match config.oor_replicates {
                OutOfRangeReplicates::Discard => continue,
                OutOfRangeReplicates::ClampToEdge => dist.clamp(grid.r.lim0, grid.r.lim1),
            }
        } else {
            dist
        };

        red.push(s.b, s.l, dist, e);
        ext.push(s.b, s.l, dist, a);
    }

    (red, ext)
}

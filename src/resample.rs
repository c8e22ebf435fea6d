use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

/// Standard-normal draws are clamped (not redrawn) to this many sigmas,
/// bounding the influence of outlier draws on the binned statistics.
pub const NOISE_CLAMP_SIGMA: f64 = 2.0;

/// Generates noise-perturbed replicates of measured values under a
/// bounded-noise model.
///
/// Each perturbation is `v + clamp(N(0,1), -2, 2) * sigma`. Draws are
/// independent per call, so distance, reddening, and extinction of the
/// same star are perturbed independently; the true reddening/extinction
/// covariance is deliberately ignored (per-voxel statistics are averaged
/// over many stars, where the approximation washes out).
pub struct Resampler {
    rng: StdRng,
}

impl Resampler {
    /// Seeded resampler; a fixed seed makes map builds reproducible.
    pub fn from_seed(seed: u64) -> Resampler {
        Resampler {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Resampler seeded from the operating system.
    pub fn from_os_rng() -> Resampler {
        Resampler {
            rng: StdRng::from_os_rng(),
        }
    }

    /// One perturbed replicate of `value` with Gaussian error `sigma`.
    pub fn perturb(&mut self, value: f64, sigma: f64) -> f64 {
        let draw: f64 = self.rng.sample(StandardNormal);
        value + draw.clamp(-NOISE_CLAMP_SIGMA, NOISE_CLAMP_SIGMA) * sigma
    }

    /// Perturbed replicate of a physically non-negative quantity.
    ///
    /// With `clip_negative` set, draws that push the value below zero are
    /// clipped to zero. This is a per-replicate policy; the final voxel
    /// mean clamp applies regardless.
    pub fn perturb_non_negative(&mut self, value: f64, sigma: f64, clip_negative: bool) -> f64 {
        let v = self.perturb(value, sigma);
        if clip_negative && v < 0.0 { 0.0 } else { v }
    }
}

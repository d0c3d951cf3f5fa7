//! Parallel drivers over a set of independent particles.
//!
//! Particles share no state, so correction and estimation run one task per
//! particle. Results are always returned in particle index order.

use rayon::prelude::*;

use crate::msd::{compute_msd, MsdSample};
use crate::trajectory::Trajectory;
use crate::wrapping::{BoundaryCorrector, WrapReport};

/// Unwrap every particle in place, in parallel.
pub fn correct_all(particles: &mut [Trajectory], corrector: &BoundaryCorrector) -> Vec<WrapReport> {
    particles
        .par_iter_mut()
        .map(|traj| corrector.correct_trajectory(traj))
        .collect()
}

/// MSD samples for every particle, computed in parallel.
///
/// # Returns
/// One sample vector per particle, indexed like `particles`.
pub fn compute_ensemble_msd(particles: &[Trajectory]) -> Vec<Vec<MsdSample>> {
    particles.par_iter().map(compute_msd).collect()
}

/// Mean MSD at each lag over the particles that have a sample at that lag.
///
/// The lag axis runs to the longest particle; shorter particles simply
/// drop out of the later means. Values are summed in particle order.
pub fn average_by_lag(per_particle: &[Vec<MsdSample>]) -> Vec<MsdSample> {
    let n_lags = per_particle.iter().map(Vec::len).max().unwrap_or(0);

    (0..n_lags)
        .map(|lag| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for samples in per_particle {
                if let Some(sample) = samples.get(lag) {
                    sum += sample.value;
                    count += 1;
                }
            }
            MsdSample {
                lag,
                value: sum / count as f64,
            }
        })
        .collect()
}

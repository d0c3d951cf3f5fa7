//! End-to-end tracer analysis.
//!
//! read batches -> unwrap every particle -> MSD per particle -> grid.

use msd_core::ensemble::{compute_ensemble_msd, correct_all};
use msd_core::{MsdSample, Trajectory, WrapReport};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::table::{run_title, MsdTable};
use crate::tracers::read_tracer_dir;

/// Total stored positions above which the run is flagged as memory heavy.
const LARGE_RUN_POSITIONS: usize = 50_000_000;

/// Outcome of an analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub table: MsdTable,
    /// `nTrac=P, nStep=S`.
    pub title: String,
    pub n_particles: usize,
    pub n_steps: usize,
    /// Wrap events corrected, per particle.
    pub wraps: Vec<WrapReport>,
}

impl AnalysisReport {
    pub fn total_wraps(&self) -> usize {
        self.wraps.iter().map(WrapReport::total).sum()
    }
}

/// Read the configured data directory and analyze every particle in it.
pub fn run(config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;
    let dir = config
        .data_path
        .as_deref()
        .ok_or(AnalysisError::MissingDataPath)?;

    log::info!("Reading tracers from {}", dir.display());
    let set = read_tracer_dir(dir, config.batch_size)?;
    log::info!(
        "Loaded {} particles from {} batch files ({} steps)",
        set.n_particles(),
        set.n_files,
        set.n_steps()
    );

    let n_steps = set.n_steps();
    analyze_particles(set.particles, n_steps, config)
}

/// Unwrap and evaluate particles that are already in memory.
///
/// `n_steps` is only used for the run title.
pub fn analyze_particles(
    mut particles: Vec<Trajectory>,
    n_steps: usize,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;
    for traj in &particles {
        traj.validate()?;
    }

    let stored: usize = particles.iter().map(Trajectory::len).sum();
    if stored > LARGE_RUN_POSITIONS {
        log::warn!(
            "Holding {} positions in memory; MSD cost grows with the square of the trajectory length",
            stored
        );
    }

    let wraps = correct_all(&mut particles, &config.corrector());
    let total_wraps: usize = wraps.iter().map(WrapReport::total).sum();
    log::info!(
        "Corrected {} periodic wraps (box length {})",
        total_wraps,
        config.box_config.box_length
    );

    let per_particle: Vec<Vec<MsdSample>> = if config.streaming {
        log::info!("Computing MSD for {} particles on background streams", particles.len());
        particles
            .iter()
            .map(|traj| traj.stream_msd().collect())
            .collect()
    } else {
        log::info!("Computing MSD for {} particles in parallel", particles.len());
        compute_ensemble_msd(&particles)
    };

    let table = MsdTable::from_samples(&per_particle, config.effective_time_scale());

    Ok(AnalysisReport {
        title: run_title(particles.len(), n_steps),
        n_particles: particles.len(),
        n_steps,
        wraps,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particles() -> Vec<Trajectory> {
        vec![
            Trajectory::from_positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]),
            Trajectory::from_positions(&[[19.9, 5.0, 5.0], [0.1, 5.0, 5.0], [0.3, 5.0, 5.0]]),
        ]
    }

    #[test]
    fn test_analyze_particles() {
        let report = analyze_particles(particles(), 300, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.title, "nTrac=2, nStep=300");
        assert_eq!(report.total_wraps(), 1);
        assert_eq!(report.table.n_rows(), 3);
        assert_eq!(report.table.column(0), Some(&[0.0, 1.0, 4.0][..]));

        // Unwrapped second particle moves 0.2 per step.
        let second = report.table.column(1).unwrap();
        assert!((second[1] - 0.04).abs() < 1e-10);
        assert!((second[2] - 0.16).abs() < 1e-10);
    }

    #[test]
    fn test_streaming_matches_parallel() {
        let parallel = analyze_particles(particles(), 300, &AnalysisConfig::default()).unwrap();
        let config = AnalysisConfig {
            streaming: true,
            ..AnalysisConfig::default()
        };
        let streamed = analyze_particles(particles(), 300, &config).unwrap();
        assert_eq!(parallel.table, streamed.table);
    }

    #[test]
    fn test_run_requires_data_path() {
        assert!(matches!(
            run(&AnalysisConfig::default()),
            Err(AnalysisError::MissingDataPath)
        ));
    }
}

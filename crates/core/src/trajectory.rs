//! Per-particle trajectory storage.
//!
//! A trajectory holds one particle's recorded positions as three axis
//! sequences of equal length. Steps are appended in simulation order,
//! possibly across several batches, then corrected for periodic wraps once
//! before any displacement analysis.

use crate::error::MsdError;
use crate::msd::{compute_msd, msd_at_lag, MsdIter, MsdSample, MsdStream};
use crate::wrapping::{BoundaryCorrector, WrapReport};

/// One particle's full path, stored axis by axis.
///
/// The three axes always have the same length; every constructor and
/// mutator preserves that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

fn check_lengths(x: usize, y: usize, z: usize) -> Result<(), MsdError> {
    if x != y || x != z {
        return Err(MsdError::AxisLengthMismatch { x, y, z });
    }
    Ok(())
}

impl Trajectory {
    /// Create an empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty trajectory with room for `n_steps` steps.
    pub fn with_capacity(n_steps: usize) -> Self {
        Self {
            x: Vec::with_capacity(n_steps),
            y: Vec::with_capacity(n_steps),
            z: Vec::with_capacity(n_steps),
        }
    }

    /// Build a trajectory from three axis sequences.
    ///
    /// Fails if the sequences differ in length; nothing is truncated.
    pub fn from_axes(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self, MsdError> {
        check_lengths(x.len(), y.len(), z.len())?;
        Ok(Self { x, y, z })
    }

    /// Build a trajectory from per-step `[x, y, z]` positions.
    pub fn from_positions(positions: &[[f64; 3]]) -> Self {
        let mut traj = Self::with_capacity(positions.len());
        for &[x, y, z] in positions {
            traj.append_step(x, y, z);
        }
        traj
    }

    /// Append one simulation step.
    pub fn append_step(&mut self, x: f64, y: f64, z: f64) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }

    /// Append every step of `batch`, in order.
    pub fn append_batch(&mut self, batch: &Trajectory) -> Result<(), MsdError> {
        self.append_batch_axes(&batch.x, &batch.y, &batch.z)
    }

    /// Append a batch given as raw axis slices.
    ///
    /// A malformed batch is rejected before any axis is touched.
    pub fn append_batch_axes(&mut self, x: &[f64], y: &[f64], z: &[f64]) -> Result<(), MsdError> {
        check_lengths(x.len(), y.len(), z.len())?;
        self.x.extend_from_slice(x);
        self.y.extend_from_slice(y);
        self.z.extend_from_slice(z);
        Ok(())
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Position at step `i`, if recorded.
    pub fn position(&self, i: usize) -> Option<[f64; 3]> {
        if i >= self.len() {
            return None;
        }
        Some([self.x[i], self.y[i], self.z[i]])
    }

    /// All positions as `[x, y, z]` triples.
    pub fn positions(&self) -> Vec<[f64; 3]> {
        (0..self.len())
            .map(|i| [self.x[i], self.y[i], self.z[i]])
            .collect()
    }

    /// Re-check the equal-length invariant.
    pub fn validate(&self) -> Result<(), MsdError> {
        check_lengths(self.x.len(), self.y.len(), self.z.len())
    }

    /// Mutable access to the three axes at once.
    pub(crate) fn axes_mut(&mut self) -> (&mut [f64], &mut [f64], &mut [f64]) {
        (&mut self.x, &mut self.y, &mut self.z)
    }

    /// Unwrap periodic boundary crossings in place.
    pub fn correct_boundary(&mut self, corrector: &BoundaryCorrector) -> WrapReport {
        corrector.correct_trajectory(self)
    }

    /// MSD at a single lag. Lags at or past the end give 0.
    pub fn msd_at_lag(&self, lag: usize) -> f64 {
        msd_at_lag(self, lag)
    }

    /// Lazily evaluate MSD for every lag on the calling thread.
    pub fn msd_iter(&self) -> MsdIter<'_> {
        MsdIter::new(self)
    }

    /// Evaluate MSD on a background worker, handing samples over one at a time.
    ///
    /// The worker owns a snapshot of the current positions.
    pub fn stream_msd(&self) -> MsdStream {
        MsdStream::spawn(self.clone())
    }

    /// Evaluate MSD for every lag into a vector.
    pub fn msd(&self) -> Vec<MsdSample> {
        compute_msd(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_step_keeps_axes_aligned() {
        let mut traj = Trajectory::new();
        assert!(traj.is_empty());
        traj.append_step(1.0, 2.0, 3.0);
        traj.append_step(4.0, 5.0, 6.0);
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.position(1), Some([4.0, 5.0, 6.0]));
        assert_eq!(traj.position(2), None);
        assert!(traj.validate().is_ok());
    }

    #[test]
    fn test_from_axes_rejects_mismatch() {
        let err = Trajectory::from_axes(vec![0.0, 1.0], vec![0.0], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err, MsdError::AxisLengthMismatch { x: 2, y: 1, z: 2 });
    }

    #[test]
    fn test_append_batch_concatenates_in_order() {
        let mut traj = Trajectory::from_positions(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let batch = Trajectory::from_positions(&[[2.0, 2.0, 2.0]]);
        traj.append_batch(&batch).unwrap();
        assert_eq!(traj.x(), &[0.0, 1.0, 2.0]);
        assert_eq!(traj.positions().last(), Some(&[2.0, 2.0, 2.0]));
    }

    #[test]
    fn test_malformed_batch_leaves_trajectory_untouched() {
        let mut traj = Trajectory::from_positions(&[[0.0, 0.0, 0.0]]);
        let before = traj.clone();
        let result = traj.append_batch_axes(&[1.0, 2.0], &[1.0, 2.0], &[1.0]);
        assert!(result.is_err());
        assert_eq!(traj, before);
    }
}

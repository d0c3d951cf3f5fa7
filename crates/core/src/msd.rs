//! Time-lagged mean-squared displacement of a single particle.
//!
//! For lag `t` over a trajectory of `N` steps,
//!
//! ```text
//! MSD(t) = (Σ_{i<N-t} |r(i)|² + Σ_{i<N-t} |r(i+t)|² - 2 Σ_{i<N-t} r(i)·r(i+t)) / (N - t)
//! ```
//!
//! which is the mean over all valid origins of `|r(i+t) - r(i)|²`. The three
//! sums are accumulated in one forward scan per lag; that summation order
//! is the reference result and every evaluation path below shares it.
//!
//! Samples can be consumed three ways with identical output:
//! [`MsdIter`] evaluates lazily on the calling thread, [`MsdStream`] runs a
//! background worker behind a one-slot channel, and [`compute_msd`]
//! materializes everything at once.

use std::iter::FusedIterator;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver};
use serde::Serialize;

use crate::trajectory::Trajectory;
use crate::util::squared_norm;

/// MSD value for one lag, in squared length units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MsdSample {
    /// Lag in simulation steps.
    pub lag: usize,
    /// Mean over all origins of the squared displacement at this lag.
    pub value: f64,
}

/// MSD at `lag`. Lags at or past the trajectory length give 0.
pub fn msd_at_lag(traj: &Trajectory, lag: usize) -> f64 {
    let (x, y, z) = (traj.x(), traj.y(), traj.z());
    let n = x.len();
    if lag >= n {
        return 0.0;
    }

    let n_origins = n - lag;
    let mut sum_head = 0.0;
    let mut sum_tail = 0.0;
    let mut cross = 0.0;

    for i in 0..n_origins {
        let j = i + lag;
        sum_head += squared_norm(x[i], y[i], z[i]);
        sum_tail += squared_norm(x[j], y[j], z[j]);
        cross += x[i] * x[j] + y[i] * y[j] + z[i] * z[j];
    }

    (sum_head + sum_tail - 2.0 * cross) / n_origins as f64
}

/// Number of samples an estimator emits for a trajectory of `n_steps`.
///
/// An empty trajectory still yields a single `(0, 0.0)` sample.
#[inline]
pub fn sample_count(n_steps: usize) -> usize {
    n_steps.max(1)
}

/// Lazy MSD evaluation, one lag per call to `next`.
#[derive(Debug, Clone)]
pub struct MsdIter<'a> {
    traj: &'a Trajectory,
    next_lag: usize,
    remaining: usize,
}

impl<'a> MsdIter<'a> {
    pub fn new(traj: &'a Trajectory) -> Self {
        Self {
            traj,
            next_lag: 0,
            remaining: sample_count(traj.len()),
        }
    }
}

impl Iterator for MsdIter<'_> {
    type Item = MsdSample;

    fn next(&mut self) -> Option<MsdSample> {
        if self.remaining == 0 {
            return None;
        }
        let lag = self.next_lag;
        let value = msd_at_lag(self.traj, lag);
        self.next_lag += 1;
        self.remaining -= 1;
        Some(MsdSample { lag, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for MsdIter<'_> {}

impl FusedIterator for MsdIter<'_> {}

/// MSD evaluated on a worker thread and handed over through a one-slot channel.
///
/// The consumer blocks until the next lag is ready and the worker blocks
/// while the previous sample is still unread. Dropping the stream early
/// disconnects the channel, which stops the worker at its next hand-off;
/// the worker is joined before the drop returns.
pub struct MsdStream {
    receiver: Option<Receiver<MsdSample>>,
    worker: Option<JoinHandle<()>>,
    remaining: usize,
}

impl MsdStream {
    /// Start evaluating `traj` on a new worker thread.
    pub fn spawn(traj: Trajectory) -> Self {
        let (sender, receiver) = channel::bounded(1);
        let remaining = sample_count(traj.len());

        let worker = std::thread::spawn(move || {
            for sample in MsdIter::new(&traj) {
                if sender.send(sample).is_err() {
                    log::debug!("msd stream dropped at lag {}", sample.lag);
                    break;
                }
            }
        });

        Self {
            receiver: Some(receiver),
            worker: Some(worker),
            remaining,
        }
    }

    fn shutdown(&mut self) {
        // Disconnect first so a worker blocked in `send` can exit.
        self.receiver = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("msd stream worker panicked");
            }
        }
    }
}

impl Iterator for MsdStream {
    type Item = MsdSample;

    fn next(&mut self) -> Option<MsdSample> {
        let received = self.receiver.as_ref()?.recv();
        match received {
            Ok(sample) => {
                self.remaining = self.remaining.saturating_sub(1);
                Some(sample)
            }
            Err(_) => {
                self.remaining = 0;
                self.shutdown();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl FusedIterator for MsdStream {}

impl Drop for MsdStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Evaluate MSD for every lag of `traj`.
pub fn compute_msd(traj: &Trajectory) -> Vec<MsdSample> {
    MsdIter::new(traj).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_x(n: usize) -> Trajectory {
        let positions: Vec<[f64; 3]> = (0..n).map(|i| [i as f64, 0.0, 0.0]).collect();
        Trajectory::from_positions(&positions)
    }

    fn random_walk(n: usize) -> Trajectory {
        // Deterministic pseudo-random steps.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as f64 / 1000.0 - 0.5
        };
        let mut pos = [3.0, -2.0, 7.5];
        let mut traj = Trajectory::new();
        for _ in 0..n {
            pos[0] += next();
            pos[1] += next();
            pos[2] += next();
            traj.append_step(pos[0], pos[1], pos[2]);
        }
        traj
    }

    fn naive_msd(traj: &Trajectory, lag: usize) -> f64 {
        let positions = traj.positions();
        let n = positions.len();
        let count = n - lag;
        let total: f64 = (0..count)
            .map(|i| {
                let [ax, ay, az] = positions[i + lag];
                let [bx, by, bz] = positions[i];
                squared_norm(ax - bx, ay - by, az - bz)
            })
            .sum();
        total / count as f64
    }

    #[test]
    fn test_straight_line_scenario() {
        let traj = line_x(4);
        assert_eq!(msd_at_lag(&traj, 0), 0.0);
        assert_eq!(msd_at_lag(&traj, 1), 1.0);
        assert_eq!(msd_at_lag(&traj, 2), 4.0);
        assert_eq!(msd_at_lag(&traj, 3), 9.0);
    }

    #[test]
    fn test_zero_lag_is_exactly_zero() {
        let traj = random_walk(257);
        assert_eq!(msd_at_lag(&traj, 0), 0.0);
    }

    #[test]
    fn test_lag_past_end_is_zero() {
        let traj = line_x(4);
        assert_eq!(msd_at_lag(&traj, 4), 0.0);
        assert_eq!(msd_at_lag(&traj, 100), 0.0);
        assert_eq!(msd_at_lag(&Trajectory::new(), 0), 0.0);
    }

    #[test]
    fn test_matches_direct_displacement_average() {
        let traj = random_walk(200);
        for lag in [1, 2, 17, 100, 199] {
            let fast = msd_at_lag(&traj, lag);
            let slow = naive_msd(&traj, lag);
            assert!(
                (fast - slow).abs() < 1e-8 * slow.max(1.0),
                "lag {}: {} vs {}",
                lag,
                fast,
                slow
            );
        }
    }

    #[test]
    fn test_negated_axes_give_identical_values() {
        let traj = random_walk(64);
        let negated: Vec<[f64; 3]> = traj
            .positions()
            .iter()
            .map(|p| [-p[0], -p[1], -p[2]])
            .collect();
        let negated = Trajectory::from_positions(&negated);
        assert_eq!(compute_msd(&traj), compute_msd(&negated));
    }

    #[test]
    fn test_iter_emits_every_lag_in_order() {
        let traj = random_walk(33);
        let iter = traj.msd_iter();
        assert_eq!(iter.len(), 33);
        let lags: Vec<usize> = iter.map(|s| s.lag).collect();
        assert_eq!(lags, (0..33).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_trajectory_yields_single_zero_sample() {
        let traj = Trajectory::new();
        let samples: Vec<MsdSample> = traj.msd_iter().collect();
        assert_eq!(samples, vec![MsdSample { lag: 0, value: 0.0 }]);

        let streamed: Vec<MsdSample> = traj.stream_msd().collect();
        assert_eq!(streamed, samples);
    }

    #[test]
    fn test_iter_is_fused() {
        let traj = line_x(2);
        let mut iter = traj.msd_iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_stream_matches_materialized() {
        let traj = random_walk(150);
        let streamed: Vec<MsdSample> = traj.stream_msd().collect();
        assert_eq!(streamed, compute_msd(&traj));
        assert_eq!(streamed, traj.msd());
    }

    #[test]
    fn test_repeated_evaluation_is_deterministic() {
        let traj = random_walk(80);
        let first = compute_msd(&traj);
        let second = compute_msd(&traj);
        assert_eq!(first, second);
        let streamed_twice: Vec<MsdSample> = traj.stream_msd().collect();
        assert_eq!(first, streamed_twice);
    }

    #[test]
    fn test_stream_abandoned_early_releases_worker() {
        let traj = random_walk(500);
        let mut stream = traj.stream_msd();
        assert_eq!(stream.size_hint(), (500, Some(500)));
        let first = stream.next().unwrap();
        let second = stream.next().unwrap();
        assert_eq!(first.lag, 0);
        assert_eq!(second.lag, 1);
        // Drop joins the worker; this must not hang.
        drop(stream);
    }

    #[test]
    fn test_stream_terminates_once() {
        let traj = line_x(3);
        let mut stream = traj.stream_msd();
        assert_eq!(stream.by_ref().count(), 3);
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }
}

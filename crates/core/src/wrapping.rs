//! Periodic boundary unwrapping for trajectory continuity.
//!
//! A particle leaving a periodic box reappears at the opposite face, which
//! shows up in the stored coordinates as a jump of roughly one box length.
//! The corrector scans each axis left to right and, whenever the step from
//! the previous (already corrected) value exceeds `L - guard` in either
//! direction, shifts the whole remaining tail by one box length.

use serde::{Deserialize, Serialize};

use crate::error::MsdError;
use crate::trajectory::Trajectory;

/// Default periodic box edge length.
pub const DEFAULT_BOX_LENGTH: f64 = 20.0;

/// Default margin below one box length at which a step counts as a wrap.
pub const DEFAULT_WRAP_GUARD: f64 = 0.5;

/// Periodic box settings shared by every particle in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoxConfig {
    /// Box edge length `L`. Default: 20.0.
    pub box_length: f64,
    /// Half-bin guard subtracted from `L` to form the wrap thresholds. Default: 0.5.
    pub wrap_guard: f64,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            box_length: DEFAULT_BOX_LENGTH,
            wrap_guard: DEFAULT_WRAP_GUARD,
        }
    }
}

impl BoxConfig {
    /// Box of edge `box_length` with the default guard.
    pub fn new(box_length: f64) -> Result<Self, MsdError> {
        let config = Self {
            box_length,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_wrap_guard(mut self, wrap_guard: f64) -> Result<Self, MsdError> {
        self.wrap_guard = wrap_guard;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), MsdError> {
        if !self.box_length.is_finite() || self.box_length <= 0.0 {
            return Err(MsdError::InvalidBoxLength(self.box_length));
        }
        if !self.wrap_guard.is_finite()
            || self.wrap_guard < 0.0
            || self.wrap_guard >= self.box_length
        {
            return Err(MsdError::InvalidWrapGuard(self.wrap_guard));
        }
        Ok(())
    }
}

/// Number of wrap events corrected on each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapReport {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl WrapReport {
    pub fn total(&self) -> usize {
        self.x + self.y + self.z
    }
}

/// Unwraps axis sequences against a fixed periodic box.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryCorrector {
    config: BoxConfig,
}

impl BoundaryCorrector {
    pub fn new(config: BoxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BoxConfig {
        &self.config
    }

    /// Steps strictly above this are negative-to-positive wraps.
    #[inline]
    pub fn upper_threshold(&self) -> f64 {
        self.config.box_length - self.config.wrap_guard
    }

    /// Steps strictly below this are positive-to-negative wraps.
    #[inline]
    pub fn lower_threshold(&self) -> f64 {
        self.config.wrap_guard - self.config.box_length
    }

    /// Unwrap one axis in place, returning the number of wraps corrected.
    ///
    /// Each wrap shifts every element from the wrap onward, so later
    /// comparisons see the already corrected frame and repeated crossings
    /// accumulate. Empty and single-element sequences are left as is.
    pub fn correct(&self, seq: &mut [f64]) -> usize {
        let box_length = self.config.box_length;
        let upper = self.upper_threshold();
        let lower = self.lower_threshold();
        let mut events = 0;

        for i in 1..seq.len() {
            let delta = seq[i] - seq[i - 1];
            if delta > upper {
                log::debug!("wrap at step {}: delta {:.4} > {:.4}, shifting tail down", i, delta, upper);
                for value in &mut seq[i..] {
                    *value -= box_length;
                }
                events += 1;
            } else if delta < lower {
                log::debug!("wrap at step {}: delta {:.4} < {:.4}, shifting tail up", i, delta, lower);
                for value in &mut seq[i..] {
                    *value += box_length;
                }
                events += 1;
            }
        }

        events
    }

    /// Unwrap all three axes of a trajectory independently.
    pub fn correct_trajectory(&self, traj: &mut Trajectory) -> WrapReport {
        let (x, y, z) = traj.axes_mut();
        WrapReport {
            x: self.correct(x),
            y: self.correct(y),
            z: self.correct(z),
        }
    }
}

/// Unwrap a raw axis with the default guard.
pub fn correct_axis(seq: &mut [f64], box_length: f64) -> usize {
    let config = BoxConfig {
        box_length,
        ..BoxConfig::default()
    };
    BoundaryCorrector::new(config).correct(seq)
}

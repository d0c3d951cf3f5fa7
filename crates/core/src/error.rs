//! Error type for trajectory construction and box configuration.

/// Errors raised when building trajectories or box settings.
///
/// The corrector and the estimator themselves are total over well-formed
/// input, so every variant here is a rejected precondition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MsdError {
    #[error("axis lengths differ (x={x}, y={y}, z={z})")]
    AxisLengthMismatch { x: usize, y: usize, z: usize },
    #[error("box length must be finite and positive, got {0}")]
    InvalidBoxLength(f64),
    #[error("wrap guard must lie in [0, box_length), got {0}")]
    InvalidWrapGuard(f64),
}

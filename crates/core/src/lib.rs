//! Core library for msd-tools.
//!
//! Pure Rust implementations with no I/O. Provides the per-particle
//! trajectory type, periodic boundary unwrapping, the mean-squared
//! displacement estimator, and parallel drivers over particle ensembles.

pub mod ensemble;
pub mod error;
pub mod msd;
pub mod trajectory;
pub mod util;
pub mod wrapping;

pub use error::MsdError;
pub use msd::{compute_msd, msd_at_lag, MsdIter, MsdSample, MsdStream};
pub use trajectory::Trajectory;
pub use wrapping::{BoundaryCorrector, BoxConfig, WrapReport};

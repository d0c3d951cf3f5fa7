//! Tracer analysis workflow built on `msd_core`.
//!
//! Reads batched `.tracers` files into per-particle trajectories, unwraps
//! and evaluates them with the core estimator, and lays the results out as
//! a time-by-particle grid ready for delimited output.

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod table;
pub mod tracers;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, CoordinateError, TracerError};
pub use pipeline::{analyze_particles, run, AnalysisReport};
pub use table::MsdTable;

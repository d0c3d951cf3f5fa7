//! Error types for ingestion, configuration, and output.

use std::io;
use std::num::ParseFloatError;
use std::path::PathBuf;

use msd_core::MsdError;

/// A coordinate line that is not exactly three real numbers.
#[derive(Debug, thiserror::Error)]
pub enum CoordinateError {
    #[error("expected 3 fields, found {found}")]
    FieldCount { found: usize },
    #[error("failed to parse {axis} value '{value}': {source}")]
    Parse {
        axis: char,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Failures while reading `.tracers` batch files.
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: missing particle-count header", path.display())]
    MissingHeader { path: PathBuf },
    #[error("{}: invalid particle-count header '{value}'", path.display())]
    InvalidHeader { path: PathBuf, value: String },
    #[error("{}:{line}: {source}", path.display())]
    Coordinates {
        path: PathBuf,
        line: usize,
        #[source]
        source: CoordinateError,
    },
    #[error("{}: header declares {found} particles, expected {expected}", path.display())]
    ParticleCountMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("{}: header declares {declared} particles but only {found} positions follow", path.display())]
    TruncatedBatch {
        path: PathBuf,
        declared: usize,
        found: usize,
    },
    #[error("no tracer batches found in {} (looked for {})", dir.display(), first.display())]
    NoBatches { dir: PathBuf, first: PathBuf },
}

/// Top-level error for an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Tracer(#[from] TracerError),
    #[error(transparent)]
    Trajectory(#[from] MsdError),
    #[error("no data path configured (pass --path or set MSD_DATA_PATH)")]
    MissingDataPath,
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("time scale must be at least 1")]
    ZeroTimeScale,
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

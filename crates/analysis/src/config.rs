//! Analysis run configuration.
//!
//! Settings come from an optional TOML file; the command line and
//! environment override individual fields afterwards. Every field has a
//! default, so an empty file is a valid configuration.
//!
//! ```toml
//! data_path = "runs/2024-05"
//! batch_size = 100
//! streaming = false
//!
//! [box]
//! box_length = 20.0
//! wrap_guard = 0.5
//!
//! [output]
//! path = "msd.csv"
//! format = "csv"
//! ```

use std::path::{Path, PathBuf};

use msd_core::{BoundaryCorrector, BoxConfig};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::output::OutputFormat;
use crate::tracers::DEFAULT_BATCH_SIZE;

/// Where and how the result grid is written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output file. Default: derived from the run title.
    pub path: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Configuration for a full tracer analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Directory holding the numbered `.tracers` batches.
    pub data_path: Option<PathBuf>,
    /// Steps per batch file; also the file-name stride. Default: 100.
    pub batch_size: usize,
    /// Periodic box used for unwrapping.
    #[serde(rename = "box")]
    pub box_config: BoxConfig,
    /// Steps per lag in the time column. Default: `batch_size`.
    pub time_scale: Option<usize>,
    /// Evaluate each particle on a background stream instead of in parallel.
    pub streaming: bool,
    pub output: OutputConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            box_config: BoxConfig::default(),
            time_scale: None,
            streaming: false,
            output: OutputConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AnalysisError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AnalysisError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.batch_size == 0 {
            return Err(AnalysisError::ZeroBatchSize);
        }
        if self.time_scale == Some(0) {
            return Err(AnalysisError::ZeroTimeScale);
        }
        self.box_config.validate()?;
        Ok(())
    }

    /// Steps per lag used for the time column.
    pub fn effective_time_scale(&self) -> usize {
        self.time_scale.unwrap_or(self.batch_size)
    }

    pub fn corrector(&self) -> BoundaryCorrector {
        BoundaryCorrector::new(self.box_config)
    }
}

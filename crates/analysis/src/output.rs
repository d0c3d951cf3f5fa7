//! Delimited-text output of an [`MsdTable`].

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::table::MsdTable;

/// Delimited output flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
}

impl OutputFormat {
    pub fn delimiter(&self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv => b'\t',
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
        }
    }
}

/// Write the header row and every data row of `table`.
pub fn write_table<W: Write>(table: &MsdTable, writer: W, format: OutputFormat) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_writer(writer);

    wtr.write_record(table.header())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `table` to a new file at `path`.
pub fn write_table_file(table: &MsdTable, path: &Path, format: OutputFormat) -> Result<(), AnalysisError> {
    let to_error = |source: csv::Error| AnalysisError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| to_error(e.into()))?;
    write_table(table, file, format).map_err(to_error)
}

/// File name used when no output path is configured: `"{title} {stamp}.{ext}"`.
pub fn default_output_path(title: &str, stamp: u64, format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("{} {}.{}", title, stamp, format.extension()))
}

//! Unwrap tracer trajectories and tabulate their mean-squared displacement.
//!
//! # Usage
//!
//! ```bash
//! msd-tracers --path runs/2024-05 --box-length 20 -o msd.csv
//! MSD_DATA_PATH=runs/2024-05 msd-tracers --tsv
//! ```

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use msd_analysis::config::AnalysisConfig;
use msd_analysis::output::{default_output_path, write_table_file, OutputFormat};
use msd_analysis::pipeline;

#[derive(Parser, Debug)]
#[command(name = "msd-tracers", version)]
#[command(about = "Mean-squared displacement of tracer particles in a periodic box")]
struct Cli {
    /// Directory holding the numbered .tracers batch files
    #[arg(short, long, env = "MSD_DATA_PATH")]
    path: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Periodic box edge length
    #[arg(long, env = "MSD_BOX_LENGTH")]
    box_length: Option<f64>,

    /// Margin below one box length at which a step counts as a wrap
    #[arg(long)]
    wrap_guard: Option<f64>,

    /// Steps per batch file (also the file-name stride)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Steps per lag in the time column (defaults to the batch size)
    #[arg(long)]
    time_scale: Option<usize>,

    /// Output file (defaults to "<title> <unix time>.csv")
    #[arg(short, long, env = "MSD_OUTPUT")]
    output: Option<PathBuf>,

    /// Write tab-separated instead of comma-separated values
    #[arg(long)]
    tsv: bool,

    /// Evaluate each particle on a background stream instead of in parallel
    #[arg(long)]
    stream: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn to_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(path) = &self.path {
            config.data_path = Some(path.clone());
        }
        if let Some(box_length) = self.box_length {
            config.box_config.box_length = box_length;
        }
        if let Some(wrap_guard) = self.wrap_guard {
            config.box_config.wrap_guard = wrap_guard;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(time_scale) = self.time_scale {
            config.time_scale = Some(time_scale);
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }
        if self.tsv {
            config.output.format = OutputFormat::Tsv;
        }
        if self.stream {
            config.streaming = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.to_config()?;
    let report = pipeline::run(&config)?;

    let path = match &config.output.path {
        Some(path) => path.clone(),
        None => {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            default_output_path(&report.title, stamp, config.output.format)
        }
    };
    write_table_file(&report.table, &path, config.output.format)?;

    info!(
        "Wrote {} ({} rows, {} particles, {} wraps corrected)",
        path.display(),
        report.table.n_rows(),
        report.n_particles,
        report.total_wraps()
    );
    println!("{}", path.display());
    Ok(())
}

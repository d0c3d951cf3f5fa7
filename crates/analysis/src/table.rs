//! Time-by-particle MSD grid.
//!
//! One row per lag, a leading time column (lag scaled to simulation steps),
//! one column per particle, and a trailing column with the mean over the
//! particles present at that lag.

use std::fmt;

use msd_core::ensemble::average_by_lag;
use msd_core::MsdSample;

/// A single cell of the output grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Time(usize),
    Value(f64),
    /// The particle has no sample at this lag.
    Empty,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Time(t) => write!(f, "{}", t),
            Cell::Value(v) => write!(f, "{}", v),
            Cell::Empty => Ok(()),
        }
    }
}

/// Tabulated MSD for a set of particles.
#[derive(Debug, Clone, PartialEq)]
pub struct MsdTable {
    lags: Vec<usize>,
    /// One column per particle; shorter particles stop early.
    columns: Vec<Vec<f64>>,
    average: Vec<f64>,
    time_scale: usize,
}

impl MsdTable {
    /// Build the grid from per-particle samples in particle order.
    pub fn from_samples(per_particle: &[Vec<MsdSample>], time_scale: usize) -> Self {
        let average = average_by_lag(per_particle);
        let lags: Vec<usize> = average.iter().map(|s| s.lag).collect();
        let columns: Vec<Vec<f64>> = per_particle
            .iter()
            .map(|samples| samples.iter().map(|s| s.value).collect())
            .collect();

        Self {
            lags,
            columns,
            average: average.iter().map(|s| s.value).collect(),
            time_scale,
        }
    }

    pub fn n_particles(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        self.lags.len()
    }

    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    pub fn time_scale(&self) -> usize {
        self.time_scale
    }

    /// MSD column of particle `index` (0-based).
    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    pub fn average(&self) -> &[f64] {
        &self.average
    }

    /// Time value reported for `row`.
    pub fn time(&self, row: usize) -> usize {
        self.lags[row] * self.time_scale
    }

    /// Column titles: `Time`, `particle No.1` .. `particle No.P`, `Average`.
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.n_particles() + 2);
        header.push("Time".to_string());
        header.extend((1..=self.n_particles()).map(|i| format!("particle No.{}", i)));
        header.push("Average".to_string());
        header
    }

    pub fn row(&self, row: usize) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.n_particles() + 2);
        cells.push(Cell::Time(self.time(row)));
        cells.extend(
            self.columns
                .iter()
                .map(|col| col.get(row).map_or(Cell::Empty, |&v| Cell::Value(v))),
        );
        cells.push(Cell::Value(self.average[row]));
        cells
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell>> + '_ {
        (0..self.n_rows()).map(move |row| self.row(row))
    }
}

/// Run title in the form `nTrac=P, nStep=S`.
pub fn run_title(n_particles: usize, n_steps: usize) -> String {
    format!("nTrac={}, nStep={}", n_particles, n_steps)
}

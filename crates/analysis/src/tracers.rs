//! Tracer batch file (`.tracers`) reader.
//!
//! Format: a header line holding the particle count `P`, then exactly `P`
//! lines of whitespace-separated `x y z`, one per particle, all recorded at
//! the same simulation step. A run is split into numbered batches
//! `100.tracers`, `200.tracers`, ... (multiples of the batch size) that are
//! read in order until the first missing file. Line `i` of every batch
//! appends one step to particle `i`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use msd_core::Trajectory;

use crate::error::{CoordinateError, TracerError};

/// Steps represented by one batch file.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Extension of tracer batch files.
pub const TRACER_EXTENSION: &str = "tracers";

/// Parse one `x y z` line.
pub fn parse_coordinates(line: &str) -> Result<[f64; 3], CoordinateError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(CoordinateError::FieldCount { found: fields.len() });
    }

    let mut coords = [0.0; 3];
    for (slot, (axis, field)) in coords.iter_mut().zip(['x', 'y', 'z'].into_iter().zip(fields)) {
        *slot = field.parse().map_err(|source| CoordinateError::Parse {
            axis,
            value: field.to_string(),
            source,
        })?;
    }
    Ok(coords)
}

/// Streaming reader for a single tracer batch.
pub struct TracerReader<R = BufReader<File>> {
    reader: R,
    path: PathBuf,
    n_particles: usize,
    particles_read: usize,
    line_number: usize,
}

impl TracerReader {
    /// Open a batch file and read its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TracerError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TracerError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }
}

impl<R: BufRead> TracerReader<R> {
    /// Wrap an already open reader; `path` is only used in error messages.
    pub fn from_reader<P: AsRef<Path>>(reader: R, path: P) -> Result<Self, TracerError> {
        let mut this = Self {
            reader,
            path: path.as_ref().to_path_buf(),
            n_particles: 0,
            particles_read: 0,
            line_number: 0,
        };
        this.n_particles = this.read_header()?;
        Ok(this)
    }

    fn read_line(&mut self, line: &mut String) -> Result<usize, TracerError> {
        line.clear();
        let bytes = self.reader.read_line(line).map_err(|source| TracerError::Read {
            path: self.path.clone(),
            source,
        })?;
        if bytes > 0 {
            self.line_number += 1;
        }
        Ok(bytes)
    }

    fn read_header(&mut self) -> Result<usize, TracerError> {
        let mut line = String::new();
        if self.read_line(&mut line)? == 0 {
            return Err(TracerError::MissingHeader {
                path: self.path.clone(),
            });
        }
        let value = line.trim();
        value.parse().map_err(|_| TracerError::InvalidHeader {
            path: self.path.clone(),
            value: value.to_string(),
        })
    }

    /// Particle count declared in the header.
    pub fn n_particles(&self) -> usize {
        self.n_particles
    }

    /// Read the next particle position. Returns None once the header count
    /// is reached or the file ends.
    pub fn read_position(&mut self) -> Result<Option<[f64; 3]>, TracerError> {
        if self.particles_read >= self.n_particles {
            return Ok(None);
        }

        let mut line = String::new();
        loop {
            if self.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        let coords = parse_coordinates(&line).map_err(|source| TracerError::Coordinates {
            path: self.path.clone(),
            line: self.line_number,
            source,
        })?;
        self.particles_read += 1;
        Ok(Some(coords))
    }

    /// Positions read so far.
    pub fn particles_read(&self) -> usize {
        self.particles_read
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Append one batch to `particles`.
///
/// `expected` is the particle count fixed by earlier batches; pass `None`
/// for the first batch of a run, which allocates the particles. Returns the
/// number of positions read.
pub fn read_batch<R: BufRead>(
    mut reader: TracerReader<R>,
    particles: &mut Vec<Trajectory>,
    expected: Option<usize>,
) -> Result<usize, TracerError> {
    let declared = reader.n_particles();
    match expected {
        None => {
            particles.clear();
            particles.resize_with(declared, Trajectory::new);
        }
        Some(expected) if expected != declared || particles.len() != declared => {
            return Err(TracerError::ParticleCountMismatch {
                path: reader.path().to_path_buf(),
                expected,
                found: declared,
            });
        }
        Some(_) => {}
    }

    let mut index = 0;
    while let Some([x, y, z]) = reader.read_position()? {
        particles[index].append_step(x, y, z);
        index += 1;
    }

    // A missing line would shift that particle's later steps out of order.
    if index < declared {
        return Err(TracerError::TruncatedBatch {
            path: reader.path().to_path_buf(),
            declared,
            found: index,
        });
    }
    Ok(index)
}

/// Read one batch file into `particles`.
pub fn read_tracer_file<P: AsRef<Path>>(
    path: P,
    particles: &mut Vec<Trajectory>,
    expected: Option<usize>,
) -> Result<usize, TracerError> {
    read_batch(TracerReader::open(path)?, particles, expected)
}

/// Path of the `k`-th batch (1-based) in `dir`.
pub fn batch_path(dir: &Path, k: usize, batch_size: usize) -> PathBuf {
    dir.join(format!("{}.{}", k * batch_size, TRACER_EXTENSION))
}

/// Every particle's trajectory across all batches of a run.
#[derive(Debug, Clone)]
pub struct TracerSet {
    pub particles: Vec<Trajectory>,
    /// Number of batch files read.
    pub n_files: usize,
    pub batch_size: usize,
}

impl TracerSet {
    pub fn n_particles(&self) -> usize {
        self.particles.len()
    }

    /// Simulation steps covered by the batches read.
    pub fn n_steps(&self) -> usize {
        self.n_files * self.batch_size
    }
}

/// Read every consecutive batch file in `dir`.
pub fn read_tracer_dir<P: AsRef<Path>>(dir: P, batch_size: usize) -> Result<TracerSet, TracerError> {
    let dir = dir.as_ref();
    let mut particles = Vec::new();
    let mut n_files = 0;
    let mut expected = None;

    loop {
        let path = batch_path(dir, n_files + 1, batch_size);
        if !path.is_file() {
            break;
        }
        let read = read_tracer_file(&path, &mut particles, expected)?;
        expected = Some(particles.len());
        log::debug!("read {} positions from {}", read, path.display());
        n_files += 1;
    }

    if n_files == 0 {
        return Err(TracerError::NoBatches {
            dir: dir.to_path_buf(),
            first: batch_path(dir, 1, batch_size),
        });
    }

    Ok(TracerSet {
        particles,
        n_files,
        batch_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> TracerReader<Cursor<&[u8]>> {
        TracerReader::from_reader(Cursor::new(text.as_bytes()), "test.tracers").unwrap()
    }

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(parse_coordinates("1.0 -2.5 3e-1").unwrap(), [1.0, -2.5, 0.3]);
        assert_eq!(parse_coordinates("  4\t5   6 \n").unwrap(), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_coordinates_rejects_bad_lines() {
        assert!(matches!(
            parse_coordinates("1.0 2.0"),
            Err(CoordinateError::FieldCount { found: 2 })
        ));
        assert!(matches!(
            parse_coordinates("1.0 2.0 3.0 4.0"),
            Err(CoordinateError::FieldCount { found: 4 })
        ));
        match parse_coordinates("1.0 abc 3.0") {
            Err(CoordinateError::Parse { axis, value, .. }) => {
                assert_eq!(axis, 'y');
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reader_stops_at_header_count() {
        let mut r = reader("2\n0 0 0\n1 1 1\n9 9 9\n");
        assert_eq!(r.n_particles(), 2);
        assert_eq!(r.read_position().unwrap(), Some([0.0, 0.0, 0.0]));
        assert_eq!(r.read_position().unwrap(), Some([1.0, 1.0, 1.0]));
        assert_eq!(r.read_position().unwrap(), None);
        assert_eq!(r.particles_read(), 2);
    }

    #[test]
    fn test_reader_skips_blank_lines() {
        let mut r = reader("1\n\n  \n2 3 4\n");
        assert_eq!(r.read_position().unwrap(), Some([2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_bad_header() {
        let err = TracerReader::from_reader(Cursor::new("abc\n".as_bytes()), "h.tracers")
            .err()
            .unwrap();
        assert!(matches!(err, TracerError::InvalidHeader { ref value, .. } if value == "abc"));

        let err = TracerReader::from_reader(Cursor::new("".as_bytes()), "h.tracers")
            .err()
            .unwrap();
        assert!(matches!(err, TracerError::MissingHeader { .. }));
    }

    #[test]
    fn test_coordinate_error_reports_line() {
        let mut r = reader("2\n0 0 0\n1 x 1\n");
        r.read_position().unwrap();
        match r.read_position() {
            Err(TracerError::Coordinates { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_batches_append_per_particle() {
        let mut particles = Vec::new();
        read_batch(reader("2\n0 0 0\n5 5 5\n"), &mut particles, None).unwrap();
        read_batch(reader("2\n1 0 0\n6 5 5\n"), &mut particles, Some(2)).unwrap();
        assert_eq!(particles.len(), 2);
        assert_eq!(particles[0].x(), &[0.0, 1.0]);
        assert_eq!(particles[1].x(), &[5.0, 6.0]);
    }

    #[test]
    fn test_batch_particle_count_mismatch() {
        let mut particles = Vec::new();
        read_batch(reader("2\n0 0 0\n5 5 5\n"), &mut particles, None).unwrap();
        let err = read_batch(reader("3\n0 0 0\n5 5 5\n1 1 1\n"), &mut particles, Some(2))
            .unwrap_err();
        assert!(matches!(
            err,
            TracerError::ParticleCountMismatch { expected: 2, found: 3, .. }
        ));
    }

    #[test]
    fn test_empty_first_batch_fixes_particle_count() {
        let mut particles = Vec::new();
        assert_eq!(read_batch(reader("0\n"), &mut particles, None).unwrap(), 0);
        assert!(particles.is_empty());
        let err = read_batch(reader("1\n0 0 0\n"), &mut particles, Some(0)).unwrap_err();
        assert!(matches!(
            err,
            TracerError::ParticleCountMismatch { expected: 0, found: 1, .. }
        ));
    }

    #[test]
    fn test_truncated_batch_is_rejected() {
        let mut particles = Vec::new();
        let err = read_batch(reader("3\n0 0 0\n1 1 1\n"), &mut particles, None).unwrap_err();
        assert!(matches!(
            err,
            TracerError::TruncatedBatch { declared: 3, found: 2, .. }
        ));
    }

    #[test]
    fn test_batch_path() {
        let path = batch_path(Path::new("data"), 3, 100);
        assert_eq!(path, Path::new("data").join("300.tracers"));
    }
}

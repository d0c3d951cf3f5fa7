#![allow(clippy::useless_conversion)]

use numpy::ndarray::Array2;
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use msd_analysis::tracers::{read_tracer_dir, TracerReader};
use msd_core::ensemble::{average_by_lag, compute_ensemble_msd};
use msd_core::{BoundaryCorrector, BoxConfig, MsdSample, MsdStream, Trajectory};

// ============================================================================
// Helpers: numpy <-> Trajectory
// ============================================================================

fn corrector_for(box_length: f64, wrap_guard: f64) -> PyResult<BoundaryCorrector> {
    let config = BoxConfig {
        box_length,
        wrap_guard,
    };
    config
        .validate()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(BoundaryCorrector::new(config))
}

fn array2_to_trajectory(arr: &numpy::ndarray::ArrayView2<f64>) -> PyResult<Trajectory> {
    if arr.shape()[1] != 3 {
        return Err(PyValueError::new_err(format!(
            "positions must have shape (n_steps, 3), got (n_steps, {})",
            arr.shape()[1]
        )));
    }
    let mut traj = Trajectory::with_capacity(arr.shape()[0]);
    for row in arr.rows() {
        traj.append_step(row[0], row[1], row[2]);
    }
    Ok(traj)
}

fn trajectory_to_array2(traj: &Trajectory) -> Array2<f64> {
    let mut result = Array2::<f64>::zeros((traj.len(), 3));
    for (i, [x, y, z]) in traj.positions().into_iter().enumerate() {
        result[[i, 0]] = x;
        result[[i, 1]] = y;
        result[[i, 2]] = z;
    }
    result
}

fn samples_to_arrays<'py>(
    py: Python<'py>,
    samples: &[MsdSample],
) -> (Bound<'py, PyArray1<i64>>, Bound<'py, PyArray1<f64>>) {
    let lags: Vec<i64> = samples.iter().map(|s| s.lag as i64).collect();
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    (
        PyArray1::from_vec_bound(py, lags),
        PyArray1::from_vec_bound(py, values),
    )
}

// ============================================================================
// UNWRAPPING
// ============================================================================

/// Unwrap a single coordinate axis against a periodic box.
///
/// Parameters
/// ----------
/// coordinates : ndarray (n_steps,)
///     Wrapped coordinate values in step order
/// box_length : float
///     Periodic box edge length
/// wrap_guard : float
///     A step counts as a wrap when it exceeds box_length - wrap_guard
///
/// Returns
/// -------
/// unwrapped : ndarray (n_steps,)
#[pyfunction]
#[pyo3(signature = (coordinates, box_length=20.0, wrap_guard=0.5))]
fn unwrap_coordinates<'py>(
    py: Python<'py>,
    coordinates: PyReadonlyArray1<'py, f64>,
    box_length: f64,
    wrap_guard: f64,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let corrector = corrector_for(box_length, wrap_guard)?;
    let mut values = coordinates.as_array().to_vec();
    corrector.correct(&mut values);
    Ok(PyArray1::from_vec_bound(py, values))
}

/// Unwrap a (n_steps, 3) particle trajectory; each axis is corrected independently.
#[pyfunction]
#[pyo3(signature = (positions, box_length=20.0, wrap_guard=0.5))]
fn unwrap_trajectory<'py>(
    py: Python<'py>,
    positions: PyReadonlyArray2<'py, f64>,
    box_length: f64,
    wrap_guard: f64,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let corrector = corrector_for(box_length, wrap_guard)?;
    let mut traj = array2_to_trajectory(&positions.as_array())?;
    corrector.correct_trajectory(&mut traj);
    Ok(trajectory_to_array2(&traj).to_pyarray_bound(py))
}

// ============================================================================
// MSD
// ============================================================================

/// Mean-squared displacement of one unwrapped (n_steps, 3) trajectory.
///
/// Returns
/// -------
/// (lags, msd) : (ndarray int64, ndarray float64)
///     One entry per lag 0..n_steps-1; an empty trajectory gives a single zero.
#[pyfunction]
fn compute_msd<'py>(
    py: Python<'py>,
    positions: PyReadonlyArray2<'py, f64>,
) -> PyResult<(Bound<'py, PyArray1<i64>>, Bound<'py, PyArray1<f64>>)> {
    let traj = array2_to_trajectory(&positions.as_array())?;
    let samples = py.allow_threads(|| traj.msd());
    Ok(samples_to_arrays(py, &samples))
}

/// MSD for many unwrapped trajectories, evaluated in parallel.
///
/// Returns
/// -------
/// (per_particle, average) : (list of ndarray, ndarray)
///     Per-particle MSD arrays in input order and the mean over the
///     particles present at each lag.
#[pyfunction]
#[pyo3(name = "compute_ensemble_msd")]
fn compute_ensemble_msd_py<'py>(
    py: Python<'py>,
    trajectories: Vec<PyReadonlyArray2<'py, f64>>,
) -> PyResult<(Vec<Bound<'py, PyArray1<f64>>>, Bound<'py, PyArray1<f64>>)> {
    let particles = trajectories
        .iter()
        .map(|arr| array2_to_trajectory(&arr.as_array()))
        .collect::<PyResult<Vec<_>>>()?;

    let (per_particle, average) = py.allow_threads(|| {
        let per_particle = compute_ensemble_msd(&particles);
        let average = average_by_lag(&per_particle);
        (per_particle, average)
    });

    let columns: Vec<Bound<'py, PyArray1<f64>>> = per_particle
        .iter()
        .map(|samples| samples_to_arrays(py, samples).1)
        .collect();
    Ok((columns, samples_to_arrays(py, &average).1))
}

/// Lazy MSD iterator evaluated on a background thread.
#[pyclass(name = "MsdStream")]
struct PyMsdStream {
    inner: MsdStream,
}

#[pymethods]
impl PyMsdStream {
    #[new]
    fn new(positions: PyReadonlyArray2<f64>) -> PyResult<Self> {
        let traj = array2_to_trajectory(&positions.as_array())?;
        Ok(PyMsdStream {
            inner: MsdStream::spawn(traj),
        })
    }

    fn __iter__(slf: PyRef<Self>) -> PyRef<Self> {
        slf
    }

    fn __next__(&mut self, py: Python<'_>) -> Option<(usize, f64)> {
        let inner = &mut self.inner;
        py.allow_threads(|| inner.next())
            .map(|sample| (sample.lag, sample.value))
    }

    fn __len__(&self) -> usize {
        self.inner.size_hint().0
    }
}

// ============================================================================
// TRACER FILES
// ============================================================================

/// Read every numbered batch in `path` into one (n_steps, 3) array per particle.
#[pyfunction]
#[pyo3(signature = (path, batch_size=100))]
fn read_tracers<'py>(
    py: Python<'py>,
    path: &str,
    batch_size: usize,
) -> PyResult<Vec<Bound<'py, PyArray2<f64>>>> {
    let set = read_tracer_dir(path, batch_size).map_err(|e| PyIOError::new_err(e.to_string()))?;
    Ok(set
        .particles
        .iter()
        .map(|traj| trajectory_to_array2(traj).to_pyarray_bound(py))
        .collect())
}

#[pyclass(name = "TracerReader")]
struct PyTracerReader {
    reader: TracerReader,
}

#[pymethods]
impl PyTracerReader {
    #[new]
    fn new(path: &str) -> PyResult<Self> {
        let reader = TracerReader::open(path).map_err(|e| PyIOError::new_err(e.to_string()))?;
        Ok(PyTracerReader { reader })
    }

    #[getter]
    fn n_particles(&self) -> usize {
        self.reader.n_particles()
    }

    #[getter]
    fn particles_read(&self) -> usize {
        self.reader.particles_read()
    }

    fn read_position(&mut self) -> PyResult<Option<(f64, f64, f64)>> {
        match self.reader.read_position() {
            Ok(Some([x, y, z])) => Ok(Some((x, y, z))),
            Ok(None) => Ok(None),
            Err(e) => Err(PyIOError::new_err(e.to_string())),
        }
    }

    fn __iter__(slf: PyRef<Self>) -> PyRef<Self> {
        slf
    }

    fn __next__(&mut self) -> PyResult<Option<(f64, f64, f64)>> {
        self.read_position()
    }
}

// ============================================================================
// MODULE
// ============================================================================

/// Periodic boundary unwrapping and mean-squared displacement for particle trajectories.
#[pymodule]
fn msd_tools(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Wrapping
    m.add_function(wrap_pyfunction!(unwrap_coordinates, m)?)?;
    m.add_function(wrap_pyfunction!(unwrap_trajectory, m)?)?;

    // MSD
    m.add_function(wrap_pyfunction!(compute_msd, m)?)?;
    m.add_function(wrap_pyfunction!(compute_ensemble_msd_py, m)?)?;
    m.add_class::<PyMsdStream>()?;

    // Tracer files
    m.add_function(wrap_pyfunction!(read_tracers, m)?)?;
    m.add_class::<PyTracerReader>()?;

    Ok(())
}

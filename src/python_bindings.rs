use pyo3::prelude::*;
use pyo3::types::{PyList, PyTuple};

use crate::hbonds::{process_hbonds, validate_protein_chain, WernetNilsson};
use crate::trajectory::{PdbTrajectory, Trajectory};

/// Python binding returning the inter-chain hydrogen bonds of every frame
#[pyfunction]
#[pyo3(signature = (trajectory_file, protein_chain=0, max_frames=None, remove_solvent=true))]
fn compute_hbonds(
    py: Python<'_>,
    trajectory_file: &str,
    protein_chain: usize,
    max_frames: Option<usize>,
    remove_solvent: bool,
) -> PyResult<PyObject> {
    let trajectory = PdbTrajectory::new(trajectory_file);

    let data = trajectory.load(max_frames, remove_solvent).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyIOError, _>(format!("Failed to read trajectory: {}", e))
    })?;

    validate_protein_chain(&data.topology, protein_chain)
        .map_err(PyErr::new::<pyo3::exceptions::PyIndexError, _>)?;

    let hbond_traj = WernetNilsson::default().compute(&data).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
            "Failed to compute hydrogen bonds: {}",
            e
        ))
    })?;

    let filtered = process_hbonds(&hbond_traj, &data.topology, protein_chain).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyIndexError, _>(format!(
            "Failed to filter hydrogen bonds: {}",
            e
        ))
    })?;

    // Convert to Python list (frames) of lists of (donor, hydrogen, acceptor) tuples
    let py_frames = PyList::empty_bound(py);
    for hbonds in filtered {
        let py_hbonds = PyList::empty_bound(py);
        for hbond in hbonds {
            let py_tuple = PyTuple::new_bound(
                py,
                &[
                    hbond.donor.into_py(py),
                    hbond.hydrogen.into_py(py),
                    hbond.acceptor.into_py(py),
                ],
            );
            py_hbonds.append(py_tuple)?;
        }
        py_frames.append(py_hbonds)?;
    }

    Ok(py_frames.into())
}

/// Python binding returning `(chain index, [residue, ...])` for every chain
#[pyfunction]
#[pyo3(signature = (trajectory_file, remove_solvent=true))]
fn list_chains(py: Python<'_>, trajectory_file: &str, remove_solvent: bool) -> PyResult<PyObject> {
    let trajectory = PdbTrajectory::new(trajectory_file);

    let data = trajectory.load(Some(1), remove_solvent).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyIOError, _>(format!("Failed to read trajectory: {}", e))
    })?;

    let py_chains = PyList::empty_bound(py);
    for chain in &data.topology.chains {
        let residues: Vec<String> = chain
            .residues
            .iter()
            .map(|&r| data.topology.residues[r].to_string())
            .collect();
        let py_tuple = PyTuple::new_bound(py, &[chain.index.into_py(py), residues.into_py(py)]);
        py_chains.append(py_tuple)?;
    }

    Ok(py_chains.into())
}

/// Python module definition
#[pymodule]
fn hbond_analysis_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compute_hbonds, m)?)?;
    m.add_function(wrap_pyfunction!(list_chains, m)?)?;
    m.add("__doc__", "Inter-chain hydrogen bond analysis Rust library with Python bindings")?;
    Ok(())
}

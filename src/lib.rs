//! Topographic calculations on gridded DEMs: horizon angles, sky view factor,
//! terrain configuration factor, slope and aspect, and illumination angle.
//!
//! The horizon search follows Dozier, Bruno and Downey (1981) and runs in
//! linear time per scan line; oblique directions are reduced to row scans by
//! skewing the grid.

pub mod error;
pub mod gradient;
pub mod grid;
pub mod hor1d;
pub mod horizon;
pub mod shade;
pub mod skew;
pub mod viewf;

pub use error::{Result, TopoError};
pub use gradient::{AspectUnit, Gradient, GradientMethod, GradientProvider};
pub use hor1d::{ScanDirection, ScanKernel};
pub use horizon::{horizon, Horizon, HorizonCase};
pub use shade::{shade, Illumination};
pub use skew::{adjust_spacing, skew, SkewDirection};
pub use viewf::{viewcalc, viewf, SvfMethod, ViewFactors, ViewfParams};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn topocalc(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    // Flat access for the common entry points
    py_module.add_function(wrap_pyfunction!(horizon::py::horizon_py, py_module)?)?;
    py_module.add_function(wrap_pyfunction!(viewf::py::viewf_py, py_module)?)?;

    // Register submodules
    register_horizon_module(py_module)?;
    register_skew_module(py_module)?;
    register_viewf_module(py_module)?;
    register_gradient_module(py_module)?;
    register_shade_module(py_module)?;

    py_module.add("__doc__", "Topographic horizon and view factor calculations in Rust.")?;

    Ok(())
}

#[cfg(feature = "python")]
fn register_horizon_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "horizon")?;
    submodule.add("__doc__", "Horizon angles along scan lines and over DEMs.")?;
    submodule.add_function(wrap_pyfunction!(hor1d::py::hor1d_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(hor1d::py::hor2d_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(horizon::py::horizon_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_skew_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "skew")?;
    submodule.add("__doc__", "Row shear of rasters for oblique scans.")?;
    submodule.add_function(wrap_pyfunction!(skew::py::skew_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(skew::py::adjust_spacing_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_viewf_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "viewf")?;
    submodule.add("__doc__", "Sky view factor and terrain configuration factor.")?;
    submodule.add_function(wrap_pyfunction!(viewf::py::viewf_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_gradient_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "gradient")?;
    submodule.add("__doc__", "Slope and aspect by finite differences.")?;
    submodule.add_function(wrap_pyfunction!(gradient::py::gradient_d4_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(gradient::py::gradient_d8_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_shade_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "shade")?;
    submodule.add("__doc__", "Illumination angle on tilted terrain.")?;
    submodule.add_function(wrap_pyfunction!(shade::py::shade_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

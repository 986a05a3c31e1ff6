//! Slope and aspect of a DEM by finite differences.
//!
//! Given a center cell `e` and its neighbours:
//!
//! ```text
//! | a | b | c |
//! | d | e | f |
//! | g | h | i |
//! ```
//!
//! the D4 stencil uses `dz/dx = (f - d) / 2dx` and `dz/dy = (h - b) / 2dy`;
//! the D8 stencil weights the full 3×3 window,
//! `dz/dx = ((c + 2f + i) - (a + 2d + g)) / 8dx` and
//! `dz/dy = ((g + 2h + i) - (a + 2b + c)) / 8dy`.
//! Slope is `atan(hypot(dz/dx, dz/dy))` in radians.

use std::f64::consts::PI;

use ndarray::{s, Array2, ArrayView2, Zip};

use crate::error::{Result, TopoError};
use crate::grid::check_spacing;

/// Unit for aspect output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectUnit {
    /// Degrees clockwise from North, `[0, 360)`.
    #[default]
    Degrees,
    /// Radians from South, `[-π, π]`, positive toward East.
    IpwRadians,
}

/// Slope in radians and aspect in the requested unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub slope: Array2<f64>,
    pub aspect: Array2<f64>,
}

/// Source of slope and aspect for the view factor integrator.
///
/// Implementations return slope in radians and aspect in radians from South.
pub trait GradientProvider: Sync {
    fn gradient(&self, dem: ArrayView2<f64>, dx: f64, dy: f64) -> Result<Gradient>;
}

/// Finite-difference stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientMethod {
    /// Central differences along each axis.
    D4,
    /// 3×3 weighted window.
    #[default]
    D8,
}

impl GradientMethod {
    fn derivatives(self, w: ArrayView2<f64>, dx: f64, dy: f64) -> (f64, f64) {
        match self {
            GradientMethod::D4 => {
                let dz_dx = (w[[1, 2]] - w[[1, 0]]) / (2.0 * dx);
                let dz_dy = (w[[2, 1]] - w[[0, 1]]) / (2.0 * dy);
                (dz_dx, dz_dy)
            }
            GradientMethod::D8 => {
                let dz_dx = ((w[[0, 2]] + 2.0 * w[[1, 2]] + w[[2, 2]])
                    - (w[[0, 0]] + 2.0 * w[[1, 0]] + w[[2, 0]]))
                    / (8.0 * dx);
                let dz_dy = ((w[[2, 0]] + 2.0 * w[[2, 1]] + w[[2, 2]])
                    - (w[[0, 0]] + 2.0 * w[[0, 1]] + w[[0, 2]]))
                    / (8.0 * dy);
                (dz_dx, dz_dy)
            }
        }
    }

    /// Slope and aspect of `dem` with cell sizes `dx` and `dy`.
    pub fn compute(
        self,
        dem: ArrayView2<f64>,
        dx: f64,
        dy: f64,
        unit: AspectUnit,
    ) -> Result<Gradient> {
        check_spacing(dx, "gradient dx")?;
        check_spacing(dy, "gradient dy")?;
        let (nrows, ncols) = dem.dim();
        if nrows == 0 || ncols == 0 {
            return Err(TopoError::shape(
                "gradient dem",
                "a non-empty grid",
                format!("shape {:?}", dem.dim()),
            ));
        }

        let padded = pad_extrapolated(dem);
        let mut slope = Array2::<f64>::zeros((nrows, ncols));
        let mut aspect = Array2::<f64>::zeros((nrows, ncols));

        Zip::from(&mut slope)
            .and(&mut aspect)
            .and(padded.windows((3, 3)))
            .par_for_each(|s, a, w| {
                let (dz_dx, dz_dy) = self.derivatives(w, dx, dy);
                *s = dz_dx.hypot(dz_dy).atan();
                let deg = aspect_degrees(dz_dx, dz_dy);
                *a = match unit {
                    AspectUnit::Degrees => deg,
                    AspectUnit::IpwRadians => aspect_to_ipw_radians(deg),
                };
            });

        Ok(Gradient { slope, aspect })
    }
}

impl GradientProvider for GradientMethod {
    fn gradient(&self, dem: ArrayView2<f64>, dx: f64, dy: f64) -> Result<Gradient> {
        self.compute(dem, dx, dy, AspectUnit::IpwRadians)
    }
}

/// Pad one cell on every side, continuing the slope of the two outermost
/// rows and columns.
fn pad_extrapolated(dem: ArrayView2<f64>) -> Array2<f64> {
    let (nrows, ncols) = dem.dim();
    let mut pad = Array2::<f64>::zeros((nrows + 2, ncols + 2));
    pad.slice_mut(s![1..=nrows, 1..=ncols]).assign(&dem);

    // Edge replication first so the corners hold a value.
    for r in 0..nrows + 2 {
        let src = r.clamp(1, nrows);
        pad[[r, 0]] = pad[[src, 1]];
        pad[[r, ncols + 1]] = pad[[src, ncols]];
    }
    for c in 1..=ncols {
        pad[[0, c]] = pad[[1, c]];
        pad[[nrows + 1, c]] = pad[[nrows, c]];
    }

    let (last_r, last_c) = (nrows + 1, ncols + 1);
    for c in 0..=last_c {
        pad[[0, c]] = 2.0 * pad[[1, c]] - pad[[2, c]];
        pad[[last_r, c]] = 2.0 * pad[[last_r - 1, c]] - pad[[last_r - 2, c]];
    }
    for r in 0..=last_r {
        pad[[r, 0]] = 2.0 * pad[[r, 1]] - pad[[r, 2]];
        pad[[r, last_c]] = 2.0 * pad[[r, last_c - 1]] - pad[[r, last_c - 2]];
    }
    pad
}

/// Aspect in degrees clockwise from North from the finite differences.
///
/// A flat cell faces South (180).
pub fn aspect_degrees(dz_dx: f64, dz_dy: f64) -> f64 {
    if dz_dx == 0.0 && dz_dy == 0.0 {
        return 180.0;
    }
    let a = 180.0 * dz_dy.atan2(-dz_dx) / PI;
    if a > 90.0 {
        450.0 - a
    } else {
        90.0 - a
    }
}

/// Convert aspect in degrees from North to radians from South, positive
/// toward East.
pub fn aspect_to_ipw_radians(aspect_deg: f64) -> f64 {
    PI - aspect_deg * PI / 180.0
}

/// D4 slope and aspect.
pub fn gradient_d4(dem: ArrayView2<f64>, dx: f64, dy: f64, unit: AspectUnit) -> Result<Gradient> {
    GradientMethod::D4.compute(dem, dx, dy, unit)
}

/// D8 slope and aspect.
pub fn gradient_d8(dem: ArrayView2<f64>, dx: f64, dy: f64, unit: AspectUnit) -> Result<Gradient> {
    GradientMethod::D8.compute(dem, dx, dy, unit)
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod py {
    use numpy::{IntoPyArray, PyArray2};
    use pyo3::prelude::*;

    use super::{AspectUnit, GradientMethod};
    use crate::grid::py::extract_f64_grid;

    type GradientPair<'py> = (Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<f64>>);

    fn run<'py>(
        py: Python<'py>,
        method: GradientMethod,
        dem: &Bound<'py, PyAny>,
        dx: f64,
        dy: f64,
        aspect_rad: bool,
    ) -> PyResult<GradientPair<'py>> {
        let dem = extract_f64_grid(dem, "gradient dem")?;
        let dem = dem.as_array().to_owned();
        let unit = if aspect_rad {
            AspectUnit::IpwRadians
        } else {
            AspectUnit::Degrees
        };
        let g = py.allow_threads(|| method.compute(dem.view(), dx, dy, unit))?;
        Ok((g.slope.into_pyarray(py), g.aspect.into_pyarray(py)))
    }

    /// Slope (radians) and aspect from central differences.
    #[pyfunction]
    #[pyo3(name = "gradient_d4", signature = (dem, dx, dy, aspect_rad=false))]
    pub fn gradient_d4_py<'py>(
        py: Python<'py>,
        dem: &Bound<'py, PyAny>,
        dx: f64,
        dy: f64,
        aspect_rad: bool,
    ) -> PyResult<GradientPair<'py>> {
        run(py, GradientMethod::D4, dem, dx, dy, aspect_rad)
    }

    /// Slope (radians) and aspect from the 3×3 weighted window.
    #[pyfunction]
    #[pyo3(name = "gradient_d8", signature = (dem, dx, dy, aspect_rad=false))]
    pub fn gradient_d8_py<'py>(
        py: Python<'py>,
        dem: &Bound<'py, PyAny>,
        dx: f64,
        dy: f64,
        aspect_rad: bool,
    ) -> PyResult<GradientPair<'py>> {
        run(py, GradientMethod::D8, dem, dx, dy, aspect_rad)
    }
}

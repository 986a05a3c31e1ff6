//! Row shear ("skew") of a raster so that an oblique scan direction becomes
//! a column of the sheared grid.
//!
//! A skew of 30 degrees shifts the origin of successive lines:
//!
//! ```text
//!     +-----------+       +---------------+
//!     |           |       |000/          /|
//!     |   input   |       |00/  output  /0|
//!     |   image   |       |0/   image  /00|
//!     |           |       |/          /000|
//!     +-----------+       +---------------+
//! ```
//!
//! Shifts are whole pixels, so unskewing with the same angle restores the
//! input exactly.

use std::f64::consts::PI;

use ndarray::{s, Array2, ArrayView2, Zip};
use ndarray_stats::QuantileExt;

use crate::error::{Result, TopoError};
use crate::grid::check_spacing;

/// Whether to add a skew to a grid or remove one added earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkewDirection {
    /// Shear the rows; the output grows by the maximum shift.
    Forward,
    /// Undo a forward shear; the output shrinks by the maximum shift.
    Backward,
}

impl SkewDirection {
    pub fn from_forward(forward: bool) -> Self {
        if forward {
            Self::Forward
        } else {
            Self::Backward
        }
    }
}

/// Grid spacing along a scan line skewed by `skew_angle` degrees.
///
/// Only angles in `[0, 45]` are accepted.
pub fn adjust_spacing(spacing: f64, skew_angle: f64) -> Result<f64> {
    if !(0.0..=45.0).contains(&skew_angle) {
        return Err(TopoError::range(
            "skew angle",
            skew_angle,
            "must be between 0 and 45 degrees",
        ));
    }
    Ok(spacing / (skew_angle * 1.0_f64.atan() / 45.0).cos())
}

/// Skew or unskew `arr` by `angle` degrees with square cells.
pub fn skew(arr: ArrayView2<f64>, angle: f64, direction: SkewDirection) -> Result<Array2<f64>> {
    skew_with_spacing(arr, angle, direction, 1.0, 1.0)
}

/// Skew or unskew `arr` by `angle` degrees, with sample spacing `dx` and line
/// spacing `dy`.
///
/// Unequal spacing is equivalent to changing the skew angle. Cells uncovered
/// by a forward skew take the minimum of `arr` (NaN ignored) so the padding
/// never rises above the terrain and cannot form a horizon.
pub fn skew_with_spacing(
    arr: ArrayView2<f64>,
    angle: f64,
    direction: SkewDirection,
    dx: f64,
    dy: f64,
) -> Result<Array2<f64>> {
    if !(-45.0..=45.0).contains(&angle) {
        return Err(TopoError::range(
            "skew angle",
            angle,
            "must be between -45 and 45 degrees",
        ));
    }
    check_spacing(dx, "skew dx")?;
    check_spacing(dy, "skew dy")?;

    if angle == 0.0 {
        return Ok(arr.to_owned());
    }

    let (nlines, nsamps) = arr.dim();
    if nlines == 0 {
        return Ok(arr.to_owned());
    }

    let negative = angle < 0.0;
    let slope = (angle.abs() * PI / 180.0).tan() * (dy / dx);
    let shift = |o: usize| (o as f64 * slope + 0.5) as usize;
    let max_skew = shift(nlines - 1);

    // Positive angles shift less with increasing line index, so the offset
    // is counted from the last line.
    let offset = |line: usize| {
        if negative {
            shift(line)
        } else {
            shift(nlines - 1 - line)
        }
    };

    match direction {
        SkewDirection::Forward => {
            let fill = *arr.min_skipnan();
            let mut out = Array2::from_elem((nlines, nsamps + max_skew), fill);
            Zip::indexed(out.rows_mut())
                .and(arr.rows())
                .par_for_each(|line, mut out_row, row| {
                    let off = offset(line);
                    out_row.slice_mut(s![off..off + nsamps]).assign(&row);
                });
            Ok(out)
        }
        SkewDirection::Backward => {
            if max_skew > nsamps {
                return Err(TopoError::shape(
                    "unskew input",
                    format!("at least {max_skew} samples per line"),
                    format!("{nsamps} samples"),
                ));
            }
            let o_nsamps = nsamps - max_skew;
            let mut out = Array2::<f64>::zeros((nlines, o_nsamps));
            Zip::indexed(out.rows_mut())
                .and(arr.rows())
                .par_for_each(|line, mut out_row, row| {
                    let off = offset(line);
                    out_row.assign(&row.slice(s![off..off + o_nsamps]));
                });
            Ok(out)
        }
    }
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod py {
    use numpy::{IntoPyArray, PyArray2};
    use pyo3::prelude::*;

    use super::SkewDirection;
    use crate::grid::py::extract_f64_grid;

    /// Skew (or unskew with `fwd=False`) an array by `angle` degrees.
    #[pyfunction]
    #[pyo3(name = "skew", signature = (arr, angle, dx=None, dy=None, fwd=true))]
    pub fn skew_py<'py>(
        py: Python<'py>,
        arr: &Bound<'py, PyAny>,
        angle: f64,
        dx: Option<f64>,
        dy: Option<f64>,
        fwd: bool,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let arr = extract_f64_grid(arr, "skew input")?;
        let arr = arr.as_array().to_owned();
        // Spacing only matters when both are given.
        let (dx, dy) = match (dx, dy) {
            (Some(dx), Some(dy)) => (dx, dy),
            _ => (1.0, 1.0),
        };
        let out = py.allow_threads(|| {
            super::skew_with_spacing(arr.view(), angle, SkewDirection::from_forward(fwd), dx, dy)
        })?;
        Ok(out.into_pyarray(py))
    }

    /// Grid spacing adjusted for a skew angle in degrees.
    #[pyfunction]
    #[pyo3(name = "adjust_spacing")]
    pub fn adjust_spacing_py(spacing: f64, skew_angle: f64) -> PyResult<f64> {
        Ok(super::adjust_spacing(spacing, skew_angle)?)
    }
}

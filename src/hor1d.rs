//! One-dimensional horizon search along rows of an elevation grid.
//!
//! Follows Dozier (1981) and Dozier & Frew (1990): each point's horizon is
//! found by walking the horizon pointers of points already resolved in the
//! look direction, which keeps the scan amortized linear in the row length.

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use rayon::prelude::*;

use crate::error::Result;
use crate::grid::check_spacing;

/// Direction a row is scanned for obstructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Look toward increasing column index.
    Forward,
    /// Look toward decreasing column index.
    Backward,
}

impl ScanDirection {
    pub fn from_forward(forward: bool) -> Self {
        if forward {
            Self::Forward
        } else {
            Self::Backward
        }
    }
}

/// Strategy used to apply the row scan over a whole grid.
///
/// Both kernels honour the same per-row contract and produce identical
/// output, so either can validate the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanKernel {
    /// Serial row loop reusing one set of line buffers.
    Reference,
    /// Rows scanned concurrently with rayon.
    #[default]
    Parallel,
}

/// Resolve horizon indices for `z` into `h`, looking in `direction`.
///
/// `h[i]` is the index of the point in the look direction that subtends the
/// steepest elevation angle from `i`, or `i` itself when no point that way
/// is strictly higher. Ties keep the nearer point.
fn scan_into(z: &[f64], direction: ScanDirection, h: &mut [usize]) {
    debug_assert_eq!(z.len(), h.len());
    let n = z.len();
    if n == 0 {
        return;
    }

    // Position p counts steps away from the start, so the look direction is
    // always toward increasing p.
    let index = |p: usize| match direction {
        ScanDirection::Forward => p,
        ScanDirection::Backward => n - 1 - p,
    };
    let slope = |i: usize, j: usize| (z[j] - z[i]) / i.abs_diff(j) as f64;

    let terminal = index(n - 1);
    h[terminal] = terminal;

    for p in (0..n - 1).rev() {
        let i = index(p);
        let mut j = index(p + 1);
        let mut k = h[j];
        let mut s_ij = slope(i, j);
        let mut s_ik = slope(i, k);

        // The steepest point lies on the pointer chain from the neighbour;
        // follow it while the angle keeps rising.
        while s_ij < s_ik {
            j = k;
            k = h[j];
            s_ij = s_ik;
            s_ik = slope(i, k);
        }

        h[i] = if s_ij > 0.0 { j } else { i };
    }
}

/// Horizon indices looking forward (toward increasing index).
pub fn hor1f(z: &[f64]) -> Vec<usize> {
    let mut h = vec![0; z.len()];
    scan_into(z, ScanDirection::Forward, &mut h);
    h
}

/// Horizon indices looking backward (toward decreasing index).
pub fn hor1b(z: &[f64]) -> Vec<usize> {
    let mut h = vec![0; z.len()];
    scan_into(z, ScanDirection::Backward, &mut h);
    h
}

/// Cosines of the horizon angles, measured from zenith, for resolved
/// horizon indices `h`.
///
/// With G the horizon angle from horizontal, `sin G = dz / hypot(dz, dist)`,
/// which equals `cos H` for H measured from zenith. A point that is its own
/// horizon gets 0. The sign is preserved; it is never negative for indices
/// produced by [`hor1f`] or [`hor1b`].
pub fn horval(z: &[f64], spacing: f64, h: &[usize]) -> Vec<f64> {
    let mut hcos = vec![0.0; z.len()];
    horval_into(z, spacing, h, &mut hcos);
    hcos
}

fn horval_into<'a>(
    z: &[f64],
    spacing: f64,
    h: &[usize],
    hcos: impl IntoIterator<Item = &'a mut f64>,
) {
    for ((i, &j), out) in h.iter().enumerate().zip(hcos) {
        *out = if j == i {
            0.0
        } else {
            let diff = z[j] - z[i];
            let dist = i.abs_diff(j) as f64 * spacing;
            diff / diff.hypot(dist)
        };
    }
}

/// Horizon cosines for a single profile.
pub fn hor1d(z: &[f64], spacing: f64, direction: ScanDirection) -> Result<Vec<f64>> {
    check_spacing(spacing, "hor1d spacing")?;
    let mut h = vec![0; z.len()];
    scan_into(z, direction, &mut h);
    Ok(horval(z, spacing, &h))
}

/// Line buffers reused across the rows one worker scans.
struct RowScratch {
    zbuf: Vec<f64>,
    hbuf: Vec<usize>,
}

impl RowScratch {
    fn new(ncols: usize) -> Self {
        Self {
            zbuf: Vec::with_capacity(ncols),
            hbuf: vec![0; ncols],
        }
    }

    fn scan_row(
        &mut self,
        row: ArrayView1<f64>,
        spacing: f64,
        direction: ScanDirection,
        mut out: ArrayViewMut1<f64>,
    ) {
        let z: &[f64] = match row.as_slice() {
            Some(slice) => slice,
            None => {
                self.zbuf.clear();
                self.zbuf.extend(row.iter().copied());
                &self.zbuf
            }
        };
        scan_into(z, direction, &mut self.hbuf);
        horval_into(z, spacing, &self.hbuf, out.iter_mut());
    }
}

impl ScanKernel {
    /// Horizon cosines along every row of `z`.
    ///
    /// Rows carry no dependency on each other.
    pub fn hor2d(self, z: ArrayView2<f64>, spacing: f64, direction: ScanDirection) -> Array2<f64> {
        let (nrows, ncols) = z.dim();
        let mut hcos = Array2::<f64>::zeros((nrows, ncols));

        match self {
            ScanKernel::Reference => {
                let mut scratch = RowScratch::new(ncols);
                for (row, out) in z.rows().into_iter().zip(hcos.rows_mut()) {
                    scratch.scan_row(row, spacing, direction, out);
                }
            }
            ScanKernel::Parallel => {
                hcos.axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .zip(z.axis_iter(Axis(0)))
                    .for_each_init(
                        || RowScratch::new(ncols),
                        |scratch, (out, row)| scratch.scan_row(row, spacing, direction, out),
                    );
            }
        }

        hcos
    }
}

/// Horizon cosines along the rows of a 2D elevation grid.
pub fn hor2d(
    z: ArrayView2<f64>,
    spacing: f64,
    direction: ScanDirection,
    kernel: ScanKernel,
) -> Result<Array2<f64>> {
    check_spacing(spacing, "hor2d spacing")?;
    Ok(kernel.hor2d(z, spacing, direction))
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod py {
    use numpy::{IntoPyArray, PyArray1, PyArray2};
    use pyo3::prelude::*;

    use super::{ScanDirection, ScanKernel};
    use crate::grid::py::{extract_f64_grid, extract_f64_line};

    /// Cosines of horizon angles along a single 1D elevation profile.
    #[pyfunction]
    #[pyo3(name = "hor1d", signature = (z, spacing, fwd=true))]
    pub fn hor1d_py<'py>(
        py: Python<'py>,
        z: &Bound<'py, PyAny>,
        spacing: f64,
        fwd: bool,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let z = extract_f64_line(z, "hor1d input of z")?;
        let z = z.as_array().to_vec();
        let hcos = py.allow_threads(|| super::hor1d(&z, spacing, ScanDirection::from_forward(fwd)))?;
        Ok(hcos.into_pyarray(py))
    }

    /// Cosines of horizon angles along every row of a 2D elevation grid.
    #[pyfunction]
    #[pyo3(name = "hor2d", signature = (z, spacing, fwd=true))]
    pub fn hor2d_py<'py>(
        py: Python<'py>,
        z: &Bound<'py, PyAny>,
        spacing: f64,
        fwd: bool,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let z = extract_f64_grid(z, "hor2d input of z")?;
        let z = z.as_array().to_owned();
        let hcos = py.allow_threads(|| {
            super::hor2d(
                z.view(),
                spacing,
                ScanDirection::from_forward(fwd),
                ScanKernel::Parallel,
            )
        })?;
        Ok(hcos.into_pyarray(py))
    }
}

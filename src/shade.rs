//! Cosine of the local solar illumination angle on tilted terrain.

use ndarray::{Array2, ArrayView2, Zip};

use crate::error::{Result, TopoError};
use crate::grid::check_shape;

/// Sun elevation, as a zenith cosine or a zenith angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Illumination {
    CosZenith(f64),
    Zenith(f64),
}

impl Illumination {
    /// Pick the sun elevation from optional inputs; `cosz` wins when both
    /// are given.
    pub fn from_options(cosz: Option<f64>, zenith: Option<f64>) -> Result<Self> {
        match (cosz, zenith) {
            (Some(c), _) => Ok(Self::CosZenith(c)),
            (None, Some(z)) => Ok(Self::Zenith(z)),
            (None, None) => Err(TopoError::invalid_option(
                "illumination",
                "cosz or zenith",
                "neither",
            )),
        }
    }

    /// `(cos θ, sin θ)` of the solar zenith angle.
    fn zenith_cos_sin(self) -> Result<(f64, f64)> {
        match self {
            Illumination::CosZenith(c) => {
                if !(c > 0.0 && c <= 1.0) {
                    return Err(TopoError::range("cosz", c, "cosz must be > 0 and <= 1"));
                }
                Ok((c, ((1.0 - c) * (1.0 + c)).sqrt()))
            }
            Illumination::Zenith(deg) => {
                if !(0.0..90.0).contains(&deg) {
                    return Err(TopoError::range(
                        "zenith",
                        deg,
                        "must be >= 0 and < 90 degrees",
                    ));
                }
                let z = deg.to_radians();
                Ok((z.cos(), z.sin()))
            }
        }
    }
}

/// Illumination cosine `mu` for every cell, clamped to `[0, 1]`.
///
/// `aspect` is in radians from South (positive toward East) and `azimuth` is
/// the sun azimuth in degrees in the same convention.
pub fn shade(
    sin_slope: ArrayView2<f64>,
    aspect: ArrayView2<f64>,
    azimuth: f64,
    sun: Illumination,
) -> Result<Array2<f64>> {
    check_shape(aspect, sin_slope.dim(), "shade aspect")?;
    if !(-180.0..=180.0).contains(&azimuth) {
        return Err(TopoError::range(
            "azimuth",
            azimuth,
            "must be between -180 and 180 degrees",
        ));
    }
    if let Some(&bad) = aspect.iter().find(|&&a| a.abs() > std::f64::consts::PI) {
        return Err(TopoError::range(
            "aspect",
            bad,
            "must be in radians from South, within [-pi, pi]",
        ));
    }
    let (cos_z, sin_z) = sun.zenith_cos_sin()?;
    let azimuth = azimuth.to_radians();

    let mut mu = Array2::<f64>::zeros(sin_slope.dim());
    Zip::from(&mut mu)
        .and(sin_slope)
        .and(aspect)
        .par_for_each(|mu, &sin_s, &asp| {
            let cos_s = ((1.0 - sin_s) * (1.0 + sin_s)).sqrt();
            let m = cos_z * cos_s + sin_z * sin_s * (azimuth - asp).cos();
            *mu = m.clamp(0.0, 1.0);
        });
    Ok(mu)
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod py {
    use numpy::{IntoPyArray, PyArray2};
    use pyo3::prelude::*;

    use super::Illumination;
    use crate::grid::py::extract_f64_grid;

    /// Cosine of the illumination angle from `cosz`, or from `zenith` in
    /// degrees when `cosz` is not given.
    #[pyfunction]
    #[pyo3(name = "shade", signature = (sin_slope, aspect, azimuth, cosz=None, zenith=None))]
    pub fn shade_py<'py>(
        py: Python<'py>,
        sin_slope: &Bound<'py, PyAny>,
        aspect: &Bound<'py, PyAny>,
        azimuth: f64,
        cosz: Option<f64>,
        zenith: Option<f64>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let sun = Illumination::from_options(cosz, zenith)?;
        let sin_slope = extract_f64_grid(sin_slope, "shade sin_slope")?;
        let sin_slope = sin_slope.as_array().to_owned();
        let aspect = extract_f64_grid(aspect, "shade aspect")?;
        let aspect = aspect.as_array().to_owned();
        let mu = py.allow_threads(|| super::shade(sin_slope.view(), aspect.view(), azimuth, sun))?;
        Ok(mu.into_pyarray(py))
    }
}

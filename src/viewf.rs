//! Sky view factor (SVF) and terrain configuration factor (TCF).
//!
//! For each of `nangles` azimuths the horizon cosines are turned into the
//! visible part of the sky hemisphere above a tilted cell and summed:
//!
//! ```text
//! svf = 1/N Σ_k [ cos S sin²H_k + sin S cos(A - φ_k) (H_k - sin H_k cos H_k) ]
//! tcf = (1 + cos S) / 2 - svf
//! ```
//!
//! where `S` is the slope, `A` the aspect (radians from South), `φ_k` the
//! azimuth and `H_k` the horizon zenith angle. Only positive terms count.
//!
//! Sources: Dozier and Marks (1987), Dozier (2022).

use std::f64::consts::PI;

use ndarray::{Array2, ArrayView2, Zip};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::{Result, TopoError};
use crate::gradient::{GradientMethod, GradientProvider};
use crate::grid::{check_shape, check_spacing};
use crate::hor1d::ScanKernel;
use crate::horizon::Horizon;

/// Smallest number of azimuths accepted by [`viewf`].
pub const MIN_ANGLES: usize = 16;

/// Horizon treatment in the integrand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvfMethod {
    /// Horizon angles used as scanned.
    #[default]
    Dozier1990,
    /// On azimuths facing away from the slope, the horizon is raised to at
    /// least the plane of the slope itself.
    Dozier2022,
}

impl SvfMethod {
    /// Cosine of the horizon zenith angle to integrate.
    #[inline]
    fn horizon_cos(self, hcos: f64, tan_sq_slope: f64, cos_rel: f64) -> f64 {
        match self {
            SvfMethod::Dozier1990 => hcos,
            SvfMethod::Dozier2022 => {
                if cos_rel < 0.0 {
                    let bound = (1.0 - 1.0 / (1.0 + tan_sq_slope * cos_rel * cos_rel)).sqrt();
                    hcos.max(bound)
                } else {
                    hcos
                }
            }
        }
    }
}

impl std::str::FromStr for SvfMethod {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1990" | "dozier1990" => Ok(Self::Dozier1990),
            "2022" | "dozier2022" => Ok(Self::Dozier2022),
            _ => Err(TopoError::invalid_option(
                "viewf method",
                "\"1990\" or \"2022\"",
                format!("{s:?}"),
            )),
        }
    }
}

/// Slope sine and aspect (radians from South) of every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOrientation {
    pub sin_slope: Array2<f64>,
    pub aspect: Array2<f64>,
}

/// Parameters for [`viewf`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewfParams {
    pub nangles: usize,
    pub method: SvfMethod,
    pub kernel: ScanKernel,
    pub gradient: GradientMethod,
    /// Supplied orientation; computed from the DEM when `None`.
    pub orientation: Option<SurfaceOrientation>,
}

impl Default for ViewfParams {
    fn default() -> Self {
        Self {
            nangles: 72,
            method: SvfMethod::default(),
            kernel: ScanKernel::default(),
            gradient: GradientMethod::default(),
            orientation: None,
        }
    }
}

impl ViewfParams {
    pub fn with_nangles(mut self, nangles: usize) -> Self {
        self.nangles = nangles;
        self
    }

    pub fn with_method(mut self, method: SvfMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_kernel(mut self, kernel: ScanKernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_gradient(mut self, gradient: GradientMethod) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn with_orientation(mut self, sin_slope: Array2<f64>, aspect: Array2<f64>) -> Self {
        self.orientation = Some(SurfaceOrientation { sin_slope, aspect });
        self
    }
}

/// Sky view factor and terrain configuration factor grids.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewFactors {
    pub svf: Array2<f64>,
    pub tcf: Array2<f64>,
}

/// Azimuths in degrees, evenly spaced from -180 with the endpoint excluded.
pub fn azimuths(nangles: usize) -> Vec<f64> {
    let step = 360.0 / nangles as f64;
    (0..nangles).map(|k| -180.0 + k as f64 * step).collect()
}

/// Per-cell terms shared by every azimuth.
struct Integrand<'a> {
    sin_slope: ArrayView2<'a, f64>,
    cos_slope: Array2<f64>,
    aspect: ArrayView2<'a, f64>,
    method: SvfMethod,
}

impl<'a> Integrand<'a> {
    fn new(sin_slope: ArrayView2<'a, f64>, aspect: ArrayView2<'a, f64>, method: SvfMethod) -> Self {
        let cos_slope = sin_slope.mapv(|s| ((1.0 - s) * (1.0 + s)).sqrt());
        Self {
            sin_slope,
            cos_slope,
            aspect,
            method,
        }
    }

    /// Positive part of the integrand for one azimuth (radians), added into
    /// `acc`.
    fn accumulate(&self, azimuth: f64, hcos: ArrayView2<f64>, acc: &mut Array2<f64>) {
        let method = self.method;
        Zip::from(acc)
            .and(hcos)
            .and(self.sin_slope)
            .and(&self.cos_slope)
            .and(self.aspect)
            .for_each(|acc, &hc, &sin_s, &cos_s, &asp| {
                let cos_rel = (asp - azimuth).cos();
                let tan_sq = (sin_s * sin_s) / (cos_s * cos_s);
                let c = method.horizon_cos(hc, tan_sq, cos_rel).clamp(-1.0, 1.0);
                let h = c.acos();
                let sin_sq = (1.0 - c) * (1.0 + c);
                let term = cos_s * sin_sq + sin_s * cos_rel * (h - sin_sq.sqrt() * c);
                if term > 0.0 {
                    *acc += term;
                }
            });
    }

    fn finish(&self, sum: Array2<f64>, nangles: usize) -> ViewFactors {
        let svf = sum / nangles as f64;
        let mut tcf = Array2::<f64>::zeros(svf.dim());
        Zip::from(&mut tcf)
            .and(&svf)
            .and(&self.cos_slope)
            .par_for_each(|t, &v, &cos_s| {
                *t = (1.0 + cos_s) / 2.0 - v;
            });
        ViewFactors { svf, tcf }
    }
}

fn check_orientation(sin_slope: ArrayView2<f64>, aspect: ArrayView2<f64>) -> Result<()> {
    check_shape(aspect, sin_slope.dim(), "viewf aspect")?;
    if let Some(&bad) = sin_slope.iter().find(|&&s| s > 1.0) {
        return Err(TopoError::range(
            "sin_slope",
            bad,
            "slope must be the sine of the angle, at most 1",
        ));
    }
    if let Some(&bad) = aspect.iter().find(|&&a| a.abs() > PI) {
        return Err(TopoError::range(
            "aspect",
            bad,
            "must be in radians from South, within [-pi, pi]",
        ));
    }
    Ok(())
}

/// Horizon fields for `nangles` evenly spaced azimuths.
pub fn horizons(
    dem: ArrayView2<f64>,
    spacing: f64,
    nangles: usize,
    kernel: ScanKernel,
) -> Result<Vec<Horizon>> {
    check_spacing(spacing, "viewf spacing")?;
    azimuths(nangles)
        .into_par_iter()
        .map(|az| Horizon::compute(az, dem, spacing, kernel))
        .collect()
}

/// Integrate precomputed horizon fields into SVF and TCF.
pub fn viewcalc<'a>(
    sin_slope: ArrayView2<'a, f64>,
    aspect: ArrayView2<'a, f64>,
    horizons: &[Horizon],
    method: SvfMethod,
) -> Result<ViewFactors> {
    check_orientation(sin_slope, aspect)?;
    if horizons.is_empty() {
        return Err(TopoError::shape(
            "viewcalc horizons",
            "at least one azimuth",
            "none",
        ));
    }
    for h in horizons {
        check_shape(h.hcos.view(), sin_slope.dim(), "viewcalc horizon cosines")?;
    }

    let integrand = Integrand::new(sin_slope, aspect, method);
    let dim = sin_slope.dim();
    let sum = horizons
        .par_iter()
        .fold(
            || Array2::<f64>::zeros(dim),
            |mut acc, h| {
                integrand.accumulate(h.azimuth, h.hcos.view(), &mut acc);
                acc
            },
        )
        .reduce(|| Array2::<f64>::zeros(dim), |a, b| a + b);

    Ok(integrand.finish(sum, horizons.len()))
}

/// SVF and TCF of a DEM, with orientation from `params` or its gradient.
pub fn viewf(dem: ArrayView2<f64>, spacing: f64, params: &ViewfParams) -> Result<ViewFactors> {
    viewf_with_gradient(dem, spacing, params, &params.gradient)
}

/// Same as [`viewf`] with a caller-supplied gradient source.
pub fn viewf_with_gradient<G: GradientProvider + ?Sized>(
    dem: ArrayView2<f64>,
    spacing: f64,
    params: &ViewfParams,
    provider: &G,
) -> Result<ViewFactors> {
    check_spacing(spacing, "viewf spacing")?;
    if params.nangles < MIN_ANGLES {
        return Err(TopoError::range(
            "nangles",
            params.nangles as f64,
            "must be at least 16",
        ));
    }

    let computed;
    let (sin_slope, aspect) = match &params.orientation {
        Some(o) => {
            check_shape(o.sin_slope.view(), dem.dim(), "viewf sin_slope")?;
            (o.sin_slope.view(), o.aspect.view())
        }
        None => {
            let g = provider.gradient(dem, spacing, spacing)?;
            computed = SurfaceOrientation {
                sin_slope: g.slope.mapv(f64::sin),
                aspect: g.aspect,
            };
            (computed.sin_slope.view(), computed.aspect.view())
        }
    };
    check_orientation(sin_slope, aspect)?;

    debug!(
        nangles = params.nangles,
        method = ?params.method,
        kernel = ?params.kernel,
        shape = ?dem.dim(),
        "viewf"
    );

    let integrand = Integrand::new(sin_slope, aspect, params.method);
    let dim = dem.dim();
    let sum = azimuths(params.nangles)
        .into_par_iter()
        .map(|az| {
            trace!(azimuth = az, "viewf azimuth");
            Horizon::compute(az, dem, spacing, params.kernel)
        })
        .try_fold(
            || Array2::<f64>::zeros(dim),
            |mut acc, h| {
                let h = h?;
                integrand.accumulate(h.azimuth, h.hcos.view(), &mut acc);
                Ok::<_, TopoError>(acc)
            },
        )
        .try_reduce(|| Array2::<f64>::zeros(dim), |a, b| Ok(a + b))?;

    Ok(integrand.finish(sum, params.nangles))
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod py {
    use numpy::{IntoPyArray, PyArray2};
    use pyo3::prelude::*;

    use super::{SvfMethod, ViewfParams};
    use crate::error::TopoError;
    use crate::grid::py::extract_f64_grid;

    /// Sky view factor and terrain configuration factor of a DEM.
    ///
    /// Returns `(svf, tcf)`.
    #[pyfunction]
    #[pyo3(
        name = "viewf",
        signature = (dem, spacing, nangles=72, sin_slope=None, aspect=None, method="1990")
    )]
    pub fn viewf_py<'py>(
        py: Python<'py>,
        dem: &Bound<'py, PyAny>,
        spacing: f64,
        nangles: usize,
        sin_slope: Option<&Bound<'py, PyAny>>,
        aspect: Option<&Bound<'py, PyAny>>,
        method: &str,
    ) -> PyResult<(Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<f64>>)> {
        let dem = extract_f64_grid(dem, "viewf input of dem")?;
        let dem = dem.as_array().to_owned();
        let method: SvfMethod = method.parse()?;

        let mut params = ViewfParams::default()
            .with_nangles(nangles)
            .with_method(method);
        match (sin_slope, aspect) {
            (Some(s), Some(a)) => {
                let s = extract_f64_grid(s, "viewf sin_slope")?.as_array().to_owned();
                let a = extract_f64_grid(a, "viewf aspect")?.as_array().to_owned();
                params = params.with_orientation(s, a);
            }
            (None, None) => {}
            _ => {
                return Err(TopoError::shape(
                    "viewf orientation",
                    "sin_slope and aspect together",
                    "only one of them",
                )
                .into())
            }
        }

        let vf = py.allow_threads(|| super::viewf(dem.view(), spacing, &params))?;
        Ok((vf.svf.into_pyarray(py), vf.tcf.into_pyarray(py)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::s;

    /// High plateau on the western half, low plain on the eastern half.
    fn step_dem() -> Array2<f64> {
        let mut dem = Array2::<f64>::ones((50, 50));
        dem.slice_mut(s![.., ..25]).fill(100_000.0);
        dem
    }

    #[test]
    fn test_azimuths() {
        let az = azimuths(4);
        assert_eq!(az, vec![-180.0, -90.0, 0.0, 90.0]);
        assert_eq!(azimuths(72).len(), 72);
    }

    #[test]
    fn test_flat_terrain_sees_whole_sky() {
        let dem = Array2::<f64>::from_elem((12, 9), 250.0);
        let vf = viewf(dem.view(), 30.0, &ViewfParams::default()).unwrap();
        for (&svf, &tcf) in vf.svf.iter().zip(vf.tcf.iter()) {
            assert_abs_diff_eq!(svf, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(tcf, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_step_dem() {
        let dem = step_dem();
        for method in [SvfMethod::Dozier1990, SvfMethod::Dozier2022] {
            let params = ViewfParams::default().with_nangles(360).with_method(method);
            let vf = viewf(dem.view(), 10.0, &params).unwrap();
            for &v in vf.svf.slice(s![.., ..24]).iter() {
                assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
            }
            for &v in vf.svf.column(25).iter() {
                assert_abs_diff_eq!(v, 0.5, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_viewcalc_matches_viewf() {
        let dem = Array2::from_shape_fn((20, 16), |(r, c)| {
            100.0 + 8.0 * ((r as f64 / 3.0).sin() + (c as f64 / 2.0).cos())
        });
        let params = ViewfParams::default().with_nangles(32);
        let vf = viewf(dem.view(), 5.0, &params).unwrap();

        let g = GradientMethod::D8.gradient(dem.view(), 5.0, 5.0).unwrap();
        let sin_slope = g.slope.mapv(f64::sin);
        let hs = horizons(dem.view(), 5.0, 32, ScanKernel::default()).unwrap();
        let vc = viewcalc(sin_slope.view(), g.aspect.view(), &hs, SvfMethod::Dozier1990).unwrap();

        for (a, b) in vf.svf.iter().zip(vc.svf.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
        for (a, b) in vf.tcf.iter().zip(vc.tcf.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tcf_complements_svf() {
        let dem = step_dem();
        let sin_slope = Array2::<f64>::from_elem(dem.dim(), 0.3);
        let aspect = Array2::<f64>::from_elem(dem.dim(), 0.5);
        let params = ViewfParams::default()
            .with_nangles(16)
            .with_orientation(sin_slope.clone(), aspect);
        let vf = viewf(dem.view(), 10.0, &params).unwrap();
        let cos_s = (1.0 - 0.3_f64 * 0.3).sqrt();
        for (&s, &t) in vf.svf.iter().zip(vf.tcf.iter()) {
            assert_abs_diff_eq!(s + t, (1.0 + cos_s) / 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_2022_never_below_1990() {
        let dem = Array2::from_shape_fn((24, 24), |(r, c)| {
            500.0 + 40.0 * (r as f64 / 5.0).sin() * (c as f64 / 4.0).cos() + 3.0 * c as f64
        });
        let p = ViewfParams::default().with_nangles(36);
        let old = viewf(dem.view(), 10.0, &p.clone().with_method(SvfMethod::Dozier1990)).unwrap();
        let new = viewf(dem.view(), 10.0, &p.with_method(SvfMethod::Dozier2022)).unwrap();
        for (&a, &b) in old.svf.iter().zip(new.svf.iter()) {
            assert!(b >= a - 1e-12, "2022 {b} below 1990 {a}");
        }
    }

    #[test]
    fn test_reference_kernel_agrees() {
        let dem = step_dem();
        let p = ViewfParams::default().with_nangles(16);
        let par = viewf(dem.view(), 10.0, &p).unwrap();
        let refr = viewf(dem.view(), 10.0, &p.clone().with_kernel(ScanKernel::Reference)).unwrap();
        for (a, b) in par.svf.iter().zip(refr.svf.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_column_and_row_dem() {
        let column = Array2::from_shape_fn((10, 1), |(r, _)| 100.0 + 5.0 * r as f64);
        let row = Array2::from_shape_fn((1, 12), |(_, c)| 100.0 + 5.0 * c as f64);
        let params = ViewfParams::default().with_nangles(16);
        for dem in [column, row] {
            let vf = viewf(dem.view(), 10.0, &params).unwrap();
            assert_eq!(vf.svf.dim(), dem.dim());
            assert!(vf.svf.iter().chain(vf.tcf.iter()).all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_too_few_angles() {
        let dem = step_dem();
        let params = ViewfParams::default().with_nangles(10);
        assert!(matches!(
            viewf(dem.view(), 10.0, &params),
            Err(TopoError::Range { name: "nangles", .. })
        ));
    }

    #[test]
    fn test_bad_orientation() {
        let dem = step_dem();
        let ones = Array2::<f64>::ones(dem.dim());
        let params = ViewfParams::default().with_orientation(ones.clone() * 10.0, ones.clone());
        assert!(matches!(
            viewf(dem.view(), 10.0, &params),
            Err(TopoError::Range { name: "sin_slope", .. })
        ));

        let params = ViewfParams::default().with_orientation(ones.clone(), ones.clone() * 10.0);
        assert!(matches!(
            viewf(dem.view(), 10.0, &params),
            Err(TopoError::Range { name: "aspect", .. })
        ));

        let small = Array2::<f64>::zeros((3, 3));
        let params = ViewfParams::default().with_orientation(small.clone(), small);
        assert!(matches!(
            viewf(dem.view(), 10.0, &params),
            Err(TopoError::Shape { .. })
        ));
    }

    #[test]
    fn test_viewcalc_errors() {
        let z = Array2::<f64>::zeros((4, 4));
        assert!(viewcalc(z.view(), z.view(), &[], SvfMethod::Dozier1990).is_err());
        let wrong = Horizon {
            azimuth: 0.0,
            hcos: Array2::zeros((2, 2)),
        };
        assert!(matches!(
            viewcalc(z.view(), z.view(), &[wrong], SvfMethod::Dozier1990),
            Err(TopoError::Shape { .. })
        ));
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("1990".parse::<SvfMethod>().unwrap(), SvfMethod::Dozier1990);
        assert_eq!("2022".parse::<SvfMethod>().unwrap(), SvfMethod::Dozier2022);
        assert!(matches!(
            "1987".parse::<SvfMethod>(),
            Err(TopoError::InvalidOption { name: "viewf method", .. })
        ));
    }
}

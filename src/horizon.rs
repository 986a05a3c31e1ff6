//! Horizon cosines over a whole DEM for one compass direction.
//!
//! Azimuth uses the IPW convention: 0 is South, positive angles run through
//! East (+90) and negative through West (-90), and ±180 is North. Each
//! azimuth resolves to one [`HorizonCase`], which turns the grid so that the
//! requested direction lies along rows, scans the rows and turns the result
//! back.

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::error::{Result, TopoError};
use crate::grid::{check_spacing, transposed};
use crate::hor1d::{ScanDirection, ScanKernel};
use crate::skew::{adjust_spacing, skew, SkewDirection};

/// Horizon cosines for one azimuth, paired with that azimuth in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    pub azimuth: f64,
    pub hcos: Array2<f64>,
}

impl Horizon {
    /// Compute the horizon field for `azimuth` degrees.
    pub fn compute(
        azimuth: f64,
        dem: ArrayView2<f64>,
        spacing: f64,
        kernel: ScanKernel,
    ) -> Result<Self> {
        let hcos = horizon_with_kernel(azimuth, dem, spacing, kernel)?;
        Ok(Self {
            azimuth: azimuth.to_radians(),
            hcos,
        })
    }
}

/// Grid rearrangement applied before the row scan and undone after it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Transform {
    Identity,
    Transpose,
    /// Skew the rows by the angle, then transpose.
    SkewTranspose(f64),
    /// Transpose, skew by the angle, then transpose back.
    TransposeSkew(f64),
}

/// Geometric recipe for one range of azimuths.
///
/// Band variants carry the skew angle in degrees, always within `[-45, 45]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HorizonCase {
    /// Azimuth 90: rows scanned forward.
    East,
    /// Azimuth -90: rows scanned backward.
    West,
    /// Azimuth 0: columns scanned forward.
    South,
    /// Azimuth ±180: columns scanned backward.
    North,
    /// Azimuth in `[-45, 45]`, skewed by the azimuth.
    SouthBand { angle: f64 },
    /// Azimuth in `[-180, -135]` or `[135, 180)`, skewed by the azimuth
    /// shifted half a turn.
    NorthBand { angle: f64 },
    /// Azimuth in `(45, 135)`, skewed by `90 - azimuth` on the transpose.
    EastBand { angle: f64 },
    /// Azimuth in `(-135, -45)`, skewed by `-90 - azimuth` on the transpose.
    WestBand { angle: f64 },
}

impl HorizonCase {
    /// Resolve the case for an azimuth in degrees.
    pub fn from_azimuth(azimuth: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&azimuth) {
            return Err(TopoError::range(
                "azimuth",
                azimuth,
                "must be between -180 and 180 degrees",
            ));
        }

        let case = if azimuth == 90.0 {
            Self::East
        } else if azimuth == -90.0 {
            Self::West
        } else if azimuth == 0.0 {
            Self::South
        } else if azimuth.abs() == 180.0 {
            Self::North
        } else if (-45.0..=45.0).contains(&azimuth) {
            Self::SouthBand { angle: azimuth }
        } else if azimuth <= -135.0 {
            Self::NorthBand {
                angle: azimuth + 180.0,
            }
        } else if azimuth >= 135.0 {
            Self::NorthBand {
                angle: azimuth - 180.0,
            }
        } else if azimuth > 45.0 {
            Self::EastBand {
                angle: 90.0 - azimuth,
            }
        } else {
            Self::WestBand {
                angle: -90.0 - azimuth,
            }
        };
        Ok(case)
    }

    /// Row scan direction once the grid has been rearranged.
    pub fn direction(&self) -> ScanDirection {
        match self {
            Self::East | Self::South | Self::SouthBand { .. } | Self::EastBand { .. } => {
                ScanDirection::Forward
            }
            Self::West | Self::North | Self::NorthBand { .. } | Self::WestBand { .. } => {
                ScanDirection::Backward
            }
        }
    }

    fn transform(&self) -> Transform {
        match *self {
            Self::East | Self::West => Transform::Identity,
            Self::South | Self::North => Transform::Transpose,
            Self::SouthBand { angle } | Self::NorthBand { angle } => Transform::SkewTranspose(angle),
            Self::EastBand { angle } | Self::WestBand { angle } => Transform::TransposeSkew(angle),
        }
    }

    /// Horizon cosines for this case, shaped like `dem`.
    pub fn compute(
        &self,
        dem: ArrayView2<f64>,
        spacing: f64,
        kernel: ScanKernel,
    ) -> Result<Array2<f64>> {
        check_spacing(spacing, "horizon spacing")?;
        let direction = self.direction();

        let hcos = match self.transform() {
            Transform::Identity => kernel.hor2d(dem, spacing, direction),
            Transform::Transpose => {
                let t = transposed(dem);
                let h = kernel.hor2d(t.view(), spacing, direction);
                transposed(h.view())
            }
            Transform::SkewTranspose(angle) => {
                let spacing = adjust_spacing(spacing, angle.abs())?;
                let t = transposed(skew(dem, angle, SkewDirection::Forward)?.view());
                let h = kernel.hor2d(t.view(), spacing, direction);
                skew(h.t(), angle, SkewDirection::Backward)?
            }
            Transform::TransposeSkew(angle) => {
                let spacing = adjust_spacing(spacing, angle.abs())?;
                let t = transposed(skew(dem.t(), angle, SkewDirection::Forward)?.view());
                let h = kernel.hor2d(t.view(), spacing, direction);
                transposed(skew(h.t(), angle, SkewDirection::Backward)?.view())
            }
        };

        if hcos.dim() != dem.dim() {
            return Err(TopoError::shape(
                "horizon output",
                format!("shape {:?}", dem.dim()),
                format!("shape {:?}", hcos.dim()),
            ));
        }
        Ok(hcos)
    }
}

/// Cosines of the angles to the horizon along `azimuth` degrees.
pub fn horizon(azimuth: f64, dem: ArrayView2<f64>, spacing: f64) -> Result<Array2<f64>> {
    horizon_with_kernel(azimuth, dem, spacing, ScanKernel::default())
}

/// Same as [`horizon`] with an explicit row scan kernel.
pub fn horizon_with_kernel(
    azimuth: f64,
    dem: ArrayView2<f64>,
    spacing: f64,
    kernel: ScanKernel,
) -> Result<Array2<f64>> {
    let case = HorizonCase::from_azimuth(azimuth)?;
    debug!(azimuth, ?case, ?kernel, "horizon dispatch");
    case.compute(dem, spacing, kernel)
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod py {
    use numpy::{IntoPyArray, PyArray2};
    use pyo3::prelude::*;

    use crate::grid::py::extract_f64_grid;

    /// Cosines of angles to the horizon for one azimuth (0 = South, +90 = East).
    #[pyfunction]
    #[pyo3(name = "horizon")]
    pub fn horizon_py<'py>(
        py: Python<'py>,
        azimuth: f64,
        dem: &Bound<'py, PyAny>,
        spacing: f64,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let dem = extract_f64_grid(dem, "horizon input of dem")?;
        let dem = dem.as_array().to_owned();
        let hcos = py.allow_threads(|| super::horizon(azimuth, dem.view(), spacing))?;
        Ok(hcos.into_pyarray(py))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{s, Array2, Axis};

    fn bumpy(nrows: usize, ncols: usize) -> Array2<f64> {
        Array2::from_shape_fn((nrows, ncols), |(r, c)| {
            let x = c as f64 / 3.0;
            let y = r as f64 / 4.0;
            2000.0 + 150.0 * (x.sin() * y.cos()) + 3.0 * ((r * 7 + c * 13) % 11) as f64
        })
    }

    /// Flat basin with a tall wall along the northern edge (row 0).
    fn north_wall(nrows: usize, ncols: usize) -> Array2<f64> {
        let mut dem = Array2::<f64>::zeros((nrows, ncols));
        dem.row_mut(0).fill(1000.0);
        dem
    }

    #[test]
    fn test_dispatch_cases() {
        assert_eq!(HorizonCase::from_azimuth(90.0).unwrap(), HorizonCase::East);
        assert_eq!(HorizonCase::from_azimuth(-90.0).unwrap(), HorizonCase::West);
        assert_eq!(HorizonCase::from_azimuth(0.0).unwrap(), HorizonCase::South);
        assert_eq!(HorizonCase::from_azimuth(180.0).unwrap(), HorizonCase::North);
        assert_eq!(HorizonCase::from_azimuth(-180.0).unwrap(), HorizonCase::North);
        assert_eq!(
            HorizonCase::from_azimuth(45.0).unwrap(),
            HorizonCase::SouthBand { angle: 45.0 }
        );
        assert_eq!(
            HorizonCase::from_azimuth(-45.0).unwrap(),
            HorizonCase::SouthBand { angle: -45.0 }
        );
        assert_eq!(
            HorizonCase::from_azimuth(135.0).unwrap(),
            HorizonCase::NorthBand { angle: -45.0 }
        );
        assert_eq!(
            HorizonCase::from_azimuth(-135.0).unwrap(),
            HorizonCase::NorthBand { angle: 45.0 }
        );
        assert_eq!(
            HorizonCase::from_azimuth(60.0).unwrap(),
            HorizonCase::EastBand { angle: 30.0 }
        );
        assert_eq!(
            HorizonCase::from_azimuth(-60.0).unwrap(),
            HorizonCase::WestBand { angle: -30.0 }
        );
    }

    #[test]
    fn test_every_azimuth_resolves() {
        for tenth in -1800..=1800 {
            let azimuth = tenth as f64 / 10.0;
            let case = HorizonCase::from_azimuth(azimuth).unwrap();
            match case {
                HorizonCase::SouthBand { angle }
                | HorizonCase::NorthBand { angle }
                | HorizonCase::EastBand { angle }
                | HorizonCase::WestBand { angle } => {
                    assert!((-45.0..=45.0).contains(&angle), "azimuth {azimuth}");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_azimuth_errors() {
        let dem = Array2::<f64>::ones((10, 1));
        for azimuth in [200.0, -200.0, f64::NAN] {
            let err = horizon(azimuth, dem.view(), 1.0).unwrap_err();
            assert!(matches!(err, TopoError::Range { .. }));
        }
        let err = horizon(-200.0, dem.view(), 1.0).unwrap_err();
        assert!(err.to_string().contains("must be between -180 and 180 degrees"));
    }

    #[test]
    fn test_output_shape_all_azimuths() {
        let dem = bumpy(17, 29);
        for azimuth in (-180..=180).step_by(5) {
            let hcos = horizon(azimuth as f64, dem.view(), 30.0).unwrap();
            assert_eq!(hcos.dim(), dem.dim(), "azimuth {azimuth}");
        }
    }

    #[test]
    fn test_flat_terrain_is_zero() {
        let dem = Array2::<f64>::from_elem((12, 15), 1500.0);
        for azimuth in (-180..=180).step_by(5) {
            let hcos = horizon(azimuth as f64, dem.view(), 10.0).unwrap();
            assert!(hcos.iter().all(|&c| c == 0.0), "azimuth {azimuth}");
        }
    }

    #[test]
    fn test_east_west_symmetry() {
        let dem = bumpy(15, 24);
        let mut mirrored = dem.clone();
        mirrored.invert_axis(Axis(1));

        let east = horizon(90.0, dem.view(), 30.0).unwrap();
        let mut west = horizon(-90.0, mirrored.view(), 30.0).unwrap();
        west.invert_axis(Axis(1));
        assert_eq!(east, west);
    }

    #[test]
    fn test_south_is_transposed_east() {
        let dem = bumpy(11, 19);
        let south = horizon(0.0, dem.view(), 30.0).unwrap();
        let east_of_t = horizon(90.0, dem.t(), 30.0).unwrap();
        assert_eq!(south, east_of_t.t());

        let north = horizon(180.0, dem.view(), 30.0).unwrap();
        let west_of_t = horizon(-90.0, dem.t(), 30.0).unwrap();
        assert_eq!(north, west_of_t.t());
    }

    #[test]
    fn test_north_wall_seen_only_looking_north() {
        let dem = north_wall(21, 41);
        let (last, mid) = (20, 20);

        for azimuth in [-180.0, -160.0, -135.0, 135.0, 150.0, 180.0] {
            let hcos = horizon(azimuth, dem.view(), 10.0).unwrap();
            assert!(hcos[[last, mid]] > 0.0, "azimuth {azimuth}");
        }
        for azimuth in [-45.0, -30.0, 0.0, 30.0, 45.0, 90.0, -90.0] {
            let hcos = horizon(azimuth, dem.view(), 10.0).unwrap();
            assert!(
                hcos.slice(s![1.., ..]).iter().all(|&c| c == 0.0),
                "azimuth {azimuth}"
            );
        }
    }

    #[test]
    fn test_north_wall_cosine_due_north() {
        let dem = north_wall(11, 5);
        let hcos = horizon(180.0, dem.view(), 10.0).unwrap();
        // Ten cells south of the wall: rise 1000 over 100.
        let expected = 1000.0 / (1000.0_f64.powi(2) + 100.0_f64.powi(2)).sqrt();
        assert_relative_eq!(hcos[[10, 2]], expected, epsilon = 1e-12);
        assert_eq!(hcos[[0, 2]], 0.0);
    }

    #[test]
    fn test_kernels_agree_for_every_case() {
        let dem = bumpy(13, 21);
        for azimuth in [-180.0, -150.0, -90.0, -60.0, -20.0, 0.0, 20.0, 60.0, 90.0, 150.0] {
            let reference =
                horizon_with_kernel(azimuth, dem.view(), 30.0, ScanKernel::Reference).unwrap();
            let parallel =
                horizon_with_kernel(azimuth, dem.view(), 30.0, ScanKernel::Parallel).unwrap();
            assert_eq!(reference, parallel, "azimuth {azimuth}");
        }
    }

    #[test]
    fn test_horizon_value_type_carries_radians() {
        let dem = bumpy(5, 5);
        let h = Horizon::compute(-90.0, dem.view(), 30.0, ScanKernel::Reference).unwrap();
        assert_relative_eq!(h.azimuth, -std::f64::consts::FRAC_PI_2);
        assert_eq!(h.hcos.dim(), (5, 5));
    }

    #[test]
    fn test_hcos_in_unit_range() {
        let dem = bumpy(20, 20);
        for azimuth in (-180..180).step_by(15) {
            let hcos = horizon(azimuth as f64, dem.view(), 30.0).unwrap();
            assert!(hcos.iter().all(|&c| (0.0..1.0).contains(&c)));
        }
    }
}

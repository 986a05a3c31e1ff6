//! Shape checks and layout helpers shared by the grid operations.

use ndarray::{Array2, ArrayView2};

use crate::error::{Result, TopoError};

/// Require `arr` to have exactly the `(rows, cols)` shape of a reference grid.
pub fn check_shape(arr: ArrayView2<f64>, dim: (usize, usize), context: &'static str) -> Result<()> {
    if arr.dim() != dim {
        return Err(TopoError::shape(
            context,
            format!("shape {:?}", dim),
            format!("shape {:?}", arr.dim()),
        ));
    }
    Ok(())
}

/// Require a grid spacing to be a positive finite distance.
pub(crate) fn check_spacing(spacing: f64, name: &'static str) -> Result<()> {
    if !(spacing.is_finite() && spacing > 0.0) {
        return Err(TopoError::range(name, spacing, "must be a positive finite distance"));
    }
    Ok(())
}

/// Owned transpose in standard (row-major) layout so rows stay contiguous.
pub(crate) fn transposed(arr: ArrayView2<f64>) -> Array2<f64> {
    arr.t().as_standard_layout().into_owned()
}

#[cfg(feature = "python")]
pub(crate) mod py {
    use numpy::{
        PyArray1, PyArray2, PyArrayDescrMethods, PyArrayMethods, PyReadonlyArray1,
        PyReadonlyArray2, PyUntypedArray, PyUntypedArrayMethods,
    };
    use pyo3::prelude::*;

    use crate::error::TopoError;

    /// Check rank and dtype of a numpy array before borrowing it.
    fn check_array<'py>(
        obj: &Bound<'py, PyAny>,
        ndim: usize,
        context: &'static str,
    ) -> PyResult<()> {
        let untyped = obj.downcast::<PyUntypedArray>()?;
        if untyped.ndim() != ndim {
            return Err(TopoError::shape(
                context,
                format!("a {ndim}D array"),
                format!("a {}D array", untyped.ndim()),
            )
            .into());
        }
        if !untyped.dtype().is_equiv_to(&numpy::dtype::<f64>(obj.py())) {
            return Err(TopoError::precision(context).into());
        }
        Ok(())
    }

    /// Borrow a 2D float64 numpy array, rejecting other ranks and dtypes.
    pub(crate) fn extract_f64_grid<'py>(
        obj: &Bound<'py, PyAny>,
        context: &'static str,
    ) -> PyResult<PyReadonlyArray2<'py, f64>> {
        check_array(obj, 2, context)?;
        Ok(obj.downcast::<PyArray2<f64>>()?.readonly())
    }

    /// Borrow a 1D float64 numpy array, rejecting other ranks and dtypes.
    pub(crate) fn extract_f64_line<'py>(
        obj: &Bound<'py, PyAny>,
        context: &'static str,
    ) -> PyResult<PyReadonlyArray1<'py, f64>> {
        check_array(obj, 1, context)?;
        Ok(obj.downcast::<PyArray1<f64>>()?.readonly())
    }
}

//! Column statistics over feature matrices.

use ndarray::{Array1, Array2, Axis};

/// Per-column arithmetic mean; `None` for a matrix without rows.
pub fn column_means(x: &Array2<f64>) -> Option<Array1<f64>> {
    x.mean_axis(Axis(0))
}

/// Per-column population standard deviation (divides by n).
///
/// A matrix without rows yields NaN for every column.
pub fn column_stds(x: &Array2<f64>) -> Array1<f64> {
    if x.nrows() == 0 {
        return Array1::from_elem(x.ncols(), f64::NAN);
    }
    x.std_axis(Axis(0), 0.0)
}

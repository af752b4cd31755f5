use ndarray::{Array1, Array2, ArrayView1};
use rew_math::{column_means, column_stds};
use serde::{Deserialize, Serialize};

/// Per-feature standardization `(x - mean) / scale`.
///
/// Scales are population standard deviations; a constant feature gets
/// scale 1 so it maps to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Array1<f64>,
    pub scales: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let means = column_means(x).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scales = column_stds(x).mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        Self { means, scales }
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.means) / &self.scales
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.means) / &self.scales
    }
}

//! Numerically stable probability helpers.

use ndarray::Array1;

/// Logistic sigmoid, evaluated without overflow for large |z|.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

/// Clip a probability into `[lo, hi]`.
///
/// NaN maps to `lo` so a degenerate score can never propagate into a draw.
pub fn clip_probability(p: f64, lo: f64, hi: f64) -> f64 {
    if p.is_nan() {
        return lo;
    }
    p.max(lo).min(hi)
}

/// Mean binary cross-entropy. Predictions are clamped away from 0 and 1.
pub fn log_loss(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    let eps = 1e-15;
    let total: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&y, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum();
    -total / y_true.len() as f64
}

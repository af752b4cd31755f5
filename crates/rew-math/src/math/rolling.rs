//! Trailing-window sums over ordered series.
//!
//! Windows are trailing and inclusive: the value at index `i` aggregates
//! indices `i + 1 - window ..= i`, clamped at the start of the series. Nothing
//! after `i` is ever read, so a series ordered by time yields features free of
//! look-ahead.

/// Trailing sum with a `min_periods` policy.
///
/// NaN inputs are skipped. When fewer than `min_periods` non-NaN values fall
/// inside the window the output is NaN. A `window` of zero yields all NaN.
pub fn rolling_sum(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 {
        return out;
    }
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        let mut count = 0usize;
        let mut sum = 0.0;
        for v in &values[start..=i] {
            if !v.is_nan() {
                sum += *v;
                count += 1;
            }
        }
        if count >= min_periods.max(1) {
            out[i] = sum;
        }
    }
    out
}

/// Trailing sum with "minimum periods = 1" semantics where missing and
/// non-finite values count as zero.
///
/// The first element equals its own (cleaned) value, the second the sum of
/// the first two when `window >= 2`, and so on until the full width is
/// reached. The output never contains NaN.
pub fn trailing_sum(values: &[Option<f64>], window: usize) -> Vec<f64> {
    let cleaned: Vec<f64> = values
        .iter()
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
        .collect();
    rolling_sum(&cleaned, window, 1)
        .into_iter()
        .map(|v| if v.is_nan() { 0.0 } else { v })
        .collect()
}

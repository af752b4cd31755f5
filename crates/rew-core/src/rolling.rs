//! Trailing-window shock features.
//!
//! For every entity, each indicator gets a sum over the last
//! `min(W, periods seen so far)` months ending at the current month. Sums only
//! ever look backwards and never cross an entity boundary, which is what keeps
//! the features free of label leakage.

use rew_common::{Error, Result};
use rew_config::SHOCK_COUNT_COLUMN;
use rew_math::trailing_sum;
use tracing::debug;

use crate::panel::{MonthlyRecord, SortedMonthly};
use crate::quality::DataQualityReport;

/// Per-row aggregate shock count and its rolled value.
#[derive(Debug, Clone, PartialEq)]
pub struct ShockCount {
    pub raw: Vec<f64>,
    pub rolled: Vec<f64>,
}

/// Monthly rows in sorted order plus their rolled columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RolledMonthly {
    window: usize,
    sorted: SortedMonthly,
    /// One column per indicator, aligned with `sorted.records()`.
    rolled: Vec<Vec<f64>>,
    shock_count: Option<ShockCount>,
}

impl RolledMonthly {
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn indicators(&self) -> &[String] {
        self.sorted.indicators()
    }

    pub fn records(&self) -> &[MonthlyRecord] {
        self.sorted.records()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.sorted.entity_count()
    }

    pub fn shock_count(&self) -> Option<&ShockCount> {
        self.shock_count.as_ref()
    }

    /// Name of the rolled column for an indicator.
    pub fn rolled_name(&self, indicator: &str) -> String {
        format!("{indicator}_roll{}", self.window)
    }

    /// Rolled values of one indicator.
    pub fn rolled(&self, indicator: &str) -> Option<&[f64]> {
        self.indicators()
            .iter()
            .position(|i| i == indicator)
            .map(|idx| self.rolled[idx].as_slice())
    }

    /// Raw values of one indicator; missing cells stay `None`.
    pub fn raw(&self, indicator: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.indicators().iter().position(|i| i == indicator)?;
        Some(self.records().iter().map(|r| r.shocks[idx]).collect())
    }

    /// Every derived column in output order: `{ind}_roll{W}` per indicator,
    /// then `shock_count` and `shock_count_roll{W}` when enabled.
    pub fn derived_columns(&self) -> Vec<(String, &[f64])> {
        let mut cols: Vec<(String, &[f64])> = self
            .indicators()
            .iter()
            .zip(&self.rolled)
            .map(|(name, values)| (self.rolled_name(name), values.as_slice()))
            .collect();
        if let Some(count) = &self.shock_count {
            cols.push((SHOCK_COUNT_COLUMN.to_string(), count.raw.as_slice()));
            cols.push((self.rolled_name(SHOCK_COUNT_COLUMN), count.rolled.as_slice()));
        }
        cols
    }
}

/// Compute trailing sums of every indicator over `window` months.
///
/// Missing or non-finite indicator values contribute 0 and are counted in
/// `quality`; the raw column keeps its missing marker.
pub fn roll_shocks(
    sorted: SortedMonthly,
    window: usize,
    include_shock_counts: bool,
    quality: &mut DataQualityReport,
) -> Result<RolledMonthly> {
    if window == 0 {
        return Err(Error::InvalidConfig(
            "rolling window must be at least 1 month".to_string(),
        ));
    }

    let n_ind = sorted.indicators().len();
    let mut rolled: Vec<Vec<f64>> = vec![Vec::with_capacity(sorted.len()); n_ind];
    let mut count_raw = Vec::with_capacity(if include_shock_counts { sorted.len() } else { 0 });
    let mut count_rolled = Vec::with_capacity(count_raw.capacity());
    let mut missing = vec![0usize; n_ind];

    for partition in sorted.partitions() {
        for (k, column) in rolled.iter_mut().enumerate() {
            let values: Vec<Option<f64>> = partition.iter().map(|r| r.shocks[k]).collect();
            missing[k] += values.iter().filter(|v| !v.is_some_and(f64::is_finite)).count();
            column.extend(trailing_sum(&values, window));
        }
        if include_shock_counts {
            let counts: Vec<Option<f64>> = partition
                .iter()
                .map(|r| {
                    Some(
                        r.shocks
                            .iter()
                            .filter_map(|v| v.filter(|x| x.is_finite()))
                            .sum::<f64>(),
                    )
                })
                .collect();
            count_rolled.extend(trailing_sum(&counts, window));
            count_raw.extend(counts.into_iter().flatten());
        }
    }

    for (name, count) in sorted.indicators().iter().zip(&missing) {
        quality.record_missing_indicator(name, *count);
    }
    debug!(
        rows = sorted.len(),
        window,
        indicators = n_ind,
        "rolled shock features"
    );

    Ok(RolledMonthly {
        window,
        sorted,
        rolled,
        shock_count: include_shock_counts.then_some(ShockCount {
            raw: count_raw,
            rolled: count_rolled,
        }),
    })
}

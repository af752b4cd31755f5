//! Data-quality accounting.
//!
//! Missing values never abort a run. Each place that substitutes a default
//! bumps a counter here, and the totals are logged once per stage and written
//! into the run summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    /// Missing monthly indicator cells, by indicator. They count as 0 in
    /// every rolled sum.
    pub missing_indicator_values: BTreeMap<String, usize>,
    /// Missing baseline cells, by attribute.
    pub missing_baseline_values: BTreeMap<String, usize>,
    /// Monthly rows whose entity has no baseline row.
    pub unmatched_monthly_rows: usize,
    /// Label terms whose feature was missing on a row, by feature. Each
    /// occurrence contributed 0 to the label score.
    pub label_term_defaults: BTreeMap<String, usize>,
    /// Label terms naming a feature that is not in the dataset at all.
    pub absent_label_features: Vec<String>,
    /// Rows left without a label (observed labels only).
    pub unlabeled_rows: usize,
}

impl DataQualityReport {
    pub fn record_missing_indicator(&mut self, indicator: &str, count: usize) {
        if count > 0 {
            *self
                .missing_indicator_values
                .entry(indicator.to_string())
                .or_default() += count;
        }
    }

    pub fn record_missing_baseline(&mut self, feature: &str, count: usize) {
        if count > 0 {
            *self
                .missing_baseline_values
                .entry(feature.to_string())
                .or_default() += count;
        }
    }

    pub fn record_label_default(&mut self, feature: &str) {
        *self
            .label_term_defaults
            .entry(feature.to_string())
            .or_default() += 1;
    }

    pub fn record_absent_label_feature(&mut self, feature: &str) {
        if !self.absent_label_features.iter().any(|f| f == feature) {
            self.absent_label_features.push(feature.to_string());
        }
    }

    /// Total number of substituted or defaulted cells and rows.
    pub fn total_warnings(&self) -> usize {
        self.missing_indicator_values.values().sum::<usize>()
            + self.missing_baseline_values.values().sum::<usize>()
            + self.unmatched_monthly_rows
            + self.label_term_defaults.values().sum::<usize>()
            + self.absent_label_features.len()
            + self.unlabeled_rows
    }

    pub fn is_clean(&self) -> bool {
        self.total_warnings() == 0
    }

    /// Emit one WARN line per non-zero counter.
    pub fn log(&self) {
        for (indicator, count) in &self.missing_indicator_values {
            warn!(indicator = %indicator, count, "missing shock indicator values treated as 0");
        }
        for (feature, count) in &self.missing_baseline_values {
            warn!(feature = %feature, count, "missing baseline values");
        }
        if self.unmatched_monthly_rows > 0 {
            warn!(
                rows = self.unmatched_monthly_rows,
                "monthly rows without a baseline record kept with missing baseline columns"
            );
        }
        for feature in &self.absent_label_features {
            warn!(feature = %feature, "label term references a column absent from the dataset");
        }
        for (feature, count) in &self.label_term_defaults {
            warn!(feature = %feature, count, "label term value missing, contributed 0");
        }
        if self.unlabeled_rows > 0 {
            warn!(rows = self.unlabeled_rows, "rows without an observed label");
        }
    }
}

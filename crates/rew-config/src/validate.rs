//! Configuration validation.
//!
//! Semantic checks run after parsing. Problems that make the run meaningless
//! (zero-length window, inverted clip interval, non-finite weights) are
//! errors; configuration mismatches the label generator can absorb (a term
//! referencing a feature the dataset will not contain) are warnings, because
//! that term then contributes zero on every row.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::label::LabelSourceKind;
use crate::pipeline::{PipelineConfig, SHOCK_COUNT_COLUMN};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("missing required configuration key: {0}")]
    MissingKey(String),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {}", format_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

impl From<ValidationError> for rew_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingKey(key) => rew_common::Error::MissingConfigKey { key },
            ValidationError::Invalid(_) => rew_common::Error::InvalidConfig(err.to_string()),
            other => rew_common::Error::Config(other.to_string()),
        }
    }
}

/// One validation finding, addressed by dotted config path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of validating a configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into `Err` when any error was found.
    pub fn into_result(self) -> Result<Vec<ValidationIssue>, ValidationError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ValidationError::Invalid(self.errors))
        }
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(path, message));
    }

    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(path, message));
    }
}

impl PipelineConfig {
    /// Run every semantic check and collect all findings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        self.validate_columns(&mut result);
        self.validate_features(&mut result);
        self.validate_label(&mut result);
        self.validate_training(&mut result);
        result
    }

    fn validate_columns(&self, result: &mut ValidationResult) {
        let cols = &self.columns;
        for (path, name) in [
            ("columns.id_col", &cols.id_col),
            ("columns.date_col", &cols.date_col),
            ("columns.label_col", &cols.label_col),
        ] {
            if name.trim().is_empty() {
                result.error(path, "must not be empty");
            }
        }
        if cols.monthly_shock_events.is_empty() {
            result.error("columns.monthly_shock_events", "at least one shock indicator is required");
        }

        let mut seen = HashSet::new();
        let all = [&cols.id_col, &cols.date_col, &cols.label_col]
            .into_iter()
            .chain(cols.monthly_shock_events.iter())
            .chain(cols.baseline_features.iter());
        for name in all {
            if !name.is_empty() && !seen.insert(name.as_str()) {
                result.error("columns", format!("column '{name}' is declared more than once"));
            }
        }

        // Derived names must not shadow declared columns.
        let mut derived: Vec<String> = cols
            .monthly_shock_events
            .iter()
            .map(|c| self.rolled_column(c))
            .collect();
        if self.features.include_shock_counts {
            derived.push(SHOCK_COUNT_COLUMN.to_string());
            derived.push(self.rolled_column(SHOCK_COUNT_COLUMN));
        }
        for name in derived {
            if seen.contains(name.as_str()) {
                result.error(
                    "columns",
                    format!("declared column '{name}' collides with a generated feature"),
                );
            }
        }
    }

    fn validate_features(&self, result: &mut ValidationResult) {
        if self.features.shock_rolling_months == 0 {
            result.error("features.shock_rolling_months", "window must be at least 1 period");
        }
    }

    fn validate_label(&self, result: &mut ValidationResult) {
        let label = &self.label;
        for (path, v) in [
            ("label.base_rate", label.base_rate),
            ("label.p_min", label.p_min),
            ("label.p_max", label.p_max),
        ] {
            if !v.is_finite() {
                result.error(path, format!("must be finite, got {v}"));
            }
        }
        if !(0.0..=1.0).contains(&label.p_min)
            || !(0.0..=1.0).contains(&label.p_max)
            || label.p_min > label.p_max
        {
            result.error(
                "label",
                format!(
                    "clip interval must satisfy 0 <= p_min <= p_max <= 1, got [{}, {}]",
                    label.p_min, label.p_max
                ),
            );
        }

        for (i, term) in label.shock_terms.iter().enumerate() {
            let path = format!("label.shock_terms[{i}]");
            if !term.weight.is_finite() {
                result.error(&path, format!("weight must be finite, got {}", term.weight));
            }
            let known = if term.indicator == SHOCK_COUNT_COLUMN {
                self.features.include_shock_counts
            } else {
                self.columns.monthly_shock_events.contains(&term.indicator)
            };
            if !known {
                result.warn(
                    &path,
                    format!(
                        "'{}' will not be produced by the rolling step; the term contributes 0",
                        self.rolled_column(&term.indicator)
                    ),
                );
            }
        }

        for (i, term) in label.capacity_terms.iter().enumerate() {
            let path = format!("label.capacity_terms[{i}]");
            if !term.weight.is_finite() || !term.threshold.is_finite() {
                result.error(&path, "weight and threshold must be finite");
            }
            if !self.columns.baseline_features.contains(&term.feature) {
                result.warn(
                    &path,
                    format!(
                        "'{}' is not a baseline feature; the term contributes 0",
                        term.feature
                    ),
                );
            }
        }

        if label.source == LabelSourceKind::Observed && self.data.labels_file.is_none() {
            result.error("data.labels_file", "required when label.source is 'observed'");
        }
    }

    fn validate_training(&self, result: &mut ValidationResult) {
        let ts = self.training.test_size;
        if !(ts > 0.0 && ts < 1.0) {
            result.error("training.test_size", format!("must be in (0, 1), got {ts}"));
        }
        let lr = &self.model.params.logistic_regression;
        if !(lr.c.is_finite() && lr.c > 0.0) {
            result.error("model.params.logistic_regression.C", "must be a positive number");
        }
        if lr.max_iter == 0 {
            result.error("model.params.logistic_regression.max_iter", "must be at least 1");
        }
        if !(lr.learning_rate.is_finite() && lr.learning_rate > 0.0) {
            result.error(
                "model.params.logistic_regression.learning_rate",
                "must be a positive number",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{CapacityTerm, Condition, ShockTerm};

    #[test]
    fn default_config_is_valid_without_warnings() {
        let result = PipelineConfig::default().validate();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn zero_window_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.features.shock_rolling_months = 0;
        let result = cfg.validate();
        assert!(result
            .errors
            .iter()
            .any(|i| i.path == "features.shock_rolling_months"));
    }

    #[test]
    fn inverted_clip_interval_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.label.p_min = 0.9;
        cfg.label.p_max = 0.1;
        assert!(!cfg.validate().is_ok());
    }

    #[test]
    fn non_finite_weight_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.label.shock_terms.push(ShockTerm::new("flood", f64::NAN));
        assert!(!cfg.validate().is_ok());
    }

    #[test]
    fn shock_count_term_without_counts_is_only_a_warning() {
        let mut cfg = PipelineConfig::default();
        cfg.features.include_shock_counts = false;
        let result = cfg.validate();
        assert!(result.is_ok());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("shock_count_roll3")));
    }

    #[test]
    fn unknown_capacity_feature_warns() {
        let mut cfg = PipelineConfig::default();
        cfg.label
            .capacity_terms
            .push(CapacityTerm::new("roof_material", Condition::Eq, 1.0, 0.1));
        let result = cfg.validate();
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "label.capacity_terms[5]");
    }

    #[test]
    fn duplicate_and_colliding_columns_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.columns.baseline_features.push("drought".to_string());
        assert!(!cfg.validate().is_ok());

        let mut cfg = PipelineConfig::default();
        cfg.columns.baseline_features.push("shock_count".to_string());
        assert!(!cfg.validate().is_ok());
    }

    #[test]
    fn observed_labels_need_a_file() {
        let mut cfg = PipelineConfig::default();
        cfg.label.source = LabelSourceKind::Observed;
        let err = cfg.validate().into_result().unwrap_err();
        assert!(err.to_string().contains("data.labels_file"));
    }

    #[test]
    fn test_size_bounds() {
        for bad in [0.0, 1.0, -0.1, f64::NAN] {
            let mut cfg = PipelineConfig::default();
            cfg.training.test_size = bad;
            assert!(!cfg.validate().is_ok(), "test_size {bad} accepted");
        }
    }

    #[test]
    fn converts_into_common_error() {
        let err: rew_common::Error = ValidationError::MissingKey("columns.id_col".into()).into();
        assert_eq!(err.code(), 11);
        let err: rew_common::Error = ValidationError::Invalid(vec![]).into();
        assert_eq!(err.code(), 12);
    }
}

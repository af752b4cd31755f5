//! Pipeline configuration types.
//!
//! One immutable `PipelineConfig` is built at startup and passed by reference
//! into every stage. Sections mirror the on-disk layout:
//!
//! ```yaml
//! random_seed: 42
//! data: { baseline_file: ..., monthly_file: ... }
//! paths: { processed_dir: ..., model_dir: ..., predictions_dir: ... }
//! columns: { id_col: ..., date_col: ..., monthly_shock_events: [...], ... }
//! features: { shock_rolling_months: 3, include_shock_counts: true }
//! label: { source: synthetic, base_rate: 0.1, ... }
//! training: { test_size: 0.2, stratify: true }
//! model: { type: logistic_regression, params: { logistic_regression: { C: 1.0 } } }
//! ```

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::label::LabelConfig;
use crate::validate::ValidationError;

/// Name of the per-period aggregate shock column.
pub const SHOCK_COUNT_COLUMN: &str = "shock_count";

/// Keys that must be present in a configuration file. Everything else falls
/// back to the documented defaults.
pub(crate) const REQUIRED_KEYS: &[&str] = &[
    "data.baseline_file",
    "data.monthly_file",
    "columns.id_col",
    "columns.date_col",
    "columns.monthly_shock_events",
    "columns.baseline_features",
    "columns.label_col",
];

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for every random draw (labels, train/test split, synthetic data).
    pub random_seed: u64,
    pub data: DataConfig,
    pub paths: PathsConfig,
    pub columns: ColumnsConfig,
    pub features: FeaturesConfig,
    pub label: LabelConfig,
    pub training: TrainingConfig,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            random_seed: 42,
            data: DataConfig::default(),
            paths: PathsConfig::default(),
            columns: ColumnsConfig::default(),
            features: FeaturesConfig::default(),
            label: LabelConfig::default(),
            training: TrainingConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DataConfig {
    pub baseline_file: PathBuf,
    pub monthly_file: PathBuf,
    /// Observed outcome labels; required when `label.source` is `observed`.
    pub labels_file: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            baseline_file: PathBuf::from("data/raw/baseline.csv"),
            monthly_file: PathBuf::from("data/raw/monthly_shocks.csv"),
            labels_file: None,
        }
    }
}

/// Output directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PathsConfig {
    pub processed_dir: PathBuf,
    pub model_dir: PathBuf,
    pub predictions_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            processed_dir: PathBuf::from("data/processed"),
            model_dir: PathBuf::from("models"),
            predictions_dir: PathBuf::from("predictions"),
        }
    }
}

impl PathsConfig {
    pub fn dataset_path(&self) -> PathBuf {
        self.processed_dir.join("dataset.parquet")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.processed_dir.join("dataset.summary.json")
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join("model.json")
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.predictions_dir.join("latest_predictions.csv")
    }
}

/// Column names of the input tables and the output label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColumnsConfig {
    pub id_col: String,
    pub date_col: String,
    /// Binary shock indicators present in the monthly table.
    pub monthly_shock_events: Vec<String>,
    /// Static attributes present in the baseline table.
    pub baseline_features: Vec<String>,
    pub label_col: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            id_col: "household_id".to_string(),
            date_col: "report_date".to_string(),
            monthly_shock_events: ["drought", "flood", "illness", "crop_disease"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            baseline_features: [
                "land_area_hectares",
                "livestock_units",
                "floodplain_exposure",
                "secondary_house",
                "head_age",
                "head_gender_female",
                "head_education_years",
                "head_disability",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            label_col: "food_insecure_next_month".to_string(),
        }
    }
}

/// Rolling-window feature settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Trailing window length W in periods (months).
    pub shock_rolling_months: usize,
    /// Whether to emit `shock_count` and its rolled sum.
    pub include_shock_counts: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            shock_rolling_months: 3,
            include_shock_counts: true,
        }
    }
}

/// Train/test split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of labelled rows held out for evaluation.
    pub test_size: f64,
    /// Keep the label ratio equal in both splits.
    pub stratify: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            stratify: true,
        }
    }
}

/// Supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::LogisticRegression => write!(f, "logistic_regression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(rename = "type")]
    pub kind: ModelKind,
    pub params: ModelParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::LogisticRegression,
            params: ModelParams::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModelParams {
    pub logistic_regression: LogisticRegressionParams,
}

/// L2-regularized logistic regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LogisticRegressionParams {
    /// Inverse regularization strength.
    #[serde(rename = "C")]
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop when the loss improves by less than this between iterations.
    pub tolerance: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.5,
            tolerance: 1e-7,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file (YAML, or JSON when the extension is `.json`).
    ///
    /// Required keys are checked before deserialization so a missing key is
    /// reported by its dotted path rather than as a generic parse failure.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| ValidationError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::parse_json(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }

    pub fn parse_yaml(yaml: &str) -> Result<Self, ValidationError> {
        let value: serde_json::Value =
            serde_yaml::from_str(yaml).map_err(|e| ValidationError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn parse_json(json: &str) -> Result<Self, ValidationError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ValidationError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        for key in REQUIRED_KEYS {
            if lookup(&value, key).map_or(true, |v| v.is_null()) {
                return Err(ValidationError::MissingKey(key.to_string()));
            }
        }
        serde_json::from_value(value).map_err(|e| ValidationError::Parse(e.to_string()))
    }

    /// Window length W.
    pub fn window(&self) -> usize {
        self.features.shock_rolling_months
    }

    /// Name of the rolled column for a shock indicator (or `shock_count`).
    pub fn rolled_column(&self, indicator: &str) -> String {
        format!("{indicator}_roll{}", self.window())
    }

    /// Columns fed to the model, in a stable order: baseline attributes,
    /// rolled indicators, then the aggregate count and its roll.
    pub fn model_feature_columns(&self) -> Vec<String> {
        let mut cols = self.columns.baseline_features.clone();
        cols.extend(
            self.columns
                .monthly_shock_events
                .iter()
                .map(|c| self.rolled_column(c)),
        );
        if self.features.include_shock_counts {
            cols.push(SHOCK_COUNT_COLUMN.to_string());
            cols.push(self.rolled_column(SHOCK_COUNT_COLUMN));
        }
        cols
    }
}

fn lookup<'a>(value: &'a serde_json::Value, dotted: &str) -> Option<&'a serde_json::Value> {
    dotted
        .split('.')
        .try_fold(value, |node, segment| node.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
data:
  baseline_file: in/baseline.csv
  monthly_file: in/monthly.csv
columns:
  id_col: hh
  date_col: month
  monthly_shock_events: [drought, flood]
  baseline_features: [land_area_hectares]
  label_col: y
"#
    }

    #[test]
    fn parse_minimal_yaml_fills_defaults() {
        let cfg = PipelineConfig::parse_yaml(minimal_yaml()).unwrap();
        assert_eq!(cfg.columns.id_col, "hh");
        assert_eq!(cfg.columns.monthly_shock_events, vec!["drought", "flood"]);
        assert_eq!(cfg.window(), 3);
        assert!(cfg.features.include_shock_counts);
        assert_eq!(cfg.random_seed, 42);
        assert_eq!(cfg.paths.dataset_path(), PathBuf::from("data/processed/dataset.parquet"));
    }

    #[test]
    fn missing_required_key_is_reported_by_path() {
        let yaml = minimal_yaml().replace("  label_col: y\n", "");
        match PipelineConfig::parse_yaml(&yaml) {
            Err(ValidationError::MissingKey(key)) => assert_eq!(key, "columns.label_col"),
            other => panic!("expected missing key, got {other:?}"),
        }
    }

    #[test]
    fn null_required_key_counts_as_missing() {
        let yaml = minimal_yaml().replace("id_col: hh", "id_col: ~");
        assert!(matches!(
            PipelineConfig::parse_yaml(&yaml),
            Err(ValidationError::MissingKey(_))
        ));
    }

    #[test]
    fn parse_json_with_model_params() {
        let json = r#"{
            "random_seed": 7,
            "data": {"baseline_file": "b.csv", "monthly_file": "m.csv"},
            "columns": {
                "id_col": "id", "date_col": "d",
                "monthly_shock_events": ["drought"],
                "baseline_features": [], "label_col": "y"
            },
            "features": {"shock_rolling_months": 6},
            "model": {"type": "logistic_regression",
                      "params": {"logistic_regression": {"C": 0.5, "max_iter": 50}}}
        }"#;
        let cfg = PipelineConfig::parse_json(json).unwrap();
        assert_eq!(cfg.random_seed, 7);
        assert_eq!(cfg.rolled_column("drought"), "drought_roll6");
        assert_eq!(cfg.model.params.logistic_regression.c, 0.5);
        assert_eq!(cfg.model.params.logistic_regression.max_iter, 50);
        assert_eq!(cfg.model.kind, ModelKind::LogisticRegression);
    }

    #[test]
    fn model_feature_columns_order() {
        let cfg = PipelineConfig::parse_yaml(minimal_yaml()).unwrap();
        assert_eq!(
            cfg.model_feature_columns(),
            vec![
                "land_area_hectares",
                "drought_roll3",
                "flood_roll3",
                "shock_count",
                "shock_count_roll3"
            ]
        );
    }

    #[test]
    fn model_feature_columns_without_counts() {
        let mut cfg = PipelineConfig::parse_yaml(minimal_yaml()).unwrap();
        cfg.features.include_shock_counts = false;
        assert!(!cfg.model_feature_columns().iter().any(|c| c.starts_with("shock_count")));
    }

    #[test]
    fn from_file_nonexistent() {
        let result = PipelineConfig::from_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ValidationError::Io { .. })));
    }

    #[test]
    fn from_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let json = serde_json::to_string(&PipelineConfig::default()).unwrap();
        std::fs::write(&path, json).unwrap();
        let cfg = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }
}

//! Batch prediction for the latest month and single-row scoring.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rew_common::{EntityId, Error, Result};
use rew_config::PipelineConfig;
use rew_store::{read_parquet, Table};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::ModelBundle;
use crate::train::feature_matrix;

/// Output column holding the predicted probability.
pub const PROBABILITY_COLUMN: &str = "prob_food_insecure_next_month";

/// Probability at or above which an entity counts as high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.5;

/// Score of one entity's most recent month.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestPrediction {
    pub entity_id: EntityId,
    pub period: NaiveDate,
    pub probability: f64,
}

/// What a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub path: PathBuf,
    pub entities: usize,
    pub high_risk: usize,
    pub high_risk_share: f64,
    pub latest_period: Option<NaiveDate>,
}

/// Index of each entity's latest-period row, ordered by entity.
pub fn latest_rows(table: &Table, id_col: &str, date_col: &str) -> Result<Vec<usize>> {
    let ids = table
        .column(id_col)
        .and_then(|c| c.as_i64())
        .ok_or_else(|| Error::missing_column("dataset", id_col))?;
    let dates = table
        .column(date_col)
        .and_then(|c| c.as_dates())
        .ok_or_else(|| Error::missing_column("dataset", date_col))?;

    let mut latest: BTreeMap<i64, (NaiveDate, usize)> = BTreeMap::new();
    for (row, (id, date)) in ids.iter().zip(dates).enumerate() {
        let (Some(id), Some(date)) = (*id, *date) else {
            return Err(Error::Schema(format!(
                "dataset row {row} has a null {id_col} or {date_col}"
            )));
        };
        let entry = latest.entry(id).or_insert((date, row));
        if date > entry.0 {
            *entry = (date, row);
        }
    }
    Ok(latest.into_values().map(|(_, row)| row).collect())
}

/// Score every entity's latest month with `bundle`.
pub fn predict_latest(
    bundle: &ModelBundle,
    table: &Table,
    id_col: &str,
    date_col: &str,
) -> Result<Vec<LatestPrediction>> {
    let rows = latest_rows(table, id_col, date_col)?;
    let (matrix, filled) = feature_matrix(table, &bundle.model.features)?;
    let filled = filled.sum();
    if filled > 0 {
        warn!(cells = filled, "missing feature values filled with 0");
    }
    let ids = table.column(id_col).and_then(|c| c.as_i64()).unwrap_or_default();
    let dates = table.column(date_col).and_then(|c| c.as_dates()).unwrap_or_default();
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            Some(LatestPrediction {
                entity_id: EntityId((*ids.get(row)?)?),
                period: (*dates.get(row)?)?,
                probability: bundle.model.predict_row(matrix.row(row)),
            })
        })
        .collect())
}

/// Write `{id_col},prob_food_insecure_next_month` rows.
pub fn write_predictions(path: &Path, id_col: &str, predictions: &[LatestPrediction]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    writer
        .write_record([id_col, PROBABILITY_COLUMN])
        .map_err(|e| Error::csv(path, e))?;
    for p in predictions {
        writer
            .write_record([p.entity_id.to_string(), p.probability.to_string()])
            .map_err(|e| Error::csv(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

/// Load the model and dataset named by `config`, score the latest month of
/// every entity and write the predictions CSV.
pub fn predict_batch(config: &PipelineConfig) -> Result<BatchSummary> {
    let bundle = ModelBundle::load(&config.paths.model_path())?;
    let table = read_parquet(&config.paths.dataset_path())?;
    let cols = &config.columns;
    let predictions = predict_latest(&bundle, &table, &cols.id_col, &cols.date_col)?;

    let path = config.paths.predictions_path();
    write_predictions(&path, &cols.id_col, &predictions)?;

    let high_risk = predictions
        .iter()
        .filter(|p| p.probability >= HIGH_RISK_THRESHOLD)
        .count();
    let entities = predictions.len();
    let summary = BatchSummary {
        path,
        entities,
        high_risk,
        high_risk_share: if entities == 0 {
            0.0
        } else {
            high_risk as f64 / entities as f64
        },
        latest_period: predictions.iter().map(|p| p.period).max(),
    };
    info!(
        path = %summary.path.display(),
        entities,
        high_risk,
        high_risk_share = summary.high_risk_share,
        "predictions written"
    );
    Ok(summary)
}

/// Result of scoring one feature map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    #[serde(rename = "prob_food_insecure_next_month")]
    pub probability: f64,
    #[serde(skip)]
    pub defaulted: Vec<String>,
}

/// Parse a JSON object of feature values. Booleans map to 1/0 and nulls are
/// treated as absent.
pub fn parse_features(json: &str) -> Result<BTreeMap<String, f64>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::Schema("feature payload must be a JSON object".to_string()))?;
    let mut features = BTreeMap::new();
    for (name, v) in object {
        let number = match v {
            serde_json::Value::Null => continue,
            serde_json::Value::Bool(b) => f64::from(u8::from(*b)),
            serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| {
                Error::Schema(format!("feature '{name}' is not representable as f64"))
            })?,
            other => {
                return Err(Error::Schema(format!(
                    "feature '{name}' must be numeric, got {other}"
                )))
            }
        };
        features.insert(name.clone(), number);
    }
    Ok(features)
}

/// Score one feature map. Missing expected features count as 0.
pub fn score(bundle: &ModelBundle, features: &BTreeMap<String, f64>) -> Score {
    let (probability, defaulted) = bundle.model.predict_map(features);
    if !defaulted.is_empty() {
        info!(missing = ?defaulted, "expected features absent, defaulted to 0");
    }
    let unknown: Vec<&String> = features
        .keys()
        .filter(|k| !bundle.model.features.contains(*k))
        .collect();
    if !unknown.is_empty() {
        warn!(ignored = ?unknown, "unexpected features ignored");
    }
    Score {
        probability,
        defaulted,
    }
}

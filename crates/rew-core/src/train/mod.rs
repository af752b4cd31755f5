//! The training stage.
//!
//! Reads the persisted dataset, fits a standardized logistic regression on a
//! seeded split and evaluates it on the held-out rows.

pub mod logistic;
pub mod scaler;
pub mod split;

use ndarray::{Array1, Array2, Axis};
use rew_common::{Error, Result};
use rew_config::snapshot::config_hash;
use rew_config::PipelineConfig;
use rew_math::{roc_auc, BinaryClassificationReport};
use rew_store::{read_parquet, MetadataKey, Table};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{ModelBundle, Provenance, ScoringModel};
use logistic::LogisticRegression;
use scaler::StandardScaler;
use split::train_test_split;

/// Decision threshold for the classification report.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Held-out evaluation and fit diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub n_train: usize,
    pub n_test: usize,
    pub train_positives: usize,
    pub test_positives: usize,
    /// `None` when the test split holds a single class.
    pub roc_auc: Option<f64>,
    pub classification: Option<BinaryClassificationReport>,
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
    /// Feature cells that were missing and filled with 0.
    pub filled_missing: usize,
    /// Dataset rows skipped because their label is null.
    pub skipped_unlabeled: usize,
}

/// Feature matrix of the labelled rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    pub features: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<u8>,
    pub filled_missing: usize,
    pub skipped_unlabeled: usize,
}

/// Extract `features` from a dataset table, one column per feature. Missing
/// or non-finite cells become 0; a per-row count of such cells is returned
/// alongside.
pub fn feature_matrix(table: &Table, features: &[String]) -> Result<(Array2<f64>, Array1<usize>)> {
    let mut x = Array2::zeros((table.num_rows(), features.len()));
    let mut filled = Array1::zeros(table.num_rows());
    for (mut target, name) in x.columns_mut().into_iter().zip(features) {
        let column = table
            .column(name)
            .ok_or_else(|| Error::missing_column("dataset", name))?;
        let values = column
            .as_f64()
            .ok_or_else(|| Error::Schema(format!("dataset column '{name}' is not numeric")))?;
        for ((cell, count), value) in target.iter_mut().zip(filled.iter_mut()).zip(values) {
            match value.filter(|v| v.is_finite()) {
                Some(v) => *cell = v,
                None => *count += 1,
            }
        }
    }
    Ok((x, filled))
}

fn labels(table: &Table, label_col: &str) -> Result<Vec<Option<u8>>> {
    let column = table
        .column(label_col)
        .ok_or_else(|| Error::missing_column("dataset", label_col))?;
    let values = column
        .as_f64()
        .ok_or_else(|| Error::Schema(format!("label column '{label_col}' is not numeric")))?;
    values
        .into_iter()
        .map(|v| match v {
            None => Ok(None),
            Some(x) if x == 0.0 => Ok(Some(0)),
            Some(x) if x == 1.0 => Ok(Some(1)),
            Some(x) => Err(Error::Schema(format!(
                "label column '{label_col}' holds non-binary value {x}"
            ))),
        })
        .collect()
}

impl TrainingData {
    pub fn from_table(table: &Table, features: &[String], label_col: &str) -> Result<Self> {
        let (x, filled) = feature_matrix(table, features)?;
        let labels = labels(table, label_col)?;
        let labelled: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter_map(|(row, l)| l.map(|_| row))
            .collect();
        let y: Array1<u8> = labels.iter().flatten().copied().collect();
        Ok(Self {
            features: features.to_vec(),
            x: x.select(Axis(0), &labelled),
            y,
            filled_missing: labelled.iter().map(|&row| filled[row]).sum(),
            skipped_unlabeled: labels.len() - labelled.len(),
        })
    }

    pub fn positives(&self) -> usize {
        self.y.iter().filter(|&&l| l == 1).count()
    }
}

/// Fit and evaluate a model on a dataset table.
pub fn train(config: &PipelineConfig, table: &Table) -> Result<ModelBundle> {
    let features = config.model_feature_columns();
    let data = TrainingData::from_table(table, &features, &config.columns.label_col)?;
    if data.y.is_empty() {
        return Err(Error::Training("dataset has no labelled rows".to_string()));
    }
    let positives = data.positives();
    if positives == 0 || positives == data.y.len() {
        return Err(Error::Training(format!(
            "labels contain a single class ({} rows, {positives} positive)",
            data.y.len()
        )));
    }
    if data.filled_missing > 0 {
        warn!(cells = data.filled_missing, "missing feature values filled with 0");
    }

    let split = train_test_split(
        data.y.view(),
        config.training.test_size,
        config.training.stratify,
        config.random_seed,
    )?;
    let pick = |idx: &[usize]| (data.x.select(Axis(0), idx), data.y.select(Axis(0), idx));
    let (x_train, y_train) = pick(&split.train);
    let (x_test, y_test) = pick(&split.test);

    let scaler = StandardScaler::fit(&x_train);
    let fit = LogisticRegression::fit(
        &scaler.transform(&x_train),
        &y_train,
        &config.model.params.logistic_regression,
    )?;
    let model = ScoringModel {
        features,
        scaler,
        classifier: fit.model,
    };

    let probs = model.predict_matrix(&x_test);
    let auc = roc_auc(&y_test, &probs);
    if auc.is_none() {
        warn!("test split holds a single class; ROC AUC undefined");
    }
    let predicted = probs.mapv(|p| u8::from(p >= DECISION_THRESHOLD));
    let metrics = TrainingMetrics {
        n_train: y_train.len(),
        n_test: y_test.len(),
        train_positives: y_train.iter().filter(|&&l| l == 1).count(),
        test_positives: y_test.iter().filter(|&&l| l == 1).count(),
        roc_auc: auc,
        classification: Some(BinaryClassificationReport::from_predictions(&y_test, &predicted)),
        iterations: fit.iterations,
        converged: fit.converged,
        final_loss: fit.loss,
        filled_missing: data.filled_missing,
        skipped_unlabeled: data.skipped_unlabeled,
    };
    info!(
        n_train = metrics.n_train,
        n_test = metrics.n_test,
        roc_auc = metrics.roc_auc.unwrap_or(f64::NAN),
        iterations = metrics.iterations,
        "model trained"
    );

    let provenance = Provenance {
        dataset_run_id: table.metadata_value(MetadataKey::RunId.as_str()).map(str::to_string),
        config_hash: config_hash(config),
        label_col: config.columns.label_col.clone(),
        id_col: config.columns.id_col.clone(),
        date_col: config.columns.date_col.clone(),
    };
    ModelBundle::new(model, metrics, provenance)
}

/// Train from the persisted dataset and save the bundle to `paths.model_dir`.
pub fn train_model(config: &PipelineConfig) -> Result<ModelBundle> {
    config.validate().into_result()?;
    let dataset_path = config.paths.dataset_path();
    let table = read_parquet(&dataset_path)?;
    info!(path = %dataset_path.display(), rows = table.num_rows(), "dataset loaded for training");
    let bundle = train(config, &table)?;
    bundle.save(&config.paths.model_path())?;
    Ok(bundle)
}

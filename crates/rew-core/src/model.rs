//! Trained model artifact.
//!
//! A `ModelBundle` is a JSON document holding everything needed to score a
//! row: the ordered feature list, the scaler and the logistic weights. The
//! scoring part is covered by a SHA-256 hash that is checked on every load,
//! so a hand-edited or truncated artifact is rejected instead of silently
//! producing different probabilities.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, ArrayView1};
use rew_common::{Error, Result};
use rew_config::ModelKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::train::logistic::LogisticRegression;
use crate::train::scaler::StandardScaler;
use crate::train::TrainingMetrics;

/// Current bundle format version.
pub const BUNDLE_VERSION: &str = "1.0.0";

/// The part of a bundle that determines predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringModel {
    pub features: Vec<String>,
    pub scaler: StandardScaler,
    pub classifier: LogisticRegression,
}

impl ScoringModel {
    /// Probability for one row given in feature order.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.classifier
            .predict_proba_row(self.scaler.transform_row(row).view())
            .clamp(0.0, 1.0)
    }

    /// Probabilities for every row of `x`, columns in feature order.
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Array1<f64> {
        self.classifier
            .predict_proba(&self.scaler.transform(x))
            .mapv(|p| p.clamp(0.0, 1.0))
    }

    /// Probability for a named feature map. Expected features that are
    /// absent (or non-finite) count as 0; the defaulted names are returned.
    pub fn predict_map(&self, values: &BTreeMap<String, f64>) -> (f64, Vec<String>) {
        let mut defaulted = Vec::new();
        let row: Array1<f64> = self
            .features
            .iter()
            .map(|name| match values.get(name) {
                Some(v) if v.is_finite() => *v,
                _ => {
                    defaulted.push(name.clone());
                    0.0
                }
            })
            .collect();
        (self.predict_row(row.view()), defaulted)
    }
}

/// Where the training data came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub dataset_run_id: Option<String>,
    pub config_hash: String,
    pub label_col: String,
    pub id_col: String,
    pub date_col: String,
}

/// Serialized trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub bundle_version: String,
    pub created_at: DateTime<Utc>,
    pub model_type: ModelKind,
    pub model: ScoringModel,
    /// SHA-256 of the JSON-serialized `model` field.
    pub model_hash: String,
    pub metrics: TrainingMetrics,
    pub provenance: Provenance,
}

impl ModelBundle {
    pub fn new(model: ScoringModel, metrics: TrainingMetrics, provenance: Provenance) -> Result<Self> {
        let model_hash = model_hash(&model)?;
        Ok(Self {
            bundle_version: BUNDLE_VERSION.to_string(),
            created_at: Utc::now(),
            model_type: ModelKind::LogisticRegression,
            model,
            model_hash,
            metrics,
            provenance,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: Self =
            serde_json::from_str(json).map_err(|e| Error::Model(format!("invalid model bundle: {e}")))?;
        bundle.verify_integrity()?;
        Ok(bundle)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the format version, shape and hash.
    pub fn verify_integrity(&self) -> Result<()> {
        if self.bundle_version != BUNDLE_VERSION {
            return Err(Error::Model(format!(
                "unsupported bundle version {} (expected {BUNDLE_VERSION})",
                self.bundle_version
            )));
        }
        let n = self.model.features.len();
        if self.model.scaler.means.len() != n
            || self.model.scaler.scales.len() != n
            || self.model.classifier.coefficients.len() != n
        {
            return Err(Error::Model(format!(
                "bundle has {n} features but mismatched scaler/coefficient lengths"
            )));
        }
        let actual = model_hash(&self.model)?;
        if actual != self.model_hash {
            return Err(Error::ModelIntegrity {
                expected: self.model_hash.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Write the bundle, creating the directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), features = self.model.features.len(), "model saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            Error::Model(format!("cannot read model bundle {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

fn model_hash(model: &ScoringModel) -> Result<String> {
    let json = serde_json::to_vec(model)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}

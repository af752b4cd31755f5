//! Config snapshots recorded with every persisted dataset.
//!
//! The hash covers the canonical JSON form of the whole configuration, so two
//! datasets built with identical settings carry identical hashes regardless of
//! file formatting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::pipeline::PipelineConfig;
use crate::resolve::ConfigSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// SHA-256 of the canonical JSON config.
    pub config_hash: String,
    pub source: String,
    pub captured_at: DateTime<Utc>,
    pub config: PipelineConfig,
}

impl ConfigSnapshot {
    pub fn capture(config: &PipelineConfig, source: &ConfigSource) -> Self {
        Self {
            config_hash: config_hash(config),
            source: source.to_string(),
            captured_at: Utc::now(),
            config: config.clone(),
        }
    }
}

/// SHA-256 hex digest of the canonical JSON config.
pub fn config_hash(config: &PipelineConfig) -> String {
    // Struct field order is fixed, so serde_json output is canonical.
    let json = serde_json::to_vec(config).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&json);
    hex::encode(hasher.finalize())
}

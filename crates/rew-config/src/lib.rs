//! Resilience Early Warning configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the pipeline configuration file (YAML or JSON)
//! - Config resolution (CLI → env → working directory → XDG → defaults)
//! - Required-key checks and semantic validation
//! - Config snapshots recorded alongside persisted datasets

pub mod label;
pub mod pipeline;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use label::{CapacityTerm, Condition, LabelConfig, LabelSourceKind, ShockTerm};
pub use pipeline::{
    ColumnsConfig, DataConfig, FeaturesConfig, LogisticRegressionParams, ModelConfig, ModelKind,
    ModelParams, PathsConfig, PipelineConfig, TrainingConfig, SHOCK_COUNT_COLUMN,
};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource, ResolvedConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{ValidationError, ValidationIssue, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REW_CONFIG";

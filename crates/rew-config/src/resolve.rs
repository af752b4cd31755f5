//! Config file resolution.
//!
//! Resolution order, first match wins:
//! 1. `--config` on the command line (must exist)
//! 2. `REW_CONFIG` environment variable (must exist)
//! 3. `./config/config.yaml`
//! 4. `$XDG_CONFIG_HOME/resilience_early_warning/config.yaml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::pipeline::PipelineConfig;
use crate::validate::ValidationError;
use crate::CONFIG_ENV_VAR;

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    Cli(PathBuf),
    Env(PathBuf),
    WorkingDir(PathBuf),
    Xdg(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Cli(p) => write!(f, "cli:{}", p.display()),
            ConfigSource::Env(p) => write!(f, "env:{}", p.display()),
            ConfigSource::WorkingDir(p) => write!(f, "cwd:{}", p.display()),
            ConfigSource::Xdg(p) => write!(f, "xdg:{}", p.display()),
            ConfigSource::Defaults => write!(f, "defaults"),
        }
    }
}

/// Candidate locations, separated from the process environment for tests.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub cli: Option<PathBuf>,
    pub env: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub xdg: Option<PathBuf>,
}

impl ConfigPaths {
    /// Candidates derived from the real process environment.
    pub fn from_env(cli: Option<&Path>) -> Self {
        Self {
            cli: cli.map(Path::to_path_buf),
            env: std::env::var_os(CONFIG_ENV_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            working_dir: Some(PathBuf::from("config/config.yaml")),
            xdg: dirs::config_dir()
                .map(|d| d.join("resilience_early_warning").join("config.yaml")),
        }
    }
}

/// A loaded configuration together with its origin and non-fatal findings.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: PipelineConfig,
    pub source: ConfigSource,
    pub warnings: Vec<crate::ValidationIssue>,
}

/// Find, load and validate the configuration.
///
/// Explicit locations (CLI, env) that do not exist are errors; implicit ones
/// are skipped.
pub fn resolve_config(paths: &ConfigPaths) -> Result<ResolvedConfig, ValidationError> {
    let (config, source) = if let Some(path) = &paths.cli {
        (load_explicit(path)?, ConfigSource::Cli(path.clone()))
    } else if let Some(path) = &paths.env {
        (load_explicit(path)?, ConfigSource::Env(path.clone()))
    } else if let Some(path) = paths.working_dir.as_ref().filter(|p| p.is_file()) {
        (PipelineConfig::from_file(path)?, ConfigSource::WorkingDir(path.clone()))
    } else if let Some(path) = paths.xdg.as_ref().filter(|p| p.is_file()) {
        (PipelineConfig::from_file(path)?, ConfigSource::Xdg(path.clone()))
    } else {
        debug!("no config file found, using built-in defaults");
        (PipelineConfig::default(), ConfigSource::Defaults)
    };

    let warnings = config.validate().into_result()?;
    info!(source = %source, warnings = warnings.len(), "configuration loaded");
    Ok(ResolvedConfig {
        config,
        source,
        warnings,
    })
}

fn load_explicit(path: &Path) -> Result<PipelineConfig, ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::NotFound(path.to_path_buf()));
    }
    PipelineConfig::from_file(path)
}

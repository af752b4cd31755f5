//! Command-line interface for `rew`.
//!
//! Each subcommand runs one pipeline stage against the resolved configuration
//! and prints its result to stdout. Logs and error messages go to stderr.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use rew_common::{Error, Result};
use rew_config::{resolve_config, ConfigPaths, ConfigSnapshot, PipelineConfig, ResolvedConfig, ValidationError};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::exit_codes::ExitCode;
use crate::logging::LogFormat;
use crate::model::ModelBundle;
use crate::panel::parse_period;
use crate::predict::{parse_features, predict_batch, score};
use crate::synth::{self, SynthOptions};
use crate::{pipeline, train};

/// Resilience early warning: panel features, labels, training and scoring
#[derive(Parser, Debug)]
#[command(name = "rew", version, about, propagate_version = true)]
pub struct Cli {
    /// Config file (YAML or JSON); falls back to REW_CONFIG, ./config/config.yaml, XDG, defaults
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Result format on stdout
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Result rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate synthetic baseline and monthly shock CSVs
    Synth(SynthArgs),
    /// Build the labelled dataset from the input tables
    Preprocess,
    /// Train and evaluate a model on the persisted dataset
    Train,
    /// Score the latest month of every entity in the dataset
    Predict,
    /// Score a single feature map given as JSON
    Score(ScoreArgs),
    /// Preview the first rows of the persisted dataset
    Inspect(InspectArgs),
    /// Inspect or validate configuration
    Config(ConfigArgs),
    /// Inspect the trained model
    Model(ModelArgs),
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Number of households
    #[arg(long, default_value_t = 1500)]
    pub households: usize,
    /// Number of consecutive months
    #[arg(long, default_value_t = 18)]
    pub months: u32,
    /// First month (YYYY-MM or YYYY-MM-DD)
    #[arg(long, default_value = "2016-01")]
    pub start: String,
    /// Random seed; defaults to the configured random_seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Write baseline.csv and monthly_shocks.csv here instead of the configured data paths
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Feature map as a JSON object; read from --file or stdin when omitted
    pub features: Option<String>,
    /// Read the feature map from a file
    #[arg(long, value_name = "PATH", conflicts_with = "features")]
    pub file: Option<PathBuf>,
    /// Model bundle to use instead of the configured one
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Number of rows to show
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Parquet file to preview instead of the configured dataset
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved configuration with its source and hash
    Show,
    /// Validate the configuration and report every finding
    Validate,
    /// Print the JSON Schema of the configuration file
    Schema,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    #[command(subcommand)]
    pub command: ModelCommands,
}

#[derive(Subcommand, Debug)]
pub enum ModelCommands {
    /// Verify and summarize a model bundle
    Show {
        /// Bundle path instead of the configured one
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

/// Run a parsed command line and map the outcome to an exit code.
pub fn run(cli: &Cli) -> ExitCode {
    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            let code = ExitCode::from_error(&e);
            error!(code = e.code(), error = %e, "command failed");
            eprintln!("rew: {e}");
            code
        }
    }
}

fn dispatch(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Synth(args) => run_synth(cli, args),
        Commands::Preprocess => run_preprocess(cli),
        Commands::Train => run_train(cli),
        Commands::Predict => run_predict(cli),
        Commands::Score(args) => run_score(cli, args),
        Commands::Inspect(args) => run_inspect(cli, args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(cli),
            ConfigCommands::Validate => run_config_validate(cli),
            ConfigCommands::Schema => {
                let schema = schemars::schema_for!(PipelineConfig);
                println!("{}", serde_json::to_string_pretty(&schema)?);
                Ok(ExitCode::Clean)
            }
        },
        Commands::Model(args) => match &args.command {
            ModelCommands::Show { path } => run_model_show(cli, path.as_deref()),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "rew", &mut io::stdout());
            Ok(ExitCode::Clean)
        }
    }
}

fn resolve(cli: &Cli) -> Result<ResolvedConfig> {
    let resolved = resolve_config(&ConfigPaths::from_env(cli.config.as_deref()))?;
    for issue in &resolved.warnings {
        warn!(path = %issue.path, "{}", issue.message);
    }
    Ok(resolved)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_synth(cli: &Cli, args: &SynthArgs) -> Result<ExitCode> {
    let config = resolve(cli)?.config;
    let start = parse_period(&args.start)
        .ok_or_else(|| Error::InvalidConfig(format!("unrecognized start month '{}'", args.start)))?;
    let options = SynthOptions {
        households: args.households,
        months: args.months,
        start,
        seed: args.seed.unwrap_or(config.random_seed),
        id_col: config.columns.id_col.clone(),
        date_col: config.columns.date_col.clone(),
    };
    let (baseline, monthly) = match &args.out_dir {
        Some(dir) => (dir.join("baseline.csv"), dir.join("monthly_shocks.csv")),
        None => (config.data.baseline_file.clone(), config.data.monthly_file.clone()),
    };
    let summary = synth::generate(&options, &baseline, &monthly)?;
    match cli.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => println!(
            "wrote {} households x {} months to {} and {}",
            summary.households,
            summary.months,
            summary.baseline_path.display(),
            summary.monthly_path.display()
        ),
    }
    Ok(ExitCode::Clean)
}

fn run_preprocess(cli: &Cli) -> Result<ExitCode> {
    let config = resolve(cli)?.config;
    let summary = pipeline::preprocess(&config)?;
    match cli.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            println!("run {}", summary.run_id);
            println!(
                "{} rows, {} entities, window {} months",
                summary.output_rows, summary.entities, summary.window
            );
            match summary.label_prevalence {
                Some(p) => println!("labels ({}): {:.4} positive", summary.label_source, p),
                None => println!("labels ({}): none", summary.label_source),
            }
            println!("data-quality warnings: {}", summary.data_quality.total_warnings());
            println!("dataset: {}", summary.dataset_path.display());
        }
    }
    Ok(if summary.data_quality.is_clean() {
        ExitCode::Clean
    } else {
        ExitCode::CompletedWithWarnings
    })
}

fn run_train(cli: &Cli) -> Result<ExitCode> {
    let config = resolve(cli)?.config;
    let bundle = train::train_model(&config)?;
    let metrics = &bundle.metrics;
    match cli.format {
        OutputFormat::Json => print_json(&json!({
            "model_path": config.paths.model_path(),
            "model_hash": bundle.model_hash,
            "features": bundle.model.features,
            "metrics": metrics,
        }))?,
        OutputFormat::Text => {
            match metrics.roc_auc {
                Some(auc) => println!("ROC AUC: {auc:.4}"),
                None => println!("ROC AUC: undefined (single-class test split)"),
            }
            if let Some(report) = &metrics.classification {
                println!("{report}");
            }
            println!("model: {}", config.paths.model_path().display());
        }
    }
    Ok(if metrics.converged {
        ExitCode::Clean
    } else {
        ExitCode::CompletedWithWarnings
    })
}

fn run_predict(cli: &Cli) -> Result<ExitCode> {
    let config = resolve(cli)?.config;
    let summary = predict_batch(&config)?;
    match cli.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => println!(
            "{} entities scored, {} high risk ({:.1}%), written to {}",
            summary.entities,
            summary.high_risk,
            summary.high_risk_share * 100.0,
            summary.path.display()
        ),
    }
    Ok(ExitCode::Clean)
}

fn read_payload(args: &ScoreArgs) -> Result<String> {
    if let Some(inline) = &args.features {
        return Ok(inline.clone());
    }
    if let Some(path) = &args.file {
        return Ok(fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn run_score(cli: &Cli, args: &ScoreArgs) -> Result<ExitCode> {
    let model_path = match &args.model {
        Some(path) => path.clone(),
        None => resolve(cli)?.config.paths.model_path(),
    };
    let bundle = ModelBundle::load(&model_path)?;
    let features = parse_features(&read_payload(args)?)?;
    let result = score(&bundle, &features);
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&result)?),
        OutputFormat::Text => println!("{:.6}", result.probability),
    }
    Ok(ExitCode::Clean)
}

fn run_inspect(cli: &Cli, args: &InspectArgs) -> Result<ExitCode> {
    let path = match &args.path {
        Some(path) => path.clone(),
        None => resolve(cli)?.config.paths.dataset_path(),
    };
    println!("{}", rew_store::preview_parquet(&path, args.rows)?);
    Ok(ExitCode::Clean)
}

fn run_config_show(cli: &Cli) -> Result<ExitCode> {
    let resolved = resolve(cli)?;
    let snapshot = ConfigSnapshot::capture(&resolved.config, &resolved.source);
    match cli.format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Text => {
            println!("source: {}", snapshot.source);
            println!("hash:   {}", snapshot.config_hash);
            println!("{}", serde_json::to_string_pretty(&snapshot.config)?);
        }
    }
    Ok(ExitCode::Clean)
}

fn run_config_validate(cli: &Cli) -> Result<ExitCode> {
    match resolve_config(&ConfigPaths::from_env(cli.config.as_deref())) {
        Ok(resolved) => {
            print_json(&json!({
                "valid": true,
                "source": resolved.source,
                "errors": [],
                "warnings": resolved.warnings,
            }))?;
            Ok(if resolved.warnings.is_empty() {
                ExitCode::Clean
            } else {
                ExitCode::CompletedWithWarnings
            })
        }
        Err(ValidationError::Invalid(errors)) => {
            print_json(&json!({
                "valid": false,
                "errors": errors,
                "warnings": [],
            }))?;
            Ok(ExitCode::ConfigError)
        }
        Err(other) => Err(other.into()),
    }
}

fn run_model_show(cli: &Cli, path: Option<&Path>) -> Result<ExitCode> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => resolve(cli)?.config.paths.model_path(),
    };
    let bundle = ModelBundle::load(&path)?;
    let summary = json!({
        "path": path,
        "bundle_version": bundle.bundle_version,
        "created_at": bundle.created_at,
        "model_type": bundle.model_type,
        "model_hash": bundle.model_hash,
        "integrity": "verified",
        "features": bundle.model.features,
        "coefficients": bundle.model.classifier.coefficients.to_vec(),
        "intercept": bundle.model.classifier.intercept,
        "metrics": bundle.metrics,
        "provenance": bundle.provenance,
    });
    match cli.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            println!("{} ({})", path.display(), bundle.model_type);
            println!("hash: {} (verified)", bundle.model_hash);
            for (name, w) in bundle
                .model
                .features
                .iter()
                .zip(bundle.model.classifier.coefficients.iter())
            {
                println!("  {name:<32} {w:>10.4}");
            }
            println!("  {:<32} {:>10.4}", "(intercept)", bundle.model.classifier.intercept);
        }
    }
    Ok(ExitCode::Clean)
}

//! Resilience Early Warning core library.
//!
//! Turns a static baseline table and a monthly shock panel into a labelled
//! modelling dataset, trains a logistic-regression classifier on it and
//! scores the latest month of every entity.
//!
//! Stages:
//! - [`pipeline::preprocess`]: load, roll, join, label, persist
//! - [`train::train_model`]: split, standardize, fit, evaluate, save
//! - [`predict::predict_batch`] and [`predict::score`]: batch and single-row scoring

pub mod cli;
pub mod exit_codes;
pub mod join;
pub mod label;
pub mod loader;
pub mod logging;
pub mod model;
pub mod panel;
pub mod pipeline;
pub mod predict;
pub mod quality;
pub mod rolling;
pub mod synth;
pub mod train;

pub use exit_codes::ExitCode;
pub use join::{join_baseline, JoinedPanel};
pub use label::{label_probability, label_source, LabelSource, ObservedLabels, SyntheticLabels};
pub use loader::{load_baseline, load_monthly};
pub use model::ModelBundle;
pub use panel::{BaselineTable, MonthlyRecord, MonthlyTable, SortedMonthly};
pub use pipeline::{build_dataset, preprocess, Dataset, PreprocessSummary};
pub use predict::{predict_batch, score, Score, PROBABILITY_COLUMN};
pub use quality::DataQualityReport;
pub use rolling::{roll_shocks, RolledMonthly};
pub use train::{train, train_model, TrainingMetrics};

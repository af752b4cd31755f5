//! The preprocessing stage: load → roll → join → label → persist.
//!
//! Every run recomputes the dataset in full. Nothing is written until the
//! whole dataset has been built, and the Parquet file itself is written
//! atomically, so a failed run leaves the previous output untouched.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rew_common::{Error, Result, RunId};
use rew_config::snapshot::config_hash;
use rew_config::{LabelSourceKind, PipelineConfig};
use rew_store::{write_parquet, Column, ColumnData, MetadataKey, Table, WriterConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::join::{join_baseline, JoinedPanel};
use crate::label::{label_source, LabelSource};
use crate::loader::{load_baseline, load_monthly};
use crate::panel::{BaselineTable, MonthlyTable, SortedMonthly};
use crate::quality::DataQualityReport;
use crate::rolling::roll_shocks;

/// A labelled dataset: one row per monthly record.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub panel: JoinedPanel,
    pub labels: Vec<Option<u8>>,
    pub label_source: LabelSourceKind,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.panel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panel.is_empty()
    }

    pub fn labelled_rows(&self) -> usize {
        self.labels.iter().flatten().count()
    }

    /// Share of positive labels among labelled rows.
    pub fn prevalence(&self) -> Option<f64> {
        let labelled = self.labelled_rows();
        (labelled > 0).then(|| {
            self.labels.iter().flatten().filter(|&&l| l == 1).count() as f64 / labelled as f64
        })
    }

    /// Columnar form: id (Int64), period (Date32), every feature (Float64),
    /// label (Int32, nullable for observed labels).
    pub fn to_table(&self, config: &PipelineConfig, run_id: &RunId) -> Result<Table> {
        let cols = &config.columns;
        let mut table = Table::new();
        table.push_column(Column::new(
            &cols.id_col,
            ColumnData::Int64(self.panel.entity_ids.iter().map(|id| Some(id.0)).collect()),
        ))?;
        table.push_column(Column::new(
            &cols.date_col,
            ColumnData::Date32(self.panel.periods.iter().copied().map(Some).collect()),
        ))?;
        for feature in &self.panel.columns {
            table.push_column(Column::nullable(
                &feature.name,
                ColumnData::Float64(feature.values.clone()),
            ))?;
        }
        let labels = ColumnData::Int32(self.labels.iter().map(|l| l.map(i32::from)).collect());
        table.push_column(match self.label_source {
            LabelSourceKind::Observed => Column::nullable(&cols.label_col, labels),
            LabelSourceKind::Synthetic => Column::new(&cols.label_col, labels),
        })?;

        table.set_metadata(MetadataKey::RunId.as_str(), run_id.to_string());
        table.set_metadata(MetadataKey::ConfigHash.as_str(), config_hash(config));
        table.set_metadata(MetadataKey::Window.as_str(), self.panel.window.to_string());
        table.set_metadata(MetadataKey::LabelSource.as_str(), self.label_source.to_string());
        table.set_metadata(MetadataKey::IdColumn.as_str(), cols.id_col.as_str());
        table.set_metadata(MetadataKey::DateColumn.as_str(), cols.date_col.as_str());
        table.set_metadata(MetadataKey::LabelColumn.as_str(), cols.label_col.as_str());
        Ok(table)
    }
}

/// Build the labelled dataset from loaded inputs.
pub fn build_dataset(
    config: &PipelineConfig,
    baseline: &BaselineTable,
    monthly: MonthlyTable,
    labels: &dyn LabelSource,
    quality: &mut DataQualityReport,
) -> Result<Dataset> {
    let input_rows = monthly.len();
    let sorted = SortedMonthly::sort(monthly)?;
    let rolled = roll_shocks(
        sorted,
        config.window(),
        config.features.include_shock_counts,
        quality,
    )?;
    let panel = join_baseline(&rolled, baseline, quality);
    let assigned = labels.assign(&panel, quality)?;

    if panel.len() != input_rows || assigned.len() != input_rows {
        return Err(Error::Schema(format!(
            "dataset has {} rows and {} labels for {input_rows} monthly rows",
            panel.len(),
            assigned.len()
        )));
    }
    Ok(Dataset {
        panel,
        labels: assigned,
        label_source: labels.kind(),
    })
}

/// What a preprocessing run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessSummary {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub config_hash: String,
    pub label_source: LabelSourceKind,
    pub window: usize,
    pub monthly_rows: usize,
    pub baseline_entities: usize,
    pub output_rows: usize,
    pub entities: usize,
    pub unmatched_rows: usize,
    pub labelled_rows: usize,
    pub label_prevalence: Option<f64>,
    pub data_quality: DataQualityReport,
    pub dataset_path: PathBuf,
    pub bytes_written: u64,
}

/// Run the whole stage with the inputs named by `config` and write the
/// dataset plus its summary under `paths.processed_dir`.
pub fn preprocess(config: &PipelineConfig) -> Result<PreprocessSummary> {
    config.validate().into_result()?;
    let run_id = RunId::new();
    let span = info_span!("preprocess", run_id = %run_id);
    let _guard = span.enter();

    let baseline = load_baseline(&config.data.baseline_file, config)?;
    let monthly = load_monthly(&config.data.monthly_file, config)?;
    let monthly_rows = monthly.len();
    let source = label_source(config)?;

    let mut quality = DataQualityReport::default();
    let dataset = build_dataset(config, &baseline, monthly, source.as_ref(), &mut quality)?;
    quality.log();

    let table = dataset.to_table(config, &run_id)?;
    let dataset_path = config.paths.dataset_path();
    let bytes_written = write_parquet(&dataset_path, &table, &WriterConfig::default())?;

    let summary = PreprocessSummary {
        run_id,
        created_at: Utc::now(),
        config_hash: config_hash(config),
        label_source: dataset.label_source,
        window: config.window(),
        monthly_rows,
        baseline_entities: baseline.len(),
        output_rows: dataset.len(),
        entities: dataset.panel.entity_count(),
        unmatched_rows: dataset.panel.unmatched_rows,
        labelled_rows: dataset.labelled_rows(),
        label_prevalence: dataset.prevalence(),
        data_quality: quality,
        dataset_path,
        bytes_written,
    };
    let summary_path = config.paths.summary_path();
    fs::write(&summary_path, serde_json::to_vec_pretty(&summary)?)?;

    info!(
        rows = summary.output_rows,
        entities = summary.entities,
        prevalence = summary.label_prevalence.unwrap_or(f64::NAN),
        warnings = summary.data_quality.total_warnings(),
        path = %summary.dataset_path.display(),
        "dataset written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::SyntheticLabels;
    use crate::panel::MonthlyRecord;
    use chrono::NaiveDate;
    use rew_common::EntityId;

    fn config() -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.columns.monthly_shock_events = vec!["drought".into(), "flood".into()];
        cfg.columns.baseline_features = vec!["land_area_hectares".into(), "livestock_units".into()];
        cfg
    }

    fn inputs() -> (BaselineTable, MonthlyTable) {
        let mut baseline = BaselineTable::new(config().columns.baseline_features);
        baseline.insert(EntityId(1), vec![Some(0.5), Some(0.0)]).unwrap();
        baseline.insert(EntityId(2), vec![Some(5.0), Some(10.0)]).unwrap();
        let mut monthly = MonthlyTable::new(config().columns.monthly_shock_events);
        for m in 1..=3 {
            for (id, drought) in [(2, 0.0), (1, 1.0)] {
                monthly.push(MonthlyRecord {
                    entity_id: EntityId(id),
                    period: NaiveDate::from_ymd_opt(2016, m, 1).unwrap(),
                    shocks: vec![Some(drought), Some(0.0)],
                });
            }
        }
        (baseline, monthly)
    }

    #[test]
    fn dataset_table_layout() {
        let cfg = config();
        let (baseline, monthly) = inputs();
        let mut q = DataQualityReport::default();
        let ds = build_dataset(&cfg, &baseline, monthly, &SyntheticLabels::from_config(&cfg), &mut q)
            .unwrap();
        assert_eq!(ds.len(), 6);
        assert_eq!(ds.labelled_rows(), 6);

        let table = ds.to_table(&cfg, &RunId::new()).unwrap();
        assert_eq!(
            table.column_names(),
            vec![
                "household_id",
                "report_date",
                "drought",
                "flood",
                "drought_roll3",
                "flood_roll3",
                "shock_count",
                "shock_count_roll3",
                "land_area_hectares",
                "livestock_units",
                "food_insecure_next_month",
            ]
        );
        assert_eq!(table.metadata_value("rew.window"), Some("3"));
        assert_eq!(table.metadata_value("rew.label_source"), Some("synthetic"));
        assert!(!table.column("food_insecure_next_month").unwrap().nullable);
    }

    #[test]
    fn prevalence_ignores_unlabelled() {
        let cfg = config();
        let (baseline, monthly) = inputs();
        let mut q = DataQualityReport::default();
        let mut ds = build_dataset(&cfg, &baseline, monthly, &SyntheticLabels::from_config(&cfg), &mut q)
            .unwrap();
        ds.labels = vec![Some(1), Some(0), None, None, Some(1), Some(1)];
        assert_eq!(ds.prevalence(), Some(0.75));
        ds.labels = vec![None; 6];
        assert_eq!(ds.prevalence(), None);
    }
}

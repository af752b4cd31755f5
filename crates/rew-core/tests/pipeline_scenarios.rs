//! End-to-end scenarios for the preprocessing and training stages.
//!
//! Validates:
//! - Rolled drought counts and shock counts for a two-household panel
//! - Label probabilities for vulnerable vs. well-resourced households
//! - Monthly rows without a baseline row survive the join
//! - Infinite or overflowing indicator cells are counted as missing
//! - Observed labels leave unmatched rows null and training skips them
//! - The persisted dataset round-trips and trains into a verifiable bundle

use std::fs;

use chrono::NaiveDate;
use rew_common::{EntityId, RunId};
use rew_config::{LabelSourceKind, PipelineConfig};
use rew_core::{
    build_dataset, load_monthly, preprocess, train, train_model, BaselineTable, DataQualityReport,
    ModelBundle, MonthlyRecord, MonthlyTable, SyntheticLabels,
};
use rew_store::read_parquet;
use tempfile::tempdir;

// ============================================================================
// Helpers
// ============================================================================

fn month(m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, m, 1).unwrap()
}

fn scenario_config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.columns.monthly_shock_events = vec!["drought".into()];
    cfg.columns.baseline_features = vec!["land_area_hectares".into(), "livestock_units".into()];
    cfg.features.shock_rolling_months = 3;
    cfg.features.include_shock_counts = true;
    cfg
}

/// Entity 1 is land-poor with no livestock and has a drought in months 1-3.
/// Entity 2 has land and livestock and no shocks.
fn scenario_inputs() -> (BaselineTable, MonthlyTable) {
    let cfg = scenario_config();
    let mut baseline = BaselineTable::new(cfg.columns.baseline_features.clone());
    baseline.insert(EntityId(1), vec![Some(0.5), Some(0.0)]).unwrap();
    baseline.insert(EntityId(2), vec![Some(5.0), Some(10.0)]).unwrap();

    let mut monthly = MonthlyTable::new(cfg.columns.monthly_shock_events.clone());
    // Deliberately out of order.
    for m in [3, 1, 2] {
        monthly.push(MonthlyRecord {
            entity_id: EntityId(2),
            period: month(m),
            shocks: vec![Some(0.0)],
        });
        monthly.push(MonthlyRecord {
            entity_id: EntityId(1),
            period: month(m),
            shocks: vec![Some(1.0)],
        });
    }
    (baseline, monthly)
}

fn column<'a>(ds: &'a rew_core::Dataset, name: &str) -> &'a [Option<f64>] {
    &ds.panel.column(name).unwrap().values
}

// ============================================================================
// Rolling and labelling
// ============================================================================

#[test]
fn drought_window_and_shock_count() {
    let cfg = scenario_config();
    let (baseline, monthly) = scenario_inputs();
    let mut quality = DataQualityReport::default();
    let ds = build_dataset(
        &cfg,
        &baseline,
        monthly,
        &SyntheticLabels::from_config(&cfg),
        &mut quality,
    )
    .unwrap();

    assert_eq!(ds.len(), 6);
    assert_eq!(
        ds.panel.entity_ids,
        vec![EntityId(1), EntityId(1), EntityId(1), EntityId(2), EntityId(2), EntityId(2)]
    );
    assert_eq!(ds.panel.periods[2], month(3));

    let rolled = column(&ds, "drought_roll3");
    assert_eq!(&rolled[..3], &[Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(&rolled[3..], &[Some(0.0), Some(0.0), Some(0.0)]);

    let count = column(&ds, "shock_count");
    assert_eq!(count[2], Some(1.0));
    assert_eq!(count[5], Some(0.0));
    assert_eq!(column(&ds, "shock_count_roll3")[2], Some(3.0));
}

#[test]
fn vulnerable_household_scores_higher() {
    let cfg = scenario_config();
    let (baseline, monthly) = scenario_inputs();
    let mut quality = DataQualityReport::default();
    let labels = SyntheticLabels::from_config(&cfg);
    let ds = build_dataset(&cfg, &baseline, monthly, &labels, &mut quality).unwrap();

    let mut q = DataQualityReport::default();
    let probs = labels.probabilities(&ds.panel, &mut q);
    let exposed = probs[2];
    let protected = probs[5];

    // 0.10 + 0.15*3 + 0.20*3 + 0.10 + 0.10 clips to p_max.
    assert!(exposed.raw > cfg.label.p_max);
    assert_eq!(exposed.clipped, cfg.label.p_max);
    assert!((protected.raw - cfg.label.base_rate).abs() < 1e-12);
    assert!(exposed.clipped > protected.clipped);

    // Default terms name features this panel does not carry.
    assert!(q.absent_label_features.contains(&"flood_roll3".to_string()));
    assert!(q.absent_label_features.contains(&"head_disability".to_string()));
}

#[test]
fn labels_are_reproducible_for_a_seed() {
    let cfg = scenario_config();
    let run = |seed: u64| {
        let mut cfg = cfg.clone();
        cfg.random_seed = seed;
        let (baseline, monthly) = scenario_inputs();
        let mut quality = DataQualityReport::default();
        build_dataset(
            &cfg,
            &baseline,
            monthly,
            &SyntheticLabels::from_config(&cfg),
            &mut quality,
        )
        .unwrap()
        .labels
    };
    assert_eq!(run(42), run(42));
    assert!(run(42).iter().all(|l| matches!(l, Some(0) | Some(1))));
}

// ============================================================================
// Join behaviour
// ============================================================================

#[test]
fn rows_without_baseline_are_kept() {
    let cfg = scenario_config();
    let (_, monthly) = scenario_inputs();
    let mut baseline = BaselineTable::new(cfg.columns.baseline_features.clone());
    baseline.insert(EntityId(1), vec![Some(0.5), None]).unwrap();

    let mut quality = DataQualityReport::default();
    let ds = build_dataset(
        &cfg,
        &baseline,
        monthly,
        &SyntheticLabels::from_config(&cfg),
        &mut quality,
    )
    .unwrap();

    assert_eq!(ds.len(), 6);
    assert_eq!(ds.panel.unmatched_rows, 3);
    assert_eq!(quality.unmatched_monthly_rows, 3);
    let land = column(&ds, "land_area_hectares");
    assert_eq!(&land[3..], &[None, None, None]);
    // Entity 1's missing livestock plus entity 2's three unmatched rows.
    assert_eq!(quality.missing_baseline_values.get("livestock_units"), Some(&6));
    assert!(!quality.is_clean());
}

#[test]
fn overflowing_indicator_cells_are_counted_as_missing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("monthly_shocks.csv");
    fs::write(
        &path,
        "household_id,report_date,drought\n1,2016-01-01,inf\n1,2016-02-01,1e400\n1,2016-03-01,1\n",
    )
    .unwrap();

    let cfg = scenario_config();
    let monthly = load_monthly(&path, &cfg).unwrap();
    let (baseline, _) = scenario_inputs();
    let mut quality = DataQualityReport::default();
    let labels = SyntheticLabels::from_config(&cfg);
    let ds = build_dataset(&cfg, &baseline, monthly, &labels, &mut quality).unwrap();

    assert_eq!(column(&ds, "drought_roll3"), &[Some(0.0), Some(0.0), Some(1.0)]);
    assert_eq!(column(&ds, "shock_count"), &[Some(0.0), Some(0.0), Some(1.0)]);
    assert_eq!(quality.missing_indicator_values.get("drought"), Some(&2));
    assert!(!quality.is_clean());

    let mut q = DataQualityReport::default();
    let probs = labels.probabilities(&ds.panel, &mut q);
    assert!(probs.iter().all(|p| p.raw.is_finite()));
    assert!(probs[2].raw > probs[0].raw);
}

// ============================================================================
// Observed labels
// ============================================================================

#[test]
fn observed_labels_leave_gaps_and_training_skips_them() {
    let dir = tempdir().unwrap();
    let labels_path = dir.path().join("labels.csv");
    let mut body = String::from("household_id,report_date,food_insecure_next_month\n");
    for id in 1..=20 {
        for m in 1..=4 {
            // Month 4 has no outcome yet.
            if m < 4 {
                body.push_str(&format!("{id},2016-0{m}-01,{}\n", u8::from(id % 3 == 0)));
            }
        }
    }
    fs::write(&labels_path, body).unwrap();

    let mut cfg = scenario_config();
    cfg.label.source = LabelSourceKind::Observed;
    cfg.data.labels_file = Some(labels_path);

    let mut baseline = BaselineTable::new(cfg.columns.baseline_features.clone());
    let mut monthly = MonthlyTable::new(cfg.columns.monthly_shock_events.clone());
    for id in 1..=20 {
        baseline
            .insert(EntityId(id), vec![Some((id % 5) as f64), Some((id % 3) as f64)])
            .unwrap();
        for m in 1..=4 {
            monthly.push(MonthlyRecord {
                entity_id: EntityId(id),
                period: month(m),
                shocks: vec![Some(f64::from(u8::from(id % 3 == 0)))],
            });
        }
    }

    let source = rew_core::label_source(&cfg).unwrap();
    assert_eq!(source.kind(), LabelSourceKind::Observed);
    let mut quality = DataQualityReport::default();
    let ds = build_dataset(&cfg, &baseline, monthly, source.as_ref(), &mut quality).unwrap();
    assert_eq!(ds.len(), 80);
    assert_eq!(ds.labelled_rows(), 60);
    assert_eq!(quality.unlabeled_rows, 20);

    let table = ds.to_table(&cfg, &RunId::new()).unwrap();
    assert!(table.column(&cfg.columns.label_col).unwrap().nullable);

    let bundle = train(&cfg, &table).unwrap();
    assert_eq!(bundle.metrics.skipped_unlabeled, 20);
    assert_eq!(bundle.metrics.n_train + bundle.metrics.n_test, 60);
}

// ============================================================================
// Persisted stages
// ============================================================================

#[test]
fn synthetic_panel_preprocesses_and_trains() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let mut cfg = PipelineConfig::default();
    cfg.data.baseline_file = root.join("raw/baseline.csv");
    cfg.data.monthly_file = root.join("raw/monthly_shocks.csv");
    cfg.paths.processed_dir = root.join("processed");
    cfg.paths.model_dir = root.join("models");
    cfg.paths.predictions_dir = root.join("predictions");

    let options = rew_core::synth::SynthOptions {
        households: 150,
        months: 8,
        ..Default::default()
    };
    rew_core::synth::generate(&options, &cfg.data.baseline_file, &cfg.data.monthly_file).unwrap();

    let summary = preprocess(&cfg).unwrap();
    assert_eq!(summary.output_rows, 1200);
    assert_eq!(summary.monthly_rows, 1200);
    assert_eq!(summary.entities, 150);
    assert_eq!(summary.unmatched_rows, 0);
    assert_eq!(summary.labelled_rows, 1200);
    assert!(summary.data_quality.is_clean());
    assert!(cfg.paths.summary_path().is_file());

    let table = read_parquet(&summary.dataset_path).unwrap();
    assert_eq!(table.num_rows(), 1200);
    for feature in cfg.model_feature_columns() {
        assert!(table.column(&feature).is_some(), "missing {feature}");
    }

    let bundle = train_model(&cfg).unwrap();
    let auc = bundle.metrics.roc_auc.expect("both classes in test split");
    assert!(auc > 0.5, "auc {auc}");
    assert_eq!(bundle.model.features, cfg.model_feature_columns());

    let loaded = ModelBundle::load(&cfg.paths.model_path()).unwrap();
    assert_eq!(loaded.model_hash, bundle.model_hash);
    assert_eq!(loaded.provenance.dataset_run_id, Some(summary.run_id.to_string()));

    let batch = rew_core::predict_batch(&cfg).unwrap();
    assert_eq!(batch.entities, 150);
    assert_eq!(batch.latest_period, Some(month(8)));
    let csv = fs::read_to_string(&batch.path).unwrap();
    assert!(csv.starts_with("household_id,prob_food_insecure_next_month\n"));
    assert_eq!(csv.lines().count(), 151);
}

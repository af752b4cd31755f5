//! Property-based tests for panel feature invariants.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use proptest::prelude::*;
use rew_common::EntityId;
use rew_config::{LabelConfig, PipelineConfig};
use rew_core::label::{label_probability, LabelInputs};
use rew_core::{
    build_dataset, roll_shocks, BaselineTable, DataQualityReport, MonthlyRecord, MonthlyTable,
    SortedMonthly, SyntheticLabels,
};

type Panel = BTreeMap<(i64, u32), Option<u8>>;

fn panel_strategy() -> impl Strategy<Value = Panel> {
    prop::collection::btree_map((1i64..6, 1u32..13), prop::option::of(0u8..2), 1..60)
}

fn month(m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, m, 1).unwrap()
}

/// Monthly table in reverse key order, so sorting is always exercised.
fn monthly_table(panel: &Panel) -> MonthlyTable {
    let mut table = MonthlyTable::new(vec!["drought".to_string()]);
    for (&(id, m), value) in panel.iter().rev() {
        table.push(MonthlyRecord {
            entity_id: EntityId(id),
            period: month(m),
            shocks: vec![value.map(f64::from)],
        });
    }
    table
}

fn config(window: usize) -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.columns.monthly_shock_events = vec!["drought".into()];
    cfg.columns.baseline_features = vec!["land_area_hectares".into()];
    cfg.features.shock_rolling_months = window;
    cfg
}

/// Brute-force trailing sum over the entity's own earlier rows.
fn expected_rolls(panel: &Panel, window: usize) -> Vec<f64> {
    let mut by_entity: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (&(id, _), value) in panel {
        by_entity
            .entry(id)
            .or_default()
            .push(value.map_or(0.0, f64::from));
    }
    let mut out = Vec::new();
    for values in by_entity.values() {
        for k in 0..values.len() {
            let start = (k + 1).saturating_sub(window);
            out.push(values[start..=k].iter().sum());
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn rolled_sums_only_look_backwards(panel in panel_strategy(), window in 1usize..6) {
        let sorted = SortedMonthly::sort(monthly_table(&panel)).unwrap();
        let mut quality = DataQualityReport::default();
        let rolled = roll_shocks(sorted, window, true, &mut quality).unwrap();

        prop_assert_eq!(rolled.len(), panel.len());
        let got = rolled.rolled("drought").unwrap();
        let want = expected_rolls(&panel, window);
        prop_assert_eq!(got, want.as_slice());

        let missing = panel.values().filter(|v| v.is_none()).count();
        prop_assert_eq!(
            quality.missing_indicator_values.get("drought").copied().unwrap_or(0),
            missing
        );
    }

    #[test]
    fn future_months_never_change_past_features(
        panel in panel_strategy(),
        window in 1usize..6,
        cut in 1u32..13,
    ) {
        let past: Panel = panel.iter().filter(|((_, m), _)| *m <= cut).map(|(k, v)| (*k, *v)).collect();
        prop_assume!(!past.is_empty());

        let roll = |p: &Panel| {
            let mut q = DataQualityReport::default();
            let r = roll_shocks(SortedMonthly::sort(monthly_table(p)).unwrap(), window, false, &mut q).unwrap();
            r.records()
                .iter()
                .zip(r.rolled("drought").unwrap())
                .map(|(rec, v)| ((rec.entity_id, rec.period), *v))
                .collect::<BTreeMap<_, _>>()
        };
        let full = roll(&panel);
        for (key, value) in roll(&past) {
            prop_assert_eq!(full.get(&key), Some(&value));
        }
    }

    #[test]
    fn dataset_keeps_every_monthly_row(panel in panel_strategy(), window in 1usize..6) {
        let cfg = config(window);
        let mut baseline = BaselineTable::new(cfg.columns.baseline_features.clone());
        // Only odd entities have a baseline row.
        for id in (1..6).step_by(2) {
            baseline.insert(EntityId(id), vec![Some(id as f64)]).unwrap();
        }
        let mut quality = DataQualityReport::default();
        let ds = build_dataset(
            &cfg,
            &baseline,
            monthly_table(&panel),
            &SyntheticLabels::from_config(&cfg),
            &mut quality,
        )
        .unwrap();

        prop_assert_eq!(ds.len(), panel.len());
        prop_assert_eq!(ds.labels.len(), panel.len());
        let unmatched = panel.keys().filter(|(id, _)| id % 2 == 0).count();
        prop_assert_eq!(ds.panel.unmatched_rows, unmatched);
        prop_assert!(ds.labels.iter().all(|l| matches!(l, Some(0) | Some(1))));
    }

    #[test]
    fn synthetic_labels_reproduce_for_a_seed(panel in panel_strategy(), seed in any::<u64>()) {
        let mut cfg = config(3);
        cfg.random_seed = seed;
        let baseline = BaselineTable::new(cfg.columns.baseline_features.clone());
        let draw = || {
            let mut q = DataQualityReport::default();
            build_dataset(&cfg, &baseline, monthly_table(&panel), &SyntheticLabels::from_config(&cfg), &mut q)
                .unwrap()
                .labels
        };
        prop_assert_eq!(draw(), draw());
    }

    #[test]
    fn label_probability_respects_clip_bounds(
        shocks in prop::collection::vec(prop::option::of(-5.0f64..50.0), 3),
        capacity in prop::collection::vec(prop::option::of(-5.0f64..50.0), 5),
        p_min in 0.0f64..0.5,
        width in 0.0f64..0.5,
    ) {
        let config = LabelConfig {
            p_min,
            p_max: p_min + width,
            ..LabelConfig::default()
        };
        let p = label_probability(&config, &LabelInputs {
            shock_values: shocks,
            capacity_values: capacity,
        });
        prop_assert!(p.clipped >= config.p_min && p.clipped <= config.p_max);
        if (config.p_min..=config.p_max).contains(&p.raw) {
            prop_assert_eq!(p.clipped, p.raw);
        }
    }
}

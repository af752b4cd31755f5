//! Left join of rolled monthly rows onto baseline attributes.

use chrono::NaiveDate;
use rew_common::EntityId;
use tracing::info;

use crate::panel::BaselineTable;
use crate::quality::DataQualityReport;
use crate::rolling::RolledMonthly;

/// A named float column; `None` is a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Rolled monthly rows joined with baseline attributes, before labelling.
///
/// Column order: raw indicators, rolled indicators, `shock_count` and its
/// roll (when enabled), then baseline attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedPanel {
    pub window: usize,
    pub entity_ids: Vec<EntityId>,
    pub periods: Vec<NaiveDate>,
    pub columns: Vec<FeatureColumn>,
    pub unmatched_rows: usize,
}

impl JoinedPanel {
    pub fn len(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn entity_count(&self) -> usize {
        self.entity_ids
            .iter()
            .collect::<std::collections::BTreeSet<_>>()
            .len()
    }
}

/// Join every rolled row to its entity's baseline row.
///
/// Rows whose entity has no baseline row keep all baseline columns missing
/// and are never dropped, so the output row count equals the monthly row
/// count.
pub fn join_baseline(
    rolled: &RolledMonthly,
    baseline: &BaselineTable,
    quality: &mut DataQualityReport,
) -> JoinedPanel {
    let records = rolled.records();
    let mut columns: Vec<FeatureColumn> = rolled
        .indicators()
        .iter()
        .filter_map(|ind| {
            rolled.raw(ind).map(|values| FeatureColumn {
                name: ind.clone(),
                values,
            })
        })
        .collect();
    columns.extend(
        rolled
            .derived_columns()
            .into_iter()
            .map(|(name, values)| FeatureColumn {
                name,
                values: values.iter().copied().map(Some).collect(),
            }),
    );

    let n_features = baseline.features().len();
    let mut baseline_cols: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(records.len()); n_features];
    let mut unmatched = 0usize;
    for record in records {
        match baseline.get(record.entity_id) {
            Some(row) => {
                for (col, value) in baseline_cols.iter_mut().zip(row) {
                    col.push(value.filter(|v| v.is_finite()));
                }
            }
            None => {
                unmatched += 1;
                for col in &mut baseline_cols {
                    col.push(None);
                }
            }
        }
    }

    for (name, values) in baseline.features().iter().zip(baseline_cols) {
        let missing = values.iter().filter(|v| v.is_none()).count();
        quality.record_missing_baseline(name, missing);
        columns.push(FeatureColumn {
            name: name.clone(),
            values,
        });
    }
    quality.unmatched_monthly_rows += unmatched;

    info!(
        rows = records.len(),
        unmatched_rows = unmatched,
        baseline_entities = baseline.len(),
        "joined monthly features with baseline"
    );

    JoinedPanel {
        window: rolled.window(),
        entity_ids: records.iter().map(|r| r.entity_id).collect(),
        periods: records.iter().map(|r| r.period).collect(),
        columns,
        unmatched_rows: unmatched,
    }
}

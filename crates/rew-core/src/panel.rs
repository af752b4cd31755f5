//! Panel input types.
//!
//! A panel is a static baseline table (one row per entity) plus a monthly
//! table of binary shock indicators (one row per entity per month). Both are
//! immutable after loading.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use rew_common::{EntityId, Error, Result};

/// Static attributes, one row per entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineTable {
    features: Vec<String>,
    rows: BTreeMap<EntityId, Vec<Option<f64>>>,
}

impl BaselineTable {
    pub fn new(features: Vec<String>) -> Self {
        Self {
            features,
            rows: BTreeMap::new(),
        }
    }

    /// Add one entity's attributes. A second row for the same entity is a
    /// schema error.
    pub fn insert(&mut self, id: EntityId, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.features.len() {
            return Err(Error::Schema(format!(
                "baseline row for entity {id} has {} values, expected {}",
                values.len(),
                self.features.len()
            )));
        }
        match self.rows.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateKey {
                table: "baseline".to_string(),
                key: id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(values);
                Ok(())
            }
        }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn get(&self, id: EntityId) -> Option<&[Option<f64>]> {
        self.rows.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One entity-month of shock indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRecord {
    pub entity_id: EntityId,
    /// First day of the reporting month.
    pub period: NaiveDate,
    /// Indicator values in the table's indicator order; `None` is missing.
    pub shocks: Vec<Option<f64>>,
}

impl MonthlyRecord {
    fn key(&self) -> (EntityId, NaiveDate) {
        (self.entity_id, self.period)
    }
}

/// Monthly shock rows in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyTable {
    pub indicators: Vec<String>,
    pub records: Vec<MonthlyRecord>,
}

impl MonthlyTable {
    pub fn new(indicators: Vec<String>) -> Self {
        Self {
            indicators,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MonthlyRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Monthly rows ordered by `(entity_id, period)` with unique keys.
///
/// The only ways to obtain one are [`SortedMonthly::sort`] and
/// [`SortedMonthly::verify`], so holding a value proves the order.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedMonthly {
    indicators: Vec<String>,
    records: Vec<MonthlyRecord>,
}

impl SortedMonthly {
    /// Sort the table. Duplicate `(entity_id, period)` keys are a schema error.
    pub fn sort(table: MonthlyTable) -> Result<Self> {
        let MonthlyTable {
            indicators,
            mut records,
        } = table;
        records.sort_by_key(MonthlyRecord::key);
        if let Some(pair) = records.windows(2).find(|w| w[0].key() == w[1].key()) {
            return Err(duplicate_key(&pair[1]));
        }
        Ok(Self {
            indicators,
            records,
        })
    }

    /// Accept an already ordered table, failing on the first violation.
    pub fn verify(table: MonthlyTable) -> Result<Self> {
        for (i, pair) in table.records.windows(2).enumerate() {
            let (prev, next) = (pair[0].key(), pair[1].key());
            if prev == next {
                return Err(duplicate_key(&pair[1]));
            }
            if prev > next {
                return Err(Error::UnsortedInput {
                    index: i + 1,
                    detail: format!(
                        "({}, {}) follows ({}, {})",
                        next.0, next.1, prev.0, prev.1
                    ),
                });
            }
        }
        Ok(Self {
            indicators: table.indicators,
            records: table.records,
        })
    }

    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    pub fn records(&self) -> &[MonthlyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Contiguous per-entity runs, each ordered by period.
    pub fn partitions(&self) -> impl Iterator<Item = &[MonthlyRecord]> {
        self.records.chunk_by(|a, b| a.entity_id == b.entity_id)
    }

    pub fn entity_count(&self) -> usize {
        self.partitions().count()
    }
}

fn duplicate_key(record: &MonthlyRecord) -> Error {
    Error::DuplicateKey {
        table: "monthly".to_string(),
        key: format!("({}, {})", record.entity_id, record.period),
    }
}

/// Parse a report period and truncate it to the first day of its month.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM`, `YYYY-MM-DD HH:MM:SS` and RFC 3339.
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))?;
    date.with_day(1)
}

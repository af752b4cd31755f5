use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use rew_common::{EntityId, Error, Result};
use rew_config::{LabelSourceKind, PipelineConfig};
use tracing::info;

use super::LabelSource;
use crate::join::JoinedPanel;
use crate::loader::CsvTable;
use crate::quality::DataQualityReport;

const LABELS_TABLE: &str = "labels";

/// Measured outcomes keyed by `(entity, period)`.
///
/// Rows without a measurement get a null label; the most recent month of a
/// panel normally has no next-month outcome yet.
#[derive(Debug, Clone, Default)]
pub struct ObservedLabels {
    labels: HashMap<(EntityId, NaiveDate), u8>,
}

impl ObservedLabels {
    pub fn load(path: &Path, config: &PipelineConfig) -> Result<Self> {
        let labels = Self::read(CsvTable::open(LABELS_TABLE, path)?, config)?;
        info!(path = %path.display(), labels = labels.len(), "observed labels loaded");
        Ok(labels)
    }

    pub(crate) fn read<R: Read>(csv: CsvTable<R>, config: &PipelineConfig) -> Result<Self> {
        let cols = &config.columns;
        let id_idx = csv.index(&cols.id_col)?;
        let date_idx = csv.index(&cols.date_col)?;
        let label_idx = csv.index(&cols.label_col)?;
        let mut labels = HashMap::new();
        csv.for_each_row(|cells| {
            let key = (cells.entity_id(id_idx)?, cells.period(date_idx)?);
            if let Some(label) = cells.binary(label_idx)? {
                if labels.insert(key, label).is_some() {
                    return Err(Error::DuplicateKey {
                        table: LABELS_TABLE.to_string(),
                        key: format!("({}, {})", key.0, key.1),
                    });
                }
            }
            Ok(())
        })?;
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LabelSource for ObservedLabels {
    fn kind(&self) -> LabelSourceKind {
        LabelSourceKind::Observed
    }

    fn assign(&self, panel: &JoinedPanel, quality: &mut DataQualityReport) -> Result<Vec<Option<u8>>> {
        let labels: Vec<Option<u8>> = panel
            .entity_ids
            .iter()
            .zip(&panel.periods)
            .map(|(&id, &period)| self.labels.get(&(id, period)).copied())
            .collect();
        quality.unlabeled_rows += labels.iter().filter(|l| l.is_none()).count();
        Ok(labels)
    }
}

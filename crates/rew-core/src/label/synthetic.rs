use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rew_common::Result;
use rew_config::{LabelConfig, LabelSourceKind, PipelineConfig};
use tracing::{debug, info};

use super::{label_probability, LabelInputs, LabelProbability, LabelSource};
use crate::join::JoinedPanel;
use crate::quality::DataQualityReport;

/// Placeholder scoring function plus one seeded Bernoulli draw per row.
///
/// The stream is ChaCha8, so a seed reproduces the same labels on every
/// platform for the same row order.
#[derive(Debug, Clone)]
pub struct SyntheticLabels {
    config: LabelConfig,
    window: usize,
    seed: u64,
}

/// Where each term's value comes from in a joined panel.
struct TermColumns {
    shock: Vec<(String, Option<usize>)>,
    capacity: Vec<(String, Option<usize>)>,
}

impl SyntheticLabels {
    pub fn new(config: LabelConfig, window: usize, seed: u64) -> Self {
        Self {
            config,
            window,
            seed,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.label.clone(), config.window(), config.random_seed)
    }

    fn resolve(&self, panel: &JoinedPanel, quality: &mut DataQualityReport) -> TermColumns {
        let mut lookup = |name: String| {
            let idx = panel.column_index(&name);
            if idx.is_none() {
                quality.record_absent_label_feature(&name);
            }
            (name, idx)
        };
        let shock = self
            .config
            .shock_terms
            .iter()
            .map(|t| lookup(format!("{}_roll{}", t.indicator, self.window)))
            .collect();
        let capacity = self
            .config
            .capacity_terms
            .iter()
            .map(|t| lookup(t.feature.clone()))
            .collect();
        TermColumns { shock, capacity }
    }

    /// Label probabilities for every row, without sampling.
    pub fn probabilities(
        &self,
        panel: &JoinedPanel,
        quality: &mut DataQualityReport,
    ) -> Vec<LabelProbability> {
        let terms = self.resolve(panel, quality);
        let mut fetch = |row: usize, cols: &[(String, Option<usize>)]| -> Vec<Option<f64>> {
            cols.iter()
                .map(|(name, idx)| {
                    // Absent columns are already reported once by `resolve`.
                    let i = (*idx)?;
                    let value = panel.columns[i].values[row].filter(|v| v.is_finite());
                    if value.is_none() {
                        quality.record_label_default(name);
                    }
                    value
                })
                .collect()
        };
        (0..panel.len())
            .map(|row| {
                let inputs = LabelInputs {
                    shock_values: fetch(row, &terms.shock),
                    capacity_values: fetch(row, &terms.capacity),
                };
                label_probability(&self.config, &inputs)
            })
            .collect()
    }
}

impl LabelSource for SyntheticLabels {
    fn kind(&self) -> LabelSourceKind {
        LabelSourceKind::Synthetic
    }

    fn assign(&self, panel: &JoinedPanel, quality: &mut DataQualityReport) -> Result<Vec<Option<u8>>> {
        let probs = self.probabilities(panel, quality);
        let clipped_high = probs.iter().filter(|p| p.raw > self.config.p_max).count();
        let clipped_low = probs.iter().filter(|p| p.raw < self.config.p_min).count();
        debug!(clipped_high, clipped_low, "label probabilities clipped");

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let labels: Vec<Option<u8>> = probs
            .iter()
            .map(|p| Some(u8::from(rng.random::<f64>() < p.clipped)))
            .collect();

        let positives = labels.iter().flatten().filter(|&&l| l == 1).count();
        info!(
            rows = labels.len(),
            positives,
            seed = self.seed,
            "synthetic labels drawn"
        );
        Ok(labels)
    }
}

//! Label generation.
//!
//! Labels are attached to a [`JoinedPanel`] by a [`LabelSource`]. The
//! synthetic source scores each row with a pure function of a fixed input
//! record and draws one Bernoulli trial per row; the observed source looks
//! measured outcomes up by `(entity, period)`.

mod observed;
mod synthetic;

pub use observed::ObservedLabels;
pub use synthetic::SyntheticLabels;

use rew_common::{Error, Result};
use rew_config::{LabelConfig, LabelSourceKind, PipelineConfig};
use rew_math::clip_probability;
use serde::Serialize;

use crate::join::JoinedPanel;
use crate::quality::DataQualityReport;

/// Produces one optional 0/1 label per joined row, in row order.
pub trait LabelSource {
    fn kind(&self) -> LabelSourceKind;

    fn assign(&self, panel: &JoinedPanel, quality: &mut DataQualityReport) -> Result<Vec<Option<u8>>>;
}

/// Feature values one row feeds the label function, aligned with
/// `LabelConfig::shock_terms` and `LabelConfig::capacity_terms`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelInputs {
    pub shock_values: Vec<Option<f64>>,
    pub capacity_values: Vec<Option<f64>>,
}

/// Label probability before and after clipping to `[p_min, p_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelProbability {
    pub raw: f64,
    pub clipped: f64,
}

/// `base_rate + Σ shock weight·value + Σ capacity weight·[condition]`,
/// then clipped. Missing values contribute 0.
pub fn label_probability(config: &LabelConfig, inputs: &LabelInputs) -> LabelProbability {
    let shock: f64 = config
        .shock_terms
        .iter()
        .zip(&inputs.shock_values)
        .filter_map(|(term, value)| value.filter(|v| v.is_finite()).map(|v| term.weight * v))
        .sum();
    let capacity: f64 = config
        .capacity_terms
        .iter()
        .zip(&inputs.capacity_values)
        .filter(|(term, value)| value.is_some_and(|v| term.condition.holds(v, term.threshold)))
        .map(|(term, _)| term.weight)
        .sum();
    let raw = config.base_rate + shock + capacity;
    LabelProbability {
        raw,
        clipped: clip_probability(raw, config.p_min, config.p_max),
    }
}

/// The label source selected by `label.source`.
pub fn label_source(config: &PipelineConfig) -> Result<Box<dyn LabelSource>> {
    match config.label.source {
        LabelSourceKind::Synthetic => Ok(Box::new(SyntheticLabels::from_config(config))),
        LabelSourceKind::Observed => {
            let path = config.data.labels_file.as_deref().ok_or_else(|| Error::MissingConfigKey {
                key: "data.labels_file".to_string(),
            })?;
            Ok(Box::new(ObservedLabels::load(path, config)?))
        }
    }
}

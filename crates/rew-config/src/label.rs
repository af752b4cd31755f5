//! Label generation settings.
//!
//! The synthetic label stands in for a measured next-month outcome. Its
//! weights are placeholders; what matters downstream is the shape of the
//! function: a linear combination of rolled shock features and baseline
//! capacity indicators, clipped into `[p_min, p_max]`, then one Bernoulli draw.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where labels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LabelSourceKind {
    /// Sample labels from the placeholder scoring function.
    Synthetic,
    /// Read measured labels from `data.labels_file`.
    Observed,
}

impl std::fmt::Display for LabelSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelSourceKind::Synthetic => write!(f, "synthetic"),
            LabelSourceKind::Observed => write!(f, "observed"),
        }
    }
}

/// Weighted contribution of one rolled shock feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShockTerm {
    /// A shock indicator name, or `shock_count`; the rolled column
    /// `{indicator}_roll{W}` is what gets weighted.
    pub indicator: String,
    pub weight: f64,
}

impl ShockTerm {
    pub fn new(indicator: &str, weight: f64) -> Self {
        Self {
            indicator: indicator.to_string(),
            weight,
        }
    }
}

/// Comparison applied to a baseline attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Condition {
    /// Equality tolerance for `Eq` on float-encoded flags.
    const EQ_TOLERANCE: f64 = 1e-9;

    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Condition::Lt => value < threshold,
            Condition::Le => value <= threshold,
            Condition::Eq => (value - threshold).abs() <= Self::EQ_TOLERANCE,
            Condition::Ge => value >= threshold,
            Condition::Gt => value > threshold,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Condition::Lt => "<",
            Condition::Le => "<=",
            Condition::Eq => "==",
            Condition::Ge => ">=",
            Condition::Gt => ">",
        };
        write!(f, "{op}")
    }
}

/// Fixed-weight indicator over a baseline attribute: contributes `weight`
/// when `feature <condition> threshold` holds, zero otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapacityTerm {
    pub feature: String,
    pub condition: Condition,
    pub threshold: f64,
    pub weight: f64,
}

impl CapacityTerm {
    pub fn new(feature: &str, condition: Condition, threshold: f64, weight: f64) -> Self {
        Self {
            feature: feature.to_string(),
            condition,
            threshold,
            weight,
        }
    }
}

/// Complete label settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LabelConfig {
    pub source: LabelSourceKind,
    pub base_rate: f64,
    pub p_min: f64,
    pub p_max: f64,
    pub shock_terms: Vec<ShockTerm>,
    pub capacity_terms: Vec<CapacityTerm>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            source: LabelSourceKind::Synthetic,
            base_rate: 0.10,
            p_min: 0.01,
            p_max: 0.95,
            shock_terms: vec![
                ShockTerm::new("shock_count", 0.15),
                ShockTerm::new("drought", 0.20),
                ShockTerm::new("flood", 0.10),
            ],
            capacity_terms: vec![
                CapacityTerm::new("land_area_hectares", Condition::Lt, 1.0, 0.10),
                CapacityTerm::new("livestock_units", Condition::Lt, 1.0, 0.10),
                CapacityTerm::new("head_gender_female", Condition::Eq, 1.0, 0.08),
                CapacityTerm::new("head_disability", Condition::Eq, 1.0, 0.12),
                CapacityTerm::new("floodplain_exposure", Condition::Eq, 1.0, 0.05),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_semantics() {
        assert!(Condition::Lt.holds(0.5, 1.0));
        assert!(!Condition::Lt.holds(1.0, 1.0));
        assert!(Condition::Le.holds(1.0, 1.0));
        assert!(Condition::Eq.holds(1.0, 1.0));
        assert!(!Condition::Eq.holds(0.0, 1.0));
        assert!(Condition::Ge.holds(2.0, 1.0));
        assert!(Condition::Gt.holds(2.0, 1.0));
        assert!(!Condition::Gt.holds(1.0, 1.0));
    }

    #[test]
    fn nan_never_satisfies_a_condition() {
        for cond in [Condition::Lt, Condition::Le, Condition::Eq, Condition::Ge, Condition::Gt] {
            assert!(!cond.holds(f64::NAN, 1.0), "{cond} held for NaN");
        }
    }

    #[test]
    fn default_weights_shape() {
        let cfg = LabelConfig::default();
        assert_eq!(cfg.source, LabelSourceKind::Synthetic);
        assert_eq!(cfg.shock_terms.len(), 3);
        assert_eq!(cfg.capacity_terms.len(), 5);
        assert!(cfg.p_min < cfg.p_max);
    }

    #[test]
    fn yaml_terms_parse() {
        let yaml = r#"
source: observed
shock_terms:
  - { indicator: drought, weight: 0.3 }
capacity_terms:
  - { feature: head_age, condition: ge, threshold: 65, weight: 0.05 }
"#;
        let cfg: LabelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.source, LabelSourceKind::Observed);
        assert_eq!(cfg.shock_terms, vec![ShockTerm::new("drought", 0.3)]);
        assert_eq!(cfg.capacity_terms[0].condition, Condition::Ge);
        // untouched fields keep defaults
        assert_eq!(cfg.p_max, 0.95);
    }

    #[test]
    fn source_display() {
        assert_eq!(LabelSourceKind::Synthetic.to_string(), "synthetic");
        assert_eq!(LabelSourceKind::Observed.to_string(), "observed");
    }
}

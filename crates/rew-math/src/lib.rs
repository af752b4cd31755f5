//! Resilience Early Warning math utilities.

pub mod math;

pub use math::metrics::{roc_auc, BinaryClassificationReport, ClassMetrics};
pub use math::rolling::{rolling_sum, trailing_sum};
pub use math::stable::{clip_probability, log_loss, sigmoid};
pub use math::stats::{column_means, column_stds};

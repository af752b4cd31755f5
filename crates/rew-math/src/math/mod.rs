//! Core math modules.

pub mod metrics;
pub mod rolling;
pub mod stable;
pub mod stats;

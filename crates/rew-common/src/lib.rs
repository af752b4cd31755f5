//! Resilience Early Warning common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Entity and run identity types
//! - The unified error taxonomy with stable codes
//! - Dataset schema versioning

pub mod error;
pub mod id;
pub mod schema;

pub use error::{Error, ErrorCategory, Result};
pub use id::{EntityId, RunId};
pub use schema::SCHEMA_VERSION;

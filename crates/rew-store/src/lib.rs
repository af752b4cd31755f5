//! Resilience Early Warning dataset storage.
//!
//! This crate provides:
//! - A typed, column-oriented in-memory `Table`
//! - Arrow schema mapping for those columns
//! - Atomic Parquet writer and a reader that restores types and metadata

pub mod error;
pub mod reader;
pub mod schema;
pub mod table;
pub mod writer;

pub use error::StoreError;
pub use reader::{preview_parquet, read_parquet};
pub use schema::{arrow_schema, ColumnType, MetadataKey};
pub use table::{Column, ColumnData, Table};
pub use writer::{write_parquet, Codec, WriterConfig};

pub use rew_common::SCHEMA_VERSION;

//! Atomic Parquet writer.
//!
//! The table is written to a hidden temporary file in the destination
//! directory and renamed into place once the footer is flushed, so readers
//! never observe a half-written dataset and a failed run leaves nothing
//! behind.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::schema::{arrow_schema, MetadataKey};
use crate::table::{Column, ColumnData, Table};

/// Compression codec for written files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Zstd,
    Snappy,
    Uncompressed,
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub codec: Codec,
    pub max_row_group_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            codec: Codec::Zstd,
            max_row_group_size: 64 * 1024,
        }
    }
}

impl WriterConfig {
    fn properties(&self) -> WriterProperties {
        let compression = match self.codec {
            Codec::Zstd => Compression::ZSTD(ZstdLevel::default()),
            Codec::Snappy => Compression::SNAPPY,
            Codec::Uncompressed => Compression::UNCOMPRESSED,
        };
        WriterProperties::builder()
            .set_compression(compression)
            .set_max_row_group_size(self.max_row_group_size)
            .set_created_by(format!("rew-store {}", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

/// Days since 1970-01-01; `NaiveDate::default()` is the Unix epoch.
pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn to_array(column: &Column) -> ArrayRef {
    match &column.data {
        ColumnData::Int64(v) => Arc::new(Int64Array::from(v.clone())),
        ColumnData::Int32(v) => Arc::new(Int32Array::from(v.clone())),
        ColumnData::Float64(v) => Arc::new(Float64Array::from(v.clone())),
        ColumnData::Date32(v) => Arc::new(Date32Array::from(
            v.iter().map(|d| d.map(date_to_days)).collect::<Vec<_>>(),
        )),
    }
}

/// Build the single record batch for a table.
pub(crate) fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    if table.num_columns() == 0 {
        return Err(StoreError::EmptyTable);
    }
    let arrays: Vec<ArrayRef> = table.columns().iter().map(to_array).collect();
    Ok(RecordBatch::try_new(arrow_schema(table), arrays)?)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Write `table` to `path` as Parquet. Returns the file size in bytes.
///
/// The schema-version metadata key is stamped automatically.
pub fn write_parquet(path: &Path, table: &Table, config: &WriterConfig) -> Result<u64> {
    let mut table = table.clone();
    table.set_metadata(MetadataKey::SchemaVersion.as_str(), crate::SCHEMA_VERSION);
    let batch = to_record_batch(&table)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    let result = write_batch(&tmp, &batch, config).and_then(|_| {
        fs::rename(&tmp, path)?;
        Ok(fs::metadata(path)?.len())
    });

    match result {
        Ok(bytes) => {
            info!(
                path = %path.display(),
                rows = batch.num_rows(),
                columns = batch.num_columns(),
                bytes,
                "parquet written"
            );
            Ok(bytes)
        }
        Err(e) => {
            if tmp.exists() {
                if let Err(cleanup) = fs::remove_file(&tmp) {
                    warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
                }
            }
            Err(e)
        }
    }
}

fn write_batch(path: &Path, batch: &RecordBatch, config: &WriterConfig) -> Result<()> {
    debug!(path = %path.display(), "writing parquet temp file");
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(config.properties()))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

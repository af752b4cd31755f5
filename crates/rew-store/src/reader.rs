//! Parquet reader that restores typed columns and table metadata.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{Duration, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::schema::{ColumnType, MetadataKey};
use crate::table::{Column, ColumnData, Table};

/// Footer key the Arrow writer uses for its serialized schema.
const ARROW_SCHEMA_KEY: &str = "ARROW:schema";

fn read_batches(path: &Path, limit: Option<usize>) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let file = File::open(path)?;
    let mut builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    if let Some(limit) = limit {
        builder = builder.with_limit(limit);
    }
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((schema, batches))
}

fn check_version(schema: &SchemaRef) -> Result<()> {
    let found = schema
        .metadata()
        .get(MetadataKey::SchemaVersion.as_str())
        .cloned()
        .unwrap_or_else(|| "missing".to_string());
    if !rew_common::schema::is_compatible(&found) {
        return Err(StoreError::IncompatibleVersion {
            found,
            expected: crate::SCHEMA_VERSION.to_string(),
        });
    }
    Ok(())
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::UnsupportedType {
            column: column.to_string(),
            data_type: array.data_type().to_string(),
        })
}

fn days_to_date(days: i32, column: &str) -> Result<NaiveDate> {
    NaiveDate::default()
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| StoreError::OutOfRange {
            column: column.to_string(),
            value: i64::from(days),
        })
}

fn append(data: &mut ColumnData, array: &ArrayRef, column: &str) -> Result<()> {
    match data {
        ColumnData::Int64(v) => v.extend(downcast::<Int64Array>(array, column)?.iter()),
        ColumnData::Int32(v) => v.extend(downcast::<Int32Array>(array, column)?.iter()),
        ColumnData::Float64(v) => v.extend(downcast::<Float64Array>(array, column)?.iter()),
        ColumnData::Date32(v) => {
            for d in downcast::<Date32Array>(array, column)?.iter() {
                v.push(d.map(|days| days_to_date(days, column)).transpose()?);
            }
        }
    }
    Ok(())
}

fn empty_data(column_type: ColumnType, capacity: usize) -> ColumnData {
    match column_type {
        ColumnType::Int64 => ColumnData::Int64(Vec::with_capacity(capacity)),
        ColumnType::Int32 => ColumnData::Int32(Vec::with_capacity(capacity)),
        ColumnType::Float64 => ColumnData::Float64(Vec::with_capacity(capacity)),
        ColumnType::Date32 => ColumnData::Date32(Vec::with_capacity(capacity)),
    }
}

/// Read a Parquet file written by [`crate::write_parquet`].
///
/// Fails with [`StoreError::IncompatibleVersion`] when the stored schema
/// version has a different major version, and with
/// [`StoreError::UnsupportedType`] for column types outside the table model.
pub fn read_parquet(path: &Path) -> Result<Table> {
    let (schema, batches) = read_batches(path, None)?;
    check_version(&schema)?;
    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();

    let mut table = Table::new();
    for (idx, field) in schema.fields().iter().enumerate() {
        let column_type =
            ColumnType::from_arrow(field.data_type()).ok_or_else(|| StoreError::UnsupportedType {
                column: field.name().clone(),
                data_type: field.data_type().to_string(),
            })?;
        let mut data = empty_data(column_type, rows);
        for batch in &batches {
            append(&mut data, batch.column(idx), field.name())?;
        }
        table.push_column(Column {
            name: field.name().clone(),
            nullable: field.is_nullable(),
            data,
        })?;
    }
    for (key, value) in schema.metadata() {
        if key != ARROW_SCHEMA_KEY {
            table.set_metadata(key.clone(), value.clone());
        }
    }

    debug!(
        path = %path.display(),
        rows,
        columns = table.num_columns(),
        "parquet read"
    );
    Ok(table)
}

/// Render the first `rows` rows of a Parquet file as an ASCII table.
pub fn preview_parquet(path: &Path, rows: usize) -> Result<String> {
    let (schema, batches) = read_batches(path, Some(rows))?;
    check_version(&schema)?;
    Ok(pretty_format_batches(&batches)?.to_string())
}

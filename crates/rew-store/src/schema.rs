//! Arrow schema mapping for stored tables.
//!
//! Column types are deliberately few: integer identifiers and labels, float
//! features, and month-truncated dates. Table metadata travels in the Arrow
//! schema metadata, which Parquet preserves in its file footer.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use crate::table::Table;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Int32,
    Float64,
    Date32,
}

impl ColumnType {
    pub fn arrow_type(self) -> DataType {
        match self {
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Int32 => DataType::Int32,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Date32 => DataType::Date32,
        }
    }

    pub fn from_arrow(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Int64 => Some(ColumnType::Int64),
            DataType::Int32 => Some(ColumnType::Int32),
            DataType::Float64 => Some(ColumnType::Float64),
            DataType::Date32 => Some(ColumnType::Date32),
            _ => None,
        }
    }
}

/// Well-known metadata keys written with every dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    SchemaVersion,
    RunId,
    ConfigHash,
    Window,
    LabelSource,
    IdColumn,
    DateColumn,
    LabelColumn,
}

impl MetadataKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKey::SchemaVersion => "rew.schema_version",
            MetadataKey::RunId => "rew.run_id",
            MetadataKey::ConfigHash => "rew.config_hash",
            MetadataKey::Window => "rew.window",
            MetadataKey::LabelSource => "rew.label_source",
            MetadataKey::IdColumn => "rew.id_col",
            MetadataKey::DateColumn => "rew.date_col",
            MetadataKey::LabelColumn => "rew.label_col",
        }
    }
}

/// Arrow schema for a table, including its metadata.
pub fn arrow_schema(table: &Table) -> SchemaRef {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(&c.name, c.data.column_type().arrow_type(), c.nullable))
        .collect();
    let metadata: HashMap<String, String> = table
        .metadata()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Arc::new(Schema::new(fields).with_metadata(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnData};

    #[test]
    fn schema_mirrors_columns_and_metadata() {
        let mut t = Table::new();
        t.push_column(Column::new("id", ColumnData::Int64(vec![Some(1)])))
            .unwrap();
        t.push_column(Column::new("x", ColumnData::Float64(vec![None])))
            .unwrap();
        t.set_metadata(MetadataKey::Window.as_str(), "3");
        let schema = arrow_schema(&t);
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert!(!schema.field(0).is_nullable());
        assert!(schema.field(1).is_nullable());
        assert_eq!(schema.metadata().get("rew.window").map(String::as_str), Some("3"));
    }

    #[test]
    fn type_roundtrip() {
        for t in [ColumnType::Int64, ColumnType::Int32, ColumnType::Float64, ColumnType::Date32] {
            assert_eq!(ColumnType::from_arrow(&t.arrow_type()), Some(t));
        }
        assert_eq!(ColumnType::from_arrow(&DataType::Utf8), None);
    }
}

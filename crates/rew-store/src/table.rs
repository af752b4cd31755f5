//! Typed column-oriented table.
//!
//! Every column carries optional values so missing cells survive a Parquet
//! round trip as nulls instead of being coerced to strings or sentinels.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{Result, StoreError};
use crate::schema::ColumnType;

/// Values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<Option<i64>>),
    Int32(Vec<Option<i32>>),
    Float64(Vec<Option<f64>>),
    Date32(Vec<Option<NaiveDate>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Date32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::Int32(_) => ColumnType::Int32,
            ColumnData::Float64(_) => ColumnType::Float64,
            ColumnData::Date32(_) => ColumnType::Date32,
        }
    }

    fn null_count(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Int32(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Float64(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Date32(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub nullable: bool,
    pub data: ColumnData,
}

impl Column {
    /// A column whose nullability is inferred from its values.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        let nullable = data.null_count() > 0;
        Self {
            name: name.into(),
            nullable,
            data,
        }
    }

    /// A column that is declared nullable even if every value is present.
    pub fn nullable(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Numeric view of the column; dates are not numeric.
    pub fn as_f64(&self) -> Option<Vec<Option<f64>>> {
        match &self.data {
            ColumnData::Float64(v) => Some(v.clone()),
            ColumnData::Int64(v) => Some(v.iter().map(|x| x.map(|i| i as f64)).collect()),
            ColumnData::Int32(v) => Some(v.iter().map(|x| x.map(f64::from)).collect()),
            ColumnData::Date32(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[Option<i64>]> {
        match &self.data {
            ColumnData::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[Option<i32>]> {
        match &self.data {
            ColumnData::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dates(&self) -> Option<&[Option<NaiveDate>]> {
        match &self.data {
            ColumnData::Date32(v) => Some(v),
            _ => None,
        }
    }
}

/// Ordered collection of equally long columns plus string metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    metadata: BTreeMap<String, String>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Its length must match the existing columns and its
    /// name must be new.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.iter().any(|c| c.name == column.name) {
            return Err(StoreError::DuplicateColumn(column.name));
        }
        if let Some(first) = self.columns.first() {
            let actual = column.len();
            if first.len() != actual {
                return Err(StoreError::LengthMismatch {
                    column: column.name,
                    expected: first.len(),
                    actual,
                });
            }
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejects_length_mismatch() {
        let mut t = Table::new();
        t.push_column(Column::new("a", ColumnData::Int64(vec![Some(1), Some(2)])))
            .unwrap();
        let err = t
            .push_column(Column::new("b", ColumnData::Float64(vec![Some(1.0)])))
            .unwrap_err();
        match err {
            StoreError::LengthMismatch {
                column,
                expected,
                actual,
            } => {
                assert_eq!(column, "b");
                assert_eq!((expected, actual), (2, 1));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(t.num_rows(), 2);
        assert!(t.column("b").is_none());
    }

    #[test]
    fn push_rejects_duplicate_name() {
        let mut t = Table::new();
        t.push_column(Column::new("a", ColumnData::Int32(vec![Some(1)])))
            .unwrap();
        assert!(matches!(
            t.push_column(Column::new("a", ColumnData::Int32(vec![Some(2)]))),
            Err(StoreError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn nullability_inferred() {
        assert!(!Column::new("x", ColumnData::Float64(vec![Some(1.0)])).nullable);
        assert!(Column::new("x", ColumnData::Float64(vec![None])).nullable);
        assert!(Column::nullable("x", ColumnData::Float64(vec![Some(1.0)])).nullable);
    }

    #[test]
    fn numeric_views() {
        let c = Column::new("x", ColumnData::Int32(vec![Some(1), None]));
        assert_eq!(c.as_f64().unwrap(), vec![Some(1.0), None]);
        let d = Column::new("d", ColumnData::Date32(vec![NaiveDate::from_ymd_opt(2020, 1, 1)]));
        assert!(d.as_f64().is_none());
        assert!(d.as_dates().is_some());
    }

    #[test]
    fn lookup_and_counts() {
        let mut t = Table::new();
        assert_eq!(t.num_rows(), 0);
        t.push_column(Column::new("id", ColumnData::Int64(vec![Some(1), Some(2), Some(3)])))
            .unwrap();
        t.set_metadata("k", "v");
        assert_eq!(t.num_rows(), 3);
        assert_eq!(t.num_columns(), 1);
        assert!(t.column("id").is_some());
        assert!(t.column("nope").is_none());
        assert_eq!(t.metadata_value("k"), Some("v"));
        assert_eq!(t.column_names(), vec!["id"]);
    }
}

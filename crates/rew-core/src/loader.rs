//! CSV ingestion for the baseline and monthly tables.
//!
//! Loading is all-or-nothing: a missing file, a missing declared column or an
//! unparseable cell aborts with a schema error naming the table, row and
//! column. Undeclared columns are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use rew_common::{EntityId, Error, Result};
use rew_config::PipelineConfig;
use tracing::{debug, info};

use crate::panel::{parse_period, BaselineTable, MonthlyRecord, MonthlyTable};

pub(crate) const BASELINE_TABLE: &str = "baseline";
pub(crate) const MONTHLY_TABLE: &str = "monthly";

/// A CSV source with resolved column positions.
pub(crate) struct CsvTable<R: Read> {
    name: &'static str,
    reader: csv::Reader<R>,
    headers: StringRecord,
}

impl CsvTable<File> {
    pub(crate) fn open(name: &'static str, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::csv(path, e))?;
        Self::from_reader(name, file).map_err(|e| match e {
            Error::Csv { message, .. } => Error::csv(path, message),
            other => other,
        })
    }
}

impl<R: Read> CsvTable<R> {
    pub(crate) fn from_reader(name: &'static str, source: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);
        let headers = reader
            .headers()
            .map_err(|e| Error::Csv {
                path: name.to_string(),
                message: e.to_string(),
            })?
            .clone();
        Ok(Self {
            name,
            reader,
            headers,
        })
    }

    /// Position of a declared column.
    pub(crate) fn index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| Error::missing_column(self.name, column))
    }

    pub(crate) fn indices(&self, columns: &[String]) -> Result<Vec<usize>> {
        columns.iter().map(|c| self.index(c)).collect()
    }

    /// Visit every data row with its 1-based file line number.
    pub(crate) fn for_each_row(
        mut self,
        mut visit: impl FnMut(&Cells<'_>) -> Result<()>,
    ) -> Result<()> {
        let name = self.name;
        for (i, row) in self.reader.records().enumerate() {
            let record = row.map_err(|e| Error::Csv {
                path: name.to_string(),
                message: e.to_string(),
            })?;
            let cells = Cells {
                table: name,
                line: i + 2,
                headers: &self.headers,
                record: &record,
            };
            visit(&cells)?;
        }
        Ok(())
    }
}

/// One parsed CSV row.
pub(crate) struct Cells<'a> {
    table: &'static str,
    line: usize,
    headers: &'a StringRecord,
    record: &'a StringRecord,
}

impl Cells<'_> {
    fn raw(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("")
    }

    fn invalid(&self, idx: usize) -> Error {
        Error::InvalidValue {
            table: self.table.to_string(),
            row: self.line,
            column: self.headers.get(idx).unwrap_or("?").to_string(),
            value: self.raw(idx).to_string(),
        }
    }

    pub(crate) fn entity_id(&self, idx: usize) -> Result<EntityId> {
        self.raw(idx).parse().map_err(|_| self.invalid(idx))
    }

    pub(crate) fn period(&self, idx: usize) -> Result<chrono::NaiveDate> {
        parse_period(self.raw(idx)).ok_or_else(|| self.invalid(idx))
    }

    pub(crate) fn numeric(&self, idx: usize) -> Result<Option<f64>> {
        parse_numeric(self.raw(idx)).ok_or_else(|| self.invalid(idx))
    }

    /// A 0/1 label; empty cells are unlabeled.
    pub(crate) fn binary(&self, idx: usize) -> Result<Option<u8>> {
        match self.numeric(idx)? {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(Some(0)),
            Some(v) if v == 1.0 => Ok(Some(1)),
            Some(_) => Err(self.invalid(idx)),
        }
    }
}

/// Parse a numeric cell. `Some(None)` is a missing value; `None` is
/// unparseable text. NaN, infinities and literals that overflow `f64` are
/// missing values.
pub(crate) fn parse_numeric(cell: &str) -> Option<Option<f64>> {
    let s = cell.trim();
    if s.is_empty()
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
    {
        return Some(None);
    }
    if s.eq_ignore_ascii_case("true") {
        return Some(Some(1.0));
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(Some(0.0));
    }
    let v: f64 = s.parse().ok()?;
    Some(v.is_finite().then_some(v))
}

pub(crate) fn read_baseline<R: Read>(
    csv: CsvTable<R>,
    id_col: &str,
    features: &[String],
) -> Result<BaselineTable> {
    let id_idx = csv.index(id_col)?;
    let feature_idx = csv.indices(features)?;
    let mut table = BaselineTable::new(features.to_vec());
    csv.for_each_row(|cells| {
        let id = cells.entity_id(id_idx)?;
        let values = feature_idx
            .iter()
            .map(|&i| cells.numeric(i))
            .collect::<Result<Vec<_>>>()?;
        table.insert(id, values)
    })?;
    Ok(table)
}

pub(crate) fn read_monthly<R: Read>(
    csv: CsvTable<R>,
    id_col: &str,
    date_col: &str,
    indicators: &[String],
) -> Result<MonthlyTable> {
    let id_idx = csv.index(id_col)?;
    let date_idx = csv.index(date_col)?;
    let shock_idx = csv.indices(indicators)?;
    let mut table = MonthlyTable::new(indicators.to_vec());
    csv.for_each_row(|cells| {
        let record = MonthlyRecord {
            entity_id: cells.entity_id(id_idx)?,
            period: cells.period(date_idx)?,
            shocks: shock_idx
                .iter()
                .map(|&i| cells.numeric(i))
                .collect::<Result<Vec<_>>>()?,
        };
        table.push(record);
        Ok(())
    })?;
    Ok(table)
}

/// Load the baseline table named by the configuration.
pub fn load_baseline(path: &Path, config: &PipelineConfig) -> Result<BaselineTable> {
    debug!(path = %path.display(), "loading baseline table");
    let table = read_baseline(
        CsvTable::open(BASELINE_TABLE, path)?,
        &config.columns.id_col,
        &config.columns.baseline_features,
    )?;
    info!(path = %path.display(), entities = table.len(), "baseline loaded");
    Ok(table)
}

/// Load the monthly shock table named by the configuration.
pub fn load_monthly(path: &Path, config: &PipelineConfig) -> Result<MonthlyTable> {
    debug!(path = %path.display(), "loading monthly table");
    let table = read_monthly(
        CsvTable::open(MONTHLY_TABLE, path)?,
        &config.columns.id_col,
        &config.columns.date_col,
        &config.columns.monthly_shock_events,
    )?;
    info!(path = %path.display(), rows = table.len(), "monthly shocks loaded");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn numeric_cells() {
        assert_eq!(parse_numeric("1"), Some(Some(1.0)));
        assert_eq!(parse_numeric(" 0.25 "), Some(Some(0.25)));
        assert_eq!(parse_numeric("TRUE"), Some(Some(1.0)));
        assert_eq!(parse_numeric("false"), Some(Some(0.0)));
        assert_eq!(parse_numeric(""), Some(None));
        assert_eq!(parse_numeric("NA"), Some(None));
        assert_eq!(parse_numeric("NaN"), Some(None));
        assert_eq!(parse_numeric("null"), Some(None));
        assert_eq!(parse_numeric("yes"), None);
    }

    #[test]
    fn non_finite_cells_are_missing() {
        assert_eq!(parse_numeric("inf"), Some(None));
        assert_eq!(parse_numeric("-Infinity"), Some(None));
        assert_eq!(parse_numeric("1e400"), Some(None));
        assert_eq!(parse_numeric("-1e400"), Some(None));
        assert_eq!(parse_numeric("1e300"), Some(Some(1e300)));
    }

    #[test]
    fn baseline_reads_declared_columns_only() {
        let data = "household_id,land,notes,livestock\n1,0.5,x,0\n2,5,y,\n";
        let csv = CsvTable::from_reader(BASELINE_TABLE, data.as_bytes()).unwrap();
        let t = read_baseline(csv, "household_id", &names(&["land", "livestock"])).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(EntityId(1)), Some(&[Some(0.5), Some(0.0)][..]));
        assert_eq!(t.get(EntityId(2)), Some(&[Some(5.0), None][..]));
    }

    #[test]
    fn missing_column_named() {
        let data = "household_id,land\n1,0.5\n";
        let csv = CsvTable::from_reader(BASELINE_TABLE, data.as_bytes()).unwrap();
        let err = read_baseline(csv, "household_id", &names(&["livestock"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "baseline table is missing required column 'livestock'"
        );
    }

    #[test]
    fn duplicate_baseline_id_rejected() {
        let data = "household_id,land\n1,0.5\n1,0.7\n";
        let csv = CsvTable::from_reader(BASELINE_TABLE, data.as_bytes()).unwrap();
        assert!(matches!(
            read_baseline(csv, "household_id", &names(&["land"])),
            Err(Error::DuplicateKey { .. })
        ));
    }

    #[test]
    fn bad_cell_reports_row_and_column() {
        let data = "household_id,report_date,drought\n1,2016-01-01,0\n1,2016-02-01,often\n";
        let csv = CsvTable::from_reader(MONTHLY_TABLE, data.as_bytes()).unwrap();
        let err = read_monthly(csv, "household_id", "report_date", &names(&["drought"])).unwrap_err();
        match err {
            Error::InvalidValue {
                table,
                row,
                column,
                value,
            } => {
                assert_eq!(table, "monthly");
                assert_eq!(row, 3);
                assert_eq!(column, "drought");
                assert_eq!(value, "often");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn monthly_periods_truncated() {
        let data = "household_id,report_date,drought\n7,2016-03-15,1\n7,2016-04,\n";
        let csv = CsvTable::from_reader(MONTHLY_TABLE, data.as_bytes()).unwrap();
        let t = read_monthly(csv, "household_id", "report_date", &names(&["drought"])).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.records[0].period, chrono::NaiveDate::from_ymd_opt(2016, 3, 1).unwrap());
        assert_eq!(t.records[1].shocks, vec![None]);
    }

    #[test]
    fn overflowing_shock_cells_load_as_missing() {
        let data = "household_id,report_date,drought,flood\n1,2016-01-01,inf,0\n1,2016-02-01,1e400,0\n";
        let csv = CsvTable::from_reader(MONTHLY_TABLE, data.as_bytes()).unwrap();
        let t = read_monthly(csv, "household_id", "report_date", &names(&["drought", "flood"])).unwrap();
        assert_eq!(t.records[0].shocks, vec![None, Some(0.0)]);
        assert_eq!(t.records[1].shocks, vec![None, Some(0.0)]);
    }

    #[test]
    fn bad_period_rejected() {
        let data = "household_id,report_date,drought\n7,spring,1\n";
        let csv = CsvTable::from_reader(MONTHLY_TABLE, data.as_bytes()).unwrap();
        assert!(matches!(
            read_monthly(csv, "household_id", "report_date", &names(&["drought"])),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_file_is_fatal() {
        let cfg = PipelineConfig::default();
        let err = load_baseline(Path::new("/nonexistent/baseline.csv"), &cfg).unwrap_err();
        assert!(matches!(err, Error::Csv { .. }));
    }
}

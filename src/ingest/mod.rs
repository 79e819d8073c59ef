pub mod delimited;
pub mod workbook;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::date_util::{
    detect_slash_order, from_excel_serial, normalize_header, parse_date_text_in, SlashOrder,
};
use crate::error::{Error, Result};

/// What to do with rows that cannot be placed in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRowPolicy {
    /// Drop without telling anyone. Skipped rows stay listed on the dataset.
    #[default]
    Drop,
    /// Drop and log a warning per row.
    Report,
}

impl std::str::FromStr for InvalidRowPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "report" => Ok(Self::Report),
            other => Err(Error::Config(format!(
                "invalid row policy must be 'drop' or 'report', got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for InvalidRowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// Input container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// xlsx, xlsm, xlsb, xls or ods, read through calamine.
    Workbook,
    Csv,
}

impl SourceFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| {
                Error::DataFormat(format!("cannot tell file type of {}", path.display()))
            })?;
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Ok(Self::Workbook),
            "csv" | "txt" => Ok(Self::Csv),
            other => Err(Error::DataFormat(format!("unsupported file type: .{other}"))),
        }
    }
}

/// A single cell as read from the source, before cleaning.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Interpret the cell as a calendar date. Numbers are Excel serials;
    /// text slash dates are read in `order`.
    pub fn as_date(&self, order: SlashOrder) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Number(n) => from_excel_serial(*n),
            CellValue::Text(s) => parse_date_text_in(s, order),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }

    /// Interpret the cell as a grouping label (department name).
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.to_string()),
        }
    }

    fn raw_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.to_string()),
        }
    }
}

/// Header row plus data rows, as read from a file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// One cleaned inspection row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// 1-based row number in the source, counting the header row.
    pub row: usize,
    pub date: NaiveDate,
    pub department: String,
    /// Numeric cells keyed by column name.
    pub values: BTreeMap<String, f64>,
}

impl Record {
    /// Value of a numeric column; empty cells count as zero.
    pub fn value(&self, column: &str) -> f64 {
        self.values.get(column).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    InvalidDate,
    MissingDepartment,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidDate => write!(f, "invalid date"),
            SkipReason::MissingDepartment => write!(f, "missing department"),
        }
    }
}

/// A source row that was left out of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
    /// The date cell as written, when there was one.
    pub raw_date: Option<String>,
}

/// Earliest and latest record dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.min && date <= self.max
    }
}

/// Result of Load & Clean.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    /// Every header, deduplicated, in source order.
    pub columns: Vec<String>,
    /// Columns whose non-empty cells are all numbers, in source order.
    pub metric_columns: Vec<String>,
    pub records: Vec<Record>,
    pub skipped: Vec<SkippedRow>,
}

impl Dataset {
    /// Build a dataset directly from records. Metric columns are every key
    /// that appears in any record's values.
    pub fn from_records(records: Vec<Record>) -> Self {
        let metric_columns: Vec<String> = records
            .iter()
            .flat_map(|r| r.values.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            columns: metric_columns.clone(),
            metric_columns,
            records,
            skipped: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn date_bounds(&self) -> Option<DateBounds> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some(DateBounds { min, max })
    }

    /// Find a column by name, ignoring case and spacing differences.
    pub fn resolve_column(&self, name: &str) -> Option<&str> {
        find_column(&self.columns, name).map(|i| self.columns[i].as_str())
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.metric_columns.iter().any(|c| c == column)
    }
}

/// Load a spreadsheet from disk, detecting the format from the extension.
pub fn load_path(path: impl AsRef<Path>, config: &ReportConfig) -> Result<Dataset> {
    let path = path.as_ref();
    let table = match SourceFormat::from_path(path)? {
        SourceFormat::Workbook => workbook::read_path(path, config.sheet.as_deref())?,
        SourceFormat::Csv => delimited::read_path(path)?,
    };
    log::debug!("Read {} rows from {}", table.rows.len(), path.display());
    clean(table, config)
}

/// Load a spreadsheet from an in-memory upload.
pub fn load_bytes(bytes: Vec<u8>, format: SourceFormat, config: &ReportConfig) -> Result<Dataset> {
    let table = match format {
        SourceFormat::Workbook => workbook::read_bytes(bytes, config.sheet.as_deref())?,
        SourceFormat::Csv => delimited::read_bytes(&bytes)?,
    };
    clean(table, config)
}

/// Turn a raw table into records: coerce dates, drop unplaceable rows and
/// work out which columns are numeric.
pub fn clean(table: RawTable, config: &ReportConfig) -> Result<Dataset> {
    let columns = dedupe_headers(&table.headers);
    let date_idx = find_column(&columns, &config.date_column).ok_or_else(|| {
        Error::DataFormat(format!("missing date column '{}'", config.date_column))
    })?;
    let dept_idx = find_column(&columns, &config.department_column).ok_or_else(|| {
        Error::DataFormat(format!(
            "missing department column '{}'",
            config.department_column
        ))
    })?;

    let slash_order = config.date_order.unwrap_or_else(|| {
        let texts = table.rows.iter().filter_map(|row| match row.get(date_idx) {
            Some(CellValue::Text(s)) => Some(s.as_str()),
            _ => None,
        });
        let order = detect_slash_order(texts).unwrap_or_default();
        log::debug!("Reading slash dates in '{}' {order}", columns[date_idx]);
        order
    });

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut non_numeric = vec![false; columns.len()];

    for (i, row) in table.rows.iter().enumerate() {
        let row_number = i + 2;
        if row.iter().all(CellValue::is_empty) {
            continue;
        }

        let date_cell = row.get(date_idx).unwrap_or(&CellValue::Empty);
        let Some(date) = date_cell.as_date(slash_order) else {
            skipped.push(SkippedRow {
                row: row_number,
                reason: SkipReason::InvalidDate,
                raw_date: date_cell.raw_text(),
            });
            continue;
        };

        let Some(department) = row.get(dept_idx).and_then(CellValue::as_label) else {
            skipped.push(SkippedRow {
                row: row_number,
                reason: SkipReason::MissingDepartment,
                raw_date: date_cell.raw_text(),
            });
            continue;
        };

        let mut values = BTreeMap::new();
        for (c, cell) in row.iter().enumerate().take(columns.len()) {
            if c == date_idx || c == dept_idx {
                continue;
            }
            match cell {
                CellValue::Number(n) => {
                    values.insert(columns[c].clone(), *n);
                }
                CellValue::Empty => {}
                _ => non_numeric[c] = true,
            }
        }

        records.push(Record {
            row: row_number,
            date,
            department,
            values,
        });
    }

    let metric_columns: Vec<String> = columns
        .iter()
        .enumerate()
        .filter(|(c, _)| *c != date_idx && *c != dept_idx && !non_numeric[*c])
        .map(|(_, name)| name.clone())
        .collect();

    // Mixed columns are not metrics; drop their stray numbers.
    if non_numeric.iter().any(|&n| n) {
        for record in &mut records {
            record.values.retain(|k, _| metric_columns.contains(k));
        }
    }

    match config.invalid_rows {
        InvalidRowPolicy::Report => {
            for s in &skipped {
                log::warn!(
                    "Skipping row {} ({}): {}",
                    s.row,
                    s.reason,
                    s.raw_date.as_deref().unwrap_or("<empty>")
                );
            }
        }
        InvalidRowPolicy::Drop => {
            log::debug!("Dropped {} rows without a usable date or department", skipped.len());
        }
    }
    log::info!(
        "Loaded {} records ({} numeric columns)",
        records.len(),
        metric_columns.len()
    );

    Ok(Dataset {
        columns,
        metric_columns,
        records,
        skipped,
    })
}

fn find_column(columns: &[String], name: &str) -> Option<usize> {
    let wanted = normalize_header(name);
    columns.iter().position(|c| normalize_header(c) == wanted)
}

/// Trim headers, name blank ones and suffix repeats (`X`, `X.1`, `X.2`).
fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let base = h.split_whitespace().collect::<Vec<_>>().join(" ");
            let base = if base.is_empty() {
                format!("Unnamed: {i}")
            } else {
                base
            };
            let count = seen.entry(normalize_header(&base)).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

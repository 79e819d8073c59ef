use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};

use super::{CellValue, RawTable};
use crate::date_util::{from_excel_serial, parse_date_text};
use crate::error::{Error, Result};

/// Read one worksheet of a workbook on disk.
pub fn read_path(path: &Path, sheet: Option<&str>) -> Result<RawTable> {
    let workbook = open_workbook_auto(path)?;
    read_sheet(workbook, sheet)
}

/// Read one worksheet of an uploaded workbook.
pub fn read_bytes(bytes: Vec<u8>, sheet: Option<&str>) -> Result<RawTable> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    read_sheet(workbook, sheet)
}

fn read_sheet<RS: Read + Seek>(mut workbook: Sheets<RS>, sheet: Option<&str>) -> Result<RawTable> {
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| {
                Error::DataFormat(format!(
                    "sheet '{wanted}' not found (available: {})",
                    names.join(", ")
                ))
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| Error::DataFormat("workbook has no sheets".into()))?,
    };
    log::debug!("Reading sheet '{name}' (of {})", names.len());

    let range = workbook.worksheet_range(&name)?;
    table_from_range(&range)
}

fn table_from_range(range: &Range<Data>) -> Result<RawTable> {
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| Error::DataFormat("sheet is empty, expected a header row".into()))?
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    let rows = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            from_excel_serial(serial)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::Text(serial.to_string()))
        }
        Data::DateTimeIso(s) => parse_date_text(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("{e:?}")),
    }
}

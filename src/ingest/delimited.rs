use std::io::Read;
use std::path::Path;

use super::{CellValue, RawTable};
use crate::error::Result;

pub fn read_path(path: &Path) -> Result<RawTable> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    read_table(reader)
}

pub fn read_bytes(bytes: &[u8]) -> Result<RawTable> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    read_table(reader)
}

fn read_table<R: Read>(mut reader: csv::Reader<R>) -> Result<RawTable> {
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(text_cell).collect());
    }
    Ok(RawTable { headers, rows })
}

/// CSV has no cell types: numeric-looking text becomes a number.
fn text_cell(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Empty;
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bytes() {
        let data = "TANGGAL,DEPT,ODOI,CHECK IN\n\
                    2024-01-01,PLANT,10,5\n\
                    2024-01-02,HSE,,2.5\n";
        let table = read_bytes(data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["TANGGAL", "DEPT", "ODOI", "CHECK IN"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], CellValue::Text("PLANT".into()));
        assert_eq!(table.rows[0][2], CellValue::Number(10.0));
        assert_eq!(table.rows[1][2], CellValue::Empty);
        assert_eq!(table.rows[1][3], CellValue::Number(2.5));
    }

    #[test]
    fn test_ragged_rows_are_accepted() {
        let data = "TANGGAL,DEPT,ODOI\n2024-01-01,PLANT\n2024-01-02,HSE,1,extra\n";
        let table = read_bytes(data.as_bytes()).unwrap();
        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.rows[1].len(), 4);
    }

    #[test]
    fn test_read_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odoi.csv");
        std::fs::write(&path, "TANGGAL,DEPT\n2024-01-01,PLANT\n").unwrap();
        let table = read_path(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_read_path_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        match read_path(&dir.path().join("absent.csv")) {
            Err(crate::error::Error::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_is_data_format() {
        let data = b"TANGGAL,DEPT\n2024-01-01,\xff\xfe\n";
        assert!(matches!(
            read_bytes(data),
            Err(crate::error::Error::DataFormat(_))
        ));
    }

    #[test]
    fn test_text_cell() {
        assert_eq!(text_cell("  "), CellValue::Empty);
        assert_eq!(text_cell(" 3 "), CellValue::Number(3.0));
        assert_eq!(text_cell("NaN"), CellValue::Text("NaN".into()));
        assert_eq!(text_cell("HSE"), CellValue::Text("HSE".into()));
    }
}

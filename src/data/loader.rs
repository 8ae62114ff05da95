use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use calamine::{Data, Reader, open_workbook_auto_from_rs};

use super::model::{Column, Table, Value, parse_date};
use crate::error::{Result, WrangleError};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Source formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    /// Dispatch by extension (case-insensitive).
    ///
    /// Supported formats:
    /// * `.csv`                          – UTF-8, comma-delimited, header row
    /// * `.xls` / `.xlsx` / `.xlsm` / `.ods` – first sheet, header row
    pub fn from_filename(filename: &str) -> Result<SourceFormat> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xls" | "xlsx" | "xlsm" | "ods" => Ok(SourceFormat::Spreadsheet),
            "" => Err(WrangleError::UnsupportedFormat(format!("'{filename}' has no extension"))),
            other => Err(WrangleError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

/// Load a table from raw bytes; `filename` only selects the parser.
pub fn load_bytes(bytes: &[u8], filename: &str) -> Result<Table> {
    let table = match SourceFormat::from_filename(filename)? {
        SourceFormat::Csv => parse_csv(bytes),
        SourceFormat::Spreadsheet => parse_spreadsheet(bytes),
    }
    .map_err(WrangleError::parse)?;

    log::info!(
        "Loaded '{filename}': {} rows, columns {:?}",
        table.n_rows(),
        table.column_names()
    );
    Ok(table)
}

/// Load an upload payload: base64 content, optionally carrying a data-URL
/// header such as `data:text/csv;base64,`.
pub fn load_upload(contents: &str, filename: &str) -> Result<Table> {
    // Reject the extension before spending time on decoding.
    SourceFormat::from_filename(filename)?;

    let payload = match contents.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => contents,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| WrangleError::Parse(format!("invalid base64 upload: {e}")))?;
    load_bytes(&bytes, filename)
}

/// Load a file from disk (desktop file dialog).
pub fn load_file(path: &Path) -> Result<Table> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    SourceFormat::from_filename(&filename)?;

    let bytes = std::fs::read(path)
        .map_err(|e| WrangleError::Parse(format!("reading {}: {e}", path.display())))?;
    load_bytes(&bytes, &filename)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: one header row with unique, non-empty column names.
/// Every column's type is inferred from its cells.
fn parse_csv(bytes: &[u8]) -> anyhow::Result<Table> {
    let text = std::str::from_utf8(bytes).context("CSV is not valid UTF-8")?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    check_headers(&headers)?;

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(value.to_string());
        }
    }

    let columns = headers
        .iter()
        .zip(cells.iter())
        .map(|(name, col_cells)| Column::from_text(name.clone(), col_cells))
        .collect();
    Table::from_columns(columns).map_err(anyhow::Error::new)
}

fn check_headers(headers: &[String]) -> anyhow::Result<()> {
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        bail!("file has no header row");
    }
    for (i, h) in headers.iter().enumerate() {
        if h.is_empty() {
            bail!("header {} is empty", i + 1);
        }
        if headers[..i].contains(h) {
            bail!("duplicate column name '{h}'");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

/// Read the first sheet of an `.xls`/`.xlsx`/`.ods` workbook.
/// The first row holds the column names.
fn parse_spreadsheet(bytes: &[u8]) -> anyhow::Result<Table> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no sheets")?
        .context("reading first sheet")?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .context("first sheet is empty")?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    check_headers(&headers)?;

    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (col_idx, col_cells) in cells.iter_mut().enumerate() {
            col_cells.push(row.get(col_idx).map(cell_to_value).unwrap_or(Value::Null));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::from_values(name, narrow_integral(values)))
        .collect();
    Table::from_columns(columns).map_err(anyhow::Error::new)
}

/// Workbooks store every number as a float; a column of whole numbers
/// (within the exactly representable range) loads as integers.
fn narrow_integral(values: Vec<Value>) -> Vec<Value> {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    let has_float = values.iter().any(|v| matches!(v, Value::Float(_)));
    let integral = values.iter().all(|v| match v {
        Value::Float(f) => f.fract() == 0.0 && f.abs() <= EXACT,
        Value::Integer(_) | Value::Null => true,
        _ => false,
    });
    if !(has_float && integral) {
        return values;
    }
    values
        .into_iter()
        .map(|v| match v {
            Value::Float(f) => Value::Integer(f as i64),
            other => other,
        })
        .collect()
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::finite(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(dt) => dt.as_datetime().map(Value::Date).unwrap_or(Value::Null),
        Data::DateTimeIso(s) => parse_date(s).map(Value::Date).unwrap_or(Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::data::model::DType;

    const SALES: &str = "id,revenue,cost\n1,100,40\n2,200,50\n3,150,45\n";

    #[test]
    fn loads_csv_with_types() {
        let t = load_bytes(SALES.as_bytes(), "sales.csv").unwrap();
        assert_eq!(t.column_names(), vec!["id", "revenue", "cost"]);
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.column("revenue").unwrap().dtype, DType::Integer);
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert!(load_bytes(SALES.as_bytes(), "SALES.CSV").is_ok());
    }

    #[test]
    fn txt_is_unsupported() {
        let err = load_bytes(SALES.as_bytes(), "sales.txt").unwrap_err();
        assert!(matches!(err, WrangleError::UnsupportedFormat(_)));
    }

    #[test]
    fn ragged_csv_is_a_parse_error() {
        let err = load_bytes(b"a,b\n1,2\n3\n", "bad.csv").unwrap_err();
        assert!(matches!(err, WrangleError::Parse(_)));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = load_bytes(&[b'a', b'\n', 0xff, 0xfe], "bad.csv").unwrap_err();
        assert!(matches!(err, WrangleError::Parse(_)));
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let err = load_bytes(b"a,a\n1,2\n", "dup.csv").unwrap_err();
        assert!(matches!(err, WrangleError::Parse(_)));
    }

    #[test]
    fn garbage_workbook_is_a_parse_error() {
        let err = load_bytes(b"definitely not a zip", "book.xlsx").unwrap_err();
        assert!(matches!(err, WrangleError::Parse(_)));
    }

    #[test]
    fn loads_first_sheet_of_workbook() {
        let bytes = include_bytes!("../../tests/fixtures/sales.xlsx");
        let t = load_bytes(bytes, "sales.xlsx").unwrap();

        assert_eq!(t.column_names(), vec!["id", "date", "region", "revenue", "ok"]);
        assert_eq!(t.n_rows(), 3);
        let dtypes: Vec<DType> = t.columns().iter().map(|c| c.dtype).collect();
        assert_eq!(
            dtypes,
            vec![DType::Integer, DType::Date, DType::Text, DType::Float, DType::Bool]
        );

        assert_eq!(
            t.column("id").unwrap().values,
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
        let march = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(t.column("date").unwrap().values[2], Value::Date(march));
        assert_eq!(t.column("region").unwrap().values[1], Value::Text("south".into()));
        // An error cell and an absent cell are both missing.
        assert_eq!(
            t.column("revenue").unwrap().values,
            vec![Value::Float(100.5), Value::Null, Value::Null]
        );
        assert_eq!(t.column("ok").unwrap().values[1], Value::Bool(false));
    }

    #[test]
    fn workbook_extension_aliases_share_the_parser() {
        let bytes = include_bytes!("../../tests/fixtures/sales.xlsx");
        for name in ["SALES.XLSX", "sales.xlsm"] {
            assert_eq!(load_bytes(bytes, name).unwrap().n_rows(), 3, "{name}");
        }
    }

    #[test]
    fn whole_number_floats_narrow_to_integers() {
        let values = narrow_integral(vec![Value::Float(2.0), Value::Null, Value::Float(-7.0)]);
        assert_eq!(values, vec![Value::Integer(2), Value::Null, Value::Integer(-7)]);

        let mixed = vec![Value::Float(2.0), Value::Float(2.5)];
        assert_eq!(narrow_integral(mixed.clone()), mixed);
    }

    #[test]
    fn decodes_data_url_upload() {
        let encoded = STANDARD.encode(SALES);
        let payload = format!("data:text/csv;base64,{encoded}");
        let t = load_upload(&payload, "sales.csv").unwrap();
        assert_eq!(t.n_rows(), 3);

        let bare = load_upload(&encoded, "sales.csv").unwrap();
        assert_eq!(bare, t);
    }

    #[test]
    fn bad_base64_is_a_parse_error() {
        let err = load_upload("data:text/csv;base64,@@@", "sales.csv").unwrap_err();
        assert!(matches!(err, WrangleError::Parse(_)));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        std::fs::write(&path, SALES).unwrap();
        assert_eq!(load_file(&path).unwrap().n_rows(), 3);
    }
}

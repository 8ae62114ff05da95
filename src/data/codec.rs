//! Table interchange and export: split JSON, CSV, Arrow and Parquet.
//!
//! Stages hand tables to each other directly; these encoders serve the
//! export menu, debug previews and any caller that needs a serialised table.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date64Array, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{Column, DType, Table, Value, parse_date};
use crate::error::{Result, WrangleError};

// ---------------------------------------------------------------------------
// Split JSON (`{columns, index, data}`)
// ---------------------------------------------------------------------------

/// Row-oriented JSON form used when stages are decoupled, matching
/// `df.to_json(orient='split')`.
///
/// `dtypes` is optional: when present it pins every column's type, when
/// absent the types are re-inferred from the cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitJson {
    pub columns: Vec<String>,
    pub index: Vec<i64>,
    pub data: Vec<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtypes: Option<Vec<String>>,
}

pub fn to_split_json(table: &Table) -> SplitJson {
    let data = (0..table.n_rows())
        .map(|r| table.row(r).into_iter().map(value_to_json).collect())
        .collect();
    SplitJson {
        columns: table.column_names(),
        index: table.index().to_vec(),
        data,
        dtypes: Some(
            table
                .columns()
                .iter()
                .map(|c| c.dtype.as_str().to_string())
                .collect(),
        ),
    }
}

pub fn to_json_string(table: &Table) -> Result<String> {
    serde_json::to_string(&to_split_json(table)).map_err(|e| WrangleError::Export(e.to_string()))
}

pub fn from_json_str(text: &str) -> Result<Table> {
    let split: SplitJson =
        serde_json::from_str(text).map_err(|e| WrangleError::Parse(format!("split JSON: {e}")))?;
    from_split_json(split)
}

pub fn from_split_json(split: SplitJson) -> Result<Table> {
    let n_cols = split.columns.len();
    if split.data.len() != split.index.len() {
        return Err(WrangleError::Parse(format!(
            "split JSON has {} rows but {} index labels",
            split.data.len(),
            split.index.len()
        )));
    }
    if let Some(row) = split.data.iter().position(|r| r.len() != n_cols) {
        return Err(WrangleError::Parse(format!(
            "split JSON row {row} has {} cells, expected {n_cols}",
            split.data[row].len()
        )));
    }

    let dtypes: Vec<Option<DType>> = match &split.dtypes {
        Some(names) if names.len() == n_cols => names
            .iter()
            .map(|n| {
                DType::from_name(n)
                    .map(Some)
                    .ok_or_else(|| WrangleError::Parse(format!("unknown dtype '{n}'")))
            })
            .collect::<Result<_>>()?,
        Some(names) => {
            return Err(WrangleError::Parse(format!(
                "split JSON has {} dtypes for {n_cols} columns",
                names.len()
            )));
        }
        None => vec![None; n_cols],
    };

    let columns = split
        .columns
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let cells = split.data.iter().map(|row| &row[c]);
            match dtypes[c] {
                Some(dtype) => typed_column(name, dtype, cells),
                None => Ok(Column::from_values(
                    name.clone(),
                    cells.map(json_to_value).collect(),
                )),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Table::new(columns, split.index)
}

fn value_to_json(v: &Value) -> JsonValue {
    match v {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(_) | Value::Date(_) => JsonValue::String(v.to_field()),
    }
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

fn typed_column<'a>(
    name: &str,
    dtype: DType,
    cells: impl Iterator<Item = &'a JsonValue>,
) -> Result<Column> {
    let values = cells
        .enumerate()
        .map(|(row, cell)| {
            let value = match (dtype, cell) {
                (_, JsonValue::Null) => Some(Value::Null),
                (DType::Integer, JsonValue::Number(n)) => n.as_i64().map(Value::Integer),
                (DType::Float, JsonValue::Number(n)) => n.as_f64().map(Value::Float),
                (DType::Bool, JsonValue::Bool(b)) => Some(Value::Bool(*b)),
                (DType::Date, JsonValue::String(s)) => parse_date(s).map(Value::Date),
                (DType::Text, JsonValue::String(s)) => Some(Value::Text(s.clone())),
                _ => None,
            };
            value.ok_or_else(|| {
                WrangleError::Parse(format!(
                    "column '{name}' row {row}: {cell} is not a valid {dtype}"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Column::new(name, dtype, values))
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

/// Serialise the table as CSV (header row, no index column).
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let export = |e: csv::Error| WrangleError::Export(e.to_string());

    writer.write_record(table.column_names()).map_err(export)?;
    for r in 0..table.n_rows() {
        writer
            .write_record(table.row(r).into_iter().map(Value::to_field))
            .map_err(export)?;
    }
    writer
        .into_inner()
        .map_err(|e| WrangleError::Export(e.to_string()))
}

pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(table)?;
    std::fs::write(path, bytes)
        .map_err(|e| WrangleError::Export(format!("writing {}: {e}", path.display())))?;
    log::info!("Exported {} rows to {}", table.n_rows(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Arrow / Parquet
// ---------------------------------------------------------------------------

fn arrow_type(dtype: DType) -> DataType {
    match dtype {
        DType::Text => DataType::Utf8,
        DType::Integer => DataType::Int64,
        DType::Float => DataType::Float64,
        DType::Bool => DataType::Boolean,
        DType::Date => DataType::Date64,
    }
}

fn arrow_array(col: &Column) -> ArrayRef {
    match col.dtype {
        DType::Integer => Arc::new(Int64Array::from(
            col.values
                .iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DType::Float => Arc::new(Float64Array::from(col.as_f64())),
        DType::Bool => Arc::new(BooleanArray::from(
            col.values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DType::Date => Arc::new(Date64Array::from(
            col.values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some(d.and_utc().timestamp_millis()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DType::Text => Arc::new(StringArray::from(
            col.values
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    other => Some(other.to_field()),
                })
                .collect::<Vec<_>>(),
        )),
    }
}

/// Convert to a single Arrow record batch.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(c.name.as_str(), arrow_type(c.dtype), true))
        .collect();
    let arrays: Vec<ArrayRef> = table.columns().iter().map(arrow_array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .map_err(|e| WrangleError::Export(e.to_string()))
}

/// Render the first `rows` rows as a boxed text table.
pub fn render_preview(table: &Table, rows: usize) -> Result<String> {
    let batch = to_record_batch(&table.head(rows))?;
    arrow::util::pretty::pretty_format_batches(&[batch])
        .map(|t| t.to_string())
        .map_err(|e| WrangleError::Export(e.to_string()))
}

pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let export = |e: &dyn std::fmt::Display| WrangleError::Export(format!("{}: {e}", path.display()));

    let batch = to_record_batch(table)?;
    let file = std::fs::File::create(path).map_err(|e| export(&e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).map_err(|e| export(&e))?;
    writer.write(&batch).map_err(|e| export(&e))?;
    writer.close().map_err(|e| export(&e))?;

    log::info!("Exported {} rows to {}", table.n_rows(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;

    const MIXED: &str = "\
id,when,price,label,ok
1,2024-01-05,2.0,a,true
2,2024-02-10T08:30:00,3.5,,false
3,,4.25,c,true
";

    #[test]
    fn csv_round_trip_is_identical() {
        let t = load_bytes(MIXED.as_bytes(), "m.csv").unwrap();
        let bytes = to_csv_bytes(&t).unwrap();
        let back = load_bytes(&bytes, "m.csv").unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn json_round_trip_keeps_types_and_index() {
        let t = load_bytes(MIXED.as_bytes(), "m.csv").unwrap().take(&[2, 0]);
        let text = to_json_string(&t).unwrap();
        let back = from_json_str(&text).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.index(), &[2, 0]);
    }

    #[test]
    fn json_without_dtypes_reinfers() {
        let text = r#"{"columns":["d","x"],"index":[0,1],"data":[["2024-01-01",1],["2024-01-02",2.5]]}"#;
        let t = from_json_str(text).unwrap();
        assert_eq!(t.column("d").unwrap().dtype, DType::Date);
        assert_eq!(t.column("x").unwrap().dtype, DType::Float);
    }

    #[test]
    fn json_with_ragged_rows_fails() {
        let text = r#"{"columns":["a","b"],"index":[0],"data":[[1]]}"#;
        assert!(matches!(from_json_str(text), Err(WrangleError::Parse(_))));
    }

    #[test]
    fn preview_renders_header() {
        let t = load_bytes(MIXED.as_bytes(), "m.csv").unwrap();
        let text = render_preview(&t, 2).unwrap();
        assert!(text.contains("price"));
        assert!(text.contains("2024-01-05"));
    }

    #[test]
    fn writes_parquet_file() {
        let t = load_bytes(MIXED.as_bytes(), "m.csv").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        write_parquet(&t, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, WrangleError};

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the common Pandas dtypes.
/// Rows are hashed for de-duplication, so `Value` must be `Eq + Hash`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDateTime),
}

// -- Manual Eq/Ord/Hash so floats compare by total order --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Date(_) => 5,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", format_date(d)),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by the statistics; `None` for anything else.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Wrap a computed float, mapping NaN/inf to `Null`.
    pub fn finite(v: f64) -> Value {
        if v.is_finite() {
            Value::Float(v)
        } else {
            Value::Null
        }
    }

    /// Lossless text form used by the CSV and JSON writers.
    ///
    /// Floats keep a decimal point (`2.0`, not `2`) so a re-parse infers the
    /// same column type.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Float(v) => format!("{v:?}"),
            other => other.to_string(),
        }
    }

    pub fn dtype(&self) -> Option<DType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DType::Bool),
            Value::Integer(_) => Some(DType::Integer),
            Value::Float(_) => Some(DType::Float),
            Value::Text(_) => Some(DType::Text),
            Value::Date(_) => Some(DType::Date),
        }
    }
}

// ---------------------------------------------------------------------------
// Text parsing helpers shared by the loaders
// ---------------------------------------------------------------------------

/// Tokens read as a missing cell, as Pandas does by default.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

pub fn is_missing_token(s: &str) -> bool {
    MISSING_TOKENS.contains(&s.trim())
}

/// ISO-8601 date or date-time (an offset, if present, is normalised to UTC).
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_time(NaiveTime::MIN));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

/// Dates at midnight print as `YYYY-MM-DD`, others as full ISO date-times.
pub fn format_date(d: &NaiveDateTime) -> String {
    if d.time() == NaiveTime::MIN {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Parses as a float but is NaN or infinite.
pub fn is_non_finite_number(s: &str) -> bool {
    matches!(s.trim().parse::<f64>(), Ok(v) if !v.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// DType / Column
// ---------------------------------------------------------------------------

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    Text,
    Integer,
    Float,
    Bool,
    Date,
}

impl DType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Integer | DType::Float)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DType::Text => "text",
            DType::Integer => "integer",
            DType::Float => "float",
            DType::Bool => "bool",
            DType::Date => "date",
        }
    }

    pub fn from_name(name: &str) -> Option<DType> {
        match name {
            "text" => Some(DType::Text),
            "integer" => Some(DType::Integer),
            "float" => Some(DType::Float),
            "bool" => Some(DType::Bool),
            "date" => Some(DType::Date),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, single-typed column. Any cell may be `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: DType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: DType, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Infer the column type from raw text cells.
    ///
    /// Order of preference: integer, float, bool, date, text. Missing tokens
    /// become `Null` and do not vote. In a numeric column, non-finite spellings
    /// (`-nan`, `inf`, `Infinity`, ...) are missing too.
    pub fn from_text<S: AsRef<str>>(name: impl Into<String>, cells: &[S]) -> Self {
        let present: Vec<&str> = cells
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !is_missing_token(c))
            .collect();
        let finite: Vec<&str> = present
            .iter()
            .copied()
            .filter(|c| !is_non_finite_number(c))
            .collect();
        let all_numeric = present
            .iter()
            .all(|c| c.trim().parse::<f64>().is_ok());

        let dtype = if present.is_empty() {
            DType::Text
        } else if all_numeric
            && !finite.is_empty()
            && finite.iter().all(|c| c.trim().parse::<i64>().is_ok())
        {
            DType::Integer
        } else if all_numeric {
            DType::Float
        } else if present.iter().all(|c| parse_bool(c).is_some()) {
            DType::Bool
        } else if present.iter().all(|c| parse_date(c).is_some()) {
            DType::Date
        } else {
            DType::Text
        };

        let values = cells
            .iter()
            .map(|c| {
                let c = c.as_ref();
                if is_missing_token(c) {
                    return Value::Null;
                }
                let t = c.trim();
                match dtype {
                    DType::Integer => t.parse().map(Value::Integer).unwrap_or(Value::Null),
                    DType::Float => t.parse().map(Value::finite).unwrap_or(Value::Null),
                    DType::Bool => parse_bool(t).map(Value::Bool).unwrap_or(Value::Null),
                    DType::Date => parse_date(t).map(Value::Date).unwrap_or(Value::Null),
                    DType::Text => Value::Text(c.to_string()),
                }
            })
            .collect();

        Column::new(name, dtype, values)
    }

    /// Build a column from already-typed cells (spreadsheet data, derived
    /// values).
    ///
    /// Integers mixed with floats widen to float; text cells are re-inferred
    /// when every non-missing cell is text; any other mix falls back to text.
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        let name = name.into();
        let kinds: HashSet<DType> = values.iter().filter_map(Value::dtype).collect();

        if kinds.is_empty() {
            return Column::new(name, DType::Text, values);
        }
        if kinds.len() == 1 {
            let dtype = *kinds.iter().next().unwrap_or(&DType::Text);
            if dtype == DType::Text {
                let cells: Vec<String> = values.iter().map(Value::to_field).collect();
                return Column::from_text(name, &cells);
            }
            return Column::new(name, dtype, values);
        }
        if kinds.iter().all(|k| k.is_numeric()) {
            let values = values
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => Value::Float(i as f64),
                    other => other,
                })
                .collect();
            return Column::new(name, DType::Float, values);
        }
        let values = values
            .into_iter()
            .map(|v| match v {
                Value::Null => Value::Null,
                other => Value::Text(other.to_field()),
            })
            .collect();
        Column::new(name, DType::Text, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype.is_numeric()
    }

    /// Numeric view of the column; `None` marks missing cells.
    pub fn as_f64(&self) -> Vec<Option<f64>> {
        self.values.iter().map(Value::as_f64).collect()
    }
}

// ---------------------------------------------------------------------------
// Table – the complete dataset flowing through the pipeline
// ---------------------------------------------------------------------------

/// Ordered named columns plus the source row labels.
///
/// Every column has exactly `index.len()` values; the constructors enforce
/// it and the row operations preserve it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    index: Vec<i64>,
}

impl Table {
    /// Build a table, validating column lengths and name uniqueness.
    pub fn new(columns: Vec<Column>, index: Vec<i64>) -> Result<Self> {
        let mut seen = HashSet::new();
        for col in &columns {
            if col.len() != index.len() {
                return Err(WrangleError::Parse(format!(
                    "column '{}' has {} values but the table has {} rows",
                    col.name,
                    col.len(),
                    index.len()
                )));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(WrangleError::Parse(format!("duplicate column name '{}'", col.name)));
            }
        }
        Ok(Table { columns, index })
    }

    /// Build a table with a fresh `0..n` index.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let n = columns.first().map(Column::len).unwrap_or(0);
        Self::new(columns, (0..n as i64).collect())
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Names of the integer/float columns, in table order.
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn row(&self, i: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[i]).collect()
    }

    /// New table with the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                dtype: c.dtype,
                values: rows.iter().map(|&r| c.values[r].clone()).collect(),
            })
            .collect();
        Table {
            columns,
            index: rows.iter().map(|&r| self.index[r]).collect(),
        }
    }

    /// Keep the rows whose mask entry is `true`.
    pub fn filter_mask(&self, mask: &[bool]) -> Table {
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| i)
            .collect();
        self.take(&rows)
    }

    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..self.n_rows().min(n)).collect();
        self.take(&rows)
    }

    /// Replace the column with the same name in place, or append it.
    pub fn with_column(mut self, column: Column) -> Result<Table> {
        if column.len() != self.n_rows() {
            return Err(WrangleError::Parse(format!(
                "column '{}' has {} values but the table has {} rows",
                column.name,
                column.len(),
                self.n_rows()
            )));
        }
        match self.columns.iter().position(|c| c.name == column.name) {
            Some(pos) => self.columns[pos] = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    /// Keep only the columns accepted by `keep`, in table order.
    pub fn retain_columns(&self, mut keep: impl FnMut(&Column) -> bool) -> Table {
        Table {
            columns: self.columns.iter().filter(|c| keep(c)).cloned().collect(),
            index: self.index.clone(),
        }
    }

    /// Swap in a transformed column with the same length.
    pub(crate) fn replace_column(&mut self, column: Column) {
        if let Some(pos) = self.columns.iter().position(|c| c.name == column.name) {
            if column.len() == self.n_rows() {
                self.columns[pos] = column;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_column_types() {
        assert_eq!(Column::from_text("a", &["1", "2", ""]).dtype, DType::Integer);
        assert_eq!(Column::from_text("a", &["1", "2.5"]).dtype, DType::Float);
        assert_eq!(Column::from_text("a", &["true", "False"]).dtype, DType::Bool);
        assert_eq!(
            Column::from_text("a", &["2024-01-05", "2024-02-01T10:30:00"]).dtype,
            DType::Date
        );
        assert_eq!(Column::from_text("a", &["1", "x"]).dtype, DType::Text);
        assert_eq!(Column::from_text("a", &["", "NA"]).dtype, DType::Text);
    }

    #[test]
    fn missing_tokens_become_null() {
        let col = Column::from_text("a", &["1", "NaN", "N/A", "3"]);
        assert_eq!(
            col.values,
            vec![Value::Integer(1), Value::Null, Value::Null, Value::Integer(3)]
        );
    }

    #[test]
    fn non_finite_numbers_are_missing() {
        let col = Column::from_text("v", &["1", "2", "-nan", "inf"]);
        assert_eq!(col.dtype, DType::Integer);
        assert_eq!(
            col.values,
            vec![Value::Integer(1), Value::Integer(2), Value::Null, Value::Null]
        );

        let col = Column::from_text("v", &["1.5", "-Infinity", "NAN"]);
        assert_eq!(col.dtype, DType::Float);
        assert_eq!(col.values, vec![Value::Float(1.5), Value::Null, Value::Null]);

        // Only numeric columns treat the spelling as missing.
        let col = Column::from_text("v", &["inf", "info"]);
        assert_eq!(col.dtype, DType::Text);
        assert_eq!(col.values[0], Value::Text("inf".into()));
    }

    #[test]
    fn mixed_numeric_values_widen_to_float() {
        let col = Column::from_values("a", vec![Value::Integer(1), Value::Float(2.5), Value::Null]);
        assert_eq!(col.dtype, DType::Float);
        assert_eq!(col.values[0], Value::Float(1.0));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let a = Column::new("a", DType::Integer, vec![Value::Integer(1)]);
        let b = Column::new("b", DType::Integer, vec![]);
        assert!(Table::from_columns(vec![a, b]).is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let a = Column::new("a", DType::Integer, vec![Value::Integer(1)]);
        assert!(Table::from_columns(vec![a.clone(), a]).is_err());
    }

    #[test]
    fn take_keeps_source_labels() {
        let a = Column::from_text("a", &["1", "2", "3"]);
        let t = Table::from_columns(vec![a]).unwrap();
        let sub = t.take(&[2, 0]);
        assert_eq!(sub.index(), &[2, 0]);
        assert_eq!(sub.column("a").unwrap().values, vec![Value::Integer(3), Value::Integer(1)]);
    }

    #[test]
    fn with_column_replaces_in_place() {
        let t = Table::from_columns(vec![
            Column::from_text("a", &["1"]),
            Column::from_text("b", &["2"]),
        ])
        .unwrap();
        let t = t.with_column(Column::from_text("a", &["x"])).unwrap();
        assert_eq!(t.column_names(), vec!["a", "b"]);
        assert_eq!(t.column("a").unwrap().dtype, DType::Text);
    }

    #[test]
    fn float_fields_keep_decimal_point() {
        assert_eq!(Value::Float(2.0).to_field(), "2.0");
        assert_eq!(Value::Float(0.1).to_field(), "0.1");
    }

    #[test]
    fn dates_format_as_iso() {
        let d = parse_date("2024-03-01").unwrap();
        assert_eq!(format_date(&d), "2024-03-01");
        let dt = parse_date("2024-03-01T08:15:00").unwrap();
        assert_eq!(format_date(&dt), "2024-03-01T08:15:00");
    }
}

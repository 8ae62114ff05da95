use std::collections::HashSet;

use super::model::{Column, DType, Table, Value};
use super::stats;
use crate::config::PipelineConfig;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Cleaning pipeline
// ---------------------------------------------------------------------------

/// Produce a cleaned table suitable for analysis.
///
/// Steps, in order:
/// 1. drop exact duplicate rows (first occurrence wins)
/// 2. drop rows with any missing cell
/// 3. coerce all-numeric text columns to integer/float
/// 4. IQR outlier removal per numeric column, in column order
pub fn preprocess(table: &Table, config: &PipelineConfig) -> Result<Table> {
    let before = table.n_rows();

    let deduped = drop_duplicates(table);
    let complete = drop_missing(&deduped);
    let coerced = coerce_numeric(&complete);
    let cleaned = remove_outliers(&coerced, config);

    log::info!(
        "Preprocessed {before} rows -> {} (duplicates {}, incomplete {}, outliers {})",
        cleaned.n_rows(),
        before - deduped.n_rows(),
        deduped.n_rows() - complete.n_rows(),
        coerced.n_rows() - cleaned.n_rows(),
    );
    Ok(cleaned)
}

/// Remove rows whose every cell equals an earlier row's.
pub fn drop_duplicates(table: &Table) -> Table {
    let mut seen = HashSet::new();
    let rows: Vec<usize> = (0..table.n_rows())
        .filter(|&r| seen.insert(table.row(r)))
        .collect();
    table.take(&rows)
}

/// Remove rows containing a `Null` in any column.
pub fn drop_missing(table: &Table) -> Table {
    let mask: Vec<bool> = (0..table.n_rows())
        .map(|r| table.columns().iter().all(|c| !c.values[r].is_null()))
        .collect();
    table.filter_mask(&mask)
}

/// Convert text columns whose every value parses as a number.
///
/// All-or-nothing per column: a single non-numeric cell leaves the column as
/// text, so coercion never introduces missing values.
pub fn coerce_numeric(table: &Table) -> Table {
    let mut out = table.clone();
    for col in table.columns().iter().filter(|c| c.dtype == DType::Text) {
        let present: Vec<&str> = col
            .values
            .iter()
            .filter_map(|v| match v {
                Value::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        let is_finite_number = |s: &&str| matches!(s.trim().parse::<f64>(), Ok(v) if v.is_finite());
        if present.is_empty() || !present.iter().all(is_finite_number) {
            continue;
        }
        let coerced = Column::from_text(col.name.clone(), &text_cells(col));
        if coerced.is_numeric() {
            log::debug!("Coerced column '{}' to {}", col.name, coerced.dtype);
            out.replace_column(coerced);
        }
    }
    out
}

fn text_cells(col: &Column) -> Vec<String> {
    col.values.iter().map(Value::to_field).collect()
}

/// Drop rows outside `[Q1 - k·IQR, Q3 + k·IQR]`, one numeric column at a
/// time in table order. A row removed by one column no longer counts toward
/// later columns' quartiles.
///
/// With `iterate_outlier_removal` the sweep repeats until nothing changes.
pub fn remove_outliers(table: &Table, config: &PipelineConfig) -> Table {
    let numeric = table.numeric_column_names();
    let mut current = table.clone();
    loop {
        let before = current.n_rows();
        for name in &numeric {
            current = iqr_pass(&current, name, config.iqr_multiplier);
        }
        if !config.iterate_outlier_removal || current.n_rows() == before {
            return current;
        }
    }
}

fn iqr_pass(table: &Table, name: &str, k: f64) -> Table {
    let Some(col) = table.column(name) else {
        return table.clone();
    };
    let values = col.as_f64();
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let (Some(q1), Some(q3)) = (stats::quantile(&present, 0.25), stats::quantile(&present, 0.75))
    else {
        return table.clone();
    };
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - k * iqr, q3 + k * iqr);

    // Missing cells are not outliers.
    let mask: Vec<bool> = values
        .iter()
        .map(|v| v.map_or(true, |x| x >= lo && x <= hi))
        .collect();
    let kept = table.filter_mask(&mask);
    if kept.n_rows() < table.n_rows() {
        log::debug!(
            "IQR on '{name}': bounds [{lo}, {hi}], dropped {}",
            table.n_rows() - kept.n_rows()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;

    fn csv(text: &str) -> Table {
        load_bytes(text.as_bytes(), "t.csv").unwrap()
    }

    #[test]
    fn clean_table_is_unchanged() {
        let t = csv("id,revenue,cost\n1,100,40\n2,200,50\n3,150,45\n");
        let out = preprocess(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out, t);
    }

    #[test]
    fn drops_duplicates_and_missing() {
        let t = csv("a,b\n1,x\n1,x\n2,\n3,y\n");
        let out = preprocess(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out.index(), &[0, 3]);
    }

    #[test]
    fn removes_iqr_outliers() {
        let t = csv("v\n10\n11\n12\n13\n14\n1000\n");
        let out = preprocess(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out.n_rows(), 5);
        assert!(out.column("v").unwrap().as_f64().iter().all(|v| v.unwrap() < 100.0));
    }

    #[test]
    fn outlier_pass_follows_column_order() {
        let single = PipelineConfig {
            iterate_outlier_removal: false,
            ..PipelineConfig::default()
        };
        // Dropping row 5 via `a` first makes row 4 an outlier in `b`.
        let t = csv("a,b\n1,10\n2,10\n3,10\n4,10\n5,20\n500,40\n");
        assert_eq!(remove_outliers(&t, &single).index(), &[0, 1, 2, 3]);

        let swapped = csv("b,a\n10,1\n10,2\n10,3\n10,4\n20,5\n40,500\n");
        assert_eq!(remove_outliers(&swapped, &single).index(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn coerces_text_column_once_junk_row_is_gone() {
        // "oops" keeps `k` as text at load time; its row is incomplete.
        let t = csv("k,v\n1,a\n2,b\noops,\n");
        assert_eq!(t.column("k").unwrap().dtype, DType::Text);
        let out = coerce_numeric(&drop_missing(&t));
        assert_eq!(out.column("k").unwrap().dtype, DType::Integer);
        assert_eq!(out.column("k").unwrap().values, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn non_finite_cells_are_dropped_as_missing() {
        let t = csv("v,w\n1,10\n2,11\n3,12\n-nan,13\n4,inf\n");
        let out = preprocess(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out.index(), &[0, 1, 2]);
        assert_eq!(out.column("v").unwrap().values, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
    }

    #[test]
    fn infinite_text_is_not_coerced() {
        let text = Column::new(
            "s",
            DType::Text,
            vec![Value::Text("1".into()), Value::Text("inf".into())],
        );
        let t = Table::from_columns(vec![text]).unwrap();
        assert_eq!(coerce_numeric(&t), t);
    }

    #[test]
    fn mixed_text_column_is_left_alone() {
        let text = Column::new(
            "s",
            DType::Text,
            vec![Value::Text("1".into()), Value::Text("one".into())],
        );
        let t = Table::from_columns(vec![text]).unwrap();
        assert_eq!(coerce_numeric(&t), t);
    }

    #[test]
    fn preprocessing_is_idempotent() {
        let t = csv("a,b,c\n1,5,x\n2,6,y\n2,6,y\n3,7,\n4,8,z\n5,200,w\n6,9,v\n7,10,u\n40,11,t\n8,12,s\n");
        let cfg = PipelineConfig::default();
        let once = preprocess(&t, &cfg).unwrap();
        let twice = preprocess(&once, &cfg).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_table_passes_through() {
        let t = csv("a,b\n");
        let out = preprocess(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out.n_rows(), 0);
        assert_eq!(out.column_names(), vec!["a", "b"]);
    }
}

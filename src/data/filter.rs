use std::collections::BTreeSet;

use super::evaluate::{PERCENTILE_SUFFIX, ZSCORE_SUFFIX};
use super::expr::{Expression, Series};
use super::model::Table;
use crate::config::PipelineConfig;
use crate::error::{Result, WrangleError};

// ---------------------------------------------------------------------------
// Column projection
// ---------------------------------------------------------------------------

/// Keep only the selected columns, in table order.
///
/// * empty selection → no-op (all columns)
/// * unknown name → error, nothing projected
pub fn project_columns<S: AsRef<str>>(table: &Table, selected: &[S]) -> Result<Table> {
    if selected.is_empty() {
        return Ok(table.clone());
    }
    let wanted: BTreeSet<&str> = selected.iter().map(|s| s.as_ref()).collect();
    if let Some(missing) = wanted.iter().find(|name| table.column(name).is_none()) {
        return Err(WrangleError::formula(format!(
            "unknown column '{missing}' in selection"
        )));
    }
    Ok(table.retain_columns(|c| wanted.contains(c.name.as_str())))
}

// ---------------------------------------------------------------------------
// Row filtering
// ---------------------------------------------------------------------------

/// Keep the rows where `expression` is true; false or missing rows drop.
/// A blank or absent expression returns the table unchanged.
pub fn filter_rows(table: &Table, expression: Option<&str>) -> Result<Table> {
    let Some(source) = expression.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(table.clone());
    };

    let expr = Expression::parse(source)?;
    let mask: Vec<bool> = match expr.evaluate(table)? {
        Series::Bool(values) => values.into_iter().map(|v| v == Some(true)).collect(),
        other => {
            return Err(WrangleError::formula(format!(
                "filter '{source}' must be a condition, got {}",
                match other {
                    Series::Int(_) | Series::Float(_) => "a number",
                    _ => "text",
                }
            )));
        }
    };

    let out = table.filter_mask(&mask);
    log::info!(
        "Filter '{source}' kept {} of {} rows",
        out.n_rows(),
        table.n_rows()
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// Statistical filtering
// ---------------------------------------------------------------------------

/// Drop rows whose z-score or percentile lies outside the configured limits,
/// then drop the `_zscore` / `_percentile` columns themselves.
///
/// A table without those columns is returned unchanged.
pub fn filter_statistical(table: &Table, config: &PipelineConfig) -> Result<Table> {
    let zscore_cols: Vec<String> = table
        .column_names()
        .into_iter()
        .filter(|n| n.ends_with(ZSCORE_SUFFIX))
        .collect();
    let percentile_cols: Vec<String> = table
        .column_names()
        .into_iter()
        .filter(|n| n.ends_with(PERCENTILE_SUFFIX))
        .collect();

    let (lo, hi) = config.percentile_band;
    let mut current = table.clone();

    for name in &zscore_cols {
        let mask = keep_where(&current, name, |z| z.abs() <= config.zscore_limit);
        current = current.filter_mask(&mask);
    }
    for name in &percentile_cols {
        let mask = keep_where(&current, name, |p| p >= lo && p <= hi);
        current = current.filter_mask(&mask);
    }

    let aux: BTreeSet<&String> = zscore_cols.iter().chain(&percentile_cols).collect();
    let out = current.retain_columns(|c| !aux.contains(&c.name));
    if !aux.is_empty() {
        log::info!(
            "Statistical filter kept {} of {} rows, dropped {} helper columns",
            out.n_rows(),
            table.n_rows(),
            aux.len()
        );
    }
    Ok(out)
}

/// Missing statistics (e.g. z-score of a constant column) fail the test.
fn keep_where(table: &Table, name: &str, pred: impl Fn(f64) -> bool) -> Vec<bool> {
    match table.column(name) {
        Some(col) => col.as_f64().into_iter().map(|v| v.is_some_and(&pred)).collect(),
        None => vec![true; table.n_rows()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::evaluate::augment_statistics;
    use crate::data::loader::load_bytes;

    fn sales() -> Table {
        load_bytes(
            b"id,revenue,cost,region\n1,100,40,n\n2,200,50,s\n3,150,45,n\n",
            "sales.csv",
        )
        .unwrap()
    }

    #[test]
    fn blank_expression_is_a_no_op() {
        let t = sales();
        assert_eq!(filter_rows(&t, None).unwrap(), t);
        assert_eq!(filter_rows(&t, Some("")).unwrap(), t);
        assert_eq!(filter_rows(&t, Some("   ")).unwrap(), t);
    }

    #[test]
    fn keeps_matching_rows() {
        let out = filter_rows(&sales(), Some("revenue >= 150 and region == 'n'")).unwrap();
        assert_eq!(out.index(), &[2]);
    }

    #[test]
    fn unknown_column_leaves_table_alone() {
        let t = sales();
        let err = filter_rows(&t, Some("foo > 1")).unwrap_err();
        assert!(matches!(err, WrangleError::Formula(_)));
        assert_eq!(t.n_rows(), 3);
    }

    #[test]
    fn non_boolean_filter_is_rejected() {
        let err = filter_rows(&sales(), Some("revenue + 1")).unwrap_err();
        assert!(matches!(err, WrangleError::Formula(_)));
    }

    #[test]
    fn projection_is_strict_and_ordered() {
        let t = sales();
        let out = project_columns(&t, &["cost", "id"]).unwrap();
        assert_eq!(out.column_names(), vec!["id", "cost"]);
        assert_eq!(out.n_rows(), 3);

        assert_eq!(project_columns::<&str>(&t, &[]).unwrap(), t);
        assert!(matches!(
            project_columns(&t, &["id", "nope"]),
            Err(WrangleError::Formula(_))
        ));
    }

    #[test]
    fn projection_and_row_filter_commute() {
        let t = sales();
        let a = project_columns(&filter_rows(&t, Some("cost > 40")).unwrap(), &["id", "cost"]).unwrap();
        let b = filter_rows(&project_columns(&t, &["id", "cost"]).unwrap(), Some("cost > 40")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn statistical_filter_drops_tails_and_helpers() {
        let t = load_bytes(
            b"v\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n",
            "v.csv",
        )
        .unwrap();
        let cfg = PipelineConfig::default();
        let out = filter_statistical(&augment_statistics(&t, &cfg).unwrap(), &cfg).unwrap();
        assert_eq!(out.column_names(), vec!["v", "v_rolling_mean"]);
        // Percentiles are 0.1..=1.0; only the top value leaves the band.
        assert_eq!(out.n_rows(), 9);
    }

    #[test]
    fn statistical_filter_without_helpers_is_a_no_op() {
        let t = sales();
        assert_eq!(filter_statistical(&t, &PipelineConfig::default()).unwrap(), t);
    }
}

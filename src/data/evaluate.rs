use super::expr::Expression;
use super::model::{Column, DType, Table, Value};
use super::stats;
use crate::config::PipelineConfig;
use crate::error::{Result, WrangleError};

/// Suffixes of the columns appended by [`augment_statistics`].
pub const ZSCORE_SUFFIX: &str = "_zscore";
pub const PERCENTILE_SUFFIX: &str = "_percentile";
pub const ROLLING_MEAN_SUFFIX: &str = "_rolling_mean";

fn float_column(name: String, values: Vec<Option<f64>>) -> Column {
    let values = values
        .into_iter()
        .map(|v| v.map(Value::finite).unwrap_or(Value::Null))
        .collect();
    Column::new(name, DType::Float, values)
}

/// Whether `name` is one of the columns appended by [`augment_statistics`].
pub fn is_derived_statistic(name: &str) -> bool {
    [ZSCORE_SUFFIX, PERCENTILE_SUFFIX, ROLLING_MEAN_SUFFIX]
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

fn source_numeric_columns(table: &Table) -> Vec<String> {
    table
        .numeric_column_names()
        .into_iter()
        .filter(|n| !is_derived_statistic(n))
        .collect()
}

/// Append `<col>_zscore`, `<col>_percentile` and `<col>_rolling_mean` for
/// every numeric column present on entry. Other columns are untouched, and
/// previously derived statistics are recomputed rather than stacked.
pub fn augment_statistics(table: &Table, config: &PipelineConfig) -> Result<Table> {
    let numeric = source_numeric_columns(table);
    let mut out = table.clone();
    for name in &numeric {
        let Some(col) = table.column(name) else {
            continue;
        };
        let values = col.as_f64();
        out = out
            .with_column(float_column(format!("{name}{ZSCORE_SUFFIX}"), stats::zscores(&values)))?
            .with_column(float_column(
                format!("{name}{PERCENTILE_SUFFIX}"),
                stats::percentile_ranks(&values),
            ))?
            .with_column(float_column(
                format!("{name}{ROLLING_MEAN_SUFFIX}"),
                stats::rolling_mean(&values, config.rolling_window),
            ))?;
    }
    log::info!(
        "Augmented {} numeric columns, table now has {} columns",
        numeric.len(),
        out.n_cols()
    );
    Ok(out)
}

/// Evaluate `formula` row-wise and store it as `field`, replacing an
/// existing column of that name in place.
pub fn create_custom_field(table: &Table, field: &str, formula: &str) -> Result<Table> {
    let field = field.trim();
    if field.is_empty() {
        return Err(WrangleError::formula("result field name is empty"));
    }
    if formula.trim().is_empty() {
        return Err(WrangleError::formula("formula is empty"));
    }

    let expr = Expression::parse(formula)?;
    let series = expr.evaluate(table)?;
    let out = table.clone().with_column(series.into_column(field))?;

    log::info!("Created field '{field}' = {}", expr.source());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;

    fn sales() -> Table {
        load_bytes(
            b"id,revenue,cost,region\n1,100,40,n\n2,200,50,s\n3,150,45,n\n",
            "sales.csv",
        )
        .unwrap()
    }

    #[test]
    fn margin_formula() {
        let t = create_custom_field(&sales(), "margin", "revenue - cost").unwrap();
        assert_eq!(t.column_names().last().unwrap(), "margin");
        assert_eq!(
            t.column("margin").unwrap().values,
            vec![Value::Integer(60), Value::Integer(150), Value::Integer(105)]
        );
    }

    #[test]
    fn overwrites_existing_field_in_place() {
        let t = create_custom_field(&sales(), "cost", "cost * 2").unwrap();
        assert_eq!(t.column_names(), vec!["id", "revenue", "cost", "region"]);
        assert_eq!(t.column("cost").unwrap().values[0], Value::Integer(80));
    }

    #[test]
    fn bad_formula_adds_nothing() {
        let base = sales();
        for formula in ["revenue - foo", "revenue -", ""] {
            let err = create_custom_field(&base, "x", formula).unwrap_err();
            assert!(matches!(err, WrangleError::Formula(_)), "{formula}");
        }
        assert!(create_custom_field(&base, "  ", "revenue").is_err());
    }

    #[test]
    fn augments_numeric_columns_only() {
        let t = augment_statistics(&sales(), &PipelineConfig::default()).unwrap();
        assert_eq!(t.n_cols(), 4 + 3 * 3);
        assert!(t.column("region_zscore").is_none());

        let z = t.column("revenue_zscore").unwrap().as_f64();
        assert!(z[2].unwrap().abs() < 1e-12);

        let p = t.column("revenue_percentile").unwrap().as_f64();
        assert_eq!(p, vec![Some(1.0 / 3.0), Some(1.0), Some(2.0 / 3.0)]);

        let r = t.column("cost_rolling_mean").unwrap().as_f64();
        assert_eq!(r, vec![Some(40.0), Some(45.0), Some(45.0)]);
    }

    #[test]
    fn percentile_is_monotonic_with_sort_order() {
        let t = load_bytes(b"v\n5\n1\n9\n3\n3\n7\n", "v.csv").unwrap();
        let t = augment_statistics(&t, &PipelineConfig::default()).unwrap();
        let v = t.column("v").unwrap().as_f64();
        let p = t.column("v_percentile").unwrap().as_f64();
        let mut pairs: Vec<(f64, f64)> = v.iter().zip(&p).map(|(a, b)| (a.unwrap(), b.unwrap())).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            assert!(w[0].1 <= w[1].1);
        }
        assert!(p.iter().all(|x| (0.0..=1.0).contains(&x.unwrap())));
    }

    #[test]
    fn augmenting_twice_is_stable() {
        let cfg = PipelineConfig::default();
        let once = augment_statistics(&sales(), &cfg).unwrap();
        let twice = augment_statistics(&once, &cfg).unwrap();
        assert_eq!(twice, once);
    }
}

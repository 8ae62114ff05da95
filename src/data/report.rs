use std::fmt;

use super::model::{Column, Table};
use super::stats;
use crate::error::{Result, WrangleError};

/// Names recognised as the revenue / cost pair, English first.
const REVENUE_NAMES: &[&str] = &["revenue", "receita"];
const COST_NAMES: &[&str] = &["cost", "custo"];

/// Which columns feed the profit fallback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProfitField {
    #[default]
    AllNumeric,
    Column(String),
}

impl fmt::Display for ProfitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitField::AllNumeric => write!(f, "all numeric columns"),
            ProfitField::Column(name) => write!(f, "{name}"),
        }
    }
}

fn numeric_column<'a>(table: &'a Table, names: &[&str]) -> Option<&'a Column> {
    names
        .iter()
        .filter_map(|n| table.column(n))
        .find(|c| c.is_numeric())
}

/// Compute the profit scalar, rounded to `decimals` places.
///
/// * numeric `revenue`/`receita` and `cost`/`custo` present →
///   `sum(revenue) - sum(cost)`
/// * otherwise → mean of the per-column means of the selected numeric
///   columns (missing cells skipped)
pub fn calculate_profit(table: &Table, field: &ProfitField, decimals: u32) -> Result<f64> {
    if let ProfitField::Column(name) = field {
        if table.column(name).is_none() {
            return Err(WrangleError::formula(format!("unknown profit field '{name}'")));
        }
    }

    let raw = match (
        numeric_column(table, REVENUE_NAMES),
        numeric_column(table, COST_NAMES),
    ) {
        (Some(revenue), Some(cost)) => {
            log::debug!("Profit from '{}' - '{}'", revenue.name, cost.name);
            stats::sum(&revenue.as_f64()) - stats::sum(&cost.as_f64())
        }
        _ => mean_of_means(table, field)?,
    };
    if !raw.is_finite() {
        return Err(WrangleError::NoNumericData);
    }

    let profit = round_to(raw, decimals);
    log::info!("Profit over {field}: {profit}");
    Ok(profit)
}

fn mean_of_means(table: &Table, field: &ProfitField) -> Result<f64> {
    let columns: Vec<&Column> = match field {
        ProfitField::AllNumeric => table.columns().iter().filter(|c| c.is_numeric()).collect(),
        ProfitField::Column(name) => table.column(name).into_iter().filter(|c| c.is_numeric()).collect(),
    };
    let means: Vec<Option<f64>> = columns.iter().map(|c| stats::mean(&c.as_f64())).collect();
    stats::mean(&means).ok_or(WrangleError::NoNumericData)
}

/// Round half away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;

    fn csv(text: &str) -> Table {
        load_bytes(text.as_bytes(), "t.csv").unwrap()
    }

    #[test]
    fn revenue_minus_cost() {
        let t = csv("id,revenue,cost\n1,100,40\n2,200,50\n3,150,45\n");
        assert_eq!(calculate_profit(&t, &ProfitField::AllNumeric, 2).unwrap(), 315.0);
        assert_eq!(
            calculate_profit(&t, &ProfitField::Column("id".into()), 2).unwrap(),
            315.0
        );
    }

    #[test]
    fn portuguese_names_are_recognised() {
        let t = csv("receita,custo\n10.5,2.25\n4,1\n");
        assert_eq!(calculate_profit(&t, &ProfitField::AllNumeric, 2).unwrap(), 11.25);
    }

    #[test]
    fn falls_back_to_mean_of_means() {
        let t = csv("a,b,label\n1,10,x\n3,20,y\n");
        // means: a = 2, b = 15 → 8.5
        assert_eq!(calculate_profit(&t, &ProfitField::AllNumeric, 2).unwrap(), 8.5);
        assert_eq!(calculate_profit(&t, &ProfitField::Column("b".into()), 2).unwrap(), 15.0);
    }

    #[test]
    fn rounds_to_two_places() {
        let t = csv("a\n1\n2\n2\n");
        assert_eq!(calculate_profit(&t, &ProfitField::AllNumeric, 2).unwrap(), 1.67);
    }

    #[test]
    fn text_revenue_is_not_a_pair() {
        let t = csv("revenue,cost,n\nlots,5,4\nsome,7,6\n");
        // Falls back to the mean of `cost` and `n`: (6 + 5) / 2.
        assert_eq!(calculate_profit(&t, &ProfitField::AllNumeric, 2).unwrap(), 5.5);
    }

    #[test]
    fn no_numeric_columns() {
        let t = csv("name\nx\ny\n");
        assert_eq!(
            calculate_profit(&t, &ProfitField::AllNumeric, 2),
            Err(WrangleError::NoNumericData)
        );
        assert_eq!(
            calculate_profit(&t, &ProfitField::Column("name".into()), 2),
            Err(WrangleError::NoNumericData)
        );
    }

    #[test]
    fn empty_numeric_table_has_no_data() {
        let t = csv("a,b\n");
        assert_eq!(
            calculate_profit(&t, &ProfitField::AllNumeric, 2),
            Err(WrangleError::NoNumericData)
        );
    }

    #[test]
    fn unknown_field() {
        let t = csv("a\n1\n");
        assert!(matches!(
            calculate_profit(&t, &ProfitField::Column("zz".into()), 2),
            Err(WrangleError::Formula(_))
        ));
    }
}

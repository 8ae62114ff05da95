//! Descriptive statistics over a numeric column with missing cells.
//!
//! Missing cells (`None`) are skipped by the aggregates and propagate as
//! `None` through the per-row transforms.

/// Linear-interpolated quantile (`numpy`'s default), `q` in `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn sum(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

/// Sample standard deviation (n − 1); `None` below two values.
pub fn std_dev(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() < 2 {
        return None;
    }
    let m = present.iter().sum::<f64>() / present.len() as f64;
    let var = present.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (present.len() - 1) as f64;
    Some(var.sqrt())
}

/// `(x − mean) / std`; `None` where undefined (constant column, < 2 values).
pub fn zscores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let (Some(m), Some(s)) = (mean(values), std_dev(values)) else {
        return vec![None; values.len()];
    };
    values
        .iter()
        .map(|v| v.map(|x| (x - m) / s).filter(|z| z.is_finite()))
        .collect()
}

/// Fractional rank in `(0, 1]`: average rank of ties divided by the count
/// of present values.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = order.len() as f64;
    let mut out = vec![None; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && order[end + 1].1 == order[start].1 {
            end += 1;
        }
        // Ranks are 1-based: the tie group spans ranks start+1 ..= end+1.
        let avg_rank = (start + end) as f64 / 2.0 + 1.0;
        for &(i, _) in &order[start..=end] {
            out[i] = Some(avg_rank / n);
        }
        start = end + 1;
    }
    out
}

/// Trailing rolling mean over `window` rows, at least one present value.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            mean(&values[from..=i])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: &[f64]) -> Vec<Option<f64>> {
        v.iter().copied().map(Some).collect()
    }

    #[test]
    fn quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 0.75), Some(3.25));
        assert_eq!(quantile(&[5.0], 0.75), Some(5.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn zscore_of_mean_is_zero() {
        let z = zscores(&some(&[1.0, 2.0, 3.0]));
        assert!(z[1].unwrap().abs() < 1e-12);
        let total: f64 = z.iter().flatten().sum();
        assert!(total.abs() < 1e-12);
    }

    #[test]
    fn zscore_undefined_for_constant_column() {
        assert_eq!(zscores(&some(&[4.0, 4.0])), vec![None, None]);
        assert_eq!(zscores(&some(&[4.0])), vec![None]);
    }

    #[test]
    fn percentile_averages_ties() {
        let p = percentile_ranks(&[Some(10.0), Some(20.0), Some(20.0), None, Some(5.0)]);
        assert_eq!(p, vec![Some(0.5), Some(0.875), Some(0.875), None, Some(0.25)]);
    }

    #[test]
    fn rolling_mean_uses_partial_windows() {
        let r = rolling_mean(&some(&[3.0, 6.0, 9.0, 12.0]), 3);
        assert_eq!(r, vec![Some(3.0), Some(4.5), Some(6.0), Some(9.0)]);
    }

    #[test]
    fn rolling_mean_skips_missing() {
        let r = rolling_mean(&[Some(2.0), None, Some(4.0)], 3);
        assert_eq!(r, vec![Some(2.0), Some(2.0), Some(3.0)]);
    }
}

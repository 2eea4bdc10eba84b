//! Null-aware arithmetic shared by the quality checks and the analysis tables.

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round_opt(value: Option<f64>) -> Option<f64> {
    value.map(round2)
}

/// `numerator / denominator`, or `None` when either side is missing or the
/// denominator is zero.
pub fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// `safe_div` expressed as a percentage.
pub fn percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    safe_div(numerator, denominator).map(|ratio| ratio * 100.0)
}

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Dense descending ranks starting at 1. Equal values share a rank and the next
/// distinct value takes the following rank. Missing values stay unranked.
pub fn dense_rank_desc(values: &[Option<f64>]) -> Vec<Option<u32>> {
    let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup();

    values
        .iter()
        .map(|value| {
            value.and_then(|v| {
                distinct
                    .iter()
                    .position(|d| *d == v)
                    .map(|pos| pos as u32 + 1)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_is_null_safe() {
        assert_eq!(safe_div(Some(1.0), Some(4.0)), Some(0.25));
        assert_eq!(safe_div(Some(1.0), Some(0.0)), None);
        assert_eq!(safe_div(None, Some(2.0)), None);
        assert_eq!(safe_div(Some(1.0), None), None);
        assert_eq!(percent(Some(1.0), Some(4.0)), Some(25.0));
    }

    #[test]
    fn medians() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn dense_ranks() {
        let ranks = dense_rank_desc(&[Some(10.0), None, Some(30.0), Some(10.0), Some(5.0)]);
        assert_eq!(ranks, vec![Some(2), None, Some(1), Some(2), Some(3)]);
        assert!(dense_rank_desc(&[None, None]).iter().all(Option::is_none));
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-2.0), -2.0);
        assert_eq!(round_opt(None), None);
    }
}

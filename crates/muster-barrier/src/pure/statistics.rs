//! Pure aggregate statistics over participant values.
//!
//! Values that are absent, zero or NaN do not count. Dropping zero is probably
//! unintended; tests pin it until the policy is decided.

use serde::Serialize;

/// Max, min and mean over the counted participant values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Number of values that entered the aggregate.
    pub count: u32,
    /// Largest value.
    pub max: f64,
    /// Smallest value.
    pub min: f64,
    /// Arithmetic mean.
    pub mean: f64,
}

/// The value a participant contributes to the aggregate, if any.
///
/// # Example
///
/// ```ignore
/// assert_eq!(countable_value(Some(3.5)), Some(3.5));
/// assert_eq!(countable_value(Some(0.0)), None);
/// assert_eq!(countable_value(None), None);
/// ```
#[inline]
pub fn countable_value(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

/// Statistics over already-filtered values; `None` when there are none.
pub fn compute_statistics<I>(values: I) -> Option<AggregateStats>
where I: IntoIterator<Item = f64> {
    let mut count: u32 = 0;
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;

    for value in values {
        count = count.saturating_add(1);
        sum += value;
        max = max.max(value);
        min = min.min(value);
    }

    if count == 0 {
        return None;
    }

    Some(AggregateStats {
        count,
        max,
        min,
        mean: sum / f64::from(count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_over_three_values() {
        let stats = compute_statistics([10.0, 20.0, 30.0]).unwrap();
        assert_eq!(stats, AggregateStats {
            count: 3,
            max: 30.0,
            min: 10.0,
            mean: 20.0,
        });
    }

    #[test]
    fn no_values_no_stats() {
        assert_eq!(compute_statistics(std::iter::empty()), None);
    }

    #[test]
    fn zero_and_nan_are_not_counted() {
        // Zero is dropped together with absent values; see module docs.
        assert_eq!(countable_value(Some(0.0)), None);
        assert_eq!(countable_value(Some(-0.0)), None);
        assert_eq!(countable_value(Some(f64::NAN)), None);
        assert_eq!(countable_value(None), None);
        assert_eq!(countable_value(Some(-4.0)), Some(-4.0));
    }

    #[test]
    fn negative_values_count() {
        let values = [Some(-5.0), Some(0.0), Some(5.0), None];
        let stats = compute_statistics(values.into_iter().filter_map(countable_value)).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.min, -5.0);
        assert_eq!(stats.mean, 0.0);
    }
}

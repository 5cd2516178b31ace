//! summary statistics over one metric series

use crate::domain::MetricSeries;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SensorStats {
    pub average: f64,
    pub median: f64,
    pub mode: f64,
    pub min: f64,
    pub max: f64,
}

impl SensorStats {
    /// max - min, shown as "range" on the statistics tab
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// statistics of a non-empty series
///
/// # Panics
///
/// on an empty series. callers check `is_empty()` first; an empty series
/// reaching here is a bug, not a runtime condition.
pub fn statistics_for(series: &MetricSeries) -> SensorStats {
    statistics_of(&series.values())
}

/// same as `statistics_for`, over raw values in insertion order
pub fn statistics_of(values: &[f64]) -> SensorStats {
    assert!(!values.is_empty(), "statistics_of called with no values");

    let n = values.len() as f64;
    let average = values.iter().sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    SensorStats {
        average,
        median,
        mode: mode(values),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    }
}

/// most frequent value; on a tie, the one whose tally entry came first
/// (i.e. the value that occurred first in the input)
fn mode(values: &[f64]) -> f64 {
    // at most WINDOW_SIZE entries, a linear tally is fine
    let mut tally: Vec<(f64, usize)> = Vec::new();
    for &v in values {
        match tally.iter_mut().find(|(seen, _)| *seen == v) {
            Some((_, count)) => *count += 1,
            None => tally.push((v, 1)),
        }
    }

    let mut best = tally[0];
    for &entry in &tally[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reading;
    use approx::assert_relative_eq;

    fn series(values: &[f64]) -> MetricSeries {
        MetricSeries::from_unordered(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| Reading::new(i as i64, v))
                .collect(),
        )
    }

    #[test]
    fn median_even_and_odd() {
        assert_relative_eq!(statistics_for(&series(&[10.0, 20.0, 30.0, 40.0])).median, 25.0);
        assert_relative_eq!(statistics_for(&series(&[10.0, 20.0, 30.0])).median, 20.0);
    }

    #[test]
    fn median_sorts_before_picking() {
        assert_relative_eq!(statistics_of(&[40.0, 10.0, 30.0, 20.0]).median, 25.0);
        assert_relative_eq!(statistics_of(&[30.0, 10.0, 20.0]).median, 20.0);
    }

    #[test]
    fn mode_tie_goes_to_first_tallied() {
        assert_eq!(statistics_of(&[5.0, 5.0, 7.0, 7.0]).mode, 5.0);
        assert_eq!(statistics_of(&[7.0, 5.0, 5.0, 7.0]).mode, 7.0);
        // not the numerically smallest
        assert_eq!(statistics_of(&[9.0, 1.0]).mode, 9.0);
    }

    #[test]
    fn mode_prefers_higher_count() {
        assert_eq!(statistics_of(&[1.0, 2.0, 2.0, 3.0]).mode, 2.0);
    }

    #[test]
    fn average_min_max_range() {
        let stats = statistics_of(&[22.5, 24.0, 21.0, 26.5]);
        assert_relative_eq!(stats.average, 23.5);
        assert_eq!(stats.min, 21.0);
        assert_eq!(stats.max, 26.5);
        assert_relative_eq!(stats.range(), 5.5);
    }

    #[test]
    fn single_value() {
        let stats = statistics_of(&[42.0]);
        assert_eq!(stats, SensorStats { average: 42.0, median: 42.0, mode: 42.0, min: 42.0, max: 42.0 });
    }

    #[test]
    fn idempotent() {
        let s = series(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        assert_eq!(statistics_for(&s), statistics_for(&s));
    }

    #[test]
    #[should_panic(expected = "no values")]
    fn empty_series_panics() {
        statistics_for(&MetricSeries::default());
    }
}

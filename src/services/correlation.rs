use serde::Serialize;

use crate::models::record::DailyRecord;
use crate::services::metrics::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationSeries {
    pub x: Metric,
    pub y: Metric,
    pub points: Vec<Point>,
    /// Pearson r in `[-1, 1]`; 0 when either side has no variance.
    pub coefficient: f64,
    pub n: usize,
}

/// Scatter points for records carrying both metrics, plus their Pearson
/// coefficient.
pub fn correlation_series(records: &[DailyRecord], x: Metric, y: Metric) -> CorrelationSeries {
    let points: Vec<Point> = records
        .iter()
        .filter_map(|r| Some(Point {
            x: x.value(r)?,
            y: y.value(r)?,
        }))
        .collect();
    let coefficient = pearson(&points);

    CorrelationSeries {
        x,
        y,
        n: points.len(),
        points,
        coefficient,
    }
}

/// Sum-of-products Pearson formula. Swapping x and y performs the same float
/// operations in the same order, so the result is exactly symmetric.
pub fn pearson(points: &[Point]) -> f64 {
    let n = points.len() as f64;
    if points.len() < 2 {
        return 0.0;
    }

    let (mut sx, mut sy, mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        sx += p.x;
        sy += p.y;
        sxy += p.x * p.y;
        sxx += p.x * p.x;
        syy += p.y * p.y;
    }

    let numerator = n * sxy - sx * sy;
    let denominator = ((n * sxx - sx * sx) * (n * syy - sy * sy)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (numerator / denominator).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregate::tests::day;

    fn record(date: &str, mood: Option<i32>, sleep_minutes: Option<i32>) -> DailyRecord {
        let mut r = day(date);
        r.subjective_mood = mood;
        r.sleep_minutes = sleep_minutes;
        r
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let records = vec![
            record("2024-01-01", Some(2), Some(300)),
            record("2024-01-02", Some(3), Some(360)),
            record("2024-01-03", Some(4), Some(420)),
        ];
        let series = correlation_series(&records, Metric::SleepHours, Metric::SubjectiveMood);
        assert_eq!(series.n, 3);
        assert_eq!(series.points[0], Point { x: 5.0, y: 2.0 });
        assert!((series.coefficient - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_correlation() {
        let points = vec![
            Point { x: 1.0, y: 5.0 },
            Point { x: 2.0, y: 3.0 },
            Point { x: 3.0, y: 1.0 },
        ];
        assert!((pearson(&points) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_records_missing_either_field_are_dropped() {
        let records = vec![
            record("2024-01-01", Some(2), None),
            record("2024-01-02", None, Some(360)),
            record("2024-01-03", Some(4), Some(420)),
        ];
        let series = correlation_series(&records, Metric::SubjectiveMood, Metric::SleepHours);
        assert_eq!(series.n, 1);
        assert_eq!(series.coefficient, 0.0);
    }

    #[test]
    fn test_zero_variance_is_zero() {
        let records = vec![
            record("2024-01-01", Some(3), Some(300)),
            record("2024-01-02", Some(3), Some(400)),
            record("2024-01-03", Some(3), Some(500)),
        ];
        let series = correlation_series(&records, Metric::SubjectiveMood, Metric::SleepHours);
        assert_eq!(series.coefficient, 0.0);
        assert_eq!(pearson(&[]), 0.0);
    }

    #[test]
    fn test_coefficient_is_symmetric() {
        let moods = [3, 5, 2, 4, 4, 1, 5];
        let sleeps = [410, 480, 350, 455, 390, 300, 500];
        let records: Vec<DailyRecord> = moods
            .iter()
            .zip(sleeps)
            .enumerate()
            .map(|(i, (m, s))| record(&format!("2024-03-{:02}", i + 1), Some(*m), Some(s)))
            .collect();
        let xy = correlation_series(&records, Metric::SubjectiveMood, Metric::SleepHours);
        let yx = correlation_series(&records, Metric::SleepHours, Metric::SubjectiveMood);
        assert_eq!(xy.coefficient, yx.coefficient);
        assert!(xy.coefficient > 0.0);
    }
}

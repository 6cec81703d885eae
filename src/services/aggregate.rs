//! Flat statistics over a record snapshot: averages, sums, trends, streaks,
//! extremes, slot totals and the mood distribution.
//!
//! Every function is total. Absent values are excluded from the statistic and
//! empty inputs resolve to 0 (or `None` where there is no meaningful value).

use serde::Serialize;

use crate::models::record::{DailyRecord, TimeSlot, RATING_MAX, RATING_MIN, SLOT_COUNT};
use crate::services::metrics::Metric;

pub const DEFAULT_TREND_WINDOW: usize = 7;
pub const DEFAULT_TOP_TIMES: usize = 5;

/// References to `records` ordered newest first. Same-day order is kept.
pub fn sorted_desc(records: &[DailyRecord]) -> Vec<&DailyRecord> {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (total, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(total, n), v| (total + v, n + 1));
    if n == 0 {
        0.0
    } else {
        total / n as f64
    }
}

pub fn average<'a, I>(records: I, metric: Metric) -> f64
where
    I: IntoIterator<Item = &'a DailyRecord>,
{
    mean(records.into_iter().filter_map(|r| metric.value(r)))
}

pub fn sum<'a, I>(records: I, metric: Metric) -> f64
where
    I: IntoIterator<Item = &'a DailyRecord>,
{
    records.into_iter().filter_map(|r| metric.value(r)).sum()
}

/// Average of the newest `window` records minus the average of the `window`
/// records before them. An empty window averages to 0, so sparse data can
/// report a large trend.
pub fn trend(records: &[DailyRecord], metric: Metric, window: usize) -> f64 {
    if window == 0 {
        return 0.0;
    }
    let sorted = sorted_desc(records);
    let recent = sorted.iter().take(window).copied();
    let previous = sorted.iter().skip(window).take(window).copied();
    average(recent, metric) - average(previous, metric)
}

/// Number of most recent consecutive records whose value is at least
/// `threshold`. A missing value ends the streak.
pub fn streak(records: &[DailyRecord], metric: Metric, threshold: f64) -> usize {
    sorted_desc(records)
        .into_iter()
        .take_while(|r| metric.value(r).is_some_and(|v| v >= threshold))
        .count()
}

#[derive(Debug, Clone, Serialize)]
pub struct DayValue {
    pub date: chrono::NaiveDate,
    pub day_of_week: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestWorst {
    pub metric: Metric,
    pub best: DayValue,
    pub worst: DayValue,
}

/// Records with the highest and lowest value of `metric`. The first record
/// wins ties. `None` when no record carries the metric.
pub fn best_worst_day(records: &[DailyRecord], metric: Metric) -> Option<BestWorst> {
    let mut values = records
        .iter()
        .filter_map(|r| metric.value(r).map(|v| (r, v)));
    let first = values.next()?;
    let (best, worst) = values.fold((first, first), |(best, worst), cur| {
        (
            if cur.1 > best.1 { cur } else { best },
            if cur.1 < worst.1 { cur } else { worst },
        )
    });

    let day = |(r, v): (&DailyRecord, f64)| DayValue {
        date: r.date,
        day_of_week: r.day_of_week.clone(),
        value: v,
    };
    Some(BestWorst {
        metric,
        best: day(best),
        worst: day(worst),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotTotal {
    pub time: String,
    pub total: i64,
}

/// Per-slot totals across all records, largest first, at most `limit`.
/// Equal totals keep clock order.
pub fn top_event_times(records: &[DailyRecord], limit: usize) -> Vec<SlotTotal> {
    let mut totals = [0i64; SLOT_COUNT];
    for record in records {
        for slot in TimeSlot::all() {
            totals[slot.index()] += i64::from(record.slot(slot));
        }
    }

    let mut ranked: Vec<(TimeSlot, i64)> = TimeSlot::all().map(|s| (s, totals[s.index()])).collect();
    // stable: ties stay in slot order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(limit)
        .map(|(slot, total)| SlotTotal {
            time: slot.label(),
            total,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeCount {
    pub range: String,
    pub count: usize,
}

/// Mood counts in `[1,2)`, `[2,3)`, `[3,4)`, `[4,5)` and exactly `5`.
pub fn mood_distribution(records: &[DailyRecord]) -> Vec<RangeCount> {
    let min = f64::from(RATING_MIN);
    let max = f64::from(RATING_MAX);
    let half_open = (RATING_MAX - RATING_MIN) as usize;
    let mut counts = vec![0usize; half_open + 1];

    for value in records.iter().filter_map(|r| Metric::SubjectiveMood.value(r)) {
        if value == max {
            counts[half_open] += 1;
        } else if value >= min && value < max {
            counts[(value - min).floor() as usize] += 1;
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = RATING_MIN + i as i32;
            let range = if i == half_open {
                lower.to_string()
            } else {
                format!("{}-{}", lower, lower + 1)
            };
            RangeCount { range, count }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    pub(crate) fn day(s: &str) -> DailyRecord {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        DailyRecord::new(Uuid::nil(), date)
    }

    fn synchro(s: &str, v: i32) -> DailyRecord {
        let mut r = day(s);
        r.subjective_synchro = Some(v);
        r
    }

    fn mood(v: i32) -> DailyRecord {
        let mut r = day("2024-01-01");
        r.subjective_mood = Some(v);
        r
    }

    #[test]
    fn test_average_empty_is_zero() {
        assert_eq!(average(&[] as &[DailyRecord], Metric::SubjectiveMood), 0.0);
        let records = vec![day("2024-01-01"), day("2024-01-02")];
        let avg = average(&records, Metric::SubjectiveMood);
        assert_eq!(avg, 0.0);
        assert!(!avg.is_nan());
    }

    #[test]
    fn test_average_skips_missing() {
        let records = vec![synchro("2024-01-01", 4), day("2024-01-02"), synchro("2024-01-03", 2)];
        assert_eq!(average(&records, Metric::SubjectiveSynchro), 3.0);
        assert_eq!(sum(&records, Metric::SubjectiveSynchro), 6.0);
    }

    #[test]
    fn test_sleep_average_uses_hours() {
        let mut a = day("2024-01-01");
        a.sleep_minutes = Some(480);
        let mut b = day("2024-01-02");
        b.sleep_minutes = Some(420);
        assert_eq!(average(&[a, b], Metric::SleepHours), 7.5);
    }

    #[test]
    fn test_trend_scenario() {
        let records = vec![synchro("2024-01-01", 5), synchro("2024-01-08", 3)];
        // newest first: 2024-01-08 is the recent window
        assert_eq!(trend(&records, Metric::SubjectiveSynchro, 1), -2.0);

        let records = vec![synchro("2024-01-08", 5), synchro("2024-01-01", 3)];
        assert_eq!(trend(&records, Metric::SubjectiveSynchro, 1), 2.0);
    }

    #[test]
    fn test_trend_empty_previous_window_counts_as_zero() {
        let records = vec![synchro("2024-01-08", 4)];
        assert_eq!(trend(&records, Metric::SubjectiveSynchro, DEFAULT_TREND_WINDOW), 4.0);
        assert_eq!(trend(&records, Metric::SubjectiveSynchro, 0), 0.0);
    }

    #[test]
    fn test_trend_uses_disjoint_windows() {
        let records: Vec<DailyRecord> = (1..=4)
            .map(|d| synchro(&format!("2024-01-0{}", d), d as i32))
            .collect();
        // recent {4,3} avg 3.5, previous {2,1} avg 1.5
        assert_eq!(trend(&records, Metric::SubjectiveSynchro, 2), 2.0);
    }

    #[test]
    fn test_streak_stops_at_first_miss() {
        let records = vec![
            synchro("2024-01-05", 5),
            synchro("2024-01-04", 4),
            synchro("2024-01-03", 2),
            synchro("2024-01-02", 5),
        ];
        assert_eq!(streak(&records, Metric::SubjectiveSynchro, 4.0), 2);
        assert_eq!(streak(&records, Metric::SubjectiveSynchro, 1.0), 4);
    }

    #[test]
    fn test_streak_stops_at_missing_field() {
        let records = vec![synchro("2024-01-05", 5), day("2024-01-04"), synchro("2024-01-03", 5)];
        assert_eq!(streak(&records, Metric::SubjectiveSynchro, 1.0), 1);
    }

    #[test]
    fn test_streak_non_increasing_in_threshold() {
        let records: Vec<DailyRecord> = [5, 4, 5, 3, 1, 5, 2]
            .iter()
            .enumerate()
            .map(|(i, v)| synchro(&format!("2024-02-{:02}", 20 - i), *v))
            .collect();
        let mut last = usize::MAX;
        for t in 0..=12 {
            let s = streak(&records, Metric::SubjectiveSynchro, t as f64 * 0.5);
            assert!(s <= last);
            last = s;
        }
    }

    #[test]
    fn test_streak_converts_sleep() {
        let mut a = day("2024-01-02");
        a.sleep_minutes = Some(480);
        let mut b = day("2024-01-01");
        b.sleep_minutes = Some(300);
        assert_eq!(streak(&[a, b], Metric::SleepHours, 7.0), 1);
    }

    #[test]
    fn test_best_worst_day() {
        let records = vec![
            synchro("2024-01-01", 3),
            synchro("2024-01-02", 5),
            synchro("2024-01-03", 1),
            synchro("2024-01-04", 5),
        ];
        let bw = best_worst_day(&records, Metric::SubjectiveSynchro).unwrap();
        assert_eq!(bw.best.date.to_string(), "2024-01-02");
        assert_eq!(bw.best.value, 5.0);
        assert_eq!(bw.worst.date.to_string(), "2024-01-03");
        assert_eq!(bw.worst.day_of_week, "Wednesday");
    }

    #[test]
    fn test_best_worst_day_empty_is_none() {
        assert!(best_worst_day(&[], Metric::SubjectiveSynchro).is_none());
        assert!(best_worst_day(&[day("2024-01-01")], Metric::SubjectiveSynchro).is_none());
    }

    #[test]
    fn test_top_event_times_single_slot() {
        let mut a = day("2024-01-01");
        a.slot_counts[7] = 6;
        let mut b = day("2024-01-02");
        b.slot_counts[7] = 4;
        let top = top_event_times(&[a, b], 1);
        assert_eq!(
            top,
            vec![SlotTotal {
                time: "07:07".into(),
                total: 10
            }]
        );
    }

    #[test]
    fn test_top_event_times_ties_keep_slot_order() {
        let mut a = day("2024-01-01");
        a.slot_counts[21] = 2;
        a.slot_counts[3] = 2;
        a.slot_counts[11] = 5;
        let top = top_event_times(&[a], DEFAULT_TOP_TIMES);
        let labels: Vec<&str> = top.iter().map(|t| t.time.as_str()).collect();
        assert_eq!(labels, vec!["11:11", "03:03", "21:21", "00:00", "01:01"]);
    }

    #[test]
    fn test_mood_distribution_scenario() {
        let records: Vec<DailyRecord> = [1, 2, 3, 4, 5, 5].into_iter().map(mood).collect();
        let dist = mood_distribution(&records);
        let pairs: Vec<(&str, usize)> = dist.iter().map(|r| (r.range.as_str(), r.count)).collect();
        assert_eq!(
            pairs,
            vec![("1-2", 1), ("2-3", 1), ("3-4", 1), ("4-5", 1), ("5", 2)]
        );
    }

    #[test]
    fn test_mood_distribution_ignores_out_of_scale() {
        let records: Vec<DailyRecord> = [0, 7].into_iter().map(mood).collect();
        assert!(mood_distribution(&records).iter().all(|r| r.count == 0));
    }
}

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::record::{weekday_name, DailyRecord};
use crate::services::metrics::Metric;

const MOON_OCTANT_DEG: f64 = 45.0;
const FULL_CYCLE_DEG: f64 = 360.0;
const DISTANCE_BINS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    Week,
    Month,
    Year,
    DayOfWeek,
    MoonPhase,
    EarthSunDistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    pub const ALL: [MoonPhase; 8] = [
        MoonPhase::NewMoon,
        MoonPhase::WaxingCrescent,
        MoonPhase::FirstQuarter,
        MoonPhase::WaxingGibbous,
        MoonPhase::FullMoon,
        MoonPhase::WaningGibbous,
        MoonPhase::LastQuarter,
        MoonPhase::WaningCrescent,
    ];

    /// Octant for an angle in `[0, 360]`; 360 wraps to a new moon.
    pub fn from_degrees(deg: f64) -> Option<Self> {
        if !deg.is_finite() || !(0.0..=FULL_CYCLE_DEG).contains(&deg) {
            return None;
        }
        let octant = (deg.rem_euclid(FULL_CYCLE_DEG) / MOON_OCTANT_DEG).floor() as usize;
        Self::ALL.get(octant).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }
}

/// One heatmap / bar-chart cell.
#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub label: String,
    /// First day of the bucket for calendar kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// Mean of the metric over the bucket's records that carry it.
    pub value: f64,
    /// Records falling in the bucket.
    pub count: usize,
    /// Summed daily event totals.
    pub event_total: i64,
    /// `value / max(value)` across buckets, 0 when either side is 0.
    pub intensity: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Acc {
    sum: f64,
    n: usize,
    count: usize,
    event_total: i64,
}

impl Acc {
    fn add(&mut self, record: &DailyRecord, metric: Metric) {
        if let Some(v) = metric.value(record) {
            self.sum += v;
            self.n += 1;
        }
        self.count += 1;
        self.event_total += i64::from(record.event_total);
    }

    fn into_bucket(self, label: String, start: Option<NaiveDate>) -> Bucket {
        Bucket {
            label,
            start,
            value: if self.n == 0 { 0.0 } else { self.sum / self.n as f64 },
            count: self.count,
            event_total: self.event_total,
            intensity: 0.0,
        }
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn calendar_start(kind: BucketKind, date: NaiveDate) -> Option<NaiveDate> {
    match kind {
        BucketKind::Week => Some(week_start(date)),
        BucketKind::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
        BucketKind::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        _ => None,
    }
}

fn calendar_label(kind: BucketKind, start: NaiveDate) -> String {
    match kind {
        BucketKind::Month => start.format("%Y-%m").to_string(),
        BucketKind::Year => start.format("%Y").to_string(),
        _ => start.format("%Y-%m-%d").to_string(),
    }
}

/// Groups `records` by `kind` and reports the mean of `metric` per group.
///
/// Calendar kinds return only the periods that have records, oldest first.
/// Day-of-week always returns Monday..Sunday and moon phase all eight octants.
/// Earth-sun distance returns four equal-width bins over the observed range,
/// or nothing if no record has a distance.
pub fn temporal_buckets(records: &[DailyRecord], kind: BucketKind, metric: Metric) -> Vec<Bucket> {
    let mut buckets = match kind {
        BucketKind::Week | BucketKind::Month | BucketKind::Year => calendar_buckets(records, kind, metric),
        BucketKind::DayOfWeek => day_of_week_buckets(records, metric),
        BucketKind::MoonPhase => moon_phase_buckets(records, metric),
        BucketKind::EarthSunDistance => distance_buckets(records, metric),
    };
    normalize_intensity(&mut buckets);
    buckets
}

fn calendar_buckets(records: &[DailyRecord], kind: BucketKind, metric: Metric) -> Vec<Bucket> {
    let mut groups: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for record in records {
        let Some(start) = calendar_start(kind, record.date) else {
            tracing::warn!(record_id = %record.id, date = %record.date, "No bucket start for record date");
            continue;
        };
        groups.entry(start).or_default().add(record, metric);
    }

    groups
        .into_iter()
        .map(|(start, acc)| acc.into_bucket(calendar_label(kind, start), Some(start)))
        .collect()
}

fn day_of_week_buckets(records: &[DailyRecord], metric: Metric) -> Vec<Bucket> {
    let mut days = [Acc::default(); 7];
    for record in records {
        days[record.date.weekday().num_days_from_monday() as usize].add(record, metric);
    }

    let mut weekday = chrono::Weekday::Mon;
    days.into_iter()
        .map(|acc| {
            let bucket = acc.into_bucket(weekday_name(weekday).to_string(), None);
            weekday = weekday.succ();
            bucket
        })
        .collect()
}

fn moon_phase_buckets(records: &[DailyRecord], metric: Metric) -> Vec<Bucket> {
    let mut octants = [Acc::default(); 8];
    for record in records {
        let Some(deg) = record.moon_phase_deg else {
            continue;
        };
        match MoonPhase::from_degrees(deg) {
            Some(phase) => octants[phase as usize].add(record, metric),
            None => tracing::warn!(
                record_id = %record.id,
                date = %record.date,
                moon_phase_deg = deg,
                "Skipping record with out-of-range moon phase"
            ),
        }
    }

    MoonPhase::ALL
        .iter()
        .zip(octants)
        .map(|(phase, acc)| acc.into_bucket(phase.name().to_string(), None))
        .collect()
}

fn distance_buckets(records: &[DailyRecord], metric: Metric) -> Vec<Bucket> {
    let with_distance: Vec<(&DailyRecord, f64)> = records
        .iter()
        .filter_map(|r| {
            let d = r.earth_sun_distance_au?;
            if d.is_finite() && d > 0.0 {
                Some((r, d))
            } else {
                tracing::warn!(
                    record_id = %r.id,
                    date = %r.date,
                    earth_sun_distance_au = d,
                    "Skipping record with invalid earth-sun distance"
                );
                None
            }
        })
        .collect();

    if with_distance.is_empty() {
        return Vec::new();
    }

    let min = with_distance.iter().map(|(_, d)| *d).fold(f64::INFINITY, f64::min);
    let max = with_distance.iter().map(|(_, d)| *d).fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / DISTANCE_BINS as f64;

    let mut bins = [Acc::default(); DISTANCE_BINS];
    for (record, d) in &with_distance {
        let idx = if width > 0.0 {
            (((d - min) / width).floor() as usize).min(DISTANCE_BINS - 1)
        } else {
            0
        };
        bins[idx].add(record, metric);
    }

    bins.into_iter()
        .enumerate()
        .map(|(i, acc)| {
            let lower = min + width * i as f64;
            let upper = min + width * (i + 1) as f64;
            acc.into_bucket(format!("{:.4}-{:.4} AU", lower, upper), None)
        })
        .collect()
}

fn normalize_intensity(buckets: &mut [Bucket]) {
    let max = buckets.iter().map(|b| b.value).fold(0.0, f64::max);
    for bucket in buckets.iter_mut() {
        bucket.intensity = if max > 0.0 && bucket.value > 0.0 {
            bucket.value / max
        } else {
            0.0
        };
    }
}

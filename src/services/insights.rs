use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::record::DailyRecord;
use crate::services::aggregate::{
    average, best_worst_day, streak, sum, top_event_times, trend, BestWorst, SlotTotal,
    DEFAULT_TOP_TIMES, DEFAULT_TREND_WINDOW,
};
use crate::services::correlation::correlation_series;
use crate::services::metrics::Metric;

/// Fewer paired days than this and a correlation is not worth reporting.
const MIN_CORRELATION_POINTS: usize = 5;
const NOTABLE_CORRELATION: f64 = 0.3;
const HEALTHY_SLEEP_HOURS: f64 = 7.0;
const HIGH_RATING: f64 = 4.0;

const CARD_METRICS: [Metric; 6] = [
    Metric::SubjectiveSynchro,
    Metric::SubjectiveMood,
    Metric::Productivity,
    Metric::Stress,
    Metric::SleepHours,
    Metric::EventTotal,
];

const STREAK_TARGETS: [(Metric, f64); 3] = [
    (Metric::SubjectiveSynchro, HIGH_RATING),
    (Metric::SubjectiveMood, HIGH_RATING),
    (Metric::SleepHours, HEALTHY_SLEEP_HOURS),
];

const CORRELATION_CANDIDATES: [Metric; 8] = [
    Metric::SubjectiveMood,
    Metric::SleepHours,
    Metric::Productivity,
    Metric::Stress,
    Metric::Steps,
    Metric::CaffeineMg,
    Metric::AlcoholUnits,
    Metric::MoonPhaseDeg,
];

#[derive(Debug, Clone, Copy)]
pub struct AnalyticsSettings {
    pub trend_window: usize,
    pub top_times_limit: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            trend_window: DEFAULT_TREND_WINDOW,
            top_times_limit: DEFAULT_TOP_TIMES,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricCard {
    pub metric: Metric,
    pub average: f64,
    pub trend: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakCard {
    pub metric: Metric,
    pub threshold: f64,
    pub days: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub record_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_events: i64,
    pub trend_window: usize,
    pub cards: Vec<MetricCard>,
    pub streaks: Vec<StreakCard>,
    pub best_worst: Option<BestWorst>,
    pub top_event_times: Vec<SlotTotal>,
}

pub fn dashboard_summary(records: &[DailyRecord], settings: AnalyticsSettings) -> DashboardSummary {
    let cards = CARD_METRICS
        .iter()
        .map(|&metric| MetricCard {
            metric,
            average: average(records, metric),
            trend: trend(records, metric, settings.trend_window),
        })
        .collect();

    let streaks = STREAK_TARGETS
        .iter()
        .map(|&(metric, threshold)| StreakCard {
            metric,
            threshold,
            days: streak(records, metric, threshold),
        })
        .collect();

    DashboardSummary {
        record_count: records.len(),
        first_date: records.iter().map(|r| r.date).min(),
        last_date: records.iter().map(|r| r.date).max(),
        total_events: sum(records, Metric::EventTotal) as i64,
        trend_window: settings.trend_window,
        cards,
        streaks,
        best_worst: best_worst_day(records, Metric::SubjectiveSynchro),
        top_event_times: top_event_times(records, settings.top_times_limit),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsightResponse {
    pub summary: String,
    pub wins: Vec<String>,
    pub improvements: Vec<String>,
    pub correlation: Option<String>,
    pub streak_analysis: String,
    pub tip_of_the_week: String,
}

fn strength(r: f64) -> &'static str {
    match r.abs() {
        a if a >= 0.7 => "strong",
        a if a >= 0.5 => "moderate",
        _ => "weak",
    }
}

/// Metric most correlated with synchronicity, if any is notable.
fn strongest_correlation(records: &[DailyRecord]) -> Option<String> {
    let best = CORRELATION_CANDIDATES
        .iter()
        .map(|&m| correlation_series(records, m, Metric::SubjectiveSynchro))
        .filter(|s| s.n >= MIN_CORRELATION_POINTS)
        .max_by(|a, b| a.coefficient.abs().total_cmp(&b.coefficient.abs()))?;

    if best.coefficient.abs() < NOTABLE_CORRELATION {
        return None;
    }
    Some(format!(
        "{} shows a {} {} correlation with synchronicity (r = {:.2} over {} days).",
        capitalize(best.x.display_name()),
        strength(best.coefficient),
        if best.coefficient > 0.0 { "positive" } else { "negative" },
        best.coefficient,
        best.n,
    ))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Deterministic narrative over the same statistics the dashboard shows.
pub fn generate_insight(records: &[DailyRecord], settings: AnalyticsSettings) -> InsightResponse {
    if records.is_empty() {
        return InsightResponse {
            summary: "You haven't logged any days yet. Add today's entry to start seeing patterns.".into(),
            wins: vec![],
            improvements: vec!["Log your first day, including the times you noticed synchronicities.".into()],
            correlation: None,
            streak_analysis: "No data available yet.".into(),
            tip_of_the_week: "Log at the same time every evening so no event slips through.".into(),
        };
    }

    let s = dashboard_summary(records, settings);
    let window = settings.trend_window;
    let synchro_avg = average(records, Metric::SubjectiveSynchro);
    let mood_avg = average(records, Metric::SubjectiveMood);
    let synchro_trend = trend(records, Metric::SubjectiveSynchro, window);
    let mood_trend = trend(records, Metric::SubjectiveMood, window);

    let summary = format!(
        "Across {} logged days you recorded {} synchronicity events. Average synchronicity is {:.1}/5 and average mood is {:.1}/5.",
        s.record_count, s.total_events, synchro_avg, mood_avg,
    );

    let mut wins = Vec::new();
    if synchro_trend > 0.0 {
        wins.push(format!(
            "Synchronicity is up {:.1} points over the last {} days.",
            synchro_trend, window
        ));
    }
    if mood_trend > 0.0 {
        wins.push(format!("Mood is up {:.1} points over the last {} days.", mood_trend, window));
    }
    if let Some(top) = s.top_event_times.first().filter(|t| t.total > 0) {
        wins.push(format!("{} is your most active time with {} events.", top.time, top.total));
    }
    if let Some(bw) = &s.best_worst {
        wins.push(format!(
            "Your most synchronous day was {} ({}), rated {:.0}/5.",
            bw.best.date, bw.best.day_of_week, bw.best.value
        ));
    }

    let mut improvements = Vec::new();
    let sleep_avg = average(records, Metric::SleepHours);
    if sleep_avg > 0.0 && sleep_avg < HEALTHY_SLEEP_HOURS {
        improvements.push(format!(
            "You average {:.1}h of sleep. Aim for at least {:.0}h.",
            sleep_avg, HEALTHY_SLEEP_HOURS
        ));
    }
    let stress_avg = average(records, Metric::Stress);
    if stress_avg > 3.0 {
        improvements.push(format!(
            "Stress averages {:.1}/5. Note what preceded your most stressful days.",
            stress_avg
        ));
    }
    if mood_trend < 0.0 {
        improvements.push(format!(
            "Mood dipped {:.1} points compared to the previous {} days.",
            mood_trend.abs(),
            window
        ));
    }
    if improvements.is_empty() {
        improvements.push("Fill in sleep and stress each day to unlock more comparisons.".into());
    }

    let synchro_streak = streak(records, Metric::SubjectiveSynchro, HIGH_RATING);
    let streak_analysis = if synchro_streak > 7 {
        format!(
            "{} days in a row rated {:.0}+ for synchronicity. That is a sustained high period.",
            synchro_streak, HIGH_RATING
        )
    } else if synchro_streak > 0 {
        format!(
            "{} recent days in a row rated {:.0}+ for synchronicity.",
            synchro_streak, HIGH_RATING
        )
    } else {
        format!(
            "Your latest day was below {:.0} for synchronicity, so no high streak is active.",
            HIGH_RATING
        )
    };

    let tip_of_the_week = match s.top_event_times.first().filter(|t| t.total > 0) {
        Some(top) => format!("Pay extra attention around {} this week; it has been your busiest slot.", top.time),
        None => "Record the exact time whenever something meaningful lines up.".into(),
    };

    InsightResponse {
        summary,
        wins,
        improvements,
        correlation: strongest_correlation(records),
        streak_analysis,
        tip_of_the_week,
    }
}

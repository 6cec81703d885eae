use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::db;
use crate::error::AppResult;
use crate::models::record::DailyRecord;
use crate::services::aggregate::{
    self, best_worst_day, mood_distribution, top_event_times, BestWorst, RangeCount, SlotTotal,
};
use crate::services::buckets::{temporal_buckets, Bucket, BucketKind};
use crate::services::correlation::{correlation_series, CorrelationSeries};
use crate::services::insights::{dashboard_summary, DashboardSummary};
use crate::services::metrics::Metric;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AggregateQuery {
    pub metric: Metric,
    pub window: Option<usize>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub metric: Metric,
    /// Records that carry the metric.
    pub samples: usize,
    pub average: f64,
    pub sum: f64,
    pub window: usize,
    pub trend: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BucketQuery {
    pub kind: BucketKind,
    pub metric: Option<Metric>,
}

#[derive(Debug, Deserialize)]
pub struct CorrelationQuery {
    pub x: Metric,
    pub y: Metric,
}

#[derive(Debug, Deserialize)]
pub struct TopTimesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BestWorstQuery {
    pub metric: Option<Metric>,
}

async fn load_snapshot(state: &AppState, auth_user: &AuthUser) -> AppResult<Vec<DailyRecord>> {
    let records = db::records::snapshot(&state.db, auth_user.id, state.config.record_fetch_limit).await?;
    tracing::debug!(user_id = %auth_user.id, records = records.len(), "Loaded analytics snapshot");
    Ok(records)
}

pub fn aggregate_metric(records: &[DailyRecord], query: &AggregateQuery, default_window: usize) -> AggregateResponse {
    let window = query.window.filter(|w| *w > 0).unwrap_or(default_window);
    AggregateResponse {
        metric: query.metric,
        samples: records.iter().filter(|r| query.metric.value(r).is_some()).count(),
        average: aggregate::average(records, query.metric),
        sum: aggregate::sum(records, query.metric),
        window,
        trend: aggregate::trend(records, query.metric, window),
        threshold: query.threshold,
        streak: query
            .threshold
            .map(|t| aggregate::streak(records, query.metric, t)),
    }
}

pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DashboardSummary>> {
    let records = load_snapshot(&state, &auth_user).await?;
    Ok(Json(dashboard_summary(&records, state.config.analytics())))
}

pub async fn get_aggregate(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<AggregateQuery>,
) -> AppResult<Json<AggregateResponse>> {
    let records = load_snapshot(&state, &auth_user).await?;
    Ok(Json(aggregate_metric(&records, &query, state.config.trend_window_days)))
}

pub async fn get_buckets(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<BucketQuery>,
) -> AppResult<Json<Vec<Bucket>>> {
    let records = load_snapshot(&state, &auth_user).await?;
    let metric = query.metric.unwrap_or(Metric::SubjectiveSynchro);
    Ok(Json(temporal_buckets(&records, query.kind, metric)))
}

pub async fn get_mood_distribution(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<RangeCount>>> {
    let records = load_snapshot(&state, &auth_user).await?;
    Ok(Json(mood_distribution(&records)))
}

pub async fn get_correlation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<CorrelationQuery>,
) -> AppResult<Json<CorrelationSeries>> {
    let records = load_snapshot(&state, &auth_user).await?;
    Ok(Json(correlation_series(&records, query.x, query.y)))
}

pub async fn get_top_times(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TopTimesQuery>,
) -> AppResult<Json<Vec<SlotTotal>>> {
    let records = load_snapshot(&state, &auth_user).await?;
    let limit = query.limit.unwrap_or(state.config.top_times_limit);
    Ok(Json(top_event_times(&records, limit)))
}

pub async fn get_best_worst(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<BestWorstQuery>,
) -> AppResult<Json<Option<BestWorst>>> {
    let records = load_snapshot(&state, &auth_user).await?;
    let metric = query.metric.unwrap_or(Metric::SubjectiveSynchro);
    Ok(Json(best_worst_day(&records, metric)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregate::tests::day;

    fn records() -> Vec<DailyRecord> {
        let mut a = day("2024-01-01");
        a.subjective_synchro = Some(5);
        let mut b = day("2024-01-08");
        b.subjective_synchro = Some(3);
        vec![b, a, day("2024-01-09")]
    }

    #[test]
    fn test_aggregate_metric() {
        let query = AggregateQuery {
            metric: Metric::SubjectiveSynchro,
            window: Some(1),
            threshold: None,
        };
        let resp = aggregate_metric(&records(), &query, 7);
        assert_eq!(resp.samples, 2);
        assert_eq!(resp.average, 4.0);
        assert_eq!(resp.sum, 8.0);
        // newest record (2024-01-09) has no rating, previous window is 2024-01-08
        assert_eq!(resp.trend, -3.0);
        assert!(resp.streak.is_none());
    }

    #[test]
    fn test_aggregate_metric_with_threshold_and_default_window() {
        let query = AggregateQuery {
            metric: Metric::SubjectiveSynchro,
            window: Some(0),
            threshold: Some(1.0),
        };
        let resp = aggregate_metric(&records(), &query, 7);
        assert_eq!(resp.window, 7);
        // newest record lacks the metric
        assert_eq!(resp.streak, Some(0));
    }

    #[test]
    fn test_query_strings_parse() {
        let q: BucketQuery = serde_json::from_value(serde_json::json!({"kind": "moon_phase"})).unwrap();
        assert_eq!(q.kind, BucketKind::MoonPhase);
        assert!(q.metric.is_none());
        let q: CorrelationQuery =
            serde_json::from_value(serde_json::json!({"x": "sleep_hours", "y": "subjectivemood"})).unwrap();
        assert_eq!(q.x, Metric::SleepHours);
        assert_eq!(q.y, Metric::SubjectiveMood);
    }
}

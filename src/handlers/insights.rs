use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::db;
use crate::error::AppResult;
use crate::services::insights::{generate_insight, InsightResponse};
use crate::AppState;

pub async fn get_insights(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<InsightResponse>> {
    let records =
        db::records::snapshot(&state.db, auth_user.id, state.config.record_fetch_limit).await?;

    let insight = generate_insight(&records, state.config.analytics());
    tracing::info!(
        user_id = %auth_user.id,
        records = records.len(),
        has_correlation = insight.correlation.is_some(),
        "Insight generated"
    );

    Ok(Json(insight))
}

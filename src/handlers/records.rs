use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::record::{
    CreateRecordRequest, DailyRecord, RecordFields, RecordQuery, SortOrder,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub record_count: usize,
    pub records: Vec<DailyRecord>,
}

pub async fn create_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateRecordRequest>,
) -> AppResult<Json<DailyRecord>> {
    body.validate()?;

    let mut record = DailyRecord::new(auth_user.id, body.date);
    record.apply(&body.fields)?;

    let created = db::records::insert(&state.db, &record)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("A record for {} already exists", body.date))
        })?;

    tracing::info!(user_id = %auth_user.id, date = %created.date, event_total = created.event_total, "Record created");
    Ok(Json(created))
}

pub async fn list_records(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<Vec<DailyRecord>>> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::Validation("start_date must not be after end_date".into()));
        }
    }

    let records = db::records::list(
        &state.db,
        auth_user.id,
        query.start_date,
        query.end_date,
        query.order,
        state.config.record_fetch_limit,
    )
    .await?;

    Ok(Json(records))
}

pub async fn get_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<DailyRecord>> {
    let record = db::records::find(&state.db, auth_user.id, record_id)
        .await?
        .ok_or(AppError::NotFound("Record not found".into()))?;

    Ok(Json(record))
}

/// Partial update. Absent fields are kept; `event_total` is recomputed.
pub async fn patch_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(record_id): Path<Uuid>,
    Json(body): Json<RecordFields>,
) -> AppResult<Json<DailyRecord>> {
    body.validate()?;

    let mut record = db::records::find(&state.db, auth_user.id, record_id)
        .await?
        .ok_or(AppError::NotFound("Record not found".into()))?;

    record.apply(&body)?;

    let updated = db::records::update(&state.db, &record)
        .await?
        .ok_or(AppError::NotFound("Record not found".into()))?;

    Ok(Json(updated))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    // Idempotent: deleting a missing record still succeeds
    let existed = db::records::delete(&state.db, auth_user.id, record_id).await?;
    if existed {
        tracing::info!(user_id = %auth_user.id, record_id = %record_id, "Record deleted");
    }

    Ok(Json(serde_json::json!({ "deleted": true, "id": record_id })))
}

/// Raw collection as a downloadable JSON document, oldest first.
pub async fn export_records(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let records = db::records::list(
        &state.db,
        auth_user.id,
        None,
        None,
        SortOrder::Asc,
        state.config.record_fetch_limit,
    )
    .await?;

    let document = ExportDocument {
        exported_at: Utc::now(),
        record_count: records.len(),
        records,
    };

    Ok((
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"synchrolog-export.json\"",
        )],
        Json(document),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_export_document_shape() {
        let record = DailyRecord::new(Uuid::new_v4(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let doc = ExportDocument {
            exported_at: Utc::now(),
            record_count: 1,
            records: vec![record],
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["record_count"], 1);
        assert_eq!(json["records"][0]["date"], "2024-01-01");
        assert_eq!(json["records"][0]["day_of_week"], "Monday");
        assert_eq!(json["records"][0]["slot_counts"].as_array().unwrap().len(), 24);
    }
}

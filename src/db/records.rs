//! Queries against `daily_records`. Every query is scoped by `user_id`.

use chrono::NaiveDate;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::models::record::{DailyRecord, SortOrder};

type RecordQueryAs<'q> = QueryAs<'q, Postgres, DailyRecord, PgArguments>;

/// Binds the metric columns in table order, after whatever is bound already.
fn bind_metrics<'q>(query: RecordQueryAs<'q>, r: &DailyRecord) -> RecordQueryAs<'q> {
    query
        .bind(r.subjective_synchro)
        .bind(r.subjective_mood)
        .bind(r.productivity)
        .bind(r.mental_focus)
        .bind(r.mental_clarity)
        .bind(r.mental_calm)
        .bind(r.mental_energy)
        .bind(r.mental_motivation)
        .bind(r.mental_creativity)
        .bind(r.stress)
        .bind(r.sleep_minutes)
        .bind(r.heart_rate)
        .bind(r.resting_heart_rate)
        .bind(r.steps)
        .bind(r.weight_kg)
        .bind(r.calories)
        .bind(r.carbs_g)
        .bind(r.protein_g)
        .bind(r.fat_g)
        .bind(r.caffeine_mg)
        .bind(r.alcohol_units)
        .bind(r.moon_phase_deg)
        .bind(r.earth_sun_distance_au)
}

/// Inserts `record` unless the user already has one for that date, in which
/// case `None` is returned.
pub async fn insert(db: &PgPool, record: &DailyRecord) -> Result<Option<DailyRecord>, sqlx::Error> {
    let query = sqlx::query_as::<_, DailyRecord>(
        r#"
        INSERT INTO daily_records (
            id, user_id, record_date, day_of_week, slot_counts, event_total,
            subjective_synchro, subjective_mood, productivity,
            mental_focus, mental_clarity, mental_calm, mental_energy, mental_motivation, mental_creativity,
            stress, sleep_minutes, heart_rate, resting_heart_rate, steps, weight_kg,
            calories, carbs_g, protein_g, fat_g, caffeine_mg, alcohol_units,
            moon_phase_deg, earth_sun_distance_au
        )
        VALUES (
            $1, $2, $3, $4, $5, $6,
            $7, $8, $9,
            $10, $11, $12, $13, $14, $15,
            $16, $17, $18, $19, $20, $21,
            $22, $23, $24, $25, $26, $27,
            $28, $29
        )
        ON CONFLICT (user_id, record_date) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(record.date)
    .bind(record.day_of_week.clone())
    .bind(record.slot_counts.clone())
    .bind(record.event_total);

    bind_metrics(query, record).fetch_optional(db).await
}

/// Writes every mutable column of `record` back.
pub async fn update(db: &PgPool, record: &DailyRecord) -> Result<Option<DailyRecord>, sqlx::Error> {
    let query = sqlx::query_as::<_, DailyRecord>(
        r#"
        UPDATE daily_records SET
            slot_counts = $3,
            event_total = $4,
            subjective_synchro = $5,
            subjective_mood = $6,
            productivity = $7,
            mental_focus = $8,
            mental_clarity = $9,
            mental_calm = $10,
            mental_energy = $11,
            mental_motivation = $12,
            mental_creativity = $13,
            stress = $14,
            sleep_minutes = $15,
            heart_rate = $16,
            resting_heart_rate = $17,
            steps = $18,
            weight_kg = $19,
            calories = $20,
            carbs_g = $21,
            protein_g = $22,
            fat_g = $23,
            caffeine_mg = $24,
            alcohol_units = $25,
            moon_phase_deg = $26,
            earth_sun_distance_au = $27,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(record.slot_counts.clone())
    .bind(record.event_total);

    bind_metrics(query, record).fetch_optional(db).await
}

pub async fn find(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<DailyRecord>, sqlx::Error> {
    sqlx::query_as::<_, DailyRecord>("SELECT * FROM daily_records WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM daily_records WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Records in an optional inclusive date range, capped at `limit` rows.
pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    order: SortOrder,
    limit: i64,
) -> Result<Vec<DailyRecord>, sqlx::Error> {
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let sql = format!(
        r#"
        SELECT * FROM daily_records
        WHERE user_id = $1
          AND ($2::date IS NULL OR record_date >= $2)
          AND ($3::date IS NULL OR record_date <= $3)
        ORDER BY record_date {}
        LIMIT $4
        "#,
        direction
    );

    sqlx::query_as::<_, DailyRecord>(&sql)
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(db)
        .await
}

/// The full snapshot the analytics engine runs over, newest first.
pub async fn snapshot(db: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<DailyRecord>, sqlx::Error> {
    let records = list(db, user_id, None, None, SortOrder::Desc, limit).await?;
    if records.len() as i64 >= limit {
        tracing::warn!(user_id = %user_id, limit, "Analytics snapshot hit the fetch limit");
    }
    Ok(records)
}

use std::collections::BTreeMap;

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use staybook_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use staybook_core::domain::booking::BookingId;

use super::{parse_timestamp, RepositoryError};

pub async fn insert_events(
    conn: &mut SqliteConnection,
    events: &[AuditEvent],
) -> Result<(), RepositoryError> {
    for event in events {
        let metadata_json = serde_json::to_string(&event.metadata)
            .map_err(|error| RepositoryError::Decode(format!("audit metadata: {error}")))?;

        sqlx::query(
            "INSERT INTO audit_event (
                id,
                booking_id,
                correlation_id,
                event_type,
                category,
                actor,
                outcome,
                metadata_json,
                occurred_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(event.booking_id.as_ref().map(|id| id.0.as_str()))
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(metadata_json)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn list_for_booking(
    conn: &mut SqliteConnection,
    booking_id: &BookingId,
) -> Result<Vec<AuditEvent>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, booking_id, correlation_id, event_type, category, actor, outcome,
                metadata_json, occurred_at
         FROM audit_event
         WHERE booking_id = ?
         ORDER BY occurred_at ASC, rowid ASC",
    )
    .bind(&booking_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(event_from_row).collect()
}

fn event_from_row(row: SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let category_raw: String = row.try_get("category")?;
    let category = match category_raw.as_str() {
        "booking" => AuditCategory::Booking,
        "availability" => AuditCategory::Availability,
        "payment" => AuditCategory::Payment,
        "refund" => AuditCategory::Refund,
        "system" => AuditCategory::System,
        other => return Err(RepositoryError::Decode(format!("unknown audit category `{other}`"))),
    };
    let outcome_raw: String = row.try_get("outcome")?;
    let outcome = match outcome_raw.as_str() {
        "success" => AuditOutcome::Success,
        "rejected" => AuditOutcome::Rejected,
        "failed" => AuditOutcome::Failed,
        other => return Err(RepositoryError::Decode(format!("unknown audit outcome `{other}`"))),
    };
    let metadata_json: String = row.try_get("metadata_json")?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid audit metadata: {error}")))?;

    Ok(AuditEvent {
        event_id: row.try_get("id")?,
        booking_id: row.try_get::<Option<String>, _>("booking_id")?.map(BookingId),
        correlation_id: row.try_get("correlation_id")?,
        event_type: row.try_get("event_type")?,
        category,
        actor: row.try_get("actor")?,
        outcome,
        metadata,
        occurred_at: parse_timestamp("occurred_at", row.try_get("occurred_at")?)?,
    })
}

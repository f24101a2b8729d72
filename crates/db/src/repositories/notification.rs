use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use staybook_core::domain::account::AccountId;
use staybook_core::domain::booking::BookingId;
use staybook_core::domain::notification::{Notification, NotificationKind};

use super::{parse_timestamp, RepositoryError};

pub async fn insert_notification(
    conn: &mut SqliteConnection,
    notification: &Notification,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO notifications (
            id,
            recipient_id,
            kind,
            title,
            message,
            booking_id,
            is_read,
            created_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&notification.id)
    .bind(&notification.recipient_id.0)
    .bind(notification.kind.as_str())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.booking_id.as_ref().map(|id| id.0.as_str()))
    .bind(notification.read)
    .bind(notification.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn list_for_recipient(
    conn: &mut SqliteConnection,
    recipient_id: &AccountId,
) -> Result<Vec<Notification>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, recipient_id, kind, title, message, booking_id, is_read, created_at
         FROM notifications
         WHERE recipient_id = ?
         ORDER BY created_at ASC, id ASC",
    )
    .bind(&recipient_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(notification_from_row).collect()
}

fn notification_from_row(row: SqliteRow) -> Result<Notification, RepositoryError> {
    let kind_raw: String = row.try_get("kind")?;
    let kind = match kind_raw.as_str() {
        "booking_requested" => NotificationKind::BookingRequested,
        "booking_status_changed" => NotificationKind::BookingStatusChanged,
        "payment_received" => NotificationKind::PaymentReceived,
        "refund_issued" => NotificationKind::RefundIssued,
        "booking_cancelled" => NotificationKind::BookingCancelled,
        other => {
            return Err(RepositoryError::Decode(format!("unknown notification kind `{other}`")))
        }
    };

    Ok(Notification {
        id: row.try_get("id")?,
        recipient_id: AccountId(row.try_get("recipient_id")?),
        kind,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        booking_id: row.try_get::<Option<String>, _>("booking_id")?.map(BookingId),
        read: row.try_get("is_read")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use staybook_core::domain::account::AccountId;
use staybook_core::domain::booking::BookingId;
use staybook_core::domain::payment::{Payment, PaymentId, PaymentStatus};

use super::{
    parse_decimal, parse_enum, parse_optional_decimal, parse_timestamp, RepositoryError,
};

const PAYMENT_COLUMNS: &str = "
    id,
    booking_id,
    guest_id,
    host_id,
    external_reference,
    amount,
    host_payout,
    commission,
    tax,
    currency,
    status,
    refunded_amount,
    refund_reason,
    metadata_json,
    created_at,
    updated_at";

pub async fn find_payment_for_booking(
    conn: &mut SqliteConnection,
    booking_id: &BookingId,
) -> Result<Option<Payment>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = ?"))
        .bind(&booking_id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(payment_from_row).transpose()
}

pub async fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &Payment,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO payments ({PAYMENT_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&payment.id.0)
    .bind(&payment.booking_id.0)
    .bind(payment.guest_id.as_ref().map(|id| id.0.as_str()))
    .bind(&payment.host_id.0)
    .bind(&payment.external_reference)
    .bind(payment.amount.to_string())
    .bind(payment.host_payout.to_string())
    .bind(payment.commission.to_string())
    .bind(payment.tax.to_string())
    .bind(&payment.currency)
    .bind(payment.status.as_str())
    .bind(payment.refunded_amount.map(|value| value.to_string()))
    .bind(payment.refund_reason.as_deref())
    .bind(payment.metadata.to_string())
    .bind(payment.created_at.to_rfc3339())
    .bind(payment.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Records a refund against a payment that is still `expected_status`.
/// Returns `false` if the payment moved on in the meantime.
pub async fn record_refund(
    conn: &mut SqliteConnection,
    payment: &Payment,
    expected_status: PaymentStatus,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE payments
         SET status = ?,
             refunded_amount = ?,
             refund_reason = ?,
             metadata_json = ?,
             updated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(payment.status.as_str())
    .bind(payment.refunded_amount.map(|value| value.to_string()))
    .bind(payment.refund_reason.as_deref())
    .bind(payment.metadata.to_string())
    .bind(payment.updated_at.to_rfc3339())
    .bind(&payment.id.0)
    .bind(expected_status.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn payment_from_row(row: SqliteRow) -> Result<Payment, RepositoryError> {
    let status: String = row.try_get("status")?;
    let metadata_json: String = row.try_get("metadata_json")?;
    let metadata = serde_json::from_str(&metadata_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid payment metadata: {error}")))?;

    Ok(Payment {
        id: PaymentId(row.try_get("id")?),
        booking_id: BookingId(row.try_get("booking_id")?),
        guest_id: row.try_get::<Option<String>, _>("guest_id")?.map(AccountId),
        host_id: AccountId(row.try_get("host_id")?),
        external_reference: row.try_get("external_reference")?,
        amount: parse_decimal("amount", row.try_get("amount")?)?,
        host_payout: parse_decimal("host_payout", row.try_get("host_payout")?)?,
        commission: parse_decimal("commission", row.try_get("commission")?)?,
        tax: parse_decimal("tax", row.try_get("tax")?)?,
        currency: row.try_get("currency")?,
        status: parse_enum("status", &status)?,
        refunded_amount: parse_optional_decimal("refunded_amount", row.try_get("refunded_amount")?)?,
        refund_reason: row.try_get("refund_reason")?,
        metadata,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

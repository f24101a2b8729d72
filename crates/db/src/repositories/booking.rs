use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use staybook_core::dates::{format_calendar_date, StayRange};
use staybook_core::domain::account::AccountId;
use staybook_core::domain::booking::{Booking, BookingId, BookingStatus, PricingSnapshot};
use staybook_core::domain::property::PropertyId;

use super::{
    parse_date, parse_decimal, parse_enum, parse_optional_timestamp, parse_timestamp, parse_u32,
    RepositoryError,
};

const BOOKING_COLUMNS: &str = "
    id,
    property_id,
    guest_id,
    guest_email,
    host_id,
    check_in,
    check_out,
    guests,
    special_requests,
    nights,
    subtotal,
    cleaning_fee,
    service_fee,
    tax,
    total,
    commission,
    status,
    payment_status,
    payment_reference,
    confirmed_at,
    cancelled_at,
    created_at,
    updated_at,
    version";

pub async fn find_booking(
    conn: &mut SqliteConnection,
    id: &BookingId,
) -> Result<Option<Booking>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(booking_from_row).transpose()
}

/// Confirmed bookings at `property_id` whose nights intersect `stay`.
pub async fn confirmed_overlapping(
    conn: &mut SqliteConnection,
    property_id: &PropertyId,
    stay: &StayRange,
) -> Result<Vec<Booking>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {BOOKING_COLUMNS}
         FROM bookings
         WHERE property_id = ?
           AND status = ?
           AND check_in < ?
           AND check_out > ?
         ORDER BY check_in ASC"
    ))
    .bind(&property_id.0)
    .bind(BookingStatus::Confirmed.as_str())
    .bind(format_calendar_date(stay.check_out()))
    .bind(format_calendar_date(stay.check_in()))
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(booking_from_row).collect()
}

pub async fn insert_booking(
    conn: &mut SqliteConnection,
    booking: &Booking,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO bookings ({BOOKING_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&booking.id.0)
    .bind(&booking.property_id.0)
    .bind(booking.guest_id.as_ref().map(|id| id.0.as_str()))
    .bind(booking.guest_email.as_deref())
    .bind(&booking.host_id.0)
    .bind(format_calendar_date(booking.stay.check_in()))
    .bind(format_calendar_date(booking.stay.check_out()))
    .bind(i64::from(booking.guests))
    .bind(booking.special_requests.as_deref())
    .bind(i64::from(booking.pricing.nights))
    .bind(booking.pricing.subtotal.to_string())
    .bind(booking.pricing.cleaning_fee.to_string())
    .bind(booking.pricing.service_fee.to_string())
    .bind(booking.pricing.tax.to_string())
    .bind(booking.pricing.total.to_string())
    .bind(booking.pricing.commission.to_string())
    .bind(booking.status.as_str())
    .bind(booking.payment_status.as_str())
    .bind(booking.payment_reference.as_deref())
    .bind(booking.confirmed_at.map(|value| value.to_rfc3339()))
    .bind(booking.cancelled_at.map(|value| value.to_rfc3339()))
    .bind(booking.created_at.to_rfc3339())
    .bind(booking.updated_at.to_rfc3339())
    .bind(booking.version)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes the mutable state of `booking` only if the stored row still has
/// `expected_status` at `expected_version`. Returns `false` when another
/// writer got there first.
pub async fn compare_and_swap_state(
    conn: &mut SqliteConnection,
    booking: &Booking,
    expected_status: BookingStatus,
    expected_version: i64,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE bookings
         SET status = ?,
             payment_status = ?,
             payment_reference = ?,
             confirmed_at = ?,
             cancelled_at = ?,
             updated_at = ?,
             version = ?
         WHERE id = ? AND status = ? AND version = ?",
    )
    .bind(booking.status.as_str())
    .bind(booking.payment_status.as_str())
    .bind(booking.payment_reference.as_deref())
    .bind(booking.confirmed_at.map(|value| value.to_rfc3339()))
    .bind(booking.cancelled_at.map(|value| value.to_rfc3339()))
    .bind(booking.updated_at.to_rfc3339())
    .bind(booking.version)
    .bind(&booking.id.0)
    .bind(expected_status.as_str())
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn booking_from_row(row: SqliteRow) -> Result<Booking, RepositoryError> {
    let check_in = parse_date("check_in", row.try_get("check_in")?)?;
    let check_out = parse_date("check_out", row.try_get("check_out")?)?;
    let stay = StayRange::new(check_in, check_out)
        .map_err(|error| RepositoryError::Decode(format!("invalid stay range: {error}")))?;
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;

    Ok(Booking {
        id: BookingId(row.try_get("id")?),
        property_id: PropertyId(row.try_get("property_id")?),
        guest_id: row.try_get::<Option<String>, _>("guest_id")?.map(AccountId),
        guest_email: row.try_get("guest_email")?,
        host_id: AccountId(row.try_get("host_id")?),
        stay,
        guests: parse_u32("guests", row.try_get("guests")?)?,
        special_requests: row.try_get("special_requests")?,
        pricing: PricingSnapshot {
            nights: parse_u32("nights", row.try_get("nights")?)?,
            subtotal: parse_decimal("subtotal", row.try_get("subtotal")?)?,
            cleaning_fee: parse_decimal("cleaning_fee", row.try_get("cleaning_fee")?)?,
            service_fee: parse_decimal("service_fee", row.try_get("service_fee")?)?,
            tax: parse_decimal("tax", row.try_get("tax")?)?,
            total: parse_decimal("total", row.try_get("total")?)?,
            commission: parse_decimal("commission", row.try_get("commission")?)?,
        },
        status: parse_enum("status", &status)?,
        payment_status: parse_enum("payment_status", &payment_status)?,
        payment_reference: row.try_get("payment_reference")?,
        confirmed_at: parse_optional_timestamp("confirmed_at", row.try_get("confirmed_at")?)?,
        cancelled_at: parse_optional_timestamp("cancelled_at", row.try_get("cancelled_at")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        version: row.try_get("version")?,
    })
}

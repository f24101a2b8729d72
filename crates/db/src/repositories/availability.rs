use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection};
use staybook_core::dates::{format_calendar_date, StayRange};
use staybook_core::domain::availability::AvailabilityEntry;
use staybook_core::domain::property::PropertyId;

use super::{parse_date, parse_optional_decimal, parse_timestamp, RepositoryError};

/// Ledger rows with `start <= date < end`, oldest first.
pub async fn entries_in_range(
    conn: &mut SqliteConnection,
    property_id: &PropertyId,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AvailabilityEntry>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT property_id, date, is_available, price, updated_at
         FROM availability
         WHERE property_id = ? AND date >= ? AND date < ?
         ORDER BY date ASC",
    )
    .bind(&property_id.0)
    .bind(format_calendar_date(start))
    .bind(format_calendar_date(end))
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(entry_from_row).collect()
}

/// Nights of `stay` the ledger marks unavailable.
pub async fn blocked_dates(
    conn: &mut SqliteConnection,
    property_id: &PropertyId,
    stay: &StayRange,
) -> Result<Vec<NaiveDate>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT date
         FROM availability
         WHERE property_id = ? AND date >= ? AND date < ? AND is_available = 0
         ORDER BY date ASC",
    )
    .bind(&property_id.0)
    .bind(format_calendar_date(stay.check_in()))
    .bind(format_calendar_date(stay.check_out()))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(|row| parse_date("date", row.try_get("date")?)).collect()
}

pub async fn upsert_entry(
    conn: &mut SqliteConnection,
    entry: &AvailabilityEntry,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO availability (property_id, date, is_available, price, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(property_id, date) DO UPDATE SET
            is_available = excluded.is_available,
            price = excluded.price,
            updated_at = excluded.updated_at",
    )
    .bind(&entry.property_id.0)
    .bind(format_calendar_date(entry.date))
    .bind(entry.is_available)
    .bind(entry.price.map(|price| price.to_string()))
    .bind(entry.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Marks every night of `stay` in one statement. Existing price overrides are
/// left untouched.
pub async fn set_stay_availability(
    conn: &mut SqliteConnection,
    property_id: &PropertyId,
    stay: &StayRange,
    is_available: bool,
    at: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let dates: Vec<NaiveDate> = stay.dates().collect();
    set_dates_availability(conn, property_id, &dates, is_available, at).await
}

pub async fn set_dates_availability(
    conn: &mut SqliteConnection,
    property_id: &PropertyId,
    dates: &[NaiveDate],
    is_available: bool,
    at: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    if dates.is_empty() {
        return Ok(0);
    }

    let updated_at = at.to_rfc3339();
    let mut builder: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("INSERT INTO availability (property_id, date, is_available, updated_at) ");
    builder.push_values(dates, |mut row, date| {
        row.push_bind(property_id.0.clone())
            .push_bind(format_calendar_date(*date))
            .push_bind(is_available)
            .push_bind(updated_at.clone());
    });
    builder.push(
        " ON CONFLICT(property_id, date) DO UPDATE SET
            is_available = excluded.is_available,
            updated_at = excluded.updated_at",
    );

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

fn entry_from_row(row: SqliteRow) -> Result<AvailabilityEntry, RepositoryError> {
    Ok(AvailabilityEntry {
        property_id: PropertyId(row.try_get("property_id")?),
        date: parse_date("date", row.try_get("date")?)?,
        is_available: row.try_get("is_available")?,
        price: parse_optional_decimal("price", row.try_get("price")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use staybook_core::dates::{parse_calendar_date, StayRange};
    use staybook_core::domain::availability::AvailabilityEntry;
    use staybook_core::domain::property::PropertyId;

    use super::{blocked_dates, entries_in_range, set_stay_availability, upsert_entry};
    use crate::fixtures::DemoDataset;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn block_and_release_keep_price_overrides() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoDataset::load(&pool).await.expect("seed");
        let mut conn = pool.acquire().await.expect("acquire");

        let property_id = PropertyId(DemoDataset::LAKESIDE_PROPERTY_ID.to_owned());
        let override_date = parse_calendar_date("2026-03-03").expect("date");
        upsert_entry(
            &mut conn,
            &AvailabilityEntry {
                property_id: property_id.clone(),
                date: override_date,
                is_available: true,
                price: Some(Decimal::new(150, 0)),
                updated_at: Utc::now(),
            },
        )
        .await
        .expect("override");

        let stay = StayRange::parse("2026-03-02", "2026-03-05").expect("stay");
        let written = set_stay_availability(&mut conn, &property_id, &stay, false, Utc::now())
            .await
            .expect("block");
        assert_eq!(written, 3);
        assert_eq!(blocked_dates(&mut conn, &property_id, &stay).await.expect("blocked").len(), 3);

        set_stay_availability(&mut conn, &property_id, &stay, true, Utc::now())
            .await
            .expect("release");
        assert!(blocked_dates(&mut conn, &property_id, &stay).await.expect("blocked").is_empty());

        let entries = entries_in_range(&mut conn, &property_id, stay.check_in(), stay.check_out())
            .await
            .expect("range");
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|entry| entry.is_available));
        let overridden = entries.iter().find(|entry| entry.date == override_date).expect("entry");
        assert_eq!(overridden.price, Some(Decimal::new(150, 0)));
    }

    #[tokio::test]
    async fn range_read_excludes_the_end_date() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoDataset::load(&pool).await.expect("seed");
        let mut conn = pool.acquire().await.expect("acquire");

        let property_id = PropertyId(DemoDataset::LAKESIDE_PROPERTY_ID.to_owned());
        let stay = StayRange::parse("2026-04-01", "2026-04-04").expect("stay");
        set_stay_availability(&mut conn, &property_id, &stay, false, Utc::now())
            .await
            .expect("block");

        let start = parse_calendar_date("2026-04-02").expect("date");
        let end = parse_calendar_date("2026-04-03").expect("date");
        let entries = entries_in_range(&mut conn, &property_id, start, end).await.expect("range");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, start);
    }
}

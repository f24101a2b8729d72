use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use staybook_core::domain::account::AccountId;
use staybook_core::domain::property::{Property, PropertyId};

use super::{parse_decimal, parse_timestamp, parse_u32, RepositoryError};

pub async fn find_property(
    conn: &mut SqliteConnection,
    id: &PropertyId,
) -> Result<Option<Property>, RepositoryError> {
    let row = sqlx::query(
        "SELECT
            id,
            owner_id,
            title,
            currency,
            base_price,
            cleaning_fee,
            service_fee,
            tax_rate,
            weekend_multiplier,
            min_nights,
            max_nights,
            max_guests,
            created_at,
            updated_at
         FROM properties
         WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(property_from_row).transpose()
}

pub async fn save_property(
    conn: &mut SqliteConnection,
    property: &Property,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO properties (
            id,
            owner_id,
            title,
            currency,
            base_price,
            cleaning_fee,
            service_fee,
            tax_rate,
            weekend_multiplier,
            min_nights,
            max_nights,
            max_guests,
            created_at,
            updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            owner_id = excluded.owner_id,
            title = excluded.title,
            currency = excluded.currency,
            base_price = excluded.base_price,
            cleaning_fee = excluded.cleaning_fee,
            service_fee = excluded.service_fee,
            tax_rate = excluded.tax_rate,
            weekend_multiplier = excluded.weekend_multiplier,
            min_nights = excluded.min_nights,
            max_nights = excluded.max_nights,
            max_guests = excluded.max_guests,
            updated_at = excluded.updated_at",
    )
    .bind(&property.id.0)
    .bind(&property.owner_id.0)
    .bind(&property.title)
    .bind(&property.currency)
    .bind(property.base_price.to_string())
    .bind(property.cleaning_fee.to_string())
    .bind(property.service_fee.to_string())
    .bind(property.tax_rate.to_string())
    .bind(property.weekend_multiplier.to_string())
    .bind(i64::from(property.min_nights))
    .bind(i64::from(property.max_nights))
    .bind(i64::from(property.max_guests))
    .bind(property.created_at.to_rfc3339())
    .bind(property.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn property_from_row(row: SqliteRow) -> Result<Property, RepositoryError> {
    Ok(Property {
        id: PropertyId(row.try_get("id")?),
        owner_id: AccountId(row.try_get("owner_id")?),
        title: row.try_get("title")?,
        currency: row.try_get("currency")?,
        base_price: parse_decimal("base_price", row.try_get("base_price")?)?,
        cleaning_fee: parse_decimal("cleaning_fee", row.try_get("cleaning_fee")?)?,
        service_fee: parse_decimal("service_fee", row.try_get("service_fee")?)?,
        tax_rate: parse_decimal("tax_rate", row.try_get("tax_rate")?)?,
        weekend_multiplier: parse_decimal("weekend_multiplier", row.try_get("weekend_multiplier")?)?,
        min_nights: parse_u32("min_nights", row.try_get("min_nights")?)?,
        max_nights: parse_u32("max_nights", row.try_get("max_nights")?)?,
        max_guests: parse_u32("max_guests", row.try_get("max_guests")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

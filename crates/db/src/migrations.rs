use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub const BOOKING_TABLES: [&str; 7] = [
    "accounts",
    "properties",
    "bookings",
    "availability",
    "payments",
    "notifications",
    "audit_event",
];

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Booking tables not yet present; empty once migrations have run.
pub async fn missing_tables(pool: &DbPool) -> Result<Vec<&'static str>, sqlx::Error> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;
    Ok(BOOKING_TABLES.into_iter().filter(|table| !present.iter().any(|name| name == table)).collect())
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{missing_tables, run_pending, BOOKING_TABLES};
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "accounts",
        "properties",
        "bookings",
        "availability",
        "payments",
        "notifications",
        "audit_event",
        "idx_bookings_property_status",
        "idx_bookings_guest_id",
        "idx_bookings_host_id",
        "idx_payments_booking_id",
        "idx_notifications_recipient",
        "idx_audit_event_booking_id",
        "idx_audit_event_type",
    ];

    async fn schema_object_count(pool: &crate::DbPool) -> i64 {
        let placeholders = vec!["?"; MANAGED_SCHEMA_OBJECTS.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE name IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for name in MANAGED_SCHEMA_OBJECTS {
            query = query.bind(*name);
        }
        query.fetch_one(pool).await.expect("count schema objects").get::<i64, _>("count")
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        assert_eq!(schema_object_count(&pool).await, MANAGED_SCHEMA_OBJECTS.len() as i64);
    }

    #[tokio::test]
    async fn missing_tables_reports_an_unmigrated_database() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        assert_eq!(missing_tables(&pool).await.expect("inspect"), BOOKING_TABLES.to_vec());

        run_pending(&pool).await.expect("run migrations");
        assert!(missing_tables(&pool).await.expect("inspect").is_empty());
    }

    #[tokio::test]
    async fn migrations_are_idempotent_and_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run is a no-op");

        MIGRATOR.undo(&pool, 0).await.expect("undo all migrations");
        assert_eq!(schema_object_count(&pool).await, 0);

        run_pending(&pool).await.expect("re-apply");
        assert_eq!(schema_object_count(&pool).await, MANAGED_SCHEMA_OBJECTS.len() as i64);
    }

    #[tokio::test]
    async fn one_payment_per_booking_is_enforced_by_the_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let unique = sqlx::query(
            "SELECT \"unique\" AS is_unique FROM pragma_index_list('payments') WHERE name = 'idx_payments_booking_id'",
        )
        .fetch_one(&pool)
        .await
        .expect("index metadata")
        .get::<i64, _>("is_unique");
        assert_eq!(unique, 1);
    }
}

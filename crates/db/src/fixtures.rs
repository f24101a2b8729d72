use chrono::Utc;
use rust_decimal::Decimal;
use staybook_core::domain::account::{Account, AccountId, AccountRole, IdentityVerification};
use staybook_core::domain::property::{Property, PropertyId};

use crate::connection::DbPool;
use crate::repositories::account::save_account;
use crate::repositories::property::save_property;
use crate::repositories::RepositoryError;

struct SeedAccount {
    id: &'static str,
    role: AccountRole,
    display_name: &'static str,
    email: &'static str,
    identity: IdentityVerification,
    payment_method_verified: bool,
}

struct SeedProperty {
    id: &'static str,
    owner_id: &'static str,
    title: &'static str,
    base_price_cents: i64,
    cleaning_fee_cents: i64,
    service_fee_cents: i64,
    tax_rate_bps: i64,
    weekend_multiplier_pct: i64,
    min_nights: u32,
    max_nights: u32,
    max_guests: u32,
}

const SEED_ACCOUNTS: &[SeedAccount] = &[
    SeedAccount {
        id: DemoDataset::HOST_ID,
        role: AccountRole::Host,
        display_name: "Morgan Lake",
        email: "morgan@hosts.example",
        identity: IdentityVerification::Verified,
        payment_method_verified: true,
    },
    SeedAccount {
        id: DemoDataset::OTHER_HOST_ID,
        role: AccountRole::Host,
        display_name: "Avery Stone",
        email: "avery@hosts.example",
        identity: IdentityVerification::Verified,
        payment_method_verified: true,
    },
    SeedAccount {
        id: DemoDataset::GUEST_ID,
        role: AccountRole::Guest,
        display_name: "Riley Park",
        email: "riley@guests.example",
        identity: IdentityVerification::Verified,
        payment_method_verified: true,
    },
    SeedAccount {
        id: DemoDataset::KYC_PENDING_GUEST_ID,
        role: AccountRole::Guest,
        display_name: "Jordan Reyes",
        email: "jordan@guests.example",
        identity: IdentityVerification::Pending,
        payment_method_verified: true,
    },
    SeedAccount {
        id: DemoDataset::NO_CARD_GUEST_ID,
        role: AccountRole::Guest,
        display_name: "Casey Quinn",
        email: "casey@guests.example",
        identity: IdentityVerification::Verified,
        payment_method_verified: false,
    },
    SeedAccount {
        id: DemoDataset::ADMIN_ID,
        role: AccountRole::Admin,
        display_name: "Platform Ops",
        email: "ops@staybook.example",
        identity: IdentityVerification::Verified,
        payment_method_verified: false,
    },
];

const SEED_PROPERTIES: &[SeedProperty] = &[
    SeedProperty {
        id: DemoDataset::LAKESIDE_PROPERTY_ID,
        owner_id: DemoDataset::HOST_ID,
        title: "Lakeside cabin",
        base_price_cents: 10_000,
        cleaning_fee_cents: 3_000,
        service_fee_cents: 1_000,
        tax_rate_bps: 625,
        weekend_multiplier_pct: 120,
        min_nights: 1,
        max_nights: 30,
        max_guests: 4,
    },
    SeedProperty {
        id: DemoDataset::CITY_PROPERTY_ID,
        owner_id: DemoDataset::OTHER_HOST_ID,
        title: "City loft",
        base_price_cents: 18_000,
        cleaning_fee_cents: 4_500,
        service_fee_cents: 2_000,
        tax_rate_bps: 1_200,
        weekend_multiplier_pct: 125,
        min_nights: 3,
        max_nights: 14,
        max_guests: 2,
    },
];

/// Deterministic accounts and listings for local runs and tests.
///
/// The lakeside cabin prices a Monday-Wednesday stay at exactly $255.00 and a
/// Friday-Sunday stay at $297.50.
pub struct DemoDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub accounts_seeded: usize,
    pub properties_seeded: usize,
}

impl DemoDataset {
    pub const HOST_ID: &'static str = "AC-HOST-1";
    pub const OTHER_HOST_ID: &'static str = "AC-HOST-2";
    pub const GUEST_ID: &'static str = "AC-GUEST-1";
    pub const KYC_PENDING_GUEST_ID: &'static str = "AC-GUEST-2";
    pub const NO_CARD_GUEST_ID: &'static str = "AC-GUEST-3";
    pub const ADMIN_ID: &'static str = "AC-ADMIN-1";
    pub const LAKESIDE_PROPERTY_ID: &'static str = "PR-LAKE-1";
    pub const CITY_PROPERTY_ID: &'static str = "PR-CITY-1";

    pub fn accounts() -> Vec<Account> {
        let now = Utc::now();
        SEED_ACCOUNTS
            .iter()
            .map(|seed| Account {
                id: AccountId(seed.id.to_owned()),
                role: seed.role,
                display_name: seed.display_name.to_owned(),
                email: seed.email.to_owned(),
                identity_verification: seed.identity,
                payment_method_verified: seed.payment_method_verified,
                created_at: now,
            })
            .collect()
    }

    pub fn properties() -> Vec<Property> {
        let now = Utc::now();
        SEED_PROPERTIES
            .iter()
            .map(|seed| Property {
                id: PropertyId(seed.id.to_owned()),
                owner_id: AccountId(seed.owner_id.to_owned()),
                title: seed.title.to_owned(),
                currency: "USD".to_owned(),
                base_price: Decimal::new(seed.base_price_cents, 2),
                cleaning_fee: Decimal::new(seed.cleaning_fee_cents, 2),
                service_fee: Decimal::new(seed.service_fee_cents, 2),
                tax_rate: Decimal::new(seed.tax_rate_bps, 4),
                weekend_multiplier: Decimal::new(seed.weekend_multiplier_pct, 2),
                min_nights: seed.min_nights,
                max_nights: seed.max_nights,
                max_guests: seed.max_guests,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    /// Upserts every seed row in one transaction; safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let accounts = Self::accounts();
        let properties = Self::properties();

        let mut tx = pool.begin().await?;
        for account in &accounts {
            save_account(&mut tx, account).await?;
        }
        for property in &properties {
            property.validate_pricing().map_err(|error| {
                RepositoryError::Decode(format!("seed property {} is invalid: {error}", property.id.0))
            })?;
            save_property(&mut tx, property).await?;
        }
        tx.commit().await?;

        Ok(SeedResult { accounts_seeded: accounts.len(), properties_seeded: properties.len() })
    }

    /// True when every seed account and property is present.
    pub async fn verify(pool: &DbPool) -> Result<bool, RepositoryError> {
        let account_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM accounts WHERE id IN {}",
            sql_array_from_ids(SEED_ACCOUNTS.iter().map(|seed| seed.id))
        ))
        .fetch_one(pool)
        .await?;
        let property_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM properties WHERE id IN {}",
            sql_array_from_ids(SEED_PROPERTIES.iter().map(|seed| seed.id))
        ))
        .fetch_one(pool)
        .await?;

        Ok(account_count == SEED_ACCOUNTS.len() as i64
            && property_count == SEED_PROPERTIES.len() as i64)
    }
}

fn sql_array_from_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let quoted = ids.map(|id| format!("'{}'", id.replace('\'', "''"))).collect::<Vec<_>>();
    format!("({})", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use staybook_core::dates::StayRange;
    use staybook_core::pricing::price_stay;

    use super::DemoDataset;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn lakeside_cabin_prices_match_reference_quotes() {
        let cabin = DemoDataset::properties()
            .into_iter()
            .find(|property| property.id.0 == DemoDataset::LAKESIDE_PROPERTY_ID)
            .expect("cabin");

        let weekday = StayRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 5).expect("date"),
            NaiveDate::from_ymd_opt(2026, 1, 7).expect("date"),
        )
        .expect("stay");
        assert_eq!(price_stay(&cabin, &weekday, 2).total, Decimal::new(25500, 2));

        let weekend = StayRange::parse("2026-01-09", "2026-01-11").expect("stay");
        assert_eq!(price_stay(&cabin, &weekend, 2).total, Decimal::new(29750, 2));
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoDataset::load(&pool).await.expect("first load");
        assert!(DemoDataset::verify(&pool).await.expect("verify"));

        let second = DemoDataset::load(&pool).await.expect("second load");
        assert_eq!(first, second);
        assert!(DemoDataset::verify(&pool).await.expect("re-verify"));
    }
}

use std::sync::Arc;

use staybook_core::config::{AppConfig, ConfigError, LoadOptions};
use staybook_core::gateway::{GatewayError, NoopPaymentGateway, PaymentGateway};
use staybook_db::{connect_with_config, migrations, BookingService, DbPool};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::ApiState;
use crate::gateway::HttpPaymentGateway;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: BookingService,
}

impl Application {
    pub fn api_state(&self) -> ApiState {
        ApiState::new(self.service.clone(), self.config.gateway.webhook_secret.clone())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("payment gateway setup failed: {0}")]
    Gateway(#[source] GatewayError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let gateway: Arc<dyn PaymentGateway> =
        match HttpPaymentGateway::from_config(&config.gateway).map_err(BootstrapError::Gateway)? {
            Some(gateway) => Arc::new(gateway),
            None => {
                warn!(
                    event_name = "system.bootstrap.gateway_noop",
                    correlation_id = "bootstrap",
                    "no payment gateway configured; checkout links and refunds stay local"
                );
                Arc::new(NoopPaymentGateway)
            }
        };
    if config.gateway.webhook_secret.is_none() {
        warn!(
            event_name = "system.bootstrap.webhook_disabled",
            correlation_id = "bootstrap",
            "gateway webhook secret is not set; signed callbacks will be refused"
        );
    }

    let service = BookingService::from_config(db_pool.clone(), gateway, &config.platform);
    Ok(Application { config, db_pool, service })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use staybook_core::config::{ConfigOverrides, LoadOptions};
    use staybook_core::dates::StayRange;
    use staybook_core::domain::property::PropertyId;
    use staybook_db::DemoDataset;

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_a_non_sqlite_database() {
        let result = bootstrap(overrides("postgres://localhost/staybook")).await;
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_serves_quotes() {
        let app = bootstrap(overrides("sqlite::memory:?cache=shared")).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('bookings', 'availability', 'payments', 'audit_event')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("table count");
        assert_eq!(table_count, 4);

        DemoDataset::load(&app.db_pool).await.expect("seed");
        let quote = app
            .service
            .quote_stay(
                &PropertyId(DemoDataset::LAKESIDE_PROPERTY_ID.to_owned()),
                &StayRange::parse("2026-01-05", "2026-01-07").expect("stay"),
                2,
            )
            .await
            .expect("quote");
        assert_eq!(quote.total, Decimal::new(25500, 2));
        assert_eq!(app.service.commission_rate(), Decimal::new(15, 2));

        app.db_pool.close().await;
    }
}

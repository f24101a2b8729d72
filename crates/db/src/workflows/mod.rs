//! Multi-step booking workflows.
//!
//! Each write workflow runs inside a single SQLite transaction: domain checks
//! first, then row writes guarded by status and version, then audit events
//! and notifications. Any error drops the transaction and nothing persists.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use staybook_core::audit::{AuditContext, InMemoryAuditSink};
use staybook_core::config::PlatformConfig;
use staybook_core::domain::account::{AccountId, Actor};
use staybook_core::domain::booking::{Booking, BookingId};
use staybook_core::domain::notification::{Notification, NotificationKind};
use staybook_core::domain::payment::Payment;
use staybook_core::domain::property::{Property, PropertyId};
use staybook_core::errors::ApplicationError;
use staybook_core::gateway::PaymentGateway;
use staybook_core::pricing::{PricingEngine, WeekendAwarePricingEngine};
use staybook_core::settlement::SettlementPolicy;
use tracing::debug;

use crate::repositories::{audit, booking, notification, property, RepositoryError};
use crate::DbPool;

mod availability;
mod bookings;
mod payments;

/// Who is calling and under which correlation id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Option<Actor>,
    pub correlation_id: String,
    origin: &'static str,
}

impl RequestContext {
    pub fn anonymous(correlation_id: impl Into<String>) -> Self {
        Self { actor: None, correlation_id: correlation_id.into(), origin: "anonymous" }
    }

    pub fn for_actor(actor: Actor, correlation_id: impl Into<String>) -> Self {
        Self { actor: Some(actor), correlation_id: correlation_id.into(), origin: "actor" }
    }

    /// Calls made by the payment gateway through a signed webhook.
    pub fn gateway(correlation_id: impl Into<String>) -> Self {
        Self { actor: None, correlation_id: correlation_id.into(), origin: "gateway" }
    }

    pub fn actor_label(&self) -> String {
        match &self.actor {
            Some(actor) => actor.audit_label(),
            None => self.origin.to_owned(),
        }
    }

    pub fn require_actor(&self) -> Result<&Actor, ApplicationError> {
        self.actor
            .as_ref()
            .ok_or_else(|| ApplicationError::Forbidden("caller identity is required".to_owned()))
    }

    fn audit(&self, booking_id: Option<&BookingId>) -> AuditContext {
        AuditContext::new(booking_id.cloned(), self.correlation_id.clone(), self.actor_label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub property_id: PropertyId,
    pub check_in: String,
    pub check_out: String,
    pub guests: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub guest_email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBooking {
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedPayment {
    pub booking: Booking,
    pub payment: Payment,
}

#[derive(Clone)]
pub struct BookingService {
    pool: DbPool,
    gateway: Arc<dyn PaymentGateway>,
    pricing: Arc<dyn PricingEngine>,
    policy: SettlementPolicy,
    commission_rate: Decimal,
    currency: String,
}

impl BookingService {
    pub fn new(pool: DbPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            pool,
            gateway,
            pricing: Arc::new(WeekendAwarePricingEngine),
            policy: SettlementPolicy::default(),
            commission_rate: Decimal::new(15, 2),
            currency: "USD".to_owned(),
        }
    }

    pub fn from_config(
        pool: DbPool,
        gateway: Arc<dyn PaymentGateway>,
        platform: &PlatformConfig,
    ) -> Self {
        Self {
            policy: platform.settlement_policy(),
            commission_rate: platform.commission_rate,
            currency: platform.currency.trim().to_owned(),
            ..Self::new(pool, gateway)
        }
    }

    pub fn with_pricing_engine(mut self, pricing: Arc<dyn PricingEngine>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    /// Settlement currency. Bookings are only taken for listings priced in it.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub async fn get_property(&self, property_id: &PropertyId) -> Result<Property, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        load_property(&mut conn, property_id).await
    }
}

async fn load_property(
    conn: &mut SqliteConnection,
    property_id: &PropertyId,
) -> Result<Property, ApplicationError> {
    property::find_property(conn, property_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("property", property_id.0.clone()))
}

async fn load_booking(
    conn: &mut SqliteConnection,
    booking_id: &BookingId,
) -> Result<Booking, ApplicationError> {
    booking::find_booking(conn, booking_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("booking", booking_id.0.clone()))
}

/// Persists the new state of `booking`, failing with `Conflict` if the stored
/// row is no longer at `expected`'s status and version.
async fn swap_booking_state(
    conn: &mut SqliteConnection,
    booking: &mut Booking,
    expected: &Booking,
) -> Result<(), ApplicationError> {
    booking.version = expected.version + 1;
    let swapped =
        booking::compare_and_swap_state(conn, booking, expected.status, expected.version).await?;
    if !swapped {
        return Err(ApplicationError::Conflict(format!(
            "booking {} was modified by another request; reload and retry",
            booking.id.0
        )));
    }
    Ok(())
}

async fn flush_audit(
    conn: &mut SqliteConnection,
    sink: &InMemoryAuditSink,
) -> Result<(), ApplicationError> {
    audit::insert_events(conn, &sink.drain()).await?;
    Ok(())
}

/// Queues a notice for `recipient`. Anonymous guests have no inbox, so the
/// notice is dropped for them.
async fn notify(
    conn: &mut SqliteConnection,
    recipient: Option<&AccountId>,
    kind: NotificationKind,
    title: &str,
    message: String,
    booking_id: &BookingId,
) -> Result<(), ApplicationError> {
    let Some(recipient) = recipient else {
        debug!(
            event_name = "notification.skipped",
            booking_id = %booking_id.0,
            kind = kind.as_str(),
            "no recipient account for notification"
        );
        return Ok(());
    };

    let notice =
        Notification::new(recipient.clone(), kind, title, message, Some(booking_id.clone()));
    notification::insert_notification(conn, &notice).await?;
    Ok(())
}

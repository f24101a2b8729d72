use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditContext, AuditSink};
use crate::dates::StayRange;
use crate::domain::account::AccountId;
use crate::domain::property::PropertyId;
use crate::errors::DomainError;
use crate::lifecycle::{BookingEvent, BookingLifecycle, LifecycleAction, TransitionOutcome};
use crate::pricing::StayQuote;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl BookingId {
    pub fn generate() -> Self {
        Self(format!("BK-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::validation(format!(
                "unknown booking status `{other}` (expected pending|confirmed|cancelled|completed)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingPaymentStatus {
    Pending,
    Paid,
    Refunded,
    PartiallyRefunded,
}

impl BookingPaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }
}

impl std::str::FromStr for BookingPaymentStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "refunded" => Ok(Self::Refunded),
            "partially_refunded" => Ok(Self::PartiallyRefunded),
            other => Err(DomainError::validation(format!("unknown payment status `{other}`"))),
        }
    }
}

/// Prices frozen at booking time. Later edits to the property never touch it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSnapshot {
    pub nights: u32,
    pub subtotal: Decimal,
    pub cleaning_fee: Decimal,
    pub service_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub commission: Decimal,
}

impl PricingSnapshot {
    pub fn from_quote(quote: &StayQuote, commission: Decimal) -> Self {
        Self {
            nights: quote.nights,
            subtotal: quote.subtotal,
            cleaning_fee: quote.cleaning_fee,
            service_fee: quote.service_fee,
            tax: quote.tax,
            total: quote.total,
            commission,
        }
    }

    /// `total == subtotal + cleaning + service + tax`, to the cent.
    pub fn verify(&self) -> Result<(), DomainError> {
        let expected = self.subtotal + self.cleaning_fee + self.service_fee + self.tax;
        if (expected - self.total).abs() > Decimal::new(1, 2) {
            return Err(DomainError::InvariantViolation(format!(
                "booking total {} does not equal its components ({expected})",
                self.total
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub property_id: PropertyId,
    pub guest_id: Option<AccountId>,
    pub guest_email: Option<String>,
    pub host_id: AccountId,
    #[serde(flatten)]
    pub stay: StayRange,
    pub guests: u32,
    pub special_requests: Option<String>,
    pub pricing: PricingSnapshot,
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    pub payment_reference: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Booking {
    /// Runs `event` through the lifecycle and stamps the booking. The caller
    /// owns the follow-up actions in the returned outcome (dates, notices).
    pub fn apply(
        &mut self,
        event: BookingEvent,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, DomainError> {
        let outcome = BookingLifecycle.apply(self.status, event)?;
        Ok(self.stamp(outcome, at))
    }

    pub fn apply_with_audit<S>(
        &mut self,
        event: BookingEvent,
        at: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, DomainError>
    where
        S: AuditSink,
    {
        let outcome = BookingLifecycle.apply_with_audit(self.status, event, sink, audit)?;
        Ok(self.stamp(outcome, at))
    }

    fn stamp(&mut self, outcome: TransitionOutcome, at: DateTime<Utc>) -> TransitionOutcome {
        self.status = outcome.to;
        for action in &outcome.actions {
            match action {
                LifecycleAction::RecordConfirmation => self.confirmed_at = Some(at),
                LifecycleAction::RecordCancellation => self.cancelled_at = Some(at),
                _ => {}
            }
        }
        self.updated_at = at;
        outcome
    }

    /// Dates of a booking are held in the ledger only while it is confirmed
    /// and the payment has not been reversed.
    pub fn holds_dates(&self) -> bool {
        self.status == BookingStatus::Confirmed
            && !matches!(
                self.payment_status,
                BookingPaymentStatus::Refunded | BookingPaymentStatus::PartiallyRefunded
            )
    }

    /// True for the guest or the host of this booking.
    pub fn is_party(&self, account_id: &AccountId) -> bool {
        &self.host_id == account_id || self.guest_id.as_ref() == Some(account_id)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{Booking, BookingId, BookingPaymentStatus, BookingStatus, PricingSnapshot};
    use crate::dates::StayRange;
    use crate::domain::account::AccountId;
    use crate::domain::property::PropertyId;

    /// Monday to Wednesday at the lakeside cabin: $255.00 all in.
    pub fn pending_booking() -> Booking {
        Booking {
            id: BookingId("BK-1".to_owned()),
            property_id: PropertyId("PR-LAKE-1".to_owned()),
            guest_id: Some(AccountId("AC-GUEST-1".to_owned())),
            guest_email: None,
            host_id: AccountId("AC-HOST-1".to_owned()),
            stay: StayRange::parse("2026-01-05", "2026-01-07").expect("stay"),
            guests: 2,
            special_requests: None,
            pricing: PricingSnapshot {
                nights: 2,
                subtotal: Decimal::new(200, 0),
                cleaning_fee: Decimal::new(30, 0),
                service_fee: Decimal::new(10, 0),
                tax: Decimal::new(1500, 2),
                total: Decimal::new(25500, 2),
                commission: Decimal::new(3825, 2),
            },
            status: BookingStatus::Pending,
            payment_status: BookingPaymentStatus::Pending,
            payment_reference: None,
            confirmed_at: None,
            cancelled_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::fixtures::pending_booking;
    use super::{BookingPaymentStatus, BookingStatus};
    use crate::errors::DomainError;
    use crate::lifecycle::{BookingEvent, LifecycleAction};

    #[test]
    fn payment_capture_confirms_and_stamps_confirmation() {
        let mut booking = pending_booking();
        let now = Utc::now();

        let outcome = booking.apply(BookingEvent::PaymentCaptured, now).expect("capture");

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.confirmed_at, Some(now));
        assert!(outcome.actions.contains(&LifecycleAction::BlockDates));
    }

    #[test]
    fn completed_bookings_cannot_be_confirmed_again() {
        let mut booking = pending_booking();
        booking.status = BookingStatus::Completed;

        let error = booking
            .apply(BookingEvent::HostApproved, Utc::now())
            .expect_err("completed -> confirmed should fail");
        assert!(matches!(error, DomainError::Lifecycle(_)));
        assert_eq!(booking.status, BookingStatus::Completed);
    }

    #[test]
    fn holds_dates_only_while_confirmed_and_unrefunded() {
        let mut booking = pending_booking();
        assert!(!booking.holds_dates());

        booking.status = BookingStatus::Confirmed;
        booking.payment_status = BookingPaymentStatus::Paid;
        assert!(booking.holds_dates());

        booking.payment_status = BookingPaymentStatus::PartiallyRefunded;
        assert!(!booking.holds_dates());
    }

    #[test]
    fn snapshot_verification_flags_inconsistent_totals() {
        let mut booking = pending_booking();
        assert!(booking.pricing.verify().is_ok());

        booking.pricing.total = Decimal::new(26000, 2);
        assert!(matches!(booking.pricing.verify(), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn booking_serializes_stay_as_calendar_dates() {
        let json = serde_json::to_value(pending_booking()).expect("serialize");

        assert_eq!(json["checkIn"], "2026-01-05");
        assert_eq!(json["checkOut"], "2026-01-07");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["paymentStatus"], "pending");
    }
}

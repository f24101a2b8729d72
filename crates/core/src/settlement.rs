//! Amount checks for finalizing and refunding a booking payment.
//!
//! Nothing here touches storage. The database workflows turn a plan into row
//! writes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::booking::{Booking, BookingId, BookingPaymentStatus};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementPolicy {
    pub amount_tolerance: Decimal,
    pub commission_min_ratio: Decimal,
    pub commission_max_ratio: Decimal,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            amount_tolerance: Decimal::new(1, 2),
            commission_min_ratio: Decimal::new(10, 2),
            commission_max_ratio: Decimal::new(20, 2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub booking_id: BookingId,
    pub external_payment_reference: String,
    pub amount: Decimal,
    pub commission: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizePlan {
    pub amount: Decimal,
    pub commission: Decimal,
    pub host_payout: Decimal,
    pub commission_ratio: Decimal,
    pub commission_in_range: bool,
}

pub fn plan_finalize(
    booking: &Booking,
    request: &FinalizeRequest,
    policy: &SettlementPolicy,
) -> Result<FinalizePlan, DomainError> {
    if request.external_payment_reference.trim().is_empty() {
        return Err(DomainError::validation("external payment reference is required"));
    }
    if request.amount <= Decimal::ZERO {
        return Err(DomainError::validation("payment amount must be positive"));
    }
    if request.commission < Decimal::ZERO {
        return Err(DomainError::validation("commission cannot be negative"));
    }

    booking.pricing.verify()?;

    let difference = (request.amount - booking.pricing.total).abs();
    if difference > policy.amount_tolerance {
        return Err(DomainError::validation(format!(
            "payment amount {} does not match booking total {}",
            request.amount, booking.pricing.total
        )));
    }

    let host_payout = request.amount - request.commission;
    if host_payout <= Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "commission {} leaves no payout for the host",
            request.commission
        )));
    }

    let commission_ratio = request.commission / request.amount;
    let commission_in_range = commission_ratio >= policy.commission_min_ratio
        && commission_ratio <= policy.commission_max_ratio;
    if !commission_in_range {
        warn!(
            event_name = "settlement.commission_out_of_range",
            booking_id = %booking.id.0,
            commission = %request.commission,
            amount = %request.amount,
            ratio = %commission_ratio.round_dp(4),
            "commission ratio outside the expected band"
        );
    }

    Ok(FinalizePlan {
        amount: request.amount,
        commission: request.commission,
        host_payout,
        commission_ratio,
        commission_in_range,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub booking_id: BookingId,
    pub reason: String,
    pub amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundPlan {
    pub refund_amount: Decimal,
    pub full: bool,
    pub payment_status: PaymentStatus,
    pub booking_payment_status: BookingPaymentStatus,
}

/// A partial amount equal to the full charge is a full refund.
pub fn plan_refund(payment: &Payment, request: &RefundRequest) -> Result<RefundPlan, DomainError> {
    if request.reason.trim().is_empty() {
        return Err(DomainError::validation("a refund reason is required"));
    }

    let refund_amount = match request.amount {
        None => payment.amount,
        Some(partial) if partial <= Decimal::ZERO => {
            return Err(DomainError::validation("refund amount must be greater than zero"));
        }
        Some(partial) if partial > payment.amount => {
            return Err(DomainError::validation(format!(
                "refund amount {partial} exceeds the amount paid ({})",
                payment.amount
            )));
        }
        Some(partial) => partial,
    };

    let full = refund_amount == payment.amount;
    let (payment_status, booking_payment_status) = if full {
        (PaymentStatus::Refunded, BookingPaymentStatus::Refunded)
    } else {
        (PaymentStatus::PartiallyRefunded, BookingPaymentStatus::PartiallyRefunded)
    };

    Ok(RefundPlan { refund_amount, full, payment_status, booking_payment_status })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{plan_finalize, plan_refund, FinalizeRequest, RefundRequest, SettlementPolicy};
    use crate::domain::account::AccountId;
    use crate::domain::booking::fixtures::pending_booking;
    use crate::domain::booking::{BookingId, BookingPaymentStatus};
    use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
    use crate::errors::DomainError;

    fn finalize_request(amount: Decimal, commission: Decimal) -> FinalizeRequest {
        FinalizeRequest {
            booking_id: BookingId("BK-1".to_owned()),
            external_payment_reference: "pi_3Nabc".to_owned(),
            amount,
            commission,
        }
    }

    fn succeeded_payment() -> Payment {
        Payment {
            id: PaymentId("PM-1".to_owned()),
            booking_id: BookingId("BK-1".to_owned()),
            guest_id: Some(AccountId("AC-GUEST-1".to_owned())),
            host_id: AccountId("AC-HOST-1".to_owned()),
            external_reference: "pi_3Nabc".to_owned(),
            amount: Decimal::new(25500, 2),
            host_payout: Decimal::new(21675, 2),
            commission: Decimal::new(3825, 2),
            tax: Decimal::new(1500, 2),
            currency: "USD".to_owned(),
            status: PaymentStatus::Succeeded,
            refunded_amount: None,
            refund_reason: None,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn refund(amount: Option<Decimal>) -> RefundRequest {
        RefundRequest {
            booking_id: BookingId("BK-1".to_owned()),
            reason: "host cancelled".to_owned(),
            amount,
        }
    }

    #[test]
    fn amount_within_one_cent_is_accepted() {
        let plan = plan_finalize(
            &pending_booking(),
            &finalize_request(Decimal::new(25501, 2), Decimal::new(3825, 2)),
            &SettlementPolicy::default(),
        )
        .expect("255.01 is within tolerance");

        assert_eq!(plan.host_payout, Decimal::new(21676, 2));
        assert!(plan.commission_in_range);
    }

    #[test]
    fn amount_beyond_one_cent_is_rejected() {
        let error = plan_finalize(
            &pending_booking(),
            &finalize_request(Decimal::new(25502, 2), Decimal::new(3825, 2)),
            &SettlementPolicy::default(),
        )
        .expect_err("255.02 is outside tolerance");

        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("does not match")));
    }

    #[test]
    fn commission_outside_band_is_allowed_but_flagged() {
        let plan = plan_finalize(
            &pending_booking(),
            &finalize_request(Decimal::new(25500, 2), Decimal::new(7650, 2)),
            &SettlementPolicy::default(),
        )
        .expect("30% commission only warns");

        assert!(!plan.commission_in_range);
        assert_eq!(plan.commission_ratio, Decimal::new(30, 2));
    }

    #[test]
    fn commission_consuming_the_whole_amount_is_rejected() {
        let result = plan_finalize(
            &pending_booking(),
            &finalize_request(Decimal::new(25500, 2), Decimal::new(25500, 2)),
            &SettlementPolicy::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_reference_is_rejected() {
        let mut request = finalize_request(Decimal::new(25500, 2), Decimal::new(3825, 2));
        request.external_payment_reference = "  ".to_owned();

        assert!(plan_finalize(&pending_booking(), &request, &SettlementPolicy::default()).is_err());
    }

    #[test]
    fn full_refund_when_no_amount_given() {
        let plan = plan_refund(&succeeded_payment(), &refund(None)).expect("full refund");

        assert!(plan.full);
        assert_eq!(plan.refund_amount, Decimal::new(25500, 2));
        assert_eq!(plan.payment_status, PaymentStatus::Refunded);
        assert_eq!(plan.booking_payment_status, BookingPaymentStatus::Refunded);
    }

    #[test]
    fn partial_refund_within_bounds() {
        let plan =
            plan_refund(&succeeded_payment(), &refund(Some(Decimal::new(100, 0)))).expect("partial");

        assert!(!plan.full);
        assert_eq!(plan.payment_status, PaymentStatus::PartiallyRefunded);
    }

    #[test]
    fn partial_refund_rejects_zero_and_excess() {
        assert!(plan_refund(&succeeded_payment(), &refund(Some(Decimal::ZERO))).is_err());
        assert!(plan_refund(&succeeded_payment(), &refund(Some(Decimal::new(400, 0)))).is_err());
    }

    #[test]
    fn refund_requires_reason() {
        let mut request = refund(None);
        request.reason = String::new();
        assert!(plan_refund(&succeeded_payment(), &request).is_err());
    }
}

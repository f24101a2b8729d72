use chrono::Utc;
use serde_json::json;
use staybook_core::audit::{AuditCategory, AuditOutcome, AuditSink, InMemoryAuditSink};
use staybook_core::domain::booking::{BookingPaymentStatus, BookingStatus};
use staybook_core::domain::notification::NotificationKind;
use staybook_core::domain::payment::{Payment, PaymentId, PaymentStatus};
use staybook_core::errors::ApplicationError;
use staybook_core::lifecycle::{BookingEvent, LifecycleAction};
use staybook_core::settlement::{
    plan_finalize, plan_refund, FinalizeRequest, RefundPlan, RefundRequest,
};
use tracing::{error, info};

use super::{
    flush_audit, load_booking, load_property, notify, swap_booking_state, BookingService,
    FinalizedPayment, RequestContext,
};
use super::availability::release_stay;
use crate::repositories::{availability, payment, RepositoryError};

impl BookingService {
    /// Records a captured payment against a pending booking and confirms it.
    ///
    /// The payment row, the booking's move to `confirmed`/`paid`, the blocked
    /// nights, the audit entry and the host notice commit together or not at
    /// all.
    pub async fn finalize_payment(
        &self,
        ctx: &RequestContext,
        request: FinalizeRequest,
    ) -> Result<FinalizedPayment, ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let expected = load_booking(&mut tx, &request.booking_id).await?;
        if expected.payment_status != BookingPaymentStatus::Pending {
            return Err(ApplicationError::Conflict(format!(
                "booking {} is already {}",
                expected.id.0,
                expected.payment_status.as_str()
            )));
        }
        if expected.status != BookingStatus::Pending {
            return Err(ApplicationError::Conflict(format!(
                "booking {} is {} and cannot take a payment",
                expected.id.0,
                expected.status.as_str()
            )));
        }
        if payment::find_payment_for_booking(&mut tx, &expected.id).await?.is_some() {
            return Err(ApplicationError::Conflict(format!(
                "a payment is already recorded for booking {}",
                expected.id.0
            )));
        }

        let plan = plan_finalize(&expected, &request, &self.policy)?;
        let property = load_property(&mut tx, &expected.property_id).await?;

        let sink = InMemoryAuditSink::default();
        let audit = ctx.audit(Some(&expected.id));
        let now = Utc::now();

        let mut record = expected.clone();
        let outcome = record.apply_with_audit(BookingEvent::PaymentCaptured, now, &sink, &audit)?;
        record.payment_status = BookingPaymentStatus::Paid;
        record.payment_reference = Some(request.external_payment_reference.trim().to_owned());
        swap_booking_state(&mut tx, &mut record, &expected).await?;

        let receipt = Payment {
            id: PaymentId::generate(),
            booking_id: record.id.clone(),
            guest_id: record.guest_id.clone(),
            host_id: record.host_id.clone(),
            external_reference: request.external_payment_reference.trim().to_owned(),
            amount: plan.amount,
            host_payout: plan.host_payout,
            commission: plan.commission,
            tax: record.pricing.tax,
            currency: property.currency.clone(),
            status: PaymentStatus::Succeeded,
            refunded_amount: None,
            refund_reason: None,
            metadata: json!({
                "propertyId": record.property_id.0,
                "checkIn": record.stay.check_in().to_string(),
                "checkOut": record.stay.check_out().to_string(),
                "nights": record.pricing.nights,
                "bookingTotal": record.pricing.total.to_string(),
                "commissionRatio": plan.commission_ratio.round_dp(4).to_string(),
                "commissionInRange": plan.commission_in_range,
            }),
            created_at: now,
            updated_at: now,
        };
        payment::insert_payment(&mut tx, &receipt).await?;

        if outcome.requires(LifecycleAction::BlockDates) {
            availability::set_stay_availability(
                &mut tx,
                &record.property_id,
                &record.stay,
                false,
                now,
            )
            .await?;
        }

        sink.emit(
            audit
                .event("payment.finalized", AuditCategory::Payment, AuditOutcome::Success)
                .with_metadata("payment_id", receipt.id.0.clone())
                .with_metadata("external_reference", receipt.external_reference.clone())
                .with_metadata("amount", request.amount.to_string())
                .with_metadata("commission", request.commission.to_string())
                .with_metadata("host_payout", plan.host_payout.to_string())
                .with_metadata("booking_total", record.pricing.total.to_string()),
        );
        flush_audit(&mut tx, &sink).await?;

        if outcome.requires(LifecycleAction::NotifyHost) {
            notify(
                &mut tx,
                Some(&record.host_id),
                NotificationKind::PaymentReceived,
                "Funds received",
                format!(
                    "Payment of {} {} received for {} ({} to {}); your payout is {} {}",
                    receipt.amount,
                    receipt.currency,
                    property.title,
                    record.stay.check_in(),
                    record.stay.check_out(),
                    receipt.host_payout,
                    receipt.currency
                ),
                &record.id,
            )
            .await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            event_name = "payment.finalized",
            correlation_id = %ctx.correlation_id,
            booking_id = %record.id.0,
            payment_id = %receipt.id.0,
            amount = %receipt.amount,
            host_payout = %receipt.host_payout,
            "payment finalized"
        );

        Ok(FinalizedPayment { booking: record, payment: receipt })
    }

    /// Refunds all or part of a booking's payment and cancels the booking.
    ///
    /// The gateway is asked to move the money first; if it refuses, nothing is
    /// written. A booking the host already cancelled keeps its status and only
    /// the payment side changes.
    pub async fn refund_payment(
        &self,
        ctx: &RequestContext,
        request: RefundRequest,
    ) -> Result<Payment, ApplicationError> {
        let actor = ctx.require_actor()?;

        let (current, plan) = {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let record = load_booking(&mut conn, &request.booking_id).await?;
            let property = load_property(&mut conn, &record.property_id).await?;
            if !actor.manages(&property.owner_id) {
                return Err(ApplicationError::Forbidden(format!(
                    "{} does not manage property {}",
                    actor.audit_label(),
                    property.id.0
                )));
            }

            let current = payment::find_payment_for_booking(&mut conn, &record.id)
                .await?
                .ok_or_else(|| ApplicationError::not_found("payment", record.id.0.clone()))?;
            if current.status != PaymentStatus::Succeeded {
                return Err(ApplicationError::Conflict(format!(
                    "payment {} is already {}",
                    current.id.0,
                    current.status.as_str()
                )));
            }
            let plan = plan_refund(&current, &request)?;
            (current, plan)
        };

        let refund = self
            .gateway
            .refund(&current, plan.refund_amount, request.reason.trim())
            .await
            .map_err(|error| ApplicationError::Integration(error.to_string()))?;

        let result = self.record_refund(ctx, &request, current, plan, refund.reference).await;
        if let Err(failure) = &result {
            error!(
                event_name = "refund.persist_failed",
                correlation_id = %ctx.correlation_id,
                booking_id = %request.booking_id.0,
                error = %failure,
                "gateway refund succeeded but could not be recorded"
            );
        }
        result
    }

    async fn record_refund(
        &self,
        ctx: &RequestContext,
        request: &RefundRequest,
        current: Payment,
        plan: RefundPlan,
        gateway_reference: String,
    ) -> Result<Payment, ApplicationError> {
        let reason = request.reason.trim().to_owned();
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let expected = load_booking(&mut tx, &request.booking_id).await?;

        let sink = InMemoryAuditSink::default();
        let audit = ctx.audit(Some(&expected.id));
        let now = Utc::now();

        let mut record = expected.clone();
        let outcome = if expected.status == BookingStatus::Cancelled {
            None
        } else {
            Some(record.apply_with_audit(BookingEvent::RefundIssued, now, &sink, &audit)?)
        };
        record.payment_status = plan.booking_payment_status;
        record.updated_at = now;
        swap_booking_state(&mut tx, &mut record, &expected).await?;

        let mut refunded = current.clone();
        refunded.status = plan.payment_status;
        refunded.refunded_amount = Some(plan.refund_amount);
        refunded.refund_reason = Some(reason.clone());
        refunded.updated_at = now;
        if let Some(metadata) = refunded.metadata.as_object_mut() {
            metadata.insert("refundReference".to_owned(), json!(gateway_reference));
            metadata.insert("refundedAt".to_owned(), json!(now.to_rfc3339()));
        }
        if !payment::record_refund(&mut tx, &refunded, current.status).await? {
            return Err(ApplicationError::Conflict(format!(
                "payment {} was refunded by another request",
                current.id.0
            )));
        }

        let releases = outcome
            .as_ref()
            .map(|outcome| outcome.requires(LifecycleAction::ReleaseDates))
            .unwrap_or(false);
        if releases {
            release_stay(&mut tx, &record, now).await?;
        }

        sink.emit(
            audit
                .event("payment.refunded", AuditCategory::Refund, AuditOutcome::Success)
                .with_metadata("payment_id", refunded.id.0.clone())
                .with_metadata("refund_amount", plan.refund_amount.to_string())
                .with_metadata("full_refund", plan.full.to_string())
                .with_metadata("reason", reason.clone())
                .with_metadata("gateway_reference", gateway_reference),
        );
        flush_audit(&mut tx, &sink).await?;

        notify(
            &mut tx,
            record.guest_id.as_ref(),
            NotificationKind::RefundIssued,
            "Refund issued",
            format!(
                "A refund of {} {} was issued for your stay ({} to {}). Reason: {}",
                plan.refund_amount,
                refunded.currency,
                record.stay.check_in(),
                record.stay.check_out(),
                reason
            ),
            &record.id,
        )
        .await?;
        notify(
            &mut tx,
            Some(&record.host_id),
            NotificationKind::BookingCancelled,
            "Booking cancelled",
            format!(
                "Booking {} ({} to {}) was cancelled and refunded. Reason: {}",
                record.id.0,
                record.stay.check_in(),
                record.stay.check_out(),
                reason
            ),
            &record.id,
        )
        .await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            event_name = "payment.refunded",
            correlation_id = %ctx.correlation_id,
            booking_id = %record.id.0,
            payment_id = %refunded.id.0,
            refund_amount = %plan.refund_amount,
            full_refund = plan.full,
            "payment refunded"
        );

        Ok(refunded)
    }
}

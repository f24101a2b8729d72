use chrono::Utc;
use staybook_core::audit::{AuditCategory, AuditOutcome, AuditSink, InMemoryAuditSink};
use staybook_core::dates::StayRange;
use staybook_core::domain::availability::describe_conflicts;
use staybook_core::domain::booking::{
    Booking, BookingId, BookingPaymentStatus, BookingStatus, PricingSnapshot,
};
use staybook_core::domain::notification::NotificationKind;
use staybook_core::domain::property::PropertyId;
use staybook_core::errors::{ApplicationError, DomainError};
use staybook_core::lifecycle::{BookingEvent, BookingLifecycle, LifecycleAction};
use staybook_core::pricing::{commission_for, StayQuote};
use tracing::{info, warn};

use super::{
    flush_audit, load_booking, load_property, notify, swap_booking_state, BookingService,
    CreatedBooking, NewBooking, RequestContext,
};
use super::availability::release_stay;
use crate::repositories::{account, availability, booking, RepositoryError};

impl BookingService {
    /// Prices a prospective stay without reserving anything.
    pub async fn quote_stay(
        &self,
        property_id: &PropertyId,
        stay: &StayRange,
        guests: u32,
    ) -> Result<StayQuote, ApplicationError> {
        let property = self.get_property(property_id).await?;
        Ok(self.pricing.quote(&property, stay, guests)?)
    }

    pub async fn create_booking(
        &self,
        ctx: &RequestContext,
        request: NewBooking,
    ) -> Result<CreatedBooking, ApplicationError> {
        let stay = StayRange::parse(&request.check_in, &request.check_out)?;
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let property = load_property(&mut tx, &request.property_id).await?;

        let (guest_id, guest_email) = match &ctx.actor {
            Some(actor) => {
                let account = account::find_account(&mut tx, &actor.account_id)
                    .await?
                    .ok_or_else(|| ApplicationError::not_found("account", actor.account_id.0.clone()))?;
                account.checkout_gate()?;
                let email = request.guest_email.clone().unwrap_or_else(|| account.email.clone());
                (Some(account.id), Some(email))
            }
            None => {
                let email = request
                    .guest_email
                    .as_deref()
                    .map(str::trim)
                    .filter(|email| email.contains('@'))
                    .ok_or_else(|| {
                        DomainError::validation("a guest email is required to book without an account")
                    })?;
                (None, Some(email.to_owned()))
            }
        };

        let quote = self.pricing.quote(&property, &stay, request.guests)?;
        if !quote.currency.eq_ignore_ascii_case(&self.currency) {
            return Err(DomainError::validation(format!(
                "property {} is priced in {} but payments settle in {}",
                property.id.0, quote.currency, self.currency
            ))
            .into());
        }

        let conflicts = self.conflicts_within(&mut tx, &property.id, &stay).await?;
        if !conflicts.is_empty() {
            return Err(ApplicationError::Conflict(format!(
                "property {} is not available for {} to {}: {}",
                property.id.0,
                stay.check_in(),
                stay.check_out(),
                describe_conflicts(&conflicts)
            )));
        }

        let now = Utc::now();
        let commission = commission_for(quote.total, self.commission_rate);
        let record = Booking {
            id: BookingId::generate(),
            property_id: property.id.clone(),
            guest_id,
            guest_email,
            host_id: property.owner_id.clone(),
            stay,
            guests: request.guests,
            special_requests: request
                .special_requests
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
            pricing: PricingSnapshot::from_quote(&quote, commission),
            status: BookingLifecycle.initial_state(),
            payment_status: BookingPaymentStatus::Pending,
            payment_reference: None,
            confirmed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        record.pricing.verify()?;
        booking::insert_booking(&mut tx, &record).await?;

        let sink = InMemoryAuditSink::default();
        sink.emit(
            ctx.audit(Some(&record.id))
                .event("booking.created", AuditCategory::Booking, AuditOutcome::Success)
                .with_metadata("property_id", record.property_id.0.clone())
                .with_metadata("check_in", record.stay.check_in().to_string())
                .with_metadata("check_out", record.stay.check_out().to_string())
                .with_metadata("nights", record.pricing.nights.to_string())
                .with_metadata("total", record.pricing.total.to_string())
                .with_metadata("commission", record.pricing.commission.to_string()),
        );
        flush_audit(&mut tx, &sink).await?;

        notify(
            &mut tx,
            Some(&record.host_id),
            NotificationKind::BookingRequested,
            "New booking request",
            format!(
                "{} requested {} ({} to {}, {} guests) for {} {}",
                record.guest_email.as_deref().unwrap_or("A guest"),
                property.title,
                record.stay.check_in(),
                record.stay.check_out(),
                record.guests,
                record.pricing.total,
                property.currency
            ),
            &record.id,
        )
        .await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            event_name = "booking.created",
            correlation_id = %ctx.correlation_id,
            booking_id = %record.id.0,
            property_id = %record.property_id.0,
            total = %record.pricing.total,
            "booking created"
        );

        let checkout_url = match self.gateway.create_checkout(&record).await {
            Ok(session) => session.map(|session| session.url),
            Err(error) => {
                warn!(
                    event_name = "booking.checkout_unavailable",
                    correlation_id = %ctx.correlation_id,
                    booking_id = %record.id.0,
                    error = %error,
                    "checkout session could not be opened; booking stays pending"
                );
                None
            }
        };

        Ok(CreatedBooking { booking: record, checkout_url })
    }

    pub async fn get_booking(
        &self,
        ctx: &RequestContext,
        booking_id: &BookingId,
    ) -> Result<Booking, ApplicationError> {
        let actor = ctx.require_actor()?;
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let record = load_booking(&mut conn, booking_id).await?;

        if !actor.can_view(&record) {
            return Err(ApplicationError::Forbidden(format!(
                "{} may not view booking {}",
                actor.audit_label(),
                booking_id.0
            )));
        }
        Ok(record)
    }

    /// Host-driven status change. `confirmed` blocks the stay's dates,
    /// `cancelled` releases them, `completed` closes a confirmed stay.
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        booking_id: &BookingId,
        target: BookingStatus,
    ) -> Result<Booking, ApplicationError> {
        let actor = ctx.require_actor()?;
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let expected = load_booking(&mut tx, booking_id).await?;
        let property = load_property(&mut tx, &expected.property_id).await?;
        if !actor.manages(&property.owner_id) {
            return Err(ApplicationError::Forbidden(format!(
                "{} does not manage property {}",
                actor.audit_label(),
                property.id.0
            )));
        }

        let event = match target {
            BookingStatus::Confirmed => BookingEvent::HostApproved,
            BookingStatus::Cancelled if expected.status == BookingStatus::Pending => {
                BookingEvent::HostDeclined
            }
            BookingStatus::Cancelled => BookingEvent::CancelRequested,
            BookingStatus::Completed => BookingEvent::StayCompleted,
            BookingStatus::Pending => {
                return Err(DomainError::validation("a booking cannot be moved back to pending").into())
            }
        };

        let sink = InMemoryAuditSink::default();
        let audit = ctx.audit(Some(booking_id));
        let mut record = expected.clone();
        let outcome = record.apply_with_audit(event, Utc::now(), &sink, &audit)?;

        if outcome.requires(LifecycleAction::BlockDates) {
            let conflicts = self.conflicts_within(&mut tx, &record.property_id, &record.stay).await?;
            if !conflicts.is_empty() {
                return Err(ApplicationError::Conflict(format!(
                    "cannot confirm booking {}: {}",
                    record.id.0,
                    describe_conflicts(&conflicts)
                )));
            }
        }

        swap_booking_state(&mut tx, &mut record, &expected).await?;

        if outcome.requires(LifecycleAction::BlockDates) {
            availability::set_stay_availability(
                &mut tx,
                &record.property_id,
                &record.stay,
                false,
                record.updated_at,
            )
            .await?;
        }
        if outcome.requires(LifecycleAction::ReleaseDates) {
            release_stay(&mut tx, &record, record.updated_at).await?;
        }

        flush_audit(&mut tx, &sink).await?;

        let message = format!(
            "Your booking at {} ({} to {}) is now {}",
            property.title,
            record.stay.check_in(),
            record.stay.check_out(),
            record.status.as_str()
        );
        if outcome.requires(LifecycleAction::NotifyGuest) {
            notify(
                &mut tx,
                record.guest_id.as_ref(),
                status_notice_kind(record.status),
                "Booking update",
                message.clone(),
                &record.id,
            )
            .await?;
        }
        if outcome.requires(LifecycleAction::NotifyHost) {
            notify(
                &mut tx,
                Some(&record.host_id),
                status_notice_kind(record.status),
                "Booking update",
                message,
                &record.id,
            )
            .await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            event_name = "booking.status_changed",
            correlation_id = %ctx.correlation_id,
            booking_id = %record.id.0,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            "booking status changed"
        );

        Ok(record)
    }
}

fn status_notice_kind(status: BookingStatus) -> NotificationKind {
    match status {
        BookingStatus::Cancelled => NotificationKind::BookingCancelled,
        _ => NotificationKind::BookingStatusChanged,
    }
}

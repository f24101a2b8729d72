use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use staybook_core::audit::{AuditCategory, AuditOutcome, AuditSink, InMemoryAuditSink};
use staybook_core::dates::{format_calendar_date, StayRange};
use staybook_core::domain::availability::{AvailabilityConflict, AvailabilityEntry};
use staybook_core::domain::booking::Booking;
use staybook_core::domain::property::PropertyId;
use staybook_core::errors::{ApplicationError, DomainError};
use tracing::info;

use super::{flush_audit, load_property, BookingService, RequestContext};
use crate::repositories::{availability, booking, RepositoryError};

impl BookingService {
    /// Why `stay` cannot be booked at `property_id`. Empty means available.
    /// Only confirmed bookings and host blocks count; pending requests never
    /// hold dates.
    pub async fn check_availability(
        &self,
        property_id: &PropertyId,
        stay: &StayRange,
    ) -> Result<Vec<AvailabilityConflict>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        load_property(&mut conn, property_id).await?;
        self.conflicts_within(&mut conn, property_id, stay).await
    }

    pub(super) async fn conflicts_within(
        &self,
        conn: &mut SqliteConnection,
        property_id: &PropertyId,
        stay: &StayRange,
    ) -> Result<Vec<AvailabilityConflict>, ApplicationError> {
        let mut conflicts: Vec<AvailabilityConflict> =
            booking::confirmed_overlapping(conn, property_id, stay)
                .await?
                .into_iter()
                .map(|other| AvailabilityConflict::ConfirmedBooking {
                    booking_id: other.id,
                    stay: other.stay,
                })
                .collect();

        let booked_nights: Vec<NaiveDate> = conflicts
            .iter()
            .filter_map(|conflict| match conflict {
                AvailabilityConflict::ConfirmedBooking { stay: other, .. } => Some(*other),
                AvailabilityConflict::BlockedDate { .. } => None,
            })
            .flat_map(|other| other.dates().collect::<Vec<_>>())
            .collect();

        // Nights already explained by a confirmed booking are not repeated as host blocks.
        conflicts.extend(
            availability::blocked_dates(conn, property_id, stay)
                .await?
                .into_iter()
                .filter(|date| !booked_nights.contains(date))
                .map(|date| AvailabilityConflict::BlockedDate { date }),
        );

        Ok(conflicts)
    }

    /// Ledger entries for `start <= date < end`.
    pub async fn availability_for_property(
        &self,
        property_id: &PropertyId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AvailabilityEntry>, ApplicationError> {
        if end <= start {
            return Err(DomainError::validation("availability range end must be after its start").into());
        }
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        load_property(&mut conn, property_id).await?;
        Ok(availability::entries_in_range(&mut conn, property_id, start, end).await?)
    }

    /// Host edit of a single ledger night. Opening a night that a confirmed
    /// booking holds is refused.
    pub async fn set_availability(
        &self,
        ctx: &RequestContext,
        property_id: &PropertyId,
        date: NaiveDate,
        is_available: bool,
        price: Option<Decimal>,
    ) -> Result<AvailabilityEntry, ApplicationError> {
        let actor = ctx.require_actor()?;
        if price.is_some_and(|price| price <= Decimal::ZERO) {
            return Err(DomainError::validation("price override must be positive").into());
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let property = load_property(&mut tx, property_id).await?;
        if !actor.manages(&property.owner_id) {
            return Err(ApplicationError::Forbidden(format!(
                "{} does not manage property {}",
                actor.audit_label(),
                property.id.0
            )));
        }

        if is_available {
            let night = date
                .succ_opt()
                .and_then(|next| StayRange::new(date, next).ok())
                .ok_or_else(|| DomainError::validation("date is out of range"))?;
            if let Some(holder) =
                booking::confirmed_overlapping(&mut tx, property_id, &night).await?.first()
            {
                return Err(ApplicationError::Conflict(format!(
                    "{} is held by confirmed booking {}",
                    format_calendar_date(date),
                    holder.id.0
                )));
            }
        }

        let entry = AvailabilityEntry {
            property_id: property_id.clone(),
            date,
            is_available,
            price,
            updated_at: Utc::now(),
        };
        availability::upsert_entry(&mut tx, &entry).await?;

        let sink = InMemoryAuditSink::default();
        let mut event = ctx
            .audit(None)
            .event("availability.updated", AuditCategory::Availability, AuditOutcome::Success)
            .with_metadata("property_id", property_id.0.clone())
            .with_metadata("date", format_calendar_date(date))
            .with_metadata("is_available", is_available.to_string());
        if let Some(price) = price {
            event = event.with_metadata("price", price.to_string());
        }
        sink.emit(event);
        flush_audit(&mut tx, &sink).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            event_name = "availability.updated",
            correlation_id = %ctx.correlation_id,
            property_id = %property_id.0,
            date = %format_calendar_date(date),
            is_available,
            "availability updated"
        );

        Ok(entry)
    }
}

/// Reopens the nights of a booking that no longer holds them. Nights another
/// confirmed booking still covers stay blocked.
pub(super) async fn release_stay(
    conn: &mut SqliteConnection,
    released: &Booking,
    at: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let still_held: Vec<NaiveDate> =
        booking::confirmed_overlapping(conn, &released.property_id, &released.stay)
            .await?
            .into_iter()
            .filter(|other| other.id != released.id)
            .flat_map(|other| other.stay.dates().collect::<Vec<_>>())
            .collect();
    let nights: Vec<NaiveDate> =
        released.stay.dates().filter(|night| !still_held.contains(night)).collect();

    availability::set_dates_availability(conn, &released.property_id, &nights, true, at).await
}

use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::booking::BookingStatus;
use crate::lifecycle::states::{BookingEvent, LifecycleAction, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("booking in status {state:?} cannot accept {event:?}")]
    InvalidTransition { state: BookingStatus, event: BookingEvent },
}

/// `pending -> confirmed -> completed`, with cancellation reachable from
/// `pending` and `confirmed` (and refunds from `completed`).
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingLifecycle;

impl BookingLifecycle {
    pub fn initial_state(&self) -> BookingStatus {
        BookingStatus::Pending
    }

    pub fn apply(
        &self,
        current: BookingStatus,
        event: BookingEvent,
    ) -> Result<TransitionOutcome, LifecycleError> {
        use BookingEvent::{
            CancelRequested, HostApproved, HostDeclined, PaymentCaptured, RefundIssued,
            StayCompleted,
        };
        use BookingStatus::{Cancelled, Completed, Confirmed, Pending};
        use LifecycleAction::{
            BlockDates, NotifyGuest, NotifyHost, RecordCancellation, RecordConfirmation,
            ReleaseDates,
        };

        let (to, actions) = match (current, event) {
            (Pending, HostApproved) => {
                (Confirmed, vec![RecordConfirmation, BlockDates, NotifyGuest])
            }
            (Pending, PaymentCaptured) => {
                (Confirmed, vec![RecordConfirmation, BlockDates, NotifyHost])
            }
            (Pending, HostDeclined) | (Pending, CancelRequested) => {
                (Cancelled, vec![RecordCancellation, NotifyGuest])
            }
            (Confirmed, CancelRequested) => {
                (Cancelled, vec![RecordCancellation, ReleaseDates, NotifyGuest])
            }
            (Confirmed, RefundIssued) | (Completed, RefundIssued) => {
                (Cancelled, vec![RecordCancellation, ReleaseDates, NotifyGuest, NotifyHost])
            }
            (Confirmed, StayCompleted) => (Completed, vec![NotifyGuest]),
            (state, event) => return Err(LifecycleError::InvalidTransition { state, event }),
        };

        Ok(TransitionOutcome { from: current, to, event, actions })
    }

    pub fn apply_with_audit<S>(
        &self,
        current: BookingStatus,
        event: BookingEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, LifecycleError>
    where
        S: AuditSink,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => sink.emit(
                AuditEvent::new(
                    audit.booking_id.clone(),
                    audit.correlation_id.clone(),
                    "booking.transition_applied",
                    AuditCategory::Booking,
                    audit.actor.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("from", outcome.from.as_str())
                .with_metadata("to", outcome.to.as_str())
                .with_metadata("event", format!("{:?}", outcome.event)),
            ),
            Err(error) => sink.emit(
                AuditEvent::new(
                    audit.booking_id.clone(),
                    audit.correlation_id.clone(),
                    "booking.transition_rejected",
                    AuditCategory::Booking,
                    audit.actor.clone(),
                    AuditOutcome::Rejected,
                )
                .with_metadata("error", error.to_string()),
            ),
        }
        result
    }
}

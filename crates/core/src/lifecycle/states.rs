use serde::{Deserialize, Serialize};

use crate::domain::booking::BookingStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    HostApproved,
    PaymentCaptured,
    HostDeclined,
    CancelRequested,
    RefundIssued,
    StayCompleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleAction {
    RecordConfirmation,
    RecordCancellation,
    BlockDates,
    ReleaseDates,
    NotifyGuest,
    NotifyHost,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub event: BookingEvent,
    pub actions: Vec<LifecycleAction>,
}

impl TransitionOutcome {
    pub fn requires(&self, action: LifecycleAction) -> bool {
        self.actions.contains(&action)
    }
}

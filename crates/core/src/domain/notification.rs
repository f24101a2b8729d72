use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::booking::BookingId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingStatusChanged,
    PaymentReceived,
    RefundIssued,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BookingRequested => "booking_requested",
            Self::BookingStatusChanged => "booking_status_changed",
            Self::PaymentReceived => "payment_received",
            Self::RefundIssued => "refund_issued",
            Self::BookingCancelled => "booking_cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: AccountId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub booking_id: Option<BookingId>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: AccountId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        booking_id: Option<BookingId>,
    ) -> Self {
        Self {
            id: format!("NT-{}", Uuid::new_v4()),
            recipient_id,
            kind,
            title: title.into(),
            message: message.into(),
            booking_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::StayRange;
use crate::domain::booking::BookingId;
use crate::domain::property::PropertyId;

/// One ledger row: the state of a single night at a single property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    pub property_id: PropertyId,
    pub date: NaiveDate,
    pub is_available: bool,
    pub price: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

/// Why a requested stay cannot be booked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvailabilityConflict {
    ConfirmedBooking { booking_id: BookingId, stay: StayRange },
    BlockedDate { date: NaiveDate },
}

impl std::fmt::Display for AvailabilityConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfirmedBooking { booking_id, stay } => write!(
                f,
                "dates overlap confirmed booking {} ({} to {})",
                booking_id.0,
                stay.check_in(),
                stay.check_out()
            ),
            Self::BlockedDate { date } => write!(f, "{date} is blocked on the calendar"),
        }
    }
}

pub fn describe_conflicts(conflicts: &[AvailabilityConflict]) -> String {
    conflicts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

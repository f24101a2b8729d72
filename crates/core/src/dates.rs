//! Calendar-date handling for stays.
//!
//! Stay boundaries are plain calendar dates (`YYYY-MM-DD`). They are never
//! converted to instants, so no timezone can shift a check-in by a day.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` wire date. Anything carrying a time or offset is
/// rejected rather than truncated.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let trimmed = raw.trim();
    if trimmed.len() != 10 {
        return Err(DomainError::validation(format!(
            "`{raw}` is not a calendar date (expected YYYY-MM-DD)"
        )));
    }

    NaiveDate::parse_from_str(trimmed, CALENDAR_DATE_FORMAT).map_err(|_| {
        DomainError::validation(format!("`{raw}` is not a calendar date (expected YYYY-MM-DD)"))
    })
}

pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(CALENDAR_DATE_FORMAT).to_string()
}

/// Friday, Saturday and Sunday nights carry the weekend multiplier.
pub fn is_weekend_night(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat | Weekday::Sun)
}

/// Half-open stay `[check_in, check_out)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DomainError> {
        if check_out <= check_in {
            return Err(DomainError::validation("check-out date must be after check-in date"));
        }
        Ok(Self { check_in, check_out })
    }

    pub fn parse(check_in: &str, check_out: &str) -> Result<Self, DomainError> {
        Self::new(parse_calendar_date(check_in)?, parse_calendar_date(check_out)?)
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> u32 {
        let days = (self.check_out - self.check_in).num_days().max(1);
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// Every night of the stay, check-out day excluded.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let check_out = self.check_out;
        std::iter::successors(Some(self.check_in), |date| date.checked_add_days(Days::new(1)))
            .take_while(move |date| *date < check_out)
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_calendar_date, is_weekend_night, parse_calendar_date, StayRange};

    fn date(raw: &str) -> NaiveDate {
        parse_calendar_date(raw).expect("valid date")
    }

    #[test]
    fn parses_plain_calendar_dates_without_shifting() {
        let parsed = date("2026-03-01");
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"));
        assert_eq!(format_calendar_date(parsed), "2026-03-01");
    }

    #[test]
    fn rejects_timestamps_and_malformed_dates() {
        assert!(parse_calendar_date("2026-03-01T00:00:00Z").is_err());
        assert!(parse_calendar_date("2026-3-1").is_err());
        assert!(parse_calendar_date("2026-02-30").is_err());
        assert!(parse_calendar_date("").is_err());
    }

    #[test]
    fn stay_range_rejects_non_positive_length() {
        assert!(StayRange::parse("2026-03-02", "2026-03-02").is_err());
        assert!(StayRange::parse("2026-03-03", "2026-03-02").is_err());
    }

    #[test]
    fn stay_dates_exclude_check_out() {
        let stay = StayRange::parse("2026-02-27", "2026-03-02").expect("stay");
        let dates: Vec<String> = stay.dates().map(format_calendar_date).collect();

        assert_eq!(stay.nights(), 3);
        assert_eq!(dates, vec!["2026-02-27", "2026-02-28", "2026-03-01"]);
    }

    #[test]
    fn weekend_nights_are_friday_through_sunday() {
        // 2026-01-05 is a Monday.
        let week: Vec<bool> = StayRange::parse("2026-01-05", "2026-01-12")
            .expect("stay")
            .dates()
            .map(is_weekend_night)
            .collect();

        assert_eq!(week, vec![false, false, false, false, true, true, true]);
    }

    #[test]
    fn overlap_treats_check_out_day_as_free() {
        let first = StayRange::parse("2026-01-05", "2026-01-07").expect("stay");
        let back_to_back = StayRange::parse("2026-01-07", "2026-01-09").expect("stay");
        let overlapping = StayRange::parse("2026-01-06", "2026-01-08").expect("stay");

        assert!(!first.overlaps(&back_to_back));
        assert!(first.overlaps(&overlapping));
    }
}

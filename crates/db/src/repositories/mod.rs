//! Row codecs for the Staybook tables.
//!
//! Every function takes a bare `SqliteConnection` so the same code runs on a
//! pooled connection for reads and inside a workflow transaction for writes.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use staybook_core::dates::parse_calendar_date;
use staybook_core::errors::ApplicationError;
use thiserror::Error;

pub mod account;
pub mod audit;
pub mod availability;
pub mod booking;
pub mod notification;
pub mod payment;
pub mod property;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(error)) => error.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        if error.is_unique_violation() {
            return ApplicationError::Conflict(
                "the record was written concurrently by another request".to_string(),
            );
        }
        ApplicationError::Persistence(error.to_string())
    }
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_optional_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value.map(|raw| parse_decimal(column, &raw)).transpose()
}

pub(crate) fn parse_date(column: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    parse_calendar_date(value).map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_enum<T>(column: &str, value: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
{
    value
        .parse::<T>()
        .map_err(|_| RepositoryError::Decode(format!("unknown value in `{column}`: `{value}`")))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use staybook_core::errors::ApplicationError;

    use super::{parse_date, parse_decimal, parse_timestamp, parse_u32, RepositoryError};

    #[test]
    fn decoders_name_the_offending_column() {
        let error = parse_decimal("total", "12,50").expect_err("comma decimal");
        assert!(error.to_string().contains("`total`"));

        assert!(parse_u32("guests", -1).is_err());
        assert!(parse_date("check_in", "2026-01-05T00:00:00Z").is_err());
        assert!(parse_timestamp("created_at", "yesterday".to_owned()).is_err());
    }

    #[test]
    fn decimals_keep_their_exact_value() {
        assert_eq!(parse_decimal("tax", "15.0000").expect("decimal"), Decimal::new(15, 0));
    }

    #[test]
    fn decode_failures_surface_as_persistence_errors() {
        let error = ApplicationError::from(RepositoryError::Decode("bad row".to_owned()));
        assert!(matches!(error, ApplicationError::Persistence(ref message) if message.contains("bad row")));
    }
}

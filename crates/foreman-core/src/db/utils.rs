//! Row decoding helpers shared by the query modules.

use std::str::FromStr;

use jiff::{civil::Date, Timestamp};
use rusqlite::types::Type;

use crate::error::ForemanError;

/// Parses a stored RFC 3339 timestamp column.
pub(super) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<Timestamp> {
    raw.parse::<Timestamp>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parses a stored ISO 8601 calendar date column.
pub(super) fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<Date> {
    raw.parse::<Date>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parses a stored enum column through its `FromStr` implementation.
pub(super) fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Converts an error raised while reading a record into a `ForemanError`.
///
/// Decoding failures mean the persisted record is malformed and surface as
/// [`ForemanError::StateCorruption`]; anything else is a plain database error.
pub(super) fn read_error(record: &'static str, message: &'static str) -> impl Fn(rusqlite::Error) -> ForemanError {
    move |e| match e {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => ForemanError::corruption(record, e),
        other => ForemanError::database(message).with_source(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date(0, "2024-06-01").is_ok());
        assert!(parse_date(0, "June first").is_err());
    }

    #[test]
    fn test_read_error_classifies_decoding_failures() {
        let err = parse_timestamp(3, "not-a-time").unwrap_err();
        let mapped = read_error("daily_plans", "Failed to read plan")(err);
        assert!(matches!(mapped, ForemanError::StateCorruption { .. }));

        let mapped = read_error("daily_plans", "Failed to read plan")(
            rusqlite::Error::QueryReturnedNoRows,
        );
        assert!(matches!(mapped, ForemanError::Database { .. }));
    }
}

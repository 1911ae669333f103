//! Column encoding shared by the row mappers.
//!
//! Timestamps are stored as RFC 3339 UTC text with fixed microsecond
//! precision, so lexical order in SQL equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn opt_ts(dt: &Option<DateTime<Utc>>) -> Option<String> {
    dt.as_ref().map(ts)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

pub(crate) fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

/// Wrap a decode failure for column `idx`.
pub(crate) fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_precision_sorts_chronologically() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert!(ts(&a) < ts(&b));
        assert_eq!(ts(&a), "2024-05-01T09:00:00.000000Z");
    }

    #[test]
    fn parse_round_trip() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_ts(0, &ts(&a)).unwrap(), a);
        assert!(parse_ts(0, "yesterday").is_err());
    }
}

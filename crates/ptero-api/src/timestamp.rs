//! The `since`/update-cursor timestamp format used in report URLs:
//! `YYYY-MM-DD HH:MM:SS.ffffff` (§6 "Timestamps in URLs"), grounded in
//! `workflow_executions.py`'s `format_str = '%Y-%m-%d %H:%M:%S.%f'`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn format(ts: DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, FORMAT).map(|naive| naive.and_utc())
}

/// `#[serde(deserialize_with = "...")]` for an optional `since` query
/// parameter in this exact format.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => parse(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_exact_format() {
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05.678900Z")
            .unwrap()
            .with_timezone(&Utc);
        let formatted = format(ts);
        assert_eq!(formatted, "2026-01-02 03:04:05.678900");
        assert_eq!(parse(&formatted).unwrap(), ts);
    }
}

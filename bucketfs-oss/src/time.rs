use crate::error::StoreError;
use chrono::DateTime;

/// Parse a store timestamp into unix seconds.
///
/// Listings report ISO 8601 (`2024-03-01T10:00:00.000Z`), object headers use
/// the HTTP date form (`Fri, 01 Mar 2024 10:00:00 GMT`).
pub fn parse_timestamp(value: &str) -> Result<i64, StoreError> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.timestamp())
        .map_err(|e| StoreError::MalformedResponse(format!("invalid timestamp {value:?}: {e}")))
}

//! Timestamp wrapper used for every event, snapshot, and cache record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC timestamp rendered as ISO-8601 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Capture the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Unwrap to the underlying `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// Milliseconds elapsed since `self`, clamped to zero if `self` is in the future.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.0).num_milliseconds().max(0)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_nonnegative_for_past_timestamps() {
        let past = Timestamp::from_datetime(Utc::now() - chrono::Duration::seconds(5));
        assert!(past.elapsed_ms() >= 5000);
    }

    #[test]
    fn elapsed_clamps_future_to_zero() {
        let future = Timestamp::from_datetime(Utc::now() + chrono::Duration::hours(1));
        assert_eq!(future.elapsed_ms(), 0);
    }

    #[test]
    fn display_is_rfc3339() {
        let ts = Timestamp::now();
        assert!(DateTime::parse_from_rfc3339(&ts.to_string()).is_ok());
    }
}

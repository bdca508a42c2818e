//! Replication timestamps
//!
//! Every timestamp that crosses a process boundary (queue file names, the
//! checkpoint file, osmupdate arguments) is rendered as
//! `YYYY-MM-DDTHH:MM:SSZ`. The format is fixed width and zero padded, which is
//! what makes lexicographic order of file names equal chronological order.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use osmsync_common::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A UTC instant with whole-second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReplicationTimestamp(DateTime<Utc>);

impl ReplicationTimestamp {
    /// Wall-clock time, truncated to the second
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0))
    }

    /// Parse the canonical form, tolerating the `\:` escapes of Java-style
    /// `.properties` files such as osmosis/imposm `state.txt`.
    ///
    /// Years must be four digits: anything else would break filename ordering.
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned = raw.trim().replace('\\', "");

        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, FORMAT) {
            if cleaned.len() == 20 {
                return Ok(Self(naive.and_utc()));
            }
        }

        // osmconvert and some state files carry an explicit offset
        match DateTime::parse_from_rfc3339(&cleaned) {
            Ok(at) if cleaned.len() >= 20 => Ok(Self::from_datetime(at.with_timezone(&Utc))),
            _ => Err(SyncError::InvalidTimestamp(raw.trim().to_string())),
        }
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for ReplicationTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl FromStr for ReplicationTimestamp {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReplicationTimestamp {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ReplicationTimestamp> for String {
    fn from(value: ReplicationTimestamp) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_canonical_round_trip() {
        let ts = ReplicationTimestamp::parse("2023-01-02T00:00:00Z").unwrap();
        assert_eq!(ts.to_string(), "2023-01-02T00:00:00Z");
        assert_eq!(
            ts.as_datetime(),
            Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_escaped_colons() {
        let ts = ReplicationTimestamp::parse("2015-07-15T08\\:12\\:01Z\n").unwrap();
        assert_eq!(ts.to_string(), "2015-07-15T08:12:01Z");
    }

    #[test]
    fn test_offsets_are_normalised_to_utc() {
        let ts = ReplicationTimestamp::parse("2023-12-31T23:30:00-01:00").unwrap();
        assert_eq!(ts.to_string(), "2024-01-01T00:30:00Z");
    }

    #[test]
    fn test_rejects_garbage() {
        for raw in ["", "UNDEFINED", "2023-01-01", "2023-1-1T0:0:0Z", "2023-01-01 00:00:00"] {
            assert!(ReplicationTimestamp::parse(raw).is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn test_now_has_no_subseconds() {
        let now = ReplicationTimestamp::now();
        assert_eq!(now, ReplicationTimestamp::parse(&now.to_string()).unwrap());
    }

    #[test]
    fn test_lexicographic_order_matches_chronological() {
        let a = ReplicationTimestamp::parse("2023-09-30T23:59:59Z").unwrap();
        let b = ReplicationTimestamp::parse("2023-10-01T00:00:00Z").unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }
}

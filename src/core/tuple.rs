// Wire-agnostic row, range, and table statistics values.
use std::ops::RangeInclusive;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::error::{Error, ErrorKind};

/// One stored row: a caller-assigned nanosecond timestamp and an opaque payload.
///
/// A tuple is a plain value. Rows returned by a query own their payload and hold no
/// reference to the connection that produced them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    timestamp: i64,
    payload: Bytes,
}

impl Tuple {
    pub fn new(timestamp: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Stamps `payload` with `at`, in nanoseconds since the Unix epoch.
    pub fn at(at: OffsetDateTime, payload: impl Into<Bytes>) -> Result<Self, Error> {
        Ok(Self::new(unix_nanos(at)?, payload))
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_parts(self) -> (i64, Bytes) {
        (self.timestamp, self.payload)
    }
}

/// Inclusive `[start, stop]` window of nanosecond timestamps.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub stop: i64,
}

impl TimeRange {
    pub fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    pub fn at(timestamp: i64) -> Self {
        Self::new(timestamp, timestamp)
    }

    pub fn all() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }

    pub fn between(start: OffsetDateTime, stop: OffsetDateTime) -> Result<Self, Error> {
        Ok(Self::new(unix_nanos(start)?, unix_nanos(stop)?))
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.stop
    }
}

impl From<RangeInclusive<i64>> for TimeRange {
    fn from(range: RangeInclusive<i64>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Point-in-time summary of a table.
///
/// `oldest` and `newest` are `0` when the table holds no rows.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub row_count: u64,
    pub oldest: i64,
    pub newest: i64,
}

impl TableStats {
    pub const EMPTY_SENTINEL: i64 = 0;

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn bounds(&self) -> Option<TimeRange> {
        if self.is_empty() {
            None
        } else {
            Some(TimeRange::new(self.oldest, self.newest))
        }
    }
}

pub fn unix_nanos(at: OffsetDateTime) -> Result<i64, Error> {
    i64::try_from(at.unix_timestamp_nanos()).map_err(|_| {
        Error::new(ErrorKind::Usage).with_message(format!(
            "timestamp {at} is outside the representable nanosecond range"
        ))
    })
}

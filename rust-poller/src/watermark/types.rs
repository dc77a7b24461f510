//! The watermark value and its on-disk text format.

use std::fmt;

use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::error::WatermarkError;
use crate::mailbox::DeliveryTime;

/// Persisted text format: UTC date-time with offset and zone name,
/// e.g. `2024-10-05 05:00:00 +0000 UTC`.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z UTC";

/// Lookback used on the first run, when nothing has been persisted yet.
pub const DEFAULT_LOOKBACK_HOURS: u32 = 200;

/// The most recent delivery time already processed.
///
/// Held at whole-second precision: delivery times are compared against it at
/// second granularity, and truncating on construction keeps successive
/// watermarks non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// Create a watermark, dropping any sub-second part.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0))
    }

    /// First-run watermark: `now - lookback`.
    pub fn bootstrap(now: DateTime<Utc>, lookback: Duration) -> Result<Self, WatermarkError> {
        now.checked_sub_signed(lookback)
            .map(Self::new)
            .ok_or(WatermarkError::LookbackOutOfRange {
                hours: lookback.num_hours(),
            })
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    fn epoch_millis(&self) -> i64 {
        self.0.timestamp() * 1000
    }

    /// Whether a message delivered at `delivered` is strictly older than this
    /// watermark. A delivery exactly at the watermark is not stale.
    pub fn is_stale(&self, delivered: DeliveryTime) -> bool {
        self.epoch_millis().saturating_sub(delivered.as_millis()) > 0
    }

    /// Move forward to `delivered` if it is newer, otherwise stay put.
    pub fn advance(self, delivered: DeliveryTime) -> Self {
        if delivered.as_millis().saturating_sub(self.epoch_millis()) <= 0 {
            return self;
        }

        match DateTime::from_timestamp(delivered.as_millis().div_euclid(1000), 0) {
            Some(at) => Self(at),
            None => self,
        }
    }

    /// Render in [`WATERMARK_FORMAT`].
    pub fn to_persisted(&self) -> String {
        self.0.format(WATERMARK_FORMAT).to_string()
    }

    /// Parse text written by [`Watermark::to_persisted`].
    ///
    /// Only the `+0000` offset is accepted; anything else is format drift.
    pub fn parse_persisted(raw: &str) -> Result<Self, WatermarkError> {
        let at = DateTime::parse_from_str(raw, WATERMARK_FORMAT).map_err(|source| {
            WatermarkError::Parse {
                value: raw.to_string(),
                source,
            }
        })?;

        if at.offset().local_minus_utc() != 0 {
            return Err(WatermarkError::NotUtc {
                value: raw.to_string(),
            });
        }

        Ok(Self::new(at.with_timezone(&Utc)))
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_persisted())
    }
}

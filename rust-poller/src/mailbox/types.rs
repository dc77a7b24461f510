//! Message types returned by the mailbox.

use std::fmt;

use chrono::{DateTime, Utc};

/// Server-assigned delivery time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryTime(i64);

impl DeliveryTime {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl From<DateTime<Utc>> for DeliveryTime {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }
}

impl fmt::Display for DeliveryTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(at) => write!(f, "{}", at.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Entry of a list query. Only the id is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: String,
}

impl MessageSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A fully fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub delivered_at: DeliveryTime,
    /// URL-safe base64 of the raw RFC 5322 message.
    pub encoded_body: String,
}

impl Message {
    pub fn new(id: impl Into<String>, delivered_at: DeliveryTime, encoded_body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delivered_at,
            encoded_body: encoded_body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_delivery_time_from_datetime() {
        let at = Utc.with_ymd_and_hms(2024, 10, 5, 5, 0, 0).unwrap();
        let delivered = DeliveryTime::from(at);
        assert_eq!(delivered.as_millis(), 1_728_104_400_000);
        assert_eq!(delivered.to_datetime(), Some(at));
    }

    #[test]
    fn test_delivery_time_display() {
        let delivered = DeliveryTime::from_millis(1_728_104_400_000);
        assert_eq!(delivered.to_string(), "2024-10-05T05:00:00+00:00");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp as delivered by the ingestor.
///
/// Unparseable values are kept rather than dropped so the owning pair can be
/// skipped and counted during analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    At(DateTime<Utc>),
    Malformed(String),
}

impl EventTime {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::At(ts) => Some(*ts),
            EventTime::Malformed(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(ts: DateTime<Utc>) -> Self {
        EventTime::At(ts)
    }
}

/// Message size as delivered by the ingestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizeValue {
    Bytes(f64),
    Malformed(String),
}

impl SizeValue {
    /// Build from a number, rejecting negative and non-finite values
    pub fn from_number(value: f64) -> Self {
        if value.is_finite() && value >= 0.0 {
            SizeValue::Bytes(value)
        } else {
            SizeValue::Malformed(value.to_string())
        }
    }

    /// Build from text the way a search backend might return it ("1024")
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) => Self::from_number(v),
            Err(_) => SizeValue::Malformed(raw.to_string()),
        }
    }
}

/// A single sender→receiver event. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub timestamp: EventTime,
    pub size: Option<SizeValue>,
}

impl Event {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: Some(sender.into()),
            receiver: Some(receiver.into()),
            timestamp: EventTime::At(timestamp),
            size: None,
        }
    }

    pub fn with_size(mut self, bytes: f64) -> Self {
        self.size = Some(SizeValue::from_number(bytes));
        self
    }

    /// Sender and receiver, if both are present and non-blank
    pub fn identity(&self) -> Option<(&str, &str)> {
        let sender = self.sender.as_deref().filter(|s| !s.trim().is_empty())?;
        let receiver = self.receiver.as_deref().filter(|r| !r.trim().is_empty())?;
        Some((sender, receiver))
    }
}

use crate::data::Event;
use chrono::{DateTime, Duration, Utc};

/// Bounded historical range applied to ingested events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookbackWindow {
    period: Duration,
    end: Option<DateTime<Utc>>,
}

impl LookbackWindow {
    /// # Arguments
    /// * `period_hours` - Length of the range ending at `end`
    /// * `end` - Range end; the newest event timestamp when `None`
    pub fn new(period_hours: u32, end: Option<DateTime<Utc>>) -> Self {
        Self {
            period: Duration::hours(i64::from(period_hours)),
            end,
        }
    }

    /// Resolve the range against a concrete event set
    pub fn bounds(&self, events: &[Event]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let end = self
            .end
            .or_else(|| events.iter().filter_map(|e| e.timestamp.instant()).max())?;
        let start = end.checked_sub_signed(self.period).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Some((start, end))
    }

    /// Keep events inside the range. Events with unparseable timestamps are
    /// kept so the analysis can account for them.
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        let (start, end) = match self.bounds(&events) {
            Some(bounds) => bounds,
            None => return events,
        };

        events
            .into_iter()
            .filter(|e| match e.timestamp.instant() {
                Some(ts) => ts >= start && ts <= end,
                None => true,
            })
            .collect()
    }
}

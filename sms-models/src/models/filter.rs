//! Message filter used to build message lists.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sms_core::error::{SmsError, SmsResult};

use super::message::Delivery;

/// Inclusive timestamp range. Either bound may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// A range with neither bound set does not restrict anything.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Lower bound in milliseconds since the Unix epoch.
    pub fn start_millis(&self) -> Option<i64> {
        self.start.map(|t| t.timestamp_millis())
    }

    /// Upper bound in milliseconds since the Unix epoch.
    pub fn end_millis(&self) -> Option<i64> {
        self.end.map(|t| t.timestamp_millis())
    }
}

/// Criteria for selecting messages. All set criteria must match; a filter
/// with no criteria matches every message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFilter {
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub delivery: Option<Delivery>,
    /// Addresses matched against either the sender or the receiver.
    #[serde(default)]
    pub numbers: Option<Vec<String>>,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to messages with `start <= timestamp <= end`.
    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.time_range = Some(TimeRange { start: Some(start), end: Some(end) });
        self
    }

    /// Restrict to messages at or after `start`.
    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        let range = self.time_range.get_or_insert_with(TimeRange::default);
        range.start = Some(start);
        self
    }

    /// Restrict to messages at or before `end`.
    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        let range = self.time_range.get_or_insert_with(TimeRange::default);
        range.end = Some(end);
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn with_numbers<I, S>(mut self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numbers = Some(numbers.into_iter().map(Into::into).collect());
        self
    }

    /// The time range, if it restricts anything.
    pub fn active_time_range(&self) -> Option<&TimeRange> {
        self.time_range.as_ref().filter(|r| !r.is_unbounded())
    }

    /// Whether no criterion is active.
    pub fn is_empty(&self) -> bool {
        self.active_time_range().is_none() && self.delivery.is_none() && self.numbers.is_none()
    }

    /// Number of active criteria.
    pub fn active_criteria(&self) -> usize {
        usize::from(self.active_time_range().is_some())
            + usize::from(self.delivery.is_some())
            + usize::from(self.numbers.is_some())
    }

    /// The number set, deduplicated and sorted.
    pub fn number_set(&self) -> Option<BTreeSet<&str>> {
        self.numbers
            .as_ref()
            .map(|numbers| numbers.iter().map(|n| n.as_str()).collect())
    }

    /// Reject filters that cannot be executed.
    pub fn validate(&self) -> SmsResult<()> {
        if let Some(range) = self.active_time_range() {
            if let (Some(start), Some(end)) = (range.start, range.end) {
                if start > end {
                    return Err(SmsError::InvalidArgument(format!(
                        "time range start {start} is after end {end}"
                    )));
                }
            }
        }

        if let Some(numbers) = &self.numbers {
            if numbers.is_empty() {
                return Err(SmsError::InvalidArgument("numbers filter is empty".into()));
            }
            if numbers.iter().any(|n| n.trim().is_empty()) {
                return Err(SmsError::InvalidArgument("numbers filter contains a blank address".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_empty_filter() {
        let filter = MessageFilter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.active_criteria(), 0);
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_unbounded_time_range_is_inactive() {
        let filter = MessageFilter {
            time_range: Some(TimeRange::default()),
            ..Default::default()
        };
        assert!(filter.is_empty());
    }

    #[test]
    fn test_builder_counts_criteria() {
        let filter = MessageFilter::new()
            .since(ts(10))
            .with_delivery(Delivery::Sent)
            .with_numbers(["+1", "+2"]);
        assert_eq!(filter.active_criteria(), 3);
        assert_eq!(filter.active_time_range().unwrap().start_millis(), Some(10));
        assert_eq!(filter.active_time_range().unwrap().end_millis(), None);
    }

    #[test]
    fn test_number_set_is_sorted_and_deduplicated() {
        let filter = MessageFilter::new().with_numbers(["+3", "+1", "+3"]);
        let set: Vec<&str> = filter.number_set().unwrap().into_iter().collect();
        assert_eq!(set, vec!["+1", "+3"]);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let filter = MessageFilter::new().between(ts(20), ts(10));
        assert!(matches!(filter.validate(), Err(SmsError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_empty_numbers() {
        let filter = MessageFilter::new().with_numbers(Vec::<String>::new());
        assert!(matches!(filter.validate(), Err(SmsError::InvalidArgument(_))));

        let filter = MessageFilter::new().with_numbers(["+1", "  "]);
        assert!(filter.validate().is_err());
    }
}

//! Telemetry events and the opaque records the queue stores.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::event_keys;
use crate::errors::{BeaconError, InvalidInputReason, Result};

/// A telemetry event as produced by the host application.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub value: f64,
    pub date: DateTime<Utc>,
    pub target_id: Option<String>,
    pub metadata: Option<Value>,
}

impl Event {
    /// A new event of the given type stamped with the current time.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            value: 0.0,
            date: Utc::now(),
            target_id: None,
            metadata: None,
        }
    }

    #[must_use]
    pub const fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn with_target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub const fn at(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// # Errors
    /// Returns `InvalidInput(InvalidEvent)` when the event type is blank.
    pub fn validate(&self) -> Result<()> {
        if self.event_type.trim().is_empty() {
            return Err(BeaconError::InvalidInput(InvalidInputReason::InvalidEvent));
        }
        Ok(())
    }

    /// The base record carrying only the event's own fields.
    pub fn into_record(self) -> EventRecord {
        let mut record = EventRecord::default();
        record.insert(event_keys::EVENT_TYPE, Value::String(self.event_type));
        record.insert(event_keys::EVENT_VALUE, Value::from(self.value));
        record.insert(
            event_keys::EVENT_DATE,
            Value::String(self.date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if let Some(target_id) = self.target_id {
            record.insert(event_keys::TARGET_ID, Value::String(target_id));
        }
        if let Some(metadata) = self.metadata {
            record.insert(event_keys::METADATA, metadata);
        }
        record
    }
}

/// A coordinate attached to events when location is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One enriched telemetry event, stored and uploaded as an opaque JSON
/// object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord(Map<String, Value>);

impl EventRecord {
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for EventRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn record_carries_event_fields() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let record = Event::new("screen_view")
            .with_value(2.5)
            .with_target_id("home")
            .with_metadata(json!({"tab": "feed"}))
            .at(date)
            .into_record();

        assert_eq!(record.get("EventType"), Some(&json!("screen_view")));
        assert_eq!(record.get("EventValue"), Some(&json!(2.5)));
        assert_eq!(record.get("EventDate"), Some(&json!("2024-03-01T12:30:00.000Z")));
        assert_eq!(record.get("TargetId"), Some(&json!("home")));
        assert_eq!(record.get("Metadata"), Some(&json!({"tab": "feed"})));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let record = Event::new("launch").into_record();
        assert!(record.get("TargetId").is_none());
        assert!(record.get("Metadata").is_none());
        assert_eq!(record.get("EventValue"), Some(&json!(0.0)));
    }

    #[test]
    fn blank_event_type_is_rejected() {
        let err = Event::new("   ").validate().unwrap_err();
        assert_eq!(err, BeaconError::InvalidInput(InvalidInputReason::InvalidEvent));
    }

    #[test]
    fn record_serializes_as_plain_object() {
        let record = Event::new("launch").into_record();
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.is_object());
    }
}

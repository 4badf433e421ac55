use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::{ALERT_TIMESTAMP, ALERT_UUID, EVENT_TOPICS};

/// Maximum stored length of a string value, in UTF-8 bytes.
/// Longer values are truncated at store time.
pub const MAX_STRING_BYTES: usize = 32_766;

/// A single scalar field value of a stored record.
///
/// Incoming events are untyped property bags; every value is one of
/// these variants. Anything else must be stringified by the caller
/// before it reaches the domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// A flat field → scalar mapping: one stored telemetry event.
///
/// Records exist in the store between `store` and `delete`/`eviction`;
/// identity is the `alertUUID` field assigned at store time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from an inbound event, recording the source topic
    /// under `event.topics`. String values are truncated to
    /// [`MAX_STRING_BYTES`].
    pub fn from_event(event: &CollectedEvent) -> Self {
        let mut record = Record::new();
        for (name, value) in &event.properties {
            let value = match value {
                FieldValue::Str(s) => FieldValue::Str(truncate_utf8(s, MAX_STRING_BYTES)),
                other => other.clone(),
            };
            record.fields.insert(name.clone(), value);
        }
        record
            .fields
            .insert(EVENT_TOPICS.to_string(), FieldValue::Str(event.topic.clone()));
        record
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The store-assigned unique id, if this record has been stored.
    pub fn uuid(&self) -> Option<&str> {
        self.fields.get(ALERT_UUID).and_then(FieldValue::as_str)
    }

    /// The store-assigned (or backdated) timestamp in epoch milliseconds.
    pub fn timestamp_millis(&self) -> Option<i64> {
        self.fields.get(ALERT_TIMESTAMP).and_then(FieldValue::as_i64)
    }
}

/// An inbound telemetry event: a source topic plus an untyped property
/// bag. Properties are carried into the stored record verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedEvent {
    pub topic: String,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldValue>,
}

impl CollectedEvent {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

/// Truncate to at most `max` bytes on a char boundary.
fn truncate_utf8(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_event_carries_topic_and_properties() {
        let event = CollectedEvent::new("collected")
            .with_property("foo", "bar")
            .with_property("myint", 28)
            .with_property("myfloat", 2.5)
            .with_property("flag", true);

        let record = Record::from_event(&event);

        assert_eq!(record.get("foo"), Some(&FieldValue::Str("bar".to_string())));
        assert_eq!(record.get("myint"), Some(&FieldValue::Int(28)));
        assert_eq!(record.get("myfloat"), Some(&FieldValue::Float(2.5)));
        assert_eq!(record.get("flag"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            record.get(EVENT_TOPICS),
            Some(&FieldValue::Str("collected".to_string()))
        );
    }

    #[test]
    fn oversized_strings_truncated() {
        let big = "x".repeat(MAX_STRING_BYTES + 100);
        let event = CollectedEvent::new("collected").with_property("big", big);
        let record = Record::from_event(&event);

        let stored = record.get("big").and_then(FieldValue::as_str).unwrap();
        assert_eq!(stored.len(), MAX_STRING_BYTES);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_utf8("héllo", 2), "h");
        assert_eq!(truncate_utf8("héllo", 3), "hé");
        assert_eq!(truncate_utf8("abc", 10), "abc");
    }

    #[test]
    fn field_value_json_round_trip() {
        let mut record = Record::new();
        record.insert("s", "text");
        record.insert("i", 42_i64);
        record.insert("f", 1.5);
        record.insert("b", false);

        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn numeric_views() {
        assert_eq!(FieldValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(FieldValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(FieldValue::Str("7".to_string()).as_f64(), None);
        assert_eq!(FieldValue::Int(7).as_i64(), Some(7));
        assert_eq!(FieldValue::Float(7.0).as_i64(), None);
    }

    #[test]
    fn uuid_and_timestamp_accessors() {
        let mut record = Record::new();
        assert!(record.uuid().is_none());
        assert!(record.timestamp_millis().is_none());

        record.insert(ALERT_UUID, "abc-123");
        record.insert(ALERT_TIMESTAMP, 1_700_000_000_000_i64);
        assert_eq!(record.uuid(), Some("abc-123"));
        assert_eq!(record.timestamp_millis(), Some(1_700_000_000_000));
    }

    #[test]
    fn now_millis_is_positive() {
        assert!(now_millis() > 0);
    }
}

pub mod entity;

pub use entity::{CollectedEvent, FieldValue, Record, now_millis};

/// Unique record identifier, assigned by the store.
pub const ALERT_UUID: &str = "alertUUID";
/// Milliseconds since epoch, assigned by the store unless the incoming
/// event already carries one.
pub const ALERT_TIMESTAMP: &str = "alertTimestamp";
/// Source topic of the collected event.
pub const EVENT_TOPICS: &str = "event.topics";
/// Name of the rule currently tracking this record as pending.
pub const ALERT_RULE: &str = "alertRule";

use serde::{Deserialize, Serialize};

use crate::record::{FieldValue, Record};
use crate::rule::Rule;

/// Severity of the rule that fired.
pub const ALERT_LEVEL: &str = "alertLevel";
/// Condition of the rule that fired.
pub const ALERT_PATTERN: &str = "alertPattern";
/// `true` on recovery alerts, `false` on firing alerts.
pub const ALERT_BACK_TO_NORMAL: &str = "alertBackToNormal";

/// An alert ready for dispatch: the matched record enriched with the
/// rule metadata, addressed to a per-level topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub topic: String,
    pub properties: Record,
}

impl AlertEvent {
    /// Build an alert from a stored record and the rule it matched.
    /// The topic is `{topic_prefix}/{level}`.
    pub fn from_record(
        record: &Record,
        rule: &Rule,
        back_to_normal: bool,
        topic_prefix: &str,
    ) -> Self {
        let mut properties = record.clone();
        properties.insert(ALERT_LEVEL, FieldValue::Str(rule.level.clone()));
        properties.insert(ALERT_PATTERN, FieldValue::Str(rule.condition.clone()));
        properties.insert(ALERT_BACK_TO_NORMAL, FieldValue::Bool(back_to_normal));
        Self {
            topic: format!("{topic_prefix}/{}", rule.level),
            properties,
        }
    }

    pub fn level(&self) -> Option<&str> {
        self.properties.get(ALERT_LEVEL).and_then(FieldValue::as_str)
    }

    pub fn is_back_to_normal(&self) -> bool {
        matches!(
            self.properties.get(ALERT_BACK_TO_NORMAL),
            Some(FieldValue::Bool(true))
        )
    }
}

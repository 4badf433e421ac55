use serde::{Deserialize, Serialize};

pub const DEFAULT_LEVEL: &str = "WARN";

/// A single alerting rule: a query condition over stored records plus
/// the evaluation policy applied when the condition matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name, unique within a configuration.
    pub name: String,
    /// Wire-format query evaluated against incoming records.
    pub condition: String,
    /// Optional sustain period; when set, the rule only fires after the
    /// condition has held at least this long.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// Severity attached to emitted alerts.
    #[serde(default = "default_level")]
    pub level: String,
    /// Whether a back-to-normal alert is emitted once the condition
    /// stops matching.
    #[serde(default)]
    pub recoverable: bool,
}

fn default_level() -> String {
    DEFAULT_LEVEL.to_string()
}

impl Rule {
    pub fn new(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: condition.into(),
            period: None,
            level: default_level(),
            recoverable: false,
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let rule = Rule::new("cpu", "cpu:[90 TO *]");
        assert_eq!(rule.level, "WARN");
        assert!(!rule.recoverable);
        assert!(rule.period.is_none());
    }

    #[test]
    fn deserializes_with_defaults() {
        let rule: Rule =
            serde_json::from_str(r#"{"name":"r","condition":"message:*"}"#).unwrap();
        assert_eq!(rule.level, "WARN");
        assert!(!rule.recoverable);
    }
}

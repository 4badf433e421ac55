//! Loads [`Rule`]s from a flat configuration dictionary.
//!
//! Each rule lives under a `rule.` prefixed key; the value is a JSON
//! object describing the rule. Single quotes are accepted in place of
//! double quotes so rules stay readable inside config files:
//!
//! ```text
//! rule.high-cpu = {'condition':'cpu:[90 TO *]','period':'5MINUTES','level':'ERROR'}
//! ```
//!
//! Malformed entries are logged and skipped, never fatal.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::entity::{DEFAULT_LEVEL, Rule};

pub const RULE_PREFIX: &str = "rule.";

#[derive(Debug, Deserialize)]
struct RuleDefinition {
    condition: Option<String>,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    recoverable: Option<bool>,
}

/// Extract every well-formed rule from `dictionary`. Keys without the
/// `rule.` prefix are ignored; the remainder of the key is the rule
/// name.
pub fn load(dictionary: &BTreeMap<String, String>) -> Vec<Rule> {
    let mut rules = Vec::new();
    for (key, value) in dictionary {
        let Some(name) = key.strip_prefix(RULE_PREFIX) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }
        let normalized = value.replace('\'', "\"");
        let definition: RuleDefinition = match serde_json::from_str(&normalized) {
            Ok(definition) => definition,
            Err(error) => {
                tracing::error!(rule = name, %error, "malformed rule definition, skipping");
                continue;
            }
        };
        let Some(condition) = definition.condition else {
            tracing::error!(rule = name, "rule has no condition, skipping");
            continue;
        };
        rules.push(Rule {
            name: name.to_string(),
            condition,
            period: definition.period,
            level: definition
                .level
                .unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
            recoverable: definition.recoverable.unwrap_or(false),
        });
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_rule_with_single_quotes() {
        let rules = load(&dictionary(&[(
            "rule.high-cpu",
            "{'condition':'cpu:[90 TO *]','period':'5MINUTES','level':'ERROR','recoverable':true}",
        )]));
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.name, "high-cpu");
        assert_eq!(rule.condition, "cpu:[90 TO *]");
        assert_eq!(rule.period.as_deref(), Some("5MINUTES"));
        assert_eq!(rule.level, "ERROR");
        assert!(rule.recoverable);
    }

    #[test]
    fn applies_defaults() {
        let rules = load(&dictionary(&[("rule.any", "{'condition':'message:*'}")]));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].level, "WARN");
        assert!(!rules[0].recoverable);
        assert!(rules[0].period.is_none());
    }

    #[test]
    fn empty_dictionary_yields_no_rules() {
        assert!(load(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn ignores_unprefixed_keys() {
        let rules = load(&dictionary(&[("other", "{'condition':'message:*'}")]));
        assert!(rules.is_empty());
    }

    #[test]
    fn skips_malformed_entries() {
        let rules = load(&dictionary(&[
            ("rule.empty", "   "),
            ("rule.broken", "{'condition'"),
            ("rule.no-condition", "{'level':'ERROR'}"),
            ("rule.good", "{'condition':'counter:[100 TO *]'}"),
        ]));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "good");
    }
}

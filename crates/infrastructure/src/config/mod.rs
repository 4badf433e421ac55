//! Service configuration: structs, parsing, and validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use domain::query::Query;
use domain::rule::{RULE_PREFIX, load, parse_period};
use serde::{Deserialize, Serialize};

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub store: StoreSection,

    /// Rule name → JSON rule definition, as consumed by the rule
    /// loader. Single quotes are accepted inside definitions.
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
}

impl ServiceConfig {
    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a YAML string (no validation).
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Check cross-field constraints and that every rule definition is
    /// loadable: well-formed JSON with a parseable condition and
    /// period. The runtime loader skips broken rules; validation
    /// reports them instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Redb && self.store.path.is_none() {
            return Err(ConfigError::Validation {
                field: "store.path".to_string(),
                message: "required when store.backend is redb".to_string(),
            });
        }

        for (name, definition) in &self.rules {
            let single = BTreeMap::from([(format!("{RULE_PREFIX}{name}"), definition.clone())]);
            let loaded = load(&single);
            let Some(rule) = loaded.first() else {
                return Err(ConfigError::Validation {
                    field: format!("rules.{name}"),
                    message: "malformed rule definition or missing condition".to_string(),
                });
            };
            if let Err(e) = Query::parse(&rule.condition) {
                return Err(ConfigError::Validation {
                    field: format!("rules.{name}.condition"),
                    message: e.to_string(),
                });
            }
            if let Err(e) = parse_period(rule.period.as_deref()) {
                return Err(ConfigError::Validation {
                    field: format!("rules.{name}.period"),
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The rules section as a prefixed dictionary for the rule loader.
    pub fn rule_dictionary(&self) -> BTreeMap<String, String> {
        self.rules
            .iter()
            .map(|(name, definition)| (format!("{RULE_PREFIX}{name}"), definition.clone()))
            .collect()
    }
}

// ── Service section ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Prefix for dispatched alert topics; the rule level is appended.
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// Where outgoing alerts go: the service log, or a JSON stream on
    /// stdout for a downstream consumer.
    #[serde(default)]
    pub dispatcher: DispatcherKind,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            topic_prefix: default_topic_prefix(),
            dispatcher: DispatcherKind::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherKind {
    #[default]
    Log,
    Stream,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}
fn default_log_format() -> LogFormat {
    LogFormat::Json
}
fn default_topic_prefix() -> String {
    "vigil/alert".to_string()
}

// ── Store section ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file for the redb backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redb,
}

// ── Log level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "invalid log level '{s}': expected error|warn|info|debug|trace"
            )),
        }
    }
}

// ── Log format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(format!("invalid log format '{s}': expected json|text")),
        }
    }
}

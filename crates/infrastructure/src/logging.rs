use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LogFormat, LogLevel};

/// Install the global tracing subscriber on stdout.
///
/// `RUST_LOG` overrides the configured `level` when set. JSON output is
/// flattened so alert fields land at the top level of each log line;
/// text output is the pretty developer format. Calling this twice fails.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<(), ConfigError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_ansi(false)
            .try_init(),
        LogFormat::Text => builder.pretty().try_init(),
    }
    .map_err(|error| ConfigError::Validation {
        field: "logging".to_string(),
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_as_str_is_valid_env_filter() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert!(
                EnvFilter::try_new(level.as_str()).is_ok(),
                "{} should be a valid filter",
                level.as_str()
            );
        }
    }

    #[test]
    fn second_init_reports_error() {
        init_logging(LogLevel::Warn, LogFormat::Text).ok();
        let second = init_logging(LogLevel::Warn, LogFormat::Text);
        assert!(matches!(
            second,
            Err(ConfigError::Validation { ref field, .. }) if field == "logging"
        ));
    }
}

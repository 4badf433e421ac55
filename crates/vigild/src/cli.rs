use clap::{Parser, Subcommand};
use infrastructure::config::{LogFormat, LogLevel};
use infrastructure::constants::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "vigild",
    about = "vigil alerting daemon: evaluates alerting rules over collected events",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Log level override (takes precedence over config file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (default, production) or text (development)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display version information
    Version,

    /// Check the configuration file and rule definitions, then exit
    Validate,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_default_config_path() {
        let cli = Cli::try_parse_from(["vigild"]).unwrap();
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert!(cli.log_level.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_custom_config_path() {
        let cli = Cli::try_parse_from(["vigild", "--config", "/tmp/test.yaml"]).unwrap();
        assert_eq!(cli.config, "/tmp/test.yaml");
    }

    #[test]
    fn cli_log_level_override() {
        let cli = Cli::try_parse_from(["vigild", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn cli_log_format_text() {
        let cli = Cli::try_parse_from(["vigild", "--log-format", "text"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Text));
    }

    #[test]
    fn cli_version_subcommand() {
        let cli = Cli::try_parse_from(["vigild", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn cli_validate_subcommand() {
        let cli = Cli::try_parse_from(["vigild", "validate"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Validate)));
    }

    #[test]
    fn cli_invalid_log_level_rejected() {
        assert!(Cli::try_parse_from(["vigild", "--log-level", "banana"]).is_err());
    }
}

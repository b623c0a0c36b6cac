//! Command-line interface for the certsync binary.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// SSL certificate sync webhook
///
/// Listens for certificate update notifications and runs the matching
/// Ansible playbook against the configured server groups.
#[derive(Parser, Debug, Clone)]
#[command(name = "certsync")]
#[command(version)]
#[command(about = "SSL certificate sync webhook", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long, env = "CERTSYNC_CONFIG", default_value = "config.yml")]
    pub config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Load and validate the configuration, print a summary and exit
    #[arg(long)]
    pub check_config: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl Cli {
    /// Parse arguments from the process environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["certsync"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.yml"));
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(!cli.check_config);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "certsync",
            "--config",
            "/etc/certsync/config.yml",
            "--log-format",
            "json",
            "--check-config",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/certsync/config.yml"));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(cli.check_config);
    }
}

//! CLI argument definitions for the `scowatch` binary.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use scowatch_core::config::ScowatchConfig;

/// Self-checkout log monitor.
///
/// Tails a self-checkout terminal log, classifies the embedded protocol
/// messages and writes events and transactions as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "scowatch")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to scowatch.toml configuration file.
    ///
    /// Built-in defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the log file to tail.
    #[arg(long)]
    pub log_file: Option<String>,

    /// Override the rule configuration (.json, .yml or .yaml).
    #[arg(long)]
    pub rules: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and rules, then exit without tailing.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Applies the CLI overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ScowatchConfig) {
        if let Some(path) = &self.log_file {
            config.monitor.log_path.clone_from(path);
        }
        if let Some(path) = &self.rules {
            config.monitor.rules_path.clone_from(path);
        }
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let cli = DaemonCli::try_parse_from([
            "scowatch",
            "--config",
            "/etc/scowatch/scowatch.toml",
            "--log-file",
            "/var/log/sco/logSelfcheckout.log",
            "--rules",
            "/etc/scowatch/rules.yaml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/scowatch/scowatch.toml")));
        assert_eq!(cli.log_file.as_deref(), Some("/var/log/sco/logSelfcheckout.log"));
        assert!(cli.validate);
    }

    #[test]
    fn no_flags_keeps_config() {
        let cli = DaemonCli::try_parse_from(["scowatch"]).unwrap();
        let mut config = ScowatchConfig::default();
        cli.apply_overrides(&mut config);

        let defaults = ScowatchConfig::default();
        assert_eq!(config.monitor.log_path, defaults.monitor.log_path);
        assert_eq!(config.general.log_level, defaults.general.log_level);
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = DaemonCli::try_parse_from([
            "scowatch",
            "--log-file",
            "/tmp/sco.log",
            "--rules",
            "/tmp/rules.json",
            "--log-level",
            "warn",
        ])
        .unwrap();
        let mut config = ScowatchConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.monitor.log_path, "/tmp/sco.log");
        assert_eq!(config.monitor.rules_path, "/tmp/rules.json");
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.general.log_format, "json");
    }
}

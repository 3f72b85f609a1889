//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// Flag > environment variable > config file > default. This struct carries
/// the flag layer; the rest is resolved by `Config` in `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.portal/config.yaml)
    pub config: Option<String>,

    /// API host override
    pub api_host: Option<String>,

    /// Interface language override
    pub lang: Option<String>,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            api_host: cli.api_host.clone(),
            lang: cli.lang.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn api_host_ref(&self) -> Option<&str> {
        self.api_host.as_deref()
    }

    pub fn lang_ref(&self) -> Option<&str> {
        self.lang.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_copies_globals() {
        let cli = Cli::try_parse_from([
            "portal",
            "--format",
            "json",
            "--config",
            "/custom/config.yaml",
            "--api-host",
            "http://localhost:9000",
            "--lang",
            "de",
            "status",
        ])
        .unwrap();
        let opts = GlobalOptions::from_cli(&cli);

        assert_eq!(opts.format, OutputFormat::Json);
        assert_eq!(opts.config_ref(), Some("/custom/config.yaml"));
        assert_eq!(opts.api_host_ref(), Some("http://localhost:9000"));
        assert_eq!(opts.lang_ref(), Some("de"));
    }

    #[test]
    fn test_defaults() {
        let opts = GlobalOptions::default();
        assert_eq!(opts.format, OutputFormat::Pretty);
        assert_eq!(opts.config_ref(), None);
        assert_eq!(opts.api_host_ref(), None);
    }
}

//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - human-optimized rich formatting
    #[default]
    Pretty,
    /// Table format - machine-parseable, one row per entry
    Table,
    /// JSON format - structured for scripts/APIs
    Json,
}

/// Password input shared by commands that need one.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PasswordArgs {
    /// Password (prompted for when omitted)
    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

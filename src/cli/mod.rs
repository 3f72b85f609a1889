//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod admin;
pub mod args;
pub mod auth;
pub mod completions;
pub mod context;
pub mod profile;
pub mod prompt;
pub mod status;
pub mod watch;

pub use args::{GlobalOptions, OutputFormat, PasswordArgs};
pub use context::CommandContext;

/// Portal CLI - sign in to the auth portal and manage your session
#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "PORTAL_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "PORTAL_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Portal API base URL
    #[arg(long, global = true)]
    pub api_host: Option<String>,

    /// Interface language (e.g. en, de, pt-BR)
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "PORTAL_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        /// Account email
        #[arg(long, short)]
        email: Option<String>,

        #[command(flatten)]
        password: PasswordArgs,

        /// Keep this device signed in (uses remember_days from config, default 30)
        #[arg(long)]
        remember: bool,
    },

    /// Sign out everywhere on this machine
    Logout,

    /// Show session and configuration status
    Status,

    /// Create an account
    Register {
        /// Account email
        #[arg(long, short)]
        email: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        password: PasswordArgs,
    },

    /// Confirm your email address with the token from the verification email
    Verify {
        /// Verification token
        token: String,
    },

    /// Send the verification email again
    ResendVerification {
        /// Account email
        #[arg(long, short)]
        email: Option<String>,
    },

    /// Recover a forgotten password
    #[command(subcommand)]
    Password(PasswordCommands),

    /// View and edit your profile
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Administration (requires the admin role)
    #[command(subcommand)]
    Admin(AdminCommands),

    /// Finish an OAuth sign-in from the callback URL the browser landed on
    Oauth {
        /// Full callback URL, including the #fragment
        callback_url: String,
    },

    /// Keep a session open and report sign-ins and sign-outs from other windows
    Watch,

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   portal completion bash > /etc/bash_completion.d/portal
  zsh:    portal completion zsh > \"${fpath[1]}/_portal\"
  fish:   portal completion fish > ~/.config/fish/completions/portal.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Password recovery subcommands
#[derive(Subcommand, Debug)]
pub enum PasswordCommands {
    /// Email a password reset link
    Forgot {
        /// Account email
        #[arg(long, short)]
        email: Option<String>,
    },

    /// Set a new password with the token from the reset email
    Reset {
        /// Reset token
        token: String,

        #[command(flatten)]
        password: PasswordArgs,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show your profile
    Show,

    /// Update your profile
    Update {
        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New email address
        #[arg(long)]
        email: Option<String>,

        /// Change your password (prompts for current and new password)
        #[arg(long)]
        change_password: bool,
    },
}

/// Administration subcommands
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Check whether you are an administrator
    Verify,

    /// Manage users
    #[command(subcommand)]
    Users(UserCommands),

    /// Manage the whitelist
    #[command(subcommand)]
    Whitelist(ListCommands),

    /// Manage the blacklist
    #[command(subcommand)]
    Blacklist(ListCommands),

    /// Show or change who may sign in
    #[command(subcommand)]
    AccessMode(AccessModeCommands),
}

/// User administration subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List users
    List,

    /// Create a user
    Create {
        /// Account email
        email: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Role (e.g. user, admin)
        #[arg(long)]
        role: Option<String>,

        #[command(flatten)]
        password: PasswordArgs,
    },

    /// Update a user
    Update {
        /// User ID
        id: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New role
        #[arg(long)]
        role: Option<String>,

        /// Mark the email as verified (true/false)
        #[arg(long)]
        verified: Option<bool>,
    },

    /// Delete a user
    Delete {
        /// User ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Whitelist/blacklist subcommands
#[derive(Subcommand, Debug)]
pub enum ListCommands {
    /// List entries
    List,

    /// Add an email address or pattern
    Add {
        /// Email address or pattern (e.g. *@example.com)
        email: String,

        /// Why the entry was added
        #[arg(long)]
        reason: Option<String>,
    },

    /// Remove an entry
    Remove {
        /// Entry ID
        id: String,
    },
}

/// Access mode subcommands
#[derive(Subcommand, Debug)]
pub enum AccessModeCommands {
    /// Show the current access mode
    Get,

    /// Change the access mode (open, whitelist, blacklist)
    Set {
        /// New access mode
        mode: crate::client::models::AccessMode,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_whitelist_add() {
        let cli = Cli::try_parse_from([
            "portal",
            "admin",
            "whitelist",
            "add",
            "*@corp.io",
            "--reason",
            "partner",
        ])
        .unwrap();
        match cli.command {
            Commands::Admin(AdminCommands::Whitelist(ListCommands::Add { email, reason })) => {
                assert_eq!(email, "*@corp.io");
                assert_eq!(reason.as_deref(), Some("partner"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_access_mode() {
        let cli =
            Cli::try_parse_from(["portal", "admin", "access-mode", "set", "blacklist"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Admin(AdminCommands::AccessMode(AccessModeCommands::Set {
                mode: crate::client::models::AccessMode::Blacklist
            }))
        ));
        assert!(Cli::try_parse_from(["portal", "admin", "access-mode", "set", "closed"]).is_err());
    }

    #[test]
    fn test_format_defaults_to_pretty() {
        let cli = Cli::try_parse_from(["portal", "status"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Pretty);
    }
}

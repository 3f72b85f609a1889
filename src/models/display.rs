//! Display model implementations for table and JSON output

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::client::models::{AccessMode, AdminUser, ListEntry, UserProfile};
use crate::error::Result;
use crate::output::Formattable;
use crate::output::formatters::{format_date, or_dash};
use crate::output::json::format_json;
use crate::output::table::format_record;

/// Admin user row
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct UserDisplay {
    #[tabled(rename = "USER ID")]
    pub id: String,

    #[tabled(rename = "EMAIL")]
    pub email: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "ROLE")]
    pub role: String,

    #[tabled(rename = "VERIFIED")]
    pub verified: String,

    #[tabled(rename = "CREATED")]
    pub created: String,
}

impl From<AdminUser> for UserDisplay {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: or_dash(user.name.as_deref()),
            role: user.role.unwrap_or_else(|| "user".to_string()),
            verified: if user.verified { "yes" } else { "no" }.to_string(),
            created: format_date(user.created_at.as_deref()),
        }
    }
}

/// Whitelist/blacklist row
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct EntryDisplay {
    #[tabled(rename = "ENTRY ID")]
    pub id: String,

    #[tabled(rename = "EMAIL")]
    pub email: String,

    #[tabled(rename = "REASON")]
    pub reason: String,

    #[tabled(rename = "ADDED")]
    pub added: String,
}

impl From<ListEntry> for EntryDisplay {
    fn from(entry: ListEntry) -> Self {
        Self {
            id: entry.id,
            email: entry.email,
            reason: or_dash(entry.reason.as_deref()),
            added: format_date(entry.created_at.as_deref()),
        }
    }
}

/// The signed-in user's profile
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDisplay(pub UserProfile);

impl Formattable for ProfileDisplay {
    fn format(&self, format: OutputFormat) -> Result<String> {
        let profile = &self.0;
        let verified = match profile.verified {
            Some(true) => "yes",
            Some(false) => "no",
            None => "--",
        };

        match format {
            OutputFormat::Json => Ok(format_json(profile)?),
            OutputFormat::Table => Ok(format_record(&[
                ("Email", profile.email.clone()),
                ("Name", or_dash(profile.name.as_deref())),
                ("Role", or_dash(profile.role.as_deref())),
                ("Verified", verified.to_string()),
                ("Member since", format_date(profile.created_at.as_deref())),
            ])),
            OutputFormat::Pretty => {
                let mut out = format!("{}\n", profile.email.bold());
                if let Some(name) = &profile.name {
                    out.push_str(&format!("  Name:         {}\n", name));
                }
                out.push_str(&format!("  Role:         {}\n", or_dash(profile.role.as_deref())));
                let verified = match profile.verified {
                    Some(true) => "✓ verified".green().to_string(),
                    Some(false) => "✗ not verified".yellow().to_string(),
                    None => "--".dimmed().to_string(),
                };
                out.push_str(&format!("  Email:        {}\n", verified));
                out.push_str(&format!(
                    "  Member since: {}",
                    format_date(profile.created_at.as_deref())
                ));
                Ok(out)
            }
        }
    }
}

/// Current access mode
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AccessModeDisplay {
    pub mode: AccessMode,
}

impl Formattable for AccessModeDisplay {
    fn format(&self, format: OutputFormat) -> Result<String> {
        let hint = match self.mode {
            AccessMode::Open => "anyone may register and sign in",
            AccessMode::Whitelist => "only whitelisted addresses may sign in",
            AccessMode::Blacklist => "everyone except blacklisted addresses may sign in",
        };
        match format {
            OutputFormat::Json => Ok(format_json(self)?),
            OutputFormat::Table => Ok(format_record(&[
                ("Access mode", self.mode.to_string()),
                ("Meaning", hint.to_string()),
            ])),
            OutputFormat::Pretty => Ok(format!(
                "Access mode: {} ({})",
                self.mode.to_string().bold(),
                hint.dimmed()
            )),
        }
    }
}

/// Result of a command that only reports success
#[derive(Debug, Clone, Serialize)]
pub struct MessageDisplay {
    pub ok: bool,
    pub message: String,
}

impl MessageDisplay {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }
}

impl Formattable for MessageDisplay {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(format_json(self)?),
            OutputFormat::Table => Ok(self.message.clone()),
            OutputFormat::Pretty if self.ok => Ok(format!("{} {}", "✓".green(), self.message)),
            OutputFormat::Pretty => Ok(format!("{} {}", "✗".red(), self.message)),
        }
    }
}

/// Session and configuration status
#[derive(Debug, Clone, Serialize)]
pub struct StatusDisplay {
    pub config_path: String,
    pub api_host: String,
    pub language: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_in: Option<String>,
    pub remember_device: bool,
    pub sync: String,
}

impl Formattable for StatusDisplay {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(format_json(self)?),
            OutputFormat::Table => Ok(format_record(&[
                ("Config file", self.config_path.clone()),
                ("API host", self.api_host.clone()),
                ("Language", self.language.clone()),
                ("Session", self.state.clone()),
                ("Signed in as", or_dash(self.email.as_deref())),
                ("Token expires in", or_dash(self.token_expires_in.as_deref())),
                ("Window sync", self.sync.clone()),
            ])),
            OutputFormat::Pretty => {
                let mut out = format!("{}\n\n", "Portal Status".bold());
                out.push_str(&format!("Config file: {}\n", self.config_path.cyan()));
                out.push_str(&format!("API host:    {}\n", self.api_host));
                out.push_str(&format!("Language:    {}\n\n", self.language));

                if self.state == "authenticated" {
                    let who = self.email.as_deref().unwrap_or("unknown user");
                    out.push_str(&format!("{} Signed in as {}\n", "✓".green(), who.bold()));
                    if let Some(expires) = &self.token_expires_in {
                        out.push_str(&format!("  Access token expires in {}\n", expires));
                    }
                } else {
                    out.push_str(&format!("{} Not signed in\n", "✗".red()));
                    out.push_str("  → Run 'portal login' to sign in\n");
                }
                if self.remember_device {
                    out.push_str(&format!("{} Device is remembered on login\n", "○".dimmed()));
                }
                out.push_str(&format!("{} Window sync via {}", "○".dimmed(), self.sync));
                Ok(out)
            }
        }
    }
}

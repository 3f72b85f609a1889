//! Reusable formatting utilities for CLI output

use chrono::{DateTime, Local, Utc};

/// Format a remaining duration as `2h 15m`, `5m 10s` or `45s`.
///
/// Returns "expired" for zero or negative durations.
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let secs = remaining.num_seconds();
    if secs <= 0 {
        return "expired".to_string();
    }

    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Time left until `expires_at`, from now.
pub fn format_expiry(expires_at: DateTime<Utc>) -> String {
    format_remaining(expires_at.signed_duration_since(Utc::now()))
}

/// Render a server timestamp in local time, or pass it through unchanged
/// when it is not RFC 3339.
///
/// # Example output
/// `2025-01-15 14:30`
pub fn format_date(raw: Option<&str>) -> String {
    match raw {
        None | Some("") => "--".to_string(),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| raw.to_string()),
    }
}

/// Dash for missing optional text.
pub fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or("--")
        .to_string()
}

//! Administration models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::string_or_number;

/// A collection response, either a bare array or wrapped in an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Items(Vec<T>),
    Wrapped {
        #[serde(
            alias = "users",
            alias = "entries",
            alias = "items",
            alias = "whitelist",
            alias = "blacklist"
        )]
        data: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Items(items) | Listing::Wrapped { data: items } => items,
        }
    }
}

/// A user as seen by an administrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, alias = "emailVerified", alias = "isVerified")]
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body for creating a user
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Body for updating a user; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.verified.is_none()
    }
}

/// A whitelist or blacklist entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(alias = "value", alias = "pattern")]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body for adding a list entry
#[derive(Debug, Clone, Serialize)]
pub struct ListEntryRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Who may sign up or sign in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Anyone
    Open,
    /// Only whitelisted addresses
    Whitelist,
    /// Anyone except blacklisted addresses
    Blacklist,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccessMode::Open => "open",
            AccessMode::Whitelist => "whitelist",
            AccessMode::Blacklist => "blacklist",
        };
        f.write_str(label)
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(AccessMode::Open),
            "whitelist" => Ok(AccessMode::Whitelist),
            "blacklist" => Ok(AccessMode::Blacklist),
            other => Err(format!(
                "unknown access mode '{}' (expected open, whitelist or blacklist)",
                other
            )),
        }
    }
}

/// `{mode}` body of the access-mode endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessModeSetting {
    pub mode: AccessMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_accepts_bare_and_wrapped() {
        let bare: Listing<AdminUser> =
            serde_json::from_str(r#"[{"id":1,"email":"a@b.io"}]"#).unwrap();
        assert_eq!(bare.into_vec()[0].id, "1");

        let wrapped: Listing<AdminUser> =
            serde_json::from_str(r#"{"users":[{"id":"u2","email":"c@d.io","verified":true}]}"#)
                .unwrap();
        let users = wrapped.into_vec();
        assert_eq!(users[0].id, "u2");
        assert!(users[0].verified);
    }

    #[test]
    fn test_list_entry_aliases() {
        let entry: ListEntry =
            serde_json::from_str(r#"{"id":7,"value":"*@corp.io","reason":"partner"}"#).unwrap();
        assert_eq!(entry.email, "*@corp.io");
        assert_eq!(entry.reason.as_deref(), Some("partner"));
    }

    #[test]
    fn test_access_mode_parsing() {
        assert_eq!("Whitelist".parse::<AccessMode>().unwrap(), AccessMode::Whitelist);
        assert!("closed".parse::<AccessMode>().is_err());

        let setting: AccessModeSetting = serde_json::from_str(r#"{"mode":"blacklist"}"#).unwrap();
        assert_eq!(setting.mode, AccessMode::Blacklist);
        assert_eq!(
            serde_json::to_string(&AccessModeSetting { mode: AccessMode::Open }).unwrap(),
            r#"{"mode":"open"}"#
        );
    }

    #[test]
    fn test_update_user_request_emptiness() {
        assert!(UpdateUserRequest::default().is_empty());
        let update = UpdateUserRequest {
            role: Some("admin".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), serde_json::json!({"role": "admin"}));
    }
}

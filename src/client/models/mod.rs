//! Portal API data models
//!
//! Request and response bodies, organized by API area. Field names follow the
//! server's camelCase JSON.

mod admin;
mod auth;
mod user;

pub use admin::{
    AccessMode, AccessModeSetting, AdminUser, CreateUserRequest, ListEntry, ListEntryRequest,
    Listing, UpdateUserRequest,
};
pub use auth::{
    Credentials, EmailRequest, RegisterRequest, ResetPasswordRequest, TokenResponse,
    VerifyRequest,
};
pub use user::{ProfileUpdate, UserProfile};

use serde::{Deserialize, Deserializer};

/// Accept an identifier sent either as a string or as a number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

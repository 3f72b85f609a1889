//! Authentication models

use serde::{Deserialize, Serialize};

use crate::session::{AccessToken, is_well_formed};

/// Login request body
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,

    pub password: String,

    /// Keep the refresh cookie beyond the browser session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_device: Option<bool>,

    /// How long a remembered device stays signed in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_days: Option<u32>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember_device: None,
            remember_days: None,
        }
    }

    /// Ask the server to remember this device for `days`.
    pub fn remember(mut self, days: u32) -> Self {
        self.remember_device = Some(true);
        self.remember_days = Some(days);
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember_device", &self.remember_device)
            .field("remember_days", &self.remember_days)
            .finish()
    }
}

/// `{accessToken}` body returned by login and refresh
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default, alias = "access_token", alias = "token")]
    pub access_token: Option<String>,
}

impl TokenResponse {
    /// The token, when present and shaped like a JWT.
    pub fn into_token(self) -> Option<AccessToken> {
        self.access_token
            .filter(|raw| !raw.is_empty() && is_well_formed(raw))
            .map(AccessToken::new)
    }
}

/// Account registration body
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Email verification body
#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Body carrying only an email (resend verification, forgot password)
#[derive(Debug, Clone, Serialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Password reset body
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

impl std::fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetPasswordRequest").finish_non_exhaustive()
    }
}

//! OAuth2 redirect callback parsing
//!
//! The provider sends the browser back to `/oauth/callback` with the tokens
//! in the fragment (`#access_token=..&refresh_token=..`) or with an `error`
//! query parameter.

use thiserror::Error;
use url::Url;

use crate::session::{AccessToken, is_well_formed};

/// Tokens carried by a successful callback
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackTokens {
    pub access: AccessToken,
    pub refresh: String,
}

impl std::fmt::Debug for CallbackTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTokens")
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Why a callback was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("not a callback URL: {0}")]
    InvalidUrl(String),

    #[error("provider returned an error: {0}")]
    Provider(String),

    #[error("callback carries no tokens")]
    MissingTokens,

    #[error("callback fragment is not valid URL encoding")]
    MalformedEncoding,

    #[error("callback tokens are not JWTs")]
    NotJwt,

    #[error("callback access token has expired")]
    Expired,
}

/// True when every `%` starts a two-digit hex escape.
fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Extract the tokens from an OAuth callback location.
///
/// Accepts an absolute URL or a path such as `/oauth/callback#access_token=..`.
pub fn parse_callback(callback: &str) -> Result<CallbackTokens, CallbackError> {
    let url = match Url::parse(callback) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost")
            .and_then(|base| base.join(callback))
            .map_err(|e| CallbackError::InvalidUrl(e.to_string()))?,
        Err(e) => return Err(CallbackError::InvalidUrl(e.to_string())),
    };

    if let Some((_, error)) = url.query_pairs().find(|(key, _)| key == "error") {
        return Err(CallbackError::Provider(error.into_owned()));
    }

    let fragment = url.fragment().unwrap_or_default();
    if fragment.is_empty() {
        return Err(CallbackError::MissingTokens);
    }
    if !has_valid_escapes(fragment) {
        return Err(CallbackError::MalformedEncoding);
    }

    let mut access = None;
    let mut refresh = None;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" | "accessToken" => access = Some(value.into_owned()),
            "refresh_token" | "refreshToken" => refresh = Some(value.into_owned()),
            _ => {}
        }
    }

    let (Some(access), Some(refresh)) = (
        access.filter(|t| !t.is_empty()),
        refresh.filter(|t| !t.is_empty()),
    ) else {
        return Err(CallbackError::MissingTokens);
    };

    if !is_well_formed(&access) || !is_well_formed(&refresh) {
        return Err(CallbackError::NotJwt);
    }

    let access = AccessToken::new(access);
    if access.is_expired() {
        return Err(CallbackError::Expired);
    }

    Ok(CallbackTokens { access, refresh })
}

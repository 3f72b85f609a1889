//! In-memory access token holder and unverified JWT expiry checks
//!
//! Expiry is read from the token payload without verifying the signature.
//! It is advisory only: it keeps obviously stale tokens off the wire. Every
//! malformed input counts as expired.

use std::fmt;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Decode base64url (URL-safe base64, padding optional)
fn base64_decode_url(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim_end_matches('=');
    if trimmed.len() % 4 == 1 {
        return None;
    }
    general_purpose::URL_SAFE_NO_PAD.decode(trimmed).ok()
}

/// True when `token` has exactly three non-empty dot-separated segments.
pub fn is_well_formed(token: &str) -> bool {
    let mut segments = 0;
    for part in token.split('.') {
        if part.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments == 3
}

/// Read the `exp` claim (seconds since epoch) from an unverified JWT.
pub fn expiry_seconds(token: &str) -> Option<f64> {
    if !is_well_formed(token) {
        return None;
    }
    let payload = token.split('.').nth(1)?;
    let bytes = base64_decode_url(payload)?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.as_object()?.get("exp")?.as_f64()
}

/// Whether `token` is expired (or unreadable) at `now`.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match expiry_seconds(token) {
        Some(exp) => {
            let now_secs = now.timestamp_millis() as f64 / 1000.0;
            exp <= now_secs
        }
        None => true,
    }
}

/// Whether `token` is expired (or unreadable) right now.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

/// Opaque bearer token. The raw value never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        is_well_formed(&self.0)
    }

    pub fn is_expired(&self) -> bool {
        is_expired(&self.0)
    }

    /// Expiry instant from the unverified payload
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = expiry_seconds(&self.0)?;
        DateTime::from_timestamp_millis((exp * 1000.0) as i64)
    }

    /// Short SHA-256 fingerprint, safe to write to shared storage.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({}…)", self.fingerprint())
    }
}

/// Holds the current access token in memory only.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: RwLock<Option<AccessToken>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<AccessToken> {
        self.current.read().await.clone()
    }

    /// Current token, only if it has not expired.
    pub async fn valid(&self) -> Option<AccessToken> {
        self.get().await.filter(|token| !token.is_expired())
    }

    pub async fn set(&self, token: AccessToken) {
        *self.current.write().await = Some(token);
    }

    pub async fn clear(&self) -> Option<AccessToken> {
        self.current.write().await.take()
    }
}

/// Build an unsigned JWT with the given `exp`, for tests.
#[cfg(test)]
pub(crate) fn test_jwt(exp: i64, subject: &str) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD
        .encode(format!(r#"{{"sub":"{}","exp":{}}}"#, subject, exp));
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    #[test]
    fn test_malformed_tokens_are_expired() {
        let payload = encode(r#"{"exp":99999999999}"#);
        let cases = [
            String::new(),
            "abc".to_string(),
            "a.b".to_string(),
            "a.b.c.d".to_string(),
            format!(".{}.sig", payload),
            format!("hdr.{}.", payload),
            "hdr..sig".to_string(),
            "hdr.%%%%.sig".to_string(),
            format!("hdr.{}.sig", encode("not json")),
            format!("hdr.{}.sig", encode("[1,2,3]")),
            format!("hdr.{}.sig", encode(r#"{"sub":"x"}"#)),
            format!("hdr.{}.sig", encode(r#"{"exp":"tomorrow"}"#)),
            format!("hdr.{}.sig", encode(r#"{"exp":null}"#)),
        ];

        for token in &cases {
            assert!(is_expired(token), "expected {:?} to be expired", token);
        }
    }

    #[test]
    fn test_well_formed_shape() {
        assert!(is_well_formed("a.b.c"));
        assert!(!is_well_formed("a.b"));
        assert!(!is_well_formed("a..c"));
        assert!(!is_well_formed("a.b.c.d"));
        assert!(!is_well_formed(""));
    }

    #[test]
    fn test_future_expiry_is_valid() {
        let exp = Utc::now().timestamp() + 3600;
        assert!(!is_expired(&test_jwt(exp, "alice")));
    }

    #[test]
    fn test_expiry_equal_to_now_is_expired() {
        let exp = 1_700_000_000;
        let token = test_jwt(exp, "alice");
        let now = DateTime::from_timestamp(exp, 0).unwrap();

        assert!(is_expired_at(&token, now));
        assert!(is_expired_at(&token, now + chrono::Duration::seconds(1)));
        assert!(!is_expired_at(&token, now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let exp = Utc::now().timestamp() + 60;
        let payload = general_purpose::URL_SAFE.encode(format!(r#"{{"exp":{}}}"#, exp));
        let token = format!("hdr.{}.sig", payload);
        assert!(!is_expired(&token));
    }

    #[test]
    fn test_fractional_expiry() {
        let exp = Utc::now().timestamp() as f64 + 120.5;
        let token = format!("hdr.{}.sig", encode(&format!(r#"{{"exp":{}}}"#, exp)));
        assert!(!is_expired(&token));
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new(test_jwt(1, "secret-subject"));
        let debug = format!("{:?}", token);
        assert!(!debug.contains(token.as_str()));
        assert_eq!(token.fingerprint().len(), 16);
    }

    #[test]
    fn test_expires_at_reads_claim() {
        let token = AccessToken::new(test_jwt(1_700_000_000, "bob"));
        assert_eq!(token.expires_at().unwrap().timestamp(), 1_700_000_000);
        assert!(AccessToken::new("opaque").expires_at().is_none());
    }

    #[tokio::test]
    async fn test_token_store_lifecycle() {
        let store = TokenStore::new();
        assert!(store.get().await.is_none());

        let expired = AccessToken::new(test_jwt(Utc::now().timestamp() - 10, "old"));
        store.set(expired.clone()).await;
        assert_eq!(store.get().await, Some(expired.clone()));
        assert!(store.valid().await.is_none());

        let fresh = AccessToken::new(test_jwt(Utc::now().timestamp() + 600, "new"));
        store.set(fresh.clone()).await;
        assert_eq!(store.valid().await, Some(fresh.clone()));

        assert_eq!(store.clear().await, Some(fresh));
        assert!(store.get().await.is_none());
    }
}

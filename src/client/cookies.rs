//! Cookie jar for the portal API host
//!
//! The client only talks to one host, so cookies are kept by name without
//! domain or path scoping. The jar is shared by every tab of a process and
//! can be snapshotted into the config file between CLI runs.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use cookie::Cookie;
use reqwest::Url;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use time::{Duration, OffsetDateTime};

/// Cookie carrying the anti-forgery token
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Name → value cookie storage
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<BTreeMap<String, String>>,
}

/// Name and value of a `Set-Cookie` header, with `None` as the value when
/// the header deletes the cookie (empty value, `Max-Age` of zero or less, or
/// an `Expires` in the past).
fn parse_set_cookie(header: &str) -> Option<(String, Option<String>)> {
    let cookie = Cookie::parse(header).ok()?;
    let value = cookie.value().trim_matches('"');

    let expired = cookie.max_age().is_some_and(|age| age <= Duration::ZERO)
        || cookie
            .expires_datetime()
            .is_some_and(|at| at <= OffsetDateTime::now_utc());

    let value = (!expired && !value.is_empty()).then(|| value.to_string());
    Some((cookie.name().to_string(), value))
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a jar from a persisted snapshot.
    pub fn from_snapshot(cookies: BTreeMap<String, String>) -> Self {
        Self {
            cookies: RwLock::new(cookies),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Anti-forgery token, when the server has set one.
    pub fn csrf_token(&self) -> Option<String> {
        self.get(CSRF_COOKIE).filter(|token| !token.is_empty())
    }

    pub fn insert(&self, name: &str, value: &str) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }

    pub fn clear(&self) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        for header in cookie_headers {
            let Some((name, value)) = header.to_str().ok().and_then(parse_set_cookie) else {
                continue;
            };
            match value {
                Some(value) => cookies.insert(name, value),
                None => cookies.remove(&name),
            };
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        if cookies.is_empty() {
            return None;
        }
        let header = cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&header).ok()
    }
}

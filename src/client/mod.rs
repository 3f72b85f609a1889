//! Portal API client
//!
//! [`ApiClient`] wraps `reqwest` with the session's bearer token, the active
//! language and anti-forgery header, and the single-flight refresh protocol.
//! The endpoint surface is split into the [`AuthApi`], [`ProfileApi`] and
//! [`AdminApi`] traits.

pub mod api;
pub mod cookies;
pub mod http;
pub mod models;
pub mod oauth;
pub mod request;

pub use api::{AccessList, AdminApi, AuthApi, ProfileApi};
pub use cookies::{CSRF_COOKIE, CookieJar, REFRESH_COOKIE};
pub use http::{ApiClient, DEFAULT_API_HOST, RefreshTrigger};
pub use oauth::{CallbackError, CallbackTokens, parse_callback};
pub use request::{ApiRequest, REFRESH_PATH};

/// The full portal API surface
pub trait PortalApi: AuthApi + ProfileApi + AdminApi {}

impl<T: AuthApi + ProfileApi + AdminApi> PortalApi for T {}

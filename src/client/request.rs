//! Replayable API request description

use reqwest::Method;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Path of the token refresh endpoint
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// A request that can be sent, and sent again after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    retried: bool,
    credential_exchange: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retried: false,
            credential_exchange: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Mark as a credential exchange (login, logout, password flows...).
    ///
    /// A 401 from such a request is the answer itself, so it never triggers
    /// a token refresh.
    pub fn credential_exchange(mut self) -> Self {
        self.credential_exchange = true;
        self
    }

    pub fn is_credential_exchange(&self) -> bool {
        self.credential_exchange
    }

    pub fn is_refresh(&self) -> bool {
        self.path == REFRESH_PATH
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Whether a 401 for this request may trigger a refresh and replay.
    pub fn may_refresh(&self) -> bool {
        !self.is_refresh() && !self.credential_exchange && !self.retried
    }
}

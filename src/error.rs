//! Error types for the portal client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for HTTP-level operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Generic message for failed sign-ins; never reveals whether the account exists
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";

/// Generic message for failed OAuth callbacks
pub const OAUTH_FAILED_MESSAGE: &str = "Sign-in failed. Please try again.";

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Validation(String),

    /// A rejected sign-in or a command not available in the current session
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    OAuth(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// API-related errors
///
/// `Clone` so a single refresh failure can be handed to every caller that was
/// queued behind it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Not signed in. Run `portal login` to sign in.")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Access token is malformed or expired")]
    InvalidToken,

    #[error("Your session has expired. Run `portal login` to sign in again.")]
    SessionExpired,
}

impl ApiError {
    /// Map a non-success status and its body to an error.
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let message = extract_message(body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(message.unwrap_or_else(|| "permission denied".to_string())),
            404 => ApiError::NotFound(message.unwrap_or_else(|| "resource not found".to_string())),
            409 => ApiError::Conflict(message.unwrap_or_else(|| "conflict".to_string())),
            429 => ApiError::RateLimit(retry_after.unwrap_or(Duration::from_secs(60))),
            400 | 422 => ApiError::BadRequest(message.unwrap_or_else(|| "bad request".to_string())),
            s if s >= 500 => ApiError::ServerError {
                status: s,
                message: message.unwrap_or_else(|| "internal server error".to_string()),
            },
            s => ApiError::InvalidResponse(format!("Unexpected status code: {}", s)),
        }
    }

    /// Whether the failure points at the server or the network rather than
    /// at the caller. Only these are worth logging.
    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            ApiError::ServerError { .. } | ApiError::Network(_) | ApiError::InvalidResponse(_)
        )
    }

    /// Message suitable for showing to an end user after a sign-in attempt.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized | ApiError::InvalidToken => {
                INVALID_CREDENTIALS_MESSAGE.to_string()
            }
            ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::RateLimit(_) => "Too many attempts. Please wait and try again.".to_string(),
            ApiError::ServerError { .. } | ApiError::Network(_) | ApiError::InvalidResponse(_) => {
                "The server could not be reached. Please try again later.".to_string()
            }
            ApiError::SessionExpired => self.to_string(),
        }
    }
}

/// Pull a human-readable message out of an error payload.
///
/// Accepts a bare JSON string, an object with a string `message` (or `error`)
/// field, or short plain text.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Ok(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|field| map.get(*field).and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Ok(_) => None,
        Err(_) if !trimmed.starts_with('<') && trimmed.len() <= 200 => Some(trimmed.to_string()),
        Err(_) => None,
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Shared session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Session store I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_unauthorized_message() {
        let err = ApiError::Unauthorized;
        assert!(err.to_string().contains("portal login"));
    }

    #[test]
    fn test_from_status_maps_known_codes() {
        assert!(matches!(ApiError::from_status(401, "", None), ApiError::Unauthorized));
        assert!(matches!(
            ApiError::from_status(403, r#"{"message":"blocked"}"#, None),
            ApiError::Forbidden(ref m) if m == "blocked"
        ));
        assert!(matches!(ApiError::from_status(404, "", None), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(409, "", None), ApiError::Conflict(_)));
        assert!(matches!(
            ApiError::from_status(422, "\"bad email\"", None),
            ApiError::BadRequest(ref m) if m == "bad email"
        ));
        assert!(matches!(
            ApiError::from_status(503, "", None),
            ApiError::ServerError { status: 503, .. }
        ));
    }

    #[test]
    fn test_rate_limit_uses_retry_after() {
        let err = ApiError::from_status(429, "", Some(Duration::from_secs(30)));
        let msg = err.to_string();
        assert!(msg.contains("Rate limit"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_extract_message_variants() {
        assert_eq!(extract_message("\"plain\""), Some("plain".to_string()));
        assert_eq!(
            extract_message(r#"{"message":"Email not verified"}"#),
            Some("Email not verified".to_string())
        );
        assert_eq!(
            extract_message(r#"{"error":"locked"}"#),
            Some("locked".to_string())
        );
        assert_eq!(extract_message(r#"{"code":17}"#), None);
        assert_eq!(extract_message(""), None);
        assert_eq!(extract_message("<html>oops</html>"), None);
        assert_eq!(extract_message("nope"), Some("nope".to_string()));
    }

    #[test]
    fn test_user_message_is_generic_for_rejections() {
        assert_eq!(ApiError::Unauthorized.user_message(), INVALID_CREDENTIALS_MESSAGE);
        assert_eq!(
            ApiError::Forbidden("Please verify your email".to_string()).user_message(),
            "Please verify your email"
        );
        let server = ApiError::ServerError {
            status: 500,
            message: "stack trace".to_string(),
        };
        assert!(!server.user_message().contains("stack trace"));
    }

    #[test]
    fn test_server_side_classification() {
        assert!(ApiError::Network("down".to_string()).is_server_side());
        assert!(
            ApiError::ServerError {
                status: 502,
                message: String::new()
            }
            .is_server_side()
        );
        assert!(!ApiError::Unauthorized.is_server_side());
        assert!(!ApiError::BadRequest("x".to_string()).is_server_side());
    }

    #[test]
    fn test_error_from_api_error() {
        let err: Error = ApiError::Unauthorized.into();
        match err {
            Error::Api(ApiError::Unauthorized) => (),
            _ => panic!("Expected Error::Api(ApiError::Unauthorized)"),
        }
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_str = "invalid: [yaml: content";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }
}

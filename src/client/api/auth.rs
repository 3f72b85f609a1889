//! Authentication API trait

use async_trait::async_trait;

use crate::client::http::{ApiClient, path_segment};
use crate::client::models::{
    Credentials, EmailRequest, RegisterRequest, ResetPasswordRequest, TokenResponse,
    VerifyRequest,
};
use crate::client::request::ApiRequest;
use crate::error::{ApiError, ApiResult};
use crate::session::AccessToken;

/// Authentication operations for the portal API
///
/// Everything except `check_access` is a credential exchange: a 401 is the
/// server's answer and never triggers a token refresh.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for an access token
    async fn login(&self, credentials: &Credentials) -> ApiResult<AccessToken>;

    /// End the server-side session
    async fn logout(&self) -> ApiResult<()>;

    /// Create an account; returns the server's confirmation message
    async fn register(&self, request: &RegisterRequest) -> ApiResult<Option<String>>;

    /// Confirm an email address with the emailed token
    async fn verify_email(&self, token: &str) -> ApiResult<Option<String>>;

    /// Send the verification email again
    async fn resend_verification(&self, email: &str) -> ApiResult<Option<String>>;

    /// Start a password reset
    async fn forgot_password(&self, email: &str) -> ApiResult<Option<String>>;

    /// Finish a password reset
    async fn reset_password(&self, request: &ResetPasswordRequest) -> ApiResult<Option<String>>;

    /// Whether the current user may use `resource`
    async fn check_access(&self, resource: &str) -> ApiResult<bool>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> ApiResult<AccessToken> {
        self.ensure_csrf().await;
        let request = ApiRequest::post("/api/auth/login")
            .json(credentials)?
            .credential_exchange();
        let response: TokenResponse = self.send_json(request).await?;
        response.into_token().ok_or(ApiError::InvalidToken)
    }

    async fn logout(&self) -> ApiResult<()> {
        self.ensure_csrf().await;
        let request = ApiRequest::post("/api/auth/logout").credential_exchange();
        self.send_message(request).await.map(|_| ())
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<Option<String>> {
        self.ensure_csrf().await;
        let request = ApiRequest::post("/api/auth/register")
            .json(request)?
            .credential_exchange();
        self.send_message(request).await
    }

    async fn verify_email(&self, token: &str) -> ApiResult<Option<String>> {
        let request = ApiRequest::post("/api/auth/verify")
            .json(&VerifyRequest {
                token: token.to_string(),
            })?
            .credential_exchange();
        self.send_message(request).await
    }

    async fn resend_verification(&self, email: &str) -> ApiResult<Option<String>> {
        self.ensure_csrf().await;
        let request = ApiRequest::post("/api/auth/resend-verification")
            .json(&EmailRequest {
                email: email.to_string(),
            })?
            .credential_exchange();
        self.send_message(request).await
    }

    async fn forgot_password(&self, email: &str) -> ApiResult<Option<String>> {
        self.ensure_csrf().await;
        let request = ApiRequest::post("/api/auth/forgot-password")
            .json(&EmailRequest {
                email: email.to_string(),
            })?
            .credential_exchange();
        self.send_message(request).await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> ApiResult<Option<String>> {
        self.ensure_csrf().await;
        let request = ApiRequest::post("/api/auth/reset-password")
            .json(request)?
            .credential_exchange();
        self.send_message(request).await
    }

    async fn check_access(&self, resource: &str) -> ApiResult<bool> {
        let path = format!("/api/auth/check-access/{}", path_segment(resource));
        match self.execute(ApiRequest::get(path)).await {
            Ok(_) => Ok(true),
            Err(
                ApiError::Unauthorized
                | ApiError::Forbidden(_)
                | ApiError::NotFound(_)
                | ApiError::SessionExpired,
            ) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cookies::CookieJar;
    use crate::session::token::test_jwt;
    use crate::session::{HistoryNavigator, Session, routes};
    use crate::store::{MemoryStore, StoreHandle, TabId};
    use mockito::Matcher;
    use std::sync::Arc;

    fn client(url: &str) -> ApiClient {
        let store = StoreHandle::new(MemoryStore::new_shared(), TabId::generate());
        let session = Session::new(store, Arc::new(HistoryNavigator::new(routes::LOGIN)));
        let cookies = Arc::new(CookieJar::new());
        cookies.insert("XSRF-TOKEN", "csrf");
        ApiClient::new(url, "en", cookies, session).unwrap()
    }

    #[tokio::test]
    async fn test_login_sends_credentials() {
        let mut server = mockito::Server::new_async().await;
        let token = test_jwt(4_000_000_000, "alice");
        let mock = server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::Json(serde_json::json!({
                "email": "alice@example.com",
                "password": "s3cretpass",
                "rememberDevice": true,
                "rememberDays": 30
            })))
            .with_status(200)
            .with_body(format!(r#"{{"accessToken":"{}"}}"#, token))
            .create_async()
            .await;

        let credentials = Credentials::new("alice@example.com", "s3cretpass").remember(30);
        let received = client(&server.url()).login(&credentials).await.unwrap();
        assert_eq!(received.as_str(), token);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_rejects_opaque_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_body(r#"{"accessToken":"opaque"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .login(&Credentials::new("a@b.io", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn test_register_returns_server_message() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/auth/register")
            .with_status(201)
            .with_body(r#"{"message":"Check your inbox"}"#)
            .create_async()
            .await;

        let message = client(&server.url())
            .register(&RegisterRequest {
                email: "a@b.io".to_string(),
                password: "passw0rd!".to_string(),
                name: None,
            })
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some("Check your inbox"));
    }

    #[tokio::test]
    async fn test_check_access_maps_denial_to_false() {
        let mut server = mockito::Server::new_async().await;
        let _allowed = server
            .mock("GET", "/api/auth/check-access/admin")
            .with_status(200)
            .create_async()
            .await;
        let _denied = server
            .mock("GET", "/api/auth/check-access/billing")
            .with_status(403)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/api/auth/check-access/reports")
            .with_status(500)
            .create_async()
            .await;

        let client = client(&server.url());
        assert!(client.check_access("admin").await.unwrap());
        assert!(!client.check_access("billing").await.unwrap());
        assert!(client.check_access("reports").await.is_err());
    }
}

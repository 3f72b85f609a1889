//! Portal API HTTP client
//!
//! Every request carries the bearer token (when present and unexpired), the
//! active language and the anti-forgery token. A 401 on an ordinary request
//! runs the single-flight refresh through the session's [`RefreshGate`] and
//! replays the request once with the new token.
//!
//! [`RefreshGate`]: crate::session::RefreshGate

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT_LANGUAGE, RETRY_AFTER};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::cookies::CookieJar;
use super::models::TokenResponse;
use super::request::{ApiRequest, REFRESH_PATH};
use crate::error::{ApiError, ApiResult, extract_message};
use crate::session::{AccessToken, RefreshOutcome, Session};

/// API host used when nothing else is configured
pub const DEFAULT_API_HOST: &str = "http://localhost:8080";

/// Header echoing the anti-forgery cookie
pub const CSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Endpoint that primes the anti-forgery cookie
pub const CSRF_PATH: &str = "/api/auth/csrf";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Primary language subtag: `en` from `en-US`, `pt` from `pt_BR.UTF-8`.
pub fn primary_language(tag: &str) -> String {
    tag.split(&['-', '_', '.', '@'][..])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "en".to_string())
}

/// Percent-encode a single path segment.
pub fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Why a refresh is being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// A request came back 401; failure sends the tab to the login page
    Unauthorized,
    /// Session start or cross-tab revalidation; failure just means signed out
    Bootstrap,
}

/// Portal API client bound to one session
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    locale: String,
    cookies: Arc<CookieJar>,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a client for `base_url` speaking `language`.
    pub fn new(
        base_url: &str,
        language: &str,
        cookies: Arc<CookieJar>,
        session: Arc<Session>,
    ) -> ApiResult<Self> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_provider(cookies.clone())
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            locale: primary_language(language),
            cookies,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn cookies(&self) -> &Arc<CookieJar> {
        &self.cookies
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request`, refreshing the session and replaying once on a 401.
    pub async fn execute(&self, mut request: ApiRequest) -> ApiResult<Response> {
        let sent_epoch = self.session.gate().epoch();
        let bearer = self.session.tokens().valid().await;
        let response = self.dispatch(&request, bearer.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.may_refresh() {
            return self.finish(&request, response).await;
        }

        request.mark_retried();
        log::debug!("{} {} returned 401; refreshing session", request.method, request.path);

        let token = self.recover(sent_epoch).await?;
        let replay = self.dispatch(&request, Some(&token)).await?;
        self.finish(&request, replay).await
    }

    /// Send `request` and decode a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Send `request` and return the server's message, if it sent one.
    pub async fn send_message(&self, request: ApiRequest) -> ApiResult<Option<String>> {
        let response = self.execute(request).await?;
        let body = response.text().await.unwrap_or_default();
        Ok(extract_message(&body))
    }

    /// Token to replay with after a 401 for a request sent at `sent_epoch`.
    async fn recover(&self, sent_epoch: u64) -> ApiResult<AccessToken> {
        // A refresh finished while this request was on the wire: its 401 was
        // for the old token, so reuse the outcome instead of refreshing again.
        if self.session.gate().settled_since(sent_epoch) {
            return match self.session.tokens().get().await {
                Some(token) => {
                    log::debug!("Token rotated while request was in flight; replaying");
                    Ok(token)
                }
                None => Err(ApiError::SessionExpired),
            };
        }
        self.refresh_session(RefreshTrigger::Unauthorized).await
    }

    /// Obtain a new access token, joining a refresh already in flight.
    ///
    /// The caller that performs the refresh clears the session when it fails
    /// and, for [`RefreshTrigger::Unauthorized`], redirects to the login page
    /// unless the tab is already there.
    pub async fn refresh_session(&self, trigger: RefreshTrigger) -> ApiResult<AccessToken> {
        let flight = self.session.gate().run(|| self.perform_refresh()).await;

        match flight.outcome {
            Ok(token) => Ok(token),
            Err(err) => {
                if flight.led {
                    match trigger {
                        RefreshTrigger::Unauthorized => {
                            log::warn!("Session refresh failed: {}", err);
                            self.session.clear().await;
                            self.session.redirect_to_login();
                        }
                        RefreshTrigger::Bootstrap => {
                            log::debug!("No session to resume: {}", err);
                            self.session.clear().await;
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        self.ensure_csrf().await;

        let request = ApiRequest::post(REFRESH_PATH);
        let bearer = self.session.tokens().valid().await;
        let response = self.dispatch(&request, bearer.as_ref()).await?;
        let response = self.finish(&request, response).await?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse refresh response: {}", e)))?;
        let token = body.into_token().ok_or_else(|| {
            ApiError::InvalidResponse("refresh response carried no usable access token".to_string())
        })?;

        self.session.establish(token.clone()).await;
        log::debug!("Access token refreshed");
        Ok(token)
    }

    /// Make sure an anti-forgery cookie exists. Failures are ignored.
    pub async fn ensure_csrf(&self) {
        if self.cookies.csrf_token().is_some() {
            return;
        }

        let request = ApiRequest::get(CSRF_PATH).credential_exchange();
        let result = match self.dispatch(&request, None).await {
            Ok(response) => self.finish(&request, response).await.map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            log::debug!("Could not prime anti-forgery token: {}", err);
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> ApiResult<Response> {
        let url = self.url(&request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(ACCEPT_LANGUAGE, self.locale.as_str());

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(csrf) = self.cookies.csrf_token() {
            builder = builder.header(CSRF_HEADER, csrf);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|err| {
            log::error!("{} {} failed, no response received: {}", request.method, url, err);
            ApiError::from(err)
        })
    }

    async fn finish(&self, request: &ApiRequest, response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if request.is_refresh()
            && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        {
            log::debug!("Refresh endpoint returned {}; no active session", status);
            self.session.clear().await;
            return Err(ApiError::Unauthorized);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), &body, retry_after);

        if status.is_server_error() {
            log::error!(
                "{} {} returned {}: {}",
                request.method,
                self.url(&request.path),
                status,
                err
            );
        }
        Err(err)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("locale", &self.locale)
            .finish()
    }
}

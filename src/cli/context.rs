//! Command execution context
//!
//! Every command runs as one "window" onto the portal: it loads the config,
//! opens the shared session store, restores the cookie jar and builds the
//! session, API client and controller. Cookies set by the server during the
//! command are written back to the config when the context is dropped.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::{ApiClient, CookieJar};
use crate::config::Config;
use crate::error::{ApiError, Error, Result};
use crate::session::navigator::path_of;
use crate::session::{
    CrossTabBus, GuardDecision, HistoryNavigator, RouteGuard, Session, SessionController, routes,
};
use crate::store::sqlite::DEFAULT_POLL_INTERVAL;
use crate::store::{SqliteStore, StoreHandle, TabId};

/// Context for command execution
pub struct CommandContext {
    /// Loaded configuration
    pub config: Config,
    /// Where the configuration lives
    pub config_path: PathBuf,
    /// Output format preference
    pub format: OutputFormat,
    /// Session controller for this command's window
    pub controller: Arc<SessionController>,
    /// Where this window currently is
    pub navigator: Arc<HistoryNavigator>,
    store: Arc<SqliteStore>,
    watcher: Option<JoinHandle<()>>,
}

impl CommandContext {
    /// Build the context for a command that opens `route`.
    pub fn new(opts: &GlobalOptions, route: &str) -> Result<Self> {
        let config_path = Config::resolve_path(opts.config_ref())?;
        let config = Config::load_from(&config_path)?;
        let api_host = config.resolve_api_host(opts.api_host_ref());
        let language = config.resolve_language(opts.lang_ref());

        let store = SqliteStore::open_at(&Config::state_path(opts.config_ref())?)?;
        let tab = TabId::generate();
        let handle = StoreHandle::new(store.clone(), tab);

        let navigator = Arc::new(HistoryNavigator::new(route));
        let session = Session::new(handle.clone(), navigator.clone());
        let cookies = Arc::new(CookieJar::from_snapshot(config.cookies.clone()));
        let api = Arc::new(ApiClient::new(&api_host, &language, cookies, session)?);
        let controller = SessionController::new(api, CrossTabBus::storage_relay(handle));

        log::debug!(
            "Opened {} against {} (language {})",
            route,
            api_host,
            language
        );

        Ok(Self {
            config,
            config_path,
            format: opts.format,
            controller,
            navigator,
            store,
            watcher: None,
        })
    }

    pub fn client(&self) -> &ApiClient {
        self.controller.api()
    }

    pub fn session(&self) -> &Arc<Session> {
        self.controller.session()
    }

    /// Start observing changes other processes make to the shared store.
    pub fn watch_shared_store(&mut self) {
        if self.watcher.is_none() {
            self.watcher = Some(self.store.spawn_watcher(DEFAULT_POLL_INTERVAL));
        }
    }

    /// Run `guard` for `target`, turning anything but `Allow` into an error.
    pub async fn enter(&self, guard: RouteGuard, target: &str) -> Result<()> {
        match guard.evaluate(&self.controller, target).await {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Redirect(to) if path_of(&to) == routes::LOGIN => {
                Err(ApiError::Unauthorized.into())
            }
            GuardDecision::Redirect(_) => Err(Error::Auth(
                "Already signed in. Run `portal logout` first.".to_string(),
            )),
            GuardDecision::NotFound => Err(Error::Auth(
                "This command is not available for your account.".to_string(),
            )),
        }
    }

    /// Write cookies set by the server back to the config file.
    pub fn persist(&mut self) -> Result<()> {
        let cookies = self.client().cookies().snapshot();
        if cookies == self.config.cookies {
            return Ok(());
        }
        self.config.cookies = cookies;
        self.config.save_to(&self.config_path)?;
        log::debug!("Saved cookies to {}", self.config_path.display());
        Ok(())
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.controller.stop();
        if let Err(err) = self.persist() {
            log::warn!("Failed to save session cookies: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn opts(config: &std::path::Path, api_host: &str) -> GlobalOptions {
        GlobalOptions {
            format: OutputFormat::Json,
            config: Some(config.to_string_lossy().to_string()),
            api_host: Some(api_host.to_string()),
            lang: Some("en".to_string()),
        }
    }

    #[tokio::test]
    async fn test_cookies_are_persisted_on_drop() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");

        {
            let ctx = CommandContext::new(&opts(&path, "http://localhost:1"), routes::HOME).unwrap();
            ctx.client().cookies().insert("refreshToken", "r1");
        }

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cookies.get("refreshToken").map(String::as_str), Some("r1"));
        assert!(temp.path().join("state.db").exists());
    }

    #[tokio::test]
    async fn test_restored_cookies_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/refresh")
            .match_header("cookie", mockito::Matcher::Regex("refreshToken=r9".to_string()))
            .with_status(401)
            .create_async()
            .await;

        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");
        let mut config = Config::default();
        config
            .cookies
            .insert("refreshToken".to_string(), "r9".to_string());
        config
            .cookies
            .insert("XSRF-TOKEN".to_string(), "csrf".to_string());
        config.save_to(&path).unwrap();

        let ctx = CommandContext::new(&opts(&path, &server.url()), routes::PROFILE).unwrap();
        let err = ctx.enter(RouteGuard::Authenticated, routes::PROFILE).await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Unauthorized)));
        mock.assert_async().await;
    }
}

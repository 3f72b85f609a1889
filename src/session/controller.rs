//! Auth session controller
//!
//! Drives a tab's [`SessionState`]: bootstrap from a silent refresh, sign-in
//! and sign-out, OAuth callbacks, and reactions to other tabs signing in or
//! out. Other tabs are observed two ways, through the [`CrossTabBus`] and by
//! watching the session marker in the shared store.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use super::bus::{AuthEvent, AuthEventKind, CrossTabBus, Subscription};
use super::navigator::routes;
use super::{ACCESS_TOKEN_KEY, Session, SessionState};
use crate::client::http::{ApiClient, RefreshTrigger};
use crate::client::oauth::parse_callback;
use crate::client::AuthApi;
use crate::client::cookies::REFRESH_COOKIE;
use crate::error::{ApiResult, Error, OAUTH_FAILED_MESSAGE, Result};
use crate::store::StorageEvents;

pub use crate::client::models::Credentials;

/// How long a removed session marker must stay absent before this tab treats
/// it as a logout
pub const LOGOUT_RECHECK_DELAY: Duration = Duration::from_millis(300);

/// Location the tab lands on after a failed OAuth callback
pub const OAUTH_ERROR_ROUTE: &str = "/?error=oauth";

#[derive(Default)]
struct Listeners {
    subscription: Option<Subscription>,
    tasks: Vec<JoinHandle<()>>,
}

impl Listeners {
    fn stop(&mut self) {
        self.subscription = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// One tab's session controller
pub struct SessionController {
    session: Arc<Session>,
    api: Arc<ApiClient>,
    bus: CrossTabBus,
    logout_recheck: Duration,
    listeners: Mutex<Listeners>,
}

impl SessionController {
    pub fn new(api: Arc<ApiClient>, bus: CrossTabBus) -> Arc<Self> {
        Self::with_logout_recheck(api, bus, LOGOUT_RECHECK_DELAY)
    }

    /// Like [`new`](Self::new) with a custom storage-logout debounce.
    pub fn with_logout_recheck(api: Arc<ApiClient>, bus: CrossTabBus, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            session: api.session().clone(),
            api,
            bus,
            logout_recheck: delay,
            listeners: Mutex::new(Listeners::default()),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn bus(&self) -> &CrossTabBus {
        &self.bus
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Start listening to other tabs, then resolve the initial state.
    pub async fn start(self: &Arc<Self>) -> SessionState {
        self.listen();
        self.bootstrap().await
    }

    /// Resolve the session: keep a live token, otherwise try one silent
    /// refresh.
    pub async fn bootstrap(&self) -> SessionState {
        self.session.set_state(SessionState::Authenticating);
        if self.resolve().await == SessionState::Unauthenticated {
            self.session.clear().await;
        }
        self.state()
    }

    /// Bootstrap unless the state is already settled.
    pub async fn ensure_resolved(&self) -> SessionState {
        match self.state() {
            SessionState::Authenticating => self.bootstrap().await,
            settled => settled,
        }
    }

    async fn resolve(&self) -> SessionState {
        if self.session.tokens().valid().await.is_some() {
            self.session.set_state(SessionState::Authenticated);
            return SessionState::Authenticated;
        }

        match self.api.refresh_session(RefreshTrigger::Bootstrap).await {
            Ok(_) => SessionState::Authenticated,
            Err(err) => {
                if err.is_server_side() {
                    log::error!("Could not resume session: {}", err);
                }
                SessionState::Unauthenticated
            }
        }
    }

    /// Sign in with `credentials`.
    ///
    /// On failure the state is unchanged and the error's
    /// [`user_message`](crate::error::ApiError::user_message) is what to show.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<()> {
        match self.api.login(credentials).await {
            Ok(token) => {
                self.session.establish(token).await;
                self.announce(AuthEventKind::Login);
                log::info!("Signed in as {}", credentials.email);
                Ok(())
            }
            Err(err) => {
                if err.is_server_side() {
                    log::error!("Sign-in request failed: {}", err);
                }
                Err(err)
            }
        }
    }

    /// Sign out locally at once, then tell the server.
    pub async fn logout(&self) {
        self.session.clear().await;
        self.announce(AuthEventKind::Logout);

        if let Err(err) = self.api.logout().await {
            if err.is_server_side() {
                log::warn!("Server-side sign-out failed: {}", err);
            } else {
                log::debug!("Server-side sign-out rejected: {}", err);
            }
        }
        self.session.navigator().navigate(routes::HOME);
    }

    /// Finish an OAuth sign-in from the provider's redirect location.
    pub async fn complete_oauth(&self, callback_url: &str) -> Result<()> {
        match parse_callback(callback_url) {
            Ok(tokens) => {
                // Windows without the server-set cookie (the CLI) resume
                // from the fragment's refresh token.
                self.api.cookies().insert(REFRESH_COOKIE, &tokens.refresh);
                self.session.establish(tokens.access).await;
                self.announce(AuthEventKind::Login);
                self.session.navigator().navigate(routes::PROFILE);
                Ok(())
            }
            Err(err) => {
                log::debug!("Rejected OAuth callback: {}", err);
                self.session.clear().await;
                self.session.navigator().navigate(OAUTH_ERROR_ROUTE);
                Err(Error::OAuth(OAUTH_FAILED_MESSAGE.to_string()))
            }
        }
    }

    fn announce(&self, kind: AuthEventKind) {
        if let Err(err) = self.bus.publish(kind) {
            log::warn!("Failed to notify other windows: {}", err);
        }
    }

    /// Follow other tabs: bus events and removal of the session marker.
    ///
    /// Calling it again replaces the previous listeners. The spawned tasks
    /// hold only a weak reference and end when the controller is dropped.
    pub fn listen(self: &Arc<Self>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.bus.subscribe(move |event| {
            let _ = tx.send(event);
        });

        let events = tokio::spawn(Self::follow_events(Arc::downgrade(self), rx));
        let storage = tokio::spawn(Self::follow_marker(
            Arc::downgrade(self),
            self.session.store().events(),
            self.logout_recheck,
        ));

        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.stop();
        listeners.subscription = Some(subscription);
        listeners.tasks = vec![events, storage];
        log::debug!("Listening for other windows via {}", self.bus.mechanism());
    }

    /// Stop following other tabs.
    pub fn stop(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }

    async fn follow_events(this: Weak<Self>, mut rx: mpsc::UnboundedReceiver<AuthEvent>) {
        while let Some(event) = rx.recv().await {
            let Some(controller) = this.upgrade() else {
                break;
            };
            controller.on_remote_event(event).await;
        }
    }

    async fn follow_marker(
        this: Weak<Self>,
        mut changes: StorageEvents,
        delay: Duration,
    ) {
        let mut deadline: Option<Instant> = None;
        loop {
            tokio::select! {
                change = changes.recv() => {
                    let Some(change) = change else { break };
                    if change.key != ACCESS_TOKEN_KEY {
                        continue;
                    }
                    // Re-arm on every removal; a new marker disarms.
                    deadline = change.is_removal().then(|| Instant::now() + delay);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let Some(controller) = this.upgrade() else {
                        break;
                    };
                    controller.on_marker_gone().await;
                }
            }
        }
    }

    async fn on_remote_event(&self, event: AuthEvent) {
        match event.kind {
            AuthEventKind::Logout => {
                log::info!("Signed out in another window");
                self.session.clear().await;
            }
            AuthEventKind::Login => {
                let state = self.resolve().await;
                log::debug!("Signed in elsewhere; session is {}", state);
            }
        }
    }

    async fn on_marker_gone(&self) {
        match self.session.store().get(ACCESS_TOKEN_KEY) {
            Ok(Some(_)) => log::debug!("Session marker came back; ignoring removal"),
            Ok(None) => {
                if self.session.navigator().is_on(routes::LOGIN) {
                    return;
                }
                log::info!("Session ended in another window");
                self.session.clear().await;
                self.session.redirect_to_login();
            }
            Err(err) => log::warn!("Could not read session marker: {}", err),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.listeners
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("bus", &self.bus.mechanism())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cookies::CookieJar;
    use crate::client::request::REFRESH_PATH;
    use crate::error::{ApiError, INVALID_CREDENTIALS_MESSAGE};
    use crate::session::bus::BroadcastHub;
    use crate::session::token::test_jwt;
    use crate::session::{AccessToken, HistoryNavigator, Navigator};
    use crate::store::{MemoryStore, SharedStore, SqliteStore, StoreHandle, TabId};
    use chrono::Utc;
    use tempfile::tempdir;

    const RECHECK: Duration = Duration::from_millis(40);

    struct Tab {
        controller: Arc<SessionController>,
        nav: Arc<HistoryNavigator>,
    }

    fn open_tab(url: &str, store: &Arc<dyn SharedStore>, hub: &BroadcastHub, route: &str) -> Tab {
        let tab_id = TabId::generate();
        let nav = Arc::new(HistoryNavigator::new(route));
        let session = Session::new(StoreHandle::new(store.clone(), tab_id.clone()), nav.clone());
        let cookies = Arc::new(CookieJar::new());
        cookies.insert("XSRF-TOKEN", "csrf");
        let api = Arc::new(ApiClient::new(url, "en", cookies, session).unwrap());
        let controller =
            SessionController::with_logout_recheck(api, CrossTabBus::native(hub, tab_id), RECHECK);
        Tab { controller, nav }
    }

    /// A tab in its own process: private SQLite handle, storage relay bus.
    fn open_relay_tab(url: &str, store: &Arc<SqliteStore>, route: &str) -> Tab {
        let handle = StoreHandle::new(store.clone(), TabId::generate());
        let nav = Arc::new(HistoryNavigator::new(route));
        let session = Session::new(handle.clone(), nav.clone());
        let cookies = Arc::new(CookieJar::new());
        cookies.insert("XSRF-TOKEN", "csrf");
        let api = Arc::new(ApiClient::new(url, "en", cookies, session).unwrap());
        let controller = SessionController::with_logout_recheck(
            api,
            CrossTabBus::storage_relay(handle),
            RECHECK,
        );
        Tab { controller, nav }
    }

    fn jwt(sub: &str) -> String {
        test_jwt(Utc::now().timestamp() + 3600, sub)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    async fn wait_for(controller: &SessionController, state: SessionState) {
        let mut rx = controller.session().watch_state();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == state))
            .await
            .expect("state change timed out")
            .unwrap();
    }

    #[tokio::test]
    async fn test_bootstrap_with_refresh_cookie() {
        let mut server = mockito::Server::new_async().await;
        let token = jwt("alice");
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .with_status(200)
            .with_body(format!(r#"{{"accessToken":"{}"}}"#, token))
            .expect(1)
            .create_async()
            .await;

        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);

        assert_eq!(tab.controller.bootstrap().await, SessionState::Authenticated);
        assert_eq!(
            tab.controller.session().tokens().get().await,
            Some(AccessToken::new(token))
        );
        refresh.assert_async().await;
        assert_eq!(tab.nav.history().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_without_session_stays_put() {
        let mut server = mockito::Server::new_async().await;
        let _refresh = server
            .mock("POST", REFRESH_PATH)
            .with_status(401)
            .create_async()
            .await;

        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::HOME);

        assert_eq!(tab.controller.bootstrap().await, SessionState::Unauthenticated);
        assert_eq!(tab.nav.visits(routes::LOGIN), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_keeps_live_token() {
        let server = mockito::Server::new_async().await;
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);
        tab.controller
            .session()
            .tokens()
            .set(AccessToken::new(jwt("a")))
            .await;

        assert_eq!(tab.controller.ensure_resolved().await, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_login_then_bearer_on_next_request() {
        let mut server = mockito::Server::new_async().await;
        let token = jwt("alice");
        let _login = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_body(format!(r#"{{"accessToken":"{}"}}"#, token))
            .create_async()
            .await;
        let profile = server
            .mock("GET", "/api/protected/profile")
            .match_header("authorization", format!("Bearer {}", token).as_str())
            .with_status(200)
            .with_body(r#"{"email":"alice@example.com"}"#)
            .create_async()
            .await;

        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::LOGIN);

        tab.controller
            .login(&Credentials::new("alice@example.com", "passw0rd"))
            .await
            .unwrap();
        assert_eq!(tab.controller.state(), SessionState::Authenticated);

        use crate::client::ProfileApi;
        let me = tab.controller.api().get_profile().await.unwrap();
        assert_eq!(me.email, "alice@example.com");
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_login_is_generic_and_leaves_state() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/api/auth/login")
            .with_status(401)
            .with_body(r#"{"message":"no such user"}"#)
            .create_async()
            .await;

        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::LOGIN);
        tab.controller.session().set_state(SessionState::Unauthenticated);

        let err = tab
            .controller
            .login(&Credentials::new("who@example.com", "passw0rd"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), INVALID_CREDENTIALS_MESSAGE);
        assert_eq!(tab.controller.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_failed_login_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/api/auth/login")
            .with_status(403)
            .with_body(r#""Please verify your email first""#)
            .create_async()
            .await;

        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::LOGIN);

        let err = tab
            .controller
            .login(&Credentials::new("new@example.com", "passw0rd"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(err.user_message(), "Please verify your email first");
    }

    #[tokio::test]
    async fn test_logout_navigates_home_even_if_server_fails() {
        let mut server = mockito::Server::new_async().await;
        let _logout = server
            .mock("POST", "/api/auth/logout")
            .with_status(500)
            .create_async()
            .await;

        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);
        tab.controller
            .session()
            .establish(AccessToken::new(jwt("a")))
            .await;

        tab.controller.logout().await;
        assert_eq!(tab.controller.state(), SessionState::Unauthenticated);
        assert!(tab.nav.is_on(routes::HOME));
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_event_clears_other_tab() {
        let mut server = mockito::Server::new_async().await;
        let _logout = server
            .mock("POST", "/api/auth/logout")
            .with_status(204)
            .create_async()
            .await;

        let hub = BroadcastHub::new();
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let a = open_tab(&server.url(), &store, &hub, routes::PROFILE);
        let b = open_tab(&server.url(), &store, &hub, routes::PROFILE);
        b.controller.listen();
        b.controller
            .session()
            .tokens()
            .set(AccessToken::new(jwt("b")))
            .await;

        a.controller.logout().await;
        wait_for(&b.controller, SessionState::Unauthenticated).await;

        assert!(b.controller.session().tokens().get().await.is_none());
    }

    #[tokio::test]
    async fn test_login_event_revalidates_other_tab() {
        let mut server = mockito::Server::new_async().await;
        let token = jwt("shared");
        let _login = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_body(format!(r#"{{"accessToken":"{}"}}"#, token))
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .with_status(200)
            .with_body(format!(r#"{{"accessToken":"{}"}}"#, jwt("b-copy")))
            .expect(1)
            .create_async()
            .await;

        let hub = BroadcastHub::new();
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let a = open_tab(&server.url(), &store, &hub, routes::LOGIN);
        let b = open_tab(&server.url(), &store, &hub, routes::HOME);
        b.controller.session().set_state(SessionState::Unauthenticated);
        b.controller.listen();

        a.controller
            .login(&Credentials::new("a@b.io", "passw0rd"))
            .await
            .unwrap();
        wait_for(&b.controller, SessionState::Authenticated).await;
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_marker_removal_logs_out_other_tab_after_debounce() {
        let server = mockito::Server::new_async().await;
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        // Different hubs: only the storage path connects the tabs.
        let a = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);
        let b = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);
        b.controller.listen();

        let token = AccessToken::new(jwt("a"));
        a.controller.session().establish(token.clone()).await;
        b.controller.session().establish(token).await;
        settle().await;

        a.controller.session().clear().await;
        settle().await;
        assert_eq!(b.controller.state(), SessionState::Authenticated);

        wait_for(&b.controller, SessionState::Unauthenticated).await;
        assert_eq!(b.nav.visits(routes::LOGIN), 1);
    }

    #[tokio::test]
    async fn test_marker_replaced_within_window_is_ignored() {
        let server = mockito::Server::new_async().await;
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let a = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);
        let b = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);
        b.controller.listen();
        b.controller
            .session()
            .establish(AccessToken::new(jwt("b")))
            .await;

        a.controller
            .session()
            .establish(AccessToken::new(jwt("a1")))
            .await;
        a.controller.session().clear().await;
        a.controller
            .session()
            .establish(AccessToken::new(jwt("a2")))
            .await;

        tokio::time::sleep(RECHECK * 3).await;
        assert_eq!(b.controller.state(), SessionState::Authenticated);
        assert_eq!(b.nav.visits(routes::LOGIN), 0);
    }

    #[tokio::test]
    async fn test_marker_removal_on_login_page_does_not_redirect() {
        let server = mockito::Server::new_async().await;
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let a = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::PROFILE);
        let b = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::LOGIN);
        b.controller.listen();

        a.controller
            .session()
            .establish(AccessToken::new(jwt("a")))
            .await;
        a.controller.session().clear().await;

        tokio::time::sleep(RECHECK * 3).await;
        assert_eq!(b.nav.history(), vec![routes::LOGIN.to_string()]);
    }

    #[tokio::test]
    async fn test_oauth_callback_with_non_jwt_tokens() {
        let server = mockito::Server::new_async().await;
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::OAUTH_CALLBACK);

        let err = tab
            .controller
            .complete_oauth("/oauth/callback#access_token=abc&refresh_token=def")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), OAUTH_FAILED_MESSAGE);
        assert!(tab.controller.session().tokens().get().await.is_none());
        assert_eq!(tab.controller.state(), SessionState::Unauthenticated);
        assert_eq!(tab.nav.current(), OAUTH_ERROR_ROUTE);
        assert!(tab.nav.is_on(routes::HOME));
    }

    #[tokio::test]
    async fn test_oauth_callback_success() {
        let server = mockito::Server::new_async().await;
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &BroadcastHub::new(), routes::OAUTH_CALLBACK);
        let access = jwt("oauth");
        let refresh = jwt("refresh");
        let url = format!("/oauth/callback#access_token={}&refresh_token={}", access, refresh);

        tab.controller.complete_oauth(&url).await.unwrap();
        assert_eq!(tab.controller.state(), SessionState::Authenticated);
        assert_eq!(tab.controller.api().cookies().get(REFRESH_COOKIE), Some(refresh));
        assert!(tab.nav.is_on(routes::PROFILE));
        assert!(store.get(ACCESS_TOKEN_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_dropping_controller_stops_listeners() {
        let server = mockito::Server::new_async().await;
        let hub = BroadcastHub::new();
        let store: Arc<dyn SharedStore> = MemoryStore::new_shared();
        let tab = open_tab(&server.url(), &store, &hub, routes::PROFILE);
        tab.controller.listen();
        assert_eq!(hub.subscriber_count(), 1);

        drop(tab);
        settle().await;
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_reaches_another_process() {
        let mut server = mockito::Server::new_async().await;
        let _logout = server
            .mock("POST", "/api/auth/logout")
            .with_status(200)
            .create_async()
            .await;

        let temp = tempdir().unwrap();
        let path = temp.path().join("state.db");
        let store_a = SqliteStore::open_at(&path).unwrap();
        let store_b = SqliteStore::open_at(&path).unwrap();
        let _watch_a = store_a.spawn_watcher(Duration::from_millis(10));
        let _watch_b = store_b.spawn_watcher(Duration::from_millis(10));

        let a = open_relay_tab(&server.url(), &store_a, routes::PROFILE);
        let b = open_relay_tab(&server.url(), &store_b, routes::PROFILE);
        a.controller.listen();
        b.controller.listen();
        a.controller.session().establish(AccessToken::new(jwt("a"))).await;
        b.controller.session().establish(AccessToken::new(jwt("b"))).await;
        // Let both watchers see the markers before anything is removed
        tokio::time::sleep(Duration::from_millis(60)).await;

        a.controller.logout().await;

        wait_for(&b.controller, SessionState::Unauthenticated).await;
        assert!(b.controller.session().tokens().get().await.is_none());
        assert_eq!(a.controller.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_marker_removal_in_another_process_redirects() {
        let server = mockito::Server::new_async().await;
        let temp = tempdir().unwrap();
        let path = temp.path().join("state.db");
        let store_a = SqliteStore::open_at(&path).unwrap();
        let store_b = SqliteStore::open_at(&path).unwrap();
        let _watch_a = store_a.spawn_watcher(Duration::from_millis(10));
        let _watch_b = store_b.spawn_watcher(Duration::from_millis(10));

        let a = open_relay_tab(&server.url(), &store_a, routes::PROFILE);
        let b = open_relay_tab(&server.url(), &store_b, routes::PROFILE);
        a.controller.listen();
        b.controller.listen();
        a.controller.session().establish(AccessToken::new(jwt("a"))).await;
        b.controller.session().establish(AccessToken::new(jwt("b"))).await;
        // Let both watchers see the markers before anything is removed
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Marker only; no bus event
        a.controller.session().clear().await;

        wait_for(&b.controller, SessionState::Unauthenticated).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while !b.nav.is_on(routes::LOGIN) {
                settle().await;
            }
        })
        .await
        .expect("redirect timed out");
        assert_eq!(b.nav.visits(routes::LOGIN), 1);
        assert_eq!(a.nav.visits(routes::LOGIN), 0);
    }
}

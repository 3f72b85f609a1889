//! Session management: token holder, refresh gate, cross-tab sync
//!
//! A [`Session`] is one tab's authentication context. It owns the in-memory
//! access token, the single-flight refresh gate and the observable session
//! state, and is shared (`Arc`) between the HTTP client and the
//! [`SessionController`].

use std::sync::Arc;

use tokio::sync::watch;

pub mod bus;
pub mod controller;
pub mod gate;
pub mod guard;
pub mod navigator;
pub mod token;

pub use bus::{AuthEvent, AuthEventKind, BroadcastHub, CrossTabBus, Subscription};
pub use controller::{Credentials, SessionController};
pub use gate::{Flight, PendingQueue, RefreshGate, RefreshOutcome};
pub use guard::{GuardDecision, RouteGuard};
pub use navigator::{HistoryNavigator, Navigator, routes};
pub use token::{AccessToken, TokenStore, is_expired, is_well_formed};

use crate::store::StoreHandle;

/// Shared-store key whose presence marks a live session.
///
/// It holds a fingerprint of the access token, never the token itself.
/// Another tab removing it is treated as a logout.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Authentication state of one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticating,
    Authenticated,
    Unauthenticated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Unauthenticated => "unauthenticated",
        };
        f.write_str(label)
    }
}

/// One tab's authentication context.
pub struct Session {
    tokens: TokenStore,
    gate: RefreshGate,
    state: watch::Sender<SessionState>,
    navigator: Arc<dyn Navigator>,
    store: StoreHandle,
}

impl Session {
    pub fn new(store: StoreHandle, navigator: Arc<dyn Navigator>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Authenticating);
        Arc::new(Self {
            tokens: TokenStore::new(),
            gate: RefreshGate::new(),
            state,
            navigator,
            store,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn gate(&self) -> &RefreshGate {
        &self.gate
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            log::debug!("Session state {} -> {}", previous, state);
        }
    }

    /// Adopt `token` as the bearer of every following request.
    pub async fn establish(&self, token: AccessToken) {
        let fingerprint = token.fingerprint();
        self.tokens.set(token).await;
        if let Err(err) = self.store.set(ACCESS_TOKEN_KEY, &fingerprint) {
            log::warn!("Failed to record session marker: {}", err);
        }
        self.set_state(SessionState::Authenticated);
    }

    /// Drop the token and the session marker.
    pub async fn clear(&self) {
        self.tokens.clear().await;
        if let Err(err) = self.store.remove(ACCESS_TOKEN_KEY) {
            log::warn!("Failed to remove session marker: {}", err);
        }
        self.set_state(SessionState::Unauthenticated);
    }

    /// Send the tab to the login page unless it is already there.
    ///
    /// Returns whether a navigation happened.
    pub fn redirect_to_login(&self) -> bool {
        if self.navigator.is_on(routes::LOGIN) {
            return false;
        }
        self.navigator.navigate(routes::LOGIN);
        true
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("tab", self.store.tab())
            .finish()
    }
}

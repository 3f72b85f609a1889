//! Route guards
//!
//! A guard decides whether a tab may enter a route given its session state.
//! Redirect decisions are applied to the tab's navigator before returning.

use super::controller::SessionController;
use super::navigator::{path_of, routes};
use super::SessionState;
use crate::client::AuthApi;

/// Access rule attached to a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteGuard {
    /// Signed-in users only; others go to the login page
    Authenticated,
    /// Signed-out users only; signed-in users go to their profile
    Guest,
    /// Users the server grants access to the named resource
    Authorized(String),
}

/// Outcome of evaluating a guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
    /// Render the not-found page without revealing the route exists
    NotFound,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Login location that returns to `intended` after sign-in.
pub fn login_redirect(intended: &str) -> String {
    let intended = if intended.is_empty() { routes::HOME } else { intended };
    let encoded: String = url::form_urlencoded::byte_serialize(intended.as_bytes()).collect();
    format!("{}?redirect={}", routes::LOGIN, encoded)
}

impl RouteGuard {
    /// Evaluate the guard for a tab entering `target`.
    pub async fn evaluate(&self, controller: &SessionController, target: &str) -> GuardDecision {
        let state = controller.ensure_resolved().await;
        let signed_in = state == SessionState::Authenticated;

        let decision = match self {
            RouteGuard::Authenticated if signed_in => GuardDecision::Allow,
            RouteGuard::Authenticated => GuardDecision::Redirect(login_redirect(target)),
            RouteGuard::Guest if signed_in => GuardDecision::Redirect(routes::PROFILE.to_string()),
            RouteGuard::Guest => GuardDecision::Allow,
            RouteGuard::Authorized(_) if !signed_in => GuardDecision::NotFound,
            RouteGuard::Authorized(resource) => {
                match controller.api().check_access(resource).await {
                    Ok(true) => GuardDecision::Allow,
                    Ok(false) => GuardDecision::NotFound,
                    Err(err) => {
                        if err.is_server_side() {
                            log::error!("Access check for {} failed: {}", resource, err);
                        }
                        GuardDecision::NotFound
                    }
                }
            }
        };

        let navigator = controller.session().navigator();
        match &decision {
            GuardDecision::Redirect(to) => navigator.navigate(to),
            GuardDecision::Allow if path_of(target) != path_of(&navigator.current()) => {
                navigator.navigate(target)
            }
            _ => {}
        }
        decision
    }
}

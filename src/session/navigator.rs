//! Location tracking and redirects

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Well-known application routes
pub mod routes {
    pub const HOME: &str = "/";
    pub const LOGIN: &str = "/login";
    pub const REGISTER: &str = "/register";
    pub const PROFILE: &str = "/profile";
    pub const ADMIN: &str = "/admin";
    pub const VERIFY: &str = "/verify";
    pub const RESET_PASSWORD: &str = "/reset-password";
    pub const OAUTH_CALLBACK: &str = "/oauth/callback";
}

/// Path component of a location, without query or fragment.
pub fn path_of(location: &str) -> &str {
    let end = location.find(&['?', '#'][..]).unwrap_or(location.len());
    &location[..end]
}

/// Where a tab currently is, and how it moves.
pub trait Navigator: Send + Sync {
    fn current(&self) -> String;

    fn navigate(&self, to: &str);

    /// True when the current path is `route`, ignoring query and fragment.
    fn is_on(&self, route: &str) -> bool {
        path_of(&self.current()) == route
    }
}

/// Navigations a [`HistoryNavigator`] remembers
pub const HISTORY_LIMIT: usize = 64;

#[derive(Debug)]
struct History {
    initial: String,
    visited: VecDeque<String>,
}

/// Navigator that remembers where a tab started and its most recent
/// navigations, up to [`HISTORY_LIMIT`].
#[derive(Debug)]
pub struct HistoryNavigator {
    state: Mutex<History>,
}

impl HistoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(History {
                initial: initial.into(),
                visited: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starting location followed by the remembered navigations, oldest first.
    pub fn history(&self) -> Vec<String> {
        let state = self.lock();
        std::iter::once(&state.initial)
            .chain(state.visited.iter())
            .cloned()
            .collect()
    }

    /// How many remembered navigations landed on `route` (by path).
    pub fn visits(&self, route: &str) -> usize {
        self.lock()
            .visited
            .iter()
            .filter(|location| path_of(location) == route)
            .count()
    }
}

impl Navigator for HistoryNavigator {
    fn current(&self) -> String {
        let state = self.lock();
        state.visited.back().unwrap_or(&state.initial).clone()
    }

    fn navigate(&self, to: &str) {
        log::debug!("Navigating to {}", to);
        let mut state = self.lock();
        if state.visited.len() == HISTORY_LIMIT {
            state.visited.pop_front();
        }
        state.visited.push_back(to.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_of_strips_query_and_fragment() {
        assert_eq!(path_of("/login?redirect=%2Fprofile"), "/login");
        assert_eq!(path_of("/oauth/callback#access_token=x"), "/oauth/callback");
        assert_eq!(path_of("/profile"), "/profile");
    }

    #[test]
    fn test_history_navigator_tracks_visits() {
        let nav = HistoryNavigator::new(routes::PROFILE);
        assert!(nav.is_on(routes::PROFILE));

        nav.navigate("/login?redirect=%2Fprofile");
        assert!(nav.is_on(routes::LOGIN));
        assert_eq!(nav.visits(routes::LOGIN), 1);
        assert_eq!(nav.history().len(), 2);
    }

    #[test]
    fn test_initial_location_is_not_a_visit() {
        let nav = HistoryNavigator::new(routes::LOGIN);
        assert_eq!(nav.visits(routes::LOGIN), 0);
    }

    #[test]
    fn test_history_is_capped() {
        let nav = HistoryNavigator::new(routes::HOME);
        for i in 0..HISTORY_LIMIT + 10 {
            nav.navigate(&format!("/page/{}", i));
        }

        let history = nav.history();
        assert_eq!(history.len(), HISTORY_LIMIT + 1);
        assert_eq!(history[0], routes::HOME);
        assert_eq!(history[1], "/page/10");
        assert_eq!(nav.current(), format!("/page/{}", HISTORY_LIMIT + 9));
    }
}

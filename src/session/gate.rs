//! Single-flight refresh gate and its queue of waiting callers
//!
//! At most one refresh runs at a time. Callers arriving while it runs are
//! parked in a [`PendingQueue`] and drained exactly once when it settles,
//! either all resolved with the new token or all rejected with the error.
//! The in-flight flag is cleared on every exit path, including cancellation
//! of the leading future.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use super::token::AccessToken;
use crate::error::ApiError;

/// Result of one refresh attempt, as seen by every caller.
pub type RefreshOutcome = std::result::Result<AccessToken, ApiError>;

/// Ordered resolution handles for callers blocked on an in-flight refresh.
#[derive(Debug, Default)]
pub struct PendingQueue {
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a caller; the receiver completes when the queue is drained.
    pub fn enqueue(&mut self) -> oneshot::Receiver<RefreshOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Resolve every waiter in enqueue order. Returns how many were drained.
    pub fn resolve_all(&mut self, token: &AccessToken) -> usize {
        self.drain_with(|| Ok(token.clone()))
    }

    /// Reject every waiter in enqueue order. Returns how many were drained.
    pub fn reject_all(&mut self, err: &ApiError) -> usize {
        self.drain_with(|| Err(err.clone()))
    }

    fn drain_with(&mut self, outcome: impl Fn() -> RefreshOutcome) -> usize {
        let waiters = std::mem::take(&mut self.waiters);
        let count = waiters.len();
        for waiter in waiters {
            // A waiter that went away no longer cares about the result.
            let _ = waiter.send(outcome());
        }
        count
    }
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: bool,
    queue: PendingQueue,
    /// Number of refresh attempts that have settled
    epoch: u64,
}

/// How a caller took part in a refresh.
#[derive(Debug)]
pub struct Flight {
    pub outcome: RefreshOutcome,
    /// True for the caller that performed the network call
    pub led: bool,
}

/// Process-wide (per session) refresh gate.
#[derive(Debug, Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    /// Callers currently parked behind the in-flight refresh.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// True when an attempt settled after `epoch` and none is running now.
    pub fn settled_since(&self, epoch: u64) -> bool {
        let state = self.lock();
        !state.in_flight && state.epoch != epoch
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one instead.
    pub async fn run<F, Fut>(&self, refresh: F) -> Flight
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let waiter = {
            let mut state = self.lock();
            if state.in_flight {
                Some(state.queue.enqueue())
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            log::debug!("Refresh already in flight; queued");
            let outcome = rx.await.unwrap_or_else(|_| {
                Err(ApiError::Network("refresh attempt was abandoned".to_string()))
            });
            return Flight { outcome, led: false };
        }

        let guard = LeaderGuard { gate: self, settled: false };
        let outcome = refresh().await;
        guard.settle(&outcome);
        Flight { outcome, led: true }
    }

    fn finish(&self, outcome: &RefreshOutcome) -> usize {
        let mut queue = {
            let mut state = self.lock();
            state.in_flight = false;
            state.epoch += 1;
            std::mem::take(&mut state.queue)
        };

        match outcome {
            Ok(token) => queue.resolve_all(token),
            Err(err) => queue.reject_all(err),
        }
    }
}

/// Clears the in-flight flag even if the leading future is dropped.
struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        let drained = self.gate.finish(outcome);
        log::debug!("Refresh settled (ok: {}); drained {} waiters", outcome.is_ok(), drained);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.gate
                .finish(&Err(ApiError::Network("refresh attempt was cancelled".to_string())));
        }
    }
}

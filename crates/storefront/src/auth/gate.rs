//! The authentication gate.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::AuthState;
use super::guard::{RouteDecision, guard_protected};
use crate::session::SessionStore;

/// Whether a user is signed in, derived from token presence alone.
///
/// The token is never validated against the upstream. A token the server no
/// longer accepts still reads as authenticated until an API call comes back
/// unauthorized and the caller signs out.
#[derive(Clone)]
pub struct AuthGate {
    inner: Arc<AuthGateInner>,
}

struct AuthGateInner {
    store: SessionStore,
    state: watch::Sender<AuthState>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Create a gate in the `Loading` state.
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            inner: Arc::new(AuthGateInner { store, state }),
        }
    }

    /// The current state, without resolving it.
    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    /// Re-read the persisted token and publish the result.
    ///
    /// A storage read failure counts as signed out.
    pub fn recheck(&self) -> bool {
        let authenticated = match self.inner.store.token() {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Could not read session token, treating as signed out");
                false
            }
        };
        let next = if authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        };

        self.inner.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                debug!(from = ?*state, to = ?next, "Auth state changed");
                *state = next;
                true
            }
        });
        authenticated
    }

    /// Whether a session token is present. Resolves the state first if it
    /// is still loading.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        match self.state() {
            AuthState::Loading => self.recheck(),
            state => state == AuthState::Authenticated,
        }
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Route decision for a protected page.
    #[must_use]
    pub fn guard(&self) -> RouteDecision {
        guard_protected(self.state())
    }

    /// Recheck on every storage change from any handle of the store.
    ///
    /// Only the auth flag follows storage changes; cached cart and wishlist
    /// contents do not. The task stops at the first event after every handle
    /// of this gate is dropped.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn listen(&self) -> JoinHandle<()> {
        let mut events = self.inner.store.subscribe();
        let gate = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let event = events.recv().await;
                let Some(inner) = gate.upgrade() else { break };
                let gate = Self { inner };
                match event {
                    Ok(event) => {
                        debug!(?event, "Storage changed");
                        gate.recheck();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Storage events lagged");
                        gate.recheck();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

use tokio::sync::watch;

use crate::types::UserInfo;

/// Authentication state exposed to the hosting application.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthState {
    /// Bootstrap has not resolved yet.
    #[default]
    Unknown,
    /// A session is active for the given user.
    Authenticated(UserInfo),
    /// No session; the host should route to its login entry point.
    Unauthenticated,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&UserInfo> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Broadcast point for [`AuthState`] transitions.
///
/// The core publishes here instead of navigating anywhere itself; the hosting
/// application subscribes and decides what a transition to `Unauthenticated`
/// means (in a UI, routing to the login screen). Clones share one channel.
#[derive(Clone)]
pub(crate) struct StateChannel {
    tx: std::sync::Arc<watch::Sender<AuthState>>,
}

impl StateChannel {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::Unknown);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Publish a new state. Lossy for unobserved intermediate values,
    /// last-write-wins, like any watch channel.
    pub(crate) fn publish(&self, state: AuthState) {
        let changed = self.tx.send_replace(state.clone()) != state;
        if changed {
            tracing::debug!(state = state_name(&state), "auth state changed");
        }
    }

    pub(crate) fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}

fn state_name(state: &AuthState) -> &'static str {
    match state {
        AuthState::Unknown => "unknown",
        AuthState::Authenticated(_) => "authenticated",
        AuthState::Unauthenticated => "unauthenticated",
    }
}

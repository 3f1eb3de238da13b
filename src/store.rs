use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::AccessToken;

/// Volatile, in-process holder of the current access token.
///
/// Clones are cheap handles onto one shared slot, so the refresh client, the
/// request authorizer, and the session all observe the same credential. At
/// most one token exists at a time; every write replaces the previous value
/// synchronously. Nothing is ever persisted — a process restart always starts
/// from an empty store.
#[derive(Clone, Default)]
pub struct TokenStore {
    slot: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current token.
    pub fn set(&self, token: AccessToken) {
        *self.slot.write() = Some(token);
    }

    /// Current token, if one is held.
    #[must_use]
    pub fn get(&self) -> Option<AccessToken> {
        self.slot.read().clone()
    }

    /// Drops the current token.
    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.read().is_none()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("held", &!self.is_empty())
            .finish()
    }
}

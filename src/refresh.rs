use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use url::Url;

use crate::config::AuthConfig;
use crate::error::{Error, RefreshError};
use crate::store::TokenStore;
use crate::types::{AccessToken, ApiResponse, RefreshResponse};

type InFlight = Shared<BoxFuture<'static, Result<AccessToken, RefreshError>>>;

/// Exchanges the cookie-carried renewal credential for a fresh access token.
///
/// The renewal credential itself is never visible here: it lives in an
/// HTTP-only cookie owned by the server, and travels automatically because
/// the underlying transport is built with a cookie store. The request body is
/// always empty.
///
/// Concurrent callers share one renewal cycle. The first caller installs an
/// in-flight handle; everyone arriving while it is pending attaches to it and
/// observes the same settled outcome. The handle is cleared once settled, so
/// the next authorization failure starts a fresh cycle.
#[derive(Clone)]
pub struct RefreshClient {
    http: reqwest::Client,
    refresh_url: Url,
    tokens: TokenStore,
    inflight: Arc<Mutex<Option<InFlight>>>,
}

impl RefreshClient {
    pub(crate) fn new(
        http: reqwest::Client,
        config: &AuthConfig,
        tokens: TokenStore,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            refresh_url: config.endpoint(&config.refresh_path)?,
            tokens,
            inflight: Arc::new(Mutex::new(None)),
        })
    }

    /// Renews the access token, joining an already-running renewal if one is
    /// in flight.
    ///
    /// On success the new token has been stored before this returns; on
    /// failure the store has been cleared.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] on transport failure, a non-success status,
    /// or a malformed response envelope. All are handled the same way by
    /// callers: the session is over.
    pub async fn refresh(&self) -> Result<AccessToken, RefreshError> {
        self.handle().await
    }

    fn handle(&self) -> InFlight {
        let mut slot = self.inflight.lock();
        if let Some(pending) = slot.as_ref() {
            tracing::debug!("attaching to in-flight token renewal");
            return pending.clone();
        }

        let http = self.http.clone();
        let url = self.refresh_url.clone();
        let tokens = self.tokens.clone();
        let latch = Arc::clone(&self.inflight);

        let pending = async move {
            let outcome = exchange(http, url, tokens).await;
            // settle the latch so the next 401 cycle starts a fresh renewal
            latch.lock().take();
            outcome
        }
        .boxed()
        .shared();

        *slot = Some(pending.clone());
        pending
    }
}

async fn exchange(
    http: reqwest::Client,
    url: Url,
    tokens: TokenStore,
) -> Result<AccessToken, RefreshError> {
    tracing::debug!(url = %url, "renewing access token from refresh cookie");

    let response = match http.post(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tokens.clear();
            tracing::warn!(error = %e, "token renewal transport failure");
            return Err(RefreshError::Transport(e.to_string()));
        }
    };

    let status = response.status();
    if !status.is_success() {
        tokens.clear();
        tracing::warn!(status = status.as_u16(), "token renewal rejected");
        return Err(RefreshError::Rejected(status.as_u16()));
    }

    let envelope: ApiResponse<RefreshResponse> = match response.json().await {
        Ok(envelope) => envelope,
        Err(e) => {
            tokens.clear();
            tracing::warn!(error = %e, "token renewal response unreadable");
            return Err(RefreshError::Malformed(e.to_string()));
        }
    };

    match envelope {
        ApiResponse {
            success: true,
            data: Some(data),
            ..
        } => {
            let token = AccessToken::new(data.access_token);
            tokens.set(token.clone());
            tracing::info!("access token renewed");
            Ok(token)
        }
        ApiResponse { message, .. } => {
            tokens.clear();
            Err(RefreshError::Malformed(
                message.unwrap_or_else(|| "missing access token in refresh response".into()),
            ))
        }
    }
}

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::client::ApiClient;
use crate::config::AuthConfig;
use crate::error::Error;
use crate::refresh::RefreshClient;
use crate::state::{AuthState, StateChannel};
use crate::store::TokenStore;
use crate::types::{
    AccessToken, GuardianRegisterRequest, LoginRequest, LoginResponse, RegisterResponse,
    StudentRegisterRequest, UpdateProfileRequest, UserInfo,
};

const REGISTER_STUDENT_PATH: &str = "/auth/register/student";
const REGISTER_GUARDIAN_PATH: &str = "/auth/register/parent";
const CHECK_USERNAME_PATH: &str = "/auth/check-username";
const CHECK_PHONE_PATH: &str = "/auth/check-phone";

/// The authentication session: owns the token store, the refresh client, the
/// authorized API client, and the published [`AuthState`].
///
/// Construct exactly one per process and clone the handle wherever it is
/// needed; clones share all state. The session never navigates anywhere — on
/// an unrecoverable authorization failure it publishes
/// [`AuthState::Unauthenticated`] and leaves routing to the subscriber.
///
/// ```rust,ignore
/// use gongbu_auth::{AuthConfig, AuthSession, AuthState};
///
/// let session = AuthSession::new(AuthConfig::from_env()?)?;
/// match session.initialize().await {
///     AuthState::Authenticated(user) => println!("welcome back, {}", user.name),
///     _ => println!("please log in"),
/// }
/// ```
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    refresh: RefreshClient,
    tokens: TokenStore,
    state: StateChannel,
    config: Arc<AuthConfig>,
    /// Bootstrap latch: `Some` once resolved. Concurrent `initialize` calls
    /// serialize here and the later ones observe the cached outcome.
    bootstrap: Mutex<Option<AuthState>>,
}

impl AuthSession {
    /// Wires the session from a configuration.
    ///
    /// The underlying transport is built with a cookie store so the
    /// server-set renewal cookie travels on same-origin calls; no token state
    /// of any kind is read from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be constructed, or
    /// [`Error::Config`] if the configured endpoints are invalid.
    pub fn new(config: AuthConfig) -> Result<Self, Error> {
        let config = Arc::new(config);
        let http = reqwest::Client::builder().cookie_store(true).build()?;

        let tokens = TokenStore::new();
        let state = StateChannel::new();
        let refresh = RefreshClient::new(http.clone(), &config, tokens.clone())?;
        let api = ApiClient::new(
            http,
            Arc::clone(&config),
            tokens.clone(),
            refresh.clone(),
            state.clone(),
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                api,
                refresh,
                tokens,
                state,
                config,
                bootstrap: Mutex::new(None),
            }),
        })
    }

    /// Silently restores a session from the renewal cookie, resolving the
    /// initial [`AuthState`].
    ///
    /// Safe to call from concurrent mount points: one renewal network call is
    /// issued at most, and every caller observes the same resolved state.
    /// After the first resolution this returns the cached outcome.
    pub async fn initialize(&self) -> AuthState {
        let mut resolved = self.inner.bootstrap.lock().await;
        if let Some(state) = resolved.as_ref() {
            return state.clone();
        }

        let state = self.bootstrap().await;
        self.inner.state.publish(state.clone());
        *resolved = Some(state.clone());
        state
    }

    async fn bootstrap(&self) -> AuthState {
        tracing::debug!("restoring session from refresh cookie");

        if self.inner.refresh.refresh().await.is_err() {
            // no cookie, expired cookie, or unreachable server: start logged out
            tracing::info!("no restorable session");
            return AuthState::Unauthenticated;
        }

        match self.current_user().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "session restored");
                AuthState::Authenticated(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "restored token rejected, session treated as invalid");
                self.inner.tokens.clear();
                AuthState::Unauthenticated
            }
        }
    }

    /// Logs in with username and password.
    ///
    /// On success the access token is stored in memory and the session is
    /// verified with a current-user fetch before `Authenticated` is
    /// published; the server delivers the renewal cookie alongside the login
    /// response.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the credentials are rejected or the verification
    /// fetch fails; in both cases no credential remains stored.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<UserInfo, Error> {
        let request = LoginRequest {
            username: username.into(),
            password: password.into(),
        };
        let response: LoginResponse = self
            .inner
            .api
            .post(&self.inner.config.login_path, &request)
            .await?;

        self.inner.tokens.set(AccessToken::new(response.access_token));

        match self.current_user().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "login successful");
                self.inner
                    .state
                    .publish(AuthState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "login verification failed");
                self.inner.tokens.clear();
                self.inner.state.publish(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Logs out.
    ///
    /// The in-memory token is dropped and `Unauthenticated` published whether
    /// or not the server call succeeds; the server clears the renewal cookie
    /// on its side.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the server call failed; local state is already
    /// cleared by then.
    pub async fn logout(&self) -> Result<(), Error> {
        let result = self
            .inner
            .api
            .post_unit(&self.inner.config.logout_path)
            .await;

        self.inner.tokens.clear();
        self.inner.state.publish(AuthState::Unauthenticated);

        if result.is_ok() {
            tracing::info!("logout successful");
        }
        result
    }

    /// Fetches the identity record of the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the session cannot authorize the call.
    pub async fn current_user(&self) -> Result<UserInfo, Error> {
        self.inner.api.get(&self.inner.config.me_path).await
    }

    /// Updates the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the session cannot authorize the call or the
    /// server rejects the update.
    pub async fn update_profile(
        &self,
        request: &UpdateProfileRequest,
    ) -> Result<UserInfo, Error> {
        self.inner.api.put(&self.inner.config.me_path, request).await
    }

    /// Registers a student account. Public endpoint; no session required.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the server rejects the registration.
    pub async fn register_student(
        &self,
        request: &StudentRegisterRequest,
    ) -> Result<RegisterResponse, Error> {
        self.inner.api.post(REGISTER_STUDENT_PATH, request).await
    }

    /// Registers a guardian account. Public endpoint; no session required.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the server rejects the registration.
    pub async fn register_guardian(
        &self,
        request: &GuardianRegisterRequest,
    ) -> Result<RegisterResponse, Error> {
        self.inner.api.post(REGISTER_GUARDIAN_PATH, request).await
    }

    /// Whether a username is available. Public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the availability check cannot be performed.
    pub async fn check_username(&self, username: &str) -> Result<bool, Error> {
        self.inner
            .api
            .get_with_query(CHECK_USERNAME_PATH, &[("username", username)])
            .await
    }

    /// Whether a phone number is available. Public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the availability check cannot be performed.
    pub async fn check_phone_number(&self, phone_number: &str) -> Result<bool, Error> {
        self.inner
            .api
            .get_with_query(CHECK_PHONE_PATH, &[("phoneNumber", phone_number)])
            .await
    }

    /// Current authentication state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.current()
    }

    /// Subscribe to authentication state transitions.
    ///
    /// A transition to [`AuthState::Unauthenticated`] after the session was
    /// authenticated is the "session invalidated" signal: the host decides
    /// what navigation that implies.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// The authorized API client, for feature code making its own calls.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }
}

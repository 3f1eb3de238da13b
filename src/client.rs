use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::claims;
use crate::config::AuthConfig;
use crate::error::{Error, RefreshError};
use crate::refresh::RefreshClient;
use crate::state::{AuthState, StateChannel};
use crate::store::TokenStore;
use crate::types::ApiResponse;

/// Authorized HTTP client for the Gongbu API.
///
/// Every call is classified against the configured public-endpoint prefixes.
/// Protected calls carry `Authorization: Bearer <token>` from the in-memory
/// store; a 401 triggers exactly one renewal (shared across concurrent
/// failures) and one replay of the original request. Public calls never carry
/// the header and never enter the retry cycle, whatever status they return.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: Arc<AuthConfig>,
    tokens: TokenStore,
    refresh: RefreshClient,
    state: StateChannel,
}

/// One outgoing call, rebuilt from scratch for each attempt so a replay picks
/// up whatever credential is current at that moment.
struct RequestSpec<'a> {
    method: Method,
    path: &'a str,
    query: Option<&'a [(&'a str, &'a str)]>,
    body: Option<serde_json::Value>,
}

impl RequestSpec<'_> {
    fn operation(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

impl ApiClient {
    pub(crate) fn new(
        http: reqwest::Client,
        config: Arc<AuthConfig>,
        tokens: TokenStore,
        refresh: RefreshClient,
        state: StateChannel,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                tokens,
                refresh,
                state,
            }),
        }
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    /// GET an enveloped resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] on transport failure, a non-success envelope, or an
    /// unrecoverable authorization failure.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.dispatch(RequestSpec {
            method: Method::GET,
            path,
            query: None,
            body: None,
        })
        .await
    }

    /// GET an enveloped resource with query parameters.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        self.dispatch(RequestSpec {
            method: Method::GET,
            path,
            query: Some(query),
            body: None,
        })
        .await
    }

    /// POST a JSON body, expecting an enveloped payload back.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get); additionally fails if the body cannot be
    /// serialized.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.dispatch(RequestSpec {
            method: Method::POST,
            path,
            query: None,
            body: Some(to_body(body)?),
        })
        .await
    }

    /// POST with an empty body, expecting an enveloped payload back.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.dispatch(RequestSpec {
            method: Method::POST,
            path,
            query: None,
            body: None,
        })
        .await
    }

    /// POST with an empty body, ignoring any payload in the envelope.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn post_unit(&self, path: &str) -> Result<(), Error> {
        self.dispatch_unit(RequestSpec {
            method: Method::POST,
            path,
            query: None,
            body: None,
        })
        .await
    }

    /// PUT a JSON body, expecting an enveloped payload back.
    ///
    /// # Errors
    ///
    /// See [`post`](Self::post).
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.dispatch(RequestSpec {
            method: Method::PUT,
            path,
            query: None,
            body: Some(to_body(body)?),
        })
        .await
    }

    async fn dispatch<T: DeserializeOwned>(&self, spec: RequestSpec<'_>) -> Result<T, Error> {
        let operation = spec.operation();
        let response = self.execute(&spec).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(operation, response).await);
        }
        let envelope: ApiResponse<T> = response.json().await?;
        envelope.into_data(&operation, status.as_u16())
    }

    async fn dispatch_unit(&self, spec: RequestSpec<'_>) -> Result<(), Error> {
        let operation = spec.operation();
        let response = self.execute(&spec).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(operation, response).await);
        }
        let envelope: ApiResponse<serde_json::Value> = response.json().await?;
        envelope.into_unit(&operation, status.as_u16())
    }

    /// The authorization protocol: classify, attach, send, and on a 401 renew
    /// once and replay once.
    async fn execute(&self, spec: &RequestSpec<'_>) -> Result<reqwest::Response, Error> {
        let public = self.inner.config.is_public(spec.path);

        if !public {
            self.ensure_live_token().await?;
        }

        let mut retried = false;
        loop {
            let response = self.send(spec, public).await?;

            if response.status() == StatusCode::UNAUTHORIZED && !public && !retried {
                retried = true;
                tracing::warn!(
                    operation = %spec.operation(),
                    "authorization failure, renewing token"
                );
                match self.inner.refresh.refresh().await {
                    Ok(_) => continue,
                    Err(e) => return Err(self.invalidate_session(e)),
                }
            }

            return Ok(response);
        }
    }

    async fn send(
        &self,
        spec: &RequestSpec<'_>,
        public: bool,
    ) -> Result<reqwest::Response, Error> {
        let url = self.inner.config.endpoint(spec.path)?;
        let mut request = self.inner.http.request(spec.method.clone(), url);
        if let Some(query) = spec.query {
            request = request.query(query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }
        if !public {
            // Re-read the store on every attempt: a replay must carry the
            // token current after renewal, never one captured earlier.
            if let Some(token) = self.inner.tokens.get() {
                request = request.bearer_auth(token.as_str());
            }
        }
        request.send().await.map_err(Error::from)
    }

    /// Never send a token the inspector already knows is expired; renew it
    /// first. An absent token is sent as-is (unauthorized) — the response
    /// phase owns recovery, so call sites need no expiry logic of their own.
    async fn ensure_live_token(&self) -> Result<(), Error> {
        let Some(token) = self.inner.tokens.get() else {
            return Ok(());
        };
        if !claims::is_expired(&token) {
            return Ok(());
        }
        tracing::debug!("access token expired by its own claims, renewing before send");
        match self.inner.refresh.refresh().await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.invalidate_session(e)),
        }
    }

    fn invalidate_session(&self, cause: RefreshError) -> Error {
        self.inner.tokens.clear();
        self.inner.state.publish(AuthState::Unauthenticated);
        tracing::error!(error = %cause, "token renewal failed, session invalidated");
        Error::Session(cause)
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, Error> {
    serde_json::to_value(body)
        .map_err(|e| Error::Config(format!("unserializable request body: {e}")))
}

async fn error_from_response(operation: String, response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let detail = match response.json::<ApiResponse<serde_json::Value>>().await {
        Ok(envelope) => envelope
            .message
            .unwrap_or_else(|| "request failed".into()),
        Err(_) => "request failed".into(),
    };
    Error::Api {
        operation,
        status: Some(status),
        detail,
    }
}

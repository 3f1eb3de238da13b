use url::Url;

use crate::error::Error;

/// Endpoints that never carry an authorization header and are exempt from the
/// 401-retry cycle, matched by path prefix.
const DEFAULT_PUBLIC_PREFIXES: &[&str] = &[
    "/auth/login",
    "/auth/refresh",
    "/auth/register/student",
    "/auth/register/parent",
    "/auth/check-username",
    "/auth/check-phone",
    "/schools",
];

/// Gongbu API client configuration.
///
/// The required base URL is a constructor parameter — no runtime "missing
/// field" errors. Everything else has backend-contract defaults, overridable
/// via chaining:
///
/// ```rust,ignore
/// use gongbu_auth::AuthConfig;
///
/// let config = AuthConfig::new("https://api.gongbu.app".parse()?)
///     .with_me_path("/users/me");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthConfig {
    pub(crate) base_url: Url,
    pub(crate) login_path: String,
    pub(crate) refresh_path: String,
    pub(crate) logout_path: String,
    pub(crate) me_path: String,
    pub(crate) public_prefixes: Vec<String>,
}

impl AuthConfig {
    /// Create a configuration for the given API origin.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: "/auth/login".into(),
            refresh_path: "/auth/refresh".into(),
            logout_path: "/auth/logout".into(),
            me_path: "/auth/me".into(),
            public_prefixes: DEFAULT_PUBLIC_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Required env vars
    /// - `GONGBU_API_URL`: API origin (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `GONGBU_LOGIN_PATH`, `GONGBU_REFRESH_PATH`, `GONGBU_LOGOUT_PATH`,
    ///   `GONGBU_ME_PATH`: endpoint path overrides
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `GONGBU_API_URL` is missing or invalid.
    pub fn from_env() -> Result<Self, Error> {
        let base_str = std::env::var("GONGBU_API_URL")
            .map_err(|_| Error::Config("GONGBU_API_URL is required".into()))?;
        let base_url: Url = base_str
            .parse()
            .map_err(|e| Error::Config(format!("GONGBU_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(path) = std::env::var("GONGBU_LOGIN_PATH") {
            config = config.with_login_path(path);
        }
        if let Ok(path) = std::env::var("GONGBU_REFRESH_PATH") {
            config = config.with_refresh_path(path);
        }
        if let Ok(path) = std::env::var("GONGBU_LOGOUT_PATH") {
            config = config.with_logout_path(path);
        }
        if let Ok(path) = std::env::var("GONGBU_ME_PATH") {
            config = config.with_me_path(path);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = path.into();
        self
    }

    #[must_use]
    pub fn with_me_path(mut self, path: impl Into<String>) -> Self {
        self.me_path = path.into();
        self
    }

    /// Replace the public-endpoint prefix list.
    ///
    /// The login and refresh paths should normally stay in this list; removing
    /// them re-enables the 401-retry cycle on the auth endpoints themselves.
    #[must_use]
    pub fn with_public_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.public_prefixes = prefixes;
        self
    }

    /// Add a single public-endpoint prefix.
    #[must_use]
    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefixes.push(prefix.into());
        self
    }

    /// API origin.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a request path is public (no auth header, no 401 retry).
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Absolute URL for an API path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path cannot be joined onto the base
    /// URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid endpoint path {path:?}: {e}")))
    }
}

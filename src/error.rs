/// Errors surfaced by the auth core.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request or returned an unusable envelope.
    #[error("API error during {operation}{}: {detail}", fmt_status(.status))]
    Api {
        operation: String,
        status: Option<u16>,
        detail: String,
    },

    /// Token renewal failed; the session is no longer valid.
    ///
    /// The access token has already been cleared and
    /// [`AuthState::Unauthenticated`](crate::state::AuthState) published
    /// by the time this is returned.
    #[error("session invalidated: {0}")]
    Session(#[from] RefreshError),

    /// A credential could not be decoded.
    #[error("token error: {0}")]
    Token(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

/// Outcome of a failed renewal attempt.
///
/// Kept separate from [`Error`] and `Clone` because a single renewal's result
/// is shared verbatim with every caller attached to the in-flight handle.
/// All variants are handled uniformly by callers: clear the credential and
/// fall back to the unauthenticated state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RefreshError {
    /// The refresh endpoint answered with a non-success status.
    #[error("refresh rejected with status {0}")]
    Rejected(u16),

    /// The refresh call never produced a response.
    #[error("refresh transport error: {0}")]
    Transport(String),

    /// The refresh response could not be read as a token envelope.
    #[error("malformed refresh response: {0}")]
    Malformed(String),
}

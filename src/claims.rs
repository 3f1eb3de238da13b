use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::Error;
use crate::types::AccessToken;

/// Claims read from an access token without verifying its signature.
///
/// The server independently verifies the signature on every protected
/// request; decoding here exists only to spot a doomed request before it is
/// sent. Never treat a decoded claim as proof of anything.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenClaims {
    /// Subject identity (user the token was issued for).
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry instant, seconds since the Unix epoch.
    pub exp: i64,
    /// Issued-at instant, seconds since the Unix epoch.
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl TokenClaims {
    /// Decodes the claims segment of a three-part dot-delimited token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the token is not three dot-separated
    /// segments, the middle segment is not valid base64url, or the decoded
    /// payload is not a claims object with an `exp` field.
    pub fn decode(token: &AccessToken) -> Result<Self, Error> {
        let parts: Vec<&str> = token.as_str().split('.').collect();
        if parts.len() != 3 {
            return Err(Error::Token("invalid token format".into()));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| Error::Token("invalid claims encoding".into()))?;

        serde_json::from_slice(&payload)
            .map_err(|e| Error::Token(format!("invalid claims payload: {e}")))
    }

    /// Expiry instant of the token.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Whether the expiry claim lies in the past.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at() <= OffsetDateTime::now_utc()
    }
}

/// Whether a token should be treated as expired.
///
/// Fail-closed: a token whose claims cannot be decoded is reported expired
/// rather than valid, so it is never attached to a new request.
#[must_use]
pub fn is_expired(token: &AccessToken) -> bool {
    match TokenClaims::decode(token) {
        Ok(claims) => claims.is_expired(),
        Err(_) => true,
    }
}

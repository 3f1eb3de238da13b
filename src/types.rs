use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Backend user identifier (numeric database ID).
///
/// Opaque to this crate; consumers store it as the sole link to a Gongbu
/// account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Short-lived bearer credential authorizing protected requests.
///
/// Held exclusively in process memory, never written to durable storage.
/// `Debug` is redacted so the token cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token string, for placing in an `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Response envelope used by every Gongbu API endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
#[non_exhaustive]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwraps a successful envelope, requiring a payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if `success` is false or `data` is missing.
    pub fn into_data(self, operation: &str, status: u16) -> Result<T, Error> {
        match self {
            Self {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Self { message, .. } => Err(Error::Api {
                operation: operation.to_string(),
                status: Some(status),
                detail: message.unwrap_or_else(|| "missing response data".into()),
            }),
        }
    }

    /// Unwraps a successful envelope, ignoring any payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if `success` is false.
    pub fn into_unit(self, operation: &str, status: u16) -> Result<(), Error> {
        if self.success {
            Ok(())
        } else {
            Err(Error::Api {
                operation: operation.to_string(),
                status: Some(status),
                detail: self.message.unwrap_or_else(|| "request failed".into()),
            })
        }
    }
}

/// Credentials for password login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Payload of a successful login.
///
/// The renewal credential is NOT part of this payload; the server delivers it
/// in an HTTP-only cookie alongside this response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct LoginResponse {
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Payload of a successful token refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct RefreshResponse {
    pub access_token: String,
}

/// School reference embedded in a student profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct School {
    pub id: i64,
    pub name: String,
}

/// Student-specific profile fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct StudentProfile {
    pub status: String,
    pub school: School,
    pub grade: u8,
    pub gender: String,
}

/// Identity record for the authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<time::OffsetDateTime>,
    #[serde(default)]
    pub student_profile: Option<StudentProfile>,
}

/// Registration payload for a student account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegisterRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_id: Option<String>,
    pub school_name: String,
    pub grade: u8,
    pub gender: String,
}

/// Registration payload for a guardian account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianRegisterRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_id: Option<String>,
}

/// Payload of a successful registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct RegisterResponse {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Profile update payload for the current user.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

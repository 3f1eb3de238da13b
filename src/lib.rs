#![doc = include_str!("../README.md")]

pub mod claims;
pub mod client;
pub mod config;
pub mod error;
pub mod refresh;
pub mod session;
pub mod state;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use claims::TokenClaims;
pub use client::ApiClient;
pub use config::AuthConfig;
pub use error::{Error, RefreshError};
pub use refresh::RefreshClient;
pub use session::AuthSession;
pub use state::AuthState;
pub use store::TokenStore;
pub use types::{
    AccessToken, ApiResponse, GuardianRegisterRequest, LoginRequest, LoginResponse,
    RefreshResponse, RegisterResponse, School, StudentProfile, StudentRegisterRequest,
    UpdateProfileRequest, UserId, UserInfo,
};

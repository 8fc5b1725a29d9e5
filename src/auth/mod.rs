//! Bearer-token authentication against the external identity provider.
//!
//! The core holds no session state: every request carries an identity token
//! that is verified against the provider, and the underwriter capability is
//! a boolean claim on the verified identity.

use crate::domain::UserId;
use crate::error::AppError;
use async_trait::async_trait;
use axum::http::HeaderMap;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpTokenVerifier;
pub use mock::MockVerifier;

/// Verified identity claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub uid: UserId,
    /// Contact label attached to the identity (email in practice).
    pub contact: String,
    /// The underwriter capability claim.
    pub underwriter: bool,
}

/// Token verifier trait; implementations talk to the identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync + fmt::Debug {
    /// Verify a bearer token and return its claims.
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Error type for token verification.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Token rejected by the provider (expired, malformed, revoked).
    InvalidToken(String),
    /// Provider unreachable or answered with a server error.
    ProviderUnavailable(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            AuthError::ProviderUnavailable(msg) => write!(f, "Identity provider error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(msg) => AppError::Unauthenticated(msg),
            AuthError::ProviderUnavailable(msg) => AppError::Internal(msg),
        }
    }
}

/// Extract the bearer token from an Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("no token provided".to_string()))?;
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthenticated("malformed Authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("expected a Bearer token".to_string()))
}

/// Verify the request's bearer token.
pub async fn authenticate(
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
) -> Result<Claims, AppError> {
    let token = bearer_token(headers)?;
    Ok(verifier.verify(token).await?)
}

/// Require the underwriter capability on already-verified claims.
pub fn require_underwriter(claims: &Claims) -> Result<(), AppError> {
    if claims.underwriter {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "user is not an underwriter".to_string(),
        ))
    }
}

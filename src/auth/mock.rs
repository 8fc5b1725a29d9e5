//! Mock token verifier for testing without an identity provider.

use super::{AuthError, Claims, TokenVerifier};
use crate::domain::UserId;
use async_trait::async_trait;
use std::collections::HashMap;

/// Mock verifier mapping literal tokens to predefined claims.
#[derive(Debug, Clone, Default)]
pub struct MockVerifier {
    tokens: HashMap<String, Claims>,
}

impl MockVerifier {
    /// Create a new mock verifier that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token resolving to an ordinary (non-underwriter) user.
    pub fn with_user(self, token: &str, uid: &str) -> Self {
        self.with_claims(
            token,
            Claims {
                uid: UserId::new(uid),
                contact: format!("{}@example.com", uid),
                underwriter: false,
            },
        )
    }

    /// Register a token resolving to an underwriter.
    pub fn with_underwriter(self, token: &str, uid: &str) -> Self {
        self.with_claims(
            token,
            Claims {
                uid: UserId::new(uid),
                contact: format!("{}@example.com", uid),
                underwriter: true,
            },
        )
    }

    /// Register a token with explicit claims.
    pub fn with_claims(mut self, token: &str, claims: Claims) -> Self {
        self.tokens.insert(token.to_string(), claims);
        self
    }
}

#[async_trait]
impl TokenVerifier for MockVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_verifier_resolves_registered_tokens() {
        let verifier = MockVerifier::new()
            .with_user("tok-u1", "u1")
            .with_underwriter("tok-uw", "uw");

        let user = verifier.verify("tok-u1").await.unwrap();
        assert_eq!(user.uid, UserId::new("u1"));
        assert!(!user.underwriter);

        let uw = verifier.verify("tok-uw").await.unwrap();
        assert!(uw.underwriter);
    }

    #[tokio::test]
    async fn test_mock_verifier_rejects_unknown() {
        let verifier = MockVerifier::new();
        assert!(matches!(
            verifier.verify("nope").await,
            Err(AuthError::InvalidToken(_))
        ));
    }
}

//! Identity-provider client for token verification.

use super::{AuthError, Claims, TokenVerifier};
use crate::domain::UserId;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Token verifier backed by the identity provider's lookup endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenVerifier {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    uid: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    underwriter: bool,
}

impl HttpTokenVerifier {
    /// Create a verifier for the given provider base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let url = format!("{}/v1/tokens:verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::InvalidToken(format!(
                "provider rejected token with status {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(AuthError::ProviderUnavailable(format!(
                "provider answered {}",
                status.as_u16()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        debug!(uid = %body.uid, underwriter = body.underwriter, "token verified");
        Ok(Claims {
            uid: UserId::new(body.uid),
            contact: body.email,
            underwriter: body.underwriter,
        })
    }
}

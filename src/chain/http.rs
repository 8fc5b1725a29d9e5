//! Token-ledger relay client.
//!
//! Talks to the mint relay service that holds the contract owner key and
//! submits the actual chain transactions. One HTTP call per mint, no
//! automatic retry: a failed mint is re-driven by reconciliation.

use super::{cluster_id_digest, to_minor_units, MintReceipt, TokenLedger, TokenLedgerError};
use crate::domain::{ClusterId, Decimal, EntitlementKind, WalletAddress};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Token ledger backed by an HTTP mint relay.
#[derive(Debug, Clone)]
pub struct HttpTokenLedger {
    client: Client,
    base_url: String,
    contract_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintResponse {
    token_id: i64,
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct RelayError {
    #[serde(default)]
    error: String,
}

impl HttpTokenLedger {
    /// Create a client for the given relay base URL and contract.
    pub fn new(base_url: String, contract_address: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            contract_address,
        }
    }
}

#[async_trait]
impl TokenLedger for HttpTokenLedger {
    async fn mint(
        &self,
        owner: &WalletAddress,
        cluster_id: &ClusterId,
        kind: EntitlementKind,
        entitlement: Decimal,
    ) -> Result<MintReceipt, TokenLedgerError> {
        let url = format!("{}/v1/mint", self.base_url);
        let payload = serde_json::json!({
            "contract": self.contract_address,
            "owner": owner.as_str(),
            "clusterDigest": cluster_id_digest(cluster_id),
            "kind": kind.discriminant(),
            "entitlementMinor": to_minor_units(entitlement)?,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TokenLedgerError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let body: RelayError = response
                .json()
                .await
                .map_err(|e| TokenLedgerError::Parse(e.to_string()))?;
            return Err(TokenLedgerError::Revert(body.error));
        }
        if !status.is_success() {
            return Err(TokenLedgerError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: MintResponse = response
            .json()
            .await
            .map_err(|e| TokenLedgerError::Parse(e.to_string()))?;

        debug!(
            owner = %owner,
            cluster = %cluster_id,
            token_id = body.token_id,
            "entitlement token minted"
        );
        Ok(MintReceipt {
            token_id: body.token_id,
            tx_hash: body.tx_hash,
        })
    }
}

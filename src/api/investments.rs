//! Investment admission route.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::AppState;
use crate::auth::authenticate;
use crate::db::AdmissionRequest;
use crate::domain::{ClusterId, WalletAddress};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmitRequest {
    pub cluster_id: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmitResponse {
    pub status: &'static str,
    pub slots: i64,
    pub slots_filled: i64,
    pub activated: bool,
    /// On-chain twins minted in the post-commit phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minted: Option<usize>,
    /// Mint calls that failed; reconcile re-drives them later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_failures: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_error: Option<String>,
}

/// Take one slot in an Open cluster. When the final slot fills, the
/// admission transaction also activates the cluster and issues its
/// entitlement records; the chain mints run afterwards and cannot roll the
/// committed activation back.
pub async fn admit_investment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AdmitRequest>,
) -> Result<Json<AdmitResponse>, AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;

    let cluster_id = ClusterId::new(body.cluster_id);
    let request = AdmissionRequest {
        cluster_id: cluster_id.clone(),
        user_id: claims.uid,
        user_contact: claims.contact,
        wallet_address: body
            .wallet_address
            .filter(|w| !w.trim().is_empty())
            .map(WalletAddress::new),
    };

    let outcome = state.repo.admit_investment(&request).await?;

    let mut response = AdmitResponse {
        status: "success",
        slots: outcome.slots,
        slots_filled: outcome.slots_filled,
        activated: outcome.activated,
        minted: None,
        mint_failures: None,
        mint_error: None,
    };

    if outcome.activated {
        // Post-commit phase: degraded success rather than rollback.
        match state.bridge.mint_for_cluster(&cluster_id).await {
            Ok(report) => {
                response.minted = Some(report.minted);
                response.mint_failures = Some(report.failed);
            }
            Err(err) => {
                warn!(cluster = %cluster_id, error = %err, "post-activation mint pass failed");
                response.mint_error = Some(err.to_string());
            }
        }
    }

    Ok(Json(response))
}

//! Entitlement read and reconciliation routes.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::auth::{authenticate, require_underwriter};
use crate::domain::EntitlementRecord;
use crate::error::AppError;

/// The caller's own entitlement records, most recent first.
pub async fn list_own_entitlements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<EntitlementRecord>>, AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;
    Ok(Json(state.repo.entitlements_for_owner(&claims.uid).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub status: &'static str,
    pub minted: usize,
    pub skipped_no_wallet: usize,
    pub failed: usize,
}

/// Re-drive mints for every record that is still missing its on-chain
/// twin. Safe to call repeatedly; requires the underwriter capability.
pub async fn reconcile_entitlements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReconcileResponse>, AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;
    require_underwriter(&claims)?;

    let report = state.bridge.reconcile().await?;

    Ok(Json(ReconcileResponse {
        status: if report.is_clean() {
            "success"
        } else {
            "partial"
        },
        minted: report.minted,
        skipped_no_wallet: report.skipped_no_wallet,
        failed: report.failed,
    }))
}

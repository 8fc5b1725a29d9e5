//! Cluster lifecycle routes: create, read, fund, settle, close.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::auth::{authenticate, require_underwriter};
use crate::domain::{Cluster, ClusterId, ClusterStatus, Decimal, SettlementBreakdown};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterResponse {
    pub status: &'static str,
    pub cluster_id: ClusterId,
}

/// Any authenticated user can open a new round.
pub async fn create_cluster(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<CreateClusterResponse>), AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;

    let cluster = Cluster::new_pending(claims.uid, state.config.cluster_slots);
    state.repo.create_cluster(&cluster).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateClusterResponse {
            status: "success",
            cluster_id: cluster.id,
        }),
    ))
}

pub async fn list_clusters(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Cluster>>, AppError> {
    authenticate(state.verifier.as_ref(), &headers).await?;
    Ok(Json(state.repo.list_clusters().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetailResponse {
    #[serde(flatten)]
    pub cluster: Cluster,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementBreakdown>,
}

pub async fn get_cluster(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ClusterDetailResponse>, AppError> {
    authenticate(state.verifier.as_ref(), &headers).await?;

    let id = ClusterId::new(id);
    let cluster = state
        .repo
        .get_cluster(&id)
        .await?
        .ok_or_else(|| AppError::ClusterNotFound(id.to_string()))?;
    let settlement = state.repo.get_settlement(&id).await?;

    Ok(Json(ClusterDetailResponse {
        cluster,
        settlement,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterActionRequest {
    pub cluster_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatusResponse {
    pub status: ClusterStatus,
}

/// Pending -> Open; requires the underwriter capability.
pub async fn fund_cluster(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ClusterActionRequest>,
) -> Result<Json<ClusterStatusResponse>, AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;
    require_underwriter(&claims)?;

    let cluster = state
        .repo
        .fund_cluster(&ClusterId::new(body.cluster_id), &claims.uid)
        .await?;

    Ok(Json(ClusterStatusResponse {
        status: cluster.status,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleClusterRequest {
    pub cluster_id: String,
    pub trade_profit: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleClusterResponse {
    pub status: ClusterStatus,
    pub settlement: SettlementBreakdown,
}

/// Active -> Settling; distributes the trade result.
pub async fn settle_cluster(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SettleClusterRequest>,
) -> Result<Json<SettleClusterResponse>, AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;
    require_underwriter(&claims)?;

    let settlement = state
        .repo
        .settle_cluster(&ClusterId::new(body.cluster_id), body.trade_profit)
        .await?;

    Ok(Json(SettleClusterResponse {
        status: ClusterStatus::Settling,
        settlement,
    }))
}

/// Settling -> Closed; terminal.
pub async fn close_cluster(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ClusterActionRequest>,
) -> Result<Json<ClusterStatusResponse>, AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;
    require_underwriter(&claims)?;

    let cluster = state
        .repo
        .close_cluster(&ClusterId::new(body.cluster_id))
        .await?;

    Ok(Json(ClusterStatusResponse {
        status: cluster.status,
    }))
}

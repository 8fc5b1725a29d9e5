//! Microloan campaign route.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::auth::{authenticate, require_underwriter};
use crate::domain::{ClusterId, MicroloanCampaign, RiskRating};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanRequest {
    pub cluster_id: String,
    pub borrower_group: String,
    pub description: String,
    pub risk_rating: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanResponse {
    pub status: &'static str,
    pub loan: MicroloanCampaign,
}

/// Link a loan campaign to an Active cluster; underwriter only.
pub async fn create_loan_campaign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<CreateLoanResponse>), AppError> {
    let claims = authenticate(state.verifier.as_ref(), &headers).await?;
    require_underwriter(&claims)?;

    let risk_rating = RiskRating::parse(&body.risk_rating).ok_or_else(|| {
        AppError::BadRequest(format!("unknown risk rating: {}", body.risk_rating))
    })?;
    if body.borrower_group.trim().is_empty() {
        return Err(AppError::BadRequest("borrowerGroup is required".to_string()));
    }

    let campaign = MicroloanCampaign::new(
        ClusterId::new(body.cluster_id),
        body.borrower_group,
        body.description,
        risk_rating,
    );
    state.repo.create_loan_campaign(&campaign).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateLoanResponse {
            status: "success",
            loan: campaign,
        }),
    ))
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error taxonomy.
///
/// Domain failures are raised at the point of precondition failure, inside
/// the store transaction when applicable, so a failed transition never
/// commits a partial write. `StoreConflict` is the only transient variant;
/// callers may retry it with fresh reads.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthenticated(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("This cluster is already full")]
    ClusterFull,
    #[error("You have already invested in this cluster")]
    AlreadyInvested,
    #[error("This cluster has already been settled")]
    AlreadySettled,
    #[error("No entitlement records exist for this cluster; cannot settle")]
    NoEntitlementRecords,
    #[error("Concurrent update conflict; retry the operation")]
    StoreConflict,
    #[error("Token ledger call failed: {0}")]
    ExternalLedger(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind string for the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::ClusterNotFound(_) => "cluster_not_found",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::ClusterFull => "cluster_full",
            AppError::AlreadyInvested => "already_invested",
            AppError::AlreadySettled => "already_settled",
            AppError::NoEntitlementRecords => "no_entitlement_records",
            AppError::StoreConflict => "store_conflict",
            AppError::ExternalLedger(_) => "external_ledger_failure",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ClusterNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_)
            | AppError::ClusterFull
            | AppError::AlreadyInvested
            | AppError::AlreadySettled
            | AppError::NoEntitlementRecords
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreConflict => StatusCode::CONFLICT,
            AppError::ExternalLedger(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_busy(&err) {
            AppError::StoreConflict
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

/// SQLite reports optimistic-snapshot write conflicts and writer contention
/// as busy/locked database errors.
fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let msg = db.message().to_lowercase();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
        _ => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

//! Repository layer: every cluster state transition is one atomic SQLite
//! transaction with all reads issued before any write.
//!
//! Methods are organized across submodules by domain:
//! - `clusters.rs` - create, read, fund, close
//! - `admission.rs` - the concurrency-critical investment admission path
//! - `settlement.rs` - the settle transition and settlement reads
//! - `entitlements.rs` - entitlement reads and token-id recording
//! - `loans.rs` - microloan campaign linkage
//!
//! Optimistic concurrency: WAL snapshot transactions fail their write
//! upgrade (busy/locked) when the database changed after the reads, and
//! every guarded write is additionally conditioned on the expected prior
//! value. Both paths surface as `StoreConflict`; public transition methods
//! re-run the whole body with fresh reads up to `MAX_TXN_ATTEMPTS` before
//! letting the conflict escape to the caller.

mod admission;
mod clusters;
mod entitlements;
mod loans;
mod settlement;

pub use admission::{AdmissionOutcome, AdmissionRequest};

use crate::domain::{
    Cluster, ClusterId, ClusterStatus, Decimal, EntitlementKind, EntitlementRecord,
    EntitlementStatus, Investment, LoanStatus, MicroloanCampaign, RiskRating,
    SettlementBreakdown, TimeMs, UserId, WalletAddress,
};
use crate::error::AppError;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::future::Future;

/// Attempts per transition before a conflict escapes as `StoreConflict`.
pub(crate) const MAX_TXN_ATTEMPTS: u32 = 5;

/// Repository for ledger-store operations.
#[derive(Debug)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Re-run a transaction body on optimistic conflict, with fresh reads each
/// attempt. Only `StoreConflict` is retried; domain errors propagate
/// immediately.
pub(crate) async fn with_conflict_retry<T, F, Fut>(op: &str, mut body: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match body().await {
            Err(AppError::StoreConflict) if attempt < MAX_TXN_ATTEMPTS => {
                tracing::debug!(op, attempt, "store conflict, retrying with fresh reads");
            }
            other => return other,
        }
    }
}

// =========================================================================
// Row mapping
// =========================================================================

pub(crate) fn parse_decimal(field: &str, s: &str) -> Result<Decimal, AppError> {
    Decimal::from_str_canonical(s)
        .map_err(|e| AppError::Internal(format!("corrupt decimal in {}: {} ({})", field, s, e)))
}

fn parse_decimal_opt(field: &str, s: Option<String>) -> Result<Option<Decimal>, AppError> {
    s.map(|v| parse_decimal(field, &v)).transpose()
}

pub(crate) fn cluster_from_row(row: &SqliteRow) -> Result<Cluster, AppError> {
    let status_str: String = row.get("status");
    let status = ClusterStatus::parse(&status_str)
        .ok_or_else(|| AppError::Internal(format!("unknown cluster status: {}", status_str)))?;

    let total_value: String = row.get("total_value");

    Ok(Cluster {
        id: ClusterId::new(row.get::<String, _>("id")),
        status,
        total_value: parse_decimal("clusters.total_value", &total_value)?,
        slots: row.get("slots"),
        slots_filled: row.get("slots_filled"),
        created_at: TimeMs::new(row.get("created_at")),
        created_by: UserId::new(row.get::<String, _>("created_by")),
        funded_by: row.get::<Option<String>, _>("funded_by").map(UserId::new),
        funded_at: row.get::<Option<i64>, _>("funded_at").map(TimeMs::new),
        activated_at: row.get::<Option<i64>, _>("activated_at").map(TimeMs::new),
        profit: parse_decimal_opt("clusters.profit", row.get("profit"))?,
        closed_at: row.get::<Option<i64>, _>("closed_at").map(TimeMs::new),
        has_loan_assigned: row.get::<i64, _>("has_loan_assigned") != 0,
    })
}

pub(crate) fn investment_from_row(row: &SqliteRow) -> Result<Investment, AppError> {
    let amount: String = row.get("amount");

    Ok(Investment {
        cluster_id: ClusterId::new(row.get::<String, _>("cluster_id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        user_contact: row.get("user_contact"),
        amount: parse_decimal("investments.amount", &amount)?,
        invested_at: TimeMs::new(row.get("invested_at")),
        wallet_address: row
            .get::<Option<String>, _>("wallet_address")
            .map(WalletAddress::new),
    })
}

pub(crate) fn entitlement_from_row(row: &SqliteRow) -> Result<EntitlementRecord, AppError> {
    let kind_str: String = row.get("kind");
    let kind = EntitlementKind::parse(&kind_str)
        .ok_or_else(|| AppError::Internal(format!("unknown entitlement kind: {}", kind_str)))?;

    let status_str: String = row.get("status");
    let status = EntitlementStatus::parse(&status_str)
        .ok_or_else(|| AppError::Internal(format!("unknown entitlement status: {}", status_str)))?;

    let entitlement: String = row.get("entitlement");

    Ok(EntitlementRecord {
        id: row.get("id"),
        owner_id: UserId::new(row.get::<String, _>("owner_id")),
        owner_wallet: row
            .get::<Option<String>, _>("owner_wallet")
            .map(WalletAddress::new),
        cluster_id: ClusterId::new(row.get::<String, _>("cluster_id")),
        kind,
        entitlement: parse_decimal("entitlements.entitlement", &entitlement)?,
        status,
        issued_at: TimeMs::new(row.get("issued_at")),
        settled_at: row.get::<Option<i64>, _>("settled_at").map(TimeMs::new),
        token_id: row.get("token_id"),
        tx_hash: row.get("tx_hash"),
    })
}

pub(crate) fn settlement_from_row(row: &SqliteRow) -> Result<SettlementBreakdown, AppError> {
    let get = |field: &str| -> Result<Decimal, AppError> {
        let s: String = row.get(field);
        parse_decimal(&format!("settlements.{}", field), &s)
    };

    Ok(SettlementBreakdown {
        total_profit: get("total_profit")?,
        underwriter_interest_rate: get("underwriter_interest_rate")?,
        underwriter_principal: get("underwriter_principal")?,
        underwriter_repayment: get("underwriter_repayment")?,
        platform_fee_rate: get("platform_fee_rate")?,
        platform_fee: get("platform_fee")?,
        net_profit_for_investors: get("net_profit_for_investors")?,
        profit_per_investor_share: get("profit_per_investor_share")?,
    })
}

pub(crate) fn loan_from_row(row: &SqliteRow) -> Result<MicroloanCampaign, AppError> {
    let risk_str: String = row.get("risk_rating");
    let risk_rating = RiskRating::parse(&risk_str)
        .ok_or_else(|| AppError::Internal(format!("unknown risk rating: {}", risk_str)))?;

    let status_str: String = row.get("status");
    let status = LoanStatus::parse(&status_str)
        .ok_or_else(|| AppError::Internal(format!("unknown loan status: {}", status_str)))?;

    let loan_amount: String = row.get("loan_amount");
    let repaid_amount: String = row.get("repaid_amount");

    Ok(MicroloanCampaign {
        id: row.get("id"),
        cluster_id: ClusterId::new(row.get::<String, _>("cluster_id")),
        borrower_group: row.get("borrower_group"),
        description: row.get("description"),
        risk_rating,
        loan_amount: parse_decimal("loan_campaigns.loan_amount", &loan_amount)?,
        duration_months: row.get("duration_months"),
        repayment_plan: row.get("repayment_plan"),
        status,
        repaid_amount: parse_decimal("loan_campaigns.repaid_amount", &repaid_amount)?,
        created_at: TimeMs::new(row.get("created_at")),
    })
}

//! Investment admission: the concurrency-critical path.
//!
//! Many callers may race to fill the final slot of an Open cluster. The
//! whole admission is one snapshot transaction: reads (cluster, own stake,
//! all existing stakes) strictly before writes (new stake, slot increment,
//! conditional activation + entitlement issuance). A stale read surfaces as
//! a conflict and the body is re-run with fresh reads.

use super::{cluster_from_row, investment_from_row, with_conflict_retry, Repository};
use crate::domain::{
    Cluster, ClusterId, ClusterStatus, Decimal, EntitlementRecord, Investment, SettlementParams,
    TimeMs, UserId, WalletAddress,
};
use crate::error::AppError;
use sqlx::{Sqlite, Transaction};
use tracing::info;

/// One user's request to take a slot in a cluster.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub cluster_id: ClusterId,
    pub user_id: UserId,
    pub user_contact: String,
    pub wallet_address: Option<WalletAddress>,
}

/// Committed result of an admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionOutcome {
    pub slots: i64,
    pub slots_filled: i64,
    /// True when this admission filled the last slot and issued the
    /// cluster's entitlement records.
    pub activated: bool,
}

impl Repository {
    /// Admit one user's stake into an Open cluster.
    ///
    /// Guarantees: no over-subscription, at most one stake per user, and
    /// exactly-once entitlement issuance when the final slot fills.
    pub async fn admit_investment(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, AppError> {
        with_conflict_retry("admit_investment", || self.try_admit_investment(request)).await
    }

    async fn try_admit_investment(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, AppError> {
        let mut tx = self.pool().begin().await?;

        // -- reads, all before any write --
        let row = sqlx::query("SELECT * FROM clusters WHERE id = ?")
            .bind(request.cluster_id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::ClusterNotFound(request.cluster_id.to_string()))?;
        let cluster = cluster_from_row(&row)?;

        let own_stake: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM investments WHERE cluster_id = ? AND user_id = ?",
        )
        .bind(request.cluster_id.as_str())
        .bind(request.user_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let existing_rows =
            sqlx::query("SELECT * FROM investments WHERE cluster_id = ? ORDER BY invested_at ASC")
                .bind(request.cluster_id.as_str())
                .fetch_all(&mut *tx)
                .await?;
        let existing: Vec<Investment> = existing_rows
            .iter()
            .map(investment_from_row)
            .collect::<Result<_, _>>()?;

        // -- validation against the snapshot we just read --
        if cluster.status != ClusterStatus::Open {
            return Err(AppError::InvalidTransition(format!(
                "cluster {} is {}, not open for investment",
                cluster.id, cluster.status
            )));
        }
        if cluster.slots_filled >= cluster.slots {
            return Err(AppError::ClusterFull);
        }
        if own_stake.is_some() {
            return Err(AppError::AlreadyInvested);
        }

        // -- writes --
        let investment = Investment::new(
            request.cluster_id.clone(),
            request.user_id.clone(),
            request.user_contact.clone(),
            request.wallet_address.clone(),
        );
        insert_investment(&mut tx, &investment).await?;

        let new_slots_filled = cluster.slots_filled + 1;
        let result = sqlx::query(
            r#"
            UPDATE clusters SET slots_filled = ?
            WHERE id = ? AND slots_filled = ? AND status = 'Open'
            "#,
        )
        .bind(new_slots_filled)
        .bind(request.cluster_id.as_str())
        .bind(cluster.slots_filled)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::StoreConflict);
        }

        let activated = new_slots_filled == cluster.slots;
        if activated {
            activate_and_issue(&mut tx, &cluster, &investment, &existing).await?;
        }

        tx.commit().await?;

        info!(
            cluster = %request.cluster_id,
            user = %request.user_id,
            slots_filled = new_slots_filled,
            activated,
            "investment admitted"
        );

        Ok(AdmissionOutcome {
            slots: cluster.slots,
            slots_filled: new_slots_filled,
            activated,
        })
    }
}

/// The fill trigger: flip the cluster to Active and issue one underwriter
/// entitlement plus one investor entitlement per stake, all inside the
/// admission transaction.
async fn activate_and_issue(
    tx: &mut Transaction<'_, Sqlite>,
    cluster: &Cluster,
    admitted: &Investment,
    existing: &[Investment],
) -> Result<(), AppError> {
    let underwriter = cluster.funded_by.clone().ok_or_else(|| {
        AppError::Internal(format!("open cluster {} has no underwriter", cluster.id))
    })?;

    let now = TimeMs::now();
    let result = sqlx::query(
        r#"
        UPDATE clusters SET status = 'Active', activated_at = ?
        WHERE id = ? AND status = 'Open'
        "#,
    )
    .bind(now.as_i64())
    .bind(cluster.id.as_str())
    .execute(&mut **tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::StoreConflict);
    }

    let params = SettlementParams::default();
    let repayment = params.principal * (Decimal::one() + params.interest_rate);
    let underwriter_record =
        EntitlementRecord::issue_underwriter(underwriter, cluster.id.clone(), repayment, now);
    insert_entitlement(tx, &underwriter_record).await?;

    for investment in existing.iter().chain(std::iter::once(admitted)) {
        let record = EntitlementRecord::issue_investor(
            investment.user_id.clone(),
            investment.wallet_address.clone(),
            cluster.id.clone(),
            now,
        );
        insert_entitlement(tx, &record).await?;
    }

    info!(
        cluster = %cluster.id,
        investor_records = existing.len() + 1,
        "cluster activated, entitlement records issued"
    );
    Ok(())
}

async fn insert_investment(
    tx: &mut Transaction<'_, Sqlite>,
    investment: &Investment,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO investments
        (cluster_id, user_id, user_contact, amount, invested_at, wallet_address)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(investment.cluster_id.as_str())
    .bind(investment.user_id.as_str())
    .bind(&investment.user_contact)
    .bind(investment.amount.to_canonical_string())
    .bind(investment.invested_at.as_i64())
    .bind(investment.wallet_address.as_ref().map(|w| w.as_str()))
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        // A same-user stake committed after our snapshot read; the retry
        // will observe it and answer AlreadyInvested.
        if is_unique_violation(&e) {
            AppError::StoreConflict
        } else {
            AppError::from(e)
        }
    })?;
    Ok(())
}

async fn insert_entitlement(
    tx: &mut Transaction<'_, Sqlite>,
    record: &EntitlementRecord,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO entitlements
        (id, owner_id, owner_wallet, cluster_id, kind, entitlement, status, issued_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(record.owner_id.as_str())
    .bind(record.owner_wallet.as_ref().map(|w| w.as_str()))
    .bind(record.cluster_id.as_str())
    .bind(record.kind.as_str())
    .bind(record.entitlement.to_canonical_string())
    .bind(record.status.as_str())
    .bind(record.issued_at.as_i64())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}

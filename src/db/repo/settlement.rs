//! The settle transition: Active -> Settling with profit distribution.

use super::{cluster_from_row, settlement_from_row, with_conflict_retry, Repository};
use crate::domain::{
    compute_settlement, ClusterId, ClusterStatus, Decimal, SettlementBreakdown, SettlementParams,
    TimeMs,
};
use crate::error::AppError;
use tracing::info;

impl Repository {
    /// Settle an Active cluster against the reported trade profit.
    ///
    /// Writes the write-once settlement record, flips the cluster to
    /// Settling, and marks every entitlement record claimable (investor
    /// records also receive their per-share entitlement), all in one
    /// transaction.
    pub async fn settle_cluster(
        &self,
        id: &ClusterId,
        trade_profit: Decimal,
    ) -> Result<SettlementBreakdown, AppError> {
        with_conflict_retry("settle_cluster", || self.try_settle_cluster(id, trade_profit)).await
    }

    async fn try_settle_cluster(
        &self,
        id: &ClusterId,
        trade_profit: Decimal,
    ) -> Result<SettlementBreakdown, AppError> {
        let mut tx = self.pool().begin().await?;

        // -- reads --
        let row = sqlx::query("SELECT * FROM clusters WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::ClusterNotFound(id.to_string()))?;
        let cluster = cluster_from_row(&row)?;

        let already_settled: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM settlements WHERE cluster_id = ?")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        let record_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM entitlements WHERE cluster_id = ?")
                .bind(id.as_str())
                .fetch_one(&mut *tx)
                .await?;

        // -- validation --
        if already_settled.is_some() {
            return Err(AppError::AlreadySettled);
        }
        if cluster.status != ClusterStatus::Active {
            return Err(AppError::InvalidTransition(format!(
                "cluster {} is {}, only an Active cluster can be settled",
                id, cluster.status
            )));
        }
        // Activation always issues entitlement records; none existing means
        // activation never completed correctly.
        if record_count == 0 {
            return Err(AppError::NoEntitlementRecords);
        }

        // -- writes --
        let breakdown = compute_settlement(&SettlementParams::default(), trade_profit);
        let settled_at = TimeMs::now();

        sqlx::query(
            r#"
            INSERT INTO settlements
            (cluster_id, total_profit, underwriter_interest_rate, underwriter_principal,
             underwriter_repayment, platform_fee_rate, platform_fee,
             net_profit_for_investors, profit_per_investor_share, settled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(breakdown.total_profit.to_canonical_string())
        .bind(breakdown.underwriter_interest_rate.to_canonical_string())
        .bind(breakdown.underwriter_principal.to_canonical_string())
        .bind(breakdown.underwriter_repayment.to_canonical_string())
        .bind(breakdown.platform_fee_rate.to_canonical_string())
        .bind(breakdown.platform_fee.to_canonical_string())
        .bind(breakdown.net_profit_for_investors.to_canonical_string())
        .bind(breakdown.profit_per_investor_share.to_canonical_string())
        .bind(settled_at.as_i64())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE clusters SET status = 'Settling', profit = ?
            WHERE id = ? AND status = 'Active'
            "#,
        )
        .bind(trade_profit.to_canonical_string())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::StoreConflict);
        }

        sqlx::query(
            r#"
            UPDATE entitlements SET entitlement = ?, status = 'claimable', settled_at = ?
            WHERE cluster_id = ? AND kind = 'investor'
            "#,
        )
        .bind(breakdown.profit_per_investor_share.to_canonical_string())
        .bind(settled_at.as_i64())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;

        // Underwriter entitlement was fixed at issuance; only the status moves.
        sqlx::query(
            r#"
            UPDATE entitlements SET status = 'claimable', settled_at = ?
            WHERE cluster_id = ? AND kind = 'underwriter'
            "#,
        )
        .bind(settled_at.as_i64())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            cluster = %id,
            profit = %trade_profit,
            per_share = %breakdown.profit_per_investor_share,
            "cluster settled"
        );
        Ok(breakdown)
    }

    /// Fetch the settlement record for a cluster, if it has one.
    pub async fn get_settlement(
        &self,
        id: &ClusterId,
    ) -> Result<Option<SettlementBreakdown>, AppError> {
        let row = sqlx::query("SELECT * FROM settlements WHERE cluster_id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(settlement_from_row).transpose()
    }
}

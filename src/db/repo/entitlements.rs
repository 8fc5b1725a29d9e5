//! Entitlement reads and on-chain token-id recording.

use super::{entitlement_from_row, Repository};
use crate::domain::{ClusterId, EntitlementRecord, UserId};
use crate::error::AppError;
use tracing::info;

impl Repository {
    /// All entitlement records of a cluster.
    pub async fn entitlements_for_cluster(
        &self,
        cluster_id: &ClusterId,
    ) -> Result<Vec<EntitlementRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM entitlements WHERE cluster_id = ? ORDER BY kind ASC, issued_at ASC, id ASC",
        )
        .bind(cluster_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(entitlement_from_row).collect()
    }

    /// All entitlement records owned by a user.
    pub async fn entitlements_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<EntitlementRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM entitlements WHERE owner_id = ? ORDER BY issued_at DESC, id ASC",
        )
        .bind(owner.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(entitlement_from_row).collect()
    }

    /// Records whose on-chain twin has not been minted yet.
    ///
    /// These exist because the chain call happens strictly after the
    /// off-chain commit; the reconcile pass drains this set.
    pub async fn entitlements_without_token(&self) -> Result<Vec<EntitlementRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM entitlements WHERE token_id IS NULL ORDER BY issued_at ASC, id ASC",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(entitlement_from_row).collect()
    }

    /// Record the minted token onto an entitlement record.
    ///
    /// Idempotent: a record that already has a token id is left untouched,
    /// so re-running reconciliation can never overwrite a mint.
    pub async fn record_minted_token(
        &self,
        entitlement_id: &str,
        token_id: i64,
        tx_hash: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE entitlements SET token_id = ?, tx_hash = ?
            WHERE id = ? AND token_id IS NULL
            "#,
        )
        .bind(token_id)
        .bind(tx_hash)
        .bind(entitlement_id)
        .execute(self.pool())
        .await?;

        let recorded = result.rows_affected() > 0;
        if recorded {
            info!(entitlement = entitlement_id, token_id, "token id recorded");
        }
        Ok(recorded)
    }
}

//! Microloan campaign linkage: a simple record tied to an Active cluster.

use super::{cluster_from_row, loan_from_row, with_conflict_retry, Repository};
use crate::domain::{ClusterId, ClusterStatus, MicroloanCampaign};
use crate::error::AppError;
use tracing::info;

impl Repository {
    /// Create a loan campaign against an Active cluster and flag the
    /// cluster as having a loan assigned.
    pub async fn create_loan_campaign(
        &self,
        campaign: &MicroloanCampaign,
    ) -> Result<(), AppError> {
        with_conflict_retry("create_loan_campaign", || {
            self.try_create_loan_campaign(campaign)
        })
        .await
    }

    async fn try_create_loan_campaign(
        &self,
        campaign: &MicroloanCampaign,
    ) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query("SELECT * FROM clusters WHERE id = ?")
            .bind(campaign.cluster_id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::ClusterNotFound(campaign.cluster_id.to_string()))?;
        let cluster = cluster_from_row(&row)?;

        if cluster.status != ClusterStatus::Active {
            return Err(AppError::InvalidTransition(format!(
                "cluster {} is {}, a loan can only be linked to an Active cluster",
                cluster.id, cluster.status
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO loan_campaigns
            (id, cluster_id, borrower_group, description, risk_rating, loan_amount,
             duration_months, repayment_plan, status, repaid_amount, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&campaign.id)
        .bind(campaign.cluster_id.as_str())
        .bind(&campaign.borrower_group)
        .bind(&campaign.description)
        .bind(campaign.risk_rating.as_str())
        .bind(campaign.loan_amount.to_canonical_string())
        .bind(campaign.duration_months)
        .bind(&campaign.repayment_plan)
        .bind(campaign.status.as_str())
        .bind(campaign.repaid_amount.to_canonical_string())
        .bind(campaign.created_at.as_i64())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE clusters SET has_loan_assigned = 1 WHERE id = ? AND status = 'Active'",
        )
        .bind(campaign.cluster_id.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::StoreConflict);
        }

        tx.commit().await?;
        info!(cluster = %campaign.cluster_id, loan = %campaign.id, "loan campaign created");
        Ok(())
    }

    /// All campaigns funded by a cluster.
    pub async fn loan_campaigns_for_cluster(
        &self,
        cluster_id: &ClusterId,
    ) -> Result<Vec<MicroloanCampaign>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM loan_campaigns WHERE cluster_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(cluster_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(loan_from_row).collect()
    }
}

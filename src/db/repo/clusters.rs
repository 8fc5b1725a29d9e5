//! Cluster create/read and the fund/close transitions.

use super::{cluster_from_row, with_conflict_retry, Repository};
use crate::domain::{Cluster, ClusterId, ClusterStatus, TimeMs, UserId};
use crate::error::AppError;
use tracing::info;

impl Repository {
    /// Insert a new Pending cluster.
    pub async fn create_cluster(&self, cluster: &Cluster) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO clusters
            (id, status, total_value, slots, slots_filled, created_at, created_by, has_loan_assigned)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(cluster.id.as_str())
        .bind(cluster.status.as_str())
        .bind(cluster.total_value.to_canonical_string())
        .bind(cluster.slots)
        .bind(cluster.slots_filled)
        .bind(cluster.created_at.as_i64())
        .bind(cluster.created_by.as_str())
        .bind(cluster.has_loan_assigned as i64)
        .execute(self.pool())
        .await?;

        info!(cluster = %cluster.id, slots = cluster.slots, "cluster created");
        Ok(())
    }

    /// Fetch a cluster by id.
    pub async fn get_cluster(&self, id: &ClusterId) -> Result<Option<Cluster>, AppError> {
        let row = sqlx::query("SELECT * FROM clusters WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(cluster_from_row).transpose()
    }

    /// List all clusters, newest first.
    pub async fn list_clusters(&self) -> Result<Vec<Cluster>, AppError> {
        let rows = sqlx::query("SELECT * FROM clusters ORDER BY created_at DESC, id DESC")
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(cluster_from_row).collect()
    }

    /// Pending -> Open: an underwriter commits the principal.
    pub async fn fund_cluster(
        &self,
        id: &ClusterId,
        underwriter: &UserId,
    ) -> Result<Cluster, AppError> {
        with_conflict_retry("fund_cluster", || self.try_fund_cluster(id, underwriter)).await
    }

    async fn try_fund_cluster(
        &self,
        id: &ClusterId,
        underwriter: &UserId,
    ) -> Result<Cluster, AppError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query("SELECT * FROM clusters WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::ClusterNotFound(id.to_string()))?;
        let cluster = cluster_from_row(&row)?;

        if cluster.status != ClusterStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "cluster {} is {}, only a Pending cluster can be funded",
                id, cluster.status
            )));
        }

        let funded_at = TimeMs::now();
        // Status re-validated inside the write; zero rows means someone
        // moved the cluster since our read.
        let result = sqlx::query(
            r#"
            UPDATE clusters SET status = 'Open', funded_by = ?, funded_at = ?
            WHERE id = ? AND status = 'Pending'
            "#,
        )
        .bind(underwriter.as_str())
        .bind(funded_at.as_i64())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::StoreConflict);
        }

        tx.commit().await?;
        info!(cluster = %id, underwriter = %underwriter, "cluster funded");

        Ok(Cluster {
            status: ClusterStatus::Open,
            funded_by: Some(underwriter.clone()),
            funded_at: Some(funded_at),
            ..cluster
        })
    }

    /// Settling -> Closed: terminal transition.
    pub async fn close_cluster(&self, id: &ClusterId) -> Result<Cluster, AppError> {
        with_conflict_retry("close_cluster", || self.try_close_cluster(id)).await
    }

    async fn try_close_cluster(&self, id: &ClusterId) -> Result<Cluster, AppError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query("SELECT * FROM clusters WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::ClusterNotFound(id.to_string()))?;
        let cluster = cluster_from_row(&row)?;

        if cluster.status != ClusterStatus::Settling {
            return Err(AppError::InvalidTransition(format!(
                "cluster {} is {}, only a Settling cluster can be closed",
                id, cluster.status
            )));
        }

        let closed_at = TimeMs::now();
        let result = sqlx::query(
            r#"
            UPDATE clusters SET status = 'Closed', closed_at = ?
            WHERE id = ? AND status = 'Settling'
            "#,
        )
        .bind(closed_at.as_i64())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::StoreConflict);
        }

        tx.commit().await?;
        info!(cluster = %id, "cluster closed");

        Ok(Cluster {
            status: ClusterStatus::Closed,
            closed_at: Some(closed_at),
            ..cluster
        })
    }
}

//! Entitlement issuance bridge: the off-chain -> on-chain half of the
//! split-phase write.
//!
//! The store transaction that issues entitlement records has already
//! committed by the time the bridge runs. Each record lacking a token id is
//! minted individually; a failure leaves that record unminted and is only
//! reported, never rolled back. `reconcile` re-runs the same pass over
//! every unminted record and is safe to call repeatedly.

use super::{TokenLedger, TokenLedgerError};
use crate::db::Repository;
use crate::domain::{ClusterId, EntitlementRecord};
use crate::error::AppError;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one mint pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MintReport {
    /// Tokens minted and recorded in this pass.
    pub minted: usize,
    /// Records skipped because the owner never supplied a wallet.
    pub skipped_no_wallet: usize,
    /// Mint calls that failed; the records stay unminted.
    pub failed: usize,
}

impl MintReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Correlates off-chain entitlement records with the external token ledger.
#[derive(Debug)]
pub struct EntitlementBridge {
    repo: Arc<Repository>,
    ledger: Arc<dyn TokenLedger>,
}

impl EntitlementBridge {
    pub fn new(repo: Arc<Repository>, ledger: Arc<dyn TokenLedger>) -> Self {
        Self { repo, ledger }
    }

    /// Mint on-chain twins for a cluster's unminted entitlement records.
    ///
    /// Called after an admission commit activates the cluster.
    pub async fn mint_for_cluster(&self, cluster_id: &ClusterId) -> Result<MintReport, AppError> {
        let records = self.repo.entitlements_for_cluster(cluster_id).await?;
        let unminted: Vec<_> = records.into_iter().filter(|r| !r.is_minted()).collect();
        self.mint_records(unminted).await
    }

    /// Mint on-chain twins for every unminted record in the store.
    ///
    /// Idempotent by construction: minted records are excluded by the
    /// query, and `record_minted_token` never overwrites an existing id.
    pub async fn reconcile(&self) -> Result<MintReport, AppError> {
        let unminted = self.repo.entitlements_without_token().await?;
        self.mint_records(unminted).await
    }

    async fn mint_records(&self, records: Vec<EntitlementRecord>) -> Result<MintReport, AppError> {
        let mut report = MintReport::default();

        for record in records {
            let Some(wallet) = record.owner_wallet.clone() else {
                report.skipped_no_wallet += 1;
                continue;
            };

            match self
                .ledger
                .mint(&wallet, &record.cluster_id, record.kind, record.entitlement)
                .await
            {
                Ok(receipt) => {
                    self.repo
                        .record_minted_token(&record.id, receipt.token_id, &receipt.tx_hash)
                        .await?;
                    report.minted += 1;
                }
                Err(err) => {
                    // Off-chain state stays committed; the record remains
                    // unminted until a later reconcile succeeds.
                    warn!(
                        entitlement = %record.id,
                        cluster = %record.cluster_id,
                        error = %err,
                        "mint failed, record left unminted"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.minted > 0 || report.failed > 0 {
            info!(
                minted = report.minted,
                failed = report.failed,
                skipped = report.skipped_no_wallet,
                "mint pass finished"
            );
        }
        Ok(report)
    }
}

impl From<TokenLedgerError> for AppError {
    fn from(err: TokenLedgerError) -> Self {
        AppError::ExternalLedger(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockTokenLedger;
    use crate::db::{init_db, AdmissionRequest};
    use crate::domain::{Cluster, EntitlementKind, UserId, WalletAddress};
    use tempfile::TempDir;

    async fn setup() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool)), temp_dir)
    }

    async fn activated_cluster(repo: &Repository, wallets: bool) -> Cluster {
        let cluster = Cluster::new_pending(UserId::new("creator"), 2);
        repo.create_cluster(&cluster).await.unwrap();
        repo.fund_cluster(&cluster.id, &UserId::new("uw"))
            .await
            .unwrap();
        for user in ["u1", "u2"] {
            repo.admit_investment(&AdmissionRequest {
                cluster_id: cluster.id.clone(),
                user_id: UserId::new(user),
                user_contact: format!("{}@example.com", user),
                wallet_address: wallets.then(|| WalletAddress::new(format!("0x{}", user))),
            })
            .await
            .unwrap();
        }
        repo.get_cluster(&cluster.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_mint_for_cluster_records_token_ids() {
        let (repo, _temp) = setup().await;
        let cluster = activated_cluster(&repo, true).await;

        let ledger = Arc::new(MockTokenLedger::new());
        let bridge = EntitlementBridge::new(repo.clone(), ledger.clone());

        let report = bridge.mint_for_cluster(&cluster.id).await.unwrap();
        // Two investor records carry wallets; the underwriter record has none.
        assert_eq!(report.minted, 2);
        assert_eq!(report.skipped_no_wallet, 1);
        assert!(report.is_clean());

        let records = repo.entitlements_for_cluster(&cluster.id).await.unwrap();
        for record in records
            .iter()
            .filter(|r| r.kind == EntitlementKind::Investor)
        {
            assert!(record.is_minted());
            assert!(record.tx_hash.is_some());
        }
    }

    #[tokio::test]
    async fn test_failed_mint_left_for_reconcile() {
        let (repo, _temp) = setup().await;
        let cluster = activated_cluster(&repo, true).await;

        let ledger = Arc::new(MockTokenLedger::failing_first(1));
        let bridge = EntitlementBridge::new(repo.clone(), ledger.clone());

        let report = bridge.mint_for_cluster(&cluster.id).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.minted, 1);

        // Reconcile drains the remainder.
        let report = bridge.reconcile().await.unwrap();
        assert_eq!(report.failed, 0);
        assert_eq!(report.minted, 1);

        // A further reconcile has nothing left to do for wallet-bearing records.
        let report = bridge.reconcile().await.unwrap();
        assert_eq!(report.minted, 0);
        assert_eq!(report.skipped_no_wallet, 1);
    }

    #[tokio::test]
    async fn test_mint_pass_without_wallets_mints_nothing() {
        let (repo, _temp) = setup().await;
        let cluster = activated_cluster(&repo, false).await;

        let ledger = Arc::new(MockTokenLedger::new());
        let bridge = EntitlementBridge::new(repo.clone(), ledger.clone());

        let report = bridge.mint_for_cluster(&cluster.id).await.unwrap();
        assert_eq!(report.minted, 0);
        assert_eq!(report.skipped_no_wallet, 3);
        assert!(ledger.minted().is_empty());
    }
}

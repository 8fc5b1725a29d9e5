use clusterfi_ledger::db::{init_db, AdmissionRequest};
use clusterfi_ledger::domain::{Cluster, EntitlementKind, UserId, WalletAddress};
use clusterfi_ledger::{AppError, Repository};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

async fn open_cluster(repo: &Repository, slots: i64) -> Cluster {
    let cluster = Cluster::new_pending(UserId::new("creator"), slots);
    repo.create_cluster(&cluster).await.unwrap();
    repo.fund_cluster(&cluster.id, &UserId::new("uw"))
        .await
        .unwrap()
}

/// Keep retrying past conflict exhaustion so every contender reaches a
/// domain verdict.
async fn admit_until_decided(
    repo: &Repository,
    request: &AdmissionRequest,
) -> Result<(), AppError> {
    loop {
        match repo.admit_investment(request).await {
            Err(AppError::StoreConflict) => continue,
            Ok(_) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

#[tokio::test]
async fn test_concurrent_admissions_never_oversell() {
    let (repo, _temp) = setup_repo().await;
    let slots = 3;
    let contenders = 8;
    let cluster = open_cluster(&repo, slots).await;

    let tasks: Vec<_> = (0..contenders)
        .map(|i| {
            let repo = repo.clone();
            let cluster_id = cluster.id.clone();
            tokio::spawn(async move {
                let request = AdmissionRequest {
                    cluster_id,
                    user_id: UserId::new(&format!("user-{}", i)),
                    user_contact: format!("user-{}@example.com", i),
                    wallet_address: Some(WalletAddress::new(format!("0x{:02x}", i))),
                };
                admit_until_decided(&repo, &request).await
            })
        })
        .collect();

    let mut admitted = 0;
    let mut rejected = 0;
    for task in futures::future::join_all(tasks).await {
        match task.unwrap() {
            Ok(()) => admitted += 1,
            Err(AppError::InvalidTransition(_)) | Err(AppError::ClusterFull) => rejected += 1,
            Err(other) => panic!("unexpected admission error: {}", other),
        }
    }
    assert_eq!(admitted, slots);
    assert_eq!(rejected, contenders - slots);

    let final_state = repo.get_cluster(&cluster.id).await.unwrap().unwrap();
    assert_eq!(final_state.slots_filled, slots);
    assert_eq!(final_state.status.as_str(), "Active");

    // One investor record per committed stake, nothing more.
    let records = repo.entitlements_for_cluster(&cluster.id).await.unwrap();
    let investors = records
        .iter()
        .filter(|r| r.kind == EntitlementKind::Investor)
        .count();
    assert_eq!(investors as i64, slots);
}

#[tokio::test]
async fn test_activation_issues_one_record_per_stake_plus_underwriter() {
    let (repo, _temp) = setup_repo().await;
    let slots = 4;
    let cluster = open_cluster(&repo, slots).await;

    let tasks: Vec<_> = (0..slots)
        .map(|i| {
            let repo = repo.clone();
            let cluster_id = cluster.id.clone();
            tokio::spawn(async move {
                let request = AdmissionRequest {
                    cluster_id,
                    user_id: UserId::new(&format!("user-{}", i)),
                    user_contact: format!("user-{}@example.com", i),
                    wallet_address: None,
                };
                admit_until_decided(&repo, &request).await
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }

    let records = repo.entitlements_for_cluster(&cluster.id).await.unwrap();
    assert_eq!(records.len(), (slots + 1) as usize);

    let underwriters: Vec<_> = records
        .iter()
        .filter(|r| r.kind == EntitlementKind::Underwriter)
        .collect();
    assert_eq!(underwriters.len(), 1);
    assert_eq!(underwriters[0].owner_id, UserId::new("uw"));

    let investor_owners: HashSet<_> = records
        .iter()
        .filter(|r| r.kind == EntitlementKind::Investor)
        .map(|r| r.owner_id.clone())
        .collect();
    assert_eq!(investor_owners.len(), slots as usize);
}

#[tokio::test]
async fn test_same_user_racing_itself_lands_one_stake() {
    let (repo, _temp) = setup_repo().await;
    let cluster = open_cluster(&repo, 3).await;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let repo = repo.clone();
            let cluster_id = cluster.id.clone();
            tokio::spawn(async move {
                let request = AdmissionRequest {
                    cluster_id,
                    user_id: UserId::new("dupe"),
                    user_contact: "dupe@example.com".to_string(),
                    wallet_address: None,
                };
                admit_until_decided(&repo, &request).await
            })
        })
        .collect();

    let mut admitted = 0;
    let mut duplicates = 0;
    for task in futures::future::join_all(tasks).await {
        match task.unwrap() {
            Ok(()) => admitted += 1,
            Err(AppError::AlreadyInvested) => duplicates += 1,
            Err(other) => panic!("unexpected admission error: {}", other),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(duplicates, 3);

    let final_state = repo.get_cluster(&cluster.id).await.unwrap().unwrap();
    assert_eq!(final_state.slots_filled, 1);
}

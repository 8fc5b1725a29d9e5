//! Investment record: one user's stake in one cluster.

use crate::domain::{ClusterId, Decimal, TimeMs, UserId, WalletAddress};
use serde::{Deserialize, Serialize};

/// One user's stake in a cluster. Keyed by (cluster, user), which is what
/// enforces the at-most-one-investment-per-user invariant in the store.
/// Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub cluster_id: ClusterId,
    pub user_id: UserId,
    /// Contact label for display (email in the original deployment).
    pub user_contact: String,
    pub amount: Decimal,
    pub invested_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
}

impl Investment {
    /// Fixed per-slot stake, in currency units.
    pub fn slot_amount() -> Decimal {
        Decimal::from_int(25)
    }

    pub fn new(
        cluster_id: ClusterId,
        user_id: UserId,
        user_contact: String,
        wallet_address: Option<WalletAddress>,
    ) -> Self {
        Investment {
            cluster_id,
            user_id,
            user_contact,
            amount: Self::slot_amount(),
            invested_at: TimeMs::now(),
            wallet_address,
        }
    }
}

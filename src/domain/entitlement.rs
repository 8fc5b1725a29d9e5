//! Entitlement records: off-chain claim positions mirrored by on-chain tokens.

use crate::domain::{ClusterId, Decimal, TimeMs, UserId, WalletAddress};
use serde::{Deserialize, Serialize};

/// Which side of the cluster the entitlement pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementKind {
    /// Principal + interest, fixed at issuance.
    Underwriter,
    /// Per-share profit, written at settlement.
    Investor,
}

impl EntitlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementKind::Underwriter => "underwriter",
            EntitlementKind::Investor => "investor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "underwriter" => Some(EntitlementKind::Underwriter),
            "investor" => Some(EntitlementKind::Investor),
            _ => None,
        }
    }

    /// Small-integer discriminant used in the token contract's mint call.
    pub fn discriminant(&self) -> u8 {
        match self {
            EntitlementKind::Underwriter => 0,
            EntitlementKind::Investor => 1,
        }
    }
}

/// Claim state of an entitlement record.
///
/// `Claimed` exists for parsing externally-synced data only; this service
/// never writes it. The on-chain contract is authoritative for whether an
/// entitlement has actually been paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    PendingSettlement,
    Claimable,
    Claimed,
}

impl EntitlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::PendingSettlement => "pending_settlement",
            EntitlementStatus::Claimable => "claimable",
            EntitlementStatus::Claimed => "claimed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_settlement" => Some(EntitlementStatus::PendingSettlement),
            "claimable" => Some(EntitlementStatus::Claimable),
            "claimed" => Some(EntitlementStatus::Claimed),
            _ => None,
        }
    }
}

/// A claimable financial position against a cluster.
///
/// Exactly one underwriter record and exactly `slots` investor records exist
/// per activated cluster, created atomically when the cluster fills.
/// `token_id` is absent until the on-chain twin has been minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    pub id: String,
    pub owner_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_wallet: Option<WalletAddress>,
    pub cluster_id: ClusterId,
    pub kind: EntitlementKind,
    pub entitlement: Decimal,
    pub status: EntitlementStatus,
    pub issued_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl EntitlementRecord {
    fn issue(
        owner_id: UserId,
        owner_wallet: Option<WalletAddress>,
        cluster_id: ClusterId,
        kind: EntitlementKind,
        entitlement: Decimal,
        issued_at: TimeMs,
    ) -> Self {
        EntitlementRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            owner_wallet,
            cluster_id,
            kind,
            entitlement,
            status: EntitlementStatus::PendingSettlement,
            issued_at,
            settled_at: None,
            token_id: None,
            tx_hash: None,
        }
    }

    /// Underwriter record, entitlement fixed at issuance to
    /// principal x (1 + interest rate).
    pub fn issue_underwriter(
        owner_id: UserId,
        cluster_id: ClusterId,
        repayment: Decimal,
        issued_at: TimeMs,
    ) -> Self {
        Self::issue(
            owner_id,
            None,
            cluster_id,
            EntitlementKind::Underwriter,
            repayment,
            issued_at,
        )
    }

    /// Investor record, entitlement zero until settlement overwrites it.
    pub fn issue_investor(
        owner_id: UserId,
        owner_wallet: Option<WalletAddress>,
        cluster_id: ClusterId,
        issued_at: TimeMs,
    ) -> Self {
        Self::issue(
            owner_id,
            owner_wallet,
            cluster_id,
            EntitlementKind::Investor,
            Decimal::zero(),
            issued_at,
        )
    }

    /// Minted on-chain: the record has a token id.
    pub fn is_minted(&self) -> bool {
        self.token_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_discriminants_are_stable() {
        assert_eq!(EntitlementKind::Underwriter.discriminant(), 0);
        assert_eq!(EntitlementKind::Investor.discriminant(), 1);
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for s in ["pending_settlement", "claimable", "claimed"] {
            assert_eq!(EntitlementStatus::parse(s).unwrap().as_str(), s);
        }
        assert_eq!(EntitlementStatus::parse("minted"), None);
    }

    #[test]
    fn test_issue_investor_starts_at_zero() {
        let rec = EntitlementRecord::issue_investor(
            UserId::new("u1"),
            None,
            ClusterId::new("c1"),
            TimeMs::new(1000),
        );
        assert_eq!(rec.kind, EntitlementKind::Investor);
        assert_eq!(rec.status, EntitlementStatus::PendingSettlement);
        assert!(rec.entitlement.is_zero());
        assert!(!rec.is_minted());
    }

    #[test]
    fn test_issue_underwriter_fixes_entitlement() {
        let rec = EntitlementRecord::issue_underwriter(
            UserId::new("uw"),
            ClusterId::new("c1"),
            Decimal::from_str_canonical("255").unwrap(),
            TimeMs::new(1000),
        );
        assert_eq!(rec.kind, EntitlementKind::Underwriter);
        assert_eq!(rec.entitlement, Decimal::from_int(255));
    }
}

//! Cluster record and lifecycle state machine.

use crate::domain::{ClusterId, Decimal, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle states, in strict forward order. A cluster never moves
/// backward along this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterStatus {
    /// Created, waiting for an underwriter to fund it.
    Pending,
    /// Funded and accepting investments.
    Open,
    /// All slots filled; entitlement records issued.
    Active,
    /// Trade profit reported and distributed; awaiting closure.
    Settling,
    /// Terminal.
    Closed,
}

impl ClusterStatus {
    /// Position in the forward lifecycle order.
    pub fn rank(&self) -> u8 {
        match self {
            ClusterStatus::Pending => 0,
            ClusterStatus::Open => 1,
            ClusterStatus::Active => 2,
            ClusterStatus::Settling => 3,
            ClusterStatus::Closed => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Pending => "Pending",
            ClusterStatus::Open => "Open",
            ClusterStatus::Active => "Active",
            ClusterStatus::Settling => "Settling",
            ClusterStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(ClusterStatus::Pending),
            "Open" => Some(ClusterStatus::Open),
            "Active" => Some(ClusterStatus::Active),
            "Settling" => Some(ClusterStatus::Settling),
            "Closed" => Some(ClusterStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pooled-investment round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: ClusterId,
    pub status: ClusterStatus,
    pub total_value: Decimal,
    pub slots: i64,
    pub slots_filled: i64,
    pub created_at: TimeMs,
    pub created_by: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funded_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funded_at: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<TimeMs>,
    /// Trade result, set at settlement. May be negative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<TimeMs>,
    pub has_loan_assigned: bool,
}

impl Cluster {
    /// Fixed total value of every cluster, in currency units.
    pub fn total_value_fixed() -> Decimal {
        Decimal::from_int(250)
    }

    /// A freshly created cluster in Pending with no slots filled.
    pub fn new_pending(created_by: UserId, slots: i64) -> Self {
        Cluster {
            id: ClusterId::generate(),
            status: ClusterStatus::Pending,
            total_value: Self::total_value_fixed(),
            slots,
            slots_filled: 0,
            created_at: TimeMs::now(),
            created_by,
            funded_by: None,
            funded_at: None,
            activated_at: None,
            profit: None,
            closed_at: None,
            has_loan_assigned: false,
        }
    }

    /// True when every slot is taken.
    pub fn is_full(&self) -> bool {
        self.slots_filled >= self.slots
    }
}

//! Microloan campaign: a simple record linked to an Active cluster.

use crate::domain::{ClusterId, Decimal, TimeMs};
use serde::{Deserialize, Serialize};

/// Borrower-group risk grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskRating {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
}

impl RiskRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRating::APlus => "A+",
            RiskRating::A => "A",
            RiskRating::BPlus => "B+",
            RiskRating::B => "B",
            RiskRating::C => "C",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(RiskRating::APlus),
            "A" => Some(RiskRating::A),
            "B+" => Some(RiskRating::BPlus),
            "B" => Some(RiskRating::B),
            "C" => Some(RiskRating::C),
            _ => None,
        }
    }
}

/// Repayment state of a campaign. No state machine drives this; the field
/// is mutated only by out-of-band admin tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Funding,
    Active,
    Repaying,
    Repaid,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Funding => "Funding",
            LoanStatus::Active => "Active",
            LoanStatus::Repaying => "Repaying",
            LoanStatus::Repaid => "Repaid",
            LoanStatus::Defaulted => "Defaulted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Funding" => Some(LoanStatus::Funding),
            "Active" => Some(LoanStatus::Active),
            "Repaying" => Some(LoanStatus::Repaying),
            "Repaid" => Some(LoanStatus::Repaid),
            "Defaulted" => Some(LoanStatus::Defaulted),
            _ => None,
        }
    }
}

/// One microloan campaign funded by a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroloanCampaign {
    pub id: String,
    pub cluster_id: ClusterId,
    pub borrower_group: String,
    pub description: String,
    pub risk_rating: RiskRating,
    pub loan_amount: Decimal,
    pub duration_months: i64,
    pub repayment_plan: String,
    pub status: LoanStatus,
    pub repaid_amount: Decimal,
    pub created_at: TimeMs,
}

impl MicroloanCampaign {
    /// Campaign terms are fixed by the cluster size.
    pub fn new(
        cluster_id: ClusterId,
        borrower_group: String,
        description: String,
        risk_rating: RiskRating,
    ) -> Self {
        MicroloanCampaign {
            id: uuid::Uuid::new_v4().to_string(),
            cluster_id,
            borrower_group,
            description,
            risk_rating,
            loan_amount: Decimal::from_int(250),
            duration_months: 2,
            repayment_plan: "8 weekly installments".to_string(),
            status: LoanStatus::Active,
            repaid_amount: Decimal::zero(),
            created_at: TimeMs::now(),
        }
    }
}

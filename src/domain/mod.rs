//! Domain types for the cluster settlement and entitlement ledger.
//!
//! This module provides:
//! - Lossless currency arithmetic via the Decimal wrapper
//! - Domain primitives: TimeMs, UserId, ClusterId, WalletAddress
//! - Cluster lifecycle, investment, entitlement and loan records
//! - The pure settlement calculator

pub mod cluster;
pub mod decimal;
pub mod entitlement;
pub mod investment;
pub mod loan;
pub mod primitives;
pub mod settlement;

pub use cluster::{Cluster, ClusterStatus};
pub use decimal::Decimal;
pub use entitlement::{EntitlementKind, EntitlementRecord, EntitlementStatus};
pub use investment::Investment;
pub use loan::{LoanStatus, MicroloanCampaign, RiskRating};
pub use primitives::{ClusterId, TimeMs, UserId, WalletAddress};
pub use settlement::{compute_settlement, SettlementBreakdown, SettlementParams};

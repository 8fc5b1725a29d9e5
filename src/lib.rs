pub mod api;
pub mod auth;
pub mod chain;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;

pub use auth::{Claims, TokenVerifier};
pub use chain::{EntitlementBridge, TokenLedger};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Cluster, ClusterId, ClusterStatus, Decimal, EntitlementKind, EntitlementRecord,
    SettlementBreakdown, TimeMs, UserId,
};
pub use error::AppError;

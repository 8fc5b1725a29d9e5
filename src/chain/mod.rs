//! Token-ledger abstraction: the external smart contract that mints and
//! pays out entitlement tokens.
//!
//! Mint calls are never part of a store transaction; they run strictly
//! after the off-chain commit. A failed mint leaves the off-chain record
//! without a token id, to be picked up by reconciliation.

use crate::domain::{ClusterId, Decimal, EntitlementKind, WalletAddress};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;

pub mod bridge;
pub mod http;
pub mod mock;

pub use bridge::{EntitlementBridge, MintReport};
pub use http::HttpTokenLedger;
pub use mock::MockTokenLedger;

/// Receipt for a successful mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub token_id: i64,
    pub tx_hash: String,
}

/// Interface to the entitlement token contract.
///
/// Implementations perform a single call per invocation; retrying a failed
/// mint is the caller's decision (the reconcile operation re-drives any
/// record still lacking a token id).
#[async_trait]
pub trait TokenLedger: Send + Sync + fmt::Debug {
    /// Mint one entitlement token.
    ///
    /// `kind` travels as a small integer discriminant and `entitlement` in
    /// the contract's fixed-point minor units.
    async fn mint(
        &self,
        owner: &WalletAddress,
        cluster_id: &ClusterId,
        kind: EntitlementKind,
        entitlement: Decimal,
    ) -> Result<MintReceipt, TokenLedgerError>;
}

/// Error type for token-ledger operations.
#[derive(Debug, Clone)]
pub enum TokenLedgerError {
    /// Transport failure (connection, DNS, timeout).
    Network(String),
    /// Relay answered with a non-success HTTP status.
    Http { status: u16, message: String },
    /// The contract reverted the transaction.
    Revert(String),
    /// Malformed response.
    Parse(String),
    /// Amount not representable in the contract's fixed-point unit.
    AmountOutOfRange(String),
}

impl fmt::Display for TokenLedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenLedgerError::Network(msg) => write!(f, "Network error: {}", msg),
            TokenLedgerError::Http { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            TokenLedgerError::Revert(msg) => write!(f, "Contract revert: {}", msg),
            TokenLedgerError::Parse(msg) => write!(f, "Parse error: {}", msg),
            TokenLedgerError::AmountOutOfRange(msg) => write!(f, "Amount out of range: {}", msg),
        }
    }
}

impl std::error::Error for TokenLedgerError {}

/// 32-byte digest of a cluster id, hex encoded, for the contract's
/// `bytes32` cluster parameter.
pub fn cluster_id_digest(cluster_id: &ClusterId) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(cluster_id.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Convert a currency amount to the contract's fixed-point minor units
/// (two decimal places, rounded half-up). The off-chain record keeps the
/// exact value; only the on-chain twin carries cent precision.
pub fn to_minor_units(amount: Decimal) -> Result<i64, TokenLedgerError> {
    let scaled = amount.inner() * rust_decimal::Decimal::ONE_HUNDRED;
    scaled
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            TokenLedgerError::AmountOutOfRange(format!("{} exceeds the contract range", amount))
        })
}

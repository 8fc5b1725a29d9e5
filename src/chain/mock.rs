//! Mock token ledger for testing without chain calls.

use super::{MintReceipt, TokenLedger, TokenLedgerError};
use crate::domain::{ClusterId, Decimal, EntitlementKind, WalletAddress};
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A mint call observed by the mock, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMint {
    pub owner: WalletAddress,
    pub cluster_id: ClusterId,
    pub kind: EntitlementKind,
    pub entitlement: Decimal,
}

/// Mock token ledger issuing sequential token ids, optionally failing the
/// first N calls to exercise the reconcile path.
#[derive(Debug, Default)]
pub struct MockTokenLedger {
    next_token_id: AtomicI64,
    failures_remaining: AtomicUsize,
    minted: Mutex<Vec<RecordedMint>>,
}

impl MockTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` mint calls with a revert.
    pub fn failing_first(n: usize) -> Self {
        let ledger = Self::default();
        ledger.failures_remaining.store(n, Ordering::SeqCst);
        ledger
    }

    /// All successfully minted calls, in order.
    pub fn minted(&self) -> Vec<RecordedMint> {
        self.minted.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl TokenLedger for MockTokenLedger {
    async fn mint(
        &self,
        owner: &WalletAddress,
        cluster_id: &ClusterId,
        kind: EntitlementKind,
        entitlement: Decimal,
    ) -> Result<MintReceipt, TokenLedgerError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(TokenLedgerError::Revert("injected failure".to_string()));
        }

        let token_id = self.next_token_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.minted
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedMint {
                owner: owner.clone(),
                cluster_id: cluster_id.clone(),
                kind,
                entitlement,
            });

        Ok(MintReceipt {
            token_id,
            tx_hash: format!("0xmock{:08x}", token_id),
        })
    }
}

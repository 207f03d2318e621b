//! Payout boundary: transfers the pool to the round winner.

use crate::types::{Amount, ParticipantId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use thiserror::Error;

/// Reason a transfer did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("recipient {0} rejected funds")]
    Rejected(ParticipantId),

    #[error("recipient balance overflow")]
    Overflow,

    #[error("transfer failed: {0}")]
    Other(String),
}

/// Destination of winner payouts.
///
/// A transfer either completes in full or has no effect; the engine relies on this
/// to keep selection and payout all-or-nothing.
pub trait PayoutSink: Send + Sync {
    fn transfer(&self, recipient: &ParticipantId, amount: Amount) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: BTreeMap<ParticipantId, Amount>,
    refusing: BTreeSet<ParticipantId>,
    total_paid: Amount,
    transfers: u64,
}

/// In-memory balance ledger with configurable refusing recipients.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `recipient` reject all incoming transfers.
    pub fn refuse(&self, recipient: &ParticipantId) {
        self.lock().refusing.insert(recipient.clone());
    }

    /// Accept transfers to `recipient` again.
    pub fn accept(&self, recipient: &ParticipantId) {
        self.lock().refusing.remove(recipient);
    }

    pub fn balance_of(&self, recipient: &ParticipantId) -> Amount {
        self.lock().balances.get(recipient).copied().unwrap_or(0)
    }

    pub fn balances(&self) -> BTreeMap<ParticipantId, Amount> {
        self.lock().balances.clone()
    }

    pub fn total_paid(&self) -> Amount {
        self.lock().total_paid
    }

    pub fn transfer_count(&self) -> u64 {
        self.lock().transfers
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        // Transfers validate before writing, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PayoutSink for InMemoryLedger {
    fn transfer(&self, recipient: &ParticipantId, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.lock();
        if state.refusing.contains(recipient) {
            return Err(TransferError::Rejected(recipient.clone()));
        }

        let balance = state
            .balances
            .get(recipient)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        let total = state
            .total_paid
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        state.balances.insert(recipient.clone(), balance);
        state.total_paid = total;
        state.transfers = state.transfers.saturating_add(1);
        Ok(())
    }
}

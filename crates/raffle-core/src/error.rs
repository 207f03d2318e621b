//! Error taxonomy for the raffle engine.
//!
//! Every failure is detected synchronously and surfaced to the caller. Validation
//! failures are raised before any write, so a returned error always means the engine
//! state is exactly what it was before the call.

use crate::types::{Amount, ParticipantId, RequestId, UpkeepDiagnostics};
use thiserror::Error;

/// Errors returned by raffle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaffleError {
    /// Entry amount is below the configured entrance fee.
    #[error("insufficient entry fee: required {required}, provided {provided}")]
    InsufficientEntryFee { required: Amount, provided: Amount },

    /// Entries are only accepted while the lottery is OPEN.
    #[error("lottery is not open")]
    LotteryNotOpen,

    /// `perform_upkeep` was called while at least one upkeep condition is false.
    #[error("upkeep not needed: {0}")]
    UpkeepNotNeeded(UpkeepDiagnostics),

    /// No pending request matches the delivered request id.
    #[error("unknown request id {0}")]
    UnknownRequestId(RequestId),

    /// The pool could not be transferred to the selected winner.
    #[error("payout of {amount} to {winner} failed: {reason}")]
    PayoutFailed {
        winner: ParticipantId,
        amount: Amount,
        reason: String,
    },

    /// Participant index is outside the current round.
    #[error("index {index} out of range for {len} participants")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("capacity exceeded: max {capacity}")]
    CapacityExceeded { capacity: usize },

    #[error("arithmetic overflow")]
    Overflow,

    /// The randomness provider refused or failed to open a request.
    #[error("randomness provider error: {0}")]
    ProviderError(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(&'static str),
}

impl RaffleError {
    /// Stable numeric code for logging and deterministic handling.
    pub fn code(&self) -> u16 {
        match self {
            RaffleError::InvalidConfig(_) => 1000,
            RaffleError::CapacityExceeded { .. } => 1001,
            RaffleError::Overflow => 1002,
            RaffleError::InvariantViolation(_) => 1003,

            RaffleError::InsufficientEntryFee { .. } => 1100,
            RaffleError::LotteryNotOpen => 1101,
            RaffleError::IndexOutOfRange { .. } => 1102,

            RaffleError::UpkeepNotNeeded(_) => 1200,

            RaffleError::UnknownRequestId(_) => 1300,
            RaffleError::ProviderError(_) => 1301,

            RaffleError::PayoutFailed { .. } => 1400,
        }
    }

    /// True for failures that leave the round recoverable by a later retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RaffleError::UpkeepNotNeeded(_)
                | RaffleError::ProviderError(_)
                | RaffleError::PayoutFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RaffleError>;
